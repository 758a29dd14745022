//! Item Entity
//!
//! One bucket-list entry. `updated_at` is the only ordering key used when
//! two replicas disagree, so every mutation goes through `touch`.

use std::fmt;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

use super::error::{DomainError, DomainResult};

/// Epoch milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
#[serde(transparent)]
pub struct Timestamp(pub i64);

impl Timestamp {
    pub const EPOCH: Timestamp = Timestamp(0);

    pub fn as_millis(&self) -> i64 {
        self.0
    }

    /// Parses integer milliseconds or an RFC 3339 date such as
    /// `2024-05-01T10:00:00.000Z`.
    pub fn parse(s: &str) -> Option<Timestamp> {
        let s = s.trim();
        if let Ok(ms) = s.parse::<i64>() {
            return Some(Timestamp(ms));
        }
        chrono::DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| Timestamp(dt.timestamp_millis()))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTimestamp {
    Millis(i64),
    Float(f64),
    Text(String),
}

impl RawTimestamp {
    fn into_timestamp(self) -> Result<Option<Timestamp>, String> {
        match self {
            RawTimestamp::Millis(ms) => Ok(Some(Timestamp(ms))),
            RawTimestamp::Float(f) if f.is_finite() && f >= i64::MIN as f64 && f < i64::MAX as f64 => {
                Ok(Some(Timestamp(f as i64)))
            }
            RawTimestamp::Float(f) => Err(format!("timestamp out of range: {}", f)),
            RawTimestamp::Text(s) if s.trim().is_empty() => Ok(None),
            RawTimestamp::Text(s) => Timestamp::parse(&s)
                .map(Some)
                .ok_or_else(|| format!("invalid timestamp: {}", s)),
        }
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        RawTimestamp::deserialize(deserializer)?
            .into_timestamp()
            .map_err(de::Error::custom)
            .map(|ts| ts.unwrap_or(Timestamp::EPOCH))
    }
}

/// `null`, blank strings and absent fields all mean "no timestamp"
fn optional_timestamp<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Timestamp>, D::Error> {
    match Option::<RawTimestamp>::deserialize(deserializer)? {
        Some(raw) => raw.into_timestamp().map_err(de::Error::custom),
        None => Ok(None),
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Opaque item identifier; numeric ids from the remote are kept as text
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// `item-<millis>`, the shape every locally created item gets
    pub fn from_timestamp(ts: Timestamp) -> Self {
        Self(format!("item-{}", ts.0))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl<'de> Deserialize<'de> for ItemId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Number(i64),
        }

        match RawId::deserialize(deserializer)? {
            RawId::Text(s) if s.trim().is_empty() => Err(de::Error::custom("empty item id")),
            RawId::Text(s) => Ok(ItemId(s)),
            RawId::Number(n) => Ok(ItemId(n.to_string())),
        }
    }
}

/// A bucket-list item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: ItemId,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    /// Free-text note shown under the title
    #[serde(default, deserialize_with = "null_as_default")]
    pub category: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub done: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub pinned: bool,
    #[serde(default, deserialize_with = "optional_timestamp")]
    pub completed_at: Option<Timestamp>,
    #[serde(default, deserialize_with = "optional_timestamp")]
    pub updated_at: Option<Timestamp>,
}

/// Closed set of field edits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "camelCase")]
pub enum ItemEdit {
    SetTitle(String),
    SetCategory(String),
}

/// Validated input for a new item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemDraft {
    title: String,
    category: String,
    done: bool,
    pinned: bool,
}

impl ItemDraft {
    /// Fails when the trimmed title is empty
    pub fn new(title: &str, category: &str) -> DomainResult<Self> {
        Ok(Self {
            title: validate_title(title)?,
            category: category.trim().to_string(),
            done: false,
            pinned: false,
        })
    }

    pub fn with_done(mut self, done: bool) -> Self {
        self.done = done;
        self
    }

    pub fn with_pinned(mut self, pinned: bool) -> Self {
        self.pinned = pinned;
        self
    }

    pub fn build(self, id: ItemId, now: Timestamp) -> Item {
        Item {
            id,
            title: self.title,
            category: self.category,
            done: self.done,
            pinned: self.pinned,
            completed_at: if self.done { Some(now) } else { None },
            updated_at: Some(now),
        }
    }
}

fn validate_title(title: &str) -> DomainResult<String> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(DomainError::Validation("title must not be empty".to_string()));
    }
    Ok(trimmed.to_string())
}

impl Item {
    /// `updated_at`, with missing values ordered before any real timestamp
    pub fn last_modified(&self) -> Timestamp {
        self.updated_at.unwrap_or(Timestamp::EPOCH)
    }

    /// Refresh `updated_at` without ever moving it backwards
    pub fn touch(&mut self, now: Timestamp) {
        let next = match self.updated_at {
            Some(prev) if prev >= now => Timestamp(prev.0.saturating_add(1)),
            _ => now,
        };
        self.updated_at = Some(next);
    }

    /// Apply an edit; nothing changes if validation fails
    pub fn apply(&mut self, edit: &ItemEdit, now: Timestamp) -> DomainResult<()> {
        self.apply_all(std::slice::from_ref(edit), now)
    }

    /// Apply several edits as one change with a single `touch`
    pub fn apply_all(&mut self, edits: &[ItemEdit], now: Timestamp) -> DomainResult<()> {
        let mut next = self.clone();
        for edit in edits {
            match edit {
                ItemEdit::SetTitle(title) => next.title = validate_title(title)?,
                ItemEdit::SetCategory(category) => next.category = category.trim().to_string(),
            }
        }
        next.touch(now);
        *self = next;
        Ok(())
    }

    /// `completed_at` is stamped on false->true and cleared on true->false
    pub fn set_done(&mut self, checked: bool, now: Timestamp) {
        match (self.done, checked) {
            (false, true) => self.completed_at = Some(now),
            (true, false) => self.completed_at = None,
            (true, true) if self.completed_at.is_none() => self.completed_at = Some(now),
            _ => {}
        }
        self.done = checked;
        self.touch(now);
    }

    pub fn toggle_pinned(&mut self, now: Timestamp) {
        self.pinned = !self.pinned;
        self.touch(now);
    }
}
