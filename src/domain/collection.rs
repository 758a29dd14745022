//! Collection and tombstones
//!
//! A `Collection` is the whole keyed set of items held by one replica. It
//! serializes as a plain JSON array, the same shape used for the local
//! slot, the remote listing and backup files.

use std::collections::btree_map::{self, BTreeMap};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::item::{Item, ItemId, Timestamp};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Collection {
    items: BTreeMap<ItemId, Item>,
}

impl Collection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Later duplicates of an id replace earlier ones
    pub fn from_items(items: impl IntoIterator<Item = Item>) -> Self {
        let mut collection = Self::new();
        for item in items {
            collection.insert(item);
        }
        collection
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, id: &ItemId) -> bool {
        self.items.contains_key(id)
    }

    pub fn get(&self, id: &ItemId) -> Option<&Item> {
        self.items.get(id)
    }

    pub fn get_mut(&mut self, id: &ItemId) -> Option<&mut Item> {
        self.items.get_mut(id)
    }

    /// Insert or replace, returning the previous version
    pub fn insert(&mut self, item: Item) -> Option<Item> {
        self.items.insert(item.id.clone(), item)
    }

    pub fn remove(&mut self, id: &ItemId) -> Option<Item> {
        self.items.remove(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &ItemId> {
        self.items.keys()
    }

    pub fn iter(&self) -> btree_map::Values<'_, ItemId, Item> {
        self.items.values()
    }

    pub fn to_vec(&self) -> Vec<Item> {
        self.items.values().cloned().collect()
    }
}

impl<'a> IntoIterator for &'a Collection {
    type Item = &'a Item;
    type IntoIter = btree_map::Values<'a, ItemId, Item>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.values()
    }
}

impl FromIterator<Item> for Collection {
    fn from_iter<I: IntoIterator<Item = Item>>(iter: I) -> Self {
        Self::from_items(iter)
    }
}

impl Serialize for Collection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.items.values())
    }
}

impl<'de> Deserialize<'de> for Collection {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Vec::<Item>::deserialize(deserializer).map(Self::from_items)
    }
}

/// Deletion marker kept until the remote confirms the id is gone
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tombstone {
    pub id: ItemId,
    pub deleted_at: Timestamp,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tombstones {
    entries: BTreeMap<ItemId, Timestamp>,
}

impl Tombstones {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keeps the later deletion time when an id is deleted twice
    pub fn record(&mut self, id: ItemId, deleted_at: Timestamp) {
        let entry = self.entries.entry(id).or_insert(deleted_at);
        if deleted_at > *entry {
            *entry = deleted_at;
        }
    }

    pub fn get(&self, id: &ItemId) -> Option<Timestamp> {
        self.entries.get(id).copied()
    }

    pub fn remove(&mut self, id: &ItemId) -> Option<Timestamp> {
        self.entries.remove(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ItemId, Timestamp)> {
        self.entries.iter().map(|(id, at)| (id, *at))
    }
}

impl Serialize for Tombstones {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.entries.iter().map(|(id, at)| Tombstone {
            id: id.clone(),
            deleted_at: *at,
        }))
    }
}

impl<'de> Deserialize<'de> for Tombstones {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut tombstones = Tombstones::new();
        for t in Vec::<Tombstone>::deserialize(deserializer)? {
            tombstones.record(t.id, t.deleted_at);
        }
        Ok(tombstones)
    }
}
