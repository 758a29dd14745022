//! Local Replica
//!
//! Whole-collection persistence on top of a `KeyValueStore`. The item list
//! and the tombstones each live in one named slot and are always written
//! together.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::traits::KeyValueStore;
use crate::domain::{Collection, DomainError, DomainResult, Tombstones};

pub const ITEMS_SLOT: &str = "bucketItems";
pub const TOMBSTONES_SLOT: &str = "bucketTombstones";

#[derive(Clone)]
pub struct LocalReplica {
    store: Arc<dyn KeyValueStore>,
}

impl LocalReplica {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Persisted collection; missing slot means empty
    pub async fn try_load(&self) -> DomainResult<Collection> {
        match self.store.read_slot(ITEMS_SLOT).await? {
            Some(raw) => serde_json::from_str(&raw)
                .map_err(|e| DomainError::MalformedLocalState(e.to_string())),
            None => Ok(Collection::new()),
        }
    }

    /// Persisted collection, or empty when the slot is unreadable
    pub async fn load(&self) -> Collection {
        match self.try_load().await {
            Ok(items) => items,
            Err(e) => {
                log::warn!("Local collection unreadable, starting empty: {}", e);
                Collection::new()
            }
        }
    }

    pub async fn load_tombstones(&self) -> Tombstones {
        let parsed = match self.store.read_slot(TOMBSTONES_SLOT).await {
            Ok(Some(raw)) => serde_json::from_str(&raw)
                .map_err(|e| DomainError::MalformedLocalState(e.to_string())),
            Ok(None) => Ok(Tombstones::new()),
            Err(e) => Err(e),
        };
        parsed.unwrap_or_else(|e| {
            log::warn!("Tombstones unreadable, starting empty: {}", e);
            Tombstones::new()
        })
    }

    pub async fn save(&self, items: &Collection, tombstones: &Tombstones) -> DomainResult<()> {
        let items = serde_json::to_string(items).map_err(|e| DomainError::Internal(e.to_string()))?;
        let tombstones =
            serde_json::to_string(tombstones).map_err(|e| DomainError::Internal(e.to_string()))?;
        self.store
            .write_slots(&[(ITEMS_SLOT, items), (TOMBSTONES_SLOT, tombstones)])
            .await
    }
}

/// Volatile slot store
#[derive(Default)]
pub struct MemoryStore {
    slots: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn slots(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        match self.slots.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Write a raw slot value, bypassing serialization
    pub fn put_raw(&self, key: &str, value: &str) {
        self.slots().insert(key.to_string(), value.to_string());
    }

    pub fn get_raw(&self, key: &str) -> Option<String> {
        self.slots().get(key).cloned()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn read_slot(&self, key: &str) -> DomainResult<Option<String>> {
        Ok(self.get_raw(key))
    }

    async fn write_slots(&self, entries: &[(&str, String)]) -> DomainResult<()> {
        let mut slots = self.slots();
        for (key, value) in entries {
            slots.insert(key.to_string(), value.clone());
        }
        Ok(())
    }
}
