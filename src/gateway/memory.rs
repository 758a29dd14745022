//! In-process remotes
//!
//! `MemoryRemote` keeps the remote collection in memory and records every
//! call it receives; it can be taken offline to simulate an unreachable
//! endpoint. `OfflineGateway` is what the app uses when no endpoint is
//! configured.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use super::traits::{RemoteCall, RemoteGateway, WriteIntent};
use crate::domain::{Collection, DomainError, DomainResult, Item, ItemId};

#[derive(Default)]
struct RemoteState {
    items: Collection,
    calls: Vec<RemoteCall>,
}

pub struct MemoryRemote {
    state: Mutex<RemoteState>,
    online: AtomicBool,
}

impl Default for MemoryRemote {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self::with_items(Collection::new())
    }

    pub fn with_items(items: Collection) -> Self {
        Self {
            state: Mutex::new(RemoteState {
                items,
                calls: Vec::new(),
            }),
            online: AtomicBool::new(true),
        }
    }

    fn state(&self) -> MutexGuard<'_, RemoteState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    pub fn snapshot(&self) -> Collection {
        self.state().items.clone()
    }

    /// Write directly on the remote side, as another device would
    pub fn put(&self, item: Item) {
        self.state().items.insert(item);
    }

    /// Every mutating call received while online
    pub fn calls(&self) -> Vec<RemoteCall> {
        self.state().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }

    fn check_online(&self) -> DomainResult<()> {
        if self.online.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(DomainError::RemoteUnavailable("remote is offline".to_string()))
        }
    }
}

#[async_trait]
impl RemoteGateway for MemoryRemote {
    async fn list_all(&self) -> DomainResult<Collection> {
        self.check_online()?;
        Ok(self.snapshot())
    }

    async fn upsert(&self, item: &Item, intent: WriteIntent) -> DomainResult<()> {
        self.check_online()?;
        let mut state = self.state();
        state.items.insert(item.clone());
        state.calls.push(RemoteCall::Upsert {
            item: item.clone(),
            intent,
        });
        Ok(())
    }

    async fn delete(&self, id: &ItemId) -> DomainResult<()> {
        self.check_online()?;
        let mut state = self.state();
        state.items.remove(id);
        state.calls.push(RemoteCall::delete(id.clone()));
        Ok(())
    }
}

/// Remote used when no endpoint is configured; every call fails
#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineGateway;

#[async_trait]
impl RemoteGateway for OfflineGateway {
    async fn list_all(&self) -> DomainResult<Collection> {
        Err(DomainError::RemoteUnavailable("no remote endpoint configured".to_string()))
    }

    async fn upsert(&self, _item: &Item, _intent: WriteIntent) -> DomainResult<()> {
        Err(DomainError::RemoteUnavailable("no remote endpoint configured".to_string()))
    }

    async fn delete(&self, _id: &ItemId) -> DomainResult<()> {
        Err(DomainError::RemoteUnavailable("no remote endpoint configured".to_string()))
    }
}
