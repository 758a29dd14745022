//! Shared local state
//!
//! The one in-memory collection, guarded by a single async mutex. Whoever
//! holds the guard (a mutation or a sync merge) runs its read-modify-write
//! and the persist to completion before anyone else can look.

use std::sync::Arc;

use tokio::sync::{broadcast, Mutex, MutexGuard};

use crate::domain::{Clock, Collection, Item, ItemId, Timestamp, Tombstones};
use crate::gateway::{Dispatcher, RemoteGateway};
use crate::repository::LocalReplica;

const EVENT_CAPACITY: usize = 64;

/// Authoritative local data
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalState {
    pub items: Collection,
    pub tombstones: Tombstones,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplaceReason {
    Sync,
    Import,
}

/// Change notification for observers (rendering)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectionEvent {
    Added(Item),
    Updated(Item),
    Removed(ItemId),
    Replaced { reason: ReplaceReason, count: usize },
}

pub(crate) struct SharedState {
    local: Mutex<LocalState>,
    replica: LocalReplica,
    dispatcher: Dispatcher,
    clock: Arc<dyn Clock>,
    events: broadcast::Sender<CollectionEvent>,
}

impl SharedState {
    pub(crate) fn new(
        initial: LocalState,
        replica: LocalReplica,
        gateway: Arc<dyn RemoteGateway>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            local: Mutex::new(initial),
            replica,
            dispatcher: Dispatcher::new(gateway),
            clock,
            events,
        }
    }

    pub(crate) async fn lock(&self) -> MutexGuard<'_, LocalState> {
        self.local.lock().await
    }

    pub(crate) fn now(&self) -> Timestamp {
        self.clock.now()
    }

    pub(crate) fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// A failed write is logged; the in-memory state stays authoritative
    pub(crate) async fn persist(&self, state: &LocalState) {
        if let Err(e) = self.replica.save(&state.items, &state.tombstones).await {
            log::error!("Failed to persist local collection: {}", e);
        }
    }

    pub(crate) fn notify(&self, event: CollectionEvent) {
        // no receivers is fine
        let _ = self.events.send(event);
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<CollectionEvent> {
        self.events.subscribe()
    }
}
