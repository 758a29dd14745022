//! Mutation Pipeline
//!
//! Every user change runs as: apply to the in-memory collection, persist,
//! hand the remote write to the dispatcher, notify observers. The local
//! part always completes; the remote part can only fail in the log.

use std::sync::Arc;

use tokio::sync::broadcast;

use super::state::{CollectionEvent, LocalState, ReplaceReason, SharedState};
use crate::backup;
use crate::domain::{Clock, Collection, DomainResult, Item, ItemDraft, ItemEdit, ItemId, Timestamp};
use crate::gateway::{RemoteCall, RemoteGateway};
use crate::repository::LocalReplica;

pub struct BucketList {
    shared: Arc<SharedState>,
}

/// First `item-<millis>` id at or after `now` not used by a live or deleted item
fn fresh_id(state: &LocalState, now: Timestamp) -> ItemId {
    let mut millis = now.as_millis();
    loop {
        let id = ItemId::from_timestamp(Timestamp(millis));
        if !state.items.contains(&id) && state.tombstones.get(&id).is_none() {
            return id;
        }
        millis += 1;
    }
}

impl BucketList {
    pub fn new(
        initial: LocalState,
        replica: LocalReplica,
        gateway: Arc<dyn RemoteGateway>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            shared: Arc::new(SharedState::new(initial, replica, gateway, clock)),
        }
    }

    /// Start from whatever the replica holds
    pub async fn open(replica: LocalReplica, gateway: Arc<dyn RemoteGateway>, clock: Arc<dyn Clock>) -> Self {
        let items = replica.load().await;
        let tombstones = replica.load_tombstones().await;
        log::info!("Loaded {} items, {} pending deletions", items.len(), tombstones.len());
        Self::new(LocalState { items, tombstones }, replica, gateway, clock)
    }

    pub(crate) fn shared(&self) -> Arc<SharedState> {
        self.shared.clone()
    }

    pub async fn items(&self) -> Collection {
        self.shared.lock().await.items.clone()
    }

    pub async fn get(&self, id: &ItemId) -> Option<Item> {
        self.shared.lock().await.items.get(id).cloned()
    }

    pub async fn pending_deletions(&self) -> usize {
        self.shared.lock().await.tombstones.len()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CollectionEvent> {
        self.shared.subscribe()
    }

    /// Wait for remote calls already handed off
    pub async fn flush_remote(&self) {
        self.shared.dispatcher().flush().await;
    }

    pub async fn add(&self, title: &str, category: &str) -> DomainResult<Item> {
        let draft = ItemDraft::new(title, category)?;
        Ok(self.add_draft(draft).await)
    }

    pub async fn add_draft(&self, draft: ItemDraft) -> Item {
        let mut local = self.shared.lock().await;
        let now = self.shared.now();
        let item = draft.build(fresh_id(&local, now), now);

        local.items.insert(item.clone());
        self.shared.persist(&local).await;
        self.shared.dispatcher().submit(RemoteCall::insert(item.clone()));
        self.shared.notify(CollectionEvent::Added(item.clone()));

        log::info!("Added {}", item.id);
        item
    }

    /// `Ok(None)` for an unknown id; a rejected edit changes nothing
    pub async fn edit(&self, id: &ItemId, edit: ItemEdit) -> DomainResult<Option<Item>> {
        self.update_with(id, move |item, now| item.apply(&edit, now)).await
    }

    /// Several field edits applied together: one refresh, one remote update
    pub async fn edit_all(&self, id: &ItemId, edits: Vec<ItemEdit>) -> DomainResult<Option<Item>> {
        if edits.is_empty() {
            return Ok(self.get(id).await);
        }
        self.update_with(id, move |item, now| item.apply_all(&edits, now)).await
    }

    /// Set `done`; `completed_at` follows the transition
    pub async fn toggle(&self, id: &ItemId, checked: bool) -> Option<Item> {
        self.update_with(id, move |item, now| {
            item.set_done(checked, now);
            Ok(())
        })
        .await
        .ok()
        .flatten()
    }

    pub async fn pin(&self, id: &ItemId) -> Option<Item> {
        self.update_with(id, |item, now| {
            item.toggle_pinned(now);
            Ok(())
        })
        .await
        .ok()
        .flatten()
    }

    /// Remove locally whatever happens remotely; unknown ids are ignored
    pub async fn delete(&self, id: &ItemId) -> Option<Item> {
        let mut local = self.shared.lock().await;
        let Some(removed) = local.items.remove(id) else {
            log::debug!("Delete ignored, unknown item {}", id);
            return None;
        };

        let now = self.shared.now();
        local.tombstones.record(id.clone(), now.max(removed.last_modified()));
        self.shared.persist(&local).await;
        self.shared.dispatcher().submit(RemoteCall::delete(id.clone()));
        self.shared.notify(CollectionEvent::Removed(id.clone()));

        log::info!("Deleted {}", id);
        Some(removed)
    }

    /// Replace the whole collection with a backup and push every item
    pub async fn import(&self, json: &str) -> DomainResult<usize> {
        let imported = backup::parse_backup(json)?;

        let mut local = self.shared.lock().await;
        let imported_ids: Vec<ItemId> = imported.ids().cloned().collect();
        for id in &imported_ids {
            local.tombstones.remove(id);
        }
        local.items = imported;
        self.shared.persist(&local).await;

        self.shared
            .dispatcher()
            .submit_all(local.items.iter().cloned().map(RemoteCall::insert));
        let count = local.items.len();
        self.shared.notify(CollectionEvent::Replaced {
            reason: ReplaceReason::Import,
            count,
        });

        log::info!("Imported {} items from backup", count);
        Ok(count)
    }

    pub async fn export(&self) -> DomainResult<String> {
        backup::export_backup(&self.items().await)
    }

    async fn update_with<F>(&self, id: &ItemId, change: F) -> DomainResult<Option<Item>>
    where
        F: FnOnce(&mut Item, Timestamp) -> DomainResult<()> + Send,
    {
        let mut local = self.shared.lock().await;
        let now = self.shared.now();
        let Some(current) = local.items.get_mut(id) else {
            log::debug!("Update ignored, unknown item {}", id);
            return Ok(None);
        };

        let mut updated = current.clone();
        change(&mut updated, now)?;
        *current = updated.clone();

        self.shared.persist(&local).await;
        self.shared.dispatcher().submit(RemoteCall::update(updated.clone()));
        self.shared.notify(CollectionEvent::Updated(updated.clone()));
        Ok(Some(updated))
    }
}
