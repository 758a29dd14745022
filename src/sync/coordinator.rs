//! Sync Coordinator
//!
//! Runs the reconciler against the live collection. The remote snapshot is
//! fetched without holding the collection lock; the merge, the persist and
//! the hand-off of corrective calls then happen under it, against whatever
//! the local collection holds at that moment. Only one run at a time.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use serde::Serialize;

use super::reconciler::{reconcile, SyncReport};
use crate::domain::Timestamp;
use crate::gateway::RemoteGateway;
use crate::pipeline::{BucketList, CollectionEvent, ReplaceReason, SharedState};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum SyncOutcome {
    Synced { report: SyncReport },
    /// Remote snapshot could not be fetched; local state untouched
    Offline { reason: String },
    /// Another run was in progress
    Skipped,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    pub in_progress: bool,
    pub last_synced_at: Option<Timestamp>,
    pub last_outcome: Option<SyncOutcome>,
}

/// Resets the busy flag however the run ends
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

pub struct SyncCoordinator {
    shared: Arc<SharedState>,
    busy: AtomicBool,
    status: Mutex<SyncStatus>,
}

impl SyncCoordinator {
    pub fn new(list: &BucketList) -> Self {
        Self {
            shared: list.shared(),
            busy: AtomicBool::new(false),
            status: Mutex::new(SyncStatus::default()),
        }
    }

    pub fn gateway(&self) -> Arc<dyn RemoteGateway> {
        self.shared.dispatcher().gateway()
    }

    /// Point sync and later mutations at another remote
    pub fn set_gateway(&self, gateway: Arc<dyn RemoteGateway>) {
        self.shared.dispatcher().set_gateway(gateway);
    }

    pub fn is_running(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    pub fn status(&self) -> SyncStatus {
        let mut status = match self.status.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };
        status.in_progress = self.is_running();
        status
    }

    pub async fn sync(&self) -> SyncOutcome {
        if self
            .busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            log::info!("Sync already running, skipped");
            return SyncOutcome::Skipped;
        }
        let _busy = BusyGuard(&self.busy);

        let outcome = self.run().await;
        self.record(&outcome);
        outcome
    }

    async fn run(&self) -> SyncOutcome {
        log::info!("Sync started");
        let remote = match self.gateway().list_all().await {
            Ok(remote) => remote,
            Err(e) => {
                log::warn!("Sync skipped, remote listing failed: {}", e);
                return SyncOutcome::Offline {
                    reason: e.to_string(),
                };
            }
        };

        let mut local = self.shared.lock().await;
        let outcome = reconcile(&local.items, &remote, &local.tombstones);
        local.items = outcome.merged;
        local.tombstones = outcome.tombstones;
        self.shared.persist(&local).await;

        self.shared.dispatcher().submit_all(outcome.corrective);
        self.shared.notify(CollectionEvent::Replaced {
            reason: ReplaceReason::Sync,
            count: local.items.len(),
        });

        let report = outcome.report;
        log::info!(
            "Sync finished: {} adopted, {} unchanged, {} pushed, {} deleted remotely",
            report.adopted_remote,
            report.unchanged,
            report.pushed_new + report.pushed_newer,
            report.deleted_remote
        );
        SyncOutcome::Synced { report }
    }

    fn record(&self, outcome: &SyncOutcome) {
        let now = self.shared.now();
        let mut status = match self.status.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if matches!(outcome, SyncOutcome::Synced { .. }) {
            status.last_synced_at = Some(now);
        }
        status.last_outcome = Some(outcome.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Collection, ItemDraft, ItemEdit, ItemId, ManualClock};
    use crate::gateway::{MemoryRemote, RemoteCall};
    use crate::repository::{LocalReplica, MemoryStore};

    struct Fixture {
        list: BucketList,
        sync: SyncCoordinator,
        remote: Arc<MemoryRemote>,
        clock: Arc<ManualClock>,
    }

    async fn fixture(remote_items: Collection) -> Fixture {
        let remote = Arc::new(MemoryRemote::with_items(remote_items));
        let clock = Arc::new(ManualClock::new(1_000));
        let list = BucketList::open(
            LocalReplica::new(Arc::new(MemoryStore::new())),
            remote.clone(),
            clock.clone(),
        )
        .await;
        let sync = SyncCoordinator::new(&list);
        Fixture { list, sync, remote, clock }
    }

    fn remote_item(id: &str, title: &str, updated_at: i64) -> crate::domain::Item {
        ItemDraft::new(title, "")
            .unwrap()
            .build(ItemId::from(id), Timestamp(updated_at))
    }

    fn synced(outcome: SyncOutcome) -> SyncReport {
        match outcome {
            SyncOutcome::Synced { report } => report,
            other => panic!("expected a completed sync, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_startup_pull_adopts_remote() {
        let f = fixture(Collection::from_items(vec![remote_item("r1", "From cloud", 500)])).await;

        let report = synced(f.sync.sync().await);
        f.list.flush_remote().await;

        assert_eq!(report.adopted_remote, 1);
        assert_eq!(f.list.get(&ItemId::from("r1")).await.unwrap().title, "From cloud");
        assert!(f.remote.calls().is_empty());
        assert!(f.sync.status().last_synced_at.is_some());
    }

    #[tokio::test]
    async fn test_offline_edits_are_pushed_on_next_sync() {
        let f = fixture(Collection::new()).await;
        f.remote.set_online(false);
        let item = f.list.add("Offline idea", "").await.unwrap();
        f.list.flush_remote().await;

        assert!(matches!(f.sync.sync().await, SyncOutcome::Offline { .. }));
        assert!(f.remote.snapshot().is_empty());

        f.remote.set_online(true);
        let report = synced(f.sync.sync().await);
        f.list.flush_remote().await;

        assert_eq!(report.pushed_new, 1);
        assert_eq!(f.remote.snapshot().get(&item.id), Some(&item));
    }

    #[tokio::test]
    async fn test_second_sync_is_quiet() {
        let f = fixture(Collection::from_items(vec![remote_item("r1", "Cloud", 10)])).await;
        f.remote.set_online(false);
        f.list.add("Local", "").await.unwrap();
        f.list.flush_remote().await;
        f.remote.set_online(true);

        synced(f.sync.sync().await);
        f.list.flush_remote().await;
        f.remote.clear_calls();

        let second = synced(f.sync.sync().await);
        f.list.flush_remote().await;

        assert_eq!(second.corrective_calls(), 0);
        assert_eq!(second.unchanged, 2);
        assert!(f.remote.calls().is_empty());
    }

    #[tokio::test]
    async fn test_remote_newer_edit_wins() {
        let f = fixture(Collection::new()).await;
        let item = f.list.add("Learn Go", "").await.unwrap();
        f.list.flush_remote().await;

        let mut newer = item.clone();
        newer.title = "Learn Rust".to_string();
        newer.updated_at = Some(Timestamp(item.last_modified().as_millis() + 1_000));
        f.remote.put(newer.clone());
        f.remote.clear_calls();

        synced(f.sync.sync().await);
        f.list.flush_remote().await;

        assert_eq!(f.list.get(&item.id).await, Some(newer));
        assert!(f.remote.calls().is_empty());
    }

    #[tokio::test]
    async fn test_deletion_is_not_resurrected() {
        let f = fixture(Collection::new()).await;
        let item = f.list.add("Bungee", "").await.unwrap();
        f.list.flush_remote().await;

        // delete lost in transit
        f.remote.set_online(false);
        f.list.delete(&item.id).await;
        f.list.flush_remote().await;
        f.remote.set_online(true);
        assert!(f.remote.snapshot().contains(&item.id));

        let report = synced(f.sync.sync().await);
        f.list.flush_remote().await;

        assert_eq!(report.deleted_remote, 1);
        assert!(f.list.get(&item.id).await.is_none());
        assert!(!f.remote.snapshot().contains(&item.id));

        // the remote confirms, the tombstone goes away
        report_quiet(&f).await;
        assert_eq!(f.list.pending_deletions().await, 0);
    }

    async fn report_quiet(f: &Fixture) {
        let report = synced(f.sync.sync().await);
        f.list.flush_remote().await;
        assert_eq!(report.corrective_calls(), 0);
    }

    #[tokio::test]
    async fn test_dropped_local_edit_is_repaired() {
        let f = fixture(Collection::from_items(vec![remote_item("r1", "Cloud", 10)])).await;
        synced(f.sync.sync().await);

        f.clock.advance(10_000);
        f.remote.set_online(false);
        let edited = f
            .list
            .edit(&ItemId::from("r1"), ItemEdit::SetTitle("Mine".into()))
            .await
            .unwrap()
            .unwrap();
        f.list.flush_remote().await;
        f.remote.set_online(true);
        assert_eq!(f.remote.snapshot().get(&edited.id).unwrap().title, "Cloud");

        let report = synced(f.sync.sync().await);
        f.list.flush_remote().await;

        assert_eq!(report.pushed_newer, 1);
        assert_eq!(f.remote.calls(), vec![RemoteCall::update(edited.clone())]);
        assert_eq!(f.list.get(&edited.id).await, Some(edited));
    }

    /// Snapshots the remote, then holds the listing until released
    struct HeldListing {
        inner: Arc<MemoryRemote>,
        fetched: tokio::sync::Notify,
        release: tokio::sync::Notify,
    }

    #[async_trait::async_trait]
    impl RemoteGateway for HeldListing {
        async fn list_all(&self) -> crate::domain::DomainResult<Collection> {
            let snapshot = self.inner.list_all().await;
            self.fetched.notify_one();
            self.release.notified().await;
            snapshot
        }

        async fn upsert(
            &self,
            item: &crate::domain::Item,
            intent: crate::gateway::WriteIntent,
        ) -> crate::domain::DomainResult<()> {
            self.inner.upsert(item, intent).await
        }

        async fn delete(&self, id: &ItemId) -> crate::domain::DomainResult<()> {
            self.inner.delete(id).await
        }
    }

    #[tokio::test]
    async fn test_mutations_during_fetch_are_kept() {
        let shared = Collection::from_items(vec![remote_item("r1", "Cloud", 10), remote_item("r2", "Doomed", 10)]);
        let inner = Arc::new(MemoryRemote::with_items(shared.clone()));
        let remote = Arc::new(HeldListing {
            inner: inner.clone(),
            fetched: tokio::sync::Notify::new(),
            release: tokio::sync::Notify::new(),
        });
        let list = BucketList::new(
            crate::pipeline::LocalState {
                items: shared,
                tombstones: Default::default(),
            },
            LocalReplica::new(Arc::new(MemoryStore::new())),
            remote.clone(),
            Arc::new(ManualClock::new(1_000)),
        );
        let sync = Arc::new(SyncCoordinator::new(&list));

        let running = {
            let sync = sync.clone();
            tokio::spawn(async move { sync.sync().await })
        };
        remote.fetched.notified().await;

        let edited = list
            .edit(&ItemId::from("r1"), ItemEdit::SetTitle("Mine".into()))
            .await
            .unwrap()
            .unwrap();
        list.delete(&ItemId::from("r2")).await.unwrap();
        remote.release.notify_one();

        let report = synced(running.await.unwrap());
        list.flush_remote().await;

        assert_eq!(report.pushed_newer, 1);
        assert_eq!(report.deleted_remote, 1);
        assert_eq!(list.get(&edited.id).await, Some(edited.clone()));
        assert!(list.get(&ItemId::from("r2")).await.is_none());
        assert_eq!(list.pending_deletions().await, 1);

        // once from the mutation, once as the corrective call
        let calls = inner.calls();
        let count = |call: &RemoteCall| calls.iter().filter(|c| *c == call).count();
        assert_eq!(count(&RemoteCall::update(edited)), 2);
        assert_eq!(count(&RemoteCall::delete(ItemId::from("r2"))), 2);
    }

    #[tokio::test]
    async fn test_overlapping_runs_are_skipped() {
        let f = fixture(Collection::new()).await;

        f.sync.busy.store(true, Ordering::SeqCst);
        assert_eq!(f.sync.sync().await, SyncOutcome::Skipped);
        assert!(f.sync.status().in_progress);

        f.sync.busy.store(false, Ordering::SeqCst);
        assert!(matches!(f.sync.sync().await, SyncOutcome::Synced { .. }));
        assert!(!f.sync.is_running());
    }

    #[tokio::test]
    async fn test_set_gateway_switches_remote() {
        let f = fixture(Collection::new()).await;
        let other = Arc::new(MemoryRemote::with_items(Collection::from_items(vec![remote_item(
            "o1", "Other", 1,
        )])));

        f.sync.set_gateway(other.clone());
        synced(f.sync.sync().await);
        let item = f.list.add("New", "").await.unwrap();
        f.list.flush_remote().await;

        assert!(f.list.get(&ItemId::from("o1")).await.is_some());
        assert_eq!(other.calls(), vec![RemoteCall::insert(item)]);
        assert!(f.remote.calls().is_empty());
    }
}
