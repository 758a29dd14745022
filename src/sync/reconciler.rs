//! Reconciler
//!
//! Merges the local and remote snapshots key by key with last-write-wins
//! on `updated_at` (missing = epoch). Ties go to the remote so that an
//! unchanged item never produces traffic. The merge is pure: it returns
//! the new local state and the corrective calls, and the caller decides
//! when to persist and dispatch them.
//!
//! Tombstones close the resurrection gap of hard deletes: an id that is
//! only on the remote is dropped (and deleted remotely) when the local
//! deletion is at least as recent as the remote record.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::domain::{Collection, Item, ItemId, Timestamp, Tombstones};
use crate::gateway::RemoteCall;

/// Per-key decision
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Remote version becomes the local one
    AdoptRemote,
    /// Local version stays and is pushed
    KeepLocal(RemoteCall),
    /// Local deletion wins over a stale remote record
    PropagateDelete,
    /// Nothing on either side; the tombstone has done its job
    Forget,
}

/// Counters for one merge
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub adopted_remote: usize,
    pub unchanged: usize,
    pub pushed_new: usize,
    pub pushed_newer: usize,
    pub deleted_remote: usize,
}

impl SyncReport {
    pub fn corrective_calls(&self) -> usize {
        self.pushed_new + self.pushed_newer + self.deleted_remote
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    pub merged: Collection,
    /// Tombstones still waiting for the remote to confirm
    pub tombstones: Tombstones,
    pub corrective: Vec<RemoteCall>,
    pub report: SyncReport,
}

/// Decide one key
pub fn resolve(local: Option<&Item>, remote: Option<&Item>, deleted_at: Option<Timestamp>) -> Resolution {
    match (local, remote) {
        (None, Some(remote)) => match deleted_at {
            Some(deleted_at) if deleted_at >= remote.last_modified() => Resolution::PropagateDelete,
            _ => Resolution::AdoptRemote,
        },
        (Some(local), None) => Resolution::KeepLocal(RemoteCall::insert(local.clone())),
        (Some(local), Some(remote)) => {
            if local.last_modified() > remote.last_modified() {
                Resolution::KeepLocal(RemoteCall::update(local.clone()))
            } else {
                Resolution::AdoptRemote
            }
        }
        (None, None) => Resolution::Forget,
    }
}

/// Merge two replicas
pub fn reconcile(local: &Collection, remote: &Collection, tombstones: &Tombstones) -> MergeOutcome {
    let all_ids: BTreeSet<&ItemId> = local
        .ids()
        .chain(remote.ids())
        .chain(tombstones.iter().map(|(id, _)| id))
        .collect();

    let mut merged = Collection::new();
    let mut pending = Tombstones::new();
    let mut corrective = Vec::new();
    let mut report = SyncReport::default();

    for id in all_ids {
        let local_item = local.get(id);
        let remote_item = remote.get(id);
        let deleted_at = tombstones.get(id);

        match resolve(local_item, remote_item, deleted_at) {
            Resolution::AdoptRemote => {
                if let Some(remote_item) = remote_item {
                    if local_item == Some(remote_item) {
                        report.unchanged += 1;
                    } else {
                        report.adopted_remote += 1;
                    }
                    merged.insert(remote_item.clone());
                }
            }
            Resolution::KeepLocal(call) => {
                if let Some(local_item) = local_item {
                    if remote_item.is_some() {
                        report.pushed_newer += 1;
                    } else {
                        report.pushed_new += 1;
                    }
                    merged.insert(local_item.clone());
                    corrective.push(call);
                }
            }
            Resolution::PropagateDelete => {
                if let Some(deleted_at) = deleted_at {
                    pending.record(id.clone(), deleted_at);
                }
                report.deleted_remote += 1;
                corrective.push(RemoteCall::delete(id.clone()));
            }
            Resolution::Forget => {}
        }
    }

    MergeOutcome {
        merged,
        tombstones: pending,
        corrective,
        report,
    }
}
