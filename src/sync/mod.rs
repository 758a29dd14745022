//! Sync Layer
//!
//! Last-write-wins reconciliation between the local and remote replicas.

mod coordinator;
mod reconciler;

pub use coordinator::{SyncCoordinator, SyncOutcome, SyncStatus};
pub use reconciler::{reconcile, resolve, MergeOutcome, Resolution, SyncReport};
