//! Bucket List Backend
//!
//! Local-first list of life goals, mirrored to a remote JSON endpoint.
//!
//! Layered architecture:
//! - domain: Item entity, collection, clock and errors
//! - repository: Local replica over SQLite
//! - gateway: Remote endpoint access and fire-and-forget dispatch
//! - sync: Last-write-wins reconciliation
//! - pipeline: Local-first mutations
//! - backup, view, config: Export/import, display projections, settings
//! - commands: String-error handlers the UI binds to

use std::sync::Arc;

pub mod backup;
pub mod commands;
pub mod config;
pub mod domain;
pub mod gateway;
pub mod pipeline;
pub mod repository;
pub mod sync;
pub mod view;

use config::{get_sync_config, AppConfig};
use domain::{Clock, DomainResult, SystemClock};
use gateway::{HttpGateway, OfflineGateway, RemoteGateway};
use pipeline::BucketList;
use repository::{init_db, DbState, LocalReplica, SqliteStore};
use sync::SyncCoordinator;

/// Application state shared across commands
pub struct AppState {
    pub list: Arc<BucketList>,
    pub sync: Arc<SyncCoordinator>,
    pub config: AppConfig,
    db_state: Option<DbState>,
}

/// HTTP gateway for the saved endpoint, or an offline one
pub(crate) fn gateway_for(config: &AppConfig) -> Arc<dyn RemoteGateway> {
    let Some(sync_config) = get_sync_config(&config.data_dir) else {
        log::info!("No sync endpoint configured, running local-only");
        return Arc::new(OfflineGateway);
    };
    match HttpGateway::new(&sync_config.endpoint, config.request_timeout) {
        Ok(gateway) => Arc::new(gateway),
        Err(e) => {
            log::warn!("Sync endpoint unusable ({}), running local-only", e);
            Arc::new(OfflineGateway)
        }
    }
}

impl AppState {
    /// Open local storage, pick the remote and run the startup sync
    pub async fn start(config: AppConfig) -> DomainResult<Self> {
        if let Err(e) = rolling_logger::init_logger(config.log_dir.clone(), &config.app_name) {
            eprintln!("Failed to init logger: {}", e);
        }
        if let Some(path) = rolling_logger::log_file_path() {
            log::info!("Logging to {}", path.display());
        }
        log::info!("Starting with data dir {}", config.data_dir.display());

        let db_state = match init_db(&config.db_path()).await {
            Ok(db_state) => {
                let _ = rolling_logger::info("Local store ready");
                db_state
            }
            Err(e) => {
                let _ = rolling_logger::error(&format!("Local store failed to open: {}", e));
                return Err(e);
            }
        };
        let replica = LocalReplica::new(Arc::new(SqliteStore::new(db_state.conn.clone())));
        let gateway = gateway_for(&config);

        let mut state = Self::with_parts(config, replica, gateway, Arc::new(SystemClock::new())).await;
        state.db_state = Some(db_state);

        match state.sync.sync().await {
            sync::SyncOutcome::Synced { report } => log::info!("Startup sync done: {:?}", report),
            other => {
                let _ = rolling_logger::warn(&format!("Startup sync did not complete: {:?}", other));
            }
        }
        Ok(state)
    }

    /// Assemble from explicit parts; no logger, no startup sync
    pub async fn with_parts(
        config: AppConfig,
        replica: LocalReplica,
        gateway: Arc<dyn RemoteGateway>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let list = Arc::new(BucketList::open(replica, gateway, clock).await);
        let sync = Arc::new(SyncCoordinator::new(&list));
        Self {
            list,
            sync,
            config,
            db_state: None,
        }
    }

    /// Wait for in-flight remote calls, then close the database
    pub async fn shutdown(&self) {
        self.list.flush_remote().await;
        if let Some(db_state) = &self.db_state {
            db_state.close().await;
        }
        log::info!("Shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ItemId;

    #[tokio::test]
    async fn test_start_local_only_and_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::new(dir.path());

        let state = AppState::start(config.clone()).await.unwrap();
        let item = state.list.add("See the aurora", "travel").await.unwrap();
        assert!(matches!(
            state.sync.status().last_outcome,
            Some(sync::SyncOutcome::Offline { .. })
        ));
        state.shutdown().await;

        let reopened = AppState::start(config).await.unwrap();
        assert_eq!(reopened.list.get(&item.id).await, Some(item));
        reopened.shutdown().await;
    }

    #[tokio::test]
    async fn test_unconfigured_gateway_is_offline() {
        let dir = tempfile::tempdir().unwrap();
        let gateway = gateway_for(&AppConfig::new(dir.path()));

        assert!(gateway.list_all().await.unwrap_err().is_remote());
        assert!(gateway.delete(&ItemId::from("x")).await.unwrap_err().is_remote());
    }
}
