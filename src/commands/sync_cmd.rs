//! Cloud Sync Commands
//!
//! Manage the remote endpoint and trigger reconciliation.

use std::sync::Arc;

use crate::config::{self, SyncConfig};
use crate::gateway::{HttpGateway, OfflineGateway};
use crate::sync::{SyncOutcome, SyncStatus};
use crate::AppState;

/// Reconcile with the remote now
pub async fn sync_now(state: &AppState) -> Result<SyncOutcome, String> {
    Ok(state.sync.sync().await)
}

pub async fn get_sync_status(state: &AppState) -> Result<SyncStatus, String> {
    Ok(state.sync.status())
}

pub async fn get_cloud_sync_config(state: &AppState) -> Result<Option<SyncConfig>, String> {
    Ok(config::get_sync_config(&state.config.data_dir))
}

pub async fn is_cloud_sync_enabled(state: &AppState) -> Result<bool, String> {
    Ok(config::get_sync_config(&state.config.data_dir).is_some())
}

/// Save the endpoint, switch to it and pull right away
pub async fn configure_cloud_sync(state: &AppState, endpoint: String) -> Result<SyncOutcome, String> {
    let saved = config::configure_sync(&state.config.data_dir, &endpoint).map_err(|e| e.to_string())?;
    let gateway = HttpGateway::new(&saved.endpoint, state.config.request_timeout).map_err(|e| e.to_string())?;

    // calls already in flight finish against the old remote
    state.list.flush_remote().await;
    state.sync.set_gateway(Arc::new(gateway));
    Ok(state.sync.sync().await)
}

/// Forget the endpoint and keep working local-only
pub async fn disable_cloud_sync(state: &AppState) -> Result<(), String> {
    config::clear_sync(&state.config.data_dir).map_err(|e| e.to_string())?;
    state.list.flush_remote().await;
    state.sync.set_gateway(Arc::new(OfflineGateway));
    log::info!("Cloud sync disabled");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::tests::fixture;
    use crate::commands::create_item;

    #[tokio::test]
    async fn test_sync_now_pushes_local_items() {
        let f = fixture().await;
        f.remote.set_online(false);
        let item = create_item(&f.state, "Skydive".into(), None).await.unwrap();
        f.state.list.flush_remote().await;
        f.remote.set_online(true);

        assert!(matches!(sync_now(&f.state).await.unwrap(), SyncOutcome::Synced { .. }));
        f.state.list.flush_remote().await;
        assert!(f.remote.snapshot().contains(&item.id));

        let status = get_sync_status(&f.state).await.unwrap();
        assert!(status.last_synced_at.is_some());
        assert!(!status.in_progress);
    }

    #[tokio::test]
    async fn test_invalid_endpoint_keeps_current_remote() {
        let f = fixture().await;
        assert!(configure_cloud_sync(&f.state, "not a url".into()).await.is_err());
        assert!(!is_cloud_sync_enabled(&f.state).await.unwrap());
        assert_eq!(get_cloud_sync_config(&f.state).await.unwrap(), None);

        create_item(&f.state, "Still synced".into(), None).await.unwrap();
        f.state.list.flush_remote().await;
        assert_eq!(f.remote.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_disable_goes_local_only() {
        let f = fixture().await;
        config::configure_sync(&f.state.config.data_dir, "https://example.com/exec").unwrap();
        assert!(is_cloud_sync_enabled(&f.state).await.unwrap());

        disable_cloud_sync(&f.state).await.unwrap();
        assert!(!is_cloud_sync_enabled(&f.state).await.unwrap());
        assert!(matches!(sync_now(&f.state).await.unwrap(), SyncOutcome::Offline { .. }));

        create_item(&f.state, "Offline now".into(), None).await.unwrap();
        f.state.list.flush_remote().await;
        assert!(f.remote.calls().is_empty());
    }
}
