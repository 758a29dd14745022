//! Configuration
//!
//! `AppConfig` fixes where things live on disk. The remote endpoint is kept
//! separately in `sync_config.json` so it can be changed at runtime.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::{DomainError, DomainResult};
use crate::gateway::{parse_endpoint, DEFAULT_TIMEOUT};

const SYNC_CONFIG_FILE: &str = "sync_config.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub log_dir: PathBuf,
    pub db_file_name: String,
    pub app_name: String,
    pub request_timeout: Duration,
}

impl AppConfig {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        Self {
            log_dir: data_dir.join("logs"),
            data_dir,
            db_file_name: "bucket_list.db".to_string(),
            app_name: "BucketList".to_string(),
            request_timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(&self.db_file_name)
    }
}

/// Remote endpoint settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    pub endpoint: String,
}

fn sync_config_path(data_dir: &Path) -> PathBuf {
    data_dir.join(SYNC_CONFIG_FILE)
}

/// Saved endpoint, if any; an unreadable file counts as none
pub fn get_sync_config(data_dir: &Path) -> Option<SyncConfig> {
    let path = sync_config_path(data_dir);
    let raw = std::fs::read_to_string(&path).ok()?;
    match serde_json::from_str::<SyncConfig>(&raw) {
        Ok(config) => Some(config),
        Err(e) => {
            log::warn!("Ignoring unreadable {}: {}", path.display(), e);
            None
        }
    }
}

/// Validate and save the endpoint
pub fn configure_sync(data_dir: &Path, endpoint: &str) -> DomainResult<SyncConfig> {
    let url = parse_endpoint(endpoint)?;
    let config = SyncConfig {
        endpoint: url.to_string(),
    };

    std::fs::create_dir_all(data_dir)
        .map_err(|e| DomainError::Internal(format!("Failed to create {}: {}", data_dir.display(), e)))?;
    let json = serde_json::to_string_pretty(&config).map_err(|e| DomainError::Internal(e.to_string()))?;
    std::fs::write(sync_config_path(data_dir), json)
        .map_err(|e| DomainError::Internal(format!("Failed to save sync config: {}", e)))?;

    log::info!("Sync endpoint configured: {}", config.endpoint);
    Ok(config)
}

/// Forget the endpoint; the app goes back to local-only
pub fn clear_sync(data_dir: &Path) -> DomainResult<()> {
    let path = sync_config_path(data_dir);
    match std::fs::remove_file(&path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(DomainError::Internal(format!("Failed to remove {}: {}", path.display(), e))),
    }
}
