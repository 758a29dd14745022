//! Backup files
//!
//! A backup is a pretty-printed JSON array of items. Importing checks the
//! top-level shape first and rejects the whole file on any mismatch.

use std::path::Path;

use chrono::NaiveDate;

use crate::domain::{Collection, DomainError, DomainResult};
use crate::pipeline::BucketList;

pub fn export_backup(items: &Collection) -> DomainResult<String> {
    serde_json::to_string_pretty(items).map_err(|e| DomainError::Internal(e.to_string()))
}

/// `bucket_backup_YYYY-MM-DD.json`
pub fn backup_file_name(date: NaiveDate) -> String {
    format!("bucket_backup_{}.json", date.format("%Y-%m-%d"))
}

pub fn parse_backup(json: &str) -> DomainResult<Collection> {
    let value: serde_json::Value =
        serde_json::from_str(json).map_err(|e| DomainError::MalformedImport(e.to_string()))?;
    if !value.is_array() {
        return Err(DomainError::MalformedImport("expected a JSON array of items".to_string()));
    }
    serde_json::from_value(value).map_err(|e| DomainError::MalformedImport(e.to_string()))
}

/// Write the current collection to `path`
pub async fn export_to_file(list: &BucketList, path: &Path) -> DomainResult<()> {
    let json = export_backup(&list.items().await)?;
    tokio::fs::write(path, json)
        .await
        .map_err(|e| DomainError::Internal(format!("Failed to write {}: {}", path.display(), e)))?;
    log::info!("Exported backup to {}", path.display());
    Ok(())
}

/// Replace the collection with the contents of `path`
pub async fn import_from_file(list: &BucketList, path: &Path) -> DomainResult<usize> {
    let json = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| DomainError::MalformedImport(format!("Failed to read {}: {}", path.display(), e)))?;
    list.import(&json).await
}
