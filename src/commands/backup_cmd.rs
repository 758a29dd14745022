//! Backup Commands

use std::path::PathBuf;

use serde::Serialize;

use crate::backup;
use crate::AppState;

/// Backup contents plus the suggested file name
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupFile {
    pub file_name: String,
    pub contents: String,
}

pub async fn export_backup(state: &AppState) -> Result<BackupFile, String> {
    let contents = state.list.export().await.map_err(|e| e.to_string())?;
    Ok(BackupFile {
        file_name: backup::backup_file_name(chrono::Local::now().date_naive()),
        contents,
    })
}

/// Replace everything with the backup; returns the item count
pub async fn import_backup(state: &AppState, contents: String) -> Result<usize, String> {
    state.list.import(&contents).await.map_err(|e| e.to_string())
}

pub async fn export_backup_to_file(state: &AppState, path: String) -> Result<(), String> {
    backup::export_to_file(&state.list, &PathBuf::from(path))
        .await
        .map_err(|e| e.to_string())
}

pub async fn import_backup_from_file(state: &AppState, path: String) -> Result<usize, String> {
    backup::import_from_file(&state.list, &PathBuf::from(path))
        .await
        .map_err(|e| e.to_string())
}
