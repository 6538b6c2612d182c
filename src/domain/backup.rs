use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// `{success, message}` pair returned by backup and restore.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupOutcome {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl BackupOutcome {
    pub fn ok(message: impl Into<String>, path: PathBuf) -> Self {
        Self {
            success: true,
            message: message.into(),
            path: Some(path),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            path: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupInfo {
    pub path: PathBuf,
    pub file_name: String,
    pub size_bytes: u64,
    pub modified: Option<chrono::DateTime<chrono::Utc>>,
}
