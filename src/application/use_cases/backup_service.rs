//! Snapshot and restore of the store file.
//!
//! Both operations are plain file copies. Restoring overwrites the live store in place
//! and is not coordinated with statements running at the same moment. Only snapshots
//! inside the backup directory can be restored, addressed by file name.

use crate::domain::backup::{BackupInfo, BackupOutcome};
use crate::domain::error::{AppError, Result};
use crate::infrastructure::config::BackupConfig;
use chrono::{DateTime, Local, Utc};
use std::fs;
use std::path::PathBuf;
use tracing::{error, info};

fn io_err(msg: impl Into<String>) -> AppError {
    AppError::IoError(msg.into())
}

#[derive(Debug, Clone)]
pub struct BackupService {
    db_path: PathBuf,
    config: BackupConfig,
}

impl BackupService {
    pub fn new(db_path: impl Into<PathBuf>, config: BackupConfig) -> Self {
        Self {
            db_path: db_path.into(),
            config,
        }
    }

    /// Copies the live store to `<dir>/<prefix>_<YYYYmmdd-HHMMSS>.db`.
    /// A second snapshot within the same second overwrites the first.
    pub fn create_backup(&self) -> BackupOutcome {
        match self.copy_to_snapshot() {
            Ok(path) => {
                info!("Backup created at {}", path.display());
                let message = format!("Backup created: {}", path.display());
                BackupOutcome::ok(message, path)
            }
            Err(e) => {
                error!("Backup of {} failed: {}", self.db_path.display(), e);
                BackupOutcome::failed(format!("Backup failed: {}", e))
            }
        }
    }

    fn copy_to_snapshot(&self) -> Result<PathBuf> {
        fs::create_dir_all(&self.config.dir).map_err(|e| {
            io_err(format!(
                "Failed to create backup dir {}: {e}",
                self.config.dir.display()
            ))
        })?;

        let timestamp = Local::now().format("%Y%m%d-%H%M%S");
        let backup_path = self
            .config
            .dir
            .join(format!("{}_{}.db", self.config.prefix, timestamp));

        fs::copy(&self.db_path, &backup_path).map_err(|e| {
            io_err(format!(
                "Failed to copy {} to {}: {e}",
                self.db_path.display(),
                backup_path.display()
            ))
        })?;

        Ok(backup_path)
    }

    /// Copies the snapshot `file_name` from the backup directory over the live store.
    /// No pre-restore snapshot is taken.
    pub fn restore_backup(&self, file_name: &str) -> BackupOutcome {
        let backup_path = match self.snapshot_path(file_name) {
            Ok(path) => path,
            Err(e) => {
                error!("Refusing restore from {:?}: {}", file_name, e);
                return BackupOutcome::failed(format!("Restore failed: {}", e));
            }
        };

        match fs::copy(&backup_path, &self.db_path) {
            Ok(_) => {
                info!(
                    "Restored {} from {}",
                    self.db_path.display(),
                    backup_path.display()
                );
                BackupOutcome::ok(
                    format!("Database restored from {}", backup_path.display()),
                    backup_path,
                )
            }
            Err(e) => {
                error!("Restore from {} failed: {}", backup_path.display(), e);
                BackupOutcome::failed(format!("Restore failed: {}", e))
            }
        }
    }

    /// Resolves a bare snapshot name (`<prefix>_*.db`) under the backup directory.
    fn snapshot_path(&self, file_name: &str) -> Result<PathBuf> {
        let name = file_name.trim();
        let expected_prefix = format!("{}_", self.config.prefix);

        if name.is_empty()
            || name.contains(['/', '\\'])
            || name.contains("..")
            || !name.starts_with(&expected_prefix)
            || !name.ends_with(".db")
        {
            return Err(AppError::ValidationError(format!(
                "{:?} is not a snapshot name of the form {}<timestamp>.db",
                name, expected_prefix
            )));
        }

        let path = self.config.dir.join(name);
        if !path.is_file() {
            return Err(AppError::NotFound(format!(
                "backup file {} not found",
                path.display()
            )));
        }
        Ok(path)
    }

    /// Snapshots carrying the configured prefix, newest first.
    pub fn list_backups(&self) -> Result<Vec<BackupInfo>> {
        let mut backups = Vec::new();

        if !self.config.dir.exists() {
            return Ok(backups);
        }

        for entry in fs::read_dir(&self.config.dir).map_err(|e| {
            io_err(format!(
                "Failed to read backup dir {}: {e}",
                self.config.dir.display()
            ))
        })? {
            let entry = entry.map_err(|e| io_err(format!("Failed dir entry: {e}")))?;
            let path = entry.path();

            if !path.is_file() {
                continue;
            }

            let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
            if !file_name.starts_with(&self.config.prefix) {
                continue;
            }

            let meta = entry
                .metadata()
                .map_err(|e| io_err(format!("Failed to stat {}: {e}", path.display())))?;

            backups.push(BackupInfo {
                path: path.clone(),
                file_name: file_name.to_string(),
                size_bytes: meta.len(),
                modified: meta.modified().ok().map(DateTime::<Utc>::from),
            });
        }

        // Names embed the timestamp; break mtime ties with them.
        backups.sort_by(|a, b| {
            b.modified
                .cmp(&a.modified)
                .then_with(|| b.file_name.cmp(&a.file_name))
        });

        Ok(backups)
    }
}
