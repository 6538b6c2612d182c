//! Audit log for mutating statements.
//!
//! Records live in the `audit_log` table of the same store the statements run against.
//! Writes are fire-and-forget: a failed append is reported through `tracing` and never
//! surfaces to the caller whose statement it describes.

use crate::domain::audit::{AuditAction, AuditRecord};
use crate::domain::error::{AppError, Result};
use crate::infrastructure::db::sqlite::SqliteStore;
use sqlx::Connection;
use tracing::{error, info};

const CREATE_AUDIT_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS audit_log (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user TEXT,
        action TEXT,
        table_name TEXT,
        record_id TEXT,
        details TEXT,
        timestamp DATETIME DEFAULT CURRENT_TIMESTAMP
    )
"#;

#[derive(Debug, Clone)]
pub struct AuditService {
    store: SqliteStore,
}

impl AuditService {
    pub fn new(store: SqliteStore) -> Self {
        Self { store }
    }

    /// Creates `audit_log` when the store does not have it yet.
    pub async fn ensure_table(&self) -> Result<()> {
        let mut conn = self.store.connect().await?;
        let outcome = sqlx::query(CREATE_AUDIT_TABLE).execute(&mut conn).await;
        let _ = conn.close().await;
        outcome
            .map(|_| ())
            .map_err(|e| AppError::DatabaseError(format!("Failed to create audit_log: {}", e)))
    }

    /// Appends one record. Failures are logged, not returned.
    pub async fn record(
        &self,
        user: &str,
        action: AuditAction,
        table_name: &str,
        record_id: &str,
        details: &str,
    ) {
        match self.insert(user, action, table_name, record_id, details).await {
            Ok(id) => info!(
                "Audit entry {} recorded: user={}, action={}, table={}",
                id, user, action, table_name
            ),
            Err(e) => error!(
                "[AUDIT ERROR] Failed to record {} on {} by {}: {}",
                action, table_name, user, e
            ),
        }
    }

    async fn insert(
        &self,
        user: &str,
        action: AuditAction,
        table_name: &str,
        record_id: &str,
        details: &str,
    ) -> Result<i64> {
        let mut conn = self.store.connect().await?;
        let result = sqlx::query(
            r#"
            INSERT INTO audit_log (user, action, table_name, record_id, details)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(user)
        .bind(action.as_str())
        .bind(table_name)
        .bind(record_id)
        .bind(details)
        .execute(&mut conn)
        .await;
        let _ = conn.close().await;

        result
            .map(|done| done.last_insert_rowid())
            .map_err(|e| AppError::DatabaseError(format!("Failed to create audit log: {}", e)))
    }

    /// Newest records first.
    pub async fn recent(&self, limit: i64) -> Result<Vec<AuditRecord>> {
        let limit = limit.clamp(1, 500);
        let mut conn = self.store.connect().await?;

        let rows = sqlx::query_as::<
            _,
            (
                i64,
                Option<String>,
                Option<String>,
                Option<String>,
                Option<String>,
                Option<String>,
                Option<String>,
            ),
        >(
            r#"
            SELECT id, user, action, table_name, record_id, details, CAST(timestamp AS TEXT)
            FROM audit_log
            ORDER BY id DESC
            LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(&mut conn)
        .await;
        let _ = conn.close().await;

        let rows =
            rows.map_err(|e| AppError::DatabaseError(format!("Failed to fetch audit logs: {}", e)))?;

        Ok(rows
            .into_iter()
            .map(
                |(id, user, action, table_name, record_id, details, timestamp)| AuditRecord {
                    id,
                    user: user.unwrap_or_default(),
                    action: action.unwrap_or_default(),
                    table_name: table_name.unwrap_or_default(),
                    record_id: record_id.unwrap_or_default(),
                    details: details.unwrap_or_default(),
                    timestamp: timestamp.unwrap_or_default(),
                },
            )
            .collect())
    }
}
