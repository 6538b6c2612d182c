use super::sqlite::SqliteStore;
use crate::domain::error::{AppError, Result};
use crate::domain::schema::{ColumnInfo, SchemaDescriptor};
use sqlx::{Connection, Row};
use std::collections::BTreeMap;
use tracing::debug;

/// Reads table and column metadata from the live store.
#[derive(Debug, Clone)]
pub struct SchemaIntrospector {
    store: SqliteStore,
}

impl SchemaIntrospector {
    pub fn new(store: SqliteStore) -> Self {
        Self { store }
    }

    /// Snapshot of every user table. SQLite's internal `sqlite_*` tables are skipped.
    pub async fn introspect(&self) -> Result<SchemaDescriptor> {
        let mut conn = self.store.connect().await?;

        let table_names: Vec<String> = sqlx::query_scalar(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )
        .fetch_all(&mut conn)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to list tables: {}", e)))?;

        let mut tables = BTreeMap::new();
        for table in table_names {
            let pragma = format!("PRAGMA table_info(\"{}\")", table.replace('"', "\"\""));
            let rows = sqlx::query(&pragma)
                .fetch_all(&mut conn)
                .await
                .map_err(|e| {
                    AppError::DatabaseError(format!("Failed to inspect {} schema: {}", table, e))
                })?;

            let mut columns = Vec::with_capacity(rows.len());
            for row in rows {
                let name: String = row.try_get("name").map_err(|e| {
                    AppError::DatabaseError(format!("Failed to read {} schema: {}", table, e))
                })?;
                let data_type: String = row.try_get("type").unwrap_or_default();
                columns.push(ColumnInfo { name, data_type });
            }
            tables.insert(table, columns);
        }

        let _ = conn.close().await;
        debug!(tables = tables.len(), "Introspected schema");
        Ok(SchemaDescriptor { tables })
    }

    /// Introspects and renders the `Table: name` / `column (TYPE)` listing.
    pub async fn describe(&self) -> Result<String> {
        Ok(self.introspect().await?.describe())
    }
}
