use crate::domain::error::{AppError, Result};
use base64::Engine;
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqliteRow};
use sqlx::{Column, Connection, Executor, Row, Statement, TypeInfo, ValueRef};
use std::path::{Path, PathBuf};

/// Columns and rows produced by one statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatementOutput {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
    pub rows_affected: u64,
}

/// Handle to the store file. Every call opens its own connection and closes it
/// before returning; nothing is pooled or kept alive between calls.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    path: PathBuf,
}

impl SqliteStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn connect(&self) -> Result<SqliteConnection> {
        self.open().await.map_err(|e| {
            AppError::DatabaseError(format!(
                "Failed to open {}: {}",
                self.path.display(),
                e
            ))
        })
    }

    async fn open(&self) -> std::result::Result<SqliteConnection, sqlx::Error> {
        let options = SqliteConnectOptions::new()
            .filename(&self.path)
            .create_if_missing(true);
        SqliteConnection::connect_with(&options).await
    }

    /// Runs one statement inside a transaction and commits on success.
    ///
    /// The raw `sqlx::Error` is returned so callers can tell statement errors
    /// reported by SQLite apart from I/O or connection failures.
    pub async fn run_statement(
        &self,
        sql: &str,
        returns_rows: bool,
    ) -> std::result::Result<StatementOutput, sqlx::Error> {
        let mut conn = self.open().await?;
        let outcome = run_in_transaction(&mut conn, sql, returns_rows).await;
        let _ = conn.close().await;
        outcome
    }
}

async fn run_in_transaction(
    conn: &mut SqliteConnection,
    sql: &str,
    returns_rows: bool,
) -> std::result::Result<StatementOutput, sqlx::Error> {
    let mut tx = conn.begin().await?;

    let output = if returns_rows {
        // Preparing first yields column names even when no row comes back.
        let statement = (&mut *tx).prepare(sql).await?;
        let columns = statement
            .columns()
            .iter()
            .map(|c| c.name().to_string())
            .collect();
        let fetched = statement.query().fetch_all(&mut *tx).await?;
        StatementOutput {
            columns,
            rows: fetched.iter().map(row_values).collect(),
            rows_affected: 0,
        }
    } else {
        let done = sqlx::query(sql).execute(&mut *tx).await?;
        StatementOutput {
            columns: Vec::new(),
            rows: Vec::new(),
            rows_affected: done.rows_affected(),
        }
    };

    tx.commit().await?;
    Ok(output)
}

fn row_values(row: &SqliteRow) -> Vec<Value> {
    (0..row.columns().len())
        .map(|index| extract_column_value(row, index))
        .collect()
}

/// Converts a cell to JSON using its runtime storage class.
fn extract_column_value(row: &SqliteRow, index: usize) -> Value {
    let kind = match row.try_get_raw(index) {
        Ok(raw) if raw.is_null() => return Value::Null,
        Ok(raw) => raw.type_info().name().to_string(),
        Err(_) => return Value::Null,
    };

    match kind.as_str() {
        "INTEGER" | "BOOLEAN" => row
            .try_get::<i64, _>(index)
            .map(Value::from)
            .unwrap_or(Value::Null),
        "REAL" | "NUMERIC" => row
            .try_get::<f64, _>(index)
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        "BLOB" => row
            .try_get::<Vec<u8>, _>(index)
            .map(|bytes| Value::String(base64::engine::general_purpose::STANDARD.encode(bytes)))
            .unwrap_or(Value::Null),
        _ => row
            .try_get::<String, _>(index)
            .map(Value::String)
            .unwrap_or(Value::Null),
    }
}
