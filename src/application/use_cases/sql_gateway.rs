//! Execution gateway: allow-list, execution, suggestion fallback and audit.
//!
//! Every statement, whether typed by a user or produced by the translator, goes
//! through [`SqlGateway::execute`]. Failures come back as [`ExecutionResult::Failure`];
//! nothing here returns `Err` to the caller.
//!
//! The audit trail itself is read-only from here: INSERT, UPDATE and DELETE aimed at
//! `audit_log` are refused before they reach the store.

use super::audit_service::AuditService;
use super::column_suggester::ColumnSuggester;
use super::statement_allowlist::{validate_statement, StatementKind};
use crate::domain::audit::{AUDIT_TABLE, NO_RECORD_ID, UNKNOWN_TABLE};
use crate::domain::query::{ExecutionResult, Suggestions};
use crate::domain::session::SessionContext;
use crate::infrastructure::db::schema::SchemaIntrospector;
use crate::infrastructure::db::sqlite::SqliteStore;
use tracing::{debug, info, warn};

pub const AUDIT_READ_ONLY_MESSAGE: &str = "The audit log is read-only.";

#[derive(Clone)]
pub struct SqlGateway {
    store: SqliteStore,
    introspector: SchemaIntrospector,
    audit: AuditService,
    suggester: ColumnSuggester,
}

impl SqlGateway {
    pub fn new(store: SqliteStore, audit: AuditService) -> Self {
        Self {
            introspector: SchemaIntrospector::new(store.clone()),
            store,
            audit,
            suggester: ColumnSuggester::default(),
        }
    }

    pub fn with_suggester(mut self, suggester: ColumnSuggester) -> Self {
        self.suggester = suggester;
        self
    }

    pub async fn execute(&self, statement: &str, session: &SessionContext) -> ExecutionResult {
        let kind = match validate_statement(statement) {
            Ok(kind) => kind,
            Err(rejection) => {
                warn!(
                    "Rejected statement from {}: {} ({:?})",
                    session.user, rejection, rejection
                );
                return ExecutionResult::failure(rejection.to_string());
            }
        };

        if kind.audit_action().is_some() && is_audit_table(&target_table(statement, kind)) {
            warn!("Refused {:?} on {} from {}", kind, AUDIT_TABLE, session.user);
            return ExecutionResult::failure(AUDIT_READ_ONLY_MESSAGE);
        }

        let output = match self.store.run_statement(statement, kind.returns_rows()).await {
            Ok(output) => output,
            Err(sqlx::Error::Database(db_err)) => {
                let message = db_err.message().to_string();
                warn!("Statement failed for {}: {}", session.user, message);
                let suggestions = self.suggest(statement).await;
                return ExecutionResult::failure_with_suggestions(message, suggestions);
            }
            Err(e) => {
                warn!("Statement could not run for {}: {}", session.user, e);
                return ExecutionResult::failure(e.to_string());
            }
        };

        if let Some(action) = kind.audit_action() {
            let table = target_table(statement, kind);
            info!(
                "{} on {} by {} affected {} row(s)",
                action, table, session.user, output.rows_affected
            );
            self.audit
                .record(
                    &session.user,
                    action,
                    &table,
                    NO_RECORD_ID,
                    &format!("Query: {}", statement),
                )
                .await;
        } else {
            debug!("SELECT returned {} row(s)", output.rows.len());
        }

        ExecutionResult::rows(output.columns, output.rows)
    }

    async fn suggest(&self, statement: &str) -> Suggestions {
        match self.introspector.introspect().await {
            Ok(schema) => self.suggester.suggest(statement, &schema),
            Err(e) => {
                warn!("Schema unavailable for suggestions: {}", e);
                Suggestions::new()
            }
        }
    }
}

/// Best-effort target table read positionally from the statement text.
/// Falls back to `"unknown"`; never fails.
pub fn target_table(statement: &str, kind: StatementKind) -> String {
    let tokens: Vec<&str> = statement.split_whitespace().collect();
    let position_after = |keyword: &str| {
        tokens
            .iter()
            .position(|t| t.eq_ignore_ascii_case(keyword))
            .map(|i| i + 1)
    };

    let index = match kind {
        StatementKind::Insert => position_after("INTO"),
        // UPDATE [OR <conflict>] table SET ...
        StatementKind::Update => match tokens.get(1) {
            Some(t) if t.eq_ignore_ascii_case("OR") => Some(3),
            _ => Some(1),
        },
        StatementKind::Delete => position_after("FROM"),
        StatementKind::Select => None,
    };

    index
        .and_then(|i| tokens.get(i))
        .map(|token| clean_identifier(token))
        .filter(|name| !name.is_empty() && !name.eq_ignore_ascii_case("SET"))
        .unwrap_or_else(|| UNKNOWN_TABLE.to_string())
}

/// Matches `audit_log` with or without a schema qualifier such as `main.`.
fn is_audit_table(table: &str) -> bool {
    let name = table.rsplit('.').next().unwrap_or(table);
    name.trim_matches(|c: char| matches!(c, '"' | '`' | '[' | ']'))
        .eq_ignore_ascii_case(AUDIT_TABLE)
}

fn clean_identifier(token: &str) -> String {
    let head = token.split('(').next().unwrap_or("");
    head.trim_matches(|c: char| matches!(c, '"' | '\'' | '`' | '[' | ']' | ';' | ','))
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn gateway() -> (tempfile::TempDir, SqlGateway, AuditService) {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::new(dir.path().join("company.db"));
        store
            .run_statement(
                "CREATE TABLE employees (employee_id INTEGER PRIMARY KEY, first_name TEXT, salary REAL)",
                false,
            )
            .await
            .unwrap();
        store
            .run_statement(
                "INSERT INTO employees (first_name, salary) VALUES ('Ada', 5000), ('Linus', 4200)",
                false,
            )
            .await
            .unwrap();
        let audit = AuditService::new(store.clone());
        audit.ensure_table().await.unwrap();
        (dir, SqlGateway::new(store, audit.clone()), audit)
    }

    #[test]
    fn test_target_table_positions() {
        assert_eq!(
            target_table("INSERT INTO clients (client_name) VALUES ('x')", StatementKind::Insert),
            "clients"
        );
        assert_eq!(
            target_table("insert into `clients`(client_name) values ('x')", StatementKind::Insert),
            "clients"
        );
        assert_eq!(
            target_table("UPDATE employees SET salary = 1", StatementKind::Update),
            "employees"
        );
        assert_eq!(
            target_table("UPDATE OR IGNORE invoices SET status = 'Paid'", StatementKind::Update),
            "invoices"
        );
        assert_eq!(
            target_table("DELETE FROM \"projects\";", StatementKind::Delete),
            "projects"
        );
    }

    #[test]
    fn test_target_table_falls_back_to_unknown() {
        assert_eq!(target_table("INSERT", StatementKind::Insert), "unknown");
        assert_eq!(target_table("DELETE", StatementKind::Delete), "unknown");
        assert_eq!(target_table("UPDATE", StatementKind::Update), "unknown");
        assert_eq!(target_table("SELECT 1", StatementKind::Select), "unknown");
    }

    #[tokio::test]
    async fn test_select_returns_rows_without_audit() {
        let (_dir, gateway, audit) = gateway().await;
        let result = gateway
            .execute(
                "SELECT first_name FROM employees ORDER BY employee_id",
                &SessionContext::system(),
            )
            .await;
        assert_eq!(
            result,
            ExecutionResult::rows(
                vec!["first_name".to_string()],
                vec![vec![json!("Ada")], vec![json!("Linus")]]
            )
        );
        assert!(audit.recent(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_mutation_writes_one_audit_record() {
        let (_dir, gateway, audit) = gateway().await;
        let sql = "UPDATE employees SET salary = salary + 100 WHERE first_name = 'Ada'";
        let result = gateway.execute(sql, &SessionContext::new("alice")).await;

        assert_eq!(result, ExecutionResult::rows(vec![], vec![]));
        let records = audit.recent(10).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].user, "alice");
        assert_eq!(records[0].action, "UPDATE");
        assert_eq!(records[0].table_name, "employees");
        assert_eq!(records[0].record_id, "N/A");
        assert!(records[0].details.contains(sql));
    }

    #[tokio::test]
    async fn test_rejected_statement_touches_nothing() {
        let (_dir, gateway, audit) = gateway().await;
        let result = gateway
            .execute("DROP TABLE employees;", &SessionContext::system())
            .await;
        assert!(result.is_error());

        let still_there = gateway
            .execute("SELECT COUNT(*) AS n FROM employees", &SessionContext::system())
            .await;
        assert_eq!(
            still_there,
            ExecutionResult::rows(vec!["n".to_string()], vec![vec![json!(2)]])
        );
        assert!(audit.recent(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_column_carries_suggestions() {
        let (_dir, gateway, audit) = gateway().await;
        let result = gateway
            .execute("SELECT slary FROM employees;", &SessionContext::system())
            .await;
        match result {
            ExecutionResult::Failure { error, suggestions } => {
                assert!(error.contains("no such column"));
                let suggestions = suggestions.unwrap();
                assert!(suggestions["employees"].contains(&"salary".to_string()));
            }
            other => panic!("expected failure, got {:?}", other),
        }
        assert!(audit.recent(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_mutation_is_not_audited() {
        let (_dir, gateway, audit) = gateway().await;
        let result = gateway
            .execute(
                "INSERT INTO missing_table (x) VALUES (1)",
                &SessionContext::system(),
            )
            .await;
        assert!(result.is_error());
        assert!(audit.recent(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_mutation_succeeds_without_audit_table() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::new(dir.path().join("company.db"));
        store
            .run_statement(
                "CREATE TABLE clients (client_id INTEGER PRIMARY KEY, client_name TEXT)",
                false,
            )
            .await
            .unwrap();
        let gateway = SqlGateway::new(store.clone(), AuditService::new(store));

        let result = gateway
            .execute(
                "INSERT INTO clients (client_name) VALUES ('Initech')",
                &SessionContext::new("alice"),
            )
            .await;
        assert_eq!(result, ExecutionResult::rows(vec![], vec![]));

        let persisted = gateway
            .execute("SELECT client_name FROM clients", &SessionContext::system())
            .await;
        assert_eq!(
            persisted,
            ExecutionResult::rows(
                vec!["client_name".to_string()],
                vec![vec![json!("Initech")]]
            )
        );
    }

    #[tokio::test]
    async fn test_audit_log_cannot_be_rewritten() {
        let (_dir, gateway, audit) = gateway().await;
        gateway
            .execute(
                "UPDATE employees SET salary = 1 WHERE first_name = 'Ada'",
                &SessionContext::new("alice"),
            )
            .await;
        let before = audit.recent(10).await.unwrap();
        assert_eq!(before.len(), 1);

        for sql in [
            "DELETE FROM audit_log",
            "delete from main.audit_log where id = 1",
            "UPDATE audit_log SET user = 'mallory'",
            "UPDATE OR IGNORE \"AUDIT_LOG\" SET details = ''",
            "INSERT INTO audit_log (user, action) VALUES ('mallory', 'DELETE')",
        ] {
            let result = gateway.execute(sql, &SessionContext::new("mallory")).await;
            assert_eq!(result, ExecutionResult::failure(AUDIT_READ_ONLY_MESSAGE), "{}", sql);
        }

        let after = audit.recent(10).await.unwrap();
        assert_eq!(after.len(), 1);
        assert_eq!(after[0].user, "alice");
        assert_eq!(after[0].details, before[0].details);

        let readable = gateway
            .execute("SELECT COUNT(*) AS n FROM audit_log", &SessionContext::system())
            .await;
        assert_eq!(
            readable,
            ExecutionResult::rows(vec!["n".to_string()], vec![vec![json!(1)]])
        );
    }
}
