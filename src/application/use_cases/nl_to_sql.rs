//! Natural-language question → SQL → result.
//!
//! The question is normalized, embedded in a prompt together with the live schema and
//! the synonym cheat-sheet, and sent to the generation service under a hard timeout.
//! SQL found in the reply goes through the [`SqlGateway`]; anything else is returned as
//! a one-cell `Answer` table.

use super::query_normalizer::{normalize, synonym_cheat_sheet};
use super::sql_extractor::{extract_sql, strip_reasoning};
use super::sql_gateway::SqlGateway;
use super::statement_allowlist::{leading_keyword, StatementKind};
use crate::domain::llm_config::LLMConfig;
use crate::domain::query::{ExecutionResult, Translation};
use crate::domain::schema::SchemaDescriptor;
use crate::domain::session::SessionContext;
use crate::infrastructure::db::schema::SchemaIntrospector;
use crate::infrastructure::llm_clients::LLMClient;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{debug, info, warn};

const SQL_PROMPT: &str = r#"You are an expert AI agent for SQL and reasoning.
Convert the user's question into a valid SQLite query for the company database below,
even when the question has spelling mistakes, broken English, incomplete words, or is
phrased as a puzzle.

Database schema:
{schema}
Vocabulary (user word → schema term):
{synonyms}

Guidelines:
1. If the request is database-related, reply with ONLY one SQL statement
   (SELECT, INSERT, UPDATE or DELETE). No explanation, no markdown.
   - Match column values loosely (e.g. "pendng" means 'Pending').
   - Use the closest existing table or column when the exact name is not present.
2. If the question is NOT database-related, answer in plain text.

Question: {question}
"#;

pub struct NlToSqlTranslator {
    llm_client: Arc<dyn LLMClient + Send + Sync>,
    config: LLMConfig,
    gateway: SqlGateway,
    introspector: SchemaIntrospector,
}

impl NlToSqlTranslator {
    pub fn new(
        llm_client: Arc<dyn LLMClient + Send + Sync>,
        config: LLMConfig,
        gateway: SqlGateway,
        introspector: SchemaIntrospector,
    ) -> Self {
        Self {
            llm_client,
            config,
            gateway,
            introspector,
        }
    }

    pub async fn translate(&self, question: &str, session: &SessionContext) -> Translation {
        let normalized = normalize(question);
        debug!("Normalized question: {}", normalized);

        let schema = match self.introspector.introspect().await {
            Ok(schema) => schema,
            Err(e) => {
                warn!("Cannot build prompt, schema unavailable: {}", e);
                return Translation {
                    sql: None,
                    result: ExecutionResult::failure(e.to_string()),
                };
            }
        };

        let prompt = render_prompt(&normalized, &schema);
        let raw = match self.generate(&prompt).await {
            Ok(raw) => raw,
            Err(message) => {
                return Translation {
                    sql: None,
                    result: ExecutionResult::failure(message),
                }
            }
        };

        let reply = strip_reasoning(&raw);
        if reply.is_empty() {
            warn!("Generation service returned an empty reply");
            return Translation {
                sql: None,
                result: ExecutionResult::failure("Generation service returned an empty response."),
            };
        }

        let candidate = extract_sql(&reply);
        let is_statement = leading_keyword(&candidate)
            .and_then(|keyword| StatementKind::from_keyword(&keyword))
            .is_some();

        if is_statement {
            info!("Generated SQL for {}: {}", session.user, candidate);
            let result = self.gateway.execute(&candidate, session).await;
            Translation {
                sql: Some(candidate),
                result,
            }
        } else {
            debug!("Reply is plain text, returning it as an answer");
            Translation {
                sql: None,
                result: ExecutionResult::answer(reply),
            }
        }
    }

    /// One bounded call. Timeouts and transport errors become a message.
    async fn generate(&self, prompt: &str) -> Result<String, String> {
        let limit = Duration::from_secs(self.config.timeout_secs);
        let started = Instant::now();

        match timeout(limit, self.llm_client.generate(&self.config, "", prompt)).await {
            Ok(Ok(response)) => {
                info!(
                    "Generation service answered in {} ms ({} chars)",
                    started.elapsed().as_millis(),
                    response.len()
                );
                Ok(response)
            }
            Ok(Err(e)) => {
                warn!("Generation service failed: {}", e);
                Err(e.to_string())
            }
            Err(_) => {
                warn!(
                    "Generation service timed out after {} s",
                    self.config.timeout_secs
                );
                Err(format!(
                    "Generation service timed out after {} seconds.",
                    self.config.timeout_secs
                ))
            }
        }
    }
}

pub fn render_prompt(normalized_question: &str, schema: &SchemaDescriptor) -> String {
    SQL_PROMPT
        .replace("{schema}", &schema.describe())
        .replace("{synonyms}", &synonym_cheat_sheet())
        .replace("{question}", normalized_question)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::use_cases::audit_service::AuditService;
    use crate::domain::error::{AppError, Result};
    use crate::infrastructure::db::sqlite::SqliteStore;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    struct ScriptedLlm {
        reply: Result<String>,
        delay: Option<Duration>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedLlm {
        fn replying(text: &str) -> Self {
            Self {
                reply: Ok(text.to_string()),
                delay: None,
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl LLMClient for ScriptedLlm {
        async fn generate(&self, _config: &LLMConfig, _system: &str, user: &str) -> Result<String> {
            self.prompts.lock().unwrap().push(user.to_string());
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            match &self.reply {
                Ok(text) => Ok(text.clone()),
                Err(e) => Err(AppError::LLMError(e.to_string())),
            }
        }
    }

    async fn translator(
        llm: Arc<ScriptedLlm>,
        timeout_secs: u64,
    ) -> (tempfile::TempDir, NlToSqlTranslator, AuditService) {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::new(dir.path().join("company.db"));
        store
            .run_statement(
                "CREATE TABLE employees (employee_id INTEGER PRIMARY KEY, first_name TEXT, phone_number TEXT)",
                false,
            )
            .await
            .unwrap();
        store
            .run_statement(
                "INSERT INTO employees (first_name, phone_number) VALUES ('Ada', '555-0101')",
                false,
            )
            .await
            .unwrap();
        let audit = AuditService::new(store.clone());
        audit.ensure_table().await.unwrap();

        let config = LLMConfig {
            timeout_secs,
            ..LLMConfig::default()
        };
        let translator = NlToSqlTranslator::new(
            llm,
            config,
            SqlGateway::new(store.clone(), audit.clone()),
            SchemaIntrospector::new(store),
        );
        (dir, translator, audit)
    }

    #[tokio::test]
    async fn test_sql_reply_is_executed() {
        let llm = Arc::new(ScriptedLlm::replying(
            "```sql\nSELECT first_name, phone_number FROM employees;\n```",
        ));
        let (_dir, translator, _audit) = translator(llm.clone(), 30).await;

        let translation = translator
            .translate("show mobile numbr of staff", &SessionContext::system())
            .await;

        assert_eq!(
            translation.sql.as_deref(),
            Some("SELECT first_name, phone_number FROM employees;")
        );
        assert_eq!(
            translation.result,
            ExecutionResult::rows(
                vec!["first_name".to_string(), "phone_number".to_string()],
                vec![vec![json!("Ada"), json!("555-0101")]]
            )
        );

        let prompts = llm.prompts.lock().unwrap();
        assert!(prompts[0].contains("Question: show mobile numbr of employees"));
        assert!(prompts[0].contains("Table: employees"));
        assert!(prompts[0].contains("phone_number"));
    }

    #[tokio::test]
    async fn test_plain_text_reply_becomes_answer() {
        let llm = Arc::new(ScriptedLlm::replying("Paris is the capital of France."));
        let (_dir, translator, _audit) = translator(llm, 30).await;

        let translation = translator
            .translate("what is the capital of France", &SessionContext::system())
            .await;

        assert_eq!(translation.sql, None);
        assert_eq!(
            translation.result,
            ExecutionResult::answer("Paris is the capital of France.")
        );
    }

    #[tokio::test]
    async fn test_generated_mutation_is_audited_for_session_user() {
        let llm = Arc::new(ScriptedLlm::replying(
            "<think>ok</think>DELETE FROM employees WHERE first_name = 'Ada';",
        ));
        let (_dir, translator, audit) = translator(llm, 30).await;

        let translation = translator
            .translate("remove Ada", &SessionContext::new("harjot"))
            .await;

        assert!(!translation.result.is_error());
        let records = audit.recent(5).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].user, "harjot");
        assert_eq!(records[0].table_name, "employees");
    }

    #[tokio::test]
    async fn test_non_dml_reply_is_returned_as_text() {
        let llm = Arc::new(ScriptedLlm::replying("DROP TABLE employees;"));
        let (_dir, translator, _audit) = translator(llm, 30).await;

        let translation = translator
            .translate("wipe everything", &SessionContext::system())
            .await;

        // No allowed keyword, so the reply is treated as text.
        assert_eq!(translation.sql, None);
        assert_eq!(
            translation.result,
            ExecutionResult::answer("DROP TABLE employees;")
        );
    }

    #[tokio::test]
    async fn test_transport_failure_is_error_result() {
        let llm = Arc::new(ScriptedLlm {
            reply: Err(AppError::LLMError("connection refused".to_string())),
            delay: None,
            prompts: Mutex::new(Vec::new()),
        });
        let (_dir, translator, _audit) = translator(llm, 30).await;

        let translation = translator.translate("list staff", &SessionContext::system()).await;
        assert_eq!(translation.sql, None);
        assert!(translation
            .result
            .error_message()
            .unwrap()
            .contains("connection refused"));
    }

    #[tokio::test]
    async fn test_timeout_is_error_result() {
        let llm = Arc::new(ScriptedLlm {
            reply: Ok("SELECT 1".to_string()),
            delay: Some(Duration::from_secs(10)),
            prompts: Mutex::new(Vec::new()),
        });
        let (_dir, translator, _audit) = translator(llm, 1).await;

        let translation = translator.translate("list staff", &SessionContext::system()).await;
        assert_eq!(translation.sql, None);
        assert!(translation.result.error_message().unwrap().contains("timed out"));
    }
}
