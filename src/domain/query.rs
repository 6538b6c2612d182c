use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Near-match column names keyed by table.
pub type Suggestions = BTreeMap<String, Vec<String>>;

/// Outcome of running (or refusing to run) a statement.
///
/// Serialises to either `{columns, rows}` or `{error, suggestions?}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExecutionResult {
    Rows {
        columns: Vec<String>,
        rows: Vec<Vec<Value>>,
    },
    Failure {
        error: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        suggestions: Option<Suggestions>,
    },
}

impl ExecutionResult {
    pub fn rows(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        ExecutionResult::Rows { columns, rows }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        ExecutionResult::Failure {
            error: error.into(),
            suggestions: None,
        }
    }

    /// Attaches suggestions, dropping the key entirely when nothing matched.
    pub fn failure_with_suggestions(error: impl Into<String>, suggestions: Suggestions) -> Self {
        ExecutionResult::Failure {
            error: error.into(),
            suggestions: if suggestions.is_empty() {
                None
            } else {
                Some(suggestions)
            },
        }
    }

    /// Single-cell table carrying a plain-text answer.
    pub fn answer(text: impl Into<String>) -> Self {
        ExecutionResult::Rows {
            columns: vec!["Answer".to_string()],
            rows: vec![vec![Value::String(text.into())]],
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ExecutionResult::Failure { .. })
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            ExecutionResult::Failure { error, .. } => Some(error),
            ExecutionResult::Rows { .. } => None,
        }
    }
}

/// Translator output: the statement that was run (if any) and its result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Translation {
    pub sql: Option<String>,
    pub result: ExecutionResult,
}
