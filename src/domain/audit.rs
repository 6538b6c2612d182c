use serde::{Deserialize, Serialize};
use std::fmt;

/// Sentinel stored when the target table cannot be determined.
pub const UNKNOWN_TABLE: &str = "unknown";
/// Record id stored for statement-level audit entries.
pub const NO_RECORD_ID: &str = "N/A";
/// Table holding the audit trail. Statements sent through the gateway may read it only.
pub const AUDIT_TABLE: &str = "audit_log";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AuditAction {
    Insert,
    Update,
    Delete,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Insert => "INSERT",
            AuditAction::Update => "UPDATE",
            AuditAction::Delete => "DELETE",
        }
    }

    pub fn parse(keyword: &str) -> Option<Self> {
        match keyword.to_ascii_uppercase().as_str() {
            "INSERT" => Some(AuditAction::Insert),
            "UPDATE" => Some(AuditAction::Update),
            "DELETE" => Some(AuditAction::Delete),
            _ => None,
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Row of the append-only `audit_log` table. `timestamp` is assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: i64,
    pub user: String,
    pub action: String,
    pub table_name: String,
    pub record_id: String,
    pub details: String,
    pub timestamp: String,
}
