//! Statement allow-list.
//!
//! The only authorization boundary in front of the store. A statement passes when its
//! first whitespace-delimited token is SELECT, INSERT, UPDATE or DELETE (any case) and it
//! is a single statement. Everything else is refused before a connection is opened.

use crate::domain::audit::AuditAction;
use std::fmt;

pub const ALLOWED_KEYWORDS: [&str; 4] = ["SELECT", "INSERT", "UPDATE", "DELETE"];

pub const DISALLOWED_MESSAGE: &str = "Only SELECT, INSERT, UPDATE, DELETE queries are allowed.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Select,
    Insert,
    Update,
    Delete,
}

impl StatementKind {
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword.to_ascii_uppercase().as_str() {
            "SELECT" => Some(StatementKind::Select),
            "INSERT" => Some(StatementKind::Insert),
            "UPDATE" => Some(StatementKind::Update),
            "DELETE" => Some(StatementKind::Delete),
            _ => None,
        }
    }

    pub fn returns_rows(&self) -> bool {
        matches!(self, StatementKind::Select)
    }

    /// Audit action for mutating kinds; `None` for SELECT.
    pub fn audit_action(&self) -> Option<AuditAction> {
        match self {
            StatementKind::Select => None,
            StatementKind::Insert => Some(AuditAction::Insert),
            StatementKind::Update => Some(AuditAction::Update),
            StatementKind::Delete => Some(AuditAction::Delete),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatementRejection {
    Empty,
    Disallowed { keyword: String },
    MultipleStatements,
}

impl fmt::Display for StatementRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatementRejection::Empty => f.write_str("Empty query. Nothing to execute."),
            StatementRejection::Disallowed { .. } => f.write_str(DISALLOWED_MESSAGE),
            StatementRejection::MultipleStatements => {
                f.write_str("Multiple statements are not allowed. Submit one query at a time.")
            }
        }
    }
}

/// First whitespace-delimited token, upper-cased.
pub fn leading_keyword(sql: &str) -> Option<String> {
    sql.split_whitespace().next().map(|t| t.to_ascii_uppercase())
}

pub fn validate_statement(sql: &str) -> Result<StatementKind, StatementRejection> {
    let keyword = leading_keyword(sql).ok_or(StatementRejection::Empty)?;
    let kind = StatementKind::from_keyword(&keyword)
        .ok_or(StatementRejection::Disallowed { keyword })?;

    if has_trailing_statement(sql) {
        return Err(StatementRejection::MultipleStatements);
    }

    Ok(kind)
}

#[derive(Clone, Copy, PartialEq)]
enum ScanState {
    Code,
    Quoted(char),
    LineComment,
    BlockComment,
}

/// True when a `;` outside quotes and comments is followed by more statement text.
/// A single trailing `;` (plus whitespace or comments) is fine.
fn has_trailing_statement(sql: &str) -> bool {
    let chars: Vec<char> = sql.chars().collect();
    let mut state = ScanState::Code;
    let mut terminated = false;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();

        match state {
            ScanState::Quoted(close) => {
                if c == close {
                    state = ScanState::Code;
                }
            }
            ScanState::LineComment => {
                if c == '\n' {
                    state = ScanState::Code;
                }
            }
            ScanState::BlockComment => {
                if c == '*' && next == Some('/') {
                    state = ScanState::Code;
                    i += 1;
                }
            }
            ScanState::Code => match c {
                '-' if next == Some('-') => {
                    state = ScanState::LineComment;
                    i += 1;
                }
                '/' if next == Some('*') => {
                    state = ScanState::BlockComment;
                    i += 1;
                }
                ';' => terminated = true,
                c if c.is_whitespace() => {}
                _ if terminated => return true,
                '\'' | '"' | '`' => state = ScanState::Quoted(c),
                '[' => state = ScanState::Quoted(']'),
                _ => {}
            },
        }
        i += 1;
    }

    false
}
