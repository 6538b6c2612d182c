//! Pulls a bare SQL statement out of generation-service output.
//!
//! Rules, first match wins:
//! 1. a fenced block tagged `sql` → its trimmed interior
//! 2. text from the first SELECT/INSERT/UPDATE/DELETE (any case) to the end, trimmed
//! 3. the trimmed input unchanged

use once_cell::sync::Lazy;
use regex::Regex;

static SQL_FENCE_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)```sql(.*?)```").unwrap());

static SQL_KEYWORD_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)(SELECT|INSERT|UPDATE|DELETE).*").unwrap());

static THINK_TAG_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<think>[\s\S]*?</think>|<think\s*/>").unwrap());

static REASONING_TAG_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<reasoning>[\s\S]*?</reasoning>").unwrap());

pub fn extract_sql(raw: &str) -> String {
    if let Some(inner) = SQL_FENCE_PATTERN.captures(raw).and_then(|c| c.get(1)) {
        return inner.as_str().trim().to_string();
    }

    if let Some(found) = SQL_KEYWORD_PATTERN.find(raw) {
        return found.as_str().trim().to_string();
    }

    raw.trim().to_string()
}

/// Removes `<think>` / `<reasoning>` blocks some models emit before the answer.
pub fn strip_reasoning(raw: &str) -> String {
    let without_think = THINK_TAG_PATTERN.replace_all(raw, "");
    REASONING_TAG_PATTERN
        .replace_all(&without_think, "")
        .trim()
        .to_string()
}
