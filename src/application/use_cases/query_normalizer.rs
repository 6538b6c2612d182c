//! Question normalization.
//!
//! Aliases are rewritten to canonical schema vocabulary as whole words,
//! case-insensitively, one pair at a time in table order. Because the pairs are
//! applied sequentially, the output of an earlier pair is visible to later ones.

use once_cell::sync::Lazy;
use regex::{NoExpand, Regex};

/// Alias → canonical term, applied in this order.
pub const SYNONYMS: &[(&str, &str)] = &[
    ("staff", "employees"),
    ("worker", "employees"),
    ("projcts", "projects"),
    ("assignment", "assignments"),
    ("dept", "department"),
    ("customer", "clients"),
];

static DEFAULT_NORMALIZER: Lazy<QueryNormalizer> = Lazy::new(|| QueryNormalizer::new(SYNONYMS));

static FENCED_BLOCK_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)```.*?```").unwrap());

static SQL_LABEL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*(SQL Query:|SQL:)").unwrap());

pub struct QueryNormalizer {
    rules: Vec<(Regex, String)>,
}

impl QueryNormalizer {
    pub fn new(pairs: &[(&str, &str)]) -> Self {
        let rules = pairs
            .iter()
            .filter(|(alias, _)| !alias.trim().is_empty())
            .filter_map(|(alias, canonical)| {
                Regex::new(&format!(r"(?i)\b{}\b", regex::escape(alias)))
                    .ok()
                    .map(|re| (re, canonical.to_string()))
            })
            .collect();
        Self { rules }
    }

    pub fn normalize(&self, text: &str) -> String {
        let mut normalized = text.to_string();
        for (pattern, canonical) in &self.rules {
            if pattern.is_match(&normalized) {
                normalized = pattern
                    .replace_all(&normalized, NoExpand(canonical))
                    .into_owned();
            }
        }
        normalized
    }
}

impl Default for QueryNormalizer {
    fn default() -> Self {
        Self::new(SYNONYMS)
    }
}

/// Normalizes with the built-in synonym table.
pub fn normalize(text: &str) -> String {
    DEFAULT_NORMALIZER.normalize(text)
}

/// `alias → canonical` lines for the generation prompt.
pub fn synonym_cheat_sheet() -> String {
    SYNONYMS
        .iter()
        .map(|(alias, canonical)| format!("- \"{}\" means \"{}\"", alias, canonical))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Drops pasted code fences and a leading `SQL:` / `SQL Query:` label from raw input.
pub fn preprocess_question(text: &str) -> String {
    let without_fences = FENCED_BLOCK_PATTERN.replace_all(text, "");
    SQL_LABEL_PATTERN
        .replace(&without_fences, "")
        .trim()
        .to_string()
}
