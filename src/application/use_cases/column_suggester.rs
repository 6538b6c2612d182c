//! Near-match column suggestions for statements the store rejected.
//!
//! Similarity is pluggable through [`ColumnSimilarity`]. Scores are in `0.0..=1.0` and
//! use the Ratcliff/Obershelp ratio (`2 * matched / total_len`).

use crate::domain::query::Suggestions;
use crate::domain::schema::SchemaDescriptor;
use std::sync::Arc;

pub const DEFAULT_MAX_PER_TABLE: usize = 2;
pub const DEFAULT_CUTOFF: f64 = 0.6;

pub trait ColumnSimilarity: Send + Sync {
    fn score(&self, statement: &str, column: &str) -> f64;
}

/// Compares the whole statement text against the column name, case-sensitively.
/// Long statements rarely clear the cutoff against short identifiers.
#[derive(Debug, Default, Clone, Copy)]
pub struct WholeStatementRatio;

impl ColumnSimilarity for WholeStatementRatio {
    fn score(&self, statement: &str, column: &str) -> f64 {
        sequence_ratio(statement, column)
    }
}

/// Best of the whole-statement ratio and the ratio of any single identifier token
/// (case-insensitive) against the column name.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokenAwareRatio;

impl ColumnSimilarity for TokenAwareRatio {
    fn score(&self, statement: &str, column: &str) -> f64 {
        let column_lower = column.to_lowercase();
        statement
            .split(|c: char| !(c.is_alphanumeric() || c == '_'))
            .filter(|token| !token.is_empty())
            .map(|token| sequence_ratio(&token.to_lowercase(), &column_lower))
            .fold(sequence_ratio(statement, column), f64::max)
    }
}

#[derive(Clone)]
pub struct ColumnSuggester {
    similarity: Arc<dyn ColumnSimilarity>,
    max_per_table: usize,
    cutoff: f64,
}

impl ColumnSuggester {
    pub fn new(similarity: Arc<dyn ColumnSimilarity>) -> Self {
        Self {
            similarity,
            max_per_table: DEFAULT_MAX_PER_TABLE,
            cutoff: DEFAULT_CUTOFF,
        }
    }

    pub fn with_limits(mut self, max_per_table: usize, cutoff: f64) -> Self {
        self.max_per_table = max_per_table;
        self.cutoff = cutoff.clamp(0.0, 1.0);
        self
    }

    /// Up to `max_per_table` columns per table scoring at least `cutoff`, best first.
    /// Tables with no candidate are left out of the map.
    pub fn suggest(&self, statement: &str, schema: &SchemaDescriptor) -> Suggestions {
        let mut suggestions = Suggestions::new();

        for (table, columns) in &schema.tables {
            let mut scored: Vec<(f64, &str)> = columns
                .iter()
                .map(|c| (self.similarity.score(statement, &c.name), c.name.as_str()))
                .filter(|(score, _)| *score >= self.cutoff)
                .collect();

            if scored.is_empty() {
                continue;
            }

            scored.sort_by(|a, b| b.0.total_cmp(&a.0).then_with(|| a.1.cmp(b.1)));
            scored.truncate(self.max_per_table);
            suggestions.insert(
                table.clone(),
                scored.into_iter().map(|(_, name)| name.to_string()).collect(),
            );
        }

        suggestions
    }
}

impl Default for ColumnSuggester {
    fn default() -> Self {
        Self::new(Arc::new(TokenAwareRatio))
    }
}

/// Ratcliff/Obershelp similarity: twice the matched characters over the total length.
pub fn sequence_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    2.0 * matched_chars(&a, &b) as f64 / total as f64
}

fn matched_chars(a: &[char], b: &[char]) -> usize {
    let (i, j, len) = longest_common_block(a, b);
    if len == 0 {
        return 0;
    }
    len + matched_chars(&a[..i], &b[..j]) + matched_chars(&a[i + len..], &b[j + len..])
}

/// Longest common substring as `(start_a, start_b, len)`; earliest in `a` wins ties.
fn longest_common_block(a: &[char], b: &[char]) -> (usize, usize, usize) {
    let mut best = (0, 0, 0);
    let mut prev = vec![0usize; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        let mut current = vec![0usize; b.len() + 1];
        for (j, cb) in b.iter().enumerate() {
            if ca == cb {
                let len = prev[j] + 1;
                current[j + 1] = len;
                if len > best.2 {
                    best = (i + 1 - len, j + 1 - len, len);
                }
            }
        }
        prev = current;
    }

    best
}
