//! Statement validation rules.
//!
//! Rules run in a fixed order and the first match wins:
//! multi-statement, forbidden token, empty, read-only parse check.

use sqlparser::dialect::SQLiteDialect;
use sqlparser::tokenizer::{Token, Tokenizer};

use super::{ReadOnlyClassifier, Rejection, StatementType};

/// Keywords that reject a statement when they appear as a whole word.
pub const FORBIDDEN_WORDS: &[&str] = &[
    "drop", "delete", "update", "insert", "alter", "attach", "detach", "vacuum", "pragma",
];

/// Comment markers and catalog tables that reject a statement anywhere in the text.
pub const FORBIDDEN_MARKERS: &[&str] = &[
    "--",
    "/*",
    "sqlite_master",
    "sqlite_schema",
    "sqlite_temp_master",
];

/// Classifies untrusted SQL as accepted or rejected. Never rewrites it.
#[derive(Debug, Default)]
pub struct StatementValidator {
    classifier: ReadOnlyClassifier,
}

impl StatementValidator {
    pub fn new() -> Self {
        Self {
            classifier: ReadOnlyClassifier::new(),
        }
    }

    /// Validates a statement, returning its type when accepted.
    pub fn validate(&self, sql: &str) -> Result<StatementType, Rejection> {
        if has_multiple_statements(sql) {
            return Err(Rejection::MultiStatement);
        }

        if let Some(token) = find_forbidden_token(sql) {
            return Err(Rejection::ForbiddenKeyword(token.to_string()));
        }

        if sql.trim().trim_end_matches(';').trim().is_empty() {
            return Err(Rejection::Empty);
        }

        self.classifier.classify(sql)
    }
}

/// Convenience function to validate SQL without creating a validator instance.
pub fn validate_sql(sql: &str) -> Result<StatementType, Rejection> {
    StatementValidator::new().validate(sql)
}

/// More than one `;`, or any token after the first terminator.
fn has_multiple_statements(sql: &str) -> bool {
    if sql.matches(';').count() > 1 {
        return true;
    }

    // A string literal containing ';' fails to tokenize only when malformed,
    // and the parser rejects those later anyway.
    let Ok(tokens) = Tokenizer::new(&SQLiteDialect {}, sql).tokenize() else {
        return false;
    };

    tokens
        .iter()
        .skip_while(|token| !matches!(token, Token::SemiColon))
        .skip(1)
        .any(|token| !matches!(token, Token::Whitespace(_) | Token::EOF))
}

/// Returns the first denylisted word or marker present in the text.
fn find_forbidden_token(sql: &str) -> Option<&'static str> {
    let lower = sql.to_lowercase();

    if let Some(marker) = FORBIDDEN_MARKERS.iter().copied().find(|m| lower.contains(m)) {
        return Some(marker);
    }

    lower
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .find_map(|word| FORBIDDEN_WORDS.iter().find(|kw| **kw == word).copied())
}
