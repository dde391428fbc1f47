//! Statement safety for untrusted SQL.
//!
//! The validator classifies generated SQL as acceptable or rejected, and the
//! table extractor derives the set of tables a statement reads. Both are pure
//! and shared by the gateway pre-check and the executor re-check.

mod classifier;
mod tables;
mod validator;

pub use classifier::ReadOnlyClassifier;
pub use tables::TableExtractor;
pub use validator::{validate_sql, StatementValidator, FORBIDDEN_MARKERS, FORBIDDEN_WORDS};

use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

/// The type of SQL statement detected by the parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatementType {
    Select,
    Explain,
    Insert,
    Update,
    Delete,
    Drop,
    Truncate,
    Alter,
    Create,
    Pragma,
    Attach,
    /// Anything the classifier does not recognize.
    Other,
}

impl StatementType {
    /// Returns true if this statement only reads data.
    pub fn is_read_only(&self) -> bool {
        matches!(self, Self::Select | Self::Explain)
    }
}

impl fmt::Display for StatementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Select => write!(f, "SELECT"),
            Self::Explain => write!(f, "EXPLAIN"),
            Self::Insert => write!(f, "INSERT"),
            Self::Update => write!(f, "UPDATE"),
            Self::Delete => write!(f, "DELETE"),
            Self::Drop => write!(f, "DROP"),
            Self::Truncate => write!(f, "TRUNCATE"),
            Self::Alter => write!(f, "ALTER"),
            Self::Create => write!(f, "CREATE"),
            Self::Pragma => write!(f, "PRAGMA"),
            Self::Attach => write!(f, "ATTACH"),
            Self::Other => write!(f, "Unknown"),
        }
    }
}

/// Why the validator refused a statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum Rejection {
    /// More than one statement terminator, or text after the first one.
    MultiStatement,
    /// A denylisted keyword, comment marker or catalog reference.
    ForbiddenKeyword(String),
    /// Blank input.
    Empty,
    /// Parsed, but not a read-only query.
    NotReadOnly(StatementType),
    /// Could not be parsed as SQL.
    Unparseable(String),
}

impl Rejection {
    /// Stable machine-readable identifier for this rejection.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MultiStatement => "multi_statement",
            Self::ForbiddenKeyword(_) => "forbidden_keyword",
            Self::Empty => "empty_statement",
            Self::NotReadOnly(_) => "not_read_only",
            Self::Unparseable(_) => "unparseable",
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MultiStatement => write!(f, "multiple statements are not allowed"),
            Self::ForbiddenKeyword(token) => write!(f, "forbidden token '{}'", token),
            Self::Empty => write!(f, "empty statement"),
            Self::NotReadOnly(kind) => write!(f, "{} statements are not allowed", kind),
            Self::Unparseable(msg) => write!(f, "could not parse SQL: {}", msg),
        }
    }
}

/// An untrusted SQL string together with everything derived from it.
///
/// Built once per request; the text is never rewritten after analysis.
#[derive(Debug, Clone)]
pub struct Statement {
    sql: String,
    terminators: usize,
    tables: BTreeSet<String>,
    verdict: std::result::Result<StatementType, Rejection>,
}

impl Statement {
    /// Validates `sql` and extracts the tables it references.
    pub fn analyze(
        sql: impl Into<String>,
        validator: &StatementValidator,
        extractor: &TableExtractor,
    ) -> Self {
        let sql = sql.into();
        let terminators = sql.matches(';').count();
        let verdict = validator.validate(&sql);
        let tables = extractor.extract_tables(&sql);
        Self {
            sql,
            terminators,
            tables,
            verdict,
        }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Number of `;` characters in the raw text.
    pub fn terminator_count(&self) -> usize {
        self.terminators
    }

    /// Lower-cased tables the statement references.
    pub fn tables(&self) -> &BTreeSet<String> {
        &self.tables
    }

    /// Returns true if the validator flagged a forbidden token.
    pub fn has_forbidden_tokens(&self) -> bool {
        matches!(self.verdict, Err(Rejection::ForbiddenKeyword(_)))
    }

    /// The validator's verdict.
    pub fn verdict(&self) -> std::result::Result<StatementType, &Rejection> {
        self.verdict.as_ref().copied()
    }
}
