//! Bounded statement execution.
//!
//! The executor is the last gate before the store. It re-validates the
//! statement and re-derives its tables on its own, so calling it directly
//! cannot skip authorization.

use std::borrow::Cow;
use std::collections::BTreeSet;
use std::sync::Arc;

use sqlparser::dialect::SQLiteDialect;
use sqlparser::keywords::Keyword;
use sqlparser::tokenizer::{Token, Tokenizer};
use tracing::{debug, warn};

use crate::db::{DatabaseClient, QueryResult};
use crate::error::{GatewayError, Result};
use crate::policy::table_permitted;
use crate::safety::{StatementValidator, TableExtractor};

/// Runs validated, authorized statements under a row cap.
pub struct BoundedExecutor {
    db: Arc<dyn DatabaseClient>,
    validator: StatementValidator,
    extractor: Arc<TableExtractor>,
    max_rows: usize,
}

impl BoundedExecutor {
    /// Creates a new executor.
    pub fn new(db: Arc<dyn DatabaseClient>, extractor: Arc<TableExtractor>, max_rows: usize) -> Self {
        Self {
            db,
            validator: StatementValidator::new(),
            extractor,
            max_rows,
        }
    }

    pub fn max_rows(&self) -> usize {
        self.max_rows
    }

    /// Executes `sql` if every table it touches is in `allowed_tables`.
    pub async fn execute(&self, sql: &str, allowed_tables: &BTreeSet<String>) -> Result<QueryOutcome> {
        self.validator.validate(sql).map_err(GatewayError::Rejected)?;

        for table in self.extractor.extract_tables(sql) {
            if !table_permitted(allowed_tables, &table) {
                warn!(target: "audit", table = %table, "executor denied unauthorized table");
                return Err(GatewayError::UnauthorizedTableAccess(table));
            }
        }

        let bounded = apply_row_limit(sql, self.max_rows);
        debug!(sql = %bounded, "executing statement");

        let result = self.db.execute_read(&bounded, self.max_rows).await?;

        Ok(QueryOutcome {
            sql: bounded.into_owned(),
            result,
        })
    }
}

/// Successful execution outcome.
#[derive(Debug, Clone)]
pub struct QueryOutcome {
    /// The statement as sent to the store, row cap included.
    pub sql: String,
    /// The query result.
    pub result: QueryResult,
}

/// Appends `LIMIT max_rows` to a read query with no top-level LIMIT.
///
/// Trailing terminators are stripped before appending. Statements that are
/// not `SELECT`/`WITH`, or that cannot be tokenized, are returned unchanged.
pub fn apply_row_limit(sql: &str, max_rows: usize) -> Cow<'_, str> {
    let Ok(tokens) = Tokenizer::new(&SQLiteDialect {}, sql).tokenize() else {
        return Cow::Borrowed(sql);
    };

    let mut significant = tokens
        .iter()
        .filter(|t| !matches!(t, Token::Whitespace(_)));

    let is_read_query = matches!(
        significant.next(),
        Some(Token::Word(w)) if matches!(w.keyword, Keyword::SELECT | Keyword::WITH)
    );
    if !is_read_query || has_top_level_limit(&tokens) {
        return Cow::Borrowed(sql);
    }

    let body = sql.trim_end().trim_end_matches(';').trim_end();
    Cow::Owned(format!("{body} LIMIT {max_rows}"))
}

fn has_top_level_limit(tokens: &[Token]) -> bool {
    let mut depth = 0usize;
    for token in tokens {
        match token {
            Token::LParen => depth += 1,
            Token::RParen => depth = depth.saturating_sub(1),
            Token::Word(w) if depth == 0 && w.quote_style.is_none() && w.keyword == Keyword::LIMIT => {
                return true
            }
            _ => {}
        }
    }
    false
}
