//! Narrative summaries of result sets.

use async_trait::async_trait;
use tracing::warn;

use crate::db::Row;
use crate::error::Result;

/// Canonical summary for an empty result set.
pub const NO_RESULTS: &str = "No results found.";

/// Produces a short natural-language summary of sample rows.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(
        &self,
        question: &str,
        sql: &str,
        columns: &[String],
        rows: &[Row],
    ) -> Result<String>;
}

/// Summarizes at most `sample` rows, never failing.
///
/// Empty input short-circuits to [`NO_RESULTS`] without calling the summarizer.
pub async fn narrate(
    summarizer: &dyn Summarizer,
    question: &str,
    sql: &str,
    columns: &[String],
    rows: &[Row],
    sample: usize,
) -> String {
    if rows.is_empty() {
        return NO_RESULTS.to_string();
    }

    let sample = &rows[..rows.len().min(sample)];
    match summarizer.summarize(question, sql, columns, sample).await {
        Ok(text) => text,
        Err(e) => {
            warn!(error = %e, "summarizer failed; returning degraded summary");
            format!("Could not summarize results: {e}")
        }
    }
}
