//! LLM-backed narrative summaries.

use std::sync::Arc;

use async_trait::async_trait;

use crate::db::Row;
use crate::error::{GatewayError, Result};
use crate::llm::parser::strip_label;
use crate::llm::prompt::build_summary_messages;
use crate::llm::LlmClient;
use crate::shaper::Summarizer;

/// Summarizes sample rows by asking an LLM.
pub struct LlmSummarizer {
    client: Arc<dyn LlmClient>,
}

impl LlmSummarizer {
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Summarizer for LlmSummarizer {
    async fn summarize(
        &self,
        question: &str,
        sql: &str,
        columns: &[String],
        rows: &[Row],
    ) -> Result<String> {
        let messages = build_summary_messages(question, sql, columns, rows);
        let response = self.client.complete(&messages).await?;

        let summary = strip_label(response.trim(), "summary:").trim();
        if summary.is_empty() {
            return Err(GatewayError::llm("empty summary"));
        }
        Ok(summary.to_string())
    }
}
