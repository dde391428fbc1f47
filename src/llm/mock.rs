//! Mock LLM client for testing.
//!
//! Provides deterministic responses based on input patterns.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::{GatewayError, Result};
use crate::llm::parser::CANNOT_CONVERT;
use crate::llm::types::{Message, Role};
use crate::llm::LlmClient;

/// Mock LLM client that returns canned responses based on input patterns.
///
/// Used for unit testing without making real API calls.
#[derive(Debug, Default)]
pub struct MockLlmClient {
    /// Custom response mappings (pattern -> response).
    custom_responses: Vec<(String, String)>,
    /// When set, every call fails with this message.
    failure: Option<String>,
    calls: AtomicUsize,
}

impl MockLlmClient {
    /// Creates a new mock client with default responses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a mock whose every call fails.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            ..Self::default()
        }
    }

    /// Adds a custom response mapping.
    ///
    /// When the input contains `pattern`, the mock will return `response`.
    pub fn with_response(
        mut self,
        pattern: impl Into<String>,
        response: impl Into<String>,
    ) -> Self {
        self.custom_responses
            .push((pattern.into(), response.into()));
        self
    }

    /// Number of completions requested so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Generates a mock response based on the input.
    fn mock_response(&self, input: &str) -> String {
        let input_lower = input.to_lowercase();

        for (pattern, response) in &self.custom_responses {
            if input_lower.contains(&pattern.to_lowercase()) {
                return response.clone();
            }
        }

        if input_lower.trim_end().ends_with("summary:") {
            return "Summary: The query returned the requested rows.".to_string();
        }

        // Only the question line matters for SQL generation
        let question = input_lower
            .lines()
            .rev()
            .find_map(|line| line.strip_prefix("question:"))
            .unwrap_or(&input_lower);

        if question.contains("revenue") {
            return "```sql\nSELECT Datetime, Revenue FROM Revenue_data;\n```".to_string();
        }

        if question.contains("customer") {
            return "SQL: SELECT customer_name, email FROM customer_table;".to_string();
        }

        if question.contains("how many") && question.contains("meter") {
            return "SELECT COUNT(DISTINCT meter_id) FROM meter_table;".to_string();
        }

        if question.contains("load") || question.contains("meter") {
            return "SELECT datetime, forecasted_load_kwh FROM meter_table ORDER BY datetime;"
                .to_string();
        }

        CANNOT_CONVERT.to_string()
    }

    /// Extracts the last user message content from a message list.
    fn extract_user_input(messages: &[Message]) -> String {
        messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(message) = &self.failure {
            return Err(GatewayError::llm(message.clone()));
        }

        let input = Self::extract_user_input(messages);
        Ok(self.mock_response(&input))
    }
}
