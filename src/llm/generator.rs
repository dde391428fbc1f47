//! SQL generation from natural-language questions.

use std::sync::Arc;

use tracing::debug;

use crate::db::Schema;
use crate::error::Result;
use crate::llm::parser::parse_sql_response;
use crate::llm::prompt::build_sql_messages;
use crate::llm::LlmClient;

/// What the generator produced for a question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeneratedSql {
    /// A candidate statement. Untrusted.
    Sql(String),
    /// The model declined to translate the question.
    CannotConvert,
}

/// Turns questions into candidate SQL through an LLM.
#[derive(Clone)]
pub struct SqlGenerator {
    client: Arc<dyn LlmClient>,
}

impl SqlGenerator {
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self { client }
    }

    /// Asks the model for a statement answering `question` over `schema`.
    pub async fn generate(&self, question: &str, schema: &Schema) -> Result<GeneratedSql> {
        let messages = build_sql_messages(question, schema);
        let response = self.client.complete(&messages).await?;
        let generated = parse_sql_response(&response);
        debug!(?generated, "generator response parsed");
        Ok(generated)
    }
}
