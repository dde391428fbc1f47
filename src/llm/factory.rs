//! LLM client factory.
//!
//! Centralizes provider-specific logic for creating LLM clients.

use crate::config::LlmConfig;
use crate::error::{GatewayError, Result};
use crate::llm::ollama::DEFAULT_OLLAMA_URL;
use crate::llm::{
    LlmClient, LlmProvider, MockLlmClient, OllamaClient, OllamaConfig, OpenAiClient, OpenAiConfig,
};

/// Creates an LLM client from configuration.
///
/// Environment overrides are expected to have been applied to `config`
/// already (see [`LlmConfig::apply_env_defaults`]).
pub fn create_client(config: &LlmConfig) -> Result<Box<dyn LlmClient>> {
    let provider: LlmProvider = config.provider.parse().map_err(GatewayError::config)?;

    match provider {
        LlmProvider::OpenAi => {
            let key = config.api_key.clone().ok_or_else(|| {
                GatewayError::llm("No API key configured. Set OPENAI_API_KEY or llm.api_key.")
            })?;
            let mut openai = OpenAiConfig::new(key, &config.model);
            if let Some(base_url) = &config.base_url {
                openai = openai.with_base_url(base_url);
            }
            Ok(Box::new(OpenAiClient::new(openai)?))
        }
        LlmProvider::Ollama => {
            let url = config.base_url.as_deref().unwrap_or(DEFAULT_OLLAMA_URL);
            Ok(Box::new(OllamaClient::new(
                OllamaConfig::new(&config.model).with_url(url),
            )?))
        }
        LlmProvider::Mock => Ok(Box::new(MockLlmClient::new())),
    }
}
