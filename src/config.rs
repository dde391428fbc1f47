//! Configuration management for querygate.
//!
//! Handles loading configuration from TOML files and environment variables:
//! the store location, execution limits, the LLM provider and the role policy.

use crate::error::{GatewayError, Result};
use crate::policy::RolePolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    /// SQLite store settings.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Row caps and sampling budgets.
    #[serde(default)]
    pub limits: LimitsConfig,

    /// LLM provider configuration.
    #[serde(default)]
    pub llm: LlmConfig,

    /// Role policy. The built-in policy applies when the table is absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roles: Option<RolePolicy>,
}

/// SQLite store configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DatabaseConfig {
    /// Path to the database file.
    pub path: Option<PathBuf>,

    /// How long to wait on a locked database, in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    /// Per-statement execution timeout, in seconds.
    #[serde(default = "default_query_timeout_secs")]
    pub query_timeout_secs: u64,

    /// Connection pool size.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

fn default_query_timeout_secs() -> u64 {
    30
}

fn default_max_connections() -> u32 {
    4
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: None,
            busy_timeout_ms: default_busy_timeout_ms(),
            query_timeout_secs: default_query_timeout_secs(),
            max_connections: default_max_connections(),
        }
    }
}

impl DatabaseConfig {
    /// Creates a config for the database file at `path`.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::default()
        }
    }

    /// Returns the configured path or a configuration error.
    pub fn require_path(&self) -> Result<&Path> {
        self.path.as_deref().ok_or_else(|| {
            GatewayError::config(
                "No database configured. Set [database].path or QUERYGATE_DATABASE.",
            )
        })
    }

    /// Converts the config to a read-only sqlx connection string.
    pub fn to_connection_string(&self) -> Result<String> {
        let path = self.require_path()?;
        Ok(format!("sqlite:{}?mode=ro", path.display()))
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }

    /// Applies `QUERYGATE_DATABASE` when no path is configured.
    pub fn apply_env_defaults(&mut self) {
        if self.path.is_none() {
            self.path = std::env::var_os("QUERYGATE_DATABASE").map(PathBuf::from);
        }
    }

    /// Returns a display-safe string for logs.
    pub fn display_string(&self) -> String {
        match &self.path {
            Some(path) => format!("sqlite:{}", path.display()),
            None => "sqlite:<unset>".to_string(),
        }
    }
}

/// Execution limits and presentation budgets.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct LimitsConfig {
    /// Maximum rows a statement may return.
    #[serde(default = "default_max_rows")]
    pub max_rows: usize,

    /// Maximum points in a rendered chart.
    #[serde(default = "default_chart_points")]
    pub chart_points: usize,

    /// Maximum sample rows handed to the summarizer.
    #[serde(default = "default_summary_rows")]
    pub summary_rows: usize,
}

fn default_max_rows() -> usize {
    200
}

fn default_chart_points() -> usize {
    200
}

fn default_summary_rows() -> usize {
    50
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_rows: default_max_rows(),
            chart_points: default_chart_points(),
            summary_rows: default_summary_rows(),
        }
    }
}

/// LLM provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LlmConfig {
    /// LLM provider: "openai", "ollama" or "mock".
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Model name (e.g., "gpt-4o-mini", "llama3").
    #[serde(default = "default_model")]
    pub model: String,

    /// Endpoint override for OpenAI-compatible servers or a remote Ollama.
    pub base_url: Option<String>,

    /// API key. Prefer `OPENAI_API_KEY` over storing it here.
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
}

fn default_provider() -> String {
    "openai".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            base_url: None,
            api_key: None,
        }
    }
}

impl LlmConfig {
    /// Fills unset fields from `OPENAI_API_KEY`, `OPENAI_BASE_URL` and `OLLAMA_URL`.
    pub fn apply_env_defaults(&mut self) {
        if self.api_key.is_none() {
            self.api_key = std::env::var("OPENAI_API_KEY").ok();
        }
        if self.base_url.is_none() {
            let var = if self.provider.eq_ignore_ascii_case("ollama") {
                "OLLAMA_URL"
            } else {
                "OPENAI_BASE_URL"
            };
            self.base_url = std::env::var(var).ok();
        }
    }

    /// Checks that `base_url`, if set, is an http(s) URL.
    pub fn validate(&self) -> Result<()> {
        let Some(base_url) = &self.base_url else {
            return Ok(());
        };

        let url = Url::parse(base_url)
            .map_err(|e| GatewayError::config(format!("Invalid llm.base_url '{base_url}': {e}")))?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(GatewayError::config(format!(
                "Invalid scheme '{}' in llm.base_url. Expected 'http' or 'https'",
                url.scheme()
            )));
        }

        Ok(())
    }
}

impl Config {
    /// Returns the default config file path for the current platform.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("querygate")
            .join("config.toml")
    }

    /// Loads configuration from a TOML file. A missing file yields defaults.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| GatewayError::config(format!("Failed to read config file: {e}")))?;

        Self::parse_toml(&content, path)
    }

    /// Parses configuration from a TOML string.
    fn parse_toml(content: &str, path: &Path) -> Result<Self> {
        toml::from_str(content).map_err(|e| {
            GatewayError::config(format!(
                "Configuration error in {}:\n  {}",
                path.display(),
                e
            ))
        })
    }

    /// Applies environment overrides and validates the result.
    pub fn finalize(mut self) -> Result<Self> {
        self.database.apply_env_defaults();
        self.llm.apply_env_defaults();
        self.llm.validate()?;

        if self.limits.max_rows == 0 {
            return Err(GatewayError::config("limits.max_rows must be at least 1"));
        }

        Ok(self)
    }

    /// The configured role policy, or the built-in one.
    pub fn role_policy(&self) -> RolePolicy {
        self.roles.clone().unwrap_or_default()
    }
}
