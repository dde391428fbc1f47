//! Error types for the query gateway.
//!
//! Every stage of the pipeline reports failures through [`GatewayError`].
//! Callers see them through [`ErrorResponse`], whose `category` keeps
//! access-control denials distinguishable from malformed SQL.

use serde::Serialize;
use thiserror::Error;

use crate::safety::Rejection;

/// Main error type for gateway operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GatewayError {
    /// The statement validator refused the SQL before anything ran.
    #[error("Statement rejected: {0}")]
    Rejected(Rejection),

    /// The statement references a table the caller's role may not read.
    #[error("Unauthorized table access: '{0}' is not permitted for your role")]
    UnauthorizedTableAccess(String),

    /// The store failed while executing an accepted statement.
    #[error("Execution error: {0}")]
    Execution(String),

    /// The SQL generator could not produce a statement for the question.
    #[error("SQL generation failed: {0}")]
    GenerationFailed(String),

    /// Store connection errors (missing file, locked database, etc.)
    #[error("Connection error: {0}")]
    Connection(String),

    /// Configuration errors (invalid config file, unknown provider, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// LLM API errors (rate limits, auth, timeouts, etc.)
    #[error("LLM error: {0}")]
    Llm(String),

    /// Internal errors (unexpected states, bugs, etc.)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// Creates an execution error with the given message.
    pub fn execution(msg: impl Into<String>) -> Self {
        Self::Execution(msg.into())
    }

    /// Creates a generation failure with the given message.
    pub fn generation_failed(msg: impl Into<String>) -> Self {
        Self::GenerationFailed(msg.into())
    }

    /// Creates a connection error with the given message.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates an LLM error with the given message.
    pub fn llm(msg: impl Into<String>) -> Self {
        Self::Llm(msg.into())
    }

    /// Creates an internal error with the given message.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns the caller-visible error category.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Rejected(_) => "rejected",
            Self::UnauthorizedTableAccess(_) => "forbidden",
            Self::Execution(_) => "execution_error",
            Self::GenerationFailed(_) => "generation_failed",
            Self::Connection(_) => "connection_error",
            Self::Config(_) => "config_error",
            Self::Llm(_) => "llm_error",
            Self::Internal(_) => "internal",
        }
    }

    /// Returns the specific failure kind, finer-grained than [`category`](Self::category).
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Rejected(rejection) => rejection.kind(),
            Self::UnauthorizedTableAccess(_) => "unauthorized_table_access",
            other => other.category(),
        }
    }

    /// Returns true for access-control denials.
    pub fn is_forbidden(&self) -> bool {
        matches!(self, Self::UnauthorizedTableAccess(_))
    }
}

/// Structured failure body returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorResponse {
    pub category: &'static str,
    pub kind: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
}

impl From<&GatewayError> for ErrorResponse {
    fn from(error: &GatewayError) -> Self {
        let table = match error {
            GatewayError::UnauthorizedTableAccess(table) => Some(table.clone()),
            _ => None,
        };
        Self {
            category: error.category(),
            kind: error.kind(),
            message: error.to_string(),
            table,
        }
    }
}

/// Result type alias using GatewayError.
pub type Result<T> = std::result::Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_unauthorized() {
        let err = GatewayError::UnauthorizedTableAccess("revenue_data".to_string());
        assert_eq!(
            err.to_string(),
            "Unauthorized table access: 'revenue_data' is not permitted for your role"
        );
        assert_eq!(err.category(), "forbidden");
        assert_eq!(err.kind(), "unauthorized_table_access");
        assert!(err.is_forbidden());
    }

    #[test]
    fn test_error_display_execution() {
        let err = GatewayError::execution("no such column: foo");
        assert_eq!(err.to_string(), "Execution error: no such column: foo");
        assert_eq!(err.category(), "execution_error");
        assert!(!err.is_forbidden());
    }

    #[test]
    fn test_rejection_category_and_kind() {
        let err = GatewayError::Rejected(Rejection::MultiStatement);
        assert_eq!(err.category(), "rejected");
        assert_eq!(err.kind(), "multi_statement");

        let err = GatewayError::Rejected(Rejection::ForbiddenKeyword("drop".to_string()));
        assert_eq!(err.kind(), "forbidden_keyword");
        assert!(err.to_string().contains("drop"));
    }

    #[test]
    fn test_forbidden_is_distinct_from_execution() {
        let denied = GatewayError::UnauthorizedTableAccess("t".to_string());
        let failed = GatewayError::execution("boom");
        assert_ne!(denied.category(), failed.category());
    }

    #[test]
    fn test_error_response_carries_table() {
        let err = GatewayError::UnauthorizedTableAccess("revenue_data".to_string());
        let body = ErrorResponse::from(&err);
        assert_eq!(body.category, "forbidden");
        assert_eq!(body.table.as_deref(), Some("revenue_data"));

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["table"], "revenue_data");
    }

    #[test]
    fn test_error_response_omits_table_for_other_errors() {
        let body = ErrorResponse::from(&GatewayError::config("bad"));
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("table").is_none());
        assert_eq!(json["category"], "config_error");
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<GatewayError>();
    }
}
