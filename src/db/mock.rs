//! In-memory store doubles for testing.

use super::{DatabaseClient, QueryResult, Schema};
use crate::error::{GatewayError, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// A store that returns a canned result and records every statement it runs.
#[derive(Debug, Default)]
pub struct MockDatabaseClient {
    schema: Schema,
    result: QueryResult,
    calls: AtomicUsize,
    executed: Mutex<Vec<String>>,
}

impl MockDatabaseClient {
    /// Creates a mock with an empty schema and an empty result.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `result` (capped per call) from every `execute_read`.
    pub fn with_result(result: QueryResult) -> Self {
        Self {
            result,
            ..Self::default()
        }
    }

    /// Sets the schema returned by `introspect_schema`.
    pub fn with_schema(mut self, schema: Schema) -> Self {
        self.schema = schema;
        self
    }

    /// Number of `execute_read` calls so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Statements passed to `execute_read`, in call order.
    pub fn executed(&self) -> Vec<String> {
        self.executed
            .lock()
            .map(|sqls| sqls.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl DatabaseClient for MockDatabaseClient {
    async fn introspect_schema(&self) -> Result<Schema> {
        Ok(self.schema.clone())
    }

    async fn execute_read(&self, sql: &str, max_rows: usize) -> Result<QueryResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut executed) = self.executed.lock() {
            executed.push(sql.to_string());
        }

        let mut result = self.result.clone();
        result.truncate(max_rows);
        Ok(result)
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// A store whose every statement fails with an execution error.
#[derive(Debug)]
pub struct FailingDatabaseClient {
    message: String,
    calls: AtomicUsize,
}

impl FailingDatabaseClient {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of `execute_read` calls so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DatabaseClient for FailingDatabaseClient {
    async fn introspect_schema(&self) -> Result<Schema> {
        Err(GatewayError::connection(self.message.clone()))
    }

    async fn execute_read(&self, _sql: &str, _max_rows: usize) -> Result<QueryResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(GatewayError::execution(self.message.clone()))
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}
