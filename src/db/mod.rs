//! Store abstraction layer.
//!
//! Provides a trait-based interface for the relational store so the gateway
//! can run against SQLite in production and in-memory doubles in tests.

mod mock;
mod schema;
mod sqlite;
mod types;

pub use mock::{FailingDatabaseClient, MockDatabaseClient};
pub use schema::{Column, Schema, Table};
pub use sqlite::SqliteClient;
pub use types::{ColumnInfo, QueryResult, Row, Value};

use crate::config::DatabaseConfig;
use crate::error::Result;
use async_trait::async_trait;

/// Creates a store client for the given configuration.
pub async fn connect(config: &DatabaseConfig) -> Result<Box<dyn DatabaseClient>> {
    let client = SqliteClient::connect(config).await?;
    Ok(Box::new(client))
}

/// Trait defining the interface for store clients.
///
/// All operations are async and return Results with GatewayError.
#[async_trait]
pub trait DatabaseClient: Send + Sync {
    /// Introspects the store schema. Internal queries here never pass
    /// through the gateway.
    async fn introspect_schema(&self) -> Result<Schema>;

    /// Runs one read statement inside a transaction and returns at most
    /// `max_rows` rows. Any failure rolls the transaction back.
    async fn execute_read(&self, sql: &str, max_rows: usize) -> Result<QueryResult>;

    /// Closes the underlying connections.
    async fn close(&self) -> Result<()>;
}
