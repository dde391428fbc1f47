//! SQLite store client.
//!
//! Provides the `SqliteClient` struct that implements the `DatabaseClient`
//! trait using sqlx. The database is opened read-only.

use crate::config::DatabaseConfig;
use crate::db::{Column, ColumnInfo, DatabaseClient, QueryResult, Row, Schema, Table, Value};
use crate::error::{GatewayError, Result};
use async_trait::async_trait;
use futures::TryStreamExt;
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Column as SqlxColumn, Executor, Row as SqlxRow, TypeInfo, ValueRef};
use std::str::FromStr;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Maximum number of connection retry attempts.
const MAX_RETRY_ATTEMPTS: u32 = 3;

/// Base delay between retry attempts (doubles each retry).
const RETRY_BASE_DELAY_MS: u64 = 100;

/// Read-only SQLite client.
#[derive(Debug)]
pub struct SqliteClient {
    pool: SqlitePool,
    query_timeout: Duration,
}

impl SqliteClient {
    /// Opens the configured database file read-only.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let path = config.require_path()?;
        if !path.exists() {
            return Err(GatewayError::connection(format!(
                "Database file '{}' does not exist.",
                path.display()
            )));
        }

        let options = SqliteConnectOptions::from_str(&config.to_connection_string()?)
            .map_err(|e| GatewayError::config(format!("Invalid database path: {e}")))?
            .read_only(true)
            .busy_timeout(config.busy_timeout());

        let mut last_error = None;
        let mut delay = Duration::from_millis(RETRY_BASE_DELAY_MS);

        for attempt in 1..=MAX_RETRY_ATTEMPTS {
            debug!("Connection attempt {} of {}", attempt, MAX_RETRY_ATTEMPTS);

            let result = SqlitePoolOptions::new()
                .max_connections(config.max_connections.max(1))
                .acquire_timeout(Duration::from_secs(10))
                .connect_with(options.clone())
                .await;

            match result {
                Ok(pool) => {
                    debug!("Opened {}", config.display_string());
                    return Ok(Self {
                        pool,
                        query_timeout: config.query_timeout(),
                    });
                }
                Err(e) => {
                    let transient = is_transient_error(&e);
                    if attempt < MAX_RETRY_ATTEMPTS && transient {
                        warn!(
                            "Connection attempt {} failed (transient error), retrying in {:?}",
                            attempt, delay
                        );
                        tokio::time::sleep(delay).await;
                        delay *= 2;
                        last_error = Some(e);
                    } else {
                        return Err(map_connection_error(e, config));
                    }
                }
            }
        }

        Err(match last_error {
            Some(e) => map_connection_error(e, config),
            None => GatewayError::connection("Failed to open database after retries"),
        })
    }

    /// Wraps an existing pool.
    pub fn from_pool(pool: SqlitePool, query_timeout: Duration) -> Self {
        Self {
            pool,
            query_timeout,
        }
    }

    async fn run_in_transaction(&self, sql: &str, max_rows: usize) -> Result<QueryResult> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| GatewayError::execution(format!("Failed to open transaction: {e}")))?;

        match fetch_capped(&mut tx, sql, max_rows).await {
            Ok(result) => {
                tx.commit()
                    .await
                    .map_err(|e| GatewayError::execution(format!("Commit failed: {e}")))?;
                Ok(result)
            }
            Err(e) => {
                if let Err(rollback) = tx.rollback().await {
                    warn!("Rollback failed: {rollback}");
                }
                Err(e)
            }
        }
    }

    async fn fetch_table_names(&self) -> Result<Vec<String>> {
        sqlx::query_scalar(
            r#"
            SELECT name
            FROM sqlite_master
            WHERE type IN ('table', 'view') AND name NOT LIKE 'sqlite_%'
            ORDER BY name
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| GatewayError::execution(format!("Failed to fetch tables: {e}")))
    }

    async fn fetch_columns(&self, table_name: &str) -> Result<Vec<Column>> {
        let rows: Vec<(String, String, i64, i64)> = sqlx::query_as(
            r#"
            SELECT name, type, "notnull", pk
            FROM pragma_table_info(?)
            ORDER BY cid
            "#,
        )
        .bind(table_name)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            GatewayError::execution(format!("Failed to fetch columns for {table_name}: {e}"))
        })?;

        Ok(rows
            .into_iter()
            .map(|(name, data_type, not_null, pk)| {
                let column = Column::new(name, data_type).nullable(not_null == 0 && pk == 0);
                if pk > 0 {
                    column.primary_key()
                } else {
                    column
                }
            })
            .collect())
    }
}

#[async_trait]
impl DatabaseClient for SqliteClient {
    async fn introspect_schema(&self) -> Result<Schema> {
        let mut tables = Vec::new();
        for name in self.fetch_table_names().await? {
            let columns = self.fetch_columns(&name).await?;
            tables.push(Table { name, columns });
        }
        Ok(Schema { tables })
    }

    async fn execute_read(&self, sql: &str, max_rows: usize) -> Result<QueryResult> {
        let start = Instant::now();

        // Dropping the future on timeout drops the transaction, which rolls back.
        let result = tokio::time::timeout(self.query_timeout, self.run_in_transaction(sql, max_rows))
            .await
            .map_err(|_| {
                GatewayError::execution(format!(
                    "Query timed out after {} seconds",
                    self.query_timeout.as_secs()
                ))
            })??;

        Ok(result.with_execution_time(start.elapsed()))
    }

    async fn close(&self) -> Result<()> {
        self.pool.close().await;
        Ok(())
    }
}

/// Streams rows until the cap is reached; one extra row marks truncation.
async fn fetch_capped(
    conn: &mut SqliteConnection,
    sql: &str,
    max_rows: usize,
) -> Result<QueryResult> {
    let mut columns = None;
    let mut rows: Vec<Row> = Vec::new();
    let mut was_truncated = false;

    {
        let mut stream = sqlx::query(sql).fetch(&mut *conn);
        while let Some(row) = stream
            .try_next()
            .await
            .map_err(|e| GatewayError::execution(format_query_error(e)))?
        {
            if columns.is_none() {
                columns = Some(column_info(&row));
            }
            if rows.len() >= max_rows {
                was_truncated = true;
                break;
            }
            rows.push(convert_row(&row));
        }
    }

    if was_truncated {
        warn!("Query returned more than {} rows, truncating", max_rows);
    }

    let columns = match columns {
        Some(columns) => columns,
        None => describe_columns(conn, sql).await,
    };

    let row_count = rows.len();
    Ok(QueryResult {
        columns,
        rows,
        execution_time: Duration::ZERO,
        row_count,
        was_truncated,
    })
}

/// Column metadata for a statement that produced no rows. Best effort.
async fn describe_columns(conn: &mut SqliteConnection, sql: &str) -> Vec<ColumnInfo> {
    match conn.describe(sql).await {
        Ok(describe) => describe
            .columns()
            .iter()
            .map(|col| ColumnInfo::new(col.name(), col.type_info().name()))
            .collect(),
        Err(e) => {
            debug!("Could not describe empty result: {e}");
            Vec::new()
        }
    }
}

fn column_info(row: &SqliteRow) -> Vec<ColumnInfo> {
    row.columns()
        .iter()
        .map(|col| ColumnInfo::new(col.name(), col.type_info().name()))
        .collect()
}

/// Converts a sqlx SqliteRow to our Row type.
fn convert_row(row: &SqliteRow) -> Row {
    (0..row.columns().len())
        .map(|i| convert_value(row, i))
        .collect()
}

/// Converts a single value by its storage class. SQLite types values, not columns.
fn convert_value(row: &SqliteRow, index: usize) -> Value {
    let storage_class = match row.try_get_raw(index) {
        Ok(raw) if raw.is_null() => return Value::Null,
        Ok(raw) => raw.type_info().name().to_uppercase(),
        Err(_) => return Value::Null,
    };

    match storage_class.as_str() {
        "INTEGER" | "BOOLEAN" => row
            .try_get::<i64, _>(index)
            .map(Value::Int)
            .unwrap_or(Value::Null),

        "REAL" | "NUMERIC" => row
            .try_get::<f64, _>(index)
            .map(Value::Float)
            .unwrap_or(Value::Null),

        "BLOB" => row
            .try_get::<Vec<u8>, _>(index)
            .map(Value::Bytes)
            .unwrap_or(Value::Null),

        _ => row
            .try_get::<String, _>(index)
            .map(Value::String)
            .unwrap_or(Value::Null),
    }
}

/// Determines if an error is transient and worth retrying.
fn is_transient_error(error: &sqlx::Error) -> bool {
    if matches!(error, sqlx::Error::PoolTimedOut) {
        return true;
    }

    let error_str = error.to_string().to_lowercase();
    error_str.contains("database is locked")
        || error_str.contains("busy")
        || error_str.contains("timed out")
}

/// Maps sqlx connection errors to user-friendly messages.
fn map_connection_error(error: sqlx::Error, config: &DatabaseConfig) -> GatewayError {
    let target = config.display_string();
    let error_str = error.to_string().to_lowercase();

    if error_str.contains("unable to open") {
        GatewayError::connection(format!("Cannot open {target}. Check the path and permissions."))
    } else if error_str.contains("not a database") {
        GatewayError::connection(format!("{target} is not a SQLite database."))
    } else if error_str.contains("locked") || error_str.contains("busy") {
        GatewayError::connection(format!("{target} is locked by another process."))
    } else {
        GatewayError::connection(error.to_string())
    }
}

/// Formats a query error, preferring the engine's own message.
fn format_query_error(error: sqlx::Error) -> String {
    match error.as_database_error() {
        Some(db_error) => format!("ERROR: {}", db_error.message()),
        None => error.to_string(),
    }
}
