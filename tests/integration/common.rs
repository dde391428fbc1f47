//! Shared fixtures: a seeded grid-operations store.

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use querygate::config::{DatabaseConfig, LimitsConfig};
use querygate::db::{DatabaseClient, SqliteClient};
use querygate::gateway::{GatewayConfig, QueryGateway};
use querygate::llm::{LlmSummarizer, MockLlmClient};
use querygate::policy::RolePolicy;
use sqlx::SqlitePool;
use tempfile::TempDir;

pub const SCHEMA: &[&str] = &[
    "CREATE TABLE meter_table (
        id INTEGER PRIMARY KEY,
        meter_id TEXT NOT NULL,
        datetime TEXT NOT NULL,
        forecasted_load_kwh REAL
    )",
    "CREATE TABLE customer_table (
        customer_id INTEGER PRIMARY KEY,
        customer_name TEXT NOT NULL,
        email TEXT,
        meter_id TEXT
    )",
    "CREATE TABLE Revenue_data (
        Datetime TEXT NOT NULL,
        Revenue REAL
    )",
];

pub const BASE_ROWS: &[&str] = &[
    "INSERT INTO meter_table (meter_id, datetime, forecasted_load_kwh) VALUES
        ('X', '2024-01-01', 10),
        ('X', '2024-01-02', 12),
        ('Y', '2024-01-01', 7.5)",
    "INSERT INTO customer_table (customer_name, email, meter_id) VALUES
        ('Asha Rao', 'asha@example.com', 'X'),
        ('Ben Ode', 'ben@example.com', 'Y')",
    "INSERT INTO Revenue_data (Datetime, Revenue) VALUES
        ('01-01-2024 00:00', 1520.5),
        ('02-01-2024 00:00', 1610.0),
        ('03-01-2024 00:00', 1498.25)",
];

/// A scratch store. Dropping it deletes the file.
pub struct Store {
    pub dir: TempDir,
    pub client: Arc<SqliteClient>,
}

impl Store {
    pub fn config(&self) -> DatabaseConfig {
        DatabaseConfig::from_path(self.dir.path().join("grid.db"))
    }
}

/// Creates the grid schema plus base rows plus `extra` statements.
pub async fn seeded_store(extra: &[&str]) -> Store {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("grid.db");

    let writer = SqlitePool::connect(&format!("sqlite:{}?mode=rwc", path.display()))
        .await
        .unwrap();
    for statement in SCHEMA.iter().chain(BASE_ROWS).chain(extra) {
        sqlx::query(statement).execute(&writer).await.unwrap();
    }
    writer.close().await;

    let client = SqliteClient::connect(&DatabaseConfig::from_path(&path))
        .await
        .unwrap();

    Store {
        dir,
        client: Arc::new(client),
    }
}

/// A view over the revenue ledger plus a table no role may read.
pub const RESTRICTED_RELATIONS: &[&str] = &[
    "CREATE VIEW money AS SELECT Revenue FROM Revenue_data",
    "CREATE TABLE secrets (pw TEXT)",
    "INSERT INTO secrets (pw) VALUES ('hunter2')",
];

/// Inserts `n` hourly readings for meter 'Z'.
pub fn hourly_readings(n: usize) -> String {
    format!(
        "WITH RECURSIVE seq(n) AS (SELECT 1 UNION ALL SELECT n + 1 FROM seq WHERE n < {n})
         INSERT INTO meter_table (meter_id, datetime, forecasted_load_kwh)
         SELECT 'Z', strftime('%Y-%m-%d %H:%M:%S', '2024-02-01 00:00:00', '+' || n || ' hours'), n * 1.5
         FROM seq"
    )
}

pub fn gateway(store: &Store, limits: LimitsConfig) -> (QueryGateway, Arc<MockLlmClient>) {
    gateway_with_policy(store, RolePolicy::default(), limits)
}

pub fn gateway_with_policy(
    store: &Store,
    policy: RolePolicy,
    limits: LimitsConfig,
) -> (QueryGateway, Arc<MockLlmClient>) {
    let llm = Arc::new(MockLlmClient::new());
    let summarizer = Arc::new(LlmSummarizer::new(llm.clone()));
    let gateway = QueryGateway::new(
        GatewayConfig::new(policy, limits),
        store.client.clone(),
        summarizer,
    );
    (gateway, llm)
}

/// A gateway that also knows every table and view in the store.
pub async fn schema_aware_gateway(store: &Store) -> QueryGateway {
    let schema = store.client.introspect_schema().await.unwrap();
    let llm = Arc::new(MockLlmClient::new());
    QueryGateway::new(
        GatewayConfig::new(RolePolicy::default(), LimitsConfig::default()).with_schema(&schema),
        store.client.clone(),
        Arc::new(LlmSummarizer::new(llm)),
    )
}

/// Decodes a chart data URI and returns the number of plotted points.
pub fn plotted_points(image: &str) -> usize {
    let payload = image
        .strip_prefix("data:image/svg+xml;base64,")
        .expect("svg data uri");
    let svg = String::from_utf8(STANDARD.decode(payload).unwrap()).unwrap();
    svg.split(r#"<polyline points=""#)
        .nth(1)
        .and_then(|rest| rest.split('"').next())
        .map(|points| points.split_whitespace().count())
        .unwrap_or(0)
}
