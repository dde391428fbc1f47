//! Schema introspection tests.

use querygate::db::{DatabaseClient, SqliteClient};

use super::common::{seeded_store, RESTRICTED_RELATIONS};

#[tokio::test]
async fn test_introspect_grid_schema() {
    let store = seeded_store(&[]).await;

    let schema = store.client.introspect_schema().await.unwrap();

    let mut names = schema.table_names();
    names.sort();
    assert_eq!(names, vec!["customer_table", "meter_table", "revenue_data"]);

    let meter = schema
        .tables
        .iter()
        .find(|t| t.name == "meter_table")
        .unwrap();
    let id = meter.columns.iter().find(|c| c.name == "id").unwrap();
    assert!(id.is_primary_key);
    let meter_id = meter.columns.iter().find(|c| c.name == "meter_id").unwrap();
    assert!(!meter_id.is_nullable);
}

#[tokio::test]
async fn test_schema_description_for_generator() {
    let store = seeded_store(&[]).await;

    let description = store
        .client
        .introspect_schema()
        .await
        .unwrap()
        .format_for_llm();

    assert!(description.starts_with("Database Schema:"));
    assert!(description.contains("Table: Revenue_data"));
    assert!(description.contains("  - forecasted_load_kwh: REAL"));
}

#[tokio::test]
async fn test_reconnect_from_config() {
    let store = seeded_store(&[]).await;

    let client = SqliteClient::connect(&store.config()).await.unwrap();
    let schema = client.introspect_schema().await.unwrap();
    assert_eq!(schema.tables.len(), 3);
    client.close().await.unwrap();
}

#[tokio::test]
async fn test_introspection_includes_views() {
    let store = seeded_store(RESTRICTED_RELATIONS).await;

    let schema = store.client.introspect_schema().await.unwrap();

    let names = schema.table_names();
    assert!(names.contains(&"money".to_string()));
    assert!(names.contains(&"secrets".to_string()));
    let money = schema.tables.iter().find(|t| t.name == "money").unwrap();
    assert_eq!(money.columns[0].name, "Revenue");
}
