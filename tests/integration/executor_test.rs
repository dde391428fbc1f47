//! Bounded executor tests, calling it directly without the gateway pre-check.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use querygate::error::GatewayError;
use querygate::policy::RolePolicy;
use querygate::query::BoundedExecutor;
use querygate::safety::TableExtractor;

use super::common::{hourly_readings, seeded_store, RESTRICTED_RELATIONS};

fn executor(store: &super::common::Store, max_rows: usize) -> BoundedExecutor {
    let policy = RolePolicy::default();
    let extractor = Arc::new(TableExtractor::new(policy.known_tables()));
    BoundedExecutor::new(store.client.clone(), extractor, max_rows)
}

#[tokio::test]
async fn test_executor_denies_without_upstream_checks() {
    let store = seeded_store(&[]).await;
    let executor = executor(&store, 200);
    let planner = RolePolicy::default().allowed_tables("planner");

    for sql in [
        "SELECT * FROM revenue_data",
        "SELECT c.customer_name FROM customer_table c JOIN Revenue_data r ON 1 = 1",
        "SELECT * FROM meter_table WHERE EXISTS (SELECT 1 FROM \"Revenue_data\")",
    ] {
        let err = executor.execute(sql, &planner).await.unwrap_err();
        assert_eq!(
            err,
            GatewayError::UnauthorizedTableAccess("revenue_data".to_string()),
            "{sql}"
        );
    }
}

#[tokio::test]
async fn test_cte_names_need_authorization() {
    let store = seeded_store(&[]).await;
    let executor = executor(&store, 200);
    let planner = RolePolicy::default().allowed_tables("planner");

    let err = executor
        .execute(
            "WITH z AS (SELECT * FROM meter_table) SELECT * FROM z",
            &planner,
        )
        .await
        .unwrap_err();
    assert_eq!(err, GatewayError::UnauthorizedTableAccess("z".to_string()));
}

#[tokio::test]
async fn test_executor_revalidates() {
    let store = seeded_store(&[]).await;
    let executor = executor(&store, 200);
    let admin = RolePolicy::default().allowed_tables("admin");

    let err = executor
        .execute("SELECT 1; DELETE FROM meter_table", &admin)
        .await
        .unwrap_err();
    assert_eq!(err.category(), "rejected");
}

#[tokio::test]
async fn test_executor_runs_authorized_select() {
    let store = seeded_store(&[]).await;
    let executor = executor(&store, 200);
    let planner = RolePolicy::default().allowed_tables("planner");

    let outcome = executor
        .execute(
            "SELECT meter_id, forecasted_load_kwh FROM meter_table WHERE meter_id = 'X' ORDER BY datetime",
            &planner,
        )
        .await
        .unwrap();

    assert_eq!(
        outcome.sql,
        "SELECT meter_id, forecasted_load_kwh FROM meter_table WHERE meter_id = 'X' ORDER BY datetime LIMIT 200"
    );
    assert_eq!(outcome.result.column_names(), vec!["meter_id", "forecasted_load_kwh"]);
    assert_eq!(outcome.result.rows.len(), 2);
    assert_eq!(outcome.result.rows[1][1].as_f64(), Some(12.0));
}

#[tokio::test]
async fn test_executor_caps_rows() {
    let seed = hourly_readings(300);
    let store = seeded_store(&[&seed]).await;
    let executor = executor(&store, 50);
    let planner = RolePolicy::default().allowed_tables("planner");

    let outcome = executor
        .execute(
            "SELECT * FROM meter_table WHERE meter_id = 'Z'",
            &planner,
        )
        .await
        .unwrap();

    assert_eq!(outcome.result.row_count, 50);
    assert!(outcome.sql.ends_with("LIMIT 50"));
}

#[tokio::test]
async fn test_from_list_tail_is_authorized() {
    let store = seeded_store(RESTRICTED_RELATIONS).await;
    let executor = executor(&store, 200);
    let planner = RolePolicy::default().allowed_tables("planner");

    for (sql, table) in [
        ("SELECT * FROM meter_table, (SELECT 1) s, secrets", "secrets"),
        ("SELECT * FROM meter_table, (SELECT 1) s, money", "money"),
        (
            "SELECT * FROM meter_table m JOIN customer_table c ON 1 = 1, secrets",
            "secrets",
        ),
        (
            "SELECT * FROM (meter_table m JOIN customer_table c ON m.meter_id = c.meter_id), money",
            "money",
        ),
    ] {
        let err = executor.execute(sql, &planner).await.unwrap_err();
        assert_eq!(
            err,
            GatewayError::UnauthorizedTableAccess(table.to_string()),
            "{sql}"
        );
    }
}

#[tokio::test]
async fn test_view_needs_its_own_grant() {
    let store = seeded_store(RESTRICTED_RELATIONS).await;
    let executor = executor(&store, 200);
    let admin = RolePolicy::default().allowed_tables("admin");

    let err = executor
        .execute("SELECT Revenue FROM money", &admin)
        .await
        .unwrap_err();
    assert_eq!(err, GatewayError::UnauthorizedTableAccess("money".to_string()));
}
