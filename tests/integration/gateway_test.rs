//! End-to-end gateway tests against a seeded SQLite store.

use pretty_assertions::assert_eq;
use querygate::config::LimitsConfig;
use querygate::error::{ErrorResponse, GatewayError};
use querygate::gateway::GatewayRequest;
use querygate::llm::SqlGenerator;
use querygate::safety::Rejection;
use querygate::shaper::{OutputType, NO_RESULTS};

use super::common::{
    gateway, hourly_readings, plotted_points, schema_aware_gateway, seeded_store,
    RESTRICTED_RELATIONS,
};

#[tokio::test]
async fn test_planner_denied_revenue() {
    let store = seeded_store(&[]).await;
    let (gateway, _) = gateway(&store, LimitsConfig::default());

    let err = gateway
        .handle(&GatewayRequest::new(
            "show revenue",
            "SELECT * FROM revenue_data;",
            "planner",
        ))
        .await
        .unwrap_err();

    assert_eq!(
        err,
        GatewayError::UnauthorizedTableAccess("revenue_data".to_string())
    );

    let body = ErrorResponse::from(&err);
    assert_eq!(body.category, "forbidden");
    assert_eq!(body.table.as_deref(), Some("revenue_data"));
}

#[tokio::test]
async fn test_admin_multi_statement_rejected() {
    let store = seeded_store(&[]).await;
    let (gateway, _) = gateway(&store, LimitsConfig::default());

    let err = gateway
        .handle(&GatewayRequest::new(
            "q",
            "SELECT id FROM meter_table; DROP TABLE meter_table;",
            "admin",
        ))
        .await
        .unwrap_err();

    assert_eq!(err, GatewayError::Rejected(Rejection::MultiStatement));

    // The table is still there
    let envelope = gateway
        .handle(&GatewayRequest::new(
            "list meters",
            "SELECT COUNT(*) AS total FROM meter_table",
            "admin",
        ))
        .await
        .unwrap();
    assert_eq!(envelope.rows[0][0].as_f64(), Some(3.0));
}

#[tokio::test]
async fn test_load_trend_renders_two_point_chart() {
    let store = seeded_store(&[]).await;
    let (gateway, llm) = gateway(&store, LimitsConfig::default());

    let envelope = gateway
        .handle(&GatewayRequest::new(
            "show trend of load for meter X",
            "SELECT datetime, forecasted_load_kwh FROM meter_table WHERE meter_id = 'X' ORDER BY datetime",
            "planner",
        ))
        .await
        .unwrap();

    assert_eq!(envelope.output_type, OutputType::Chart);
    assert_eq!(envelope.row_count, 2);
    assert_eq!(plotted_points(envelope.chart_image.as_deref().unwrap()), 2);
    assert_eq!(llm.call_count(), 0);
}

#[tokio::test]
async fn test_empty_revenue_summary() {
    let store = seeded_store(&[]).await;
    let (gateway, llm) = gateway(&store, LimitsConfig::default());

    let envelope = gateway
        .handle(&GatewayRequest::new(
            "summarize revenue",
            "SELECT Datetime, Revenue FROM Revenue_data WHERE Revenue < 0",
            "admin",
        ))
        .await
        .unwrap();

    assert_eq!(envelope.output_type, OutputType::Narrative);
    assert_eq!(envelope.summary_text.as_deref(), Some(NO_RESULTS));
    assert!(envelope.rows.is_empty());
    assert_eq!(envelope.columns, vec!["Datetime", "Revenue"]);
    assert_eq!(llm.call_count(), 0);
}

#[tokio::test]
async fn test_narrative_calls_summarizer() {
    let store = seeded_store(&[]).await;
    let (gateway, llm) = gateway(&store, LimitsConfig::default());

    let envelope = gateway
        .handle(&GatewayRequest::new(
            "summarize revenue",
            "SELECT Datetime, Revenue FROM Revenue_data",
            "admin",
        ))
        .await
        .unwrap();

    assert_eq!(
        envelope.summary_text.as_deref(),
        Some("The query returned the requested rows.")
    );
    assert_eq!(llm.call_count(), 1);
}

#[tokio::test]
async fn test_same_select_is_idempotent() {
    let store = seeded_store(&[]).await;
    let (gateway, _) = gateway(&store, LimitsConfig::default());
    let request = GatewayRequest::new(
        "list customers",
        "SELECT customer_name, email FROM customer_table ORDER BY customer_id",
        "planner",
    );

    let first = gateway.handle(&request).await.unwrap();
    let second = gateway.handle(&request).await.unwrap();

    assert_eq!(first.output_type, OutputType::Table);
    assert_eq!(first.columns, second.columns);
    assert_eq!(first.rows, second.rows);
    assert_eq!(first.rows.len(), 2);
}

#[tokio::test]
async fn test_row_cap_without_limit() {
    let seed = hourly_readings(500);
    let store = seeded_store(&[&seed]).await;
    let limits = LimitsConfig {
        max_rows: 100,
        ..LimitsConfig::default()
    };
    let (gateway, _) = gateway(&store, limits);

    let envelope = gateway
        .handle(&GatewayRequest::new(
            "list readings",
            "SELECT * FROM meter_table",
            "planner",
        ))
        .await
        .unwrap();

    assert_eq!(envelope.row_count, 100);
    assert_eq!(envelope.rows.len(), 100);
    assert_eq!(envelope.sql, "SELECT * FROM meter_table LIMIT 100");
}

#[tokio::test]
async fn test_row_cap_with_larger_explicit_limit() {
    let seed = hourly_readings(500);
    let store = seeded_store(&[&seed]).await;
    let limits = LimitsConfig {
        max_rows: 100,
        ..LimitsConfig::default()
    };
    let (gateway, _) = gateway(&store, limits);

    let envelope = gateway
        .handle(&GatewayRequest::new(
            "list readings",
            "SELECT * FROM meter_table LIMIT 400",
            "planner",
        ))
        .await
        .unwrap();

    assert_eq!(envelope.rows.len(), 100);
    assert!(envelope.truncated);
}

#[tokio::test]
async fn test_chart_downsampling() {
    let seed = hourly_readings(500);
    let store = seeded_store(&[&seed]).await;
    let limits = LimitsConfig {
        max_rows: 1000,
        chart_points: 200,
        ..LimitsConfig::default()
    };
    let (gateway, _) = gateway(&store, limits);

    let envelope = gateway
        .handle(&GatewayRequest::new(
            "plot load over time for meter Z",
            "SELECT datetime, forecasted_load_kwh FROM meter_table WHERE meter_id = 'Z'",
            "planner",
        ))
        .await
        .unwrap();

    // step = 500 / 200 = 2, so 500 / 2 points
    assert_eq!(envelope.row_count, 500);
    assert_eq!(plotted_points(envelope.chart_image.as_deref().unwrap()), 250);
}

#[tokio::test]
async fn test_revenue_chart_parses_day_first_dates() {
    let store = seeded_store(&[]).await;
    let (gateway, _) = gateway(&store, LimitsConfig::default());

    let envelope = gateway
        .handle(&GatewayRequest::new(
            "plot revenue",
            "SELECT Datetime, Revenue FROM Revenue_data",
            "admin",
        ))
        .await
        .unwrap();

    assert_eq!(plotted_points(envelope.chart_image.as_deref().unwrap()), 3);
}

#[tokio::test]
async fn test_chart_with_no_dates_has_no_image() {
    let store = seeded_store(&[]).await;
    let (gateway, _) = gateway(&store, LimitsConfig::default());

    let envelope = gateway
        .handle(&GatewayRequest::new(
            "chart customers",
            "SELECT customer_name, customer_id FROM customer_table",
            "planner",
        ))
        .await
        .unwrap();

    assert_eq!(envelope.output_type, OutputType::Chart);
    assert_eq!(envelope.chart_image, None);
    assert_eq!(envelope.rows.len(), 2);
}

#[tokio::test]
async fn test_quoted_and_cased_names_are_still_denied() {
    let store = seeded_store(&[]).await;
    let (gateway, _) = gateway(&store, LimitsConfig::default());

    for sql in [
        r#"SELECT * FROM "Revenue_data""#,
        "SELECT * FROM REVENUE_DATA",
        "SELECT * FROM `revenue_data`",
        "SELECT * FROM [Revenue_data]",
        "SELECT m.meter_id FROM meter_table m WHERE m.forecasted_load_kwh > (SELECT AVG(Revenue) FROM Revenue_data)",
        "WITH r AS (SELECT * FROM Revenue_data) SELECT * FROM r",
    ] {
        let err = gateway
            .handle(&GatewayRequest::new("q", sql, "planner"))
            .await
            .unwrap_err();
        assert!(err.is_forbidden(), "{sql} was not denied: {err}");
    }
}

#[tokio::test]
async fn test_write_statements_never_reach_the_store() {
    let store = seeded_store(&[]).await;
    let (gateway, _) = gateway(&store, LimitsConfig::default());

    for sql in [
        "DELETE FROM meter_table",
        "UPDATE meter_table SET forecasted_load_kwh = 0",
        "INSERT INTO meter_table (meter_id, datetime) VALUES ('Q', '2024-01-01')",
        "PRAGMA table_info(meter_table)",
        "SELECT * FROM meter_table -- trailing comment",
    ] {
        let err = gateway
            .handle(&GatewayRequest::new("q", sql, "admin"))
            .await
            .unwrap_err();
        assert_eq!(err.category(), "rejected", "{sql}");
    }

    let envelope = gateway
        .handle(&GatewayRequest::new(
            "q",
            "SELECT COUNT(*) AS total FROM meter_table",
            "admin",
        ))
        .await
        .unwrap();
    assert_eq!(envelope.rows[0][0].as_f64(), Some(3.0));
}

#[tokio::test]
async fn test_store_error_is_execution_error() {
    let store = seeded_store(&[]).await;
    let (gateway, _) = gateway(&store, LimitsConfig::default());

    let err = gateway
        .handle(&GatewayRequest::new(
            "q",
            "SELECT no_such_column FROM meter_table",
            "admin",
        ))
        .await
        .unwrap_err();

    assert_eq!(err.category(), "execution_error");
    assert!(!err.is_forbidden());
}

#[tokio::test]
async fn test_answer_end_to_end() {
    let store = seeded_store(&[]).await;
    let (gateway, _) = gateway(&store, LimitsConfig::default());
    let generator = SqlGenerator::new(std::sync::Arc::new(
        querygate::llm::MockLlmClient::new(),
    ));

    let envelope = gateway
        .answer("plot revenue over time", "admin", &generator)
        .await
        .unwrap();
    assert_eq!(envelope.output_type, OutputType::Chart);
    assert_eq!(envelope.sql, "SELECT Datetime, Revenue FROM Revenue_data LIMIT 200");
    assert!(envelope.chart_image.is_some());

    let err = gateway
        .answer("plot revenue over time", "planner", &generator)
        .await
        .unwrap_err();
    assert!(err.is_forbidden());
}

#[tokio::test]
async fn test_restricted_relations_after_derived_table_or_join() {
    let store = seeded_store(RESTRICTED_RELATIONS).await;
    let (plain, _) = gateway(&store, LimitsConfig::default());
    let with_schema = schema_aware_gateway(&store).await;

    for sql in [
        "SELECT * FROM meter_table, (SELECT 1) s, money",
        "SELECT * FROM meter_table, (SELECT 1) s, secrets",
        "SELECT * FROM meter_table m JOIN customer_table c ON 1 = 1, secrets",
        "SELECT * FROM money",
    ] {
        for gate in [&plain, &with_schema] {
            let err = gate
                .handle(&GatewayRequest::new("q", sql, "planner"))
                .await
                .unwrap_err();
            assert!(err.is_forbidden(), "{sql} was not denied: {err}");
        }
    }
}
