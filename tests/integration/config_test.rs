//! Configuration file tests: custom role policies and limits.

use pretty_assertions::assert_eq;
use querygate::config::Config;
use querygate::gateway::GatewayRequest;
use querygate::shaper::OutputType;

use super::common::{gateway_with_policy, seeded_store};

const CONFIG: &str = r#"
[limits]
max_rows = 1

[llm]
provider = "mock"

[roles]
analyst = ["Revenue_data"]
support = ["customer_table"]
"#;

fn write_config(dir: &tempfile::TempDir) -> std::path::PathBuf {
    let path = dir.path().join("config.toml");
    std::fs::write(&path, CONFIG).unwrap();
    path
}

#[tokio::test]
async fn test_configured_roles_replace_builtin_policy() {
    let store = seeded_store(&[]).await;
    let dir = tempfile::tempdir().unwrap();
    let config = Config::load_from_file(&write_config(&dir)).unwrap();
    let (gateway, _) = gateway_with_policy(&store, config.role_policy(), config.limits);

    let envelope = gateway
        .handle(&GatewayRequest::new(
            "list revenue",
            "SELECT Revenue FROM Revenue_data ORDER BY Revenue",
            "Analyst",
        ))
        .await
        .unwrap();
    assert_eq!(envelope.output_type, OutputType::Table);
    assert_eq!(envelope.rows.len(), 1);
    assert_eq!(envelope.sql, "SELECT Revenue FROM Revenue_data ORDER BY Revenue LIMIT 1");

    let err = gateway
        .handle(&GatewayRequest::new(
            "list meters",
            "SELECT * FROM meter_table",
            "analyst",
        ))
        .await
        .unwrap_err();
    assert!(err.is_forbidden());

    // Built-in roles are gone once [roles] is configured
    let err = gateway
        .handle(&GatewayRequest::new(
            "list customers",
            "SELECT * FROM customer_table",
            "admin",
        ))
        .await
        .unwrap_err();
    assert!(err.is_forbidden());
}

#[test]
fn test_missing_config_uses_builtin_policy() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::load_from_file(&dir.path().join("absent.toml")).unwrap();
    let policy = config.role_policy();

    assert!(policy.permits("admin", "revenue_data"));
    assert!(!policy.permits("planner", "revenue_data"));
    assert_eq!(config.limits.max_rows, 200);
}

#[tokio::test]
async fn test_mixed_case_role_config_is_reachable() {
    let store = seeded_store(&[]).await;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        "[roles]\nAnalyst = [\"Meter_Table\"]\nops = [\"Meter_Table\"]\n",
    )
    .unwrap();
    let config = Config::load_from_file(&path).unwrap();
    let (gateway, _) = gateway_with_policy(&store, config.role_policy(), config.limits);

    for role in ["Analyst", "analyst", "ops"] {
        let envelope = gateway
            .handle(&GatewayRequest::new(
                "list meters",
                "SELECT meter_id FROM meter_table ORDER BY id",
                role,
            ))
            .await
            .unwrap();
        assert_eq!(envelope.rows.len(), 3, "{role}");
    }
}
