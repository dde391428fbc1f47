//! querygate - authorization gateway for LLM-generated SQL.

mod cli;

use std::io::Read;
use std::sync::Arc;

use anyhow::Context;
use cli::{Cli, Command};
use querygate::config::Config;
use querygate::db::{self, DatabaseClient, Schema};
use querygate::error::{ErrorResponse, GatewayError};
use querygate::gateway::{GatewayConfig, GatewayRequest, QueryGateway};
use querygate::llm::{create_client, LlmClient, LlmSummarizer, SqlGenerator};
use querygate::logging;
use serde::Serialize;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    // A missing .env is fine
    let _ = dotenvy::dotenv();
    logging::init_stderr_logging();

    let cli = Cli::parse_args();
    let pretty = cli.pretty;

    if let Err(e) = run(cli).await {
        match e.downcast_ref::<GatewayError>() {
            Some(gateway_error) => {
                error!("{}: {}", gateway_error.category(), gateway_error);
                let _ = print_json(&ErrorResponse::from(gateway_error), pretty);
            }
            None => error!("{:#}", e),
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(&cli)?;
    info!("Store: {}", config.database.display_string());

    let db: Arc<dyn DatabaseClient> = Arc::from(db::connect(&config.database).await?);
    let result = dispatch(&cli, &config, Arc::clone(&db)).await;
    db.close().await?;
    result
}

async fn dispatch(cli: &Cli, config: &Config, db: Arc<dyn DatabaseClient>) -> anyhow::Result<()> {
    let schema = db.introspect_schema().await?;

    match &cli.command {
        Command::Schema => {
            print!("{}", schema.format_for_llm());
            Ok(())
        }
        Command::Ask { role, question } => {
            let llm: Arc<dyn LlmClient> = Arc::from(create_client(&config.llm)?);
            let gateway = build_gateway(config, db, &schema, Arc::clone(&llm));
            let generator = SqlGenerator::new(llm);
            let envelope = gateway.answer(question, role, &generator).await?;
            print_json(&envelope, cli.pretty)
        }
        Command::Run { role, question, sql } => {
            let llm: Arc<dyn LlmClient> = Arc::from(create_client(&config.llm)?);
            let gateway = build_gateway(config, db, &schema, llm);
            let request = GatewayRequest::new(question.as_str(), read_sql(sql)?, role.as_str());
            let envelope = gateway.handle(&request).await?;
            print_json(&envelope, cli.pretty)
        }
    }
}

fn build_gateway(
    config: &Config,
    db: Arc<dyn DatabaseClient>,
    schema: &Schema,
    llm: Arc<dyn LlmClient>,
) -> QueryGateway {
    let summarizer = Arc::new(LlmSummarizer::new(llm));
    QueryGateway::new(
        GatewayConfig::from_config(config).with_schema(schema),
        db,
        summarizer,
    )
}

/// Loads the config file, then layers CLI flags and the environment on top.
fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let config_path = cli.config_path();
    info!("Loading config from: {}", config_path.display());
    let mut config = Config::load_from_file(&config_path)?;

    if let Some(path) = &cli.database {
        config.database.path = Some(path.clone());
    }
    if let Some(provider) = &cli.llm {
        config.llm.provider = provider.clone();
    }

    Ok(config.finalize()?)
}

fn read_sql(arg: &str) -> anyhow::Result<String> {
    if arg != "-" {
        return Ok(arg.to_string());
    }

    let mut sql = String::new();
    std::io::stdin()
        .read_to_string(&mut sql)
        .context("Failed to read SQL from stdin")?;
    Ok(sql)
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> anyhow::Result<()> {
    let json = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
    .context("Failed to serialize response")?;
    println!("{json}");
    Ok(())
}
