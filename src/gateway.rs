//! The query authorization gateway.
//!
//! Wires validation, table extraction, role authorization, bounded execution
//! and result shaping into one fail-closed pipeline. Every stage can stop the
//! request; nothing downstream runs on a rejected statement.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::{Config, LimitsConfig};
use crate::db::{DatabaseClient, Schema};
use crate::error::{GatewayError, Result};
use crate::llm::{is_cannot_convert, GeneratedSql, SqlGenerator};
use crate::policy::{table_permitted, RolePolicy};
use crate::query::BoundedExecutor;
use crate::safety::{Statement, StatementValidator, TableExtractor};
use crate::shaper::{PresentationEnvelope, ResultShaper, Summarizer};

/// Immutable settings a gateway is built from.
#[derive(Debug, Clone, Default)]
pub struct GatewayConfig {
    pub policy: RolePolicy,
    pub limits: LimitsConfig,
    /// Table names scanned for in addition to the policy's, usually from the
    /// introspected schema.
    pub known_tables: BTreeSet<String>,
}

impl GatewayConfig {
    pub fn new(policy: RolePolicy, limits: LimitsConfig) -> Self {
        Self {
            policy,
            limits,
            known_tables: BTreeSet::new(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.role_policy(), config.limits)
    }

    /// Adds every table of `schema` to the known tables.
    pub fn with_schema(mut self, schema: &Schema) -> Self {
        self.known_tables.extend(schema.table_names());
        self
    }
}

/// One request: a question, the untrusted SQL generated for it, and the
/// caller's role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayRequest {
    pub question: String,
    pub generated_sql: String,
    pub role: String,
}

impl GatewayRequest {
    pub fn new(
        question: impl Into<String>,
        generated_sql: impl Into<String>,
        role: impl Into<String>,
    ) -> Self {
        Self {
            question: question.into(),
            generated_sql: generated_sql.into(),
            role: role.into(),
        }
    }
}

/// Decides whether generated SQL may run for a role, runs it, and shapes the
/// result.
pub struct QueryGateway {
    policy: Arc<RolePolicy>,
    validator: StatementValidator,
    extractor: Arc<TableExtractor>,
    executor: BoundedExecutor,
    shaper: ResultShaper,
    db: Arc<dyn DatabaseClient>,
}

impl QueryGateway {
    pub fn new(
        config: GatewayConfig,
        db: Arc<dyn DatabaseClient>,
        summarizer: Arc<dyn Summarizer>,
    ) -> Self {
        let known = config
            .policy
            .known_tables()
            .into_iter()
            .chain(config.known_tables);
        let extractor = Arc::new(TableExtractor::new(known));

        Self {
            executor: BoundedExecutor::new(
                Arc::clone(&db),
                Arc::clone(&extractor),
                config.limits.max_rows,
            ),
            shaper: ResultShaper::from_limits(summarizer, &config.limits),
            policy: Arc::new(config.policy),
            validator: StatementValidator::new(),
            extractor,
            db,
        }
    }

    pub fn policy(&self) -> &RolePolicy {
        &self.policy
    }

    /// Runs one request through the pipeline.
    pub async fn handle(&self, request: &GatewayRequest) -> Result<PresentationEnvelope> {
        let role = request.role.as_str();

        if is_cannot_convert(&request.generated_sql) {
            warn!(role, "generator could not convert the question");
            return Err(GatewayError::generation_failed(
                "the question could not be converted to SQL",
            ));
        }

        let statement =
            Statement::analyze(request.generated_sql.trim(), &self.validator, &self.extractor);

        if let Err(rejection) = statement.verdict() {
            warn!(
                target: "audit",
                role,
                reason = rejection.kind(),
                detail = %rejection,
                "statement rejected"
            );
            return Err(GatewayError::Rejected(rejection.clone()));
        }

        let allowed = self.policy.allowed_tables(role);
        if let Some(table) = statement
            .tables()
            .iter()
            .find(|t| !table_permitted(&allowed, t))
        {
            warn!(
                target: "audit",
                role,
                table = %table,
                reason = "unauthorized_table_access",
                "table access denied"
            );
            return Err(GatewayError::UnauthorizedTableAccess(table.clone()));
        }

        let outcome = self.executor.execute(statement.sql(), &allowed).await?;
        info!(
            role,
            tables = ?statement.tables(),
            rows = outcome.result.row_count,
            elapsed_ms = outcome.result.execution_time.as_millis() as u64,
            "statement executed"
        );

        Ok(self
            .shaper
            .shape(&request.question, &outcome.sql, outcome.result)
            .await)
    }

    /// Generates SQL for `question` and runs it as `role`.
    pub async fn answer(
        &self,
        question: &str,
        role: &str,
        generator: &SqlGenerator,
    ) -> Result<PresentationEnvelope> {
        let schema = self.db.introspect_schema().await?;

        match generator.generate(question, &schema).await? {
            GeneratedSql::Sql(sql) => {
                self.handle(&GatewayRequest::new(question, sql, role)).await
            }
            GeneratedSql::CannotConvert => {
                warn!(role, "generator could not convert the question");
                Err(GatewayError::generation_failed(
                    "the question could not be converted to SQL",
                ))
            }
        }
    }
}
