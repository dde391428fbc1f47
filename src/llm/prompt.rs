//! Prompt construction for LLM requests.
//!
//! Builds the SQL generation prompt (schema plus few-shot examples) and the
//! result summary prompt.

use crate::db::{Row, Schema};
use crate::llm::parser::CANNOT_CONVERT;
use crate::llm::types::Message;

const GENERATOR_SYSTEM_PROMPT: &str =
    "You are an assistant that converts natural language to SQL for SQLite. Be precise.";

/// Rules and examples for the generator. `{sentinel}` is substituted.
const GENERATOR_RULES: &str = r#"Convert the question to a single SQLite SELECT statement.
Rules:
- Use only the table and column names provided in the schema.
- Return ONLY the SQL query (one statement). Do NOT add explanations, comments or backticks.
- Use single quotes for string literals.
- Only read data. Never modify it.
- If the question cannot be converted to SQL (ambiguous / no columns), respond with exactly: {sentinel}

Examples:
Question: show customer name and email for meter 740-60-4283
SQL: SELECT c.customer_name, c.email FROM customer_table c WHERE c.meter_id = '740-60-4283';

Question: show the load trend for meter MTR001
SQL: SELECT datetime, forecasted_load_kwh FROM meter_table WHERE meter_id = 'MTR001' ORDER BY datetime;

Question: count rows in meter_table
SQL: SELECT COUNT(*) FROM meter_table;"#;

const SUMMARY_SYSTEM_PROMPT: &str =
    "You summarize SQL results into natural language. Be concise.";

/// Builds the message list for SQL generation.
pub fn build_sql_messages(question: &str, schema: &Schema) -> Vec<Message> {
    let rules = GENERATOR_RULES.replace("{sentinel}", CANNOT_CONVERT);
    let user = format!(
        "{rules}\n\n{schema}\nQuestion: {question}\nSQL:",
        schema = schema.format_for_llm(),
    );

    vec![Message::system(GENERATOR_SYSTEM_PROMPT), Message::user(user)]
}

/// Builds the message list for summarizing sample rows.
pub fn build_summary_messages(
    question: &str,
    sql: &str,
    columns: &[String],
    rows: &[Row],
) -> Vec<Message> {
    let rows_json = serde_json::to_string(rows).unwrap_or_else(|_| "[]".to_string());
    let user = format!(
        "You are an assistant that summarizes SQL query results in natural language.\n\
         Rules:\n\
         - Produce a concise summary (1-3 sentences).\n\
         - Mention important numeric values (counts, max/min) if helpful.\n\n\
         Query: {sql}\n\
         Question: {question}\n\
         Columns: {columns}\n\
         Rows: {rows_json}\n\n\
         Summary:",
        columns = columns.join(", "),
    );

    vec![Message::system(SUMMARY_SYSTEM_PROMPT), Message::user(user)]
}
