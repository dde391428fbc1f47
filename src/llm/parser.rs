//! Response parsing for LLM outputs.
//!
//! Extracts a candidate SQL statement from a completion that may be wrapped
//! in markdown fences or prefixed with a `SQL:` label, and recognizes the
//! generator's refusal sentinel.

use crate::llm::generator::GeneratedSql;

/// Returned by the generator when a question cannot be expressed as SQL.
pub const CANNOT_CONVERT: &str = "--CANNOT_CONVERT--";

/// Returns true if the text carries the refusal sentinel anywhere.
pub fn is_cannot_convert(text: &str) -> bool {
    text.contains(CANNOT_CONVERT)
}

/// Parses a generator completion into SQL or a refusal.
///
/// The result is still untrusted; it is only cleaned of presentation noise.
pub fn parse_sql_response(response: &str) -> GeneratedSql {
    if is_cannot_convert(response) {
        return GeneratedSql::CannotConvert;
    }

    let body = extract_code_block(response, "sql")
        .or_else(|| extract_code_block(response, ""))
        .unwrap_or_else(|| response.to_string());

    let sql = strip_label(body.trim(), "sql:").trim().to_string();

    if sql.is_empty() {
        GeneratedSql::CannotConvert
    } else {
        GeneratedSql::Sql(sql)
    }
}

/// Strips a case-insensitive leading label such as `SQL:` or `Summary:`.
pub fn strip_label<'a>(text: &'a str, label: &str) -> &'a str {
    match text.get(..label.len()) {
        Some(prefix) if prefix.eq_ignore_ascii_case(label) => text[label.len()..].trim_start(),
        _ => text,
    }
}

/// Extracts content from a markdown code block with the specified language.
///
/// Pass an empty string for `lang` to match blocks without a language specifier.
fn extract_code_block(text: &str, lang: &str) -> Option<String> {
    let start_pattern = format!("```{}", lang);
    let start_idx = text.find(&start_pattern)?;

    let after_pattern = start_idx + start_pattern.len();
    let content_start = text[after_pattern..]
        .find('\n')
        .map(|i| after_pattern + i + 1)?;

    // ```python is not a plain fence
    if lang.is_empty() && !text[start_idx + 3..content_start - 1].trim().is_empty() {
        return None;
    }

    let end_idx = text[content_start..].find("```")?;

    Some(text[content_start..content_start + end_idx].to_string())
}
