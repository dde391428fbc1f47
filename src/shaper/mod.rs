//! Result shaping.
//!
//! Classifies a question into a presentation mode and packages an executed
//! result as a [`PresentationEnvelope`].

pub mod chart;
pub mod narrative;

pub use chart::{render_chart, ChartPoint, DEFAULT_POINT_BUDGET};
pub use narrative::{narrate, Summarizer, NO_RESULTS};

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::LimitsConfig;
use crate::db::{QueryResult, Row};

const CHART_KEYWORDS: &[&str] = &[
    "plot",
    "graph",
    "chart",
    "trend",
    "over time",
    "timeline",
    "time series",
];

const NARRATIVE_KEYWORDS: &[&str] = &[
    "summary",
    "summarize",
    "summarise",
    "explain",
    "average",
    "how many",
    "what is",
    "tell me",
];

/// How a caller should present the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputType {
    #[default]
    Table,
    Narrative,
    Chart,
}

impl OutputType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Table => "table",
            Self::Narrative => "narrative",
            Self::Chart => "chart",
        }
    }
}

impl fmt::Display for OutputType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Picks the presentation mode from the question wording.
///
/// Chart keywords win over narrative ones; anything else is a table.
pub fn classify_output(question: &str) -> OutputType {
    let question = question.to_lowercase();

    if CHART_KEYWORDS.iter().any(|kw| question.contains(kw)) {
        OutputType::Chart
    } else if NARRATIVE_KEYWORDS.iter().any(|kw| question.contains(kw)) {
        OutputType::Narrative
    } else {
        OutputType::Table
    }
}

/// The shaped response for one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresentationEnvelope {
    pub output_type: OutputType,
    pub question: String,
    /// The statement as executed, row cap included.
    pub sql: String,
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
    pub row_count: usize,
    pub truncated: bool,
    /// Base64 SVG data URI. Absent when there was nothing to plot.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chart_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary_text: Option<String>,
}

/// Turns executed results into presentation envelopes.
pub struct ResultShaper {
    summarizer: Arc<dyn Summarizer>,
    chart_points: usize,
    summary_rows: usize,
}

impl ResultShaper {
    pub fn new(summarizer: Arc<dyn Summarizer>, chart_points: usize, summary_rows: usize) -> Self {
        Self {
            summarizer,
            chart_points,
            summary_rows,
        }
    }

    pub fn from_limits(summarizer: Arc<dyn Summarizer>, limits: &LimitsConfig) -> Self {
        Self::new(summarizer, limits.chart_points, limits.summary_rows)
    }

    /// Shapes `result` for `question`.
    ///
    /// Never fails: an empty chart is reported as an absent image and a
    /// summarizer failure as a degraded summary text.
    pub async fn shape(&self, question: &str, sql: &str, result: QueryResult) -> PresentationEnvelope {
        let output_type = classify_output(question);
        let columns = result.column_names();

        let mut chart_image = None;
        let mut summary_text = None;

        match output_type {
            OutputType::Chart => {
                chart_image = render_chart(&columns, &result.rows, self.chart_points);
                if chart_image.is_none() {
                    debug!("no plottable points in result");
                }
            }
            OutputType::Narrative => {
                summary_text = Some(
                    narrate(
                        self.summarizer.as_ref(),
                        question,
                        sql,
                        &columns,
                        &result.rows,
                        self.summary_rows,
                    )
                    .await,
                );
            }
            OutputType::Table => {}
        }

        info!(
            output_type = %output_type,
            rows = result.row_count,
            truncated = result.was_truncated,
            "result shaped"
        );

        PresentationEnvelope {
            output_type,
            question: question.to_string(),
            sql: sql.to_string(),
            columns,
            row_count: result.row_count,
            truncated: result.was_truncated,
            rows: result.rows,
            chart_image,
            summary_text,
        }
    }
}
