//! Time-series chart rendering.
//!
//! Picks a datetime axis and a numeric series out of an arbitrary column
//! layout, orders and downsamples the points, and renders a compact SVG line
//! chart embedded as a base64 data URI.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};

use crate::db::{Row, Value};

/// Default maximum number of plotted points.
pub const DEFAULT_POINT_BUDGET: usize = 200;

const WIDTH: f64 = 800.0;
const HEIGHT: f64 = 300.0;
const MARGIN_LEFT: f64 = 70.0;
const MARGIN_RIGHT: f64 = 20.0;
const MARGIN_TOP: f64 = 30.0;
const MARGIN_BOTTOM: f64 = 40.0;

/// Rows probed when no column name looks like a date.
const DATE_PROBE_ROWS: usize = 5;

const VALUE_HINTS: &[&str] = &[
    "load", "revenue", "kwh", "mw", "avg", "sum", "total", "count", "max", "min",
];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d"];

/// Day-first layouts used by the revenue ledger.
const DAY_FIRST_DATETIME_FORMATS: &[&str] = &["%d-%m-%Y %H:%M"];
const DAY_FIRST_DATE_FORMATS: &[&str] = &["%d-%m-%Y"];

/// One plotted sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChartPoint {
    pub at: NaiveDateTime,
    pub value: f64,
}

/// Parses a datetime cell against the supported layouts, in order.
pub fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .or_else(|| parse_date(text, DATE_FORMATS))
        .or_else(|| parse_year_month(text))
        .or_else(|| parse_year_week(text))
        .or_else(|| {
            DAY_FIRST_DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        })
        .or_else(|| parse_date(text, DAY_FIRST_DATE_FORMATS))
}

fn parse_date(text: &str, formats: &[&str]) -> Option<NaiveDateTime> {
    formats
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
        .map(|date| date.and_time(NaiveTime::MIN))
}

/// `YYYY-MM`, pinned to the first of the month.
fn parse_year_month(text: &str) -> Option<NaiveDateTime> {
    let (year, month) = text.split_once('-')?;
    if year.len() != 4 || month.is_empty() || month.len() > 2 {
        return None;
    }
    let date = NaiveDate::from_ymd_opt(year.parse().ok()?, month.parse().ok()?, 1)?;
    Some(date.and_time(NaiveTime::MIN))
}

/// `YYYY-Www` as produced by SQLite's `strftime('%Y-W%W', ...)`.
///
/// Week 1 starts on the first Monday of the year; week 0 is the partial week
/// before it.
fn parse_year_week(text: &str) -> Option<NaiveDateTime> {
    let (year, week) = text.split_once("-W").or_else(|| text.split_once("-w"))?;
    if year.len() != 4 || week.is_empty() || week.len() > 2 {
        return None;
    }
    let year: i32 = year.parse().ok()?;
    let week: i64 = week.parse().ok()?;
    if week > 53 {
        return None;
    }

    let jan1 = NaiveDate::from_ymd_opt(year, 1, 1)?;
    let to_monday = (7 - i64::from(jan1.weekday().num_days_from_monday())) % 7;
    let first_monday = jan1.checked_add_signed(TimeDelta::try_days(to_monday)?)?;
    let start = first_monday.checked_add_signed(TimeDelta::try_days((week - 1) * 7)?)?;
    Some(start.and_time(NaiveTime::MIN))
}

fn cell_datetime(value: &Value) -> Option<NaiveDateTime> {
    value.as_text().and_then(parse_datetime)
}

/// Index of the datetime axis column, or `None` when there are no columns.
pub fn datetime_column(columns: &[String], rows: &[Row]) -> Option<usize> {
    if columns.is_empty() {
        return None;
    }

    let by_name = columns.iter().position(|name| {
        let name = name.to_lowercase();
        name.contains("date") || name.contains("time")
    });
    if by_name.is_some() {
        return by_name;
    }

    let probe = &rows[..rows.len().min(DATE_PROBE_ROWS)];
    let by_values = (0..columns.len()).find(|&idx| {
        let mut cells = probe
            .iter()
            .filter_map(|row| row.get(idx))
            .filter(|v| !v.is_null())
            .peekable();
        cells.peek().is_some() && cells.all(|v| cell_datetime(v).is_some())
    });

    Some(by_values.unwrap_or(0))
}

/// Index of the plotted value column.
///
/// Falls back to the last column that is not the datetime axis.
pub fn value_column(columns: &[String], datetime_idx: usize) -> usize {
    let hinted = columns.iter().enumerate().position(|(idx, name)| {
        let name = name.to_lowercase();
        idx != datetime_idx && VALUE_HINTS.iter().any(|hint| name.contains(hint))
    });

    hinted
        .or_else(|| (0..columns.len()).rev().find(|&idx| idx != datetime_idx))
        .unwrap_or(datetime_idx)
}

/// Extracts valid points, ordered chronologically.
///
/// Rows with an unparseable date or a non-numeric value are dropped.
pub fn extract_series(columns: &[String], rows: &[Row]) -> Vec<ChartPoint> {
    let Some(dt_idx) = datetime_column(columns, rows) else {
        return Vec::new();
    };
    let val_idx = value_column(columns, dt_idx);

    let mut points: Vec<ChartPoint> = rows
        .iter()
        .filter_map(|row| {
            let at = cell_datetime(row.get(dt_idx)?)?;
            let value = row.get(val_idx)?.as_f64()?;
            Some(ChartPoint { at, value })
        })
        .collect();

    // sort_by_key is stable; equal timestamps keep row order
    points.sort_by_key(|p| p.at);
    points
}

/// Stride-downsamples to roughly `budget` points.
///
/// With `step = n / budget`, keeps `n / step` points at indices
/// `0, step, 2*step, ...`. The result can exceed `budget` when `n` is not a
/// multiple of it.
pub fn downsample<T>(points: Vec<T>, budget: usize) -> Vec<T> {
    let n = points.len();
    if budget == 0 || n <= budget {
        return points;
    }

    let step = n / budget;
    let keep = n / step;
    points.into_iter().step_by(step).take(keep).collect()
}

/// The series that would be plotted for this result.
pub fn build_series(columns: &[String], rows: &[Row], budget: usize) -> Vec<ChartPoint> {
    downsample(extract_series(columns, rows), budget)
}

/// Renders the chart as a `data:image/svg+xml;base64,...` URI.
///
/// Returns `None` when no valid points remain.
pub fn render_chart(columns: &[String], rows: &[Row], budget: usize) -> Option<String> {
    let points = build_series(columns, rows, budget);
    if points.is_empty() {
        return None;
    }

    let dt_idx = datetime_column(columns, rows)?;
    let val_idx = value_column(columns, dt_idx);
    let title = format!("{} over {}", columns[val_idx], columns[dt_idx]);

    let svg = render_svg(&points, &title);
    Some(format!("data:image/svg+xml;base64,{}", STANDARD.encode(svg)))
}

fn render_svg(points: &[ChartPoint], title: &str) -> String {
    let times: Vec<i64> = points.iter().map(|p| p.at.and_utc().timestamp()).collect();
    let (t_min, t_max) = (times[0], times[times.len() - 1]);
    let (v_min, v_max) = points.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
        (lo.min(p.value), hi.max(p.value))
    });

    let plot_w = WIDTH - MARGIN_LEFT - MARGIN_RIGHT;
    let plot_h = HEIGHT - MARGIN_TOP - MARGIN_BOTTOM;
    let bottom = MARGIN_TOP + plot_h;

    let x = |t: i64| {
        if t_max == t_min {
            MARGIN_LEFT + plot_w / 2.0
        } else {
            MARGIN_LEFT + (t - t_min) as f64 / (t_max - t_min) as f64 * plot_w
        }
    };
    let y = |v: f64| {
        if v_max == v_min {
            MARGIN_TOP + plot_h / 2.0
        } else {
            bottom - (v - v_min) / (v_max - v_min) * plot_h
        }
    };

    let coords: Vec<(f64, f64)> = points
        .iter()
        .zip(&times)
        .map(|(p, &t)| (x(t), y(p.value)))
        .collect();
    let polyline = coords
        .iter()
        .map(|(px, py)| format!("{px:.1},{py:.1}"))
        .collect::<Vec<_>>()
        .join(" ");

    let mut svg = format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{WIDTH}" height="{HEIGHT}" viewBox="0 0 {WIDTH} {HEIGHT}" font-family="sans-serif" font-size="11">"#
    );
    svg.push_str(&format!(
        r#"<rect width="{WIDTH}" height="{HEIGHT}" fill="white"/>"#
    ));
    svg.push_str(&format!(
        r#"<text x="{:.1}" y="18" text-anchor="middle" font-size="14">{}</text>"#,
        WIDTH / 2.0,
        escape_xml(title)
    ));
    svg.push_str(&format!(
        r##"<path d="M{MARGIN_LEFT},{MARGIN_TOP} V{bottom} H{:.1}" fill="none" stroke="#444"/>"##,
        WIDTH - MARGIN_RIGHT
    ));
    svg.push_str(&format!(
        r##"<polyline points="{polyline}" fill="none" stroke="#1f77b4" stroke-width="1.5"/>"##
    ));
    if let [(px, py)] = coords.as_slice() {
        svg.push_str(&format!(
            r##"<circle cx="{px:.1}" cy="{py:.1}" r="3" fill="#1f77b4"/>"##
        ));
    }

    // Axis labels
    svg.push_str(&format!(
        r#"<text x="{:.1}" y="{:.1}" text-anchor="end">{}</text>"#,
        MARGIN_LEFT - 6.0,
        MARGIN_TOP + 4.0,
        format_value(v_max)
    ));
    svg.push_str(&format!(
        r#"<text x="{:.1}" y="{:.1}" text-anchor="end">{}</text>"#,
        MARGIN_LEFT - 6.0,
        bottom + 4.0,
        format_value(v_min)
    ));
    svg.push_str(&format!(
        r#"<text x="{MARGIN_LEFT}" y="{:.1}" text-anchor="start">{}</text>"#,
        bottom + 18.0,
        format_datetime(&points[0].at)
    ));
    svg.push_str(&format!(
        r#"<text x="{:.1}" y="{:.1}" text-anchor="end">{}</text>"#,
        WIDTH - MARGIN_RIGHT,
        bottom + 18.0,
        format_datetime(&points[points.len() - 1].at)
    ));
    svg.push_str("</svg>");
    svg
}

fn format_datetime(at: &NaiveDateTime) -> String {
    if at.time() == NaiveTime::MIN {
        at.format("%Y-%m-%d").to_string()
    } else {
        at.format("%Y-%m-%d %H:%M").to_string()
    }
}

fn format_value(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{v:.0}")
    } else {
        format!("{v:.2}")
    }
}

fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
