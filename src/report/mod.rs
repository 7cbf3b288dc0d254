//! Reporting utilities: latest-change summaries of derived series.

use chrono::NaiveDate;
use serde::Serialize;

use crate::app::pipeline::ChartState;
use crate::error::{AppError, EXIT_RUNTIME};

pub mod format;

pub use format::format_summary;

/// One component's position at the end of the window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryEntry {
    pub component: String,
    pub first_value: f64,
    pub last_value: f64,
    /// Change of the last point against the window's first point.
    pub latest: f64,
    /// `#rrggbb`, same color the chart uses.
    pub color: String,
    pub points: usize,
}

/// Latest changes for a window, biggest riser first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub headline: Option<SummaryEntry>,
    pub entries: Vec<SummaryEntry>,
}

/// Summarize the displayed series, or every series in the window with `all`.
pub fn summarize(state: &ChartState, all: bool) -> Summary {
    let mut entries: Vec<SummaryEntry> = if all {
        state.series.values().filter_map(entry_for).collect()
    } else {
        state.displayed().filter_map(entry_for).collect()
    };
    rank_by_latest(&mut entries);

    Summary {
        from: state.from,
        to: state.time_domain.1,
        headline: state.headline.as_ref().and_then(entry_for),
        entries,
    }
}

fn entry_for(series: &crate::domain::Series) -> Option<SummaryEntry> {
    let first = series.points.first()?;
    let last = series.points.last()?;
    Some(SummaryEntry {
        component: series.name.clone(),
        first_value: first.value,
        last_value: last.value,
        latest: series.latest,
        color: series.color_or_default().to_hex(),
        points: series.points.len(),
    })
}

/// Sort descending by latest change; ties by name.
pub fn rank_by_latest(entries: &mut [SummaryEntry]) {
    entries.sort_by(|a, b| {
        b.latest
            .partial_cmp(&a.latest)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.component.cmp(&b.component))
    });
}

/// Pretty JSON for scripting.
pub fn summary_json(summary: &Summary) -> Result<String, AppError> {
    serde_json::to_string_pretty(summary)
        .map_err(|e| AppError::new(EXIT_RUNTIME, format!("Failed to serialize summary: {e}")))
}
