//! Shared "derive" logic used by the CLI, the SVG renderer and the TUI.
//!
//! Every selection change re-runs the whole chain from the immutable dataset:
//! filter -> build series -> colors -> domains -> scales -> ticks
//!
//! Front-ends only hold a `Selection` and the last `ChartState`; nothing is
//! cached between derives.

use chrono::NaiveDate;

use crate::chart::color::assign_colors;
use crate::chart::scale::{
    LinearScale, TickFormat, TimeScale, scales_for, time_domain, value_domain,
};
use crate::chart::series::{SeriesMap, build_series, filter_from};
use crate::domain::{HEADLINE_COMPONENT, Layout, Selection, Series};
use crate::io::ingest::Dataset;

/// Everything the renderers need for one frame.
#[derive(Debug, Clone)]
pub struct ChartState {
    /// Effective (clamped) start of the window.
    pub from: NaiveDate,
    /// Every component present in the window, colored against the global extremes.
    pub series: SeriesMap,
    /// Selected components that exist in `series`, in selection order.
    pub displayed_names: Vec<String>,
    /// Headline series for the reference line, selected or not.
    pub headline: Option<Series>,
    pub time_domain: (NaiveDate, NaiveDate),
    pub value_domain: (f64, f64),
    pub x: TimeScale,
    pub y: LinearScale,
    pub x_ticks: Vec<NaiveDate>,
    pub y_ticks: Vec<f64>,
    pub tick_format: TickFormat,
    pub layout: Layout,
}

impl ChartState {
    /// Displayed series in selection order.
    pub fn displayed(&self) -> impl Iterator<Item = &Series> {
        self.displayed_names
            .iter()
            .filter_map(|name| self.series.get(name))
    }

    /// True when none of the selected components has data to draw.
    pub fn selection_is_empty(&self) -> bool {
        self.displayed_names.is_empty()
    }

    pub fn has_points(&self) -> bool {
        self.displayed().any(|s| !s.points.is_empty())
    }
}

/// Recompute the chart state from the current selection and the raw data.
pub fn derive_state(selection: &Selection, dataset: &Dataset, layout: &Layout) -> ChartState {
    let from = selection.effective_from(dataset.min_date, dataset.max_date);

    let mut series = build_series(filter_from(&dataset.rows, from));
    assign_colors(&mut series);

    let mut displayed_names: Vec<String> = Vec::new();
    for name in &selection.components {
        if series.contains_key(name) && !displayed_names.contains(name) {
            displayed_names.push(name.clone());
        }
    }

    let headline = series.get(HEADLINE_COMPONENT).cloned();

    let displayed: Vec<&Series> = displayed_names
        .iter()
        .filter_map(|name| series.get(name))
        .collect();
    let time = time_domain(displayed.iter().copied(), from);
    let value = value_domain(displayed.iter().copied(), headline.as_ref());

    let (x, y) = scales_for(layout, time, value);
    let x_ticks = x.ticks(layout.tick_count);
    let y_ticks = y.ticks(layout.tick_count);

    ChartState {
        from,
        series,
        displayed_names,
        headline,
        time_domain: time,
        value_domain: value,
        x,
        y,
        x_ticks,
        y_ticks,
        tick_format: TickFormat::for_window(from, dataset.max_date),
        layout: *layout,
    }
}
