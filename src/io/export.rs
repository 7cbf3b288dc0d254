//! Export derived series to CSV.
//!
//! One row per displayed point, so the file opens directly in a spreadsheet
//! and matches what the chart shows.

use std::io::Write;
use std::path::Path;

use crate::app::pipeline::ChartState;
use crate::error::{AppError, EXIT_USAGE};

const HEADER: [&str; 6] = ["component", "date", "value", "change", "latest", "color"];

/// Write the displayed series of `state` to a CSV file.
pub fn write_series_csv(path: &Path, state: &ChartState) -> Result<usize, AppError> {
    let file = std::fs::File::create(path)
        .map_err(|e| AppError::new(EXIT_USAGE, format!("Failed to create export CSV '{}': {e}", path.display())))?;
    write_series(file, state)
}

/// Write the displayed series to any writer; returns the number of data rows.
pub fn write_series<W: Write>(out: W, state: &ChartState) -> Result<usize, AppError> {
    let mut writer = csv::Writer::from_writer(out);
    writer
        .write_record(HEADER)
        .map_err(|e| AppError::new(EXIT_USAGE, format!("Failed to write export CSV header: {e}")))?;

    let mut rows = 0;
    for series in state.displayed() {
        let color = series.color_or_default().to_hex();
        let latest = format!("{:.6}", series.latest);
        for p in &series.points {
            let date = p.date.format("%Y-%m-%d").to_string();
            let value = p.value.to_string();
            let change = format!("{:.6}", p.change);
            writer
                .write_record([
                    series.name.as_str(),
                    date.as_str(),
                    value.as_str(),
                    change.as_str(),
                    latest.as_str(),
                    color.as_str(),
                ])
                .map_err(|e| AppError::new(EXIT_USAGE, format!("Failed to write export CSV row: {e}")))?;
            rows += 1;
        }
    }

    writer
        .flush()
        .map_err(|e| AppError::new(EXIT_USAGE, format!("Failed to flush export CSV: {e}")))?;
    Ok(rows)
}
