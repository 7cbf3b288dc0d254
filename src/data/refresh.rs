//! Offline refresh: download the ONS consumer price indices dataset and
//! rewrite it as the long-format CSV consumed by the loader.
//!
//! The published file is "wide": a `Title` column holding period labels
//! (`1988`, `1988 Q1`, `1988 JAN`, plus a few metadata rows such as `CDID`)
//! and one column per series. We keep only the monthly rows and the
//! `CPI INDEX ...` columns.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDate};
use tracing::{debug, info};

use crate::data::source::fetch_text;
use crate::domain::RawRow;
use crate::error::{AppError, EXIT_NO_DATA, EXIT_USAGE};

/// Environment variable overriding the download URL.
pub const REFRESH_URL_ENV_VAR: &str = "CPI_REFRESH_URL";
pub const DEFAULT_REFRESH_URL: &str = "https://www.ons.gov.uk/file?uri=/economy/inflationandpriceindices/datasets/consumerpriceindices/current/mm23.csv";

/// Header prefix selecting the index-level columns.
const COLUMN_PREFIX: &str = "CPI INDEX";

const MONTHS: [&str; 12] = [
    "JAN", "FEB", "MAR", "APR", "MAY", "JUN", "JUL", "AUG", "SEP", "OCT", "NOV", "DEC",
];

/// What a refresh produced.
#[derive(Debug, Clone)]
pub struct RefreshSummary {
    pub path: PathBuf,
    pub rows: usize,
    pub components: usize,
    pub first: NaiveDate,
    pub last: NaiveDate,
}

/// Resolve the refresh URL: explicit flag, then `CPI_REFRESH_URL`, then the ONS default.
pub fn resolve_url(explicit: Option<&str>) -> String {
    if let Some(url) = explicit {
        return url.to_string();
    }
    dotenvy::dotenv().ok();
    std::env::var(REFRESH_URL_ENV_VAR)
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_REFRESH_URL.to_string())
}

/// Download, reshape and overwrite `out`.
pub fn refresh(url: &str, out: &Path) -> Result<RefreshSummary, AppError> {
    info!(%url, "downloading CPI dataset");
    let text = fetch_text(url)?;
    let rows = reshape_wide(&text)?;
    let summary = write_long_csv(out, &rows)?;
    info!(
        path = %summary.path.display(),
        rows = summary.rows,
        components = summary.components,
        "wrote CPI dataset"
    );
    Ok(summary)
}

/// Reshape the wide ONS layout into one row per (component, month).
///
/// Output is ordered by date, then by column order in the source.
pub fn reshape_wide(text: &str) -> Result<Vec<RawRow>, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| AppError::new(EXIT_USAGE, format!("Failed to read dataset headers: {e}")))?
        .clone();

    // (column index, component name)
    let columns: Vec<(usize, String)> = headers
        .iter()
        .enumerate()
        .skip(1)
        .filter(|(_, h)| h.trim().to_ascii_uppercase().starts_with(COLUMN_PREFIX))
        .map(|(idx, h)| (idx, component_name(h)))
        .collect();

    if columns.is_empty() {
        return Err(AppError::new(
            EXIT_NO_DATA,
            format!("No `{COLUMN_PREFIX} ...` columns found in the dataset."),
        ));
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record =
            record.map_err(|e| AppError::new(EXIT_USAGE, format!("Failed to parse dataset: {e}")))?;
        let Some(date) = record.get(0).and_then(parse_period) else {
            continue;
        };
        for (idx, name) in &columns {
            let Some(value) = record
                .get(*idx)
                .and_then(|s| s.parse::<f64>().ok())
                .filter(|v| v.is_finite())
            else {
                continue;
            };
            rows.push(RawRow {
                year: date.year(),
                date,
                component: name.clone(),
                value,
            });
        }
    }

    if rows.is_empty() {
        return Err(AppError::new(EXIT_NO_DATA, "The dataset contains no monthly CPI values."));
    }

    rows.sort_by_key(|r| r.date);
    Ok(rows)
}

/// `CPI INDEX 00: ALL ITEMS 2015=100` -> `Cpi index 00: all items`.
pub fn component_name(header: &str) -> String {
    let mut name = header.trim();

    // Strip the index base suffix, e.g. ` 2015=100`.
    if let Some((head, tail)) = name.rsplit_once(' ') {
        if is_base_suffix(tail) {
            name = head.trim_end();
        }
    }

    sentence_case(name)
}

fn is_base_suffix(s: &str) -> bool {
    match s.split_once('=') {
        Some((year, base)) => {
            year.len() == 4 && year.chars().all(|c| c.is_ascii_digit()) && base == "100"
        }
        None => false,
    }
}

fn sentence_case(s: &str) -> String {
    let lower = s.to_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// `1988 JAN` -> 1988-01-01. Annual (`1988`) and quarterly (`1988 Q1`) labels
/// and metadata rows yield `None`.
fn parse_period(label: &str) -> Option<NaiveDate> {
    let (year, month) = label.trim().split_once(' ')?;
    let year = year.parse::<i32>().ok()?;
    let month = month.trim().to_ascii_uppercase();
    let idx = MONTHS.iter().position(|m| *m == month)?;
    NaiveDate::from_ymd_opt(year, idx as u32 + 1, 1)
}

/// Write long-format rows, replacing `path` only once the new file is complete.
pub fn write_long_csv(path: &Path, rows: &[RawRow]) -> Result<RefreshSummary, AppError> {
    let (first, last) = match (rows.iter().map(|r| r.date).min(), rows.iter().map(|r| r.date).max()) {
        (Some(first), Some(last)) => (first, last),
        _ => return Err(AppError::new(EXIT_NO_DATA, "Refusing to write an empty dataset.")),
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| {
            AppError::new(
                EXIT_USAGE,
                format!("Failed to create directory '{}': {e}", parent.display()),
            )
        })?;
    }

    let tmp = path.with_extension("csv.tmp");
    let written = write_rows(&tmp, rows).and_then(|()| {
        fs::rename(&tmp, path).map_err(|e| {
            AppError::new(
                EXIT_USAGE,
                format!("Failed to replace '{}': {e}", path.display()),
            )
        })
    });
    if let Err(err) = written {
        if let Err(e) = fs::remove_file(&tmp) {
            debug!(path = %tmp.display(), error = %e, "could not remove temp file");
        }
        return Err(err);
    }

    let mut names: Vec<&str> = rows.iter().map(|r| r.component.as_str()).collect();
    names.sort_unstable();
    names.dedup();

    Ok(RefreshSummary {
        path: path.to_path_buf(),
        rows: rows.len(),
        components: names.len(),
        first,
        last,
    })
}

fn write_rows(tmp: &Path, rows: &[RawRow]) -> Result<(), AppError> {
    let file = File::create(tmp)
        .map_err(|e| AppError::new(EXIT_USAGE, format!("Failed to create '{}': {e}", tmp.display())))?;
    let mut writer = csv::Writer::from_writer(file);

    let write_err = |e: csv::Error| AppError::new(EXIT_USAGE, format!("Failed to write dataset: {e}"));
    writer
        .write_record(["Year", "Date", "CPI component", "pct_change"])
        .map_err(write_err)?;
    for row in rows {
        writer
            .write_record([
                row.year.to_string(),
                row.date.format("%Y-%m-%d").to_string(),
                row.component.clone(),
                row.value.to_string(),
            ])
            .map_err(write_err)?;
    }
    writer
        .flush()
        .map_err(|e| AppError::new(EXIT_USAGE, format!("Failed to flush dataset: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::ingest::parse_csv;

    const WIDE: &str = "\
Title,CPI INDEX 00: ALL ITEMS 2015=100,CPI INDEX 01 : FOOD AND NON-ALCOHOLIC BEVERAGES 2015=100,CPIH ANNUAL RATE 00: ALL ITEMS 2015=100
CDID,D7BT,D7BU,L55O
PreUnit,,,
1988,48.4,50.1,4.1
1988 Q1,47.8,49.9,3.9
1988 JAN,47.6,49.8,3.8
1988 FEB,47.9,,3.9
";

    #[test]
    fn component_names_are_cleaned() {
        assert_eq!(
            component_name("CPI INDEX 00: ALL ITEMS 2015=100"),
            "Cpi index 00: all items"
        );
        assert_eq!(
            component_name("CPI INDEX 04.5 : ELECTRICITY, GAS AND OTHER FUELS 2015=100"),
            "Cpi index 04.5 : electricity, gas and other fuels"
        );
        assert_eq!(component_name("CPI INDEX 07 : TRANSPORT"), "Cpi index 07 : transport");
    }

    #[test]
    fn period_labels() {
        assert_eq!(parse_period("1988 JAN"), NaiveDate::from_ymd_opt(1988, 1, 1));
        assert_eq!(parse_period("2024 Dec"), NaiveDate::from_ymd_opt(2024, 12, 1));
        assert_eq!(parse_period("1988 Q1"), None);
        assert_eq!(parse_period("1988"), None);
        assert_eq!(parse_period("CDID"), None);
    }

    #[test]
    fn reshape_keeps_monthly_cpi_index_cells() {
        let rows = reshape_wide(WIDE).unwrap();
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|r| r.component.starts_with("Cpi index")));
        assert_eq!(rows[0].component, "Cpi index 00: all items");
        assert_eq!(rows[0].value, 47.6);
        assert_eq!(rows[2].date, NaiveDate::from_ymd_opt(1988, 2, 1).unwrap());
    }

    #[test]
    fn written_csv_round_trips_through_the_loader() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("cpi.csv");
        let rows = reshape_wide(WIDE).unwrap();

        let summary = write_long_csv(&path, &rows).unwrap();
        assert_eq!(summary.rows, 3);
        assert_eq!(summary.components, 2);
        assert!(!path.with_extension("csv.tmp").exists());

        let data = parse_csv(File::open(&path).unwrap()).unwrap();
        assert_eq!(data.rows, rows);
    }

    #[test]
    fn failed_replace_removes_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        // A directory in the way makes the final rename fail.
        let path = dir.path().join("cpi.csv");
        fs::create_dir(&path).unwrap();
        let rows = reshape_wide(WIDE).unwrap();

        let err = write_long_csv(&path, &rows).unwrap_err();
        assert_eq!(err.exit_code(), EXIT_USAGE);
        assert!(!path.with_extension("csv.tmp").exists());
        assert!(path.is_dir());
    }

    #[test]
    fn dataset_without_cpi_columns_is_rejected() {
        let err = reshape_wide("Title,OTHER\n1988 JAN,1\n").unwrap_err();
        assert_eq!(err.exit_code(), EXIT_NO_DATA);
    }
}
