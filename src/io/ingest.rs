//! CSV ingest and normalization.
//!
//! This module turns the long-format CPI CSV (`Year,Date,CPI component,pct_change`)
//! into a date-sorted list of `RawRow`s.
//!
//! Design goals:
//! - **Strict schema** for required columns (clear errors + exit code 2)
//! - **Best-effort rows** (malformed rows are dropped, never fatal)
//! - **All or nothing** (a failed load never yields a partial dataset)
//! - **Separation of concerns**: no series math here

use std::collections::{BTreeSet, HashMap};
use std::io::Read;

use chrono::{Datelike, NaiveDate};
use csv::StringRecord;
use tracing::debug;

use crate::domain::RawRow;
use crate::error::{AppError, EXIT_NO_DATA, EXIT_USAGE};

const COL_DATE: &str = "date";
const COL_YEAR: &str = "year";
const COL_COMPONENT: &str = "cpi component";
const COL_VALUE: &str = "pct_change";

/// Ingest output: date-sorted rows plus the facts the UI needs about them.
#[derive(Debug, Clone)]
pub struct Dataset {
    /// Ascending by date; equal dates keep CSV order.
    pub rows: Vec<RawRow>,
    pub min_date: NaiveDate,
    pub max_date: NaiveDate,
    /// Sorted, de-duplicated component names.
    pub components: Vec<String>,
    pub rows_read: usize,
    pub rows_dropped: usize,
}

impl Dataset {
    /// Build a dataset from already-parsed rows (sorts them).
    ///
    /// Returns `None` when `rows` is empty.
    pub fn from_rows(mut rows: Vec<RawRow>) -> Option<Self> {
        // `sort_by_key` is stable, so equal dates keep their input order.
        rows.sort_by_key(|r| r.date);

        let min_date = rows.first()?.date;
        let max_date = rows.last()?.date;
        let components = rows
            .iter()
            .map(|r| r.component.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let rows_read = rows.len();

        Some(Self {
            rows,
            min_date,
            max_date,
            components,
            rows_read,
            rows_dropped: 0,
        })
    }

    /// Years covered by the data (inclusive), for the year selector.
    pub fn year_range(&self) -> (i32, i32) {
        (self.min_date.year(), self.max_date.year())
    }
}

/// Parse CSV text into a [`Dataset`].
pub fn parse_csv_str(text: &str) -> Result<Dataset, AppError> {
    parse_csv(text.as_bytes())
}

/// Parse CSV from any reader into a [`Dataset`].
pub fn parse_csv<R: Read>(input: R) -> Result<Dataset, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(input);

    let headers = reader
        .headers()
        .map_err(|e| AppError::new(EXIT_USAGE, format!("Failed to read CSV headers: {e}")))?
        .clone();

    let header_map = build_header_map(&headers);
    ensure_required_columns_exist(&header_map)?;

    let mut rows = Vec::new();
    let mut rows_read = 0usize;
    let mut rows_dropped = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // +2: records() starts after the header line, and lines are 1-based.
        let line = idx + 2;
        rows_read += 1;

        let parsed = result
            .map_err(|e| format!("CSV parse error: {e}"))
            .and_then(|record| parse_row(&record, &header_map));

        match parsed {
            Ok(row) => rows.push(row),
            Err(reason) => {
                rows_dropped += 1;
                debug!(line, %reason, "dropping malformed row");
            }
        }
    }

    let mut dataset = Dataset::from_rows(rows)
        .ok_or_else(|| AppError::new(EXIT_NO_DATA, "No valid CPI rows found in the CSV."))?;
    dataset.rows_read = rows_read;
    dataset.rows_dropped = rows_dropped;

    debug!(
        rows_read,
        rows_dropped,
        components = dataset.components.len(),
        "parsed CPI dataset"
    );

    Ok(dataset)
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports sometimes prefix the first header with a UTF-8 BOM.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

fn ensure_required_columns_exist(header_map: &HashMap<String, usize>) -> Result<(), AppError> {
    for (col, display) in [
        (COL_DATE, "Date"),
        (COL_COMPONENT, "CPI component"),
        (COL_VALUE, "pct_change"),
    ] {
        if !header_map.contains_key(col) {
            return Err(AppError::new(
                EXIT_USAGE,
                format!("Missing required column: `{display}`"),
            ));
        }
    }
    Ok(())
}

fn parse_row(record: &StringRecord, header_map: &HashMap<String, usize>) -> Result<RawRow, String> {
    let date = parse_month(get_required(record, header_map, COL_DATE)?)?;
    let component = get_required(record, header_map, COL_COMPONENT)?.to_string();
    let value = parse_f64(get_required(record, header_map, COL_VALUE)?)?;

    let year = get_optional(record, header_map, COL_YEAR)
        .and_then(|s| s.parse::<i32>().ok())
        .unwrap_or_else(|| date.year());

    Ok(RawRow {
        year,
        date,
        component,
        value,
    })
}

fn get_required<'a>(
    record: &'a StringRecord,
    header_map: &HashMap<String, usize>,
    name: &str,
) -> Result<&'a str, String> {
    let idx = header_map
        .get(name)
        .ok_or_else(|| format!("Missing required column: `{name}`"))?;
    record
        .get(*idx)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| format!("Missing required value: `{name}`"))
}

fn get_optional<'a>(record: &'a StringRecord, header_map: &HashMap<String, usize>, name: &str) -> Option<&'a str> {
    let idx = header_map.get(name)?;
    record.get(*idx).map(str::trim).filter(|s| !s.is_empty())
}

/// Parse a date literal and normalize it to the first of its month.
pub fn parse_month(s: &str) -> Result<NaiveDate, String> {
    // The refresh tool writes ISO dates, but hand-edited files tend to carry
    // timestamps or day-first dates. Accept a small, deterministic set.
    const FMTS: [&str; 3] = ["%Y-%m-%d", "%d/%m/%Y", "%Y/%m/%d"];

    let s = s.trim();
    let date_part = s.split(['T', ' ']).next().unwrap_or(s);

    let parsed = FMTS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(date_part, fmt).ok())
        .or_else(|| NaiveDate::parse_from_str(&format!("{date_part}-01"), "%Y-%m-%d").ok());

    parsed
        .and_then(|d| d.with_day(1))
        .ok_or_else(|| format!("Invalid date '{s}'. Expected YYYY-MM-DD, YYYY-MM or DD/MM/YYYY."))
}

fn parse_f64(s: &str) -> Result<f64, String> {
    let v = s
        .parse::<f64>()
        .map_err(|_| format!("Invalid number '{s}'."))?;
    if v.is_finite() {
        Ok(v)
    } else {
        Err(format!("Non-finite value '{s}'."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, 1).unwrap()
    }

    #[test]
    fn parses_and_sorts_rows() {
        let csv = "\
Year,Date,CPI component,pct_change
2008,2008-02-01,Food,120
2008,2008-01-01,Food,100
2008,2008-01-01,Transport,90
";
        let data = parse_csv_str(csv).unwrap();
        assert_eq!(data.rows.len(), 3);
        assert_eq!(data.rows[0].date, date(2008, 1));
        // Stable for equal dates: Food came before Transport in the file.
        assert_eq!(data.rows[0].component, "Food");
        assert_eq!(data.rows[1].component, "Transport");
        assert_eq!(data.rows[2].value, 120.0);
        assert_eq!(data.min_date, date(2008, 1));
        assert_eq!(data.max_date, date(2008, 2));
        assert_eq!(data.components, vec!["Food", "Transport"]);
        assert_eq!(data.rows_dropped, 0);
    }

    #[test]
    fn malformed_rows_are_dropped_silently() {
        let csv = "\
Year,Date,CPI component,pct_change
2008,2008-01-01,Food,100
2008,,Food,101
2008,2008-03-01,,102
2008,2008-04-01,Food,
2008,not-a-date,Food,103
2008,2008-05-01,Food,abc
2008,2008-06-01,Food,NaN
";
        let data = parse_csv_str(csv).unwrap();
        assert_eq!(data.rows.len(), 1);
        assert_eq!(data.rows_read, 7);
        assert_eq!(data.rows_dropped, 6);
    }

    #[test]
    fn header_matching_is_lenient() {
        let csv = "\u{feff}date , cpi component,PCT_CHANGE\n2010-05-17T00:00:00,Food,100\n";
        let data = parse_csv_str(csv).unwrap();
        assert_eq!(data.rows[0].date, date(2010, 5));
        // Year column absent: derived from the date.
        assert_eq!(data.rows[0].year, 2010);
    }

    #[test]
    fn missing_column_is_a_load_failure() {
        let err = parse_csv_str("Year,Date,pct_change\n2008,2008-01-01,100\n").unwrap_err();
        assert_eq!(err.exit_code(), EXIT_USAGE);
        assert!(err.message().contains("CPI component"));
    }

    #[test]
    fn no_valid_rows_is_a_load_failure() {
        let err = parse_csv_str("Year,Date,CPI component,pct_change\n2008,,Food,1\n").unwrap_err();
        assert_eq!(err.exit_code(), EXIT_NO_DATA);
    }

    #[test]
    fn parse_month_formats() {
        assert_eq!(parse_month("2008-01-15").unwrap(), date(2008, 1));
        assert_eq!(parse_month("2008-07").unwrap(), date(2008, 7));
        assert_eq!(parse_month("31/12/1999").unwrap(), date(1999, 12));
        assert_eq!(parse_month("2001-02-01 00:00:00").unwrap(), date(2001, 2));
        assert!(parse_month("2008-13-01").is_err());
    }
}
