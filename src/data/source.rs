//! Where the CPI CSV comes from: a local file or an HTTP(S) URL.

use std::fmt;
use std::fs::File;
use std::path::PathBuf;

use reqwest::blocking::Client;
use tracing::info;

use crate::error::{AppError, EXIT_RUNTIME, EXIT_USAGE};
use crate::io::ingest::{Dataset, parse_csv, parse_csv_str};

/// Environment variable naming the default data source.
pub const DATA_ENV_VAR: &str = "CPI_DATA";
/// Used when neither `--data` nor `CPI_DATA` is given.
pub const DEFAULT_DATA_PATH: &str = "data/cpi.csv";

/// A CSV resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    File(PathBuf),
    Url(String),
}

impl DataSource {
    /// Interpret a user-supplied string: `http://` / `https://` are URLs,
    /// everything else is a path.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        let lower = trimmed.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            DataSource::Url(trimmed.to_string())
        } else {
            DataSource::File(PathBuf::from(trimmed))
        }
    }

    /// Resolve the source from an explicit flag, then `CPI_DATA` (including a
    /// `.env` file), then [`DEFAULT_DATA_PATH`].
    pub fn resolve(explicit: Option<&str>) -> Self {
        if let Some(raw) = explicit {
            return Self::parse(raw);
        }
        dotenvy::dotenv().ok();
        match std::env::var(DATA_ENV_VAR) {
            Ok(raw) if !raw.trim().is_empty() => Self::parse(&raw),
            _ => DataSource::File(PathBuf::from(DEFAULT_DATA_PATH)),
        }
    }

    /// Fetch and parse the dataset. Any failure yields a single error and no data.
    pub fn load(&self) -> Result<Dataset, AppError> {
        let dataset = match self {
            DataSource::File(path) => {
                let file = File::open(path).map_err(|e| {
                    AppError::new(
                        EXIT_USAGE,
                        format!("Failed to open CSV '{}': {e}", path.display()),
                    )
                })?;
                parse_csv(file)?
            }
            DataSource::Url(url) => parse_csv_str(&fetch_text(url)?)?,
        };

        info!(
            source = %self,
            rows = dataset.rows.len(),
            dropped = dataset.rows_dropped,
            from = %dataset.min_date,
            to = %dataset.max_date,
            "loaded CPI data"
        );
        Ok(dataset)
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSource::File(path) => write!(f, "{}", path.display()),
            DataSource::Url(url) => f.write_str(url),
        }
    }
}

/// GET a URL and return its body as text.
pub fn fetch_text(url: &str) -> Result<String, AppError> {
    let client = Client::new();
    let resp = client
        .get(url)
        .send()
        .map_err(|e| AppError::new(EXIT_RUNTIME, format!("Request to {url} failed: {e}")))?;

    if !resp.status().is_success() {
        return Err(AppError::new(
            EXIT_RUNTIME,
            format!("Request to {url} failed with status {}.", resp.status()),
        ));
    }

    resp.text()
        .map_err(|e| AppError::new(EXIT_RUNTIME, format!("Failed to read response from {url}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parse_distinguishes_urls_and_paths() {
        assert_eq!(
            DataSource::parse("https://example.org/cpi.csv"),
            DataSource::Url("https://example.org/cpi.csv".to_string())
        );
        assert_eq!(
            DataSource::parse(" HTTP://example.org/x.csv "),
            DataSource::Url("HTTP://example.org/x.csv".to_string())
        );
        assert_eq!(
            DataSource::parse("data/cpi.csv"),
            DataSource::File(PathBuf::from("data/cpi.csv"))
        );
    }

    #[test]
    fn explicit_source_wins() {
        assert_eq!(
            DataSource::resolve(Some("other.csv")),
            DataSource::File(PathBuf::from("other.csv"))
        );
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "Year,Date,CPI component,pct_change").unwrap();
        writeln!(file, "2020,2020-01-01,Food,100.5").unwrap();
        file.flush().unwrap();

        let data = DataSource::File(file.path().to_path_buf()).load().unwrap();
        assert_eq!(data.rows.len(), 1);
        assert_eq!(data.rows[0].value, 100.5);
    }

    #[test]
    fn missing_file_is_a_single_error() {
        let err = DataSource::File(PathBuf::from("/definitely/not/here.csv"))
            .load()
            .unwrap_err();
        assert_eq!(err.exit_code(), EXIT_USAGE);
        assert!(err.message().contains("Failed to open CSV"));
    }
}
