//! Command-line parsing for the CPI chart tool.
//!
//! The goal of this module is to keep **argument parsing** separate from the
//! pipeline and rendering code.

use std::path::PathBuf;

use chrono::{Datelike, NaiveDate};
use clap::{Args, Parser, Subcommand};

use crate::domain::{Layout, Selection, default_components};
use crate::io::ingest::{Dataset, parse_month};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "cpi", version, about = "UK CPI component change charts")]
pub struct Cli {
    /// Log progress (`info` level) to stderr. `RUST_LOG` overrides this.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Render the chart for a window and selection to an SVG file.
    Chart(ChartArgs),
    /// Print the latest change per component for a window.
    Summary(SummaryArgs),
    /// Export the derived series (one row per point) to CSV.
    Export(ExportArgs),
    /// List the component names available in the data.
    Components(DataArgs),
    /// Download the published dataset and rewrite the local CSV.
    Refresh(RefreshArgs),
    /// Launch the interactive TUI.
    ///
    /// Uses the same derive pipeline as `cpi chart`, rendered with Ratatui.
    Tui(DataArgs),
}

/// Where to load data from.
#[derive(Debug, Args, Clone, Default)]
pub struct DataArgs {
    /// CSV file or http(s) URL. Defaults to `$CPI_DATA`, then `data/cpi.csv`.
    #[arg(short, long, value_name = "SRC")]
    pub data: Option<String>,
}

/// Window and component selection shared by the rendering commands.
#[derive(Debug, Args, Clone, Default)]
pub struct SelectArgs {
    #[command(flatten)]
    pub data: DataArgs,

    /// First month of the window (`YYYY-MM`). Defaults to the first month in the data.
    #[arg(short, long, value_name = "YYYY-MM", value_parser = parse_month)]
    pub from: Option<NaiveDate>,

    /// Component to display (repeatable). Defaults to the standard set.
    #[arg(short, long = "component", value_name = "NAME")]
    pub components: Vec<String>,
}

impl SelectArgs {
    /// Build the selection for a loaded dataset.
    pub fn selection(&self, dataset: &Dataset) -> Selection {
        let from = self.from.unwrap_or(dataset.min_date);
        let components = if self.components.is_empty() {
            default_components(&dataset.components)
        } else {
            self.components.clone()
        };
        Selection {
            year: from.year(),
            month: from.month(),
            components,
        }
    }
}

#[derive(Debug, Args, Clone)]
pub struct ChartArgs {
    #[command(flatten)]
    pub select: SelectArgs,

    /// Output SVG path.
    #[arg(short, long, default_value = "cpi-chart.svg")]
    pub out: PathBuf,

    /// Chart width in pixels.
    #[arg(long, default_value_t = 960.0)]
    pub width: f64,

    /// Chart height in pixels.
    #[arg(long, default_value_t = 540.0)]
    pub height: f64,
}

impl ChartArgs {
    pub fn layout(&self) -> Layout {
        Layout::with_size(self.width, self.height)
    }
}

#[derive(Debug, Args, Clone)]
pub struct SummaryArgs {
    #[command(flatten)]
    pub select: SelectArgs,

    /// Include every component in the data, not only the selected ones.
    #[arg(long)]
    pub all: bool,

    /// Print JSON instead of a table.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args, Clone)]
pub struct ExportArgs {
    #[command(flatten)]
    pub select: SelectArgs,

    /// Output CSV path.
    #[arg(short, long)]
    pub out: PathBuf,
}

#[derive(Debug, Args, Clone)]
pub struct RefreshArgs {
    /// Source URL. Defaults to `$CPI_REFRESH_URL`, then the ONS `mm23` CSV.
    #[arg(long)]
    pub url: Option<String>,

    /// CSV file to overwrite.
    #[arg(short, long, default_value = crate::data::source::DEFAULT_DATA_PATH)]
    pub out: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RawRow;

    fn dataset() -> Dataset {
        let rows = vec![
            RawRow {
                year: 2019,
                date: NaiveDate::from_ymd_opt(2019, 4, 1).unwrap(),
                component: "Food".to_string(),
                value: 100.0,
            },
            RawRow {
                year: 2019,
                date: NaiveDate::from_ymd_opt(2019, 4, 1).unwrap(),
                component: crate::domain::HEADLINE_COMPONENT.to_string(),
                value: 100.0,
            },
        ];
        Dataset::from_rows(rows).unwrap()
    }

    #[test]
    fn chart_args_parse() {
        let cli = Cli::parse_from([
            "cpi", "chart", "--from", "2020-03", "-c", "Food", "-c", "Energy", "--out", "x.svg",
            "--width", "800",
        ]);
        let Command::Chart(args) = cli.command else {
            panic!("expected chart");
        };
        assert_eq!(args.select.from, NaiveDate::from_ymd_opt(2020, 3, 1));
        assert_eq!(args.select.components, vec!["Food", "Energy"]);
        assert_eq!(args.out, PathBuf::from("x.svg"));
        assert_eq!(args.layout().width, 800.0);
        assert_eq!(args.layout().height, 540.0);
    }

    #[test]
    fn bad_month_is_rejected() {
        assert!(Cli::try_parse_from(["cpi", "chart", "--from", "March"]).is_err());
    }

    #[test]
    fn selection_defaults_to_data_start_and_default_components() {
        let data = dataset();
        let selection = SelectArgs::default().selection(&data);
        assert_eq!((selection.year, selection.month), (2019, 4));
        assert_eq!(selection.components, vec![crate::domain::HEADLINE_COMPONENT.to_string()]);
    }

    #[test]
    fn verbose_is_global() {
        let cli = Cli::parse_from(["cpi", "summary", "--all", "-v"]);
        assert!(cli.verbose);
        assert!(matches!(cli.command, Command::Summary(SummaryArgs { all: true, .. })));
    }
}
