//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments and sets up logging
//! - loads the dataset
//! - derives chart state for the requested selection
//! - renders, prints or exports the result

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::chart::{build_scene, write_svg};
use crate::cli::{ChartArgs, Command, DataArgs, ExportArgs, RefreshArgs, SelectArgs, SummaryArgs};
use crate::data::DataSource;
use crate::domain::Layout;
use crate::error::AppError;
use crate::io::ingest::Dataset;

pub mod pipeline;

/// Entry point for the `cpi` binary.
pub fn run() -> Result<(), AppError> {
    // `cpi` and `cpi -d data.csv` behave like `cpi tui ...`.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);

    let drawing_tui = matches!(cli.command, Command::Tui(_));
    init_logging(cli.verbose, drawing_tui);

    match cli.command {
        Command::Chart(args) => handle_chart(args),
        Command::Summary(args) => handle_summary(args),
        Command::Export(args) => handle_export(args),
        Command::Components(args) => handle_components(args),
        Command::Refresh(args) => handle_refresh(args),
        Command::Tui(args) => handle_tui(args),
    }
}

/// Install a stderr `fmt` subscriber, filtered by `RUST_LOG` when set.
///
/// The TUI owns the terminal, so it only logs when `RUST_LOG` asks for it.
fn init_logging(verbose: bool, drawing_tui: bool) {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) if drawing_tui => return,
        Err(_) => EnvFilter::new(if verbose { "info" } else { "warn" }),
    };
    // A second init (tests, embedding) is not an error worth surfacing.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn load(args: &DataArgs) -> Result<Dataset, AppError> {
    DataSource::resolve(args.data.as_deref()).load()
}

fn derive(select: &SelectArgs, layout: &Layout) -> Result<pipeline::ChartState, AppError> {
    let dataset = load(&select.data)?;
    let selection = select.selection(&dataset);
    info!(
        from = %selection.requested_from(),
        components = selection.components.len(),
        "deriving chart state"
    );
    Ok(pipeline::derive_state(&selection, &dataset, layout))
}

fn handle_chart(args: ChartArgs) -> Result<(), AppError> {
    let state = derive(&args.select, &args.layout())?;
    let scene = build_scene(&state);
    write_svg(&args.out, &scene)?;
    println!(
        "Wrote {} ({} series, {} points)",
        args.out.display(),
        scene.paths().count(),
        scene.markers().count()
    );
    Ok(())
}

fn handle_summary(args: SummaryArgs) -> Result<(), AppError> {
    let state = derive(&args.select, &Layout::default())?;
    let summary = crate::report::summarize(&state, args.all);
    if args.json {
        println!("{}", crate::report::summary_json(&summary)?);
    } else {
        print!("{}", crate::report::format_summary(&summary));
    }
    Ok(())
}

fn handle_export(args: ExportArgs) -> Result<(), AppError> {
    let state = derive(&args.select, &Layout::default())?;
    let rows = crate::io::export::write_series_csv(&args.out, &state)?;
    println!("Wrote {} ({rows} rows)", args.out.display());
    Ok(())
}

fn handle_components(args: DataArgs) -> Result<(), AppError> {
    let dataset = load(&args)?;
    print!("{}", crate::report::format::format_components(&dataset));
    Ok(())
}

fn handle_refresh(args: RefreshArgs) -> Result<(), AppError> {
    let url = crate::data::refresh::resolve_url(args.url.as_deref());
    let summary = crate::data::refresh(&url, &args.out)?;
    println!(
        "Wrote {}: {} rows, {} components, {} .. {}",
        summary.path.display(),
        summary.rows,
        summary.components,
        summary.first.format("%b %Y"),
        summary.last.format("%b %Y"),
    );
    Ok(())
}

fn handle_tui(args: DataArgs) -> Result<(), AppError> {
    crate::tui::run(args)
}

/// Rewrite argv so `cpi` defaults to `cpi tui`.
///
/// Rules:
/// - `cpi`                      -> `cpi tui`
/// - `cpi -d data.csv ...`      -> `cpi tui -d data.csv ...`
/// - `cpi --help/--version/-h`  -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("tui".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(
        arg1.as_str(),
        "-h" | "--help" | "-V" | "--version" | "help"
    );
    if is_top_level_help_or_version {
        return argv;
    }

    // Global flags (`-v`) may precede the subcommand.
    let has_subcommand = argv.iter().skip(1).any(|a| {
        matches!(
            a.as_str(),
            "chart" | "summary" | "export" | "components" | "refresh" | "tui"
        )
    });
    if has_subcommand {
        return argv;
    }

    // If the first token is a flag, treat it as "tui flags".
    if arg1.starts_with('-') {
        argv.insert(1, "tui".to_string());
        return argv;
    }

    argv
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn bare_invocation_opens_tui() {
        assert_eq!(rewrite_args(args(&["cpi"])), args(&["cpi", "tui"]));
        assert_eq!(
            rewrite_args(args(&["cpi", "-d", "x.csv"])),
            args(&["cpi", "tui", "-d", "x.csv"])
        );
    }

    #[test]
    fn subcommands_and_help_pass_through() {
        assert_eq!(rewrite_args(args(&["cpi", "summary"])), args(&["cpi", "summary"]));
        assert_eq!(rewrite_args(args(&["cpi", "--help"])), args(&["cpi", "--help"]));
        assert_eq!(rewrite_args(args(&["cpi", "-v", "chart"])), args(&["cpi", "-v", "chart"]));
    }
}
