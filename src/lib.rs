//! `cpi-charts` library crate.
//!
//! The binary (`cpi`) is a thin wrapper around this library so that:
//!
//! - the derive pipeline is testable without spawning processes
//! - the SVG renderer, the summaries and the TUI share one code path

pub mod app;
pub mod chart;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod io;
pub mod report;
pub mod tui;
