//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - parsed CSV rows (`RawRow`) and derived chart points (`ChartPoint`)
//! - per-component series (`Series`) and colors (`Rgb`)
//! - user selection state (`Selection`) and chart layout (`Layout`)

pub mod types;

pub use types::*;
