//! Input/output helpers.
//!
//! - CSV ingest + normalization (`ingest`)
//! - derived series export (`export`)

pub mod export;
pub mod ingest;

pub use export::*;
pub use ingest::*;
