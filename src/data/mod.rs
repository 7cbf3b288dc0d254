//! Where the CPI data comes from.
//!
//! - `source`: resolve and load the long-format CSV (file or URL)
//! - `refresh`: download the published wide-format dataset and reshape it

pub mod refresh;
pub mod source;

pub use refresh::{RefreshSummary, refresh};
pub use source::DataSource;
