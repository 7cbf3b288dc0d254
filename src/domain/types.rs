//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory while deriving chart state
//! - exported to CSV/JSON
//! - shared between the SVG renderer and the TUI

use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Component name of the all-items aggregate.
///
/// This string is a data contract with the CSV (it is how the headline series
/// is found), not a display label.
pub const HEADLINE_COMPONENT: &str = "Cpi index 00: all items";

/// Components selected when a dataset is first loaded (or on reset).
///
/// Names missing from the loaded dataset are dropped by [`Selection::default_for`].
pub const DEFAULT_COMPONENTS: [&str; 6] = [
    HEADLINE_COMPONENT,
    "Cpi index 01 : food and non-alcoholic beverages",
    "Cpi index 04.5 : electricity, gas and other fuels",
    "Cpi index 07.2.2 : fuels and lubricants for personal transport equipment",
    "Cpi index 11 : restaurants and hotels",
    "Cpi index 12.3 : personal effects n.e.c.",
];

/// One parsed CSV row: the index level of a component for one month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRow {
    pub year: i32,
    /// Always the first day of the month.
    pub date: NaiveDate,
    pub component: String,
    /// Raw index level (the CSV column is historically named `pct_change`).
    pub value: f64,
}

/// A [`RawRow`] plus its change relative to the series baseline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    pub year: i32,
    pub date: NaiveDate,
    pub component: String,
    pub value: f64,
    /// Ratio, not percent: `0.2` means +20%.
    pub change: f64,
}

impl ChartPoint {
    pub fn from_row(row: &RawRow, change: f64) -> Self {
        Self {
            year: row.year,
            date: row.date,
            component: row.component.clone(),
            value: row.value,
            change,
        }
    }
}

/// 8-bit RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Lowercase `#rrggbb`.
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// CSS functional notation, e.g. `rgb(77, 0, 0)`.
    pub fn to_css(self) -> String {
        format!("rgb({}, {}, {})", self.r, self.g, self.b)
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// All points of one component inside the selected window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub name: String,
    /// Date ascending.
    pub points: Vec<ChartPoint>,
    /// `change` of the last point.
    pub latest: f64,
    /// Resolved by the color mapper; `None` straight out of the series builder.
    pub color: Option<Rgb>,
}

impl Series {
    pub fn is_headline(&self) -> bool {
        self.name == HEADLINE_COMPONENT
    }

    /// Resolved color, or a neutral grey when colors have not been assigned.
    pub fn color_or_default(&self) -> Rgb {
        self.color.unwrap_or(Rgb::new(0x80, 0x80, 0x80))
    }
}

/// User-controlled selection state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub year: i32,
    /// 1-based month.
    pub month: u32,
    /// Components to display, in display order.
    pub components: Vec<String>,
}

impl Selection {
    /// Default selection for a dataset: start at the first month of the data,
    /// show the default components that actually exist.
    pub fn default_for(available: &[String], min_date: NaiveDate) -> Self {
        Self {
            year: min_date.year(),
            month: min_date.month(),
            components: default_components(available),
        }
    }

    /// Requested start date (first of the selected month), before clamping.
    pub fn requested_from(&self) -> NaiveDate {
        let month = self.month.clamp(1, 12);
        NaiveDate::from_ymd_opt(self.year, month, 1).unwrap_or(NaiveDate::MIN)
    }

    /// Requested start date clamped into `[min_date, max_date]`.
    pub fn effective_from(&self, min_date: NaiveDate, max_date: NaiveDate) -> NaiveDate {
        let requested = self.requested_from();
        if max_date < min_date {
            return requested;
        }
        requested.clamp(min_date, max_date)
    }

    pub fn is_selected(&self, component: &str) -> bool {
        self.components.iter().any(|c| c == component)
    }

    /// Add or remove a component, keeping display order stable.
    pub fn toggle(&mut self, component: &str) {
        if let Some(idx) = self.components.iter().position(|c| c == component) {
            self.components.remove(idx);
        } else {
            self.components.push(component.to_string());
        }
    }
}

/// [`DEFAULT_COMPONENTS`] restricted to the names present in `available`.
pub fn default_components(available: &[String]) -> Vec<String> {
    DEFAULT_COMPONENTS
        .iter()
        .filter(|name| available.iter().any(|a| a == *name))
        .map(|name| name.to_string())
        .collect()
}

/// Fixed chart margins in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Margins {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

/// Chart layout constants.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Layout {
    pub width: f64,
    pub height: f64,
    pub margins: Margins,
    /// Radius of the per-point hover markers.
    pub marker_radius: f64,
    /// Target number of labelled ticks per axis.
    pub tick_count: usize,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            width: 960.0,
            height: 540.0,
            margins: Margins {
                top: 20.0,
                right: 30.0,
                bottom: 40.0,
                left: 56.0,
            },
            marker_radius: 4.0,
            tick_count: 6,
        }
    }
}

impl Layout {
    pub fn with_size(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }

    /// Horizontal pixel range `[left, width - right]`.
    pub fn x_range(&self) -> (f64, f64) {
        (self.margins.left, self.width - self.margins.right)
    }

    /// Vertical pixel range `[height - bottom, top]` (inverted: larger values render higher).
    pub fn y_range(&self) -> (f64, f64) {
        (self.height - self.margins.bottom, self.margins.top)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, 1).unwrap()
    }

    #[test]
    fn hex_formats_lowercase() {
        assert_eq!(Rgb::new(0, 0x1f, 0x4d).to_hex(), "#001f4d");
    }

    #[test]
    fn effective_from_is_clamped() {
        let min = date(1988, 1);
        let max = date(2024, 6);
        let mut sel = Selection {
            year: 2030,
            month: 3,
            components: vec![],
        };
        assert_eq!(sel.effective_from(min, max), max);

        sel.year = 1950;
        assert_eq!(sel.effective_from(min, max), min);

        sel.year = 2008;
        sel.month = 13;
        assert_eq!(sel.effective_from(min, max), date(2008, 12));
    }

    #[test]
    fn default_selection_drops_unknown_names() {
        let available = vec![
            HEADLINE_COMPONENT.to_string(),
            "Something else".to_string(),
        ];
        let sel = Selection::default_for(&available, date(2000, 5));
        assert_eq!(sel.components, vec![HEADLINE_COMPONENT.to_string()]);
        assert_eq!((sel.year, sel.month), (2000, 5));
    }

    #[test]
    fn toggle_adds_and_removes() {
        let mut sel = Selection {
            year: 2020,
            month: 1,
            components: vec!["A".to_string()],
        };
        sel.toggle("B");
        assert_eq!(sel.components, vec!["A", "B"]);
        sel.toggle("A");
        assert_eq!(sel.components, vec!["B"]);
    }
}
