//! Scale/domain engine: data domains, pixel mappings and tick generation.
//!
//! Scales are plain values rebuilt on every derive; nothing is cached.

use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::domain::{Layout, Series};

/// Value domain used when there is nothing at all to measure.
pub const FALLBACK_VALUE_DOMAIN: (f64, f64) = (-0.1, 0.1);

/// Windows starting more than this many years before the latest month get
/// year-only axis labels.
const SHORT_WINDOW_YEARS: u32 = 3;

/// Month steps considered for time ticks.
const TIME_TICK_STEPS: [u32; 10] = [1, 2, 3, 6, 12, 24, 60, 120, 240, 600];

/// Continuous linear map from a numeric domain onto a pixel range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearScale {
    pub domain: (f64, f64),
    pub range: (f64, f64),
}

impl LinearScale {
    pub fn new(domain: (f64, f64), range: (f64, f64)) -> Self {
        Self { domain, range }
    }

    /// A degenerate domain maps everything to the middle of the range.
    pub fn map(&self, v: f64) -> f64 {
        let (d0, d1) = self.domain;
        let (r0, r1) = self.range;
        let span = d1 - d0;
        let t = if span == 0.0 { 0.5 } else { (v - d0) / span };
        r0 + (r1 - r0) * t
    }

    pub fn invert(&self, px: f64) -> f64 {
        let (d0, d1) = self.domain;
        let (r0, r1) = self.range;
        let span = r1 - r0;
        let t = if span == 0.0 { 0.5 } else { (px - r0) / span };
        d0 + (d1 - d0) * t
    }

    pub fn ticks(&self, count: usize) -> Vec<f64> {
        linear_ticks(self.domain.0, self.domain.1, count)
    }
}

/// Continuous linear map from dates onto a pixel range (day resolution).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeScale {
    pub domain: (NaiveDate, NaiveDate),
    pub range: (f64, f64),
}

impl TimeScale {
    pub fn new(domain: (NaiveDate, NaiveDate), range: (f64, f64)) -> Self {
        Self { domain, range }
    }

    fn linear(&self) -> LinearScale {
        LinearScale::new((day_number(self.domain.0), day_number(self.domain.1)), self.range)
    }

    pub fn map(&self, date: NaiveDate) -> f64 {
        self.linear().map(day_number(date))
    }

    /// Nearest calendar day for a pixel position.
    pub fn invert(&self, px: f64) -> NaiveDate {
        let days = self.linear().invert(px).round() as i32;
        NaiveDate::from_num_days_from_ce_opt(days).unwrap_or(self.domain.0)
    }

    pub fn ticks(&self, count: usize) -> Vec<NaiveDate> {
        time_ticks(self.domain.0, self.domain.1, count)
    }
}

fn day_number(date: NaiveDate) -> f64 {
    date.num_days_from_ce() as f64
}

/// How horizontal tick labels are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TickFormat {
    /// `Jan 2020`
    MonthYear,
    /// `2020`
    Year,
}

impl TickFormat {
    /// Long windows get year-only labels to avoid crowding.
    pub fn for_window(from: NaiveDate, max_date: NaiveDate) -> Self {
        let cutoff = max_date
            .checked_sub_months(Months::new(12 * SHORT_WINDOW_YEARS))
            .unwrap_or(NaiveDate::MIN);
        if from < cutoff {
            TickFormat::Year
        } else {
            TickFormat::MonthYear
        }
    }

    pub fn format(self, date: NaiveDate) -> String {
        match self {
            TickFormat::MonthYear => date.format("%b %Y").to_string(),
            TickFormat::Year => date.format("%Y").to_string(),
        }
    }
}

/// Signed percentage label for a change ratio: `+12%`, `-3.5%`, `0%`.
pub fn format_change(change: f64) -> String {
    let pct = change * 100.0;
    if pct.abs() < 1e-9 {
        return "0%".to_string();
    }
    let body = if (pct - pct.round()).abs() < 1e-9 {
        format!("{:.0}", pct.abs())
    } else {
        format!("{:.1}", pct.abs())
    };
    let sign = if pct > 0.0 { '+' } else { '-' };
    format!("{sign}{body}%")
}

/// `[min date, max date]` over the given series, or a single instant at
/// `fallback` when there are no points.
pub fn time_domain<'a, I>(series: I, fallback: NaiveDate) -> (NaiveDate, NaiveDate)
where
    I: IntoIterator<Item = &'a Series>,
{
    let mut bounds: Option<(NaiveDate, NaiveDate)> = None;
    for p in series.into_iter().flat_map(|s| s.points.iter()) {
        bounds = Some(match bounds {
            None => (p.date, p.date),
            Some((lo, hi)) => (lo.min(p.date), hi.max(p.date)),
        });
    }
    bounds.unwrap_or((fallback, fallback))
}

/// Extent of all displayed changes plus 0 and the headline's latest value,
/// or [`FALLBACK_VALUE_DOMAIN`] when there is neither.
pub fn value_domain<'a, I>(series: I, headline: Option<&Series>) -> (f64, f64)
where
    I: IntoIterator<Item = &'a Series>,
{
    let mut values = series
        .into_iter()
        .flat_map(|s| s.points.iter().map(|p| p.change))
        .chain(headline.map(|h| h.latest))
        .peekable();

    // Nothing to measure at all.
    if values.peek().is_none() {
        return FALLBACK_VALUE_DOMAIN;
    }

    // Zero is always in range so the zero line stays visible.
    let (lo, hi) = values
        .filter(|v| v.is_finite())
        .fold((0.0_f64, 0.0_f64), |(lo, hi), v| (lo.min(v), hi.max(v)));
    (lo, hi)
}

/// Build the two pixel mappings for a layout.
pub fn scales_for(
    layout: &Layout,
    time: (NaiveDate, NaiveDate),
    value: (f64, f64),
) -> (TimeScale, LinearScale) {
    (
        TimeScale::new(time, layout.x_range()),
        LinearScale::new(value, layout.y_range()),
    )
}

/// Evenly spaced "nice" ticks (1, 2 or 5 × 10^k) inside `[start, stop]`.
///
/// Ticks are generated from integer multiples (or integer fractions, for
/// steps below 1) so they do not accumulate floating-point drift.
pub fn linear_ticks(start: f64, stop: f64, count: usize) -> Vec<f64> {
    if !(start.is_finite() && stop.is_finite()) || count == 0 {
        return Vec::new();
    }
    if start == stop {
        return vec![start];
    }
    let (lo, hi, reverse) = if stop < start {
        (stop, start, true)
    } else {
        (start, stop, false)
    };

    let Some(spec) = TickSpec::new(lo, hi, count) else {
        return Vec::new();
    };

    let mut ticks: Vec<f64> = (spec.first..=spec.last).map(|i| spec.value(i)).collect();
    if reverse {
        ticks.reverse();
    }
    ticks
}

/// Tick `i` sits at `i * step`, or at `i / step` when `inverse` (sub-unit steps).
struct TickSpec {
    first: i64,
    last: i64,
    step: f64,
    inverse: bool,
}

impl TickSpec {
    fn new(lo: f64, hi: f64, count: usize) -> Option<Self> {
        let raw = (hi - lo) / count as f64;
        let power = raw.log10().floor();
        let error = raw / 10f64.powf(power);
        let factor = if error >= 50f64.sqrt() {
            10.0
        } else if error >= 10f64.sqrt() {
            5.0
        } else if error >= 2f64.sqrt() {
            2.0
        } else {
            1.0
        };

        let (step, inverse) = if power < 0.0 {
            (10f64.powf(-power) / factor, true)
        } else {
            (10f64.powf(power) * factor, false)
        };
        if !(step.is_finite() && step > 0.0) {
            return None;
        }

        let mut spec = Self {
            first: 0,
            last: 0,
            step,
            inverse,
        };
        let scaled = |v: f64| if inverse { v * step } else { v / step };
        spec.first = scaled(lo).round() as i64;
        spec.last = scaled(hi).round() as i64;
        if spec.value(spec.first) < lo {
            spec.first += 1;
        }
        if spec.value(spec.last) > hi {
            spec.last -= 1;
        }
        Some(spec)
    }

    fn value(&self, i: i64) -> f64 {
        if self.inverse {
            i as f64 / self.step
        } else {
            i as f64 * self.step
        }
    }
}

/// Month-aligned ticks inside `[start, end]`, spaced by the candidate step
/// whose tick count lands closest to `count`.
pub fn time_ticks(start: NaiveDate, end: NaiveDate, count: usize) -> Vec<NaiveDate> {
    let (start, end) = if end < start { (end, start) } else { (start, end) };
    if count == 0 {
        return Vec::new();
    }

    let first = month_index(start) + i64::from(start.day() > 1);
    let last = month_index(end);
    if last < first {
        // Window shorter than a month with no first-of-month inside it.
        return vec![start];
    }

    let span = (last - first) as f64;
    let step = TIME_TICK_STEPS
        .iter()
        .copied()
        .min_by(|a, b| {
            let da = (span / *a as f64 - count as f64).abs();
            let db = (span / *b as f64 - count as f64).abs();
            da.total_cmp(&db)
        })
        .unwrap_or(12) as i64;

    // Align to multiples of the step counted from year 0 so that, e.g., yearly
    // ticks land on January and 6-month ticks on January/July.
    let aligned = first + (step - first.rem_euclid(step)) % step;

    (aligned..=last)
        .step_by(step as usize)
        .filter_map(month_from_index)
        .collect()
}

fn month_index(date: NaiveDate) -> i64 {
    i64::from(date.year()) * 12 + i64::from(date.month0())
}

fn month_from_index(idx: i64) -> Option<NaiveDate> {
    let year = i32::try_from(idx.div_euclid(12)).ok()?;
    let month = idx.rem_euclid(12) as u32 + 1;
    NaiveDate::from_ymd_opt(year, month, 1)
}
