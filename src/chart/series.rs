//! Series builder: raw rows -> per-component series of baseline-relative changes.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::domain::{ChartPoint, RawRow, Series};

/// Series keyed by component name. `BTreeMap` keeps iteration deterministic.
pub type SeriesMap = BTreeMap<String, Series>;

/// Rows on or after `from`, in input order.
pub fn filter_from(rows: &[RawRow], from: NaiveDate) -> Vec<&RawRow> {
    rows.iter().filter(|r| r.date >= from).collect()
}

/// Group rows by component and compute `change` against each group's first point.
///
/// Colors are left unset; see [`crate::chart::color::assign_colors`].
pub fn build_series<'a, I>(rows: I) -> SeriesMap
where
    I: IntoIterator<Item = &'a RawRow>,
{
    let mut groups: BTreeMap<&str, Vec<&RawRow>> = BTreeMap::new();
    for row in rows {
        groups.entry(row.component.as_str()).or_default().push(row);
    }

    groups
        .into_iter()
        .filter_map(|(name, mut group)| {
            // Re-sort even when the input is sorted: filtering gives no
            // ordering guarantee. Stable, so equal dates keep input order.
            group.sort_by_key(|r| r.date);
            let series = series_from_group(name, &group)?;
            Some((name.to_string(), series))
        })
        .collect()
}

fn series_from_group(name: &str, group: &[&RawRow]) -> Option<Series> {
    let baseline = group.first()?.value;

    let points: Vec<ChartPoint> = group
        .iter()
        .map(|row| ChartPoint::from_row(row, relative_change(row.value, baseline)))
        .collect();

    let latest = points.last().map(|p| p.change).unwrap_or(0.0);

    Some(Series {
        name: name.to_string(),
        points,
        latest,
        color: None,
    })
}

/// `(value - baseline) / baseline`, or 0 when that is not finite
/// (zero or subnormal baseline).
pub fn relative_change(value: f64, baseline: f64) -> f64 {
    if baseline == 0.0 {
        return 0.0;
    }
    let change = (value - baseline) / baseline;
    if change.is_finite() { change } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn row(component: &str, y: i32, m: u32, value: f64) -> RawRow {
        let date = NaiveDate::from_ymd_opt(y, m, 1).unwrap();
        RawRow {
            year: y,
            date,
            component: component.to_string(),
            value,
        }
    }

    #[test]
    fn component_set_is_preserved() {
        let rows = vec![
            row("Food", 2008, 1, 100.0),
            row("Transport", 2008, 1, 50.0),
            row("Food", 2008, 2, 101.0),
            row("Clothing", 2008, 3, 0.0),
        ];
        let series = build_series(&rows);
        let names: BTreeSet<&str> = series.keys().map(String::as_str).collect();
        let expected: BTreeSet<&str> = rows.iter().map(|r| r.component.as_str()).collect();
        assert_eq!(names, expected);
    }

    #[test]
    fn baseline_point_has_zero_change() {
        let rows = vec![
            row("Food", 2008, 3, 130.0),
            row("Food", 2008, 1, 100.0),
            row("Food", 2008, 2, 110.0),
        ];
        let series = build_series(&rows);
        let food = &series["Food"];
        assert_eq!(food.points[0].change, 0.0);
        assert_eq!(food.points[0].date, NaiveDate::from_ymd_opt(2008, 1, 1).unwrap());
        assert!((food.points[1].change - 0.1).abs() < 1e-12);
        assert!((food.latest - 0.3).abs() < 1e-12);
        assert_eq!(food.latest, food.points.last().unwrap().change);
        assert!(food.color.is_none());
    }

    #[test]
    fn zero_baseline_yields_all_zero_changes() {
        let rows = vec![
            row("Odd", 2008, 1, 0.0),
            row("Odd", 2008, 2, 5.0),
            row("Odd", 2008, 3, -2.0),
        ];
        let series = build_series(&rows);
        let odd = &series["Odd"];
        assert!(odd.points.iter().all(|p| p.change == 0.0));
        assert_eq!(odd.latest, 0.0);
    }

    #[test]
    fn tiny_baseline_does_not_overflow() {
        let rows = vec![row("Tiny", 2020, 1, 1e-310), row("Tiny", 2020, 2, 1.0)];
        let series = build_series(&rows);
        let tiny = &series["Tiny"];
        assert!(tiny.points.iter().all(|p| p.change.is_finite()));
        assert_eq!(tiny.latest, 0.0);
        assert_eq!(relative_change(110.0, 100.0), 0.1);
    }

    #[test]
    fn equal_dates_keep_input_order() {
        let rows = vec![row("Food", 2008, 1, 100.0), row("Food", 2008, 1, 200.0)];
        let series = build_series(&rows);
        let food = &series["Food"];
        assert_eq!(food.points[0].value, 100.0);
        assert_eq!(food.points[1].change, 1.0);
    }

    #[test]
    fn filter_then_build_single_point_window() {
        let rows = vec![row("Food", 2007, 1, 100.0), row("Food", 2008, 1, 110.0)];
        let from = NaiveDate::from_ymd_opt(2008, 1, 1).unwrap();
        let filtered = filter_from(&rows, from);
        assert_eq!(filtered.len(), 1);

        let series = build_series(filtered);
        let food = &series["Food"];
        assert_eq!(food.points.len(), 1);
        assert_eq!(food.points[0].change, 0.0);
        assert_eq!(food.latest, 0.0);
    }

    #[test]
    fn empty_input_builds_nothing() {
        assert!(build_series(&Vec::<RawRow>::new()).is_empty());
    }
}
