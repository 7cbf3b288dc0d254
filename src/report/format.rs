//! Terminal formatting for summaries and component listings.
//!
//! Formatting stays here so the pipeline code never builds strings for output.

use crate::chart::scale::format_change;
use crate::io::ingest::Dataset;
use crate::report::{Summary, SummaryEntry};

const NAME_WIDTH: usize = 48;

/// Format the latest-change table for a window.
pub fn format_summary(summary: &Summary) -> String {
    let mut out = String::new();

    out.push_str("=== cpi - UK CPI change by component ===\n");
    out.push_str(&format!(
        "Window: {} .. {}\n",
        summary.from.format("%b %Y"),
        summary.to.format("%b %Y")
    ));
    if let Some(h) = &summary.headline {
        out.push_str(&format!("All items: {}\n", format_change(h.latest)));
    }
    out.push('\n');

    if summary.entries.is_empty() {
        out.push_str("No selected components have data in this window.\n");
        return out;
    }

    out.push_str(&format_table(&summary.entries));
    out
}

fn format_table(rows: &[SummaryEntry]) -> String {
    let mut out = String::new();
    out.push_str(
        format!(
            "{:<NAME_WIDTH$} {:>10} {:>10} {:>8} {:>6} {:<7}",
            "component", "first", "last", "change", "n", "color"
        )
        .trim_end(),
    );
    out.push('\n');
    out.push_str(
        format!(
            "{:-<NAME_WIDTH$} {:-<10} {:-<10} {:-<8} {:-<6} {:-<7}",
            "", "", "", "", "", ""
        )
        .trim_end(),
    );
    out.push('\n');

    for r in rows {
        out.push_str(
            format!(
                "{:<NAME_WIDTH$} {:>10.1} {:>10.1} {:>8} {:>6} {:<7}",
                truncate(&r.component, NAME_WIDTH),
                r.first_value,
                r.last_value,
                format_change(r.latest),
                r.points,
                r.color,
            )
            .trim_end(),
        );
        out.push('\n');
    }

    out
}

/// One component per line, with the dataset's date range as a header.
pub fn format_components(dataset: &Dataset) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{} components, {} .. {} ({} rows, {} dropped)\n",
        dataset.components.len(),
        dataset.min_date.format("%b %Y"),
        dataset.max_date.format("%b %Y"),
        dataset.rows_read,
        dataset.rows_dropped,
    ));
    for name in &dataset.components {
        out.push_str(name);
        out.push('\n');
    }
    out
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    for (i, ch) in s.chars().enumerate() {
        if i + 1 >= max {
            break;
        }
        out.push(ch);
    }
    out.push('.');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn entry(name: &str, latest: f64) -> SummaryEntry {
        SummaryEntry {
            component: name.to_string(),
            first_value: 100.0,
            last_value: 100.0 * (1.0 + latest),
            latest,
            color: "#4d0000".to_string(),
            points: 13,
        }
    }

    #[test]
    fn summary_table_lists_entries() {
        let summary = Summary {
            from: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
            to: NaiveDate::from_ymd_opt(2021, 1, 1).unwrap(),
            headline: Some(entry("All", 0.04)),
            entries: vec![entry("Food", 0.12), entry("Energy", -0.035)],
        };
        let text = format_summary(&summary);
        assert!(text.contains("Window: Jan 2020 .. Jan 2021"));
        assert!(text.contains("All items: +4%"));
        let food = text.lines().find(|l| l.starts_with("Food")).unwrap();
        assert!(food.contains("+12%"));
        assert!(food.contains("112.0"));
        let energy = text.lines().find(|l| l.starts_with("Energy")).unwrap();
        assert!(energy.contains("-3.5%"));
    }

    #[test]
    fn empty_summary_explains_itself() {
        let summary = Summary {
            from: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
            to: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
            headline: None,
            entries: Vec::new(),
        };
        assert!(format_summary(&summary).contains("No selected components"));
    }

    #[test]
    fn truncate_marks_cut_names() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghij", 5), "abcd.");
    }
}
