//! Plotters-powered CPI chart widget for Ratatui.
//!
//! The widget draws into the whole area it is given (no label areas), so a
//! terminal cell maps linearly onto the chart's domains. The TUI relies on
//! that to turn mouse positions into scene coordinates for hit-testing, and
//! draws its own tick labels around the widget.
//!
//! We render Plotters output into the Ratatui buffer using `plotters-ratatui-backend`.

use plotters::prelude::*;
use plotters_ratatui_backend::widget_fn;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    widgets::Widget,
};

use crate::chart::scale::format_change;
use crate::domain::Rgb;

/// Dash segments across the x range for the headline reference.
const HEADLINE_DASHES: usize = 40;

/// One displayed series, already projected to `(day number, change)`.
pub struct ChartLine {
    pub color: Rgb,
    pub points: Vec<(f64, f64)>,
}

/// A lightweight, render-only chart description.
///
/// All series and bounds are computed outside the render call.
pub struct CpiPlottersChart<'a> {
    pub lines: &'a [ChartLine],
    /// Headline latest change, drawn as a horizontal reference.
    pub headline: Option<f64>,
    /// Currently hovered point, drawn on top.
    pub hovered: Option<(f64, f64)>,
    /// X bounds (days from CE).
    pub x_bounds: [f64; 2],
    /// Y bounds (change ratio).
    pub y_bounds: [f64; 2],
}

impl<'a> Widget for CpiPlottersChart<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        // Plotters may fail to build a chart in a tiny area; show a hint instead.
        if area.width < 20 || area.height < 8 {
            buf.set_string(
                area.x,
                area.y,
                "Chart area too small (resize terminal).",
                Style::default().fg(Color::Yellow),
            );
            return;
        }

        let [x0, x1] = self.x_bounds;
        let [y0, y1] = self.y_bounds;
        if !(x0.is_finite() && x1.is_finite() && y0.is_finite() && y1.is_finite()) || x1 <= x0 || y1 <= y0 {
            return;
        }

        let widget = widget_fn(move |root| {
            let mut chart = ChartBuilder::on(&root).build_cartesian_2d(x0..x1, y0..y1)?;

            let zero_color = RGBColor(0x71, 0x80, 0x96);
            let headline_color = RGBColor(0xe2, 0xe8, 0xf0);

            if y0 <= 0.0 && y1 >= 0.0 {
                chart.draw_series(LineSeries::new([(x0, 0.0), (x1, 0.0)], &zero_color))?;
            }
            if let Some(h) = self.headline {
                for (a, b) in dash_segments(x0, x1, HEADLINE_DASHES) {
                    chart.draw_series(LineSeries::new([(a, h), (b, h)], &headline_color))?;
                }
            }

            for line in self.lines {
                let color = RGBColor(line.color.r, line.color.g, line.color.b);
                chart.draw_series(LineSeries::new(line.points.iter().copied(), &color))?;
            }

            // `Circle` radii are mis-scaled by the backend; a pixel reads fine in a terminal.
            if let Some(p) = self.hovered {
                chart.draw_series(std::iter::once(Pixel::new(p, WHITE)))?;
            }

            Ok(())
        });

        widget.render(area, buf);

        if let Some(h) = self.headline {
            if let Some(row) = value_row(area, [y0, y1], h) {
                let label = format!("All items {}", format_change(h));
                let width = label.chars().count() as u16;
                let x = (area.x + area.width).saturating_sub(width + 1).max(area.x);
                // Sit just above the line when there is room.
                let row = if row > area.y { row - 1 } else { row };
                buf.set_string(x, row, label, Style::default().fg(Color::Gray));
            }
        }
    }
}

/// Alternating on/off pieces of `[x0, x1]`, starting and ending "on".
fn dash_segments(x0: f64, x1: f64, dashes: usize) -> Vec<(f64, f64)> {
    let pieces = dashes.max(1) * 2 - 1;
    let step = (x1 - x0) / pieces as f64;
    (0..pieces)
        .step_by(2)
        .map(|i| (x0 + step * i as f64, x0 + step * (i + 1) as f64))
        .collect()
}

/// Terminal row a value lands on, if it is inside the y bounds.
fn value_row(area: Rect, [y0, y1]: [f64; 2], value: f64) -> Option<u16> {
    if !(y0..=y1).contains(&value) || area.height == 0 {
        return None;
    }
    let frac = (y1 - value) / (y1 - y0);
    let offset = (frac * (area.height - 1) as f64).round() as u16;
    Some(area.y + offset.min(area.height - 1))
}
