//! Scene graph for the line chart.
//!
//! The scene is a flat, render-agnostic list of primitives in chart pixel
//! coordinates (origin at the top-left of the chart). The SVG writer and the
//! hit tester both consume it; neither needs to know how it was derived.

use chrono::NaiveDate;
use serde::Serialize;

use crate::app::pipeline::ChartState;
use crate::chart::scale::format_change;
use crate::domain::{Layout, Rgb, Series};

const AXIS_COLOR: &str = "#4a5568";
const GRID_COLOR: &str = "#e2e8f0";
const LABEL_COLOR: &str = "#4a5568";
const HEADLINE_COLOR: &str = "#1a202c";
const TICK_SIZE: f64 = 6.0;
const LABEL_SIZE: f64 = 11.0;

pub const EMPTY_SELECTION_MESSAGE: &str = "Select at least one component to draw the chart.";
pub const NO_DATA_MESSAGE: &str = "No data in the selected window.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Anchor {
    Start,
    Middle,
    End,
}

impl Anchor {
    pub fn as_svg(self) -> &'static str {
        match self {
            Anchor::Start => "start",
            Anchor::Middle => "middle",
            Anchor::End => "end",
        }
    }
}

/// What a primitive is for; the SVG writer uses it as the `class` attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Role {
    Axis,
    Grid,
    Tick,
    TickLabel,
    AxisLabel,
    ZeroLine,
    Headline,
    HeadlineLabel,
    Message,
}

impl Role {
    pub fn class(self) -> &'static str {
        match self {
            Role::Axis => "axis",
            Role::Grid => "grid",
            Role::Tick => "tick",
            Role::TickLabel => "tick-label",
            Role::AxisLabel => "axis-label",
            Role::ZeroLine => "zero-line",
            Role::Headline => "headline",
            Role::HeadlineLabel => "headline-label",
            Role::Message => "message",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Line {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
    pub stroke: String,
    pub stroke_width: f64,
    /// SVG `stroke-dasharray`, when dashed.
    pub dash: Option<&'static str>,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Text {
    pub x: f64,
    pub y: f64,
    pub content: String,
    pub anchor: Anchor,
    pub fill: String,
    pub size: f64,
    /// Rotation in degrees around `(x, y)`.
    pub rotate: Option<f64>,
    pub role: Role,
}

/// A smoothed line through one series' points.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPath {
    pub name: String,
    /// SVG path data.
    pub d: String,
    pub stroke: Rgb,
    pub stroke_width: f64,
}

/// What a hover over a marker reports.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarkerInfo {
    pub component: String,
    pub date: NaiveDate,
    pub change: f64,
    pub color: Rgb,
}

/// Hover hit target for one chart point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Marker {
    pub cx: f64,
    pub cy: f64,
    pub r: f64,
    pub info: MarkerInfo,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Element {
    Line(Line),
    Text(Text),
    Path(SeriesPath),
    Marker(Marker),
}

/// Everything to draw, in paint order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Scene {
    pub width: f64,
    pub height: f64,
    pub elements: Vec<Element>,
}

impl Scene {
    pub fn markers(&self) -> impl Iterator<Item = &Marker> {
        self.elements.iter().filter_map(|e| match e {
            Element::Marker(m) => Some(m),
            _ => None,
        })
    }

    pub fn paths(&self) -> impl Iterator<Item = &SeriesPath> {
        self.elements.iter().filter_map(|e| match e {
            Element::Path(p) => Some(p),
            _ => None,
        })
    }

    pub fn texts(&self) -> impl Iterator<Item = &Text> {
        self.elements.iter().filter_map(|e| match e {
            Element::Text(t) => Some(t),
            _ => None,
        })
    }

    pub fn lines(&self) -> impl Iterator<Item = &Line> {
        self.elements.iter().filter_map(|e| match e {
            Element::Line(l) => Some(l),
            _ => None,
        })
    }
}

/// A scene holding nothing but a centred message (load failures, empty selections).
pub fn message_scene(layout: &Layout, message: &str) -> Scene {
    Scene {
        width: layout.width,
        height: layout.height,
        elements: vec![Element::Text(Text {
            x: layout.width / 2.0,
            y: layout.height / 2.0,
            content: message.to_string(),
            anchor: Anchor::Middle,
            fill: LABEL_COLOR.to_string(),
            size: 14.0,
            rotate: None,
            role: Role::Message,
        })],
    }
}

/// Build the chart scene for a derived state.
pub fn build_scene(state: &ChartState) -> Scene {
    let layout = &state.layout;
    if state.selection_is_empty() {
        return message_scene(layout, EMPTY_SELECTION_MESSAGE);
    }
    if !state.has_points() {
        return message_scene(layout, NO_DATA_MESSAGE);
    }

    let mut elements = Vec::new();
    let (x0, x1) = layout.x_range();
    let (y_bottom, y_top) = layout.y_range();

    // Horizontal gridlines and value ticks.
    for &tick in &state.y_ticks {
        let y = state.y.map(tick);
        elements.push(Element::Line(Line {
            x1: x0,
            y1: y,
            x2: x1,
            y2: y,
            stroke: GRID_COLOR.to_string(),
            stroke_width: 1.0,
            dash: None,
            role: Role::Grid,
        }));
        elements.push(Element::Text(tick_label(
            x0 - TICK_SIZE - 2.0,
            y + LABEL_SIZE / 3.0,
            format_change(tick),
            Anchor::End,
        )));
    }

    // Axes.
    elements.push(axis_line(x0, y_bottom, x1, y_bottom));
    elements.push(axis_line(x0, y_top, x0, y_bottom));

    // Time ticks.
    for &tick in &state.x_ticks {
        let x = state.x.map(tick);
        elements.push(Element::Line(Line {
            x1: x,
            y1: y_bottom,
            x2: x,
            y2: y_bottom + TICK_SIZE,
            stroke: AXIS_COLOR.to_string(),
            stroke_width: 1.0,
            dash: None,
            role: Role::Tick,
        }));
        elements.push(Element::Text(tick_label(
            x,
            y_bottom + TICK_SIZE + LABEL_SIZE + 2.0,
            state.tick_format.format(tick),
            Anchor::Middle,
        )));
    }

    elements.push(Element::Text(Text {
        x: 14.0,
        y: (y_top + y_bottom) / 2.0,
        content: format!("Change since {}", state.from.format("%b %Y")),
        anchor: Anchor::Middle,
        fill: LABEL_COLOR.to_string(),
        size: LABEL_SIZE + 1.0,
        rotate: Some(-90.0),
        role: Role::AxisLabel,
    }));

    // Zero reference.
    let y_zero = state.y.map(0.0);
    elements.push(Element::Line(Line {
        x1: x0,
        y1: y_zero,
        x2: x1,
        y2: y_zero,
        stroke: AXIS_COLOR.to_string(),
        stroke_width: 1.5,
        dash: None,
        role: Role::ZeroLine,
    }));

    // Headline inflation reference.
    if let Some(headline) = &state.headline {
        let y = state.y.map(headline.latest);
        elements.push(Element::Line(Line {
            x1: x0,
            y1: y,
            x2: x1,
            y2: y,
            stroke: HEADLINE_COLOR.to_string(),
            stroke_width: 1.0,
            dash: Some("6 4"),
            role: Role::Headline,
        }));
        elements.push(Element::Text(Text {
            x: x1,
            y: y - 4.0,
            content: format!("All items {}", format_change(headline.latest)),
            anchor: Anchor::End,
            fill: HEADLINE_COLOR.to_string(),
            size: LABEL_SIZE,
            rotate: None,
            role: Role::HeadlineLabel,
        }));
    }

    // Series lines first, then markers on top so every point stays hoverable.
    let projected: Vec<(&Series, Vec<(f64, f64)>)> = state
        .displayed()
        .map(|s| {
            let pts = s
                .points
                .iter()
                .map(|p| (state.x.map(p.date), state.y.map(p.change)))
                .collect();
            (s, pts)
        })
        .collect();

    for (series, pts) in &projected {
        elements.push(Element::Path(SeriesPath {
            name: series.name.clone(),
            d: monotone_path(pts),
            stroke: series.color_or_default(),
            stroke_width: if series.is_headline() { 2.5 } else { 1.75 },
        }));
    }

    for (series, pts) in &projected {
        let color = series.color_or_default();
        for (point, &(cx, cy)) in series.points.iter().zip(pts) {
            elements.push(Element::Marker(Marker {
                cx,
                cy,
                r: layout.marker_radius,
                info: MarkerInfo {
                    component: series.name.clone(),
                    date: point.date,
                    change: point.change,
                    color,
                },
            }));
        }
    }

    Scene {
        width: layout.width,
        height: layout.height,
        elements,
    }
}

fn axis_line(x1: f64, y1: f64, x2: f64, y2: f64) -> Element {
    Element::Line(Line {
        x1,
        y1,
        x2,
        y2,
        stroke: AXIS_COLOR.to_string(),
        stroke_width: 1.0,
        dash: None,
        role: Role::Axis,
    })
}

fn tick_label(x: f64, y: f64, content: String, anchor: Anchor) -> Text {
    Text {
        x,
        y,
        content,
        anchor,
        fill: LABEL_COLOR.to_string(),
        size: LABEL_SIZE,
        rotate: None,
        role: Role::TickLabel,
    }
}

/// Monotone cubic interpolation in x (Fritsch–Carlson tangents), as SVG path data.
///
/// The curve passes through every point and never overshoots between two
/// neighbours, so it stays inside the points' vertical extent.
pub fn monotone_path(points: &[(f64, f64)]) -> String {
    match points {
        [] => String::new(),
        [(x, y)] => format!("M{},{}", fmt_coord(*x), fmt_coord(*y)),
        [(x0, y0), (x1, y1)] => format!(
            "M{},{}L{},{}",
            fmt_coord(*x0),
            fmt_coord(*y0),
            fmt_coord(*x1),
            fmt_coord(*y1)
        ),
        _ => {
            let tangents = monotone_tangents(points);
            let mut d = format!("M{},{}", fmt_coord(points[0].0), fmt_coord(points[0].1));
            for i in 0..points.len() - 1 {
                let (xa, ya) = points[i];
                let (xb, yb) = points[i + 1];
                let dx = (xb - xa) / 3.0;
                d.push_str(&format!(
                    "C{},{},{},{},{},{}",
                    fmt_coord(xa + dx),
                    fmt_coord(ya + dx * tangents[i]),
                    fmt_coord(xb - dx),
                    fmt_coord(yb - dx * tangents[i + 1]),
                    fmt_coord(xb),
                    fmt_coord(yb),
                ));
            }
            d
        }
    }
}

fn monotone_tangents(points: &[(f64, f64)]) -> Vec<f64> {
    let n = points.len();
    let secant = |i: usize| {
        let h = points[i + 1].0 - points[i].0;
        if h == 0.0 {
            0.0
        } else {
            (points[i + 1].1 - points[i].1) / h
        }
    };

    let mut m = vec![0.0; n];
    for i in 1..n - 1 {
        let h0 = points[i].0 - points[i - 1].0;
        let h1 = points[i + 1].0 - points[i].0;
        let s0 = secant(i - 1);
        let s1 = secant(i);
        let p = if h0 + h1 == 0.0 {
            0.0
        } else {
            (s0 * h1 + s1 * h0) / (h0 + h1)
        };
        let t = (sign(s0) + sign(s1)) * s0.abs().min(s1.abs()).min(0.5 * p.abs());
        m[i] = if t.is_finite() { t } else { 0.0 };
    }
    m[0] = (3.0 * secant(0) - m[1]) / 2.0;
    m[n - 1] = (3.0 * secant(n - 2) - m[n - 2]) / 2.0;
    m
}

fn sign(v: f64) -> f64 {
    if v > 0.0 {
        1.0
    } else if v < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// Compact coordinate formatting: at most two decimals, no trailing zeros.
pub fn fmt_coord(v: f64) -> String {
    let s = format!("{v:.2}");
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s == "-0" { "0".to_string() } else { s.to_string() }
}
