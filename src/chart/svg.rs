//! Serialize a [`Scene`] to a standalone SVG document.
//!
//! Markers carry a `<title>` child with the tooltip text, so any SVG viewer
//! shows the hovered point natively.

use std::path::Path;

use crate::chart::scale::format_change;
use crate::chart::scene::{Element, Line, Marker, Scene, SeriesPath, Text, fmt_coord};
use crate::error::{AppError, EXIT_USAGE};

const FONT_FAMILY: &str = "system-ui, sans-serif";

/// Render the scene as an SVG document.
pub fn render_svg(scene: &Scene) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w}\" height=\"{h}\" viewBox=\"0 0 {w} {h}\" font-family=\"{FONT_FAMILY}\">\n",
        w = fmt_coord(scene.width),
        h = fmt_coord(scene.height),
    ));
    out.push_str("<rect width=\"100%\" height=\"100%\" fill=\"#ffffff\"/>\n");

    for element in &scene.elements {
        match element {
            Element::Line(line) => push_line(&mut out, line),
            Element::Text(text) => push_text(&mut out, text),
            Element::Path(path) => push_path(&mut out, path),
            Element::Marker(marker) => push_marker(&mut out, marker),
        }
    }

    out.push_str("</svg>\n");
    out
}

/// Render and write the scene to `path`.
pub fn write_svg(path: &Path, scene: &Scene) -> Result<(), AppError> {
    std::fs::write(path, render_svg(scene))
        .map_err(|e| AppError::new(EXIT_USAGE, format!("Failed to write SVG '{}': {e}", path.display())))
}

fn push_line(out: &mut String, line: &Line) {
    let dash = line
        .dash
        .map(|d| format!(" stroke-dasharray=\"{d}\""))
        .unwrap_or_default();
    out.push_str(&format!(
        "<line class=\"{}\" x1=\"{}\" y1=\"{}\" x2=\"{}\" y2=\"{}\" stroke=\"{}\" stroke-width=\"{}\"{dash}/>\n",
        line.role.class(),
        fmt_coord(line.x1),
        fmt_coord(line.y1),
        fmt_coord(line.x2),
        fmt_coord(line.y2),
        escape(&line.stroke),
        fmt_coord(line.stroke_width),
    ));
}

fn push_text(out: &mut String, text: &Text) {
    let x = fmt_coord(text.x);
    let y = fmt_coord(text.y);
    let rotate = text
        .rotate
        .map(|deg| format!(" transform=\"rotate({} {x} {y})\"", fmt_coord(deg)))
        .unwrap_or_default();
    out.push_str(&format!(
        "<text class=\"{}\" x=\"{x}\" y=\"{y}\" text-anchor=\"{}\" fill=\"{}\" font-size=\"{}\"{rotate}>{}</text>\n",
        text.role.class(),
        text.anchor.as_svg(),
        escape(&text.fill),
        fmt_coord(text.size),
        escape(&text.content),
    ));
}

fn push_path(out: &mut String, path: &SeriesPath) {
    out.push_str(&format!(
        "<path class=\"series\" data-component=\"{}\" d=\"{}\" fill=\"none\" stroke=\"{}\" stroke-width=\"{}\"/>\n",
        escape(&path.name),
        path.d,
        path.stroke.to_css(),
        fmt_coord(path.stroke_width),
    ));
}

fn push_marker(out: &mut String, marker: &Marker) {
    let info = &marker.info;
    out.push_str(&format!(
        "<circle class=\"marker\" cx=\"{}\" cy=\"{}\" r=\"{}\" fill=\"{}\" fill-opacity=\"0.85\"><title>{}</title></circle>\n",
        fmt_coord(marker.cx),
        fmt_coord(marker.cy),
        fmt_coord(marker.r),
        info.color.to_css(),
        escape(&tooltip_text(marker)),
    ));
}

/// `Food (Mar 2021): +4.2%`
fn tooltip_text(marker: &Marker) -> String {
    let info = &marker.info;
    format!(
        "{} ({}): {}",
        info.component,
        info.date.format("%b %Y"),
        format_change(info.change)
    )
}

/// Minimal XML escaping for attribute values and text nodes.
fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}
