//! Hover hit-testing and tooltip placement.
//!
//! Pure geometry: given a pointer position and the rendered markers, find the
//! hovered point. Works the same for the SVG scene (pixels) and the TUI
//! (terminal cells mapped into scene coordinates).

use chrono::NaiveDate;
use serde::Serialize;

use crate::chart::scale::format_change;
use crate::chart::scene::Marker;
use crate::domain::Rgb;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    fn distance_sq(self, other: Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }
}

/// Axis-aligned box, top-left origin (like a DOM bounding client rect).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x <= self.x + self.width && p.y >= self.y && p.y <= self.y + self.height
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Grow by `by` on every side.
    pub fn inflate(&self, by: f64) -> Self {
        Self {
            x: self.x - by,
            y: self.y - by,
            width: self.width + 2.0 * by,
            height: self.height + 2.0 * by,
        }
    }
}

impl Marker {
    pub fn bounds(&self) -> BoundingBox {
        BoundingBox::new(self.cx - self.r, self.cy - self.r, 2.0 * self.r, 2.0 * self.r)
    }
}

/// What the tooltip shows for a hovered point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HoverInfo {
    pub component: String,
    pub date: NaiveDate,
    pub change: f64,
    pub color: Rgb,
    /// Tooltip anchor relative to the chart origin.
    pub position: Point,
}

impl HoverInfo {
    /// `Food, Mar 2021: +4.2%`
    pub fn label(&self) -> String {
        format!(
            "{}, {}: {}",
            self.component,
            self.date.format("%b %Y"),
            format_change(self.change)
        )
    }
}

/// Find the marker under `pointer`.
///
/// A marker is hit when the pointer lies inside its bounding box grown by
/// `tolerance`. Among several hits the nearest centre wins; on a tie the
/// marker painted last (top-most) wins.
pub fn hit_test<'a, I>(pointer: Point, markers: I, tolerance: f64) -> Option<HoverInfo>
where
    I: IntoIterator<Item = &'a Marker>,
{
    let mut best: Option<(&Marker, f64)> = None;
    for marker in markers {
        let bounds = marker.bounds().inflate(tolerance.max(0.0));
        if !bounds.contains(pointer) {
            continue;
        }
        let dist = pointer.distance_sq(bounds.center());
        match best {
            Some((_, best_dist)) if dist > best_dist => {}
            _ => best = Some((marker, dist)),
        }
    }

    best.map(|(marker, _)| HoverInfo {
        component: marker.info.component.clone(),
        date: marker.info.date,
        change: marker.info.change,
        color: marker.info.color,
        position: tooltip_anchor(marker.bounds(), BoundingBox::new(0.0, 0.0, 0.0, 0.0)),
    })
}

/// Tooltip anchor (top-centre of the marker) relative to the container.
///
/// Both boxes are in the same on-screen coordinate space, so the result does
/// not depend on scrolling or where the container sits on the page.
pub fn tooltip_anchor(marker: BoundingBox, container: BoundingBox) -> Point {
    Point::new(
        marker.x + marker.width / 2.0 - container.x,
        marker.y - container.y,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::scene::MarkerInfo;

    fn marker(name: &str, cx: f64, cy: f64) -> Marker {
        Marker {
            cx,
            cy,
            r: 4.0,
            info: MarkerInfo {
                component: name.to_string(),
                date: NaiveDate::from_ymd_opt(2021, 3, 1).unwrap(),
                change: 0.042,
                color: Rgb::new(0x4d, 0, 0),
            },
        }
    }

    #[test]
    fn hit_inside_marker_reports_point() {
        let markers = vec![marker("Food", 100.0, 50.0), marker("Transport", 200.0, 80.0)];
        let hover = hit_test(Point::new(102.0, 51.0), &markers, 0.0).unwrap();
        assert_eq!(hover.component, "Food");
        assert_eq!(hover.change, 0.042);
        assert_eq!(hover.color, Rgb::new(0x4d, 0, 0));
        assert_eq!(hover.position, Point::new(100.0, 46.0));
        assert_eq!(hover.label(), "Food, Mar 2021: +4.2%");
    }

    #[test]
    fn miss_returns_none() {
        let markers = vec![marker("Food", 100.0, 50.0)];
        assert!(hit_test(Point::new(110.0, 50.0), &markers, 0.0).is_none());
        // Tolerance widens the target: the box now reaches x = 107.
        assert!(hit_test(Point::new(106.0, 50.0), &markers, 0.0).is_none());
        assert!(hit_test(Point::new(106.0, 50.0), &markers, 3.0).is_some());
        assert!(hit_test(Point::new(110.0, 50.0), &markers, 3.0).is_none());
        assert!(hit_test(Point::new(0.0, 0.0), Vec::<&Marker>::new(), 5.0).is_none());
    }

    #[test]
    fn nearest_marker_wins_and_ties_go_to_topmost() {
        let markers = vec![marker("A", 100.0, 50.0), marker("B", 104.0, 50.0)];
        let hover = hit_test(Point::new(103.0, 50.0), &markers, 0.0).unwrap();
        assert_eq!(hover.component, "B");

        let stacked = vec![marker("Under", 100.0, 50.0), marker("Over", 100.0, 50.0)];
        let hover = hit_test(Point::new(100.0, 50.0), &stacked, 0.0).unwrap();
        assert_eq!(hover.component, "Over");
    }

    #[test]
    fn tooltip_anchor_is_relative_to_container() {
        // Same marker, container scrolled/shifted by different offsets.
        let container = BoundingBox::new(30.0, 200.0, 960.0, 540.0);
        let marker_box = BoundingBox::new(126.0, 246.0, 8.0, 8.0);
        assert_eq!(tooltip_anchor(marker_box, container), Point::new(100.0, 46.0));

        let shifted = BoundingBox::new(30.0, -400.0, 960.0, 540.0);
        let shifted_marker = BoundingBox::new(126.0, -354.0, 8.0, 8.0);
        assert_eq!(tooltip_anchor(shifted_marker, shifted), Point::new(100.0, 46.0));
    }
}
