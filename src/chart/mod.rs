//! Chart pipeline stages, from rows to drawable scene.
//!
//! `series` -> `color` -> `scale` -> `scene` -> `svg`, with `hit_test` for hover.

pub mod color;
pub mod hit_test;
pub mod scale;
pub mod scene;
pub mod series;
pub mod svg;

pub use hit_test::{BoundingBox, HoverInfo, Point, hit_test, tooltip_anchor};
pub use scene::{Scene, build_scene, message_scene};
pub use svg::{render_svg, write_svg};
