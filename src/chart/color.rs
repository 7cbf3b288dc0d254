//! Diverging color scale for series, keyed on each series' latest change.
//!
//! Rising series are drawn on a red ramp, falling ones on a blue ramp. Each
//! ramp is normalized by the most extreme latest value on its side, so the
//! strongest riser is always the darkest red.

use crate::chart::series::SeriesMap;
use crate::domain::Rgb;

pub const RED_LIGHT: Rgb = Rgb::new(0xff, 0xe6, 0xe6);
pub const RED_DARK: Rgb = Rgb::new(0x4d, 0x00, 0x00);
pub const BLUE_LIGHT: Rgb = Rgb::new(0xcc, 0xe0, 0xff);
pub const BLUE_DARK: Rgb = Rgb::new(0x00, 0x1f, 0x4d);

/// Extremes of the latest values on each side of zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorExtremes {
    /// Largest non-negative latest value, 0 when there is none.
    pub pos_max: f64,
    /// Smallest negative latest value, 0 when there is none.
    pub neg_min: f64,
}

impl ColorExtremes {
    pub fn from_latest<I: IntoIterator<Item = f64>>(latest: I) -> Self {
        let mut pos_max = 0.0_f64;
        let mut neg_min = 0.0_f64;
        for v in latest {
            if v >= 0.0 {
                pos_max = pos_max.max(v);
            } else if v < 0.0 {
                neg_min = neg_min.min(v);
            }
        }
        Self { pos_max, neg_min }
    }
}

/// Which ramp a value lands on and where along it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Ramp {
    Red(f64),
    Blue(f64),
}

/// Position of `latest` on its ramp, clamped to `[0, 1]`.
pub fn ramp_position(latest: f64, extremes: ColorExtremes) -> Ramp {
    if latest >= 0.0 {
        let t = if extremes.pos_max > 0.0 {
            (latest / extremes.pos_max).min(1.0)
        } else {
            0.5
        };
        Ramp::Red(t)
    } else {
        let t = if extremes.neg_min < 0.0 {
            (latest.abs() / extremes.neg_min.abs()).min(1.0)
        } else {
            0.5
        };
        Ramp::Blue(t)
    }
}

/// Color for one latest value given the global extremes.
pub fn color_for(latest: f64, extremes: ColorExtremes) -> Rgb {
    match ramp_position(latest, extremes) {
        Ramp::Red(t) => interpolate_rgb(RED_LIGHT, RED_DARK, t),
        Ramp::Blue(t) => interpolate_rgb(BLUE_LIGHT, BLUE_DARK, t),
    }
}

/// Resolve `color` on every series from the extremes across all of them.
pub fn assign_colors(series: &mut SeriesMap) {
    let extremes = ColorExtremes::from_latest(series.values().map(|s| s.latest));
    for s in series.values_mut() {
        s.color = Some(color_for(s.latest, extremes));
    }
}

/// Per-channel linear blend: `round(start + (end - start) * t)`.
///
/// Callers clamp `t` to `[0, 1]`.
pub fn interpolate_rgb(start: Rgb, end: Rgb, t: f64) -> Rgb {
    let blend = |a: u8, b: u8| -> u8 {
        let v = (a as f64 + (b as f64 - a as f64) * t).round();
        v.clamp(0.0, 255.0) as u8
    };
    Rgb {
        r: blend(start.r, end.r),
        g: blend(start.g, end.g),
        b: blend(start.b, end.b),
    }
}

/// Inverse of [`interpolate_rgb`]: the `t` that best reproduces `color`
/// (least squares across channels). `None` when `start == end`.
pub fn gradient_fraction(color: Rgb, start: Rgb, end: Rgb) -> Option<f64> {
    let channels = [
        (start.r, end.r, color.r),
        (start.g, end.g, color.g),
        (start.b, end.b, color.b),
    ];
    let (mut num, mut den) = (0.0, 0.0);
    for (s, e, c) in channels {
        let span = e as f64 - s as f64;
        num += (c as f64 - s as f64) * span;
        den += span * span;
    }
    (den > 0.0).then(|| num / den)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::series::build_series;
    use crate::domain::RawRow;
    use chrono::NaiveDate;

    fn rows(values: &[(&str, f64, f64)]) -> Vec<RawRow> {
        let d1 = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let d2 = NaiveDate::from_ymd_opt(2020, 2, 1).unwrap();
        values
            .iter()
            .flat_map(|(name, first, last)| {
                [
                    RawRow {
                        year: 2020,
                        date: d1,
                        component: name.to_string(),
                        value: *first,
                    },
                    RawRow {
                        year: 2020,
                        date: d2,
                        component: name.to_string(),
                        value: *last,
                    },
                ]
            })
            .collect()
    }

    #[test]
    fn interpolation_endpoints() {
        assert_eq!(interpolate_rgb(RED_LIGHT, RED_DARK, 0.0), RED_LIGHT);
        assert_eq!(interpolate_rgb(RED_LIGHT, RED_DARK, 1.0), RED_DARK);
        assert_eq!(interpolate_rgb(BLUE_LIGHT, BLUE_DARK, 1.0), BLUE_DARK);
        // 0xff + (0x4d - 0xff) * 0.5 = 166
        assert_eq!(interpolate_rgb(RED_LIGHT, RED_DARK, 0.5).r, 166);
    }

    #[test]
    fn extremes_default_to_zero() {
        let e = ColorExtremes::from_latest([0.1, 0.3, 0.0]);
        assert_eq!(e, ColorExtremes { pos_max: 0.3, neg_min: 0.0 });
        let e = ColorExtremes::from_latest([-0.2, -0.05]);
        assert_eq!(e, ColorExtremes { pos_max: 0.0, neg_min: -0.2 });
        let e = ColorExtremes::from_latest(Vec::new());
        assert_eq!(e, ColorExtremes { pos_max: 0.0, neg_min: 0.0 });
    }

    #[test]
    fn ramps_follow_sign() {
        let e = ColorExtremes { pos_max: 0.4, neg_min: -0.2 };
        assert_eq!(ramp_position(0.2, e), Ramp::Red(0.5));
        assert_eq!(ramp_position(0.4, e), Ramp::Red(1.0));
        assert_eq!(ramp_position(-0.1, e), Ramp::Blue(0.5));
        assert_eq!(ramp_position(-0.2, e), Ramp::Blue(1.0));
        assert_eq!(color_for(0.4, e), RED_DARK);
        assert_eq!(color_for(-0.2, e), BLUE_DARK);
    }

    #[test]
    fn all_zero_latest_sits_mid_red() {
        let e = ColorExtremes::from_latest([0.0, 0.0]);
        assert_eq!(ramp_position(0.0, e), Ramp::Red(0.5));
        assert_eq!(color_for(0.0, e), interpolate_rgb(RED_LIGHT, RED_DARK, 0.5));
    }

    #[test]
    fn colors_do_not_depend_on_input_order() {
        let cases = [("A", 100.0, 120.0), ("B", 100.0, 90.0), ("C", 100.0, 105.0), ("D", 50.0, 40.0)];
        let mut forward = build_series(&rows(&cases));
        let mut reversed_cases = cases;
        reversed_cases.reverse();
        let mut backward = build_series(&rows(&reversed_cases));

        assign_colors(&mut forward);
        assign_colors(&mut backward);
        // Idempotent.
        let snapshot = forward.clone();
        assign_colors(&mut forward);
        assert_eq!(forward, snapshot);

        for (name, s) in &forward {
            assert_eq!(s.color, backward[name].color, "color for {name}");
        }
    }

    #[test]
    fn fraction_round_trips() {
        for i in 0..=20 {
            let t = i as f64 / 20.0;
            for (start, end) in [(RED_LIGHT, RED_DARK), (BLUE_LIGHT, BLUE_DARK)] {
                let c = interpolate_rgb(start, end, t);
                let back = gradient_fraction(c, start, end).unwrap();
                // Channel rounding limits precision to about half a step.
                assert!((back - t).abs() < 0.01, "t={t} back={back}");
            }
        }
        assert_eq!(gradient_fraction(RED_DARK, RED_DARK, RED_DARK), None);
    }
}
