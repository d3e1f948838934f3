use serde::Serialize;

use crate::types::route::{MARKER_PROGRESS, MARKER_START, MARKER_STOP};

/// Ten bands from cool to hot, indexed by normalized position within a
/// field's observed range.
pub const TEN_BAND: [&str; 10] = [
    "#00e5c4", "#00e075", "#00dc29", "#1ed800", "#65d400", "#a8cf00", "#cbae00", "#c76800",
    "#c32500", "#bf001b",
];

pub const POINT_LINE_COLOR: &str = "#000000";

/// Chart series base colors, cycled per field.
const SERIES_COLORS: [(u8, u8, u8); 8] = [
    (66, 165, 245),
    (239, 108, 77),
    (102, 187, 106),
    (171, 128, 201),
    (255, 183, 77),
    (77, 182, 172),
    (240, 98, 146),
    (144, 164, 174),
];

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bounds {
    pub min: f64,
    pub max: f64,
    pub range: f64,
}

impl Bounds {
    pub fn from_values(values: impl IntoIterator<Item = f64>) -> Option<Self> {
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for value in values.into_iter().filter(|v| v.is_finite()) {
            min = min.min(value);
            max = max.max(value);
        }
        if !min.is_finite() || !max.is_finite() {
            return None;
        }
        Some(Self {
            min,
            max,
            range: max - min,
        })
    }

    /// Position of `value` inside the range, or `None` for a flat range.
    pub fn normalize(&self, value: f64) -> Option<f64> {
        if self.range <= 0.0 {
            return None;
        }
        Some((value - self.min) / self.range)
    }
}

pub fn band_index(value: f64, bounds: &Bounds) -> usize {
    let last = TEN_BAND.len() - 1;
    match bounds.normalize(value) {
        // A flat range never passes any threshold, so every value is hottest.
        None => last,
        Some(position) if position.is_nan() => last,
        Some(position) => ((position * TEN_BAND.len() as f64).floor().max(0.0) as usize).min(last),
    }
}

pub fn band_color(value: f64, bounds: &Bounds) -> &'static str {
    TEN_BAND[band_index(value, bounds)]
}

pub fn marker_color(id: &str) -> Option<&'static str> {
    match id {
        MARKER_START => Some("green"),
        MARKER_STOP => Some("red"),
        MARKER_PROGRESS => Some("blue"),
        _ => None,
    }
}

pub fn series_color(index: usize) -> String {
    let (r, g, b) = SERIES_COLORS[index % SERIES_COLORS.len()];
    format!("rgb({},{},{})", r, g, b)
}

/// Moves an `rgb(r,g,b)` color toward white (`percent > 0`) or black
/// (`percent < 0`) and returns it as half-transparent `rgba`.
pub fn shade_rgb(color: &str, percent: f64) -> Option<String> {
    let (r, g, b) = parse_rgb(color)?;
    let target = if percent < 0.0 { 0.0 } else { 255.0 };
    let p = percent.abs().min(1.0);
    let shade = |c: u8| ((target - c as f64) * p).round() as i32 + c as i32;
    Some(format!(
        "rgba({},{},{}, 0.5)",
        shade(r),
        shade(g),
        shade(b)
    ))
}

fn parse_rgb(color: &str) -> Option<(u8, u8, u8)> {
    let inner = color.trim().strip_prefix("rgb(")?.strip_suffix(')')?;
    let mut parts = inner.split(',').map(|p| p.trim().parse::<u8>());
    let r = parts.next()?.ok()?;
    let g = parts.next()?.ok()?;
    let b = parts.next()?.ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some((r, g, b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bands_cover_range_ends() {
        let bounds = Bounds::from_values([10.0, 20.0]).expect("bounds");
        assert_eq!(band_color(10.0, &bounds), "#00e5c4");
        assert_eq!(band_color(14.99, &bounds), "#65d400");
        assert_eq!(band_color(15.0, &bounds), "#a8cf00");
        assert_eq!(band_color(20.0, &bounds), "#bf001b");
        assert_eq!(band_index(5.0, &bounds), 0);
        assert_eq!(band_index(25.0, &bounds), 9);
    }

    #[test]
    fn band_index_is_monotonic() {
        let bounds = Bounds::from_values([-3.0, 117.0]).expect("bounds");
        let mut previous = 0;
        let mut value = -10.0;
        while value < 130.0 {
            let band = band_index(value, &bounds);
            assert!(band >= previous, "value {} went cooler", value);
            previous = band;
            value += 0.37;
        }
    }

    #[test]
    fn flat_range_maps_to_hottest_band() {
        let bounds = Bounds::from_values([4.0, 4.0]).expect("bounds");
        assert_eq!(band_color(4.0, &bounds), "#bf001b");
    }

    #[test]
    fn bounds_ignore_non_finite_values() {
        assert!(Bounds::from_values([f64::NAN]).is_none());
        let bounds = Bounds::from_values([1.0, f64::NAN, 3.0]).expect("bounds");
        assert_eq!(bounds.range, 2.0);
    }

    #[test]
    fn shading_lightens_toward_white() {
        assert_eq!(
            shade_rgb("rgb(100,0,255)", 0.5).as_deref(),
            Some("rgba(178,128,255, 0.5)")
        );
        assert_eq!(
            shade_rgb("rgb(100,0,255)", -0.5).as_deref(),
            Some("rgba(50,0,127, 0.5)")
        );
        assert!(shade_rgb("#ffffff", 0.5).is_none());
    }

    #[test]
    fn markers_have_fixed_colors() {
        assert_eq!(marker_color("start"), Some("green"));
        assert_eq!(marker_color("stop"), Some("red"));
        assert_eq!(marker_color("progress"), Some("blue"));
        assert_eq!(marker_color("lap"), None);
    }
}
