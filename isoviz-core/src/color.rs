//! Color transfer functions

use serde::{Deserialize, Serialize};

/// A control point of a color ramp, RGB in `[0, 1]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColorPoint {
    pub value: f32,
    pub rgb: [f32; 3],
}

impl ColorPoint {
    pub fn new(value: f32, rgb: [f32; 3]) -> Self {
        Self { value, rgb }
    }
}

pub const BLACK: [f32; 3] = [0.0, 0.0, 0.0];
pub const RED: [f32; 3] = [1.0, 0.0, 0.0];
pub const YELLOW: [f32; 3] = [1.0, 1.0, 0.0];
pub const GREEN: [f32; 3] = [0.0, 1.0, 0.0];
pub const CYAN: [f32; 3] = [0.0, 1.0, 1.0];
pub const BLUE: [f32; 3] = [0.0, 0.0, 1.0];

/// Piecewise-linear map from scalar value to RGB.
///
/// Control points are kept sorted by value. Values below the first point or
/// above the last map to the end colors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColorTransferFunction {
    points: Vec<ColorPoint>,
}

impl ColorTransferFunction {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a ramp from arbitrary control points
    pub fn from_points<I>(points: I) -> Self
    where
        I: IntoIterator<Item = ColorPoint>,
    {
        let mut ctf = Self::new();
        for p in points {
            ctf.add_rgb_point(p.value, p.rgb);
        }
        ctf
    }

    /// Black, red, yellow, green, cyan, blue at six evenly spaced values
    pub fn default_ramp(min: f32, max: f32) -> Self {
        let step = (max - min) / 5.0;
        let mut ctf = Self::new();
        for (k, rgb) in [BLACK, RED, YELLOW, GREEN, CYAN].into_iter().enumerate() {
            ctf.add_rgb_point(min + k as f32 * step, rgb);
        }
        ctf.add_rgb_point(max, BLUE);
        ctf
    }

    /// Five-color ramp over an integer isovalue range.
    ///
    /// Intermediate stops use floor division, so narrow ranges may collapse
    /// several stops onto one value (the later color wins).
    pub fn isovalue_ramp(min: i64, max: i64) -> Self {
        let mid = (min + max).div_euclid(2);
        let mut ctf = Self::new();
        ctf.add_rgb_point(min as f32, RED);
        ctf.add_rgb_point((min + mid).div_euclid(2) as f32, YELLOW);
        ctf.add_rgb_point(mid as f32, GREEN);
        ctf.add_rgb_point((mid + max).div_euclid(2) as f32, CYAN);
        ctf.add_rgb_point(max as f32, BLUE);
        ctf
    }

    /// A single color over `[min, max]`
    pub fn constant(min: f32, max: f32, rgb: [f32; 3]) -> Self {
        let mut ctf = Self::new();
        ctf.add_rgb_point(min, rgb);
        ctf.add_rgb_point(max, rgb);
        ctf
    }

    /// Insert a control point; an existing point at the same value is replaced
    pub fn add_rgb_point(&mut self, value: f32, rgb: [f32; 3]) {
        match self
            .points
            .binary_search_by(|p| p.value.total_cmp(&value))
        {
            Ok(i) => self.points[i].rgb = rgb,
            Err(i) => self.points.insert(i, ColorPoint::new(value, rgb)),
        }
    }

    pub fn points(&self) -> &[ColorPoint] {
        &self.points
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Value span of the control points
    pub fn range(&self) -> Option<(f32, f32)> {
        Some((self.points.first()?.value, self.points.last()?.value))
    }

    /// Color for `value`; black when the function has no points
    pub fn map(&self, value: f32) -> [f32; 3] {
        let (first, last) = match (self.points.first(), self.points.last()) {
            (Some(f), Some(l)) => (f, l),
            _ => return BLACK,
        };
        if value.is_nan() || value <= first.value {
            return first.rgb;
        }
        if value >= last.value {
            return last.rgb;
        }

        let upper = self.points.partition_point(|p| p.value <= value);
        let a = &self.points[upper - 1];
        let b = &self.points[upper];
        let t = (value - a.value) / (b.value - a.value);
        [
            a.rgb[0] + t * (b.rgb[0] - a.rgb[0]),
            a.rgb[1] + t * (b.rgb[1] - a.rgb[1]),
            a.rgb[2] + t * (b.rgb[2] - a.rgb[2]),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_map_interpolates_and_clamps() {
        let ctf = ColorTransferFunction::from_points([
            ColorPoint::new(10.0, BLUE),
            ColorPoint::new(0.0, RED),
        ]);
        assert_eq!(ctf.range(), Some((0.0, 10.0)));
        assert_eq!(ctf.map(-5.0), RED);
        assert_eq!(ctf.map(50.0), BLUE);

        let mid = ctf.map(2.5);
        assert_relative_eq!(mid[0], 0.75);
        assert_relative_eq!(mid[2], 0.25);
    }

    #[test]
    fn test_same_value_replaces() {
        let mut ctf = ColorTransferFunction::new();
        ctf.add_rgb_point(1.0, RED);
        ctf.add_rgb_point(1.0, GREEN);
        assert_eq!(ctf.points().len(), 1);
        assert_eq!(ctf.map(1.0), GREEN);
    }

    #[test]
    fn test_default_ramp_stops() {
        let ctf = ColorTransferFunction::default_ramp(0.0, 100.0);
        let values: Vec<f32> = ctf.points().iter().map(|p| p.value).collect();
        assert_eq!(values, vec![0.0, 20.0, 40.0, 60.0, 80.0, 100.0]);
        assert_eq!(ctf.map(40.0), YELLOW);
        assert_eq!(ctf.map(100.0), BLUE);
    }

    #[test]
    fn test_isovalue_ramp_uses_floor_division() {
        let ctf = ColorTransferFunction::isovalue_ramp(0, 255);
        let values: Vec<f32> = ctf.points().iter().map(|p| p.value).collect();
        assert_eq!(values, vec![0.0, 63.0, 127.0, 191.0, 255.0]);
        assert_eq!(ctf.map(127.0), GREEN);

        let negative = ColorTransferFunction::isovalue_ramp(-5, 0);
        assert_eq!(negative.points()[2].value, -3.0);
    }

    #[test]
    fn test_constant_and_empty() {
        let ctf = ColorTransferFunction::constant(2.0, 8.0, [0.5, 0.25, 1.0]);
        assert_eq!(ctf.map(5.0), [0.5, 0.25, 1.0]);
        assert_eq!(ColorTransferFunction::new().map(1.0), BLACK);
    }
}
