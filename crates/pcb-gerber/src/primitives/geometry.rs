use std::f64::consts::TAU;

use serde::{Serialize, Serializer};

use super::Point;
use crate::types::round_f64;

/// Tolerance used when comparing coordinates for equality.
pub const POINT_EPSILON: f64 = 1e-9;

/// A rotation angle in degrees with its sine and cosine cached.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rotation {
    degrees: f64,
    sin: f64,
    cos: f64,
}

impl Default for Rotation {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl Rotation {
    pub fn new(degrees: f64) -> Self {
        let (sin, cos) = degrees.to_radians().sin_cos();
        Self { degrees, sin, cos }
    }

    pub fn degrees(&self) -> f64 {
        self.degrees
    }

    pub fn is_zero(&self) -> bool {
        self.degrees.rem_euclid(360.0).abs() < 1e-12
    }

    /// Rotate `p` counter-clockwise about `about`.
    pub fn apply(&self, p: Point, about: Point) -> Point {
        if self.is_zero() {
            return p;
        }
        let x = p[0] - about[0];
        let y = p[1] - about[1];
        [
            about[0] + x * self.cos - y * self.sin,
            about[1] + x * self.sin + y * self.cos,
        ]
    }
}

impl Serialize for Rotation {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(round_f64(self.degrees, 6))
    }
}

/// Rotate a point about the origin by the given angle in degrees.
pub fn rotate_point(p: Point, angle_deg: f64) -> Point {
    Rotation::new(angle_deg).apply(p, [0.0, 0.0])
}

pub fn distance(a: Point, b: Point) -> f64 {
    let dx = a[0] - b[0];
    let dy = a[1] - b[1];
    dx.hypot(dy)
}

pub fn points_equal(a: Point, b: Point) -> bool {
    (a[0] - b[0]).abs() <= POINT_EPSILON && (a[1] - b[1]).abs() <= POINT_EPSILON
}

/// Normalize an angle in radians to `[0, 2π)`.
pub fn normalize_angle(theta: f64) -> f64 {
    theta.rem_euclid(TAU)
}

/// Convex hull (Andrew's monotone chain), counter-clockwise, without the
/// closing point. Collinear points on the hull boundary are dropped.
pub fn convex_hull(points: &[Point]) -> Vec<Point> {
    let mut pts: Vec<Point> = points.to_vec();
    pts.sort_by(|a, b| a[0].total_cmp(&b[0]).then(a[1].total_cmp(&b[1])));
    pts.dedup_by(|a, b| points_equal(*a, *b));
    if pts.len() < 3 {
        return pts;
    }

    fn cross(o: Point, a: Point, b: Point) -> f64 {
        (a[0] - o[0]) * (b[1] - o[1]) - (a[1] - o[1]) * (b[0] - o[0])
    }

    let mut lower: Vec<Point> = Vec::with_capacity(pts.len());
    for &p in &pts {
        while lower.len() >= 2 && cross(lower[lower.len() - 2], lower[lower.len() - 1], p) <= 0.0 {
            lower.pop();
        }
        lower.push(p);
    }
    let mut upper: Vec<Point> = Vec::with_capacity(pts.len());
    for &p in pts.iter().rev() {
        while upper.len() >= 2 && cross(upper[upper.len() - 2], upper[upper.len() - 1], p) <= 0.0 {
            upper.pop();
        }
        upper.push(p);
    }
    lower.pop();
    upper.pop();
    lower.extend(upper);
    lower
}

/// Vertices of a regular polygon inscribed in a circle of `diameter`,
/// the first vertex at `rotation` degrees.
pub fn regular_polygon(center: Point, sides: u32, diameter: f64, rotation: f64) -> Vec<Point> {
    let r = diameter / 2.0;
    (0..sides)
        .map(|k| {
            let angle = (rotation + 360.0 * k as f64 / sides as f64).to_radians();
            [center[0] + r * angle.cos(), center[1] + r * angle.sin()]
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_rotate_point_zero() {
        let p = rotate_point([1.0, 0.0], 0.0);
        assert_eq!(p, [1.0, 0.0]);
    }

    #[test]
    fn test_rotate_point_90() {
        let p = rotate_point([1.0, 0.0], 90.0);
        assert_abs_diff_eq!(p[0], 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(p[1], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_rotation_about_point() {
        let rot = Rotation::new(180.0);
        let p = rot.apply([2.0, 1.0], [1.0, 1.0]);
        assert_abs_diff_eq!(p[0], 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(p[1], 1.0, epsilon = 1e-12);
        assert!(Rotation::new(360.0).is_zero());
    }

    #[test]
    fn test_convex_hull_square_with_interior() {
        let hull = convex_hull(&[
            [0.0, 0.0],
            [1.0, 0.0],
            [0.5, 0.5],
            [1.0, 1.0],
            [0.0, 1.0],
            [0.0, 0.0],
        ]);
        assert_eq!(hull, vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]]);
    }

    #[test]
    fn test_regular_polygon() {
        let pts = regular_polygon([1.0, 1.0], 4, 2.0, 0.0);
        assert_eq!(pts.len(), 4);
        assert_abs_diff_eq!(pts[0][0], 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(pts[1][1], 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_normalize_angle() {
        assert_abs_diff_eq!(
            normalize_angle(-std::f64::consts::FRAC_PI_2),
            1.5 * std::f64::consts::PI,
            epsilon = 1e-12
        );
        assert_abs_diff_eq!(normalize_angle(TAU), 0.0);
    }
}
