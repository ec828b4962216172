//! Shapes drawn at a single point: circles, rectangles, obrounds, polygons
//! and the less common pad shapes.
//!
//! Vertices are rotated about the shape's own position by the owning
//! primitive's rotation.

use std::f64::consts::PI;

use serde::Serialize;

use super::geometry::{regular_polygon, Rotation};
use super::{BoundingBox, Point, ShapeGeometry};
use crate::error::GerberError;
use crate::settings::Units;
use crate::types::serialize_point;

pub const MIN_POLYGON_SIDES: u32 = 3;
pub const MAX_POLYGON_SIDES: u32 = 12;

/// Segments per semicircular cap when an obround is turned into vertices.
const OBROUND_CAP_SEGMENTS: usize = 16;
/// Segments per rounded corner of a round rectangle.
const ROUND_CORNER_SEGMENTS: usize = 8;

/// Optional hole through a standard aperture.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Hole {
    #[default]
    None,
    Round {
        diameter: f64,
    },
    Rectangular {
        width: f64,
        height: f64,
    },
}

impl Hole {
    /// Trailing AD modifiers: none means no hole, one is a round hole, two a
    /// rectangular one.
    pub fn from_modifiers(modifiers: &[f64]) -> Hole {
        match modifiers {
            [] => Hole::None,
            [diameter] => Hole::Round {
                diameter: *diameter,
            },
            [width, height, ..] => Hole::Rectangular {
                width: *width,
                height: *height,
            },
        }
    }

    /// Hole dimensions as AD modifiers.
    pub fn modifiers(&self) -> Vec<f64> {
        match self {
            Hole::None => Vec::new(),
            Hole::Round { diameter } => vec![*diameter],
            Hole::Rectangular { width, height } => vec![*width, *height],
        }
    }

    fn scale(&mut self, factor: f64) {
        match self {
            Hole::None => {}
            Hole::Round { diameter } => *diameter *= factor,
            Hole::Rectangular { width, height } => {
                *width *= factor;
                *height *= factor;
            }
        }
    }
}

fn rotated(points: impl IntoIterator<Item = Point>, rotation: &Rotation, about: Point) -> Vec<Point> {
    points.into_iter().map(|p| rotation.apply(p, about)).collect()
}

fn rect_corners(position: Point, width: f64, height: f64) -> [Point; 4] {
    let (hw, hh) = (width / 2.0, height / 2.0);
    let [x, y] = position;
    [
        [x - hw, y - hh],
        [x + hw, y - hh],
        [x + hw, y + hh],
        [x - hw, y + hh],
    ]
}

fn translate_point(p: &mut Point, dx: f64, dy: f64) {
    p[0] += dx;
    p[1] += dy;
}

fn scale_point(p: &mut Point, factor: f64) {
    p[0] *= factor;
    p[1] *= factor;
}

// ─── Circle ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Circle {
    #[serde(serialize_with = "serialize_point")]
    pub position: Point,
    pub diameter: f64,
    pub hole: Hole,
}

impl Circle {
    pub fn new(position: Point, diameter: f64) -> Self {
        Self {
            position,
            diameter,
            hole: Hole::None,
        }
    }

    pub fn with_hole(mut self, hole: Hole) -> Self {
        self.hole = hole;
        self
    }

    pub fn radius(&self) -> f64 {
        self.diameter / 2.0
    }
}

impl ShapeGeometry for Circle {
    fn bounds(&self, _rotation: &Rotation) -> BoundingBox {
        let r = self.radius();
        BoundingBox::around(self.position, r, r)
    }

    fn scale(&mut self, factor: f64, _target: Units) {
        scale_point(&mut self.position, factor);
        self.diameter *= factor;
        self.hole.scale(factor);
    }

    fn translate(&mut self, dx: f64, dy: f64) {
        translate_point(&mut self.position, dx, dy);
    }
}

// ─── Rectangle ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rectangle {
    #[serde(serialize_with = "serialize_point")]
    pub position: Point,
    pub width: f64,
    pub height: f64,
    pub hole: Hole,
}

impl Rectangle {
    pub fn new(position: Point, width: f64, height: f64) -> Self {
        Self {
            position,
            width,
            height,
            hole: Hole::None,
        }
    }

    pub fn with_hole(mut self, hole: Hole) -> Self {
        self.hole = hole;
        self
    }

    pub fn vertices(&self, rotation: &Rotation) -> Vec<Point> {
        rotated(
            rect_corners(self.position, self.width, self.height),
            rotation,
            self.position,
        )
    }
}

impl ShapeGeometry for Rectangle {
    fn bounds(&self, rotation: &Rotation) -> BoundingBox {
        BoundingBox::from_points(&self.vertices(rotation))
    }

    fn scale(&mut self, factor: f64, _target: Units) {
        scale_point(&mut self.position, factor);
        self.width *= factor;
        self.height *= factor;
        self.hole.scale(factor);
    }

    fn translate(&mut self, dx: f64, dy: f64) {
        translate_point(&mut self.position, dx, dy);
    }
}

// ─── Obround ─────────────────────────────────────────────────────────

/// Rectangle with semicircular caps on its shorter sides.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Obround {
    #[serde(serialize_with = "serialize_point")]
    pub position: Point,
    pub width: f64,
    pub height: f64,
    pub hole: Hole,
}

impl Obround {
    pub fn new(position: Point, width: f64, height: f64) -> Self {
        Self {
            position,
            width,
            height,
            hole: Hole::None,
        }
    }

    pub fn with_hole(mut self, hole: Hole) -> Self {
        self.hole = hole;
        self
    }

    /// Cap radius and the two (unrotated) cap centres.
    fn caps(&self) -> (f64, [Point; 2]) {
        let [x, y] = self.position;
        if self.width >= self.height {
            let r = self.height / 2.0;
            let half = self.width / 2.0 - r;
            (r, [[x - half, y], [x + half, y]])
        } else {
            let r = self.width / 2.0;
            let half = self.height / 2.0 - r;
            (r, [[x, y - half], [x, y + half]])
        }
    }

    /// Stadium outline with each cap approximated by line segments.
    pub fn vertices(&self, rotation: &Rotation) -> Vec<Point> {
        let (r, [a, b]) = self.caps();
        let mut pts = Vec::with_capacity(2 * (OBROUND_CAP_SEGMENTS + 1));
        // Cap around `b` first, then around `a`, sweeping counter-clockwise.
        let base = if self.width >= self.height { -PI / 2.0 } else { 0.0 };
        for (center, start) in [(b, base), (a, base + PI)] {
            for k in 0..=OBROUND_CAP_SEGMENTS {
                let t = start + PI * k as f64 / OBROUND_CAP_SEGMENTS as f64;
                pts.push([center[0] + r * t.cos(), center[1] + r * t.sin()]);
            }
        }
        rotated(pts, rotation, self.position)
    }
}

impl ShapeGeometry for Obround {
    fn bounds(&self, rotation: &Rotation) -> BoundingBox {
        let (r, centers) = self.caps();
        centers
            .iter()
            .map(|c| BoundingBox::around(rotation.apply(*c, self.position), r, r))
            .fold(BoundingBox::empty(), |acc, b| acc.union(&b))
    }

    fn scale(&mut self, factor: f64, _target: Units) {
        scale_point(&mut self.position, factor);
        self.width *= factor;
        self.height *= factor;
        self.hole.scale(factor);
    }

    fn translate(&mut self, dx: f64, dy: f64) {
        translate_point(&mut self.position, dx, dy);
    }
}

// ─── Polygon ─────────────────────────────────────────────────────────

/// Regular polygon inscribed in a circle of `diameter`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Polygon {
    #[serde(serialize_with = "serialize_point")]
    pub position: Point,
    pub sides: u32,
    pub diameter: f64,
    pub hole: Hole,
}

impl Polygon {
    pub fn new(position: Point, sides: u32, diameter: f64) -> Result<Self, GerberError> {
        if !(MIN_POLYGON_SIDES..=MAX_POLYGON_SIDES).contains(&sides) {
            return Err(GerberError::Range(format!(
                "polygon must have {MIN_POLYGON_SIDES} to {MAX_POLYGON_SIDES} vertices, got {sides}"
            )));
        }
        Ok(Self {
            position,
            sides,
            diameter,
            hole: Hole::None,
        })
    }

    pub fn with_hole(mut self, hole: Hole) -> Self {
        self.hole = hole;
        self
    }

    pub fn radius(&self) -> f64 {
        self.diameter / 2.0
    }

    pub fn vertices(&self, rotation: &Rotation) -> Vec<Point> {
        regular_polygon(self.position, self.sides, self.diameter, rotation.degrees())
    }
}

impl ShapeGeometry for Polygon {
    fn bounds(&self, rotation: &Rotation) -> BoundingBox {
        BoundingBox::from_points(&self.vertices(rotation))
    }

    fn scale(&mut self, factor: f64, _target: Units) {
        scale_point(&mut self.position, factor);
        self.diameter *= factor;
        self.hole.scale(factor);
    }

    fn translate(&mut self, dx: f64, dy: f64) {
        translate_point(&mut self.position, dx, dy);
    }
}

// ─── Diamond ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diamond {
    #[serde(serialize_with = "serialize_point")]
    pub position: Point,
    pub width: f64,
    pub height: f64,
}

impl Diamond {
    pub fn new(position: Point, width: f64, height: f64) -> Self {
        Self {
            position,
            width,
            height,
        }
    }

    pub fn vertices(&self, rotation: &Rotation) -> Vec<Point> {
        let [x, y] = self.position;
        let (hw, hh) = (self.width / 2.0, self.height / 2.0);
        rotated(
            [[x + hw, y], [x, y + hh], [x - hw, y], [x, y - hh]],
            rotation,
            self.position,
        )
    }
}

impl ShapeGeometry for Diamond {
    fn bounds(&self, rotation: &Rotation) -> BoundingBox {
        BoundingBox::from_points(&self.vertices(rotation))
    }

    fn scale(&mut self, factor: f64, _target: Units) {
        scale_point(&mut self.position, factor);
        self.width *= factor;
        self.height *= factor;
    }

    fn translate(&mut self, dx: f64, dy: f64) {
        translate_point(&mut self.position, dx, dy);
    }
}

// ─── Chamfered / rounded rectangles ──────────────────────────────────

/// Rectangle with some corners cut at 45°.
///
/// `corners` is ordered upper-right, upper-left, lower-left, lower-right.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChamferRectangle {
    #[serde(serialize_with = "serialize_point")]
    pub position: Point,
    pub width: f64,
    pub height: f64,
    pub chamfer: f64,
    pub corners: [bool; 4],
}

impl ChamferRectangle {
    pub fn new(position: Point, width: f64, height: f64, chamfer: f64, corners: [bool; 4]) -> Self {
        Self {
            position,
            width,
            height,
            chamfer,
            corners,
        }
    }

    pub fn vertices(&self, rotation: &Rotation) -> Vec<Point> {
        let [x, y] = self.position;
        let (hw, hh, c) = (self.width / 2.0, self.height / 2.0, self.chamfer);
        let mut pts = Vec::with_capacity(8);
        let [ur, ul, ll, lr] = self.corners;
        if ur {
            pts.extend([[x + hw, y + hh - c], [x + hw - c, y + hh]]);
        } else {
            pts.push([x + hw, y + hh]);
        }
        if ul {
            pts.extend([[x - hw + c, y + hh], [x - hw, y + hh - c]]);
        } else {
            pts.push([x - hw, y + hh]);
        }
        if ll {
            pts.extend([[x - hw, y - hh + c], [x - hw + c, y - hh]]);
        } else {
            pts.push([x - hw, y - hh]);
        }
        if lr {
            pts.extend([[x + hw - c, y - hh], [x + hw, y - hh + c]]);
        } else {
            pts.push([x + hw, y - hh]);
        }
        rotated(pts, rotation, self.position)
    }
}

impl ShapeGeometry for ChamferRectangle {
    fn bounds(&self, rotation: &Rotation) -> BoundingBox {
        BoundingBox::from_points(&self.vertices(rotation))
    }

    fn scale(&mut self, factor: f64, _target: Units) {
        scale_point(&mut self.position, factor);
        self.width *= factor;
        self.height *= factor;
        self.chamfer *= factor;
    }

    fn translate(&mut self, dx: f64, dy: f64) {
        translate_point(&mut self.position, dx, dy);
    }
}

/// Rectangle with some corners rounded by `radius`.
///
/// `corners` is ordered upper-right, upper-left, lower-left, lower-right.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoundRectangle {
    #[serde(serialize_with = "serialize_point")]
    pub position: Point,
    pub width: f64,
    pub height: f64,
    pub radius: f64,
    pub corners: [bool; 4],
}

impl RoundRectangle {
    pub fn new(position: Point, width: f64, height: f64, radius: f64, corners: [bool; 4]) -> Self {
        Self {
            position,
            width,
            height,
            radius,
            corners,
        }
    }

    /// Corner anchor (sharp corner or rounding centre), its outward
    /// direction angle and whether it is rounded.
    fn corner_anchors(&self) -> [(Point, f64, bool); 4] {
        let [x, y] = self.position;
        let (hw, hh, r) = (self.width / 2.0, self.height / 2.0, self.radius);
        let anchor = |sx: f64, sy: f64, rounded: bool| {
            if rounded {
                [x + sx * (hw - r), y + sy * (hh - r)]
            } else {
                [x + sx * hw, y + sy * hh]
            }
        };
        let [ur, ul, ll, lr] = self.corners;
        [
            (anchor(1.0, 1.0, ur), 0.0, ur),
            (anchor(-1.0, 1.0, ul), PI / 2.0, ul),
            (anchor(-1.0, -1.0, ll), PI, ll),
            (anchor(1.0, -1.0, lr), 1.5 * PI, lr),
        ]
    }

    pub fn vertices(&self, rotation: &Rotation) -> Vec<Point> {
        let mut pts = Vec::new();
        for (anchor, start, rounded) in self.corner_anchors() {
            if rounded {
                for k in 0..=ROUND_CORNER_SEGMENTS {
                    let t = start + (PI / 2.0) * k as f64 / ROUND_CORNER_SEGMENTS as f64;
                    pts.push([
                        anchor[0] + self.radius * t.cos(),
                        anchor[1] + self.radius * t.sin(),
                    ]);
                }
            } else {
                pts.push(anchor);
            }
        }
        rotated(pts, rotation, self.position)
    }
}

impl ShapeGeometry for RoundRectangle {
    fn bounds(&self, rotation: &Rotation) -> BoundingBox {
        self.corner_anchors()
            .iter()
            .map(|(anchor, _, rounded)| {
                let p = rotation.apply(*anchor, self.position);
                let r = if *rounded { self.radius } else { 0.0 };
                BoundingBox::around(p, r, r)
            })
            .fold(BoundingBox::empty(), |acc, b| acc.union(&b))
    }

    fn scale(&mut self, factor: f64, _target: Units) {
        scale_point(&mut self.position, factor);
        self.width *= factor;
        self.height *= factor;
        self.radius *= factor;
    }

    fn translate(&mut self, dx: f64, dy: f64) {
        translate_point(&mut self.position, dx, dy);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::Primitive;
    use approx::assert_abs_diff_eq;

    fn assert_bbox(bbox: BoundingBox, expected: ((f64, f64), (f64, f64))) {
        let ((min_x, max_x), (min_y, max_y)) = bbox.as_tuple();
        assert_abs_diff_eq!(min_x, expected.0 .0, epsilon = 1e-9);
        assert_abs_diff_eq!(max_x, expected.0 .1, epsilon = 1e-9);
        assert_abs_diff_eq!(min_y, expected.1 .0, epsilon = 1e-9);
        assert_abs_diff_eq!(max_y, expected.1 .1, epsilon = 1e-9);
    }

    #[test]
    fn test_hole_from_modifiers() {
        assert_eq!(Hole::from_modifiers(&[]), Hole::None);
        assert_eq!(
            Hole::from_modifiers(&[0.3]),
            Hole::Round { diameter: 0.3 }
        );
        assert_eq!(
            Hole::from_modifiers(&[0.3, 0.2]),
            Hole::Rectangular {
                width: 0.3,
                height: 0.2
            }
        );
    }

    #[test]
    fn test_circle_bbox() {
        let c = Circle::new([1.0, 1.0], 2.0);
        assert_bbox(c.bounds(&Rotation::default()), ((0.0, 2.0), (0.0, 2.0)));
    }

    #[test]
    fn test_rectangle_rotated_45() {
        let r = Rectangle::new([0.0, 0.0], 2.0, 2.0);
        let half_diag = 2f64.sqrt();
        assert_bbox(
            r.bounds(&Rotation::new(45.0)),
            ((-half_diag, half_diag), (-half_diag, half_diag)),
        );
    }

    #[test]
    fn test_obround_bbox_wide_and_rotated() {
        let o = Obround::new([0.0, 0.0], 0.6, 0.3);
        assert_bbox(o.bounds(&Rotation::default()), ((-0.3, 0.3), (-0.15, 0.15)));
        assert_bbox(o.bounds(&Rotation::new(90.0)), ((-0.15, 0.15), (-0.3, 0.3)));
        let pts = o.vertices(&Rotation::default());
        assert_eq!(pts.len(), 2 * (OBROUND_CAP_SEGMENTS + 1));
        for pt in pts {
            assert!(pt[0].abs() <= 0.3 + 1e-9, "x={} out of bounds", pt[0]);
            assert!(pt[1].abs() <= 0.15 + 1e-9, "y={} out of bounds", pt[1]);
        }
    }

    #[test]
    fn test_obround_tall() {
        let o = Obround::new([1.0, 0.0], 0.2, 0.5);
        assert_bbox(o.bounds(&Rotation::default()), ((0.9, 1.1), (-0.25, 0.25)));
    }

    #[test]
    fn test_polygon_vertex_range() {
        assert!(Polygon::new([0.0, 0.0], 3, 1.0).is_ok());
        assert!(Polygon::new([0.0, 0.0], 12, 1.0).is_ok());
        assert!(matches!(
            Polygon::new([0.0, 0.0], 2, 1.0),
            Err(GerberError::Range(_))
        ));
        assert!(matches!(
            Polygon::new([0.0, 0.0], 13, 1.0),
            Err(GerberError::Range(_))
        ));
    }

    #[test]
    fn test_polygon_bbox_square() {
        let p = Polygon::new([0.0, 0.0], 4, 2.0).unwrap();
        assert_bbox(p.bounds(&Rotation::default()), ((-1.0, 1.0), (-1.0, 1.0)));
        let s = 0.5f64.sqrt();
        assert_bbox(p.bounds(&Rotation::new(45.0)), ((-s, s), (-s, s)));
    }

    #[test]
    fn test_diamond() {
        let d = Diamond::new([0.0, 0.0], 2.0, 1.0);
        assert_bbox(d.bounds(&Rotation::default()), ((-1.0, 1.0), (-0.5, 0.5)));
        assert_eq!(d.vertices(&Rotation::default()).len(), 4);
    }

    #[test]
    fn test_chamfer_rectangle_vertices() {
        let c = ChamferRectangle::new([0.0, 0.0], 2.0, 2.0, 0.5, [true, false, true, false]);
        let pts = c.vertices(&Rotation::default());
        assert_eq!(pts.len(), 6);
        assert!(pts.contains(&[1.0, 0.5]));
        assert!(pts.contains(&[0.5, 1.0]));
        assert!(pts.contains(&[-1.0, 1.0]));
        assert_bbox(c.bounds(&Rotation::default()), ((-1.0, 1.0), (-1.0, 1.0)));
    }

    #[test]
    fn test_round_rectangle_bbox() {
        let r = RoundRectangle::new([0.0, 0.0], 4.0, 2.0, 0.5, [true; 4]);
        assert_bbox(r.bounds(&Rotation::default()), ((-2.0, 2.0), (-1.0, 1.0)));
        assert_eq!(r.vertices(&Rotation::default()).len(), 4 * (ROUND_CORNER_SEGMENTS + 1));
    }

    #[test]
    fn test_scale_includes_hole() {
        let mut p = Primitive::new(
            Circle::new([25.4, 0.0], 2.54).with_hole(Hole::Round { diameter: 1.27 }),
            Units::Metric,
        );
        p.to_inch();
        match p.shape() {
            crate::primitives::Shape::Circle(c) => match c.hole {
                Hole::Round { diameter } => assert_abs_diff_eq!(diameter, 0.05, epsilon = 1e-12),
                other => panic!("expected round hole, got: {other:?}"),
            },
            other => panic!("expected Circle, got: {other:?}"),
        }
    }
}
