//! Strokes: apertures dragged along a straight line or a circular arc.

use std::f64::consts::{FRAC_PI_2, PI, TAU};

use serde::Serialize;

use super::geometry::{convex_hull, distance, normalize_angle, points_equal, Rotation};
use super::{BoundingBox, Point, Primitive, Shape, ShapeGeometry};
use crate::settings::Units;
use crate::types::serialize_point;

/// Angular tolerance when testing whether a cardinal angle lies on an arc.
const ANGLE_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Clockwise,
    CounterClockwise,
}

/// G74 / G75.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QuadrantMode {
    Single,
    #[default]
    Multi,
}

/// How far an aperture reaches from its own position.
enum Reach {
    Round(f64),
    Points(Vec<Point>),
}

fn aperture_reach(aperture: &Primitive) -> Reach {
    if let Shape::Circle(c) = aperture.shape() {
        return Reach::Round(c.radius());
    }
    let bbox = aperture.bounding_box();
    if bbox.is_empty() {
        return Reach::Points(Vec::new());
    }
    let origin = aperture.position().unwrap_or_else(|| bbox.center());
    let points = aperture
        .vertices()
        .unwrap_or_else(|| bbox.corners().to_vec());
    Reach::Points(
        points
            .into_iter()
            .map(|p| [p[0] - origin[0], p[1] - origin[1]])
            .collect(),
    )
}

fn scale_point(p: &mut Point, factor: f64) {
    p[0] *= factor;
    p[1] *= factor;
}

fn translate_point(p: &mut Point, dx: f64, dy: f64) {
    p[0] += dx;
    p[1] += dy;
}

// ─── Line ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct Line {
    #[serde(serialize_with = "serialize_point")]
    pub start: Point,
    #[serde(serialize_with = "serialize_point")]
    pub end: Point,
    pub aperture: Box<Primitive>,
}

impl Line {
    pub fn new(start: Point, end: Point, aperture: Primitive) -> Self {
        Self {
            start,
            end,
            aperture: Box::new(aperture),
        }
    }

    /// Direction of travel in radians.
    pub fn angle(&self) -> f64 {
        (self.end[1] - self.start[1]).atan2(self.end[0] - self.start[0])
    }

    pub fn length(&self) -> f64 {
        distance(self.start, self.end)
    }

    /// Bounds of the centre line alone.
    pub fn path_bounds(&self) -> BoundingBox {
        BoundingBox::from_points(&[self.start, self.end])
    }

    fn swept_points(&self, offsets: &[Point]) -> Vec<Point> {
        [self.start, self.end]
            .iter()
            .flat_map(|s| offsets.iter().map(move |o| [s[0] + o[0], s[1] + o[1]]))
            .collect()
    }

    /// Convex hull of the aperture swept from start to end. `None` for round
    /// apertures, whose sweep has no polygonal outline.
    pub fn vertices(&self) -> Option<Vec<Point>> {
        match aperture_reach(&self.aperture) {
            Reach::Round(_) => None,
            Reach::Points(offsets) if offsets.is_empty() => None,
            Reach::Points(offsets) => Some(convex_hull(&self.swept_points(&offsets))),
        }
    }
}

impl ShapeGeometry for Line {
    fn bounds(&self, _rotation: &Rotation) -> BoundingBox {
        let path = self.path_bounds();
        match aperture_reach(&self.aperture) {
            Reach::Round(r) => path.grow(r, r),
            Reach::Points(offsets) => {
                path.union(&BoundingBox::from_points(&self.swept_points(&offsets)))
            }
        }
    }

    fn scale(&mut self, factor: f64, target: Units) {
        scale_point(&mut self.start, factor);
        scale_point(&mut self.end, factor);
        self.aperture.convert_units(target);
    }

    fn translate(&mut self, dx: f64, dy: f64) {
        translate_point(&mut self.start, dx, dy);
        translate_point(&mut self.end, dx, dy);
    }
}

// ─── Arc ─────────────────────────────────────────────────────────────

/// Circular arc about `center`. The radius is taken from the start point.
#[derive(Debug, Clone, Serialize)]
pub struct Arc {
    #[serde(serialize_with = "serialize_point")]
    pub start: Point,
    #[serde(serialize_with = "serialize_point")]
    pub end: Point,
    #[serde(serialize_with = "serialize_point")]
    pub center: Point,
    pub direction: Direction,
    pub aperture: Box<Primitive>,
    pub quadrant_mode: QuadrantMode,
}

impl Arc {
    pub fn new(
        start: Point,
        end: Point,
        center: Point,
        direction: Direction,
        aperture: Primitive,
        quadrant_mode: QuadrantMode,
    ) -> Self {
        Self {
            start,
            end,
            center,
            direction,
            aperture: Box::new(aperture),
            quadrant_mode,
        }
    }

    pub fn radius(&self) -> f64 {
        distance(self.center, self.start)
    }

    fn angle_of(&self, p: Point) -> f64 {
        normalize_angle((p[1] - self.center[1]).atan2(p[0] - self.center[0]))
    }

    /// Angle of the start point about the centre, in `[0, 2π)`.
    pub fn start_angle(&self) -> f64 {
        self.angle_of(self.start)
    }

    pub fn end_angle(&self) -> f64 {
        self.angle_of(self.end)
    }

    /// Angle travelled from start to end in the arc's direction, in radians.
    /// A closed multi-quadrant arc sweeps the full circle.
    pub fn sweep_angle(&self) -> f64 {
        let (a0, a1) = (self.start_angle(), self.end_angle());
        let sweep = match self.direction {
            Direction::CounterClockwise => normalize_angle(a1 - a0),
            Direction::Clockwise => normalize_angle(a0 - a1),
        };
        if self.is_full_circle() {
            TAU
        } else {
            sweep
        }
    }

    fn is_full_circle(&self) -> bool {
        self.quadrant_mode == QuadrantMode::Multi && points_equal(self.start, self.end)
    }

    fn contains_angle(&self, angle: f64, sweep: f64) -> bool {
        let a0 = self.start_angle();
        let travelled = match self.direction {
            Direction::CounterClockwise => normalize_angle(angle - a0),
            Direction::Clockwise => normalize_angle(a0 - angle),
        };
        travelled <= sweep + ANGLE_EPSILON || TAU - travelled <= ANGLE_EPSILON
    }

    /// Bounds of the centre line alone.
    pub fn path_bounds(&self) -> BoundingBox {
        let mut bbox = BoundingBox::from_points(&[self.start, self.end]);
        if self.quadrant_mode == QuadrantMode::Multi {
            let r = self.radius();
            let sweep = self.sweep_angle();
            for angle in [0.0, FRAC_PI_2, PI, 3.0 * FRAC_PI_2] {
                if self.contains_angle(angle, sweep) {
                    bbox.expand_point(
                        self.center[0] + r * angle.cos(),
                        self.center[1] + r * angle.sin(),
                    );
                }
            }
        }
        bbox
    }
}

impl ShapeGeometry for Arc {
    fn bounds(&self, _rotation: &Rotation) -> BoundingBox {
        let path = self.path_bounds();
        match aperture_reach(&self.aperture) {
            Reach::Round(r) => path.grow(r, r),
            Reach::Points(offsets) => {
                let reach = BoundingBox::from_points(&offsets);
                if reach.is_empty() {
                    path
                } else {
                    BoundingBox::new(
                        path.min_x + reach.min_x,
                        path.max_x + reach.max_x,
                        path.min_y + reach.min_y,
                        path.max_y + reach.max_y,
                    )
                }
            }
        }
    }

    fn scale(&mut self, factor: f64, target: Units) {
        scale_point(&mut self.start, factor);
        scale_point(&mut self.end, factor);
        scale_point(&mut self.center, factor);
        self.aperture.convert_units(target);
    }

    fn translate(&mut self, dx: f64, dy: f64) {
        translate_point(&mut self.start, dx, dy);
        translate_point(&mut self.end, dx, dy);
        translate_point(&mut self.center, dx, dy);
    }
}
