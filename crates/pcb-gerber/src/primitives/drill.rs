//! Shapes produced by the drill and netlist readers, plus the less common
//! flashed pad shapes that share their simple centred geometry.

use serde::Serialize;

use super::geometry::{regular_polygon, Rotation};
use super::{BoundingBox, Point, ShapeGeometry};
use crate::settings::Units;
use crate::types::serialize_point;

/// A round drill hit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Drill {
    #[serde(serialize_with = "serialize_point")]
    pub position: Point,
    pub diameter: f64,
    /// Tool number that produced the hit, when known.
    pub tool: Option<u32>,
}

impl Drill {
    pub fn new(position: Point, diameter: f64) -> Self {
        Self {
            position,
            diameter,
            tool: None,
        }
    }

    pub fn with_tool(mut self, tool: u32) -> Self {
        self.tool = Some(tool);
        self
    }

    pub fn radius(&self) -> f64 {
        self.diameter / 2.0
    }
}

impl ShapeGeometry for Drill {
    fn bounds(&self, _rotation: &Rotation) -> BoundingBox {
        let r = self.radius();
        BoundingBox::around(self.position, r, r)
    }

    fn scale(&mut self, factor: f64, _target: Units) {
        scale_point(&mut self.position, factor);
        self.diameter *= factor;
    }

    fn translate(&mut self, dx: f64, dy: f64) {
        translate_point(&mut self.position, dx, dy);
    }
}

/// A routed slot: a drill dragged from `start` to `end`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Slot {
    #[serde(serialize_with = "serialize_point")]
    pub start: Point,
    #[serde(serialize_with = "serialize_point")]
    pub end: Point,
    pub diameter: f64,
}

impl Slot {
    pub fn new(start: Point, end: Point, diameter: f64) -> Self {
        Self {
            start,
            end,
            diameter,
        }
    }
}

impl ShapeGeometry for Slot {
    fn bounds(&self, _rotation: &Rotation) -> BoundingBox {
        let r = self.diameter / 2.0;
        BoundingBox::from_points(&[self.start, self.end]).grow(r, r)
    }

    fn scale(&mut self, factor: f64, _target: Units) {
        scale_point(&mut self.start, factor);
        scale_point(&mut self.end, factor);
        self.diameter *= factor;
    }

    fn translate(&mut self, dx: f64, dy: f64) {
        translate_point(&mut self.start, dx, dy);
        translate_point(&mut self.end, dx, dy);
    }
}

/// An IPC-D-356 test point. Occupies no area.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestRecord {
    #[serde(serialize_with = "serialize_point")]
    pub position: Point,
    pub net_name: String,
    pub layer: Option<String>,
}

impl TestRecord {
    pub fn new(position: Point, net_name: impl Into<String>) -> Self {
        Self {
            position,
            net_name: net_name.into(),
            layer: None,
        }
    }
}

impl ShapeGeometry for TestRecord {
    fn bounds(&self, _rotation: &Rotation) -> BoundingBox {
        BoundingBox::around(self.position, 0.0, 0.0)
    }

    fn scale(&mut self, factor: f64, _target: Units) {
        scale_point(&mut self.position, factor);
    }

    fn translate(&mut self, dx: f64, dy: f64) {
        translate_point(&mut self.position, dx, dy);
    }
}

/// Circle with its first and third quadrants filled.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Butterfly {
    #[serde(serialize_with = "serialize_point")]
    pub position: Point,
    pub diameter: f64,
}

impl Butterfly {
    pub fn new(position: Point, diameter: f64) -> Self {
        Self { position, diameter }
    }
}

impl ShapeGeometry for Butterfly {
    fn bounds(&self, _rotation: &Rotation) -> BoundingBox {
        let r = self.diameter / 2.0;
        BoundingBox::around(self.position, r, r)
    }

    fn scale(&mut self, factor: f64, _target: Units) {
        scale_point(&mut self.position, factor);
        self.diameter *= factor;
    }

    fn translate(&mut self, dx: f64, dy: f64) {
        translate_point(&mut self.position, dx, dy);
    }
}

/// Square with its first and third quadrants filled.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SquareButterfly {
    #[serde(serialize_with = "serialize_point")]
    pub position: Point,
    pub side: f64,
}

impl SquareButterfly {
    pub fn new(position: Point, side: f64) -> Self {
        Self { position, side }
    }
}

impl ShapeGeometry for SquareButterfly {
    fn bounds(&self, rotation: &Rotation) -> BoundingBox {
        let h = self.side / 2.0;
        let [x, y] = self.position;
        let corners = [[x - h, y - h], [x + h, y - h], [x + h, y + h], [x - h, y + h]];
        BoundingBox::from_points(&corners.map(|p| rotation.apply(p, self.position)))
    }

    fn scale(&mut self, factor: f64, _target: Units) {
        scale_point(&mut self.position, factor);
        self.side *= factor;
    }

    fn translate(&mut self, dx: f64, dy: f64) {
        translate_point(&mut self.position, dx, dy);
    }
}

/// Outer outline of a [`Donut`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DonutShape {
    Round,
    Square,
    Hexagon,
    Octagon,
}

impl DonutShape {
    fn sides(self) -> Option<u32> {
        match self {
            DonutShape::Round => None,
            DonutShape::Square => Some(4),
            DonutShape::Hexagon => Some(6),
            DonutShape::Octagon => Some(8),
        }
    }
}

/// Ring with an outer outline of `shape` and a hole of the same shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Donut {
    #[serde(serialize_with = "serialize_point")]
    pub position: Point,
    pub shape: DonutShape,
    pub inner_diameter: f64,
    pub outer_diameter: f64,
}

impl Donut {
    pub fn new(position: Point, shape: DonutShape, inner_diameter: f64, outer_diameter: f64) -> Self {
        Self {
            position,
            shape,
            inner_diameter,
            outer_diameter,
        }
    }
}

impl ShapeGeometry for Donut {
    fn bounds(&self, rotation: &Rotation) -> BoundingBox {
        let r = self.outer_diameter / 2.0;
        match self.shape.sides() {
            None => BoundingBox::around(self.position, r, r),
            // A square donut's outer_diameter is its side length.
            Some(4) => {
                let h = r;
                let [x, y] = self.position;
                let corners = [[x - h, y - h], [x + h, y - h], [x + h, y + h], [x - h, y + h]];
                BoundingBox::from_points(&corners.map(|p| rotation.apply(p, self.position)))
            }
            Some(sides) => BoundingBox::from_points(&regular_polygon(
                self.position,
                sides,
                self.outer_diameter,
                rotation.degrees(),
            )),
        }
    }

    fn scale(&mut self, factor: f64, _target: Units) {
        scale_point(&mut self.position, factor);
        self.inner_diameter *= factor;
        self.outer_diameter *= factor;
    }

    fn translate(&mut self, dx: f64, dy: f64) {
        translate_point(&mut self.position, dx, dy);
    }
}

/// Square pad with a round hole.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SquareRoundDonut {
    #[serde(serialize_with = "serialize_point")]
    pub position: Point,
    pub inner_diameter: f64,
    pub outer_diameter: f64,
}

impl SquareRoundDonut {
    pub fn new(position: Point, inner_diameter: f64, outer_diameter: f64) -> Self {
        Self {
            position,
            inner_diameter,
            outer_diameter,
        }
    }
}

impl ShapeGeometry for SquareRoundDonut {
    fn bounds(&self, rotation: &Rotation) -> BoundingBox {
        let h = self.outer_diameter / 2.0;
        let [x, y] = self.position;
        let corners = [[x - h, y - h], [x + h, y - h], [x + h, y + h], [x - h, y + h]];
        BoundingBox::from_points(&corners.map(|p| rotation.apply(p, self.position)))
    }

    fn scale(&mut self, factor: f64, _target: Units) {
        scale_point(&mut self.position, factor);
        self.inner_diameter *= factor;
        self.outer_diameter *= factor;
    }

    fn translate(&mut self, dx: f64, dy: f64) {
        translate_point(&mut self.position, dx, dy);
    }
}

fn scale_point(p: &mut Point, factor: f64) {
    p[0] *= factor;
    p[1] *= factor;
}

fn translate_point(p: &mut Point, dx: f64, dy: f64) {
    p[0] += dx;
    p[1] += dy;
}
