use serde::Serialize;

use super::geometry::Rotation;
use super::{BoundingBox, Point, Primitive, ShapeGeometry};
use crate::settings::Units;
use crate::types::serialize_point;

/// The primitives one aperture-macro instance expands to, in drawing order.
///
/// The group's position is the macro origin; moving the group moves every
/// child by the same delta.
#[derive(Debug, Clone, Serialize)]
pub struct AmGroup {
    pub primitives: Vec<Primitive>,
    #[serde(serialize_with = "serialize_point")]
    position: Point,
}

impl AmGroup {
    pub fn new(primitives: Vec<Primitive>) -> Self {
        Self {
            primitives,
            position: [0.0, 0.0],
        }
    }

    pub fn position(&self) -> Point {
        self.position
    }
}

impl ShapeGeometry for AmGroup {
    fn bounds(&self, rotation: &Rotation) -> BoundingBox {
        if rotation.is_zero() {
            return self
                .primitives
                .iter()
                .map(Primitive::bounding_box)
                .fold(BoundingBox::empty(), |acc, b| acc.union(&b));
        }
        let mut bbox = BoundingBox::empty();
        for child in &self.primitives {
            let child_box = child.bounding_box();
            if child_box.is_empty() {
                continue;
            }
            let outline = child
                .vertices()
                .unwrap_or_else(|| child_box.corners().to_vec());
            for p in outline {
                let [x, y] = rotation.apply(p, self.position);
                bbox.expand_point(x, y);
            }
        }
        bbox
    }

    fn scale(&mut self, factor: f64, target: Units) {
        self.position[0] *= factor;
        self.position[1] *= factor;
        for child in &mut self.primitives {
            child.convert_units(target);
        }
    }

    fn translate(&mut self, dx: f64, dy: f64) {
        self.position[0] += dx;
        self.position[1] += dy;
        for child in &mut self.primitives {
            child.offset(dx, dy);
        }
    }
}
