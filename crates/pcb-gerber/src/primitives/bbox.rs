use serde::Serialize;

use super::Point;
use crate::types::serialize_f64_rounded;

/// Axis-aligned bounding box.
///
/// The empty box has inverted infinite bounds so that expanding it by any
/// point yields a box containing exactly that point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoundingBox {
    #[serde(serialize_with = "serialize_f64_rounded")]
    pub min_x: f64,
    #[serde(serialize_with = "serialize_f64_rounded")]
    pub max_x: f64,
    #[serde(serialize_with = "serialize_f64_rounded")]
    pub min_y: f64,
    #[serde(serialize_with = "serialize_f64_rounded")]
    pub max_y: f64,
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::empty()
    }
}

impl BoundingBox {
    pub fn new(min_x: f64, max_x: f64, min_y: f64, max_y: f64) -> Self {
        Self {
            min_x,
            max_x,
            min_y,
            max_y,
        }
    }

    pub fn empty() -> Self {
        Self {
            min_x: f64::INFINITY,
            max_x: f64::NEG_INFINITY,
            min_y: f64::INFINITY,
            max_y: f64::NEG_INFINITY,
        }
    }

    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Point>) -> Self {
        let mut bbox = Self::empty();
        for p in points {
            bbox.expand_point(p[0], p[1]);
        }
        bbox
    }

    /// Box of a point grown by `rx`/`ry` in each direction.
    pub fn around(center: Point, rx: f64, ry: f64) -> Self {
        Self::new(center[0] - rx, center[0] + rx, center[1] - ry, center[1] + ry)
    }

    /// Note that a zero-size box at a point is NOT empty; only a box that
    /// never saw a point is.
    pub fn is_empty(&self) -> bool {
        self.min_x > self.max_x || self.min_y > self.max_y
    }

    pub fn expand_point(&mut self, x: f64, y: f64) {
        self.min_x = self.min_x.min(x);
        self.max_x = self.max_x.max(x);
        self.min_y = self.min_y.min(y);
        self.max_y = self.max_y.max(y);
    }

    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        if other.is_empty() {
            return *self;
        }
        if self.is_empty() {
            return *other;
        }
        BoundingBox::new(
            self.min_x.min(other.min_x),
            self.max_x.max(other.max_x),
            self.min_y.min(other.min_y),
            self.max_y.max(other.max_y),
        )
    }

    /// Grow the box by `dx` on both x sides and `dy` on both y sides.
    pub fn grow(&self, dx: f64, dy: f64) -> BoundingBox {
        if self.is_empty() {
            return *self;
        }
        BoundingBox::new(
            self.min_x - dx,
            self.max_x + dx,
            self.min_y - dy,
            self.max_y + dy,
        )
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn center(&self) -> Point {
        [
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        ]
    }

    /// The four corners, counter-clockwise from the lower left.
    pub fn corners(&self) -> [Point; 4] {
        [
            [self.min_x, self.min_y],
            [self.max_x, self.min_y],
            [self.max_x, self.max_y],
            [self.min_x, self.max_y],
        ]
    }

    /// `((min_x, max_x), (min_y, max_y))`
    pub fn as_tuple(&self) -> ((f64, f64), (f64, f64)) {
        ((self.min_x, self.max_x), (self.min_y, self.max_y))
    }
}
