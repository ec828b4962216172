//! Geometry primitives produced by the Gerber interpreter and by sibling
//! format readers.
//!
//! A [`Primitive`] carries the attributes every shape shares (level
//! polarity, rotation, units and a memoised bounding box) around a closed
//! [`Shape`] enum. All geometry mutation goes through methods on
//! `Primitive`, which drop the memoised bounding box.

pub mod bbox;
pub mod contour;
pub mod drill;
pub mod flashed;
pub mod geometry;
pub mod group;
pub mod stroked;

use std::cell::OnceCell;

use serde::Serialize;

use crate::settings::Units;

pub use bbox::BoundingBox;
pub use contour::{Outline, Region, Segment};
pub use drill::{Butterfly, Donut, DonutShape, Drill, Slot, SquareButterfly, SquareRoundDonut, TestRecord};
pub use flashed::{ChamferRectangle, Circle, Diamond, Hole, Obround, Polygon, Rectangle, RoundRectangle};
pub use geometry::Rotation;
pub use group::AmGroup;
pub use stroked::{Arc, Direction, Line, QuadrantMode};

pub type Point = [f64; 2];

/// Whether a primitive adds ("dark") or removes ("clear") image coverage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Polarity {
    #[default]
    Dark,
    Clear,
}

/// Geometry contract shared by every shape.
pub(crate) trait ShapeGeometry {
    /// Bounds of the shape under the owning primitive's rotation.
    fn bounds(&self, rotation: &Rotation) -> BoundingBox;

    /// Multiply every length by `factor`. Nested primitives convert to `target`.
    fn scale(&mut self, factor: f64, target: Units);

    fn translate(&mut self, dx: f64, dy: f64);
}

/// A macro primitive code the builders do not understand. Carries no geometry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Unsupported {
    pub code: u32,
    pub modifiers: Vec<f64>,
}

impl ShapeGeometry for Unsupported {
    fn bounds(&self, _rotation: &Rotation) -> BoundingBox {
        BoundingBox::empty()
    }

    fn scale(&mut self, _factor: f64, _target: Units) {}

    fn translate(&mut self, _dx: f64, _dy: f64) {}
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Shape {
    Line(Line),
    Arc(Arc),
    Circle(Circle),
    Rectangle(Rectangle),
    Obround(Obround),
    Diamond(Diamond),
    ChamferRectangle(ChamferRectangle),
    RoundRectangle(RoundRectangle),
    Polygon(Polygon),
    Outline(Outline),
    Region(Region),
    AmGroup(AmGroup),
    Drill(Drill),
    Slot(Slot),
    TestRecord(TestRecord),
    Butterfly(Butterfly),
    SquareButterfly(SquareButterfly),
    Donut(Donut),
    SquareRoundDonut(SquareRoundDonut),
    Unsupported(Unsupported),
}

macro_rules! shape_from {
    ($($variant:ident),* $(,)?) => {
        $(
            impl From<$variant> for Shape {
                fn from(s: $variant) -> Self {
                    Shape::$variant(s)
                }
            }
        )*
    };
}

shape_from!(
    Line,
    Arc,
    Circle,
    Rectangle,
    Obround,
    Diamond,
    ChamferRectangle,
    RoundRectangle,
    Polygon,
    Outline,
    Region,
    AmGroup,
    Drill,
    Slot,
    TestRecord,
    Butterfly,
    SquareButterfly,
    Donut,
    SquareRoundDonut,
    Unsupported,
);

impl Shape {
    fn geometry(&self) -> &dyn ShapeGeometry {
        match self {
            Shape::Line(s) => s,
            Shape::Arc(s) => s,
            Shape::Circle(s) => s,
            Shape::Rectangle(s) => s,
            Shape::Obround(s) => s,
            Shape::Diamond(s) => s,
            Shape::ChamferRectangle(s) => s,
            Shape::RoundRectangle(s) => s,
            Shape::Polygon(s) => s,
            Shape::Outline(s) => s,
            Shape::Region(s) => s,
            Shape::AmGroup(s) => s,
            Shape::Drill(s) => s,
            Shape::Slot(s) => s,
            Shape::TestRecord(s) => s,
            Shape::Butterfly(s) => s,
            Shape::SquareButterfly(s) => s,
            Shape::Donut(s) => s,
            Shape::SquareRoundDonut(s) => s,
            Shape::Unsupported(s) => s,
        }
    }

    fn geometry_mut(&mut self) -> &mut dyn ShapeGeometry {
        match self {
            Shape::Line(s) => s,
            Shape::Arc(s) => s,
            Shape::Circle(s) => s,
            Shape::Rectangle(s) => s,
            Shape::Obround(s) => s,
            Shape::Diamond(s) => s,
            Shape::ChamferRectangle(s) => s,
            Shape::RoundRectangle(s) => s,
            Shape::Polygon(s) => s,
            Shape::Outline(s) => s,
            Shape::Region(s) => s,
            Shape::AmGroup(s) => s,
            Shape::Drill(s) => s,
            Shape::Slot(s) => s,
            Shape::TestRecord(s) => s,
            Shape::Butterfly(s) => s,
            Shape::SquareButterfly(s) => s,
            Shape::Donut(s) => s,
            Shape::SquareRoundDonut(s) => s,
            Shape::Unsupported(s) => s,
        }
    }

    /// The single position of a flashed shape.
    pub fn position(&self) -> Option<Point> {
        match self {
            Shape::Circle(s) => Some(s.position),
            Shape::Rectangle(s) => Some(s.position),
            Shape::Obround(s) => Some(s.position),
            Shape::Diamond(s) => Some(s.position),
            Shape::ChamferRectangle(s) => Some(s.position),
            Shape::RoundRectangle(s) => Some(s.position),
            Shape::Polygon(s) => Some(s.position),
            Shape::AmGroup(s) => Some(s.position()),
            Shape::Drill(s) => Some(s.position),
            Shape::TestRecord(s) => Some(s.position),
            Shape::Butterfly(s) => Some(s.position),
            Shape::SquareButterfly(s) => Some(s.position),
            Shape::Donut(s) => Some(s.position),
            Shape::SquareRoundDonut(s) => Some(s.position),
            Shape::Line(_)
            | Shape::Arc(_)
            | Shape::Outline(_)
            | Shape::Region(_)
            | Shape::Slot(_)
            | Shape::Unsupported(_) => None,
        }
    }

    pub fn is_flashed(&self) -> bool {
        self.position().is_some()
    }

    pub fn is_stroked(&self) -> bool {
        matches!(self, Shape::Line(_) | Shape::Arc(_))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Shape::Line(_) => "line",
            Shape::Arc(_) => "arc",
            Shape::Circle(_) => "circle",
            Shape::Rectangle(_) => "rectangle",
            Shape::Obround(_) => "obround",
            Shape::Diamond(_) => "diamond",
            Shape::ChamferRectangle(_) => "chamfer_rectangle",
            Shape::RoundRectangle(_) => "round_rectangle",
            Shape::Polygon(_) => "polygon",
            Shape::Outline(_) => "outline",
            Shape::Region(_) => "region",
            Shape::AmGroup(_) => "am_group",
            Shape::Drill(_) => "drill",
            Shape::Slot(_) => "slot",
            Shape::TestRecord(_) => "test_record",
            Shape::Butterfly(_) => "butterfly",
            Shape::SquareButterfly(_) => "square_butterfly",
            Shape::Donut(_) => "donut",
            Shape::SquareRoundDonut(_) => "square_round_donut",
            Shape::Unsupported(_) => "unsupported",
        }
    }
}

/// One geometric primitive.
#[derive(Debug, Clone, Serialize)]
pub struct Primitive {
    #[serde(flatten)]
    shape: Shape,
    level_polarity: Polarity,
    rotation: Rotation,
    units: Units,
    #[serde(skip)]
    bbox: OnceCell<BoundingBox>,
}

impl Primitive {
    pub fn new(shape: impl Into<Shape>, units: Units) -> Self {
        Self {
            shape: shape.into(),
            level_polarity: Polarity::Dark,
            rotation: Rotation::default(),
            units,
            bbox: OnceCell::new(),
        }
    }

    pub fn with_polarity(mut self, polarity: Polarity) -> Self {
        self.level_polarity = polarity;
        self
    }

    pub fn with_rotation(mut self, degrees: f64) -> Self {
        self.set_rotation(degrees);
        self
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Mutable access to the geometry. Drops the memoised bounding box.
    pub fn shape_mut(&mut self) -> &mut Shape {
        self.bbox.take();
        &mut self.shape
    }

    pub fn into_shape(self) -> Shape {
        self.shape
    }

    pub fn level_polarity(&self) -> Polarity {
        self.level_polarity
    }

    pub fn set_level_polarity(&mut self, polarity: Polarity) {
        self.level_polarity = polarity;
    }

    pub fn units(&self) -> Units {
        self.units
    }

    pub fn rotation(&self) -> f64 {
        self.rotation.degrees()
    }

    pub fn set_rotation(&mut self, degrees: f64) {
        self.rotation = Rotation::new(degrees);
        self.bbox.take();
    }

    pub fn position(&self) -> Option<Point> {
        self.shape.position()
    }

    /// Move a flashed primitive so that its position is `position`.
    /// Returns false for shapes without a single position.
    pub fn set_position(&mut self, position: Point) -> bool {
        let Some(current) = self.shape.position() else {
            return false;
        };
        self.offset(position[0] - current[0], position[1] - current[1]);
        true
    }

    pub fn bounding_box(&self) -> BoundingBox {
        *self
            .bbox
            .get_or_init(|| self.shape.geometry().bounds(&self.rotation))
    }

    pub fn to_inch(&mut self) {
        self.convert_units(Units::Inch);
    }

    pub fn to_metric(&mut self) {
        self.convert_units(Units::Metric);
    }

    /// Convert every length to `target`. Converting to the units already in
    /// effect is a no-op.
    pub fn convert_units(&mut self, target: Units) {
        if self.units == target {
            return;
        }
        let factor = self.units.factor_to(target);
        self.shape_mut().geometry_mut().scale(factor, target);
        self.units = target;
    }

    pub fn offset(&mut self, dx: f64, dy: f64) {
        if dx == 0.0 && dy == 0.0 {
            return;
        }
        self.shape_mut().geometry_mut().translate(dx, dy);
    }

    /// Polygonal outline of the primitive when it has one.
    pub fn vertices(&self) -> Option<Vec<Point>> {
        let rot = &self.rotation;
        match &self.shape {
            Shape::Rectangle(s) => Some(s.vertices(rot)),
            Shape::Obround(s) => Some(s.vertices(rot)),
            Shape::Diamond(s) => Some(s.vertices(rot)),
            Shape::ChamferRectangle(s) => Some(s.vertices(rot)),
            Shape::RoundRectangle(s) => Some(s.vertices(rot)),
            Shape::Polygon(s) => Some(s.vertices(rot)),
            Shape::Outline(s) => Some(s.vertices()),
            Shape::Line(s) => s.vertices(),
            _ => None,
        }
    }

    /// Leaf primitives in drawing order; AMGroups are replaced by their
    /// contents.
    pub fn flatten(&self) -> Vec<&Primitive> {
        match &self.shape {
            Shape::AmGroup(group) => group.primitives.iter().flat_map(|p| p.flatten()).collect(),
            _ => vec![self],
        }
    }
}
