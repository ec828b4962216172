//! Closed contours: macro outlines and G36/G37 regions.

use serde::Serialize;

use super::geometry::{points_equal, Rotation};
use super::{Arc, BoundingBox, Line, Point, ShapeGeometry};
use crate::error::GerberError;
use crate::settings::Units;
use crate::types::serialize_points;

/// Closed polygon from macro primitive 4. The last point repeats the first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Outline {
    #[serde(serialize_with = "serialize_points")]
    points: Vec<Point>,
}

impl Outline {
    pub fn new(points: Vec<Point>) -> Result<Self, GerberError> {
        match (points.first(), points.last()) {
            (Some(first), Some(last)) if points.len() >= 2 && points_equal(*first, *last) => {
                Ok(Self { points })
            }
            (Some(first), Some(last)) => Err(GerberError::Syntax(format!(
                "outline is not closed: starts at ({}, {}) but ends at ({}, {})",
                first[0], first[1], last[0], last[1]
            ))),
            _ => Err(GerberError::Syntax("outline has no points".into())),
        }
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Polygon corners without the repeated closing point.
    pub fn vertices(&self) -> Vec<Point> {
        self.points[..self.points.len() - 1].to_vec()
    }
}

impl ShapeGeometry for Outline {
    fn bounds(&self, _rotation: &Rotation) -> BoundingBox {
        BoundingBox::from_points(&self.points)
    }

    fn scale(&mut self, factor: f64, _target: Units) {
        for p in &mut self.points {
            p[0] *= factor;
            p[1] *= factor;
        }
    }

    fn translate(&mut self, dx: f64, dy: f64) {
        for p in &mut self.points {
            p[0] += dx;
            p[1] += dy;
        }
    }
}

/// One edge of a region contour.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Segment {
    Line(Line),
    Arc(Arc),
}

impl Segment {
    pub fn start(&self) -> Point {
        match self {
            Segment::Line(l) => l.start,
            Segment::Arc(a) => a.start,
        }
    }

    pub fn end(&self) -> Point {
        match self {
            Segment::Line(l) => l.end,
            Segment::Arc(a) => a.end,
        }
    }

    /// Extent of the edge itself. Region edges have no width.
    pub fn path_bounds(&self) -> BoundingBox {
        match self {
            Segment::Line(l) => l.path_bounds(),
            Segment::Arc(a) => a.path_bounds(),
        }
    }

    fn geometry_mut(&mut self) -> &mut dyn ShapeGeometry {
        match self {
            Segment::Line(l) => l,
            Segment::Arc(a) => a,
        }
    }
}

impl From<Line> for Segment {
    fn from(l: Line) -> Self {
        Segment::Line(l)
    }
}

impl From<Arc> for Segment {
    fn from(a: Arc) -> Self {
        Segment::Arc(a)
    }
}

/// Filled area bounded by one or more closed contours.
#[derive(Debug, Clone, Serialize)]
pub struct Region {
    contours: Vec<Vec<Segment>>,
}

impl Region {
    /// Split `segments` into contours wherever a segment does not start where
    /// the previous one ended. Every contour must end where it started.
    pub fn new(segments: Vec<Segment>) -> Result<Self, GerberError> {
        if segments.is_empty() {
            return Err(GerberError::Syntax("region has no segments".into()));
        }
        let mut contours: Vec<Vec<Segment>> = Vec::new();
        let mut current: Vec<Segment> = Vec::new();
        for seg in segments {
            if let Some(prev) = current.last() {
                if !points_equal(prev.end(), seg.start()) {
                    contours.push(std::mem::take(&mut current));
                }
            }
            current.push(seg);
        }
        contours.push(current);

        for (idx, contour) in contours.iter().enumerate() {
            let (Some(first), Some(last)) = (contour.first(), contour.last()) else {
                continue;
            };
            let (start, end) = (first.start(), last.end());
            if !points_equal(start, end) {
                return Err(GerberError::Syntax(format!(
                    "region contour {idx} is not closed: starts at ({}, {}) but ends at ({}, {})",
                    start[0], start[1], end[0], end[1]
                )));
            }
        }
        Ok(Self { contours })
    }

    pub fn contours(&self) -> &[Vec<Segment>] {
        &self.contours
    }

    pub fn segments(&self) -> impl Iterator<Item = &Segment> {
        self.contours.iter().flatten()
    }

    /// Start point of every segment, contour by contour.
    pub fn points(&self) -> Vec<Vec<Point>> {
        self.contours
            .iter()
            .map(|c| c.iter().map(Segment::start).collect())
            .collect()
    }
}

impl ShapeGeometry for Region {
    fn bounds(&self, _rotation: &Rotation) -> BoundingBox {
        self.segments()
            .map(Segment::path_bounds)
            .fold(BoundingBox::empty(), |acc, b| acc.union(&b))
    }

    fn scale(&mut self, factor: f64, target: Units) {
        for seg in self.contours.iter_mut().flatten() {
            seg.geometry_mut().scale(factor, target);
        }
    }

    fn translate(&mut self, dx: f64, dy: f64) {
        for seg in self.contours.iter_mut().flatten() {
            seg.geometry_mut().translate(dx, dy);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::{Circle, Direction, Primitive, QuadrantMode};

    fn zero() -> Primitive {
        Primitive::new(Circle::new([0.0, 0.0], 0.0), Units::Inch)
    }

    fn line(a: Point, b: Point) -> Segment {
        Line::new(a, b, zero()).into()
    }

    fn square(x: f64, y: f64) -> Vec<Segment> {
        vec![
            line([x, y], [x + 1.0, y]),
            line([x + 1.0, y], [x + 1.0, y + 1.0]),
            line([x + 1.0, y + 1.0], [x, y + 1.0]),
            line([x, y + 1.0], [x, y]),
        ]
    }

    #[test]
    fn test_outline_closed() {
        let outline = Outline::new(vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0]]).unwrap();
        assert_eq!(outline.vertices().len(), 3);
        assert_eq!(
            outline.bounds(&Rotation::default()).as_tuple(),
            ((0.0, 1.0), (0.0, 1.0))
        );
    }

    #[test]
    fn test_outline_not_closed() {
        match Outline::new(vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0]]) {
            Err(GerberError::Syntax(msg)) => assert!(msg.contains("not closed")),
            other => panic!("expected Syntax error, got: {other:?}"),
        }
        assert!(matches!(Outline::new(vec![]), Err(GerberError::Syntax(_))));
    }

    #[test]
    fn test_region_not_closed() {
        let segments = vec![
            line([0.0, 0.0], [1.0, 0.0]),
            line([1.0, 0.0], [1.0, 1.0]),
        ];
        match Region::new(segments) {
            Err(GerberError::Syntax(msg)) => assert!(msg.contains("not closed")),
            other => panic!("expected Syntax error, got: {other:?}"),
        }
    }

    #[test]
    fn test_region_multiple_contours() {
        let mut segments = square(0.0, 0.0);
        segments.extend(square(5.0, 5.0));
        let region = Region::new(segments).unwrap();
        assert_eq!(region.contours().len(), 2);
        assert_eq!(region.points()[1][0], [5.0, 5.0]);
        assert_eq!(
            region.bounds(&Rotation::default()).as_tuple(),
            ((0.0, 6.0), (0.0, 6.0))
        );
    }

    #[test]
    fn test_region_with_arc_closed() {
        let segments = vec![
            line([0.0, 0.0], [2.0, 0.0]),
            Arc::new(
                [2.0, 0.0],
                [0.0, 0.0],
                [1.0, 0.0],
                Direction::CounterClockwise,
                zero(),
                QuadrantMode::Multi,
            )
            .into(),
        ];
        let region = Region::new(segments).unwrap();
        let ((min_x, max_x), (min_y, max_y)) = region.bounds(&Rotation::default()).as_tuple();
        assert_eq!((min_x, max_x), (0.0, 2.0));
        assert_eq!(min_y, 0.0);
        assert!((max_y - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_region_bounds_ignore_stroke_aperture() {
        let pad = Primitive::new(Circle::new([0.0, 0.0], 1.0), Units::Inch);
        let segments: Vec<Segment> = [
            ([0.0, 0.0], [1.0, 0.0]),
            ([1.0, 0.0], [1.0, 1.0]),
            ([1.0, 1.0], [0.0, 1.0]),
            ([0.0, 1.0], [0.0, 0.0]),
        ]
        .into_iter()
        .map(|(a, b)| Line::new(a, b, pad.clone()).into())
        .collect();
        let region = Region::new(segments).unwrap();
        assert_eq!(
            region.bounds(&Rotation::default()).as_tuple(),
            ((0.0, 1.0), (0.0, 1.0))
        );
    }

    #[test]
    fn test_region_offset() {
        let mut p = Primitive::new(Region::new(square(0.0, 0.0)).unwrap(), Units::Inch);
        p.offset(2.0, 3.0);
        assert_eq!(p.bounding_box().as_tuple(), ((2.0, 3.0), (3.0, 4.0)));
    }
}
