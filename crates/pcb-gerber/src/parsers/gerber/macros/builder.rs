//! Turns evaluated macro primitive descriptors into geometry.
//!
//! Every primitive is positioned relative to the macro origin and rotated
//! about that origin. Exposure 0 draws with clear polarity, anything else
//! dark.

use log::warn;

use super::vm::PrimitiveDescriptor;
use crate::error::GerberError;
use crate::primitives::geometry::rotate_point;
use crate::primitives::{
    AmGroup, Circle, Outline, Point, Polarity, Polygon, Primitive, Rectangle, Unsupported,
};
use crate::settings::Units;

pub const CIRCLE: u32 = 1;
pub const VECTOR_LINE: u32 = 2;
pub const VECTOR_LINE_ALT: u32 = 20;
pub const OUTLINE: u32 = 4;
pub const POLYGON: u32 = 5;
pub const MOIRE: u32 = 6;
pub const THERMAL: u32 = 7;
pub const CENTER_LINE: u32 = 21;
pub const LOWER_LEFT_LINE: u32 = 22;

/// Upper bound on moire rings, whatever the max-rings modifier says.
const MAX_MOIRE_RINGS: usize = 1000;

/// Build every descriptor and wrap the result in one group at the origin.
pub fn build_group(
    descriptors: &[PrimitiveDescriptor],
    units: Units,
) -> Result<AmGroup, GerberError> {
    let mut primitives = Vec::new();
    for d in descriptors {
        primitives.extend(build(d, units)?);
    }
    Ok(AmGroup::new(primitives))
}

/// Build the primitives of one descriptor.
pub fn build(d: &PrimitiveDescriptor, units: Units) -> Result<Vec<Primitive>, GerberError> {
    match d.code {
        CIRCLE => {
            let m = require(d, 4, "circle")?;
            let rotation = m.get(4).copied().unwrap_or(0.0);
            let center = rotate_point([m[2], m[3]], rotation);
            Ok(vec![Primitive::new(Circle::new(center, m[1]), units)
                .with_polarity(exposure(m[0]))])
        }
        VECTOR_LINE | VECTOR_LINE_ALT => {
            let m = require(d, 7, "vector line")?;
            let (width, start, end, rotation) = (m[1], [m[2], m[3]], [m[4], m[5]], m[6]);
            let len = (end[0] - start[0]).hypot(end[1] - start[1]);
            let (nx, ny) = if len == 0.0 {
                (0.0, 1.0)
            } else {
                (-(end[1] - start[1]) / len, (end[0] - start[0]) / len)
            };
            let hw = width / 2.0;
            let corners = [
                [start[0] - nx * hw, start[1] - ny * hw],
                [end[0] - nx * hw, end[1] - ny * hw],
                [end[0] + nx * hw, end[1] + ny * hw],
                [start[0] + nx * hw, start[1] + ny * hw],
            ];
            let outline = closed_outline(corners.iter().map(|p| rotate_point(*p, rotation)))?;
            Ok(vec![Primitive::new(outline, units).with_polarity(exposure(m[0]))])
        }
        CENTER_LINE => {
            let m = require(d, 6, "center line")?;
            let rotation = m[5];
            let center = rotate_point([m[3], m[4]], rotation);
            Ok(vec![Primitive::new(Rectangle::new(center, m[1], m[2]), units)
                .with_rotation(rotation)
                .with_polarity(exposure(m[0]))])
        }
        LOWER_LEFT_LINE => {
            let m = require(d, 6, "lower-left line")?;
            let (width, height, rotation) = (m[1], m[2], m[5]);
            let center = rotate_point([m[3] + width / 2.0, m[4] + height / 2.0], rotation);
            Ok(vec![Primitive::new(Rectangle::new(center, width, height), units)
                .with_rotation(rotation)
                .with_polarity(exposure(m[0]))])
        }
        OUTLINE => build_outline(d, units).map(|p| vec![p]),
        POLYGON => {
            let m = require(d, 5, "polygon")?;
            let rotation = m.get(5).copied().unwrap_or(0.0);
            let sides = vertex_count(m[1])?;
            let center = rotate_point([m[2], m[3]], rotation);
            Ok(vec![Primitive::new(Polygon::new(center, sides, m[4])?, units)
                .with_rotation(rotation)
                .with_polarity(exposure(m[0]))])
        }
        MOIRE => build_moire(d, units),
        THERMAL => build_thermal(d, units),
        code => {
            warn!("Gerber: unsupported aperture macro primitive code {code}");
            Ok(vec![Primitive::new(
                Unsupported {
                    code,
                    modifiers: d.modifiers.clone(),
                },
                units,
            )])
        }
    }
}

fn exposure(value: f64) -> Polarity {
    if value == 0.0 {
        Polarity::Clear
    } else {
        Polarity::Dark
    }
}

fn require<'a>(
    d: &'a PrimitiveDescriptor,
    count: usize,
    what: &str,
) -> Result<&'a [f64], GerberError> {
    if d.modifiers.len() < count {
        return Err(GerberError::Syntax(format!(
            "AM {what}: expected at least {count} modifiers, got {} ({d})",
            d.modifiers.len()
        )));
    }
    Ok(&d.modifiers)
}

fn vertex_count(value: f64) -> Result<u32, GerberError> {
    if value.fract() != 0.0 || value < 0.0 {
        return Err(GerberError::Range(format!(
            "AM polygon: vertex count must be a whole number, got {value}"
        )));
    }
    Ok(value as u32)
}

/// Outline from corner points, repeating the first point at the end.
fn closed_outline(points: impl IntoIterator<Item = Point>) -> Result<Outline, GerberError> {
    let mut pts: Vec<Point> = points.into_iter().collect();
    if let Some(&first) = pts.first() {
        pts.push(first);
    }
    Outline::new(pts)
}

/// `4,exposure,n,x0,y0,…,xn,yn,rotation`
fn build_outline(d: &PrimitiveDescriptor, units: Units) -> Result<Primitive, GerberError> {
    let m = require(d, 2, "outline")?;
    let n = m[1];
    if n.fract() != 0.0 || n < 1.0 {
        return Err(GerberError::Range(format!(
            "AM outline: point count must be a positive whole number, got {n}"
        )));
    }
    let coords = &m[2..];
    if n > coords.len() as f64 {
        return Err(GerberError::Range(format!(
            "AM outline: point count {n} exceeds the {} coordinates given",
            coords.len()
        )));
    }
    let needed = 2 * (n as usize + 1);
    if coords.len() < needed {
        if coords.len() % 2 == 1 {
            return Err(GerberError::Shape(format!(
                "AM outline: coordinate list has an odd number of values ({d})"
            )));
        }
        return Err(GerberError::Syntax(format!(
            "AM outline: expected {needed} coordinates, got {} ({d})",
            coords.len()
        )));
    }
    let rotation = coords.get(needed).copied().unwrap_or(0.0);
    let points: Vec<Point> = coords[..needed]
        .chunks_exact(2)
        .map(|c| rotate_point([c[0], c[1]], rotation))
        .collect();
    Ok(Primitive::new(Outline::new(points)?, units).with_polarity(exposure(m[0])))
}

/// `6,x,y,outer,thickness,gap,max_rings,cross_thickness,cross_length,rotation`
fn build_moire(d: &PrimitiveDescriptor, units: Units) -> Result<Vec<Primitive>, GerberError> {
    let m = require(d, 8, "moire")?;
    let rotation = m.get(8).copied().unwrap_or(0.0);
    let center = rotate_point([m[0], m[1]], rotation);
    let (outer, thickness, gap, max_rings) = (m[2], m[3], m[4], m[5]);
    let (cross_thickness, cross_length) = (m[6], m[7]);

    let mut out = Vec::new();
    let mut diameter = outer;
    let mut rings = 0usize;
    while diameter > 0.0 && (rings as f64) < max_rings && rings < MAX_MOIRE_RINGS {
        out.push(Primitive::new(Circle::new(center, diameter), units));
        let inner = diameter - 2.0 * thickness;
        if inner > 0.0 {
            out.push(
                Primitive::new(Circle::new(center, inner), units).with_polarity(Polarity::Clear),
            );
        }
        rings += 1;
        let next = inner - 2.0 * gap;
        if next >= diameter {
            warn!("AM moire: ring diameter does not shrink, stopping after {rings} rings");
            break;
        }
        diameter = next;
    }
    for (w, h) in [(cross_length, cross_thickness), (cross_thickness, cross_length)] {
        out.push(Primitive::new(Rectangle::new(center, w, h), units).with_rotation(rotation));
    }
    Ok(out)
}

/// `7,x,y,outer,inner,gap,rotation`: a ring cut by a cross of clear bars.
fn build_thermal(d: &PrimitiveDescriptor, units: Units) -> Result<Vec<Primitive>, GerberError> {
    let m = require(d, 5, "thermal")?;
    let rotation = m.get(5).copied().unwrap_or(0.0);
    let center = rotate_point([m[0], m[1]], rotation);
    let (outer, inner, gap) = (m[2], m[3], m[4]);

    let mut out = vec![Primitive::new(Circle::new(center, outer), units)];
    if inner > 0.0 {
        out.push(Primitive::new(Circle::new(center, inner), units).with_polarity(Polarity::Clear));
    }
    for (w, h) in [(outer, gap), (gap, outer)] {
        out.push(
            Primitive::new(Rectangle::new(center, w, h), units)
                .with_rotation(rotation)
                .with_polarity(Polarity::Clear),
        );
    }
    Ok(out)
}
