use std::collections::HashMap;

use log::debug;

use super::macros::MacroTable;
use super::statements::{ApertureDefinition, ApertureShape};
use crate::error::GerberError;
use crate::primitives::{Circle, Hole, Obround, Polygon, Primitive, Rectangle};
use crate::settings::Units;

/// An aperture in the aperture table.
#[derive(Debug, Clone)]
pub enum ApertureEntry {
    /// Geometry at the origin, cloned and moved for every use.
    Template(Primitive),
    /// An AD that named a macro not yet defined. Resolved on first use.
    UnresolvedMacro {
        name: String,
        modifiers: Vec<f64>,
        units: Units,
    },
}

/// Aperture table built from %AD statements.
#[derive(Debug, Default)]
pub struct ApertureTable {
    apertures: HashMap<u32, ApertureEntry>,
}

impl ApertureTable {
    /// Build the aperture an AD statement describes. Standard shapes are
    /// built immediately; a macro reference is instantiated now when the
    /// macro is known and deferred otherwise.
    pub fn define(
        &mut self,
        ad: &ApertureDefinition,
        macros: &mut MacroTable,
        units: Units,
    ) -> Result<(), GerberError> {
        let entry = match &ad.shape {
            ApertureShape::Macro(name) if !macros.contains(name) => {
                debug!("Gerber: D{} references macro '{name}' before its definition", ad.code);
                ApertureEntry::UnresolvedMacro {
                    name: name.clone(),
                    modifiers: ad.modifiers.clone(),
                    units,
                }
            }
            ApertureShape::Macro(name) => {
                let group = macros.instantiate(name, &ad.modifiers, units)?;
                ApertureEntry::Template(Primitive::new(group, units))
            }
            _ => ApertureEntry::Template(build_standard(ad, units)?),
        };
        self.apertures.insert(ad.code, entry);
        Ok(())
    }

    pub fn get(&self, code: u32) -> Option<&ApertureEntry> {
        self.apertures.get(&code)
    }

    pub fn contains(&self, code: u32) -> bool {
        self.apertures.contains_key(&code)
    }

    /// A copy of the template for `code`, resolving a deferred macro
    /// reference the first time it is used.
    pub fn resolve(&mut self, code: u32, macros: &mut MacroTable) -> Result<Primitive, GerberError> {
        let entry = self
            .apertures
            .get_mut(&code)
            .ok_or(GerberError::UndefinedAperture(code))?;
        if let ApertureEntry::UnresolvedMacro {
            name,
            modifiers,
            units,
        } = entry
        {
            let units = *units;
            let group = macros.instantiate(name, modifiers, units)?;
            *entry = ApertureEntry::Template(Primitive::new(group, units));
        }
        match entry {
            ApertureEntry::Template(template) => Ok(template.clone()),
            ApertureEntry::UnresolvedMacro { name, .. } => {
                Err(GerberError::UndefinedMacro(name.clone()))
            }
        }
    }
}

fn required(ad: &ApertureDefinition, count: usize) -> Result<&[f64], GerberError> {
    if ad.modifiers.len() < count {
        return Err(GerberError::Syntax(format!(
            "AD D{}: expected at least {count} modifiers, got {}",
            ad.code,
            ad.modifiers.len()
        )));
    }
    Ok(&ad.modifiers)
}

/// C, R, O and P apertures. Trailing modifiers describe an optional hole.
fn build_standard(ad: &ApertureDefinition, units: Units) -> Result<Primitive, GerberError> {
    let origin = [0.0, 0.0];
    let primitive = match ad.shape {
        ApertureShape::Circle => {
            let m = required(ad, 1)?;
            Primitive::new(
                Circle::new(origin, m[0]).with_hole(Hole::from_modifiers(&m[1..])),
                units,
            )
        }
        ApertureShape::Rectangle => {
            let m = required(ad, 2)?;
            Primitive::new(
                Rectangle::new(origin, m[0], m[1]).with_hole(Hole::from_modifiers(&m[2..])),
                units,
            )
        }
        ApertureShape::Obround => {
            let m = required(ad, 2)?;
            Primitive::new(
                Obround::new(origin, m[0], m[1]).with_hole(Hole::from_modifiers(&m[2..])),
                units,
            )
        }
        ApertureShape::Polygon => {
            let m = required(ad, 2)?;
            if m[1].fract() != 0.0 || m[1] < 0.0 {
                return Err(GerberError::Range(format!(
                    "AD D{}: polygon vertex count must be a whole number, got {}",
                    ad.code, m[1]
                )));
            }
            let polygon = Polygon::new(origin, m[1] as u32, m[0])?
                .with_hole(Hole::from_modifiers(m.get(3..).unwrap_or_default()));
            Primitive::new(polygon, units).with_rotation(m.get(2).copied().unwrap_or(0.0))
        }
        ApertureShape::Macro(ref name) => {
            return Err(GerberError::UndefinedMacro(name.clone()));
        }
    };
    Ok(primitive)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::Shape;
    use approx::assert_abs_diff_eq;

    fn ad(code: u32, shape: ApertureShape, modifiers: &[f64]) -> ApertureDefinition {
        ApertureDefinition {
            code,
            shape,
            modifiers: modifiers.to_vec(),
        }
    }

    #[test]
    fn test_define_and_resolve_circle() {
        let mut table = ApertureTable::default();
        let mut macros = MacroTable::default();
        table
            .define(&ad(10, ApertureShape::Circle, &[0.5]), &mut macros, Units::Inch)
            .unwrap();
        let template = table.resolve(10, &mut macros).unwrap();
        match template.shape() {
            Shape::Circle(c) => {
                assert_abs_diff_eq!(c.diameter, 0.5, epsilon = 1e-12);
                assert_eq!(c.hole, Hole::None);
            }
            other => panic!("expected Circle, got: {other:?}"),
        }
        assert_eq!(template.units(), Units::Inch);
    }

    #[test]
    fn test_rectangle_with_hole() {
        let mut table = ApertureTable::default();
        let mut macros = MacroTable::default();
        table
            .define(
                &ad(11, ApertureShape::Rectangle, &[0.5, 0.3, 0.1]),
                &mut macros,
                Units::Metric,
            )
            .unwrap();
        match table.resolve(11, &mut macros).unwrap().shape() {
            Shape::Rectangle(r) => {
                assert_eq!((r.width, r.height), (0.5, 0.3));
                assert_eq!(r.hole, Hole::Round { diameter: 0.1 });
            }
            other => panic!("expected Rectangle, got: {other:?}"),
        }
    }

    #[test]
    fn test_polygon_rotation_and_range() {
        let mut table = ApertureTable::default();
        let mut macros = MacroTable::default();
        table
            .define(
                &ad(12, ApertureShape::Polygon, &[1.0, 6.0, 30.0]),
                &mut macros,
                Units::Inch,
            )
            .unwrap();
        let template = table.resolve(12, &mut macros).unwrap();
        assert_eq!(template.rotation(), 30.0);
        assert!(matches!(template.shape(), Shape::Polygon(p) if p.sides == 6));

        let err = table.define(&ad(13, ApertureShape::Polygon, &[1.0, 2.0]), &mut macros, Units::Inch);
        assert!(matches!(err, Err(GerberError::Range(_))));
        let err = table.define(&ad(14, ApertureShape::Polygon, &[1.0, 13.0]), &mut macros, Units::Inch);
        assert!(matches!(err, Err(GerberError::Range(_))));
    }

    #[test]
    fn test_missing_modifiers() {
        let mut table = ApertureTable::default();
        let mut macros = MacroTable::default();
        let err = table.define(&ad(15, ApertureShape::Rectangle, &[0.5]), &mut macros, Units::Inch);
        assert!(matches!(err, Err(GerberError::Syntax(_))));
        assert!(!table.contains(15));
    }

    #[test]
    fn test_macro_aperture() {
        let mut table = ApertureTable::default();
        let mut macros = MacroTable::default();
        macros.define("RING", "1,1,$1,0,0*1,0,$2,0,0*");
        table
            .define(
                &ad(20, ApertureShape::Macro("RING".into()), &[1.0, 0.5]),
                &mut macros,
                Units::Inch,
            )
            .unwrap();
        assert!(matches!(table.get(20), Some(ApertureEntry::Template(_))));
        match table.resolve(20, &mut macros).unwrap().shape() {
            Shape::AmGroup(g) => assert_eq!(g.primitives.len(), 2),
            other => panic!("expected AmGroup, got: {other:?}"),
        }
    }

    #[test]
    fn test_macro_defined_after_use() {
        let mut table = ApertureTable::default();
        let mut macros = MacroTable::default();
        table
            .define(
                &ad(21, ApertureShape::Macro("LATE".into()), &[]),
                &mut macros,
                Units::Inch,
            )
            .unwrap();
        assert!(matches!(
            table.get(21),
            Some(ApertureEntry::UnresolvedMacro { .. })
        ));
        match table.resolve(21, &mut macros) {
            Err(GerberError::UndefinedMacro(name)) => assert_eq!(name, "LATE"),
            other => panic!("expected UndefinedMacro, got: {other:?}"),
        }

        macros.define("LATE", "1,1,0.25,0,0*");
        assert!(table.resolve(21, &mut macros).is_ok());
        assert!(matches!(table.get(21), Some(ApertureEntry::Template(_))));
    }

    #[test]
    fn test_undefined_aperture() {
        let mut table = ApertureTable::default();
        let mut macros = MacroTable::default();
        match table.resolve(99, &mut macros) {
            Err(GerberError::UndefinedAperture(code)) => assert_eq!(code, 99),
            other => panic!("expected UndefinedAperture, got: {other:?}"),
        }
    }
}
