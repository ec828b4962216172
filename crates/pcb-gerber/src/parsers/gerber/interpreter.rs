use log::{debug, warn};

use crate::error::GerberError;
use crate::primitives::{
    Arc, Circle, Direction, Line, Point, Polarity, Primitive, QuadrantMode, Region, Segment,
};
use crate::settings::{FileSettings, Notation, Units};

use super::apertures::ApertureTable;
use super::macros::{MacroTable, SubtractSemantics};
use super::statements::{
    Coordinate, FunctionCode, ImagePolarity, Operation, RegionMode, Statement,
};

/// Knobs that change how statements are turned into geometry.
#[derive(Debug, Clone, Copy, Default)]
pub struct InterpreterOptions {
    pub subtract_semantics: SubtractSemantics,
}

/// Output from interpreting a single Gerber file.
#[derive(Debug, Default)]
pub struct InterpreterOutput {
    pub primitives: Vec<Primitive>,
    pub image_polarity: ImagePolarity,
}

/// Gerber state machine. Walks statements and produces primitives.
struct Interpreter {
    position: Point,
    aperture: Option<u32>,
    interpolation: FunctionCode,
    operation: Operation,
    quadrant: QuadrantMode,
    region_active: bool,
    region_polarity: Polarity,
    region_segments: Vec<Segment>,
    polarity: Polarity,
    image_polarity: ImagePolarity,
    notation: Notation,
    units: Units,
    apertures: ApertureTable,
    macro_table: MacroTable,
    primitives: Vec<Primitive>,
}

impl Interpreter {
    fn new(options: InterpreterOptions) -> Self {
        let defaults = FileSettings::default();
        Self {
            position: [0.0, 0.0],
            aperture: None,
            interpolation: FunctionCode::Linear,
            operation: Operation::Move,
            quadrant: QuadrantMode::default(),
            region_active: false,
            region_polarity: Polarity::Dark,
            region_segments: Vec::new(),
            polarity: Polarity::Dark,
            image_polarity: ImagePolarity::default(),
            notation: defaults.notation,
            units: defaults.units,
            apertures: ApertureTable::default(),
            macro_table: MacroTable::new(options.subtract_semantics),
            primitives: Vec::new(),
        }
    }

    fn process(&mut self, statement: &Statement) -> Result<(), GerberError> {
        match statement {
            Statement::FormatSpec(fs) => {
                self.notation = fs.notation;
            }
            Statement::Mode { units } | Statement::Units { units } => {
                self.units = *units;
            }
            Statement::Notation { notation } => {
                self.notation = *notation;
            }
            Statement::LevelPolarity { polarity } => {
                self.polarity = *polarity;
            }
            Statement::ApertureMacro(am) => {
                self.macro_table.define(&am.name, &am.source);
            }
            Statement::ApertureDefinition(ad) => {
                self.apertures.define(ad, &mut self.macro_table, self.units)?;
            }
            Statement::ApertureSelect { code } => {
                self.aperture = Some(*code);
            }
            Statement::Coordinate(c) => self.coordinate(c)?,
            Statement::RegionMode { mode: RegionMode::On } => {
                if self.region_active {
                    self.flush_region()?;
                }
                self.region_active = true;
                self.region_polarity = self.polarity;
            }
            Statement::RegionMode {
                mode: RegionMode::Off,
            } => {
                self.flush_region()?;
                self.region_active = false;
            }
            Statement::QuadrantMode { mode } => {
                self.quadrant = *mode;
            }
            Statement::ImagePolarity { polarity } => {
                self.image_polarity = *polarity;
            }
            Statement::Comment { .. }
            | Statement::ImageName { .. }
            | Statement::ImageRotation { .. }
            | Statement::AxisSelect { .. }
            | Statement::Mirror { .. }
            | Statement::Offset { .. }
            | Statement::ScaleFactor { .. }
            | Statement::LayerName { .. }
            | Statement::Attribute { .. }
            | Statement::EndOfFile
            | Statement::Unknown { .. } => {}
        }
        Ok(())
    }

    fn coordinate(&mut self, c: &Coordinate) -> Result<(), GerberError> {
        if let Some(function) = c.function {
            self.interpolation = function;
        }
        let has_coordinates = c.x.is_some() || c.y.is_some() || c.i.is_some() || c.j.is_some();
        match c.operation {
            Some(op) => self.operation = op,
            // A bare G01/G02/G03 only changes the interpolation mode.
            None if !has_coordinates => return Ok(()),
            None => {}
        }

        let start = self.position;
        let end = match self.notation {
            Notation::Absolute => [c.x.unwrap_or(start[0]), c.y.unwrap_or(start[1])],
            Notation::Incremental => [
                start[0] + c.x.unwrap_or(0.0),
                start[1] + c.y.unwrap_or(0.0),
            ],
        };
        self.position = end;

        match self.operation {
            Operation::Interpolate => self.interpolate(start, end, c.i, c.j),
            Operation::Move => Ok(()),
            Operation::Flash => self.flash(end),
        }
    }

    fn interpolate(
        &mut self,
        start: Point,
        end: Point,
        i: Option<f64>,
        j: Option<f64>,
    ) -> Result<(), GerberError> {
        let aperture = self.stroke_aperture()?;
        let segment: Segment = match self.interpolation {
            FunctionCode::Linear => Line::new(start, end, aperture).into(),
            FunctionCode::ClockwiseArc | FunctionCode::CounterClockwiseArc => {
                let center = [start[0] + i.unwrap_or(0.0), start[1] + j.unwrap_or(0.0)];
                let direction = if self.interpolation == FunctionCode::ClockwiseArc {
                    Direction::Clockwise
                } else {
                    Direction::CounterClockwise
                };
                Arc::new(start, end, center, direction, aperture, self.quadrant).into()
            }
        };

        if self.region_active {
            self.region_segments.push(segment);
            return Ok(());
        }

        let primitive = match segment {
            Segment::Line(line) => Primitive::new(line, self.units),
            Segment::Arc(arc) => Primitive::new(arc, self.units),
        };
        self.primitives.push(primitive.with_polarity(self.polarity));
        Ok(())
    }

    /// The aperture a D01 strokes with. Region outlines may be drawn with
    /// no aperture selected; they get a zero-diameter circle.
    fn stroke_aperture(&mut self) -> Result<Primitive, GerberError> {
        match self.aperture {
            Some(code) => self.apertures.resolve(code, &mut self.macro_table),
            None if self.region_active => {
                Ok(Primitive::new(Circle::new([0.0, 0.0], 0.0), self.units))
            }
            None => Err(GerberError::NoApertureSelected("D01")),
        }
    }

    fn flash(&mut self, position: Point) -> Result<(), GerberError> {
        if self.region_active {
            warn!("Gerber: D03 flash inside a region ignored");
            return Ok(());
        }
        let code = self.aperture.ok_or(GerberError::NoApertureSelected("D03"))?;
        let mut flash = self.apertures.resolve(code, &mut self.macro_table)?;
        flash.convert_units(self.units);
        flash.set_position(position);
        flash.set_level_polarity(self.polarity);
        self.primitives.push(flash);
        Ok(())
    }

    /// Close the accumulated outline into one Region primitive.
    fn flush_region(&mut self) -> Result<(), GerberError> {
        if self.region_segments.is_empty() {
            return Ok(());
        }
        let segments = std::mem::take(&mut self.region_segments);
        debug!("Gerber: closing region of {} segments", segments.len());
        let region = Region::new(segments)?;
        self.primitives
            .push(Primitive::new(region, self.units).with_polarity(self.region_polarity));
        Ok(())
    }
}

/// Interpret a sequence of Gerber statements into primitives.
pub fn interpret(
    statements: &[Statement],
    options: InterpreterOptions,
) -> Result<InterpreterOutput, GerberError> {
    let mut interp = Interpreter::new(options);

    for statement in statements {
        if matches!(statement, Statement::EndOfFile) {
            break;
        }
        interp.process(statement)?;
    }

    // Flush any remaining region
    if interp.region_active {
        interp.flush_region()?;
    }

    Ok(InterpreterOutput {
        primitives: interp.primitives,
        image_polarity: interp.image_polarity,
    })
}
