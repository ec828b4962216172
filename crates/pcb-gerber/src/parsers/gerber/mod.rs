//! RS-274X reader.
//!
//! Text is tokenized into [`Statement`]s, which the interpreter walks to
//! produce [`Primitive`]s. A [`GerberFile`] keeps both, so the file can be
//! measured, transformed and written back out.

pub mod apertures;
pub mod coord;
pub mod interpreter;
pub mod lexer;
pub mod macros;
pub mod statements;

use std::path::Path;

use log::{debug, warn};
use serde::Serialize;

use crate::error::GerberError;
use crate::primitives::{BoundingBox, Primitive};
use crate::settings::{FileSettings, Notation, Units};

use self::interpreter::InterpreterOptions;
use self::statements::{ImagePolarity, Statement};

/// A parsed Gerber file: its statements, the geometry they draw and the
/// settings in effect at the end of the file.
#[derive(Debug, Clone, Serialize)]
pub struct GerberFile {
    #[serde(skip_serializing_if = "Option::is_none")]
    filename: Option<String>,
    settings: FileSettings,
    image_polarity: ImagePolarity,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    statements: Vec<Statement>,
    primitives: Vec<Primitive>,
}

impl GerberFile {
    /// Read and parse the file at `path`.
    pub fn read(path: impl AsRef<Path>) -> Result<Self, GerberError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        Ok(Self::load(&text)?.with_filename(path.display().to_string()))
    }

    /// Parse Gerber text with default interpreter options.
    pub fn load(text: &str) -> Result<Self, GerberError> {
        Self::load_with(text, InterpreterOptions::default())
    }

    pub fn load_with(text: &str, options: InterpreterOptions) -> Result<Self, GerberError> {
        let tokens = lexer::tokenize(text)?;
        let output = interpreter::interpret(&tokens.statements, options)?;
        debug!(
            "Gerber: {} statements, {} primitives",
            tokens.statements.len(),
            output.primitives.len()
        );
        Ok(Self {
            filename: None,
            settings: tokens.settings,
            image_polarity: output.image_polarity,
            statements: tokens.statements,
            primitives: output.primitives,
        })
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    pub fn primitives(&self) -> &[Primitive] {
        &self.primitives
    }

    pub fn settings(&self) -> FileSettings {
        self.settings
    }

    pub fn units(&self) -> Units {
        self.settings.units
    }

    pub fn image_polarity(&self) -> ImagePolarity {
        self.image_polarity
    }

    /// Union of every primitive's bounding box.
    pub fn bounds(&self) -> BoundingBox {
        self.primitives
            .iter()
            .map(Primitive::bounding_box)
            .fold(BoundingBox::empty(), |acc, b| acc.union(&b))
    }

    /// Statements the tokenizer could not recognise, in file order.
    pub fn unknown_statements(&self) -> Vec<&Statement> {
        self.statements.iter().filter(|s| s.is_unknown()).collect()
    }

    pub fn to_inch(&mut self) {
        self.convert_units(Units::Inch);
    }

    pub fn to_metric(&mut self) {
        self.convert_units(Units::Metric);
    }

    /// Rewrite the file in `target` units. The coordinate format is kept.
    pub fn convert_units(&mut self, target: Units) {
        if self.settings.units == target {
            return;
        }
        let factor = self.settings.units.factor_to(target);

        let mut statements = self.statements.clone();
        for statement in &mut statements {
            statement.convert_units(factor, target);
        }
        let mut primitives = self.primitives.clone();
        for primitive in &mut primitives {
            primitive.convert_units(target);
        }

        self.statements = statements;
        self.primitives = primitives;
        self.settings = self.settings.with_units(target);
    }

    /// Move the whole image by (`dx`, `dy`) in the file's units.
    pub fn offset(&mut self, dx: f64, dy: f64) {
        if dx == 0.0 && dy == 0.0 {
            return;
        }

        let mut statements = self.statements.clone();
        match self.settings.notation {
            Notation::Absolute => {
                for statement in &mut statements {
                    statement.offset(dx, dy);
                }
            }
            // Only the first X and the first Y are positions; the rest are steps.
            Notation::Incremental => {
                let (mut rest_x, mut rest_y) = (dx, dy);
                for statement in &mut statements {
                    if let Statement::Coordinate(c) = statement {
                        if let Some(x) = c.x.as_mut() {
                            *x += std::mem::take(&mut rest_x);
                        }
                        if let Some(y) = c.y.as_mut() {
                            *y += std::mem::take(&mut rest_y);
                        }
                    }
                }
            }
        }
        let mut primitives = self.primitives.clone();
        for primitive in &mut primitives {
            primitive.offset(dx, dy);
        }

        self.statements = statements;
        self.primitives = primitives;
    }

    /// Serialise the statements back to Gerber text, one per line.
    pub fn to_gerber(&self) -> Result<String, GerberError> {
        let unknown = self.statements.iter().filter(|s| s.is_unknown()).count();
        if unknown > 0 {
            warn!("Gerber: writing {unknown} unrecognised statements back verbatim");
        }
        let mut out = String::new();
        for statement in &self.statements {
            out.push_str(&statement.to_gerber(&self.settings)?);
            out.push('\n');
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::{Polarity, Shape};
    use approx::assert_abs_diff_eq;

    const SAMPLE: &str = "\
G04 two pads and a trace*
%FSLAX25Y25*%
%MOIN*%
%ADD10C,0.01*%
%ADD11R,0.06X0.04*%
D10*
X0Y0D02*
G01X100000Y0D01*
D11*
X100000Y0D03*
X0Y0D03*
M02*
";

    #[test]
    fn test_single_flash_end_to_end() {
        let file = GerberFile::load("%FSLAX25Y25*%\n%MOMM*%\n%ADD10C,1.5*%\nD10*\nX150000Y-50000D03*\nM02*\n")
            .unwrap();
        assert_eq!(file.primitives().len(), 1);
        let flash = &file.primitives()[0];
        assert_eq!(flash.level_polarity(), Polarity::Dark);
        match flash.shape() {
            Shape::Circle(c) => {
                assert_abs_diff_eq!(c.position[0], 1.5, epsilon = 1e-9);
                assert_abs_diff_eq!(c.position[1], -0.5, epsilon = 1e-9);
                assert_abs_diff_eq!(c.diameter, 1.5, epsilon = 1e-12);
            }
            other => panic!("expected Circle, got: {other:?}"),
        }
        assert_eq!(file.units(), Units::Metric);
    }

    #[test]
    fn test_sample_file() {
        let file = GerberFile::load(SAMPLE).unwrap();
        let names: Vec<&str> = file.primitives().iter().map(|p| p.shape().name()).collect();
        assert_eq!(names, vec!["line", "rectangle", "rectangle"]);
        assert!(file.unknown_statements().is_empty());

        let ((min_x, max_x), (min_y, max_y)) = file.bounds().as_tuple();
        assert_abs_diff_eq!(min_x, -0.03, epsilon = 1e-9);
        assert_abs_diff_eq!(max_x, 1.03, epsilon = 1e-9);
        assert_abs_diff_eq!(min_y, -0.02, epsilon = 1e-9);
        assert_abs_diff_eq!(max_y, 0.02, epsilon = 1e-9);
    }

    #[test]
    fn test_to_metric_converts_statements_and_primitives() {
        let mut file = GerberFile::load(SAMPLE).unwrap();
        file.to_metric();
        file.to_metric();
        assert_eq!(file.units(), Units::Metric);
        let ((min_x, max_x), _) = file.bounds().as_tuple();
        assert_abs_diff_eq!(min_x, -0.762, epsilon = 1e-9);
        assert_abs_diff_eq!(max_x, 26.162, epsilon = 1e-9);

        let text = file.to_gerber().unwrap();
        assert!(text.contains("%MOMM*%"));
        assert!(text.contains("%ADD11R,1.524X1.016*%"));

        file.to_inch();
        let ((_, max_x), _) = file.bounds().as_tuple();
        assert_abs_diff_eq!(max_x, 1.03, epsilon = 1e-9);
    }

    #[test]
    fn test_offset_moves_geometry_and_statements() {
        let mut file = GerberFile::load(SAMPLE).unwrap();
        file.offset(1.0, 2.0);
        let ((min_x, _), (min_y, _)) = file.bounds().as_tuple();
        assert_abs_diff_eq!(min_x, 0.97, epsilon = 1e-9);
        assert_abs_diff_eq!(min_y, 1.98, epsilon = 1e-9);

        // Re-reading the written text gives the moved geometry.
        let reread = GerberFile::load(&file.to_gerber().unwrap()).unwrap();
        assert_eq!(reread.primitives()[2].position(), Some([1.0, 2.0]));
    }

    #[test]
    fn test_offset_incremental_only_shifts_first_position() {
        let text = "%FSLIX25Y25*%\n%MOIN*%\n%ADD10C,0.1*%\nD10*\nX100000Y100000D03*\nX100000D03*\n";
        let mut file = GerberFile::load(text).unwrap();
        file.offset(1.0, 0.0);
        let reread = GerberFile::load(&file.to_gerber().unwrap()).unwrap();
        assert_eq!(reread.primitives()[0].position(), Some([2.0, 1.0]));
        assert_eq!(reread.primitives()[1].position(), Some([3.0, 1.0]));
    }

    #[test]
    fn test_round_trip_text() {
        let file = GerberFile::load(SAMPLE).unwrap();
        let again = GerberFile::load(&file.to_gerber().unwrap()).unwrap();
        assert_eq!(again.statements(), file.statements());
        assert_eq!(again.settings(), file.settings());
    }

    #[test]
    fn test_unknown_statements_kept() {
        let file = GerberFile::load("%FSLAX25Y25*%\n%XYZ123*%\nD10*\nM02*\n").unwrap();
        let unknown = file.unknown_statements();
        assert_eq!(unknown.len(), 1);
        assert!(matches!(unknown[0], Statement::Unknown { raw } if raw == "%XYZ123*%"));
    }

    #[test]
    fn test_malformed_coordinate_skipped() {
        let text = "%FSLAX25Y25*%\n%MOMM*%\n%ADD10C,0.5*%\nD10*\nX1.2.3Y0D02*\nX0Y0D03*\n";
        let file = GerberFile::load(text).unwrap();
        assert_eq!(file.unknown_statements().len(), 1);
        assert_eq!(file.primitives().len(), 1);
    }

    #[test]
    fn test_macro_comment_with_leading_digit() {
        let text = "%FSLAX25Y25*%\n%MOMM*%\n%AMPAD*0 2 layer pad*1,1,$1,0,0*%\n\
                    %ADD10PAD,0.5*%\nD10*\nX0Y0D03*\n";
        let file = GerberFile::load(text).unwrap();
        assert_eq!(file.primitives().len(), 1);
    }

    #[test]
    fn test_read_missing_file() {
        assert!(matches!(
            GerberFile::read("/nonexistent/board.gbr"),
            Err(GerberError::Io(_))
        ));
    }
}
