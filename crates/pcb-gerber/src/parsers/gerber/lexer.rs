//! Gerber tokenizer.
//!
//! Physical lines are first reassembled so that a parameter block opened by
//! `%` and closed on a later line becomes one logical line. Each logical line
//! is then consumed by matching a statement at its start, stripping it and
//! repeating. Text no matcher accepts becomes an [`Statement::Unknown`] up
//! to the next `*`; a fragment with no `*` is carried over to the next line.
//!
//! The tokenizer keeps a [`FileSettings`] snapshot that FS, MO and the
//! deprecated G70/G71/G90/G91 statements replace as they are read, so every
//! coordinate field is decoded with the settings in effect at that point.

use log::{debug, warn};

use super::coord;
use super::statements::{Coordinate, FunctionCode, Operation, RegionMode, Statement};
use crate::error::GerberError;
use crate::primitives::QuadrantMode;
use crate::settings::{FileSettings, Notation, Units};

/// Statements of one file and the settings in effect after the last one.
#[derive(Debug, Clone)]
pub struct Tokenized {
    pub statements: Vec<Statement>,
    pub settings: FileSettings,
}

/// Tokenize a Gerber file starting from the default settings.
pub fn tokenize(input: &str) -> Result<Tokenized, GerberError> {
    Tokenizer::new(FileSettings::default()).run(input)
}

struct Tokenizer {
    settings: FileSettings,
    statements: Vec<Statement>,
}

impl Tokenizer {
    fn new(settings: FileSettings) -> Self {
        Self {
            settings,
            statements: Vec::new(),
        }
    }

    fn run(mut self, input: &str) -> Result<Tokenized, GerberError> {
        let mut carry = String::new();
        for line in logical_lines(input) {
            let line = if carry.is_empty() {
                line
            } else {
                std::mem::take(&mut carry) + &line
            };
            carry = self.consume_line(&line)?;
        }
        if !carry.is_empty() {
            self.push_unknown(carry);
        }
        Ok(Tokenized {
            statements: self.statements,
            settings: self.settings,
        })
    }

    /// Consume every statement in `line` and return the unterminated rest.
    fn consume_line(&mut self, line: &str) -> Result<String, GerberError> {
        let mut rest = line.trim();
        while !rest.is_empty() {
            let consumed = match self.match_statement(rest)? {
                Some(n) => n,
                None => match rest.find('*') {
                    Some(star) => {
                        self.push_unknown(rest[..=star].to_string());
                        star + 1
                    }
                    None => return Ok(rest.to_string()),
                },
            };
            rest = rest[consumed..].trim_start();
        }
        Ok(String::new())
    }

    /// Try each matcher in priority order. Returns the number of bytes
    /// consumed from the start of `s`.
    fn match_statement(&mut self, s: &str) -> Result<Option<usize>, GerberError> {
        if let Some(n) = self.match_coordinate(s)? {
            return Ok(Some(n));
        }
        let matchers: [fn(&mut Self, &str) -> Option<usize>; 7] = [
            Self::match_aperture_select,
            Self::match_parameter_block,
            Self::match_region_mode,
            Self::match_quadrant_mode,
            Self::match_comment,
            Self::match_deprecated,
            Self::match_end_of_file,
        ];
        Ok(matchers.iter().find_map(|m| m(self, s)))
    }

    fn push(&mut self, statement: Statement) {
        debug!("Gerber: {statement:?}");
        match &statement {
            Statement::FormatSpec(fs) => {
                if fs.x_format != fs.y_format {
                    warn!(
                        "Gerber: X format {} differs from Y format {}, using X for both",
                        fs.x_format, fs.y_format
                    );
                }
                self.settings = self
                    .settings
                    .with_zero_suppression(fs.zero_suppression)
                    .with_notation(fs.notation);
                // An out-of-range format is kept on the statement; decoding
                // with it reports the Format error at the first coordinate.
                self.settings.format = fs.x_format;
            }
            Statement::Mode { units } | Statement::Units { units } => {
                self.settings = self.settings.with_units(*units);
            }
            Statement::Notation { notation } => {
                self.settings = self.settings.with_notation(*notation);
            }
            _ => {}
        }
        self.statements.push(statement);
    }

    fn push_unknown(&mut self, raw: String) {
        warn!("Gerber: unrecognised statement '{raw}'");
        self.statements.push(Statement::Unknown { raw });
    }

    /// `(G0?[123])?(X n)?(Y n)?(I n)?(J n)?(D0?[123])?*` with at least one
    /// element present.
    fn match_coordinate(&mut self, s: &str) -> Result<Option<usize>, GerberError> {
        let bytes = s.as_bytes();
        let mut pos = 0;
        let mut coordinate = Coordinate::default();
        let mut present = false;

        if bytes.first() == Some(&b'G') {
            let mut p = 1;
            if bytes.get(p) == Some(&b'0') {
                p += 1;
            }
            let function = match bytes.get(p) {
                Some(b'1') => Some(FunctionCode::Linear),
                Some(b'2') => Some(FunctionCode::ClockwiseArc),
                Some(b'3') => Some(FunctionCode::CounterClockwiseArc),
                _ => None,
            };
            match function {
                Some(f) => {
                    coordinate.function = Some(f);
                    pos = p + 1;
                    present = true;
                }
                None => return Ok(None),
            }
        }

        let mut fields: [Option<&str>; 4] = [None; 4];
        for (slot, letter) in fields.iter_mut().zip([b'X', b'Y', b'I', b'J']) {
            if bytes.get(pos) != Some(&letter) {
                continue;
            }
            let start = pos + 1;
            let mut end = start;
            if matches!(bytes.get(end), Some(b'+') | Some(b'-')) {
                end += 1;
            }
            let digits_start = end;
            while bytes
                .get(end)
                .is_some_and(|b| b.is_ascii_digit() || *b == b'.')
            {
                end += 1;
            }
            if end == digits_start {
                return Ok(None);
            }
            *slot = Some(&s[start..end]);
            pos = end;
            present = true;
        }

        if bytes.get(pos) == Some(&b'D') {
            let mut p = pos + 1;
            if bytes.get(p) == Some(&b'0') {
                p += 1;
            }
            let op = match bytes.get(p) {
                Some(b'1') => Operation::Interpolate,
                Some(b'2') => Operation::Move,
                Some(b'3') => Operation::Flash,
                _ => return Ok(None),
            };
            coordinate.operation = Some(op);
            pos = p + 1;
            present = true;
        }

        if !present || bytes.get(pos) != Some(&b'*') {
            return Ok(None);
        }

        let (format, zs) = (self.settings.format, self.settings.zero_suppression);
        let mut values = [None; 4];
        for (value, field) in values.iter_mut().zip(fields) {
            let Some(field) = field else { continue };
            match coord::decode(field, format, zs) {
                Ok(v) => *value = Some(v),
                // A malformed number leaves the statement to the residue path.
                Err(GerberError::Parse(_)) => return Ok(None),
                Err(e) => return Err(e),
            }
        }
        [coordinate.x, coordinate.y, coordinate.i, coordinate.j] = values;
        self.push(Statement::Coordinate(coordinate));
        Ok(Some(pos + 1))
    }

    /// `(G54)?D<n>*`
    fn match_aperture_select(&mut self, s: &str) -> Option<usize> {
        let body = s.strip_prefix("G54").unwrap_or(s);
        let prefix = s.len() - body.len();
        let digits = body.strip_prefix('D')?;
        let end = digits.find(|c: char| !c.is_ascii_digit())?;
        if end == 0 || !digits[end..].starts_with('*') {
            return None;
        }
        let code = digits[..end].parse().ok()?;
        self.push(Statement::ApertureSelect { code });
        Some(prefix + 1 + end + 1)
    }

    /// `%…%`. AM blocks keep their whole body; any other block is split on
    /// `*` into individual parameters.
    fn match_parameter_block(&mut self, s: &str) -> Option<usize> {
        let inner = s.strip_prefix('%')?;
        let close = inner.find('%')?;
        let body = inner[..close].trim();
        if body.starts_with("AM") {
            self.push(Statement::parse_macro_block(body));
        } else {
            for param in body.split('*').map(str::trim).filter(|p| !p.is_empty()) {
                let statement = Statement::parse_parameter(param);
                self.push(statement);
            }
        }
        Some(close + 2)
    }

    fn match_region_mode(&mut self, s: &str) -> Option<usize> {
        let mode = if s.starts_with("G36*") {
            RegionMode::On
        } else if s.starts_with("G37*") {
            RegionMode::Off
        } else {
            return None;
        };
        self.push(Statement::RegionMode { mode });
        Some(4)
    }

    fn match_quadrant_mode(&mut self, s: &str) -> Option<usize> {
        let mode = if s.starts_with("G74*") {
            QuadrantMode::Single
        } else if s.starts_with("G75*") {
            QuadrantMode::Multi
        } else {
            return None;
        };
        self.push(Statement::QuadrantMode { mode });
        Some(4)
    }

    /// `G04 <text>*` (also written `G4`).
    fn match_comment(&mut self, s: &str) -> Option<usize> {
        let text = s
            .strip_prefix("G04")
            .or_else(|| s.strip_prefix("G4").filter(|t| !t.starts_with(|c: char| c.is_ascii_digit())))?;
        let star = text.find('*')?;
        let consumed = s.len() - text.len() + star + 1;
        self.push(Statement::Comment {
            text: text[..star].trim().to_string(),
        });
        Some(consumed)
    }

    /// G70/G71 units and G90/G91 notation.
    fn match_deprecated(&mut self, s: &str) -> Option<usize> {
        let statement = match s.get(..4)? {
            "G70*" => Statement::Units { units: Units::Inch },
            "G71*" => Statement::Units {
                units: Units::Metric,
            },
            "G90*" => Statement::Notation {
                notation: Notation::Absolute,
            },
            "G91*" => Statement::Notation {
                notation: Notation::Incremental,
            },
            _ => return None,
        };
        self.push(statement);
        Some(4)
    }

    /// M02, or the older M00/M01 stops.
    fn match_end_of_file(&mut self, s: &str) -> Option<usize> {
        if !matches!(s.get(..4)?, "M00*" | "M01*" | "M02*") {
            return None;
        }
        self.push(Statement::EndOfFile);
        Some(4)
    }
}

/// Split input into logical lines, joining a `%` block that spans several
/// physical lines into one.
fn logical_lines(input: &str) -> Vec<String> {
    let mut lines = Vec::new();
    let mut block: Option<String> = None;
    for raw in input.lines() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        match block.as_mut() {
            Some(open) => {
                open.push_str(line);
                if line.contains('%') {
                    lines.extend(block.take());
                }
            }
            None if line.starts_with('%') && line.matches('%').count() == 1 => {
                block = Some(line.to_string());
            }
            None => lines.push(line.to_string()),
        }
    }
    // An unclosed block still goes through the matchers.
    lines.extend(block);
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{CoordinateFormat, ZeroSuppression};

    fn statements(input: &str) -> Vec<Statement> {
        tokenize(input).unwrap().statements
    }

    #[test]
    fn test_header_updates_settings() {
        let out = tokenize("%FSTIX24Y24*%\n%MOMM*%\n").unwrap();
        assert_eq!(out.statements.len(), 2);
        assert_eq!(out.settings.zero_suppression, ZeroSuppression::Trailing);
        assert_eq!(out.settings.notation, Notation::Incremental);
        assert_eq!(out.settings.units, Units::Metric);
        assert_eq!(out.settings.format, CoordinateFormat::new(2, 4));
    }

    #[test]
    fn test_coordinates_decoded_with_snapshot() {
        let stmts = statements("%FSLAX25Y25*%\nX100000Y-50000D02*\nG01X1Y2*\n");
        match &stmts[1] {
            Statement::Coordinate(c) => {
                assert_eq!(c.x, Some(1.0));
                assert_eq!(c.y, Some(-0.5));
                assert_eq!(c.operation, Some(Operation::Move));
                assert_eq!(c.function, None);
            }
            other => panic!("expected Coordinate, got: {other:?}"),
        }
        match &stmts[2] {
            Statement::Coordinate(c) => {
                assert_eq!(c.function, Some(FunctionCode::Linear));
                assert_eq!(c.x, Some(0.00001));
                assert_eq!(c.operation, None);
            }
            other => panic!("expected Coordinate, got: {other:?}"),
        }
    }

    #[test]
    fn test_several_statements_per_line() {
        let stmts = statements("G01*G75*D10*X0Y0D03*M02*");
        assert_eq!(stmts.len(), 5);
        assert!(matches!(stmts[0], Statement::Coordinate(_)));
        assert_eq!(
            stmts[1],
            Statement::QuadrantMode {
                mode: QuadrantMode::Multi
            }
        );
        assert_eq!(stmts[2], Statement::ApertureSelect { code: 10 });
        assert_eq!(stmts[4], Statement::EndOfFile);
    }

    #[test]
    fn test_parameter_block_split() {
        let stmts = statements("%FSLAX24Y24*MOIN*IPPOS*%");
        assert_eq!(stmts.len(), 3);
        assert_eq!(stmts[1], Statement::Mode { units: Units::Inch });
    }

    #[test]
    fn test_multiline_macro_block() {
        let stmts = statements("%AMDONUT*\n1,1,$1,0,0*\n1,0,$2,0,0*%\n");
        assert_eq!(stmts.len(), 1);
        match &stmts[0] {
            Statement::ApertureMacro(am) => {
                assert_eq!(am.name, "DONUT");
                assert_eq!(am.source, "1,1,$1,0,0*1,0,$2,0,0*");
            }
            other => panic!("expected ApertureMacro, got: {other:?}"),
        }
    }

    #[test]
    fn test_g54_aperture_select_and_comment() {
        let stmts = statements("G54D11*\nG04 hello world*\nG4 legacy*\n");
        assert_eq!(stmts[0], Statement::ApertureSelect { code: 11 });
        assert_eq!(
            stmts[1],
            Statement::Comment {
                text: "hello world".into()
            }
        );
        assert_eq!(
            stmts[2],
            Statement::Comment {
                text: "legacy".into()
            }
        );
    }

    #[test]
    fn test_region_quadrant_and_deprecated() {
        let stmts = statements("G36*\nG37*\nG74*\nG70*\nG91*\n");
        assert_eq!(
            stmts,
            vec![
                Statement::RegionMode {
                    mode: RegionMode::On
                },
                Statement::RegionMode {
                    mode: RegionMode::Off
                },
                Statement::QuadrantMode {
                    mode: QuadrantMode::Single
                },
                Statement::Units { units: Units::Inch },
                Statement::Notation {
                    notation: Notation::Incremental
                },
            ]
        );
    }

    #[test]
    fn test_unknown_residue() {
        let stmts = statements("G55*D10*\n");
        assert_eq!(
            stmts[0],
            Statement::Unknown {
                raw: "G55*".into()
            }
        );
        assert_eq!(stmts[1], Statement::ApertureSelect { code: 10 });
    }

    #[test]
    fn test_residue_carried_to_next_line() {
        let stmts = statements("%FSLAX25Y25*%\nX100000\nY200000D03*\n");
        assert_eq!(stmts.len(), 2);
        match &stmts[1] {
            Statement::Coordinate(c) => {
                assert_eq!(c.x, Some(1.0));
                assert_eq!(c.y, Some(2.0));
                assert_eq!(c.operation, Some(Operation::Flash));
            }
            other => panic!("expected Coordinate, got: {other:?}"),
        }
    }

    #[test]
    fn test_unterminated_residue_at_end() {
        let stmts = statements("D10*\nX100");
        assert_eq!(
            stmts.last(),
            Some(&Statement::Unknown { raw: "X100".into() })
        );
    }

    #[test]
    fn test_malformed_number_becomes_unknown() {
        let stmts = statements("%FSLAX25Y25*%\nX1.2.3Y0D02*\nX0Y0D03*\n");
        assert_eq!(stmts.len(), 3);
        assert_eq!(
            stmts[1],
            Statement::Unknown {
                raw: "X1.2.3Y0D02*".into()
            }
        );
        match &stmts[2] {
            Statement::Coordinate(c) => assert_eq!(c.operation, Some(Operation::Flash)),
            other => panic!("expected Coordinate, got: {other:?}"),
        }
    }

    #[test]
    fn test_bad_format_fails_at_coordinate() {
        let result = tokenize("%FSLAX29Y29*%\nX1D02*\n");
        assert!(matches!(result, Err(GerberError::Format(_))));
    }

    #[test]
    fn test_empty_input() {
        assert!(statements("").is_empty());
        assert!(statements("  \n\r\n\t ").is_empty());
    }
}
