//! Gerber statements.
//!
//! A [`Statement`] is what the tokenizer produces for one `*`-terminated
//! command or one parameter inside a `%…%` block. Coordinate fields are held
//! decoded, in file units; [`Statement::to_gerber`] re-encodes them with the
//! settings in effect.

use log::warn;
use serde::Serialize;

use super::coord;
use crate::error::GerberError;
use crate::primitives::{Polarity, QuadrantMode};
use crate::settings::{CoordinateFormat, FileSettings, Notation, Units, ZeroSuppression};
use crate::types::round_f64;

/// Interpolation function code: G01, G02 or G03.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FunctionCode {
    Linear,
    ClockwiseArc,
    CounterClockwiseArc,
}

impl FunctionCode {
    fn code(self) -> &'static str {
        match self {
            FunctionCode::Linear => "G01",
            FunctionCode::ClockwiseArc => "G02",
            FunctionCode::CounterClockwiseArc => "G03",
        }
    }
}

/// Operation code: D01 (stroke), D02 (move) or D03 (flash).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Interpolate,
    Move,
    Flash,
}

impl Operation {
    fn code(self) -> &'static str {
        match self {
            Operation::Interpolate => "D01",
            Operation::Move => "D02",
            Operation::Flash => "D03",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RegionMode {
    On,
    Off,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImagePolarity {
    #[default]
    Positive,
    Negative,
}

/// `%FS…*%`
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FormatSpec {
    pub zero_suppression: ZeroSuppression,
    pub notation: Notation,
    pub x_format: CoordinateFormat,
    pub y_format: CoordinateFormat,
}

/// Aperture shape named in an AD statement.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "name", rename_all = "lowercase")]
pub enum ApertureShape {
    Circle,
    Rectangle,
    Obround,
    Polygon,
    Macro(String),
}

impl ApertureShape {
    fn parse(name: &str) -> ApertureShape {
        match name {
            "C" => ApertureShape::Circle,
            "R" => ApertureShape::Rectangle,
            "O" => ApertureShape::Obround,
            "P" => ApertureShape::Polygon,
            other => ApertureShape::Macro(other.to_string()),
        }
    }

    fn name(&self) -> &str {
        match self {
            ApertureShape::Circle => "C",
            ApertureShape::Rectangle => "R",
            ApertureShape::Obround => "O",
            ApertureShape::Polygon => "P",
            ApertureShape::Macro(name) => name,
        }
    }
}

/// `%ADD<code><shape>,<m1>X<m2>…*%`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApertureDefinition {
    pub code: u32,
    pub shape: ApertureShape,
    pub modifiers: Vec<f64>,
}

impl ApertureDefinition {
    /// Scale the length modifiers of a standard aperture. Polygon vertex
    /// count and rotation are not lengths; macro modifiers are opaque.
    fn scale(&mut self, factor: f64) {
        let skip: &[usize] = match self.shape {
            ApertureShape::Polygon => &[1, 2],
            ApertureShape::Macro(_) => return,
            _ => &[],
        };
        for (idx, m) in self.modifiers.iter_mut().enumerate() {
            if !skip.contains(&idx) {
                *m *= factor;
            }
        }
    }
}

/// `%AM<name>*<body>%`. The body is kept verbatim and compiled on first use.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApertureMacro {
    pub name: String,
    pub source: String,
}

/// A coordinate statement: optional function code, coordinate fields and
/// operation code.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Coordinate {
    pub function: Option<FunctionCode>,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub i: Option<f64>,
    pub j: Option<f64>,
    pub operation: Option<Operation>,
}

impl Coordinate {
    fn scale(&mut self, factor: f64) {
        for v in [&mut self.x, &mut self.y, &mut self.i, &mut self.j]
            .into_iter()
            .flatten()
        {
            *v *= factor;
        }
    }

    fn translate(&mut self, dx: f64, dy: f64) {
        if let Some(x) = self.x.as_mut() {
            *x += dx;
        }
        if let Some(y) = self.y.as_mut() {
            *y += dy;
        }
    }
}

/// X2 attribute statements. Carried through unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeKind {
    File,
    Aperture,
    Delete,
    Object,
}

impl AttributeKind {
    fn code(self) -> &'static str {
        match self {
            AttributeKind::File => "TF",
            AttributeKind::Aperture => "TA",
            AttributeKind::Delete => "TD",
            AttributeKind::Object => "TO",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Statement {
    FormatSpec(FormatSpec),
    /// `%MO…*%`
    Mode { units: Units },
    LevelPolarity { polarity: Polarity },
    ApertureDefinition(ApertureDefinition),
    ApertureMacro(ApertureMacro),
    ApertureSelect { code: u32 },
    Coordinate(Coordinate),
    RegionMode { mode: RegionMode },
    QuadrantMode { mode: QuadrantMode },
    Comment { text: String },
    /// Deprecated G70 / G71.
    Units { units: Units },
    /// Deprecated G90 / G91.
    Notation { notation: Notation },
    ImagePolarity { polarity: ImagePolarity },
    ImageName { name: String },
    ImageRotation { degrees: f64 },
    AxisSelect { axes: String },
    Mirror { a: bool, b: bool },
    Offset { a: f64, b: f64 },
    ScaleFactor { a: f64, b: f64 },
    LayerName { name: String },
    Attribute { kind: AttributeKind, body: String },
    EndOfFile,
    Unknown { raw: String },
}

impl Statement {
    /// Parse one parameter from inside a `%…%` block, without the `*`.
    /// Unrecognised parameters become [`Statement::Unknown`].
    pub fn parse_parameter(param: &str) -> Statement {
        let param = param.trim();
        let parsed = match param.get(..2).unwrap_or("") {
            "FS" => parse_format_spec(param),
            "MO" => match &param[2..] {
                "IN" => Some(Statement::Mode { units: Units::Inch }),
                "MM" => Some(Statement::Mode {
                    units: Units::Metric,
                }),
                _ => None,
            },
            "LP" => match &param[2..] {
                "D" => Some(Statement::LevelPolarity {
                    polarity: Polarity::Dark,
                }),
                "C" => Some(Statement::LevelPolarity {
                    polarity: Polarity::Clear,
                }),
                _ => None,
            },
            "AD" => parse_aperture_definition(param),
            "AM" => {
                // A lone AM parameter has no body; the lexer hands complete
                // macro blocks to `parse_macro_block` instead.
                let name = param[2..].trim();
                (!name.is_empty()).then(|| {
                    Statement::ApertureMacro(ApertureMacro {
                        name: name.to_string(),
                        source: String::new(),
                    })
                })
            }
            "IP" => match &param[2..] {
                "POS" => Some(Statement::ImagePolarity {
                    polarity: ImagePolarity::Positive,
                }),
                "NEG" => Some(Statement::ImagePolarity {
                    polarity: ImagePolarity::Negative,
                }),
                _ => None,
            },
            "IN" => Some(Statement::ImageName {
                name: param[2..].to_string(),
            }),
            "IR" => param[2..]
                .parse()
                .ok()
                .map(|degrees| Statement::ImageRotation { degrees }),
            "AS" => Some(Statement::AxisSelect {
                axes: param[2..].to_string(),
            }),
            "MI" => Some(Statement::Mirror {
                a: letter_value(&param[2..], 'A').is_some_and(|v| v == 1.0),
                b: letter_value(&param[2..], 'B').is_some_and(|v| v == 1.0),
            }),
            "OF" => Some(Statement::Offset {
                a: letter_value(&param[2..], 'A').unwrap_or(0.0),
                b: letter_value(&param[2..], 'B').unwrap_or(0.0),
            }),
            "SF" => Some(Statement::ScaleFactor {
                a: letter_value(&param[2..], 'A').unwrap_or(1.0),
                b: letter_value(&param[2..], 'B').unwrap_or(1.0),
            }),
            "LN" => Some(Statement::LayerName {
                name: param[2..].to_string(),
            }),
            "TF" => Some(attribute(AttributeKind::File, param)),
            "TA" => Some(attribute(AttributeKind::Aperture, param)),
            "TD" => Some(attribute(AttributeKind::Delete, param)),
            "TO" => Some(attribute(AttributeKind::Object, param)),
            _ => None,
        };
        parsed.unwrap_or_else(|| {
            warn!("Gerber: unrecognised parameter '{param}'");
            Statement::Unknown {
                raw: format!("%{param}*%"),
            }
        })
    }

    /// Parse the body of an `%AM…%` block: the macro name, then its source.
    pub fn parse_macro_block(body: &str) -> Statement {
        let body = body.strip_prefix("AM").unwrap_or(body);
        let (name, source) = body.split_once('*').unwrap_or((body, ""));
        Statement::ApertureMacro(ApertureMacro {
            name: name.trim().to_string(),
            source: source.to_string(),
        })
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Statement::Unknown { .. })
    }

    /// Serialise back to Gerber text using `settings` for coordinate fields.
    pub fn to_gerber(&self, settings: &FileSettings) -> Result<String, GerberError> {
        Ok(match self {
            Statement::FormatSpec(fs) => format!(
                "%FS{}{}X{}Y{}*%",
                match fs.zero_suppression {
                    ZeroSuppression::Leading => 'L',
                    ZeroSuppression::Trailing => 'T',
                },
                match fs.notation {
                    Notation::Absolute => 'A',
                    Notation::Incremental => 'I',
                },
                fs.x_format,
                fs.y_format
            ),
            Statement::Mode { units } => format!(
                "%MO{}*%",
                match units {
                    Units::Inch => "IN",
                    Units::Metric => "MM",
                }
            ),
            Statement::LevelPolarity { polarity } => format!(
                "%LP{}*%",
                match polarity {
                    Polarity::Dark => 'D',
                    Polarity::Clear => 'C',
                }
            ),
            Statement::ApertureDefinition(ad) => {
                if ad.modifiers.is_empty() {
                    format!("%ADD{}{}*%", ad.code, ad.shape.name())
                } else {
                    let mods: Vec<String> =
                        ad.modifiers.iter().map(|m| format_number(*m)).collect();
                    format!("%ADD{}{},{}*%", ad.code, ad.shape.name(), mods.join("X"))
                }
            }
            Statement::ApertureMacro(am) => format!("%AM{}*{}%", am.name, am.source),
            Statement::ApertureSelect { code } => format!("D{code}*"),
            Statement::Coordinate(c) => {
                let mut out = String::new();
                if let Some(function) = c.function {
                    out.push_str(function.code());
                }
                for (letter, value) in [('X', c.x), ('Y', c.y), ('I', c.i), ('J', c.j)] {
                    if let Some(v) = value {
                        out.push(letter);
                        out.push_str(&coord::encode(
                            v,
                            settings.format,
                            settings.zero_suppression,
                        )?);
                    }
                }
                if let Some(op) = c.operation {
                    out.push_str(op.code());
                }
                out.push('*');
                out
            }
            Statement::RegionMode { mode } => match mode {
                RegionMode::On => "G36*".to_string(),
                RegionMode::Off => "G37*".to_string(),
            },
            Statement::QuadrantMode { mode } => match mode {
                QuadrantMode::Single => "G74*".to_string(),
                QuadrantMode::Multi => "G75*".to_string(),
            },
            Statement::Comment { text } => format!("G04 {text}*"),
            Statement::Units { units } => match units {
                Units::Inch => "G70*".to_string(),
                Units::Metric => "G71*".to_string(),
            },
            Statement::Notation { notation } => match notation {
                Notation::Absolute => "G90*".to_string(),
                Notation::Incremental => "G91*".to_string(),
            },
            Statement::ImagePolarity { polarity } => match polarity {
                ImagePolarity::Positive => "%IPPOS*%".to_string(),
                ImagePolarity::Negative => "%IPNEG*%".to_string(),
            },
            Statement::ImageName { name } => format!("%IN{name}*%"),
            Statement::ImageRotation { degrees } => format!("%IR{}*%", format_number(*degrees)),
            Statement::AxisSelect { axes } => format!("%AS{axes}*%"),
            Statement::Mirror { a, b } => format!("%MIA{}B{}*%", u8::from(*a), u8::from(*b)),
            Statement::Offset { a, b } => {
                format!("%OFA{}B{}*%", format_number(*a), format_number(*b))
            }
            Statement::ScaleFactor { a, b } => {
                format!("%SFA{}B{}*%", format_number(*a), format_number(*b))
            }
            Statement::LayerName { name } => format!("%LN{name}*%"),
            Statement::Attribute { kind, body } => format!("%{}{body}*%", kind.code()),
            Statement::EndOfFile => "M02*".to_string(),
            Statement::Unknown { raw } => raw.clone(),
        })
    }

    /// Multiply every length carried by the statement by `factor` and
    /// retarget unit statements to `target`.
    pub fn convert_units(&mut self, factor: f64, target: Units) {
        match self {
            Statement::Coordinate(c) => c.scale(factor),
            Statement::ApertureDefinition(ad) => ad.scale(factor),
            Statement::Offset { a, b } => {
                *a *= factor;
                *b *= factor;
            }
            Statement::Mode { units } | Statement::Units { units } => *units = target,
            _ => {}
        }
    }

    /// Translate absolute X/Y fields of a coordinate statement.
    pub fn offset(&mut self, dx: f64, dy: f64) {
        if let Statement::Coordinate(c) = self {
            c.translate(dx, dy);
        }
    }
}

/// Shortest decimal rendering of a modifier, rounded to 6 places.
fn format_number(v: f64) -> String {
    let r = round_f64(v, 6);
    if r == 0.0 {
        "0".to_string()
    } else {
        format!("{r}")
    }
}

fn attribute(kind: AttributeKind, param: &str) -> Statement {
    Statement::Attribute {
        kind,
        body: param[2..].to_string(),
    }
}

/// Extract the number after a key letter in an `A<val>B<val>` string.
fn letter_value(s: &str, key: char) -> Option<f64> {
    let pos = s.find(key)?;
    let after = &s[pos + 1..];
    let end = after
        .find(|c: char| c.is_ascii_alphabetic())
        .unwrap_or(after.len());
    after[..end].parse().ok()
}

/// `FS[LT][AI]X<i><d>Y<i><d>`
fn parse_format_spec(param: &str) -> Option<Statement> {
    let mut chars = param[2..].chars().peekable();
    let mut zero_suppression = ZeroSuppression::Leading;
    let mut notation = Notation::Absolute;
    while let Some(&c) = chars.peek() {
        match c {
            'L' => zero_suppression = ZeroSuppression::Leading,
            'T' => zero_suppression = ZeroSuppression::Trailing,
            // No suppression: decoding as leading-suppressed is exact.
            'D' => zero_suppression = ZeroSuppression::Leading,
            'A' => notation = Notation::Absolute,
            'I' => notation = Notation::Incremental,
            _ => break,
        }
        chars.next();
    }
    let rest: String = chars.collect();
    let x_pos = rest.find('X')?;
    let y_pos = rest.find('Y')?;
    if y_pos < x_pos {
        return None;
    }
    let x_format = parse_digit_pair(&rest[x_pos + 1..y_pos])?;
    let y_format = parse_digit_pair(&rest[y_pos + 1..])?;
    Some(Statement::FormatSpec(FormatSpec {
        zero_suppression,
        notation,
        x_format,
        y_format,
    }))
}

fn parse_digit_pair(s: &str) -> Option<CoordinateFormat> {
    let bytes = s.as_bytes();
    if bytes.len() != 2 || !bytes.iter().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(CoordinateFormat::new(bytes[0] - b'0', bytes[1] - b'0'))
}

/// `ADD<code><shape>[,<m1>X<m2>…]`
fn parse_aperture_definition(param: &str) -> Option<Statement> {
    let s = param[2..].strip_prefix('D')?;
    let shape_pos = s.find(|c: char| !c.is_ascii_digit())?;
    let code: u32 = s[..shape_pos].parse().ok()?;
    let rest = &s[shape_pos..];
    let (shape, modifiers) = match rest.split_once(',') {
        Some((shape, mods)) => (shape, mods),
        None => (rest, ""),
    };
    if shape.is_empty() {
        return None;
    }
    let modifiers = if modifiers.trim().is_empty() {
        Vec::new()
    } else {
        modifiers
            .split('X')
            .map(|m| m.trim().parse::<f64>())
            .collect::<Result<Vec<_>, _>>()
            .ok()?
    };
    Some(Statement::ApertureDefinition(ApertureDefinition {
        code,
        shape: ApertureShape::parse(shape),
        modifiers,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_spec() {
        match Statement::parse_parameter("FSLAX25Y36") {
            Statement::FormatSpec(fs) => {
                assert_eq!(fs.zero_suppression, ZeroSuppression::Leading);
                assert_eq!(fs.notation, Notation::Absolute);
                assert_eq!(fs.x_format, CoordinateFormat::new(2, 5));
                assert_eq!(fs.y_format, CoordinateFormat::new(3, 6));
            }
            other => panic!("expected FormatSpec, got: {other:?}"),
        }
        match Statement::parse_parameter("FSTIX24Y24") {
            Statement::FormatSpec(fs) => {
                assert_eq!(fs.zero_suppression, ZeroSuppression::Trailing);
                assert_eq!(fs.notation, Notation::Incremental);
            }
            other => panic!("expected FormatSpec, got: {other:?}"),
        }
    }

    #[test]
    fn test_aperture_definitions() {
        assert_eq!(
            Statement::parse_parameter("ADD10C,0.020"),
            Statement::ApertureDefinition(ApertureDefinition {
                code: 10,
                shape: ApertureShape::Circle,
                modifiers: vec![0.020],
            })
        );
        assert_eq!(
            Statement::parse_parameter("ADD11R,0.040X0.020"),
            Statement::ApertureDefinition(ApertureDefinition {
                code: 11,
                shape: ApertureShape::Rectangle,
                modifiers: vec![0.040, 0.020],
            })
        );
        assert_eq!(
            Statement::parse_parameter("ADD20THERMAL80,0.5X0.3"),
            Statement::ApertureDefinition(ApertureDefinition {
                code: 20,
                shape: ApertureShape::Macro("THERMAL80".into()),
                modifiers: vec![0.5, 0.3],
            })
        );
        assert_eq!(
            Statement::parse_parameter("ADD21DONUT"),
            Statement::ApertureDefinition(ApertureDefinition {
                code: 21,
                shape: ApertureShape::Macro("DONUT".into()),
                modifiers: vec![],
            })
        );
    }

    #[test]
    fn test_bad_aperture_definition_is_unknown() {
        assert!(Statement::parse_parameter("ADD10C,abc").is_unknown());
        assert!(Statement::parse_parameter("ADX").is_unknown());
    }

    #[test]
    fn test_deprecated_parameters() {
        assert_eq!(
            Statement::parse_parameter("IPNEG"),
            Statement::ImagePolarity {
                polarity: ImagePolarity::Negative
            }
        );
        assert_eq!(
            Statement::parse_parameter("OFA0.5B-1"),
            Statement::Offset { a: 0.5, b: -1.0 }
        );
        assert_eq!(
            Statement::parse_parameter("MIA1B0"),
            Statement::Mirror { a: true, b: false }
        );
        assert_eq!(
            Statement::parse_parameter("IR90"),
            Statement::ImageRotation { degrees: 90.0 }
        );
    }

    #[test]
    fn test_attribute_and_unknown() {
        assert_eq!(
            Statement::parse_parameter("TF.FileFunction,Copper,L1,Top"),
            Statement::Attribute {
                kind: AttributeKind::File,
                body: ".FileFunction,Copper,L1,Top".into(),
            }
        );
        assert_eq!(
            Statement::parse_parameter("XYZ123"),
            Statement::Unknown {
                raw: "%XYZ123*%".into()
            }
        );
    }

    #[test]
    fn test_macro_block() {
        match Statement::parse_macro_block("AMDONUT*1,1,$1,0,0*1,0,$2,0,0*") {
            Statement::ApertureMacro(am) => {
                assert_eq!(am.name, "DONUT");
                assert_eq!(am.source, "1,1,$1,0,0*1,0,$2,0,0*");
            }
            other => panic!("expected ApertureMacro, got: {other:?}"),
        }
    }

    #[test]
    fn test_to_gerber() {
        let settings = FileSettings::default()
            .with_zero_suppression(ZeroSuppression::Leading)
            .with_units(Units::Metric);
        let coord = Statement::Coordinate(Coordinate {
            function: Some(FunctionCode::ClockwiseArc),
            x: Some(1.0),
            y: Some(-0.5),
            i: Some(0.00001),
            j: None,
            operation: Some(Operation::Interpolate),
        });
        assert_eq!(
            coord.to_gerber(&settings).unwrap(),
            "G02X100000Y-50000I1D01*"
        );
        assert_eq!(
            Statement::parse_parameter("ADD11R,0.04X0.02")
                .to_gerber(&settings)
                .unwrap(),
            "%ADD11R,0.04X0.02*%"
        );
        assert_eq!(
            Statement::parse_parameter("FSLAX25Y25")
                .to_gerber(&settings)
                .unwrap(),
            "%FSLAX25Y25*%"
        );
        assert_eq!(
            Statement::parse_macro_block("AMC*1,1,$1,0,0*")
                .to_gerber(&settings)
                .unwrap(),
            "%AMC*1,1,$1,0,0*%"
        );
    }

    #[test]
    fn test_convert_units() {
        let mut ad = Statement::parse_parameter("ADD12P,1X6X45X0.5");
        ad.convert_units(25.4, Units::Metric);
        match ad {
            Statement::ApertureDefinition(ad) => {
                assert_eq!(ad.modifiers, vec![25.4, 6.0, 45.0, 12.7]);
            }
            other => panic!("expected ApertureDefinition, got: {other:?}"),
        }

        let mut mode = Statement::Mode { units: Units::Inch };
        mode.convert_units(25.4, Units::Metric);
        assert_eq!(
            mode,
            Statement::Mode {
                units: Units::Metric
            }
        );

        let mut macro_ad = Statement::parse_parameter("ADD13BOX,1X2");
        macro_ad.convert_units(25.4, Units::Metric);
        match macro_ad {
            Statement::ApertureDefinition(ad) => assert_eq!(ad.modifiers, vec![1.0, 2.0]),
            other => panic!("expected ApertureDefinition, got: {other:?}"),
        }
    }

    #[test]
    fn test_offset_only_moves_present_axes() {
        let mut st = Statement::Coordinate(Coordinate {
            x: Some(1.0),
            operation: Some(Operation::Flash),
            ..Default::default()
        });
        st.offset(1.0, 2.0);
        match st {
            Statement::Coordinate(c) => {
                assert_eq!(c.x, Some(2.0));
                assert_eq!(c.y, None);
            }
            other => panic!("expected Coordinate, got: {other:?}"),
        }
    }
}
