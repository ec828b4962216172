//! File-wide settings shared by every statement and primitive of one file.
//!
//! [`FileSettings`] is a small `Copy` value. Operations that change a setting
//! produce a new snapshot instead of mutating the one other code holds.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::GerberError;

/// Millimetres per inch.
pub const MM_PER_INCH: f64 = 25.4;

pub const MAX_INTEGER_DIGITS: u8 = 6;
pub const MAX_DECIMAL_DIGITS: u8 = 7;

/// Coordinate notation from the FS statement (or deprecated G90/G91).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Notation {
    #[default]
    Absolute,
    Incremental,
}

/// Unit system from the MO statement (or deprecated G70/G71).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    #[default]
    Inch,
    Metric,
}

impl Units {
    /// Factor that converts a length in `self` to a length in `target`.
    pub fn factor_to(self, target: Units) -> f64 {
        match (self, target) {
            (Units::Inch, Units::Metric) => MM_PER_INCH,
            (Units::Metric, Units::Inch) => 1.0 / MM_PER_INCH,
            _ => 1.0,
        }
    }
}

/// Which end of a fixed-width digit string has its zeros omitted.
///
/// With format (2, 5), leading suppression writes 0.00001 as `"1"`;
/// trailing suppression writes 10.0 as `"1"`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ZeroSuppression {
    Leading,
    #[default]
    Trailing,
}

/// Integer/decimal digit layout of coordinate fields, e.g. `X25` is (2, 5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CoordinateFormat {
    pub integer: u8,
    pub decimal: u8,
}

impl CoordinateFormat {
    pub const fn new(integer: u8, decimal: u8) -> Self {
        Self { integer, decimal }
    }

    pub fn total_digits(&self) -> usize {
        self.integer as usize + self.decimal as usize
    }

    pub fn validate(&self) -> Result<(), GerberError> {
        if self.integer > MAX_INTEGER_DIGITS || self.decimal > MAX_DECIMAL_DIGITS {
            return Err(GerberError::Format(format!(
                "format {}.{} exceeds {MAX_INTEGER_DIGITS} integer / {MAX_DECIMAL_DIGITS} decimal digits",
                self.integer, self.decimal
            )));
        }
        Ok(())
    }
}

impl Default for CoordinateFormat {
    fn default() -> Self {
        Self::new(2, 5)
    }
}

impl fmt::Display for CoordinateFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.integer, self.decimal)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FileSettings {
    pub notation: Notation,
    pub units: Units,
    pub zero_suppression: ZeroSuppression,
    pub format: CoordinateFormat,
}

impl FileSettings {
    pub fn new(
        notation: Notation,
        units: Units,
        zero_suppression: ZeroSuppression,
        format: CoordinateFormat,
    ) -> Result<Self, GerberError> {
        format.validate()?;
        Ok(Self {
            notation,
            units,
            zero_suppression,
            format,
        })
    }

    pub fn with_units(self, units: Units) -> Self {
        Self { units, ..self }
    }

    pub fn with_notation(self, notation: Notation) -> Self {
        Self { notation, ..self }
    }

    pub fn with_zero_suppression(self, zero_suppression: ZeroSuppression) -> Self {
        Self {
            zero_suppression,
            ..self
        }
    }

    pub fn with_format(self, format: CoordinateFormat) -> Result<Self, GerberError> {
        format.validate()?;
        Ok(Self { format, ..self })
    }
}

impl FromStr for Notation {
    type Err = GerberError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "absolute" | "a" => Ok(Notation::Absolute),
            "incremental" | "i" => Ok(Notation::Incremental),
            other => Err(GerberError::Format(format!("unknown notation: {other}"))),
        }
    }
}

impl FromStr for Units {
    type Err = GerberError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "inch" | "in" => Ok(Units::Inch),
            "metric" | "mm" => Ok(Units::Metric),
            other => Err(GerberError::Format(format!("unknown units: {other}"))),
        }
    }
}

impl FromStr for ZeroSuppression {
    type Err = GerberError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "leading" | "l" => Ok(ZeroSuppression::Leading),
            "trailing" | "t" => Ok(ZeroSuppression::Trailing),
            other => Err(GerberError::Format(format!(
                "unknown zero suppression: {other}"
            ))),
        }
    }
}
