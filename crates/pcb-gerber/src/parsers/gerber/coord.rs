//! Fixed-format coordinate numbers.
//!
//! Coordinate fields are written as bare digit strings whose decimal point
//! is implied by the FS format. With `%FSLAX25Y25*%` the value 1.5 is the
//! seven digit string `0150000`, written `150000` once leading zeros are
//! dropped. Fields containing an explicit `.` are read verbatim.

use crate::error::GerberError;
use crate::settings::{CoordinateFormat, ZeroSuppression};

/// Decode a coordinate field into a number in file units.
pub fn decode(
    value: &str,
    format: CoordinateFormat,
    zero_suppression: ZeroSuppression,
) -> Result<f64, GerberError> {
    format.validate()?;
    let value = value.trim();
    if value.contains('.') {
        return value
            .parse::<f64>()
            .map_err(|_| GerberError::Parse(format!("bad coordinate value: {value}")));
    }

    let (negative, digits) = match value.as_bytes().first() {
        Some(b'-') => (true, &value[1..]),
        Some(b'+') => (false, &value[1..]),
        _ => (false, value),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(GerberError::Parse(format!("bad coordinate value: {value}")));
    }

    let total = format.total_digits();
    let decimal = format.decimal as usize;
    let (int_part, dec_part) = match zero_suppression {
        // Zeros were dropped on the left: the decimal digits are the last ones.
        ZeroSuppression::Leading => {
            let padded = format!("{digits:0>total$}");
            let split = padded.len() - decimal;
            (padded[..split].to_string(), padded[split..].to_string())
        }
        // Zeros were dropped on the right: the integer digits are the first ones.
        ZeroSuppression::Trailing => {
            let padded = format!("{digits:0<total$}");
            let split = (format.integer as usize).min(padded.len());
            (padded[..split].to_string(), padded[split..].to_string())
        }
    };

    let text = format!(
        "{}.{}",
        if int_part.is_empty() { "0" } else { &int_part },
        if dec_part.is_empty() { "0" } else { &dec_part },
    );
    let magnitude = text
        .parse::<f64>()
        .map_err(|_| GerberError::Parse(format!("bad coordinate value: {value}")))?;
    Ok(if negative { -magnitude } else { magnitude })
}

/// Encode a number as a coordinate field, dropping zeros per `zero_suppression`.
pub fn encode(
    value: f64,
    format: CoordinateFormat,
    zero_suppression: ZeroSuppression,
) -> Result<String, GerberError> {
    format.validate()?;
    let scaled = (value.abs() * 10f64.powi(format.decimal as i32)).round() as u64;
    if scaled == 0 {
        return Ok("0".to_string());
    }

    let padded = format!("{scaled:0>width$}", width = format.total_digits());
    let digits = match zero_suppression {
        ZeroSuppression::Leading => padded.trim_start_matches('0'),
        ZeroSuppression::Trailing => padded.trim_end_matches('0'),
    };
    let sign = if value < 0.0 { "-" } else { "" };
    Ok(format!("{sign}{digits}"))
}
