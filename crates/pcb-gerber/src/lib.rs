pub mod error;
pub mod parsers;
pub mod primitives;
pub mod settings;
pub mod types;

use std::path::Path;

use error::GerberError;
use serde::Serialize;

pub use parsers::gerber::interpreter::InterpreterOptions;
pub use parsers::gerber::macros::SubtractSemantics;
pub use parsers::gerber::statements::Statement;
pub use parsers::gerber::GerberFile;
pub use primitives::{BoundingBox, Polarity, Primitive, Shape};
pub use settings::{CoordinateFormat, FileSettings, Notation, Units, ZeroSuppression};

/// Lines scanned for a format signature.
const DETECT_LINES: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    Gerber,
    Excellon,
    Ipc356,
}

/// Detect the format of a file from its first lines.
pub fn detect_format(text: &str) -> Result<FileFormat, GerberError> {
    for line in text.lines().take(DETECT_LINES) {
        let line = line.trim();
        if line.starts_with("M48") {
            return Ok(FileFormat::Excellon);
        }
        if line.contains("%FS") {
            return Ok(FileFormat::Gerber);
        }
        if line.starts_with("P  JOB") || line.starts_with("P JOB") {
            return Ok(FileFormat::Ipc356);
        }
    }
    Err(GerberError::Parse(
        "no Gerber, Excellon or IPC-D-356 signature found".into(),
    ))
}

/// Read a file, detect its format and parse it.
pub fn read(path: impl AsRef<Path>) -> Result<GerberFile, GerberError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)?;
    Ok(load(&text)?.with_filename(path.display().to_string()))
}

/// Detect the format of `text` and parse it.
pub fn load(text: &str) -> Result<GerberFile, GerberError> {
    load_with(text, InterpreterOptions::default())
}

/// Like [`load`], with explicit interpreter options for Gerber input.
pub fn load_with(text: &str, options: InterpreterOptions) -> Result<GerberFile, GerberError> {
    match detect_format(text)? {
        FileFormat::Gerber => GerberFile::load_with(text, options),
        FileFormat::Excellon => Err(GerberError::UnsupportedFormat("Excellon drill".into())),
        FileFormat::Ipc356 => Err(GerberError::UnsupportedFormat("IPC-D-356 netlist".into())),
    }
}
