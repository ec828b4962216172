use thiserror::Error;

#[derive(Error, Debug)]
pub enum GerberError {
    /// Invalid settings value or a digit format outside the codec limits.
    #[error("format error: {0}")]
    Format(String),

    /// Malformed macro expression or a contour that does not close.
    #[error("syntax error: {0}")]
    Syntax(String),

    #[error("range error: {0}")]
    Range(String),

    /// A coordinate that is not an (x, y) pair.
    #[error("shape error: {0}")]
    Shape(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("aperture D{0} is not defined")]
    UndefinedAperture(u32),

    #[error("aperture macro '{0}' is not defined")]
    UndefinedMacro(String),

    #[error("{0} issued before any aperture was selected")]
    NoApertureSelected(&'static str),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
