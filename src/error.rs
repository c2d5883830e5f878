use thiserror::Error;

/// Failure modes surfaced by the renderer core.
///
/// Intersection, BSDF evaluation and ray transforms never fail; everything
/// that can go wrong happens at configuration, scene-load or output time.
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid parameter combination, fatal at job start.
    #[error("configuration error: {0}")]
    Config(String),

    /// Missing attribute, bad value type, unreadable mesh and similar
    /// scene-load failures.
    #[error("scene error: {0}")]
    Scene(String),

    /// Scene description syntax error with source position.
    #[error("parse error at line {line}: {msg}")]
    Parse { line: usize, msg: String },

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}

pub type Result<T> = std::result::Result<T, Error>;
