//! Error type shared by the sculpture engine and its collaborators.

use thiserror::Error;

/// Errors raised by surface construction, shaping, spectrum loading and I/O.
#[derive(Debug, Error)]
pub enum SculptError {
    /// Grid resolution below 2, out-of-range vertex access, or a spectrum row
    /// whose length does not match the surface.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Spectrum log or configuration value that cannot be parsed.
    #[error("malformed input at line {line}: {reason}")]
    MalformedInput { line: usize, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    /// Audio device or stream setup failure
    #[error("audio error: {0}")]
    Audio(String),

    /// Malformed remote-control packet
    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("render error: {0}")]
    Render(String),
}

impl SculptError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub(crate) fn malformed(line: usize, reason: impl Into<String>) -> Self {
        Self::MalformedInput {
            line,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SculptError>;
