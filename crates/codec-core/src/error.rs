//! Error handling for the codec crate.

use thiserror::Error;

/// Result type alias for codec operations.
pub type Result<T> = std::result::Result<T, CodecError>;

/// Errors that can occur during sample-domain processing.
#[derive(Error, Debug)]
pub enum CodecError {
    /// Invalid sample rate for an operation.
    #[error("invalid sample rate: in={in_rate}Hz, out={out_rate}Hz")]
    InvalidRate { in_rate: u32, out_rate: u32 },

    /// Input frame has the wrong number of samples.
    #[error("invalid frame size: expected {expected} samples, got {actual}")]
    InvalidFrameSize { expected: usize, actual: usize },

    /// Codeword buffer has the wrong length.
    #[error("invalid codeword length: expected {expected} bytes, got {actual}")]
    InvalidCodewordLength { expected: usize, actual: usize },

    /// Opus encoder or decoder failure.
    #[error("opus {operation} failed: {reason}")]
    Opus { operation: &'static str, reason: String },

    /// External vocoder engine failure.
    #[error("vocoder engine failed: {reason}")]
    Engine { reason: String },
}

impl CodecError {
    /// Create an opus encode failure.
    pub fn opus_encode(reason: impl ToString) -> Self {
        Self::Opus { operation: "encode", reason: reason.to_string() }
    }

    /// Create an opus decode failure.
    pub fn opus_decode(reason: impl ToString) -> Self {
        Self::Opus { operation: "decode", reason: reason.to_string() }
    }

    /// Create an engine failure.
    pub fn engine(reason: impl ToString) -> Self {
        Self::Engine { reason: reason.to_string() }
    }
}
