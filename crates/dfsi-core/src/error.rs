//! Error handling for DFSI framing.

use thiserror::Error;

/// Result type alias for DFSI operations.
pub type Result<T> = std::result::Result<T, DfsiError>;

/// Errors that can occur while packing or unpacking radio-leg frames.
#[derive(Error, Debug)]
pub enum DfsiError {
    /// Payload shorter than the format requires.
    #[error("buffer too small: required {required} bytes, available {available}")]
    BufferTooSmall { required: usize, available: usize },

    /// A voice frame marker did not match the expected frame type.
    #[error("frame type mismatch at offset {offset}: expected {expected:#04x}, got {actual:#04x}")]
    FrameTypeMismatch { offset: usize, expected: u8, actual: u8 },

    /// Header fields are inconsistent with the payload.
    #[error("invalid packet: {0}")]
    InvalidPacket(String),

    /// TSBK checksum failure.
    #[error("tsbk crc mismatch: expected {expected:#06x}, got {actual:#06x}")]
    CrcMismatch { expected: u16, actual: u16 },

    /// The external FNE transport failed.
    #[error("peer transport failed: {0}")]
    Transport(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mismatch_display() {
        let err = DfsiError::FrameTypeMismatch { offset: 22, expected: 0x63, actual: 0x00 };
        let s = format!("{}", err);
        assert!(s.contains("0x63"));
        assert!(s.contains("22"));
    }
}
