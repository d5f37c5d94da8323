//! Zello's 4-byte base64 codec descriptor.
//!
//! Every stream announces its Opus parameters in a base64 string of four
//! bytes: a little-endian sample rate, frames per packet, and the frame
//! duration in milliseconds. The gateway always transmits 16 kHz, one
//! frame per packet, 60 ms.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

use crate::error::{Result, ZelloError};

/// Decoded codec descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodecAttributes {
    pub sample_rate_hz: u16,
    pub frames_per_packet: u8,
    pub frame_size_ms: u8,
}

impl Default for CodecAttributes {
    fn default() -> Self {
        Self { sample_rate_hz: 16000, frames_per_packet: 1, frame_size_ms: 60 }
    }
}

impl CodecAttributes {
    /// Decode a base64 codec header.
    pub fn decode(header: &str) -> Result<Self> {
        let bytes = BASE64
            .decode(header)
            .map_err(|e| ZelloError::InvalidHeader(e.to_string()))?;
        if bytes.len() != 4 {
            return Err(ZelloError::InvalidHeader(format!(
                "expected 4 bytes, got {}",
                bytes.len()
            )));
        }
        Ok(Self {
            sample_rate_hz: u16::from_le_bytes([bytes[0], bytes[1]]),
            frames_per_packet: bytes[2],
            frame_size_ms: bytes[3],
        })
    }

    /// Encode into the base64 wire form.
    pub fn encode(&self) -> String {
        let rate = self.sample_rate_hz.to_le_bytes();
        BASE64.encode([rate[0], rate[1], self.frames_per_packet, self.frame_size_ms])
    }

    /// Samples per packet at the declared rate, integer arithmetic.
    pub fn frame_samples(&self) -> usize {
        self.sample_rate_hz as usize * self.frame_size_ms as usize / 1000
            * self.frames_per_packet as usize
    }

    /// Samples per packet after resampling to the 8 kHz line.
    pub fn frame_samples_8k(&self) -> usize {
        8000 * self.frame_size_ms as usize / 1000 * self.frames_per_packet as usize
    }
}

/// The constant header sent with every outbound `start_stream`.
pub fn outbound_header() -> String {
    CodecAttributes::default().encode()
}
