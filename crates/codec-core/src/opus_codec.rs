//! Thin wrappers around the Opus codec for the Zello leg.
//!
//! Zello streams are mono Opus. The outbound stream is fixed at 16 kHz
//! with 60 ms packets; inbound streams declare their rate in a codec
//! header, so the session rebuilds its decoder whenever the declared rate
//! changes.

use opus::{Application, Channels};
use tracing::debug;

use crate::error::{CodecError, Result};

/// Largest possible Opus packet.
pub const OPUS_MAX_PACKET_LEN: usize = 1275;

/// Mono Opus encoder at a fixed sample rate.
pub struct OpusEncoder {
    encoder: opus::Encoder,
    sample_rate: u32,
}

impl OpusEncoder {
    /// Create a VoIP-tuned mono encoder.
    pub fn new(sample_rate: u32) -> Result<Self> {
        let encoder = opus::Encoder::new(sample_rate, Channels::Mono, Application::Voip)
            .map_err(CodecError::opus_encode)?;
        debug!(sample_rate, "created opus encoder");
        Ok(Self { encoder, sample_rate })
    }

    /// Encode one frame of PCM into an Opus packet.
    pub fn encode(&mut self, pcm: &[i16]) -> Result<Vec<u8>> {
        let mut output = vec![0u8; OPUS_MAX_PACKET_LEN];
        let len = self
            .encoder
            .encode(pcm, &mut output)
            .map_err(CodecError::opus_encode)?;
        output.truncate(len);
        Ok(output)
    }

    /// Sample rate this encoder was built for.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

/// Mono Opus decoder at a fixed sample rate.
pub struct OpusDecoder {
    decoder: opus::Decoder,
    sample_rate: u32,
}

impl OpusDecoder {
    /// Create a mono decoder.
    pub fn new(sample_rate: u32) -> Result<Self> {
        let decoder = opus::Decoder::new(sample_rate, Channels::Mono)
            .map_err(CodecError::opus_decode)?;
        debug!(sample_rate, "created opus decoder");
        Ok(Self { decoder, sample_rate })
    }

    /// Decode one Opus packet, returning up to `max_frame_samples` of PCM.
    pub fn decode(&mut self, packet: &[u8], max_frame_samples: usize) -> Result<Vec<i16>> {
        let mut output = vec![0i16; max_frame_samples];
        let decoded = self
            .decoder
            .decode(packet, &mut output, false)
            .map_err(CodecError::opus_decode)?;
        output.truncate(decoded);
        Ok(output)
    }

    /// Sample rate this decoder was built for.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}
