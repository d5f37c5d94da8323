//! Audio codec primitives for the ZelloLink gateway.
//!
//! This crate carries the sample-domain building blocks shared by both legs
//! of the gateway: linear sample-rate conversion between the 8 kHz radio
//! line and the 16 kHz Zello stream, int16 gain scaling with an optional
//! peak-tracking auto gain, the MBE vocoder seam (IMBE for P25, AMBE for
//! DMR, or an externally supplied engine), and a thin wrapper around the
//! Opus codec used on the Zello WebSocket.
//!
//! All PCM in this crate is signed 16-bit mono. Vocoder frames are the
//! fixed 20 ms unit of the land-mobile side: 160 samples at 8 kHz in,
//! an 11-byte codeword out.

pub mod error;
pub mod gain;
pub mod mbe;
pub mod opus_codec;
pub mod resample;

pub use error::{CodecError, Result};
pub use gain::{apply_gain, AutoGain};
pub use mbe::{AmbeVocoder, ExternalVocoder, ImbeVocoder, MbeEngine, MbeVocoder};
pub use opus_codec::{OpusDecoder, OpusEncoder, OPUS_MAX_PACKET_LEN};
pub use resample::resample;

/// Samples per 20 ms vocoder frame at 8 kHz.
pub const MBE_FRAME_SAMPLES: usize = 160;

/// Bytes per MBE codeword (88 bits of IMBE, zero-padded for AMBE).
pub const MBE_CODEWORD_LEN: usize = 11;
