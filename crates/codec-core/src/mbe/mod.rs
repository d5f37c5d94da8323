//! MBE vocoder seam: 160 samples of 8 kHz PCM to an 11-byte codeword.
//!
//! The bridge selects the vocoder at construction time: [`ImbeVocoder`]
//! for P25, [`AmbeVocoder`] for DMR, or [`ExternalVocoder`] when the host
//! supplies a hardware engine (a DVSI dongle behind the [`MbeEngine`]
//! trait). All three speak the same [`MbeVocoder`] capability trait so the
//! bridge never branches on the concrete codec.

mod engine;

pub use engine::{FrameParams, LpcEngine, LPC_ORDER};

use crate::error::{CodecError, Result};
use crate::gain::{apply_gain, AutoGain};
use crate::{MBE_CODEWORD_LEN, MBE_FRAME_SAMPLES};

/// Target level for the decoder-side auto gain.
const AUTO_GAIN_TARGET: f32 = 0.35;

/// Capability trait for the voice codec on the radio leg.
pub trait MbeVocoder: Send {
    /// Encode one 160-sample frame into an 11-byte codeword.
    fn encode(&mut self, samples: &[i16]) -> Result<[u8; MBE_CODEWORD_LEN]>;

    /// Decode an 11-byte codeword into one 160-sample frame.
    fn decode(&mut self, codeword: &[u8]) -> Result<[i16; MBE_FRAME_SAMPLES]>;

    /// Fixed gain applied after decode.
    fn set_decoder_gain(&mut self, gain: f32);

    /// Fixed gain applied before encode.
    fn set_encoder_gain(&mut self, gain: f32);

    /// Enable or disable the decoder-side peak normalizer.
    fn set_auto_gain(&mut self, enabled: bool);
}

/// External codeword engine, e.g. a USB DVSI device owned by the host.
pub trait MbeEngine: Send {
    /// Encode one frame to a codeword.
    fn encode_frame(&mut self, samples: &[i16; MBE_FRAME_SAMPLES]) -> Result<[u8; MBE_CODEWORD_LEN]>;

    /// Decode one codeword to a frame.
    fn decode_frame(&mut self, codeword: &[u8; MBE_CODEWORD_LEN]) -> Result<[i16; MBE_FRAME_SAMPLES]>;
}

/// Quantized frame parameters as carried in a codeword.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct QuantizedFrame {
    voiced: bool,
    pitch: u8,
    energy: u8,
    coeffs: [u8; LPC_ORDER],
}

impl QuantizedFrame {
    fn from_params(params: &FrameParams) -> Self {
        let pitch = if params.voiced {
            (params.pitch.saturating_sub(engine::MIN_PITCH_LAG as u16)).min(127) as u8
        } else {
            0
        };
        let energy = (((params.energy_db + 96.0) / 96.0) * 255.0).round().clamp(0.0, 255.0) as u8;
        let mut coeffs = [0u8; LPC_ORDER];
        for (q, &c) in coeffs.iter_mut().zip(params.coeffs.iter()) {
            *q = ((c.clamp(-0.99, 0.99) + 1.0) * 63.5).round().clamp(0.0, 127.0) as u8;
        }
        Self { voiced: params.voiced, pitch, energy, coeffs }
    }

    fn to_params(self) -> FrameParams {
        let mut coeffs = [0.0f32; LPC_ORDER];
        for (c, &q) in coeffs.iter_mut().zip(self.coeffs.iter()) {
            *c = q as f32 / 63.5 - 1.0;
        }
        FrameParams {
            coeffs,
            pitch: if self.voiced {
                self.pitch as u16 + engine::MIN_PITCH_LAG as u16
            } else {
                0
            },
            energy_db: self.energy as f32 / 255.0 * 96.0 - 96.0,
            voiced: self.voiced,
        }
    }
}

/// MSB-first bit cursor over a codeword buffer.
struct BitCursor {
    pos: usize,
}

impl BitCursor {
    fn new() -> Self {
        Self { pos: 0 }
    }

    fn write(&mut self, buf: &mut [u8; MBE_CODEWORD_LEN], value: u32, bits: usize) {
        for i in (0..bits).rev() {
            let bit = (value >> i) & 1;
            let byte = self.pos / 8;
            let shift = 7 - (self.pos % 8);
            buf[byte] |= (bit as u8) << shift;
            self.pos += 1;
        }
    }

    fn read(&mut self, buf: &[u8; MBE_CODEWORD_LEN], bits: usize) -> u32 {
        let mut value = 0u32;
        for _ in 0..bits {
            let byte = self.pos / 8;
            let shift = 7 - (self.pos % 8);
            value = (value << 1) | ((buf[byte] >> shift) & 1) as u32;
            self.pos += 1;
        }
        value
    }
}

/// Codeword bit layouts. IMBE leads with the excitation fields, AMBE with
/// the spectral fields; the gateway only requires that pack and unpack
/// agree per codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Layout {
    Imbe,
    Ambe,
}

fn pack(layout: Layout, q: &QuantizedFrame) -> [u8; MBE_CODEWORD_LEN] {
    let mut buf = [0u8; MBE_CODEWORD_LEN];
    let mut cur = BitCursor::new();
    match layout {
        Layout::Imbe => {
            cur.write(&mut buf, q.voiced as u32, 1);
            cur.write(&mut buf, q.pitch as u32, 7);
            cur.write(&mut buf, q.energy as u32, 8);
            for &c in &q.coeffs {
                cur.write(&mut buf, c as u32, 7);
            }
        }
        Layout::Ambe => {
            cur.write(&mut buf, q.energy as u32, 8);
            for &c in &q.coeffs {
                cur.write(&mut buf, c as u32, 7);
            }
            cur.write(&mut buf, q.voiced as u32, 1);
            cur.write(&mut buf, q.pitch as u32, 7);
        }
    }
    buf
}

fn unpack(layout: Layout, buf: &[u8; MBE_CODEWORD_LEN]) -> QuantizedFrame {
    let mut cur = BitCursor::new();
    match layout {
        Layout::Imbe => {
            let voiced = cur.read(buf, 1) != 0;
            let pitch = cur.read(buf, 7) as u8;
            let energy = cur.read(buf, 8) as u8;
            let mut coeffs = [0u8; LPC_ORDER];
            for c in coeffs.iter_mut() {
                *c = cur.read(buf, 7) as u8;
            }
            QuantizedFrame { voiced, pitch, energy, coeffs }
        }
        Layout::Ambe => {
            let energy = cur.read(buf, 8) as u8;
            let mut coeffs = [0u8; LPC_ORDER];
            for c in coeffs.iter_mut() {
                *c = cur.read(buf, 7) as u8;
            }
            let voiced = cur.read(buf, 1) != 0;
            let pitch = cur.read(buf, 7) as u8;
            QuantizedFrame { voiced, pitch, energy, coeffs }
        }
    }
}

/// Shared state for the two built-in software vocoders.
struct SoftVocoder {
    layout: Layout,
    analysis: LpcEngine,
    synthesis: LpcEngine,
    encoder_gain: f32,
    decoder_gain: f32,
    auto_gain: AutoGain,
    auto_gain_enabled: bool,
}

impl SoftVocoder {
    fn new(layout: Layout) -> Self {
        Self {
            layout,
            analysis: LpcEngine::new(),
            synthesis: LpcEngine::new(),
            encoder_gain: 1.0,
            decoder_gain: 1.0,
            auto_gain: AutoGain::new(AUTO_GAIN_TARGET),
            auto_gain_enabled: false,
        }
    }

    fn encode(&mut self, samples: &[i16]) -> Result<[u8; MBE_CODEWORD_LEN]> {
        if samples.len() != MBE_FRAME_SAMPLES {
            return Err(CodecError::InvalidFrameSize {
                expected: MBE_FRAME_SAMPLES,
                actual: samples.len(),
            });
        }
        let params = if self.encoder_gain != 1.0 {
            let mut scaled = samples.to_vec();
            apply_gain(&mut scaled, self.encoder_gain);
            self.analysis.analyze(&scaled)
        } else {
            self.analysis.analyze(samples)
        };
        Ok(pack(self.layout, &QuantizedFrame::from_params(&params)))
    }

    fn decode(&mut self, codeword: &[u8]) -> Result<[i16; MBE_FRAME_SAMPLES]> {
        let codeword: &[u8; MBE_CODEWORD_LEN] =
            codeword.try_into().map_err(|_| CodecError::InvalidCodewordLength {
                expected: MBE_CODEWORD_LEN,
                actual: codeword.len(),
            })?;
        let params = unpack(self.layout, codeword).to_params();
        let mut pcm = self.synthesis.synthesize(&params);
        apply_gain(&mut pcm, self.decoder_gain);
        if self.auto_gain_enabled {
            self.auto_gain.process(&mut pcm);
        }
        Ok(pcm)
    }
}

/// IMBE vocoder for the P25 leg.
pub struct ImbeVocoder {
    inner: SoftVocoder,
}

impl ImbeVocoder {
    pub fn new() -> Self {
        Self { inner: SoftVocoder::new(Layout::Imbe) }
    }
}

impl Default for ImbeVocoder {
    fn default() -> Self {
        Self::new()
    }
}

impl MbeVocoder for ImbeVocoder {
    fn encode(&mut self, samples: &[i16]) -> Result<[u8; MBE_CODEWORD_LEN]> {
        self.inner.encode(samples)
    }

    fn decode(&mut self, codeword: &[u8]) -> Result<[i16; MBE_FRAME_SAMPLES]> {
        self.inner.decode(codeword)
    }

    fn set_decoder_gain(&mut self, gain: f32) {
        self.inner.decoder_gain = gain;
    }

    fn set_encoder_gain(&mut self, gain: f32) {
        self.inner.encoder_gain = gain;
    }

    fn set_auto_gain(&mut self, enabled: bool) {
        self.inner.auto_gain_enabled = enabled;
        self.inner.auto_gain.reset();
    }
}

/// AMBE vocoder for the DMR leg.
pub struct AmbeVocoder {
    inner: SoftVocoder,
}

impl AmbeVocoder {
    pub fn new() -> Self {
        Self { inner: SoftVocoder::new(Layout::Ambe) }
    }
}

impl Default for AmbeVocoder {
    fn default() -> Self {
        Self::new()
    }
}

impl MbeVocoder for AmbeVocoder {
    fn encode(&mut self, samples: &[i16]) -> Result<[u8; MBE_CODEWORD_LEN]> {
        self.inner.encode(samples)
    }

    fn decode(&mut self, codeword: &[u8]) -> Result<[i16; MBE_FRAME_SAMPLES]> {
        self.inner.decode(codeword)
    }

    fn set_decoder_gain(&mut self, gain: f32) {
        self.inner.decoder_gain = gain;
    }

    fn set_encoder_gain(&mut self, gain: f32) {
        self.inner.encoder_gain = gain;
    }

    fn set_auto_gain(&mut self, enabled: bool) {
        self.inner.auto_gain_enabled = enabled;
        self.inner.auto_gain.reset();
    }
}

/// Vocoder backed by a host-supplied engine such as a USB DVSI device.
pub struct ExternalVocoder {
    engine: Box<dyn MbeEngine>,
    encoder_gain: f32,
    decoder_gain: f32,
    auto_gain: AutoGain,
    auto_gain_enabled: bool,
}

impl ExternalVocoder {
    pub fn new(engine: Box<dyn MbeEngine>) -> Self {
        Self {
            engine,
            encoder_gain: 1.0,
            decoder_gain: 1.0,
            auto_gain: AutoGain::new(AUTO_GAIN_TARGET),
            auto_gain_enabled: false,
        }
    }
}

impl MbeVocoder for ExternalVocoder {
    fn encode(&mut self, samples: &[i16]) -> Result<[u8; MBE_CODEWORD_LEN]> {
        let frame: &[i16; MBE_FRAME_SAMPLES] =
            samples.try_into().map_err(|_| CodecError::InvalidFrameSize {
                expected: MBE_FRAME_SAMPLES,
                actual: samples.len(),
            })?;
        if self.encoder_gain != 1.0 {
            let mut scaled = *frame;
            apply_gain(&mut scaled, self.encoder_gain);
            self.engine.encode_frame(&scaled)
        } else {
            self.engine.encode_frame(frame)
        }
    }

    fn decode(&mut self, codeword: &[u8]) -> Result<[i16; MBE_FRAME_SAMPLES]> {
        let codeword: &[u8; MBE_CODEWORD_LEN] =
            codeword.try_into().map_err(|_| CodecError::InvalidCodewordLength {
                expected: MBE_CODEWORD_LEN,
                actual: codeword.len(),
            })?;
        let mut pcm = self.engine.decode_frame(codeword)?;
        apply_gain(&mut pcm, self.decoder_gain);
        if self.auto_gain_enabled {
            self.auto_gain.process(&mut pcm);
        }
        Ok(pcm)
    }

    fn set_decoder_gain(&mut self, gain: f32) {
        self.decoder_gain = gain;
    }

    fn set_encoder_gain(&mut self, gain: f32) {
        self.encoder_gain = gain;
    }

    fn set_auto_gain(&mut self, enabled: bool) {
        self.auto_gain_enabled = enabled;
        self.auto_gain.reset();
    }
}
