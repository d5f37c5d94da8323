//! LPC analysis/synthesis engine behind the built-in MBE vocoders.
//!
//! The gateway does not carry a full multi-band excitation speech model;
//! it needs a deterministic 160-samples-to-11-bytes transform with speech
//! shaped well enough for monitoring. Analysis is order-10 LPC via
//! autocorrelation and Levinson-Durbin with an autocorrelation pitch
//! detector; synthesis drives the all-pole filter with an impulse train
//! (voiced) or seeded noise (unvoiced).

use crate::MBE_FRAME_SAMPLES;

/// LPC model order.
pub const LPC_ORDER: usize = 10;

/// Lowest pitch lag carried in a codeword (400 Hz at 8 kHz).
pub const MIN_PITCH_LAG: usize = 20;

/// Highest pitch lag carried in a codeword (50 Hz at 8 kHz).
pub const MAX_PITCH_LAG: usize = 147;

/// Parameters describing one 20 ms voice frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameParams {
    /// LPC coefficients.
    pub coeffs: [f32; LPC_ORDER],
    /// Pitch lag in samples, 0 when unvoiced.
    pub pitch: u16,
    /// Log energy in dB relative to full scale, -96.0..=0.0.
    pub energy_db: f32,
    /// Voiced flag.
    pub voiced: bool,
}

/// Stateful analysis/synthesis engine.
pub struct LpcEngine {
    /// Synthesis filter memory carried across frames.
    synth_memory: [f32; LPC_ORDER],
    /// Noise generator state for unvoiced excitation.
    noise_state: u32,
}

impl LpcEngine {
    pub fn new() -> Self {
        Self { synth_memory: [0.0; LPC_ORDER], noise_state: 0x2545_f491 }
    }

    /// Analyze one frame of int16 PCM into LPC parameters.
    pub fn analyze(&self, samples: &[i16]) -> FrameParams {
        debug_assert_eq!(samples.len(), MBE_FRAME_SAMPLES);

        let frame: Vec<f32> = samples.iter().map(|&s| s as f32 / 32768.0).collect();

        let mean_square = frame.iter().map(|&s| s * s).sum::<f32>() / frame.len() as f32;
        let energy_db = if mean_square > 1e-10 {
            (mean_square.log10() * 10.0).clamp(-96.0, 0.0)
        } else {
            -96.0
        };

        let mut r = [0.0f32; LPC_ORDER + 1];
        for (k, rk) in r.iter_mut().enumerate() {
            for i in k..frame.len() {
                *rk += frame[i] * frame[i - k];
            }
        }

        let coeffs = levinson_durbin(&r);
        let (pitch, voiced) = detect_pitch(&frame);

        FrameParams { coeffs, pitch, energy_db, voiced }
    }

    /// Synthesize one frame of int16 PCM from LPC parameters.
    pub fn synthesize(&mut self, params: &FrameParams) -> [i16; MBE_FRAME_SAMPLES] {
        let n = MBE_FRAME_SAMPLES;
        let mut excitation = [0.0f32; MBE_FRAME_SAMPLES];

        if params.voiced && params.pitch > 0 {
            let period = (params.pitch as usize).max(MIN_PITCH_LAG);
            let mut i = 0;
            while i < n {
                excitation[i] = 1.0;
                i += period;
            }
        } else {
            // Deterministic xorshift noise; reseed per frame so identical
            // codewords decode to identical output.
            let mut rng = self.noise_state;
            for e in excitation.iter_mut() {
                rng ^= rng << 13;
                rng ^= rng >> 17;
                rng ^= rng << 5;
                *e = (rng >> 16) as f32 / 32768.0 - 1.0;
            }
        }

        let gain = 10.0f32.powf(params.energy_db / 20.0);
        let mut output = [0.0f32; MBE_FRAME_SAMPLES];
        for i in 0..n {
            let mut acc = excitation[i] * gain;
            for k in 0..LPC_ORDER {
                let prev = if i > k {
                    output[i - k - 1]
                } else {
                    self.synth_memory[LPC_ORDER - 1 - (k - i)]
                };
                acc -= params.coeffs[k] * prev;
            }
            output[i] = acc.clamp(-1.0, 1.0);
        }

        for (k, mem) in self.synth_memory.iter_mut().enumerate() {
            *mem = output[n - LPC_ORDER + k];
        }

        let mut pcm = [0i16; MBE_FRAME_SAMPLES];
        for (dst, &src) in pcm.iter_mut().zip(output.iter()) {
            *dst = (src * 32767.0) as i16;
        }
        pcm
    }

    /// Reset synthesis state between calls.
    pub fn reset(&mut self) {
        self.synth_memory = [0.0; LPC_ORDER];
    }
}

impl Default for LpcEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Levinson-Durbin recursion over the autocorrelation sequence.
fn levinson_durbin(r: &[f32; LPC_ORDER + 1]) -> [f32; LPC_ORDER] {
    let mut a = [0.0f32; LPC_ORDER];
    let mut a_prev = [0.0f32; LPC_ORDER];

    if r[0].abs() < 1e-10 {
        return a;
    }

    a[0] = -r[1] / r[0];
    let mut err = r[0] * (1.0 - a[0] * a[0]);

    for m in 1..LPC_ORDER {
        let mut sum = r[m + 1];
        for k in 0..m {
            sum += a[k] * r[m - k];
        }
        if err.abs() < 1e-10 {
            break;
        }
        let lambda = -sum / err;
        a_prev[..m].copy_from_slice(&a[..m]);
        for k in 0..m {
            a[k] = a_prev[k] + lambda * a_prev[m - 1 - k];
        }
        a[m] = lambda;
        err *= 1.0 - lambda * lambda;
    }

    // Keep the synthesis filter stable under quantization.
    for c in a.iter_mut() {
        *c = c.clamp(-0.99, 0.99);
    }
    a
}

/// Autocorrelation pitch detector over the carried lag range.
fn detect_pitch(frame: &[f32]) -> (u16, bool) {
    let n = frame.len();
    let r0: f32 = frame.iter().map(|&s| s * s).sum();
    if r0 < 1e-10 {
        return (0, false);
    }

    let max_lag = MAX_PITCH_LAG.min(n - 1);
    let mut best_lag = 0usize;
    let mut best_corr = 0.0f32;

    for lag in MIN_PITCH_LAG..=max_lag {
        let mut corr = 0.0f32;
        for i in 0..n - lag {
            corr += frame[i] * frame[i + lag];
        }
        corr /= r0;
        if corr > best_corr {
            best_corr = corr;
            best_lag = lag;
        }
    }

    if best_corr > 0.3 {
        (best_lag as u16, true)
    } else {
        (0, false)
    }
}
