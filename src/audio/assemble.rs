//! Fixed-length vowel waveform construction.
//!
//! [`WaveformAssembler`] turns a short voiced excerpt at the engine's sample
//! rate into the calibration file body:
//!
//! 1. resample to the target rate;
//! 2. centre-trim when the excerpt is long enough, otherwise tile it with
//!    linear cross-fades;
//! 3. normalise the peak to the configured dBFS level;
//! 4. apply short linear fades at both edges.
//!
//! # Example
//!
//! ```rust
//! use vowel_calib::audio::WaveformAssembler;
//! use vowel_calib::config::TargetConfig;
//!
//! let assembler = WaveformAssembler::new(TargetConfig::default());
//! let excerpt: Vec<f32> = (0..12_000)
//!     .map(|i| (i as f32 * 0.04).sin() * 0.3)
//!     .collect();
//!
//! let out = assembler.assemble(&excerpt, 24_000).unwrap();
//! assert_eq!(out.len(), 144_000); // 3.0 s @ 48 kHz
//! ```

use thiserror::Error;

use crate::config::TargetConfig;

use super::resample::{resample, ResampleError};

// ---------------------------------------------------------------------------
// AssemblyError
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Clone, PartialEq)]
pub enum AssemblyError {
    /// Nothing to build the output from.
    #[error("insufficient audio: excerpt has {samples} samples")]
    InsufficientAudio { samples: usize },

    /// Sample-rate conversion failed.
    #[error("resampling failed: {0}")]
    Resample(String),
}

impl From<ResampleError> for AssemblyError {
    fn from(e: ResampleError) -> Self {
        AssemblyError::Resample(e.to_string())
    }
}

// ---------------------------------------------------------------------------
// WaveformAssembler
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct WaveformAssembler {
    target: TargetConfig,
}

impl Default for WaveformAssembler {
    fn default() -> Self {
        Self::new(TargetConfig::default())
    }
}

impl WaveformAssembler {
    pub fn new(target: TargetConfig) -> Self {
        Self { target }
    }

    /// Exact length of every assembled buffer.
    pub fn target_samples(&self) -> usize {
        self.target.target_samples()
    }

    /// Build a `target_samples()`-long buffer at the target rate from
    /// `excerpt` sampled at `source_rate`.
    ///
    /// Identical inputs always produce bit-identical output.
    pub fn assemble(&self, excerpt: &[f32], source_rate: u32) -> Result<Vec<f32>, AssemblyError> {
        if excerpt.is_empty() {
            return Err(AssemblyError::InsufficientAudio { samples: 0 });
        }

        let rate = self.target.sample_rate;
        let audio = resample(excerpt, source_rate, rate)?;
        if audio.is_empty() {
            return Err(AssemblyError::InsufficientAudio { samples: 0 });
        }

        let target_samples = self.target_samples();
        let mut out = if audio.len() >= target_samples {
            trim_center(&audio, target_samples)
        } else {
            let xfade = ms_to_samples(self.target.crossfade_ms, rate).min(audio.len() / 4);
            log::trace!(
                "tiling {} samples into {target_samples} (cross-fade {xfade})",
                audio.len()
            );
            tile_with_crossfade(&audio, target_samples, xfade)
        };

        normalize_peak(&mut out, self.target.peak_dbfs);
        apply_edge_fades(&mut out, ms_to_samples(self.target.fade_ms, rate));
        Ok(out)
    }
}

// ---------------------------------------------------------------------------
// Building blocks
// ---------------------------------------------------------------------------

/// `floor(ms / 1000 × rate)`.
pub fn ms_to_samples(ms: u32, sample_rate: u32) -> usize {
    (ms as u64 * sample_rate as u64 / 1000) as usize
}

/// Linear amplitude for a dBFS level.
pub fn dbfs_to_amplitude(dbfs: f64) -> f64 {
    10f64.powf(dbfs / 20.0)
}

/// Largest absolute sample value; `0.0` for an empty buffer.
pub fn peak_amplitude(samples: &[f32]) -> f32 {
    samples.iter().fold(0.0_f32, |m, s| m.max(s.abs()))
}

/// `n` evenly spaced values from 0 to 1 inclusive.  A single value is `0`.
pub fn linear_ramp(n: usize) -> Vec<f32> {
    match n {
        0 => Vec::new(),
        1 => vec![0.0],
        _ => {
            let last = (n - 1) as f64;
            (0..n).map(|i| (i as f64 / last) as f32).collect()
        }
    }
}

/// The middle `target` samples of `samples`, starting at
/// `(len − target) / 2`.
pub fn trim_center(samples: &[f32], target: usize) -> Vec<f32> {
    let target = target.min(samples.len());
    let start = (samples.len() - target) / 2;
    samples[start..start + target].to_vec()
}

/// Repeat `excerpt` until `target` samples are covered.
///
/// Copies are laid out every `len − xfade` samples.  Every copy but the
/// first ramps in linearly over its first `xfade` samples, every copy but
/// the last ramps out over its last `xfade` samples, and overlapping copies
/// are summed.  The two ramps add up to one, so a seam never exceeds the
/// excerpt's own peak.
pub fn tile_with_crossfade(excerpt: &[f32], target: usize, xfade: usize) -> Vec<f32> {
    let len = excerpt.len();
    if len == 0 {
        return vec![0.0; target];
    }
    let xfade = xfade.min(len / 4);
    let stride = len - xfade;
    let n_tiles = target / stride + 2;
    let ramp = linear_ramp(xfade);

    let mut out = vec![0.0_f32; target];
    for t in 0..n_tiles {
        let offset = t * stride;
        if offset >= target {
            break;
        }
        for (i, &sample) in excerpt.iter().enumerate() {
            let Some(slot) = out.get_mut(offset + i) else {
                break;
            };
            let mut gain = 1.0_f32;
            if t > 0 && i < xfade {
                gain *= ramp[i];
            }
            if t + 1 < n_tiles && i >= len - xfade {
                gain *= ramp[len - 1 - i];
            }
            *slot += sample * gain;
        }
    }
    out
}

/// Scale `samples` so the peak sits at `peak_dbfs`.  Silent buffers are
/// left untouched.
pub fn normalize_peak(samples: &mut [f32], peak_dbfs: f64) {
    let peak = peak_amplitude(samples);
    if peak <= 0.0 {
        return;
    }
    let gain = (dbfs_to_amplitude(peak_dbfs) / peak as f64) as f32;
    for s in samples.iter_mut() {
        *s *= gain;
    }
}

/// Linear fade-in over the first and fade-out over the last
/// `fade_samples` samples.  The length is clamped to the buffer.
pub fn apply_edge_fades(samples: &mut [f32], fade_samples: usize) {
    let n = fade_samples.min(samples.len());
    if n == 0 {
        return;
    }
    let ramp = linear_ramp(n);
    let len = samples.len();
    for (i, g) in ramp.iter().enumerate() {
        samples[i] *= g;
    }
    for (i, g) in ramp.iter().enumerate() {
        samples[len - 1 - i] *= g;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
