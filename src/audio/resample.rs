//! Rational sample-rate conversion.
//!
//! TTS engines emit 24 kHz audio while the calibration files are written at
//! 48 kHz.  [`resample`] converts between any two integer rates with
//! rubato's synchronous FFT resampler (`FftFixedIn`), which works on the
//! exact `target / source` ratio.  The output is aligned to the input (the
//! resampler's group delay is removed) and is
//! `ceil(len × target / source)` samples long.

use rubato::{FftFixedIn, Resampler};
use thiserror::Error;

/// Input frames fed to the resampler per call.
const CHUNK_FRAMES: usize = 1024;
/// FFT sub-chunks per input chunk.
const SUB_CHUNKS: usize = 2;

// ---------------------------------------------------------------------------
// ResampleError
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ResampleError {
    /// One of the rates is zero.
    #[error("invalid sample rate conversion {from} Hz -> {to} Hz")]
    InvalidRate { from: u32, to: u32 },

    /// rubato refused to build or run the resampler.
    #[error("resampler failed: {0}")]
    Backend(String),
}

// ---------------------------------------------------------------------------
// resample
// ---------------------------------------------------------------------------

/// Output length for converting `len` samples from `from` Hz to `to` Hz.
pub fn resampled_len(len: usize, from: u32, to: u32) -> usize {
    if from == 0 {
        return 0;
    }
    let num = len as u64 * to as u64;
    num.div_ceil(from as u64) as usize
}

/// Resample mono `samples` from `from` Hz to `to` Hz.
///
/// * Equal rates return a copy of the input.
/// * Empty input returns an empty vector.
///
/// ```rust
/// use vowel_calib::audio::resample;
///
/// let input = vec![0.25_f32; 2_400]; // 0.1 s @ 24 kHz
/// let out = resample(&input, 24_000, 48_000).unwrap();
/// assert_eq!(out.len(), 4_800);
/// ```
pub fn resample(samples: &[f32], from: u32, to: u32) -> Result<Vec<f32>, ResampleError> {
    if from == 0 || to == 0 {
        return Err(ResampleError::InvalidRate { from, to });
    }
    if from == to {
        return Ok(samples.to_vec());
    }
    if samples.is_empty() {
        return Ok(Vec::new());
    }

    let mut resampler =
        FftFixedIn::<f32>::new(from as usize, to as usize, CHUNK_FRAMES, SUB_CHUNKS, 1)
            .map_err(|e| ResampleError::Backend(e.to_string()))?;

    let expected = resampled_len(samples.len(), from, to);
    let delay = resampler.output_delay();
    let needed = expected + delay;

    let mut out = Vec::with_capacity(needed + resampler.output_frames_max());
    let mut chunk = vec![0.0_f32; resampler.input_frames_next()];
    let mut pos = 0usize;

    // Feed the signal, then zeros, until the delayed tail has been flushed.
    while out.len() < needed {
        chunk.fill(0.0);
        if pos < samples.len() {
            let end = (pos + chunk.len()).min(samples.len());
            chunk[..end - pos].copy_from_slice(&samples[pos..end]);
            pos = end;
        }

        let produced = resampler
            .process(std::slice::from_ref(&chunk), None)
            .map_err(|e| ResampleError::Backend(e.to_string()))?;
        match produced.first() {
            Some(channel) if !channel.is_empty() => out.extend_from_slice(channel),
            _ => return Err(ResampleError::Backend("resampler made no progress".into())),
        }
    }

    out.drain(..delay);
    out.truncate(expected);
    Ok(out)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
