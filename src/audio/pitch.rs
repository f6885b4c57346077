//! Frame-wise fundamental-frequency (F0) tracking.
//!
//! [`PitchEstimator`] slides a `frame_size` window over the signal in steps
//! of `hop_size` and runs a YIN-style periodicity search on each frame:
//!
//! 1. squared-difference function `d[τ]` for every lag `τ < frame_size / 2`,
//! 2. cumulative-mean-normalised difference `cmndf[τ] = d[τ]·τ / Σd[1..=τ]`,
//! 3. the first lag whose CMNDF dips below `threshold`, followed down to the
//!    bottom of that dip and refined with parabolic interpolation,
//! 4. otherwise the global CMNDF minimum, so every frame gets an estimate.
//!
//! Confidence is `1 − cmndf` at the chosen lag: close to `1.0` for clean
//! periodic audio, close to `0.0` for noise and silence.
//!
//! # Example
//!
//! ```rust
//! use vowel_calib::audio::PitchEstimator;
//!
//! let sr = 24_000;
//! let tone: Vec<f32> = (0..4_096)
//!     .map(|i| (2.0 * std::f32::consts::PI * 200.0 * i as f32 / sr as f32).sin())
//!     .collect();
//!
//! let track = PitchEstimator::default().estimate(&tone, sr);
//! assert_eq!(track.len(), 5);
//! assert!((track.frames()[0].frequency_hz - 200.0).abs() < 4.0);
//! ```

use crate::config::AnalysisConfig;

// ---------------------------------------------------------------------------
// F0Frame / F0Track
// ---------------------------------------------------------------------------

/// Pitch estimate for a single analysis frame.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct F0Frame {
    /// Estimated fundamental frequency in Hz (`0.0` when undetermined).
    pub frequency_hz: f64,
    /// Periodicity confidence in `[0.0, 1.0]`.
    pub confidence: f64,
}

impl F0Frame {
    /// Placeholder for frames that could not be analysed.
    pub const UNVOICED: F0Frame = F0Frame {
        frequency_hz: 0.0,
        confidence: 0.0,
    };

    /// `true` when `confidence` is strictly above `threshold`.
    pub fn is_voiced(&self, threshold: f64) -> bool {
        self.confidence > threshold
    }
}

/// Ordered per-frame pitch estimates.  Frame `i` covers samples
/// `[i·hop, i·hop + frame_size)` of the analysed signal.
#[derive(Debug, Clone, PartialEq)]
pub struct F0Track {
    frames: Vec<F0Frame>,
    frame_size: usize,
    hop_size: usize,
}

impl F0Track {
    /// Wrap pre-computed frames, e.g. from an external tracker.
    pub fn from_frames(frames: Vec<F0Frame>, frame_size: usize, hop_size: usize) -> Self {
        Self {
            frames,
            frame_size,
            hop_size,
        }
    }

    pub fn frames(&self) -> &[F0Frame] {
        &self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    pub fn hop_size(&self) -> usize {
        self.hop_size
    }

    /// First sample covered by frame `index`.
    pub fn sample_offset(&self, index: usize) -> usize {
        index * self.hop_size
    }
}

/// Number of frames produced for a signal of `signal_len` samples:
/// `floor((N − frame_size) / hop) + 1`, and exactly one for signals shorter
/// than a frame.
pub fn frame_count(signal_len: usize, frame_size: usize, hop_size: usize) -> usize {
    if signal_len < frame_size {
        1
    } else {
        (signal_len - frame_size) / hop_size + 1
    }
}

// ---------------------------------------------------------------------------
// PitchEstimator
// ---------------------------------------------------------------------------

/// Difference-function pitch tracker.
#[derive(Debug, Clone)]
pub struct PitchEstimator {
    frame_size: usize,
    hop_size: usize,
    threshold: f64,
}

impl Default for PitchEstimator {
    /// 2048-sample frames, 512-sample hop, `0.15` dip threshold.
    fn default() -> Self {
        Self::from_config(&AnalysisConfig::default())
    }
}

impl PitchEstimator {
    /// Create an estimator.
    ///
    /// # Panics
    ///
    /// Panics if `frame_size` or `hop_size` is zero.
    pub fn new(frame_size: usize, hop_size: usize, threshold: f64) -> Self {
        assert!(frame_size > 0, "frame_size must be > 0");
        assert!(hop_size > 0, "hop_size must be > 0");
        Self {
            frame_size,
            hop_size,
            threshold,
        }
    }

    /// Build from the analysis section of the calibration config.
    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self::new(config.frame_size, config.hop_size, config.threshold)
    }

    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    pub fn hop_size(&self) -> usize {
        self.hop_size
    }

    /// Track F0 across `signal` (mono samples at `sample_rate` Hz).
    ///
    /// The result always holds [`frame_count`] frames.  A trailing partial
    /// frame is dropped; a signal shorter than one frame yields a single
    /// [`F0Frame::UNVOICED`].
    ///
    /// Unlike plain threshold crossing, the first lag below the threshold
    /// is followed down to the bottom of its dip before refinement.
    pub fn estimate(&self, signal: &[f32], sample_rate: u32) -> F0Track {
        let n_frames = frame_count(signal.len(), self.frame_size, self.hop_size);
        let tau_max = self.frame_size / 2;

        // Scratch buffers reused across frames.
        let mut diff = vec![0.0_f64; tau_max];
        let mut cmndf = vec![1.0_f64; tau_max];

        let frames = (0..n_frames)
            .map(|i| {
                let start = i * self.hop_size;
                match signal.get(start..start + self.frame_size) {
                    Some(frame) => self.analyze_frame(frame, sample_rate, &mut diff, &mut cmndf),
                    None => F0Frame::UNVOICED,
                }
            })
            .collect();

        F0Track {
            frames,
            frame_size: self.frame_size,
            hop_size: self.hop_size,
        }
    }

    fn analyze_frame(
        &self,
        frame: &[f32],
        sample_rate: u32,
        diff: &mut [f64],
        cmndf: &mut [f64],
    ) -> F0Frame {
        let tau_max = diff.len();
        if tau_max <= 2 {
            return F0Frame::UNVOICED;
        }

        difference_function(frame, diff);
        cumulative_mean_normalize(diff, cmndf);

        let lag = match first_dip(cmndf, self.threshold) {
            Some(tau) => parabolic_refine(cmndf, tau),
            None => global_minimum(cmndf) as f64,
        };
        if !(lag.is_finite() && lag > 0.0) {
            return F0Frame::UNVOICED;
        }

        let conf_idx = (lag.round() as usize).min(tau_max - 1);
        F0Frame {
            frequency_hz: sample_rate as f64 / lag,
            confidence: (1.0 - cmndf[conf_idx]).clamp(0.0, 1.0),
        }
    }
}

// ---------------------------------------------------------------------------
// Per-frame steps
// ---------------------------------------------------------------------------

/// `diff[τ] = Σ_{j < τ_max} (x[j] − x[j+τ])²`, with `τ_max = diff.len()`.
///
/// `frame` must hold at least `2·τ_max − 1` samples.
fn difference_function(frame: &[f32], diff: &mut [f64]) {
    let tau_max = diff.len();
    let head = &frame[..tau_max];
    diff[0] = 0.0;
    for tau in 1..tau_max {
        diff[tau] = head
            .iter()
            .zip(&frame[tau..tau + tau_max])
            .map(|(&a, &b)| {
                let d = a as f64 - b as f64;
                d * d
            })
            .sum();
    }
}

/// Normalise each difference by the running mean of the differences up to
/// that lag.  A non-positive running sum (silence) maps to `1.0`.
fn cumulative_mean_normalize(diff: &[f64], cmndf: &mut [f64]) {
    cmndf[0] = 1.0;
    let mut running_sum = 0.0;
    for tau in 1..diff.len() {
        running_sum += diff[tau];
        cmndf[tau] = if running_sum > 0.0 {
            diff[tau] * tau as f64 / running_sum
        } else {
            1.0
        };
    }
}

/// First lag ≥ 2 below `threshold`, followed down to the bottom of its dip.
fn first_dip(cmndf: &[f64], threshold: f64) -> Option<usize> {
    let mut tau = (2..cmndf.len()).find(|&t| cmndf[t] < threshold)?;
    while tau + 1 < cmndf.len() && cmndf[tau + 1] < cmndf[tau] {
        tau += 1;
    }
    Some(tau)
}

/// Sub-sample lag from the parabola through `cmndf[τ−1..=τ+1]`.
fn parabolic_refine(cmndf: &[f64], tau: usize) -> f64 {
    if tau == 0 || tau + 1 >= cmndf.len() {
        return tau as f64;
    }
    let (s0, s1, s2) = (cmndf[tau - 1], cmndf[tau], cmndf[tau + 1]);
    let denom = s0 - 2.0 * s1 + s2;
    if denom == 0.0 {
        tau as f64
    } else {
        tau as f64 + 0.5 * (s0 - s2) / denom
    }
}

/// Index of the smallest CMNDF value at lag ≥ 2 (first one on ties).
fn global_minimum(cmndf: &[f64]) -> usize {
    (2..cmndf.len()).fold(2, |best, t| if cmndf[t] < cmndf[best] { t } else { best })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn sine(freq: f64, sample_rate: u32, len: usize, amplitude: f64) -> Vec<f32> {
        (0..len)
            .map(|i| (amplitude * (2.0 * PI * freq * i as f64 / sample_rate as f64).sin()) as f32)
            .collect()
    }

    /// Deterministic white-ish noise in [-0.5, 0.5].
    fn noise(len: usize, mut state: u64) -> Vec<f32> {
        (0..len)
            .map(|_| {
                state ^= state << 13;
                state ^= state >> 7;
                state ^= state << 17;
                (state >> 40) as f32 / (1u64 << 24) as f32 - 0.5
            })
            .collect()
    }

    // ---- frame_count -------------------------------------------------------

    #[test]
    fn frame_count_matches_formula() {
        assert_eq!(frame_count(2048, 2048, 512), 1);
        assert_eq!(frame_count(2559, 2048, 512), 1);
        assert_eq!(frame_count(2560, 2048, 512), 2);
        assert_eq!(frame_count(12_000, 2048, 512), 20);
        assert_eq!(frame_count(1000, 256, 100), 8);
    }

    #[test]
    fn frame_count_short_signal_is_one() {
        assert_eq!(frame_count(0, 2048, 512), 1);
        assert_eq!(frame_count(2047, 2048, 512), 1);
    }

    #[test]
    fn track_length_matches_frame_count() {
        for &(len, frame, hop) in &[(5_000usize, 256usize, 64usize), (3_333, 128, 100), (1_024, 512, 1)] {
            let signal = sine(220.0, 16_000, len, 0.3);
            let track = PitchEstimator::new(frame, hop, 0.15).estimate(&signal, 16_000);
            assert_eq!(track.len(), frame_count(len, frame, hop), "len={len} frame={frame} hop={hop}");
            assert_eq!(track.frame_size(), frame);
            assert_eq!(track.hop_size(), hop);
        }
    }

    #[test]
    fn short_signal_yields_single_unvoiced_frame() {
        let signal = sine(150.0, 24_000, 1_000, 0.5);
        let track = PitchEstimator::default().estimate(&signal, 24_000);
        assert_eq!(track.frames(), &[F0Frame::UNVOICED]);

        let empty = PitchEstimator::default().estimate(&[], 24_000);
        assert_eq!(empty.frames(), &[F0Frame::UNVOICED]);
    }

    // ---- accuracy ------------------------------------------------------------

    #[test]
    fn pure_sines_within_two_percent() {
        let sr = 24_000;
        // Four full frames per tone.
        let len = 2048 + 3 * 512;
        for &freq in &[50.0, 100.0, 150.0, 220.0, 440.0, 500.0] {
            let track = PitchEstimator::default().estimate(&sine(freq, sr, len, 0.5), sr);
            assert_eq!(track.len(), 4);
            for (i, frame) in track.frames().iter().enumerate() {
                let err = (frame.frequency_hz - freq).abs() / freq;
                assert!(err < 0.02, "{freq} Hz frame {i}: got {:.2} Hz", frame.frequency_hz);
                assert!(frame.confidence > 0.9, "{freq} Hz frame {i}: conf {:.3}", frame.confidence);
            }
        }
    }

    #[test]
    fn accuracy_holds_at_48k() {
        let sr = 48_000;
        let track = PitchEstimator::default().estimate(&sine(180.0, sr, 4_096, 0.2), sr);
        for frame in track.frames() {
            assert!((frame.frequency_hz - 180.0).abs() < 180.0 * 0.02);
            assert!(frame.confidence > 0.9);
        }
    }

    #[test]
    fn silence_has_zero_confidence() {
        let track = PitchEstimator::default().estimate(&vec![0.0; 2048 + 3 * 512], 24_000);
        assert_eq!(track.len(), 4);
        for frame in track.frames() {
            assert_eq!(frame.confidence, 0.0);
            assert!(!frame.is_voiced(0.4));
        }
    }

    #[test]
    fn noise_still_produces_an_estimate_per_frame() {
        let signal = noise(2048 + 4 * 512, 0x2545_F491_4F6C_DD1D);
        let track = PitchEstimator::default().estimate(&signal, 24_000);
        assert_eq!(track.len(), 5);
        for frame in track.frames() {
            assert!(frame.frequency_hz > 0.0);
            assert!((0.0..=1.0).contains(&frame.confidence));
        }
    }

    #[test]
    fn estimation_is_deterministic() {
        let signal = sine(133.0, 24_000, 8_000, 0.4);
        let est = PitchEstimator::default();
        assert_eq!(est.estimate(&signal, 24_000), est.estimate(&signal, 24_000));
    }

    #[test]
    fn tiny_frame_size_does_not_panic() {
        let track = PitchEstimator::new(4, 1, 0.15).estimate(&[0.1, -0.1, 0.1, -0.1, 0.1], 8_000);
        assert_eq!(track.len(), 2);
        assert!(track.frames().iter().all(|f| *f == F0Frame::UNVOICED));
    }

    // ---- helpers -------------------------------------------------------------

    #[test]
    fn parabola_vertex_is_recovered() {
        // (τ − 5.3)² sampled at integer lags.
        let curve: Vec<f64> = (0..10).map(|t| (t as f64 - 5.3).powi(2)).collect();
        let refined = parabolic_refine(&curve, 5);
        assert!((refined - 5.3).abs() < 1e-9, "refined = {refined}");
    }

    #[test]
    fn parabola_skipped_at_boundary() {
        let curve = vec![1.0, 0.9, 0.5, 0.1];
        assert_eq!(parabolic_refine(&curve, 3), 3.0);
    }

    #[test]
    fn first_dip_follows_descent() {
        let cmndf = vec![1.0, 1.0, 0.9, 0.14, 0.08, 0.05, 0.07, 0.5];
        assert_eq!(first_dip(&cmndf, 0.15), Some(5));
        assert_eq!(first_dip(&cmndf, 0.01), None);
    }

    #[test]
    fn global_minimum_skips_first_two_lags() {
        let cmndf = vec![0.0, 0.0, 0.6, 0.3, 0.3, 0.9];
        assert_eq!(global_minimum(&cmndf), 3);
    }

    #[test]
    fn silence_normalizes_to_one() {
        let diff = vec![0.0; 8];
        let mut cmndf = vec![0.0; 8];
        cumulative_mean_normalize(&diff, &mut cmndf);
        assert!(cmndf.iter().all(|&v| v == 1.0));
    }

    #[test]
    fn sample_offset_uses_hop() {
        let track = PitchEstimator::new(256, 64, 0.15).estimate(&vec![0.0; 1_000], 8_000);
        assert_eq!(track.sample_offset(0), 0);
        assert_eq!(track.sample_offset(3), 192);
    }

    #[test]
    #[should_panic(expected = "hop_size must be > 0")]
    fn zero_hop_panics() {
        PitchEstimator::new(2048, 0, 0.15);
    }
}
