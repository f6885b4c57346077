//! Aggregate pitch statistics for the calibration report.
//!
//! [`F0Summarizer`] runs the pitch tracker over an excerpt and condenses the
//! track into an [`F0Stats`] record.  It never fails: an excerpt with no
//! usable pitch yields the all-zero record.

use serde::{Deserialize, Serialize};

use crate::config::AnalysisConfig;

use super::pitch::{F0Track, PitchEstimator};

// ---------------------------------------------------------------------------
// F0Stats
// ---------------------------------------------------------------------------

/// Pitch summary of one vowel excerpt.
///
/// Two different frame filters feed this record:
///
/// * `f0_*` and `confidence_mean` use frames that are voiced
///   (confidence above the voicing threshold) **and** inside the plausible
///   speech range;
/// * `voiced_ratio` counts every voiced frame over all frames, whatever its
///   frequency.
///
/// A frame can therefore count as voiced without contributing to the mean.
/// Confidence and plausibility are separate signals and are kept apart.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct F0Stats {
    pub f0_mean: f64,
    pub f0_std: f64,
    pub f0_min: f64,
    pub f0_max: f64,
    pub voiced_ratio: f64,
    pub confidence_mean: f64,
}

impl F0Stats {
    /// `true` for the all-zero record returned when no frame qualified.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

// ---------------------------------------------------------------------------
// F0Summarizer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct F0Summarizer {
    estimator: PitchEstimator,
    voicing_threshold: f64,
    min_f0_hz: f64,
    max_f0_hz: f64,
}

impl Default for F0Summarizer {
    fn default() -> Self {
        Self::from_config(&AnalysisConfig::default())
    }
}

impl F0Summarizer {
    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self {
            estimator: PitchEstimator::from_config(config),
            voicing_threshold: config.voicing_threshold,
            min_f0_hz: config.min_f0_hz,
            max_f0_hz: config.max_f0_hz,
        }
    }

    /// Track pitch over `signal` and summarise it.
    pub fn summarize(&self, signal: &[f32], sample_rate: u32) -> F0Stats {
        let track = self.estimator.estimate(signal, sample_rate);
        self.summarize_track(&track)
    }

    /// Summarise an existing track.  F0 values are rounded to 2 decimals,
    /// ratios and confidences to 3.
    pub fn summarize_track(&self, track: &F0Track) -> F0Stats {
        let voiced: Vec<_> = track
            .frames()
            .iter()
            .filter(|f| f.is_voiced(self.voicing_threshold))
            .collect();
        let (freqs, confs): (Vec<f64>, Vec<f64>) = voiced
            .iter()
            .filter(|f| f.frequency_hz > self.min_f0_hz && f.frequency_hz < self.max_f0_hz)
            .map(|f| (f.frequency_hz, f.confidence))
            .unzip();

        if freqs.is_empty() {
            return F0Stats::default();
        }

        let min = freqs.iter().copied().fold(f64::INFINITY, f64::min);
        let max = freqs.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        F0Stats {
            f0_mean: round_to(mean(&freqs), 2),
            f0_std: round_to(population_std(&freqs), 2),
            f0_min: round_to(min, 2),
            f0_max: round_to(max, 2),
            voiced_ratio: round_to(voiced.len() as f64 / track.len() as f64, 3),
            confidence_mean: round_to(mean(&confs), 3),
        }
    }
}

// ---------------------------------------------------------------------------
// Numeric helpers
// ---------------------------------------------------------------------------

/// Arithmetic mean; `0.0` for an empty slice.
pub(crate) fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Standard deviation with divisor `n`.
pub(crate) fn population_std(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / values.len() as f64;
    var.sqrt()
}

/// Median, averaging the two middle values for even lengths.  Sorts
/// `values` in place.
pub(crate) fn median(values: &mut [f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}

pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::pitch::F0Frame;
    use std::f64::consts::PI;

    fn tone(freq: f64, sample_rate: u32, secs: f64) -> Vec<f32> {
        let n = (secs * sample_rate as f64) as usize;
        (0..n)
            .map(|i| (0.6 * (2.0 * PI * freq * i as f64 / sample_rate as f64).sin()) as f32)
            .collect()
    }

    #[test]
    fn steady_tone_statistics() {
        let stats = F0Summarizer::default().summarize(&tone(150.0, 24_000, 0.5), 24_000);

        assert!((stats.f0_mean - 150.0).abs() <= 3.0, "{stats:?}");
        assert!(stats.f0_std < 1.0, "{stats:?}");
        assert!(stats.f0_min <= stats.f0_mean && stats.f0_mean <= stats.f0_max);
        assert_eq!(stats.voiced_ratio, 1.0);
        assert!(stats.confidence_mean > 0.9, "{stats:?}");
    }

    #[test]
    fn silence_yields_zero_record() {
        let stats = F0Summarizer::default().summarize(&vec![0.0; 24_000], 24_000);
        assert_eq!(stats, F0Stats::default());
        assert!(stats.is_empty());
    }

    #[test]
    fn too_short_signal_yields_zero_record() {
        let stats = F0Summarizer::default().summarize(&tone(150.0, 24_000, 0.01), 24_000);
        assert!(stats.is_empty());
    }

    #[test]
    fn voiced_ratio_ignores_frequency_filter() {
        let frames = vec![
            F0Frame { frequency_hz: 150.0, confidence: 0.9 },
            F0Frame { frequency_hz: 600.0, confidence: 0.9 }, // voiced but implausible
            F0Frame { frequency_hz: 0.0, confidence: 0.1 },
            F0Frame { frequency_hz: 160.0, confidence: 0.8 },
        ];
        let track = F0Track::from_frames(frames, 2048, 512);
        let stats = F0Summarizer::default().summarize_track(&track);

        assert_eq!(stats.voiced_ratio, 0.75);
        assert_eq!(stats.f0_mean, 155.0);
        assert_eq!(stats.f0_std, 5.0);
        assert_eq!(stats.f0_min, 150.0);
        assert_eq!(stats.f0_max, 160.0);
        assert_eq!(stats.confidence_mean, 0.85);
    }

    #[test]
    fn values_are_rounded() {
        let frames = vec![
            F0Frame { frequency_hz: 100.123_456, confidence: 0.912_345 },
            F0Frame { frequency_hz: 100.123_456, confidence: 0.912_345 },
        ];
        let stats = F0Summarizer::default().summarize_track(&F0Track::from_frames(frames, 2048, 512));
        assert_eq!(stats.f0_mean, 100.12);
        assert_eq!(stats.confidence_mean, 0.912);
    }

    // ---- helpers -----------------------------------------------------------

    #[test]
    fn median_odd_and_even() {
        assert_eq!(median(&mut [3.0, 1.0, 2.0]), 2.0);
        assert_eq!(median(&mut [4.0, 1.0, 3.0, 2.0]), 2.5);
        assert_eq!(median(&mut []), 0.0);
    }

    #[test]
    fn population_std_uses_n() {
        assert!((population_std(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]) - 2.0).abs() < 1e-12);
        assert_eq!(population_std(&[]), 0.0);
    }

    #[test]
    fn round_to_decimals() {
        assert_eq!(round_to(1.23456, 2), 1.23);
        assert_eq!(round_to(0.99951, 3), 1.0);
    }
}
