//! Stable voiced-region selection.
//!
//! TTS output is running speech, not a sustained tone.  [`RegionSelector`]
//! tracks pitch over the whole utterance, splits it into voiced runs and
//! scores each run by
//!
//! ```text
//! score = run_length × stability × mean_confidence
//! stability = max(0, 1 − 5 · std(F0) / max(median(F0), 1))
//! ```
//!
//! so a run that is short, wobbly or weakly periodic loses to one that is
//! long, flat and clean.  When nothing qualifies the selector still returns
//! a window at the start of the signal, flagged with
//! [`StableRegion::is_fallback`].

use std::ops::Range;

use crate::config::AnalysisConfig;

use super::pitch::{F0Frame, F0Track, PitchEstimator};
use super::stats::{mean, median, population_std};

// ---------------------------------------------------------------------------
// StableRegion
// ---------------------------------------------------------------------------

/// The excerpt chosen as the vowel source, in sample coordinates of the
/// analysed signal.
#[derive(Debug, Clone, PartialEq)]
pub struct StableRegion {
    /// First sample of the region (inclusive).
    pub start_sample: usize,
    /// One past the last sample of the region.
    pub end_sample: usize,
    /// Median F0 over the run's plausible frames, in Hz.
    pub median_f0_hz: f64,
    /// `true` when no voiced run qualified and the default window was used.
    pub is_fallback: bool,
}

impl StableRegion {
    pub fn len(&self) -> usize {
        self.end_sample - self.start_sample
    }

    pub fn is_empty(&self) -> bool {
        self.end_sample <= self.start_sample
    }

    pub fn duration_secs(&self, sample_rate: u32) -> f64 {
        self.len() as f64 / sample_rate as f64
    }

    /// Copy the region out of `signal`.  Bounds are clamped to the signal so
    /// a region from a different buffer never panics.
    pub fn excerpt(&self, signal: &[f32]) -> Vec<f32> {
        let end = self.end_sample.min(signal.len());
        let start = self.start_sample.min(end);
        signal[start..end].to_vec()
    }
}

// ---------------------------------------------------------------------------
// RegionSelector
// ---------------------------------------------------------------------------

/// Picks the longest, most tonally stable voiced span of a signal.
#[derive(Debug, Clone)]
pub struct RegionSelector {
    estimator: PitchEstimator,
    voicing_threshold: f64,
    min_f0_hz: f64,
    max_f0_hz: f64,
    fallback_f0_hz: f64,
}

impl Default for RegionSelector {
    fn default() -> Self {
        Self::from_config(&AnalysisConfig::default())
    }
}

impl RegionSelector {
    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self {
            estimator: PitchEstimator::from_config(config),
            voicing_threshold: config.voicing_threshold,
            min_f0_hz: config.min_f0_hz,
            max_f0_hz: config.max_f0_hz,
            fallback_f0_hz: config.fallback_f0_hz,
        }
    }

    /// Select the best region of `signal` lasting at least
    /// `min_duration_secs`.
    ///
    /// For any non-empty signal the result satisfies
    /// `0 <= start_sample < end_sample <= signal.len()`.
    pub fn select(&self, signal: &[f32], sample_rate: u32, min_duration_secs: f64) -> StableRegion {
        let track = self.estimator.estimate(signal, sample_rate);
        let hop = track.hop_size();
        let min_frames = ((min_duration_secs * sample_rate as f64 / hop as f64) as usize).max(1);

        let mut best: Option<(Range<usize>, f64)> = None;
        let mut best_score = -1.0;

        for run in voiced_runs(&track, self.voicing_threshold) {
            if run.len() < min_frames {
                continue;
            }
            let Some((score, median_f0)) = self.score_run(&track.frames()[run.clone()]) else {
                continue;
            };
            log::trace!("region: run {run:?} score={score:.3} median={median_f0:.1}Hz");
            if score > best_score {
                best_score = score;
                best = Some((run, median_f0));
            }
        }

        let (frames, median_f0_hz, is_fallback) = match best {
            Some((run, median_f0)) => (run, median_f0, false),
            None => {
                log::warn!(
                    "region: no voiced run of {min_frames}+ frames, using the first {:.2}s",
                    min_duration_secs
                );
                (0..track.len().min(min_frames), self.fallback_f0_hz, true)
            }
        };

        let start_sample = track.sample_offset(frames.start).min(signal.len());
        let end_sample = (track.sample_offset(frames.end) + track.frame_size()).min(signal.len());

        StableRegion {
            start_sample,
            end_sample,
            median_f0_hz,
            is_fallback,
        }
    }

    /// `(score, median_f0)` for a run, or `None` when it holds fewer than
    /// three plausible F0 values.
    fn score_run(&self, frames: &[F0Frame]) -> Option<(f64, f64)> {
        let mut valid: Vec<f64> = frames
            .iter()
            .map(|f| f.frequency_hz)
            .filter(|&hz| hz > self.min_f0_hz && hz < self.max_f0_hz)
            .collect();
        if valid.len() < 3 {
            return None;
        }

        let median_f0 = median(&mut valid);
        let cv = population_std(&valid) / median_f0.max(1.0);
        let stability = (1.0 - 5.0 * cv).max(0.0);
        let confidences: Vec<f64> = frames.iter().map(|f| f.confidence).collect();

        Some((frames.len() as f64 * stability * mean(&confidences), median_f0))
    }
}

/// Maximal runs of consecutive frames whose confidence exceeds `threshold`.
pub fn voiced_runs(track: &F0Track, threshold: f64) -> Vec<Range<usize>> {
    let mut runs = Vec::new();
    let mut run_start = None;

    for (i, frame) in track.frames().iter().enumerate() {
        match (frame.is_voiced(threshold), run_start) {
            (true, None) => run_start = Some(i),
            (false, Some(start)) => {
                runs.push(start..i);
                run_start = None;
            }
            _ => {}
        }
    }
    if let Some(start) = run_start {
        runs.push(start..track.len());
    }

    runs
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    const SR: u32 = 24_000;

    fn tone(freq: f64, secs: f64) -> Vec<f32> {
        let n = (secs * SR as f64) as usize;
        (0..n)
            .map(|i| (0.5 * (2.0 * PI * freq * i as f64 / SR as f64).sin()) as f32)
            .collect()
    }

    fn chirp(f_start: f64, f_end: f64, secs: f64) -> Vec<f32> {
        let n = (secs * SR as f64) as usize;
        (0..n)
            .map(|i| {
                let t = i as f64 / SR as f64;
                let phase = 2.0 * PI * (f_start * t + (f_end - f_start) * t * t / (2.0 * secs));
                (0.5 * phase.sin()) as f32
            })
            .collect()
    }

    fn silence(secs: f64) -> Vec<f32> {
        vec![0.0; (secs * SR as f64) as usize]
    }

    fn frame(freq: f64, conf: f64) -> F0Frame {
        F0Frame {
            frequency_hz: freq,
            confidence: conf,
        }
    }

    fn assert_bounds(region: &StableRegion, len: usize) {
        assert!(region.start_sample < region.end_sample, "{region:?}");
        assert!(region.end_sample <= len, "{region:?} len={len}");
    }

    // ---- voiced_runs -------------------------------------------------------

    #[test]
    fn runs_are_maximal_and_half_open() {
        let frames = vec![
            frame(100.0, 0.9),
            frame(100.0, 0.9),
            frame(0.0, 0.1),
            frame(100.0, 0.5),
            frame(100.0, 0.4), // not strictly above threshold
            frame(100.0, 0.8),
        ];
        let track = F0Track::from_frames(frames, 2048, 512);
        assert_eq!(voiced_runs(&track, 0.4), vec![0..2, 3..4, 5..6]);
    }

    #[test]
    fn no_voiced_frames_no_runs() {
        let track = F0Track::from_frames(vec![F0Frame::UNVOICED; 5], 2048, 512);
        assert!(voiced_runs(&track, 0.4).is_empty());
    }

    // ---- score_run ---------------------------------------------------------

    #[test]
    fn run_with_too_few_plausible_values_is_skipped() {
        let selector = RegionSelector::default();
        let frames = vec![frame(150.0, 0.9), frame(700.0, 0.9), frame(20.0, 0.9), frame(151.0, 0.9)];
        assert!(selector.score_run(&frames).is_none());
    }

    #[test]
    fn flat_run_scores_length_times_confidence() {
        let selector = RegionSelector::default();
        let frames = vec![frame(200.0, 0.8); 10];
        let (score, median_f0) = selector.score_run(&frames).unwrap();
        assert!((score - 8.0).abs() < 1e-9, "score = {score}");
        assert_eq!(median_f0, 200.0);
    }

    #[test]
    fn unstable_run_scores_zero() {
        let selector = RegionSelector::default();
        let frames: Vec<F0Frame> = [100.0, 300.0, 100.0, 300.0]
            .iter()
            .map(|&hz| frame(hz, 0.9))
            .collect();
        let (score, _) = selector.score_run(&frames).unwrap();
        assert_eq!(score, 0.0);
    }

    // ---- select ------------------------------------------------------------

    #[test]
    fn steady_tone_uses_whole_signal() {
        let signal = tone(150.0, 0.5);
        let region = RegionSelector::default().select(&signal, SR, 0.3);

        assert!(!region.is_fallback);
        assert_eq!(region.start_sample, 0);
        assert_eq!(region.end_sample, signal.len());
        assert!((region.median_f0_hz - 150.0).abs() < 3.0, "{region:?}");
    }

    #[test]
    fn tone_between_silences_is_found() {
        let mut signal = silence(0.3);
        signal.extend(tone(150.0, 0.6));
        signal.extend(silence(0.3));

        let region = RegionSelector::default().select(&signal, SR, 0.3);
        assert!(!region.is_fallback);
        assert_bounds(&region, signal.len());
        assert!(region.start_sample + 2048 >= 7_200, "{region:?}");
        assert!(region.end_sample <= 21_600 + 2048, "{region:?}");
        assert!((region.median_f0_hz - 150.0).abs() < 3.0);
    }

    #[test]
    fn stable_run_beats_gliding_run() {
        let mut signal = chirp(120.0, 300.0, 0.6);
        signal.extend(silence(0.3));
        let stable_start = signal.len();
        signal.extend(tone(220.0, 0.6));

        let region = RegionSelector::default().select(&signal, SR, 0.3);
        assert!(!region.is_fallback);
        assert!(region.start_sample + 2048 >= stable_start, "{region:?}");
        assert!((region.median_f0_hz - 220.0).abs() < 4.4, "{region:?}");
    }

    #[test]
    fn silence_falls_back_to_default_window() {
        let signal = silence(1.0);
        let region = RegionSelector::default().select(&signal, SR, 0.3);

        assert!(region.is_fallback);
        assert_eq!(region.median_f0_hz, 200.0);
        assert_eq!(region.start_sample, 0);
        // 14 frames × 512 + one 2048-sample frame
        assert_eq!(region.end_sample, 14 * 512 + 2048);
        assert_bounds(&region, signal.len());
    }

    #[test]
    fn short_voiced_burst_falls_back() {
        let mut signal = silence(0.5);
        signal.extend(tone(180.0, 0.1));
        signal.extend(silence(0.5));

        let region = RegionSelector::default().select(&signal, SR, 0.3);
        assert!(region.is_fallback);
        assert_bounds(&region, signal.len());
    }

    #[test]
    fn signal_shorter_than_a_frame_keeps_valid_bounds() {
        let signal = tone(150.0, 0.05);
        let region = RegionSelector::default().select(&signal, SR, 0.3);
        assert_eq!(region.start_sample, 0);
        assert_eq!(region.end_sample, signal.len());
    }

    #[test]
    fn empty_signal_gives_empty_region() {
        let region = RegionSelector::default().select(&[], SR, 0.3);
        assert!(region.is_empty());
        assert!(region.excerpt(&[]).is_empty());
    }

    #[test]
    fn excerpt_copies_region() {
        let signal: Vec<f32> = (0..10).map(|i| i as f32).collect();
        let region = StableRegion {
            start_sample: 2,
            end_sample: 5,
            median_f0_hz: 100.0,
            is_fallback: false,
        };
        assert_eq!(region.excerpt(&signal), vec![2.0, 3.0, 4.0]);
        assert_eq!(region.len(), 3);
        assert!((region.duration_secs(10) - 0.3).abs() < 1e-12);
    }
}
