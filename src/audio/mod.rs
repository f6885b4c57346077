//! Signal analysis and audio construction for vowel calibration.
//!
//! # Pipeline
//!
//! ```text
//! TTS buffer → PitchEstimator → RegionSelector → excerpt
//!            → F0Summarizer (report statistics)
//!            → WaveformAssembler (resample → trim/tile → normalise → fades)
//!            → write_wav
//! ```
//!
//! # Quick Start
//!
//! ```rust
//! use vowel_calib::audio::{F0Summarizer, RegionSelector, WaveformAssembler};
//!
//! let rate = 24_000;
//! let speech: Vec<f32> = (0..rate)
//!     .map(|i| (2.0 * std::f32::consts::PI * 150.0 * i as f32 / rate as f32).sin() * 0.5)
//!     .collect();
//!
//! let region = RegionSelector::default().select(&speech, rate, 0.3);
//! let excerpt = region.excerpt(&speech);
//! let stats = F0Summarizer::default().summarize(&excerpt, rate);
//! let audio = WaveformAssembler::default().assemble(&excerpt, rate).unwrap();
//!
//! assert!((stats.f0_mean - 150.0).abs() < 3.0);
//! assert_eq!(audio.len(), 144_000);
//! ```

pub mod assemble;
pub mod pitch;
pub mod region;
pub mod resample;
pub mod stats;
pub mod wav;

pub use assemble::{AssemblyError, WaveformAssembler};
pub use pitch::{frame_count, F0Frame, F0Track, PitchEstimator};
pub use region::{voiced_runs, RegionSelector, StableRegion};
pub use resample::{resample, ResampleError};
pub use stats::{F0Stats, F0Summarizer};
pub use wav::write_wav;
