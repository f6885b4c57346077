//! Vowel calibration pipeline.
//!
//! This module drives a [`SpeechEngine`](crate::tts::SpeechEngine) through
//! the three vowel prompts and turns each result into a fixed-length WAV
//! plus a report entry.
//!
//! # Architecture
//!
//! ```text
//! CalibrationRunner::run(engine, out_dir)
//!        │
//!        ├─ AH ─┐
//!        ├─ EE ─┼─ process_vowel: synthesize → select region → assemble
//!        └─ OO ─┘        │
//!                        └─ write <VOWEL>.wav, add VowelReport
//!        │
//!        └─ write calib_report.json
//! ```

pub mod report;
pub mod runner;
pub mod state;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use report::{CalibrationReport, VowelReport, REPORT_FILE};
pub use runner::{CalibrationRunner, PipelineError, VowelOutput};
pub use state::{Vowel, VowelStage};
