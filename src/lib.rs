//! Vowel calibration set generator.
//!
//! Synthesizes vowel-rich sentences with a TTS engine, picks the most
//! stable voiced region of each, and turns it into a fixed-length,
//! peak-normalised reference WAV (`AH`, `EE`, `OO`) plus a JSON report of
//! pitch statistics.
//!
//! * [`audio`]: pitch tracking, region selection, statistics, waveform
//!   assembly, resampling and WAV output.
//! * [`tts`]: the [`SpeechEngine`](tts::SpeechEngine) trait and the Kokoro
//!   ONNX backend.
//! * [`pipeline`]: the per-vowel runner and the report.
//! * [`config`]: settings and platform paths.

pub mod audio;
pub mod config;
pub mod pipeline;
pub mod tts;
