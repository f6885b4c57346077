//! TTS (text-to-speech) engine module.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                SpeechEngine (trait)                  │
//! │                                                      │
//! │   ┌──────────────┐    ┌──────────────┐               │
//! │   │ VoiceTable   │    │ KokoroEngine │               │
//! │   │ - voices.npz │───▶│ - session    │               │
//! │   │ - style rows │    │ - tokenizer  │               │
//! │   └──────────────┘    └──────┬───────┘               │
//! │                              │                       │
//! │                              ▼                       │
//! │                    ┌──────────────────┐              │
//! │                    │  synthesize()    │              │
//! │                    │  text → audio    │              │
//! │                    └──────────────────┘              │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! The ONNX backend (`kokoro`, `voices`) is behind the default `kokoro`
//! feature; the trait and the phonemizer are always available.

pub mod engine;
#[cfg(feature = "kokoro")]
pub mod kokoro;
pub mod phonemize;
#[cfg(feature = "kokoro")]
pub mod voices;

// ── Public re-exports ──────────────────────────────────────────────────────

pub use engine::{SpeechEngine, TtsError};
#[cfg(feature = "kokoro")]
pub use kokoro::{KokoroEngine, KokoroOptions, KOKORO_SAMPLE_RATE};
pub use phonemize::{EspeakPhonemizer, PhonemeTokenizer, Phonemizer};
#[cfg(feature = "kokoro")]
pub use voices::{VoiceStyle, VoiceTable};

// test-only re-export so the pipeline tests can use the mock engine directly.
#[cfg(test)]
pub use engine::MockSpeechEngine;
