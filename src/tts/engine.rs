//! Core speech-engine trait and its error type.
//!
//! # Overview
//!
//! [`SpeechEngine`] is the interface the calibration pipeline drives.  It is
//! object-safe so the runner can hold a `Box<dyn SpeechEngine>` regardless
//! of which backend was built.
//!
//! [`KokoroEngine`](crate::tts::KokoroEngine) (feature `kokoro`) is the
//! production implementation.
//!
//! [`MockSpeechEngine`] (available under `#[cfg(test)]`) returns a
//! pre-configured buffer and records every request, which is enough to
//! exercise the pipeline without a model file.

use thiserror::Error;

// ---------------------------------------------------------------------------
// TtsError
// ---------------------------------------------------------------------------

/// All errors that can arise from the TTS subsystem.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TtsError {
    /// The ONNX model file was not found at the given path.
    #[error("model not found: {0}")]
    ModelNotFound(String),

    /// The voice-style archive was not found at the given path.
    #[error("voices not found: {0}")]
    VoicesNotFound(String),

    /// The requested voice id is not in the voice table.
    #[error("voice '{voice}' not found. Available: {}", available.join(", "))]
    UnknownVoice { voice: String, available: Vec<String> },

    /// The voice archive or one of its entries could not be decoded.
    #[error("invalid voice data: {0}")]
    VoiceData(String),

    /// Text could not be converted to phonemes.
    #[error("phonemizer failed: {0}")]
    Phonemize(String),

    /// The inference backend failed to load or run.
    #[error("inference failed: {0}")]
    Inference(String),

    /// This build has no backend for the requested operation.
    #[error("unsupported: {0}")]
    Unsupported(String),
}

impl TtsError {
    /// `true` for problems the user fixes by changing paths, voice id or
    /// build features, as opposed to runtime failures.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            TtsError::ModelNotFound(_)
                | TtsError::VoicesNotFound(_)
                | TtsError::UnknownVoice { .. }
                | TtsError::VoiceData(_)
                | TtsError::Unsupported(_)
        )
    }
}

// ---------------------------------------------------------------------------
// SpeechEngine trait
// ---------------------------------------------------------------------------

/// Object-safe interface for text-to-speech engines.
///
/// # Contract
///
/// - Output is **mono f32** PCM at [`sample_rate`](Self::sample_rate) Hz.
/// - `speed` scales speaking rate; `1.0` is the engine's natural pace and
///   smaller values produce longer audio.
pub trait SpeechEngine {
    /// Native output rate in Hz.
    fn sample_rate(&self) -> u32;

    /// Synthesize `text` and return the waveform.
    fn synthesize(&mut self, text: &str, speed: f32) -> Result<Vec<f32>, TtsError>;
}

// Compile-time assertion: Box<dyn SpeechEngine> must be constructible.
const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn SpeechEngine>) {}
};

// ---------------------------------------------------------------------------
// MockSpeechEngine  (test-only)
// ---------------------------------------------------------------------------

/// A test double that returns a pre-configured response without loading any
/// model file.  Every `(text, speed)` request is recorded in `calls`.
#[cfg(test)]
pub struct MockSpeechEngine {
    sample_rate: u32,
    response: Result<Vec<f32>, TtsError>,
    pub calls: Vec<(String, f32)>,
}

#[cfg(test)]
impl MockSpeechEngine {
    /// Create a mock that always returns `Ok(audio)`.
    pub fn ok(sample_rate: u32, audio: Vec<f32>) -> Self {
        Self {
            sample_rate,
            response: Ok(audio),
            calls: Vec::new(),
        }
    }

    /// Create a mock that always returns `secs` seconds of a sine at
    /// `freq` Hz.
    pub fn tone(sample_rate: u32, freq: f64, secs: f64) -> Self {
        let n = (secs * sample_rate as f64) as usize;
        let audio = (0..n)
            .map(|i| {
                let t = i as f64 / sample_rate as f64;
                (0.5 * (2.0 * std::f64::consts::PI * freq * t).sin()) as f32
            })
            .collect();
        Self::ok(sample_rate, audio)
    }

    /// Create a mock that always returns `Err(error)`.
    pub fn err(sample_rate: u32, error: TtsError) -> Self {
        Self {
            sample_rate,
            response: Err(error),
            calls: Vec::new(),
        }
    }
}

#[cfg(test)]
impl SpeechEngine for MockSpeechEngine {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn synthesize(&mut self, text: &str, speed: f32) -> Result<Vec<f32>, TtsError> {
        self.calls.push((text.to_string(), speed));
        self.response.clone()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
