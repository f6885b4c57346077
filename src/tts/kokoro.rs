//! Kokoro ONNX speech engine.
//!
//! [`KokoroEngine`] runs a Kokoro-82M style acoustic model with `ort`:
//!
//! ```text
//! text → espeak IPA → token ids → [0, ids…, 0] ─┐
//!                  voice style row[min(n, 509)] ├─▶ session.run → 24 kHz f32
//!                                        speed ─┘
//! ```
//!
//! The model's declared input names are probed once in
//! [`KokoroEngine::load`]: v1.0 exports name the token tensor `input_ids`,
//! older exports call it `tokens`.

use std::path::{Path, PathBuf};

use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Tensor;

use super::engine::{SpeechEngine, TtsError};
use super::phonemize::{bracket, EspeakPhonemizer, PhonemeTokenizer, Phonemizer};
use super::voices::{VoiceStyle, VoiceTable};

/// Kokoro's native output rate.
pub const KOKORO_SAMPLE_RATE: u32 = 24_000;

const TOKEN_INPUT_V1: &str = "input_ids";
const TOKEN_INPUT_LEGACY: &str = "tokens";
const STYLE_INPUT: &str = "style";
const SPEED_INPUT: &str = "speed";

// ---------------------------------------------------------------------------
// KokoroOptions
// ---------------------------------------------------------------------------

/// Everything [`KokoroEngine::load`] needs.
#[derive(Debug, Clone)]
pub struct KokoroOptions {
    pub model_path: PathBuf,
    pub voices_path: PathBuf,
    pub voice: String,
    /// Kokoro `config.json` whose `"vocab"` replaces the built-in table.
    pub vocab_path: Option<PathBuf>,
    /// espeak voice used for phonemization.
    pub language: String,
    /// Largest style row index ever selected.
    pub max_style_index: usize,
}

// ---------------------------------------------------------------------------
// KokoroEngine
// ---------------------------------------------------------------------------

pub struct KokoroEngine {
    session: Session,
    token_input: String,
    style: VoiceStyle,
    tokenizer: PhonemeTokenizer,
    phonemizer: Box<dyn Phonemizer>,
    language: String,
    max_style_index: usize,
}

impl std::fmt::Debug for KokoroEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KokoroEngine")
            .field("token_input", &self.token_input)
            .field("style_rows", &self.style.rows())
            .field("phonemizer", &self.phonemizer.name())
            .field("language", &self.language)
            .finish_non_exhaustive()
    }
}

impl KokoroEngine {
    /// Load the model and the selected voice.
    ///
    /// # Errors
    ///
    /// - [`TtsError::ModelNotFound`]: `model_path` does not exist.
    /// - [`TtsError::VoicesNotFound`] / [`TtsError::VoiceData`]: the voice
    ///   archive is missing or malformed.
    /// - [`TtsError::UnknownVoice`]: `voice` is not in the archive.
    /// - [`TtsError::Unsupported`]: no espeak binary on `PATH`.
    /// - [`TtsError::Inference`]: ONNX Runtime rejected the model.
    pub fn load(options: KokoroOptions) -> Result<Self, TtsError> {
        if !options.model_path.exists() {
            return Err(TtsError::ModelNotFound(
                options.model_path.display().to_string(),
            ));
        }

        let table = VoiceTable::load(&options.voices_path)?;
        let style = table.style(&options.voice)?.clone();
        log::info!(
            "voice {} ({} style rows × {})",
            options.voice,
            style.rows(),
            style.cols()
        );

        let tokenizer = match &options.vocab_path {
            Some(path) => PhonemeTokenizer::from_vocab_json(path)?,
            None => {
                log::warn!("no vocab file; using the built-in phoneme table");
                PhonemeTokenizer::default()
            }
        };
        let phonemizer = EspeakPhonemizer::detect()?;

        let session = build_session(&options.model_path)?;
        let declared: Vec<String> = session.inputs.iter().map(|i| i.name.clone()).collect();
        let token_input = token_input_name(&declared).to_string();
        log::debug!("model inputs {declared:?}; tokens bound to '{token_input}'");

        Ok(Self {
            session,
            token_input,
            style,
            tokenizer,
            phonemizer: Box::new(phonemizer),
            language: options.language,
            max_style_index: options.max_style_index,
        })
    }
}

impl SpeechEngine for KokoroEngine {
    fn sample_rate(&self) -> u32 {
        KOKORO_SAMPLE_RATE
    }

    fn synthesize(&mut self, text: &str, speed: f32) -> Result<Vec<f32>, TtsError> {
        let phonemes = self.phonemizer.phonemize(text, &self.language)?;
        let tokens = self.tokenizer.tokenize(&phonemes);
        if tokens.is_empty() {
            return Err(TtsError::Phonemize(format!(
                "no known phoneme symbols in '{phonemes}'"
            )));
        }

        let style_index = style_index(tokens.len(), self.max_style_index);
        let style = self.style.row(style_index).to_vec();
        log::debug!(
            "{} tokens, style row {style_index}, speed {speed}",
            tokens.len()
        );

        let ids = bracket(&tokens);
        let ids_len = ids.len();
        let style_len = style.len();
        let to_err = |e: ort::Error| TtsError::Inference(e.to_string());

        let ids = Tensor::from_array(([1usize, ids_len], ids)).map_err(to_err)?;
        let style = Tensor::from_array(([1usize, style_len], style)).map_err(to_err)?;
        let speed = Tensor::from_array(([1usize], vec![speed])).map_err(to_err)?;

        let outputs = self
            .session
            .run(ort::inputs![
                self.token_input.as_str() => ids,
                STYLE_INPUT => style,
                SPEED_INPUT => speed
            ])
            .map_err(to_err)?;

        if outputs.len() == 0 {
            return Err(TtsError::Inference("model returned no outputs".into()));
        }
        let (_, audio) = outputs[0].try_extract_tensor::<f32>().map_err(to_err)?;
        Ok(audio.to_vec())
    }
}

fn build_session(path: &Path) -> Result<Session, TtsError> {
    Session::builder()
        .and_then(|b| b.with_optimization_level(GraphOptimizationLevel::Level3))
        .and_then(|b| b.with_intra_threads(num_threads()))
        .and_then(|b| b.commit_from_file(path))
        .map_err(|e| TtsError::Inference(format!("failed to load {}: {e}", path.display())))
}

fn num_threads() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get().min(8))
        .unwrap_or(4)
}

/// `input_ids` when the model declares it, `tokens` otherwise.
pub fn token_input_name(declared: &[String]) -> &'static str {
    if declared.iter().any(|n| n == TOKEN_INPUT_V1) {
        TOKEN_INPUT_V1
    } else {
        TOKEN_INPUT_LEGACY
    }
}

/// Style row for a sequence of `token_count` tokens (before bracketing).
pub fn style_index(token_count: usize, max_style_index: usize) -> usize {
    token_count.min(max_style_index)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn options(dir: &Path) -> KokoroOptions {
        KokoroOptions {
            model_path: dir.join("kokoro.onnx"),
            voices_path: dir.join("voices.npz"),
            voice: "af_heart".into(),
            vocab_path: None,
            language: "en-us".into(),
            max_style_index: 509,
        }
    }

    #[test]
    fn prefers_input_ids_when_declared() {
        let declared = vec!["input_ids".to_string(), "style".into(), "speed".into()];
        assert_eq!(token_input_name(&declared), "input_ids");
    }

    #[test]
    fn falls_back_to_tokens() {
        let declared = vec!["tokens".to_string(), "style".into(), "speed".into()];
        assert_eq!(token_input_name(&declared), "tokens");
        assert_eq!(token_input_name(&[]), "tokens");
    }

    #[test]
    fn style_index_is_clamped() {
        assert_eq!(style_index(42, 509), 42);
        assert_eq!(style_index(510, 509), 509);
        assert_eq!(style_index(0, 509), 0);
    }

    #[test]
    fn missing_model_is_model_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = KokoroEngine::load(options(dir.path())).unwrap_err();
        assert!(matches!(err, TtsError::ModelNotFound(_)), "{err:?}");
        assert!(err.is_configuration());
    }

    #[test]
    fn missing_voices_is_voices_not_found() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("kokoro.onnx"), b"not a model").unwrap();
        let err = KokoroEngine::load(options(dir.path())).unwrap_err();
        assert!(matches!(err, TtsError::VoicesNotFound(_)), "{err:?}");
    }
}
