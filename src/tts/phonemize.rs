//! Text → phonemes → token ids.
//!
//! [`EspeakPhonemizer`] shells out to `espeak-ng` (or `espeak`) for IPA
//! phonemes; [`PhonemeTokenizer`] maps each phoneme symbol to the model's
//! integer vocabulary.

use std::collections::HashMap;
use std::path::Path;
use std::process::{Command, Stdio};

use serde::Deserialize;

use super::engine::TtsError;

/// Longest token sequence the acoustic model accepts, before the two
/// sentinel tokens are added.
pub const MAX_TOKENS: usize = 510;

/// Sentinel / padding token id.
pub const PAD_TOKEN: i64 = 0;

// ---------------------------------------------------------------------------
// Phonemizer
// ---------------------------------------------------------------------------

pub trait Phonemizer {
    /// Program or backend name, for diagnostics.
    fn name(&self) -> &str;

    /// Convert `text` to an IPA phoneme string for `language`
    /// (an espeak voice such as `en-us`).
    fn phonemize(&self, text: &str, language: &str) -> Result<String, TtsError>;
}

#[derive(Debug, Clone)]
pub struct EspeakPhonemizer {
    program: String,
}

impl EspeakPhonemizer {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// First of `espeak-ng`, `espeak` found on `PATH`.
    pub fn detect() -> Result<Self, TtsError> {
        ["espeak-ng", "espeak"]
            .into_iter()
            .find(|p| executable_in_path(p))
            .map(Self::new)
            .ok_or_else(|| {
                TtsError::Unsupported(
                    "no espeak phonemizer found on PATH (tried: espeak-ng, espeak)".into(),
                )
            })
    }
}

impl Phonemizer for EspeakPhonemizer {
    fn name(&self) -> &str {
        &self.program
    }

    fn phonemize(&self, text: &str, language: &str) -> Result<String, TtsError> {
        let output = Command::new(&self.program)
            .args(["-q", "--ipa", "-v", language, text])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| {
                TtsError::Phonemize(format!("failed to execute '{}': {e}", self.program))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(TtsError::Phonemize(format!(
                "'{}' failed: {}",
                self.program,
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8(output.stdout)
            .map_err(|_| TtsError::Phonemize("phonemizer emitted non-UTF-8 output".into()))?;
        let phonemes = join_clauses(&stdout);
        if phonemes.is_empty() {
            return Err(TtsError::Phonemize(format!(
                "'{}' returned no phonemes",
                self.program
            )));
        }
        Ok(phonemes)
    }
}

/// espeak prints one line per clause; join them with single spaces.
fn join_clauses(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn executable_in_path(command: &str) -> bool {
    let Some(path_var) = std::env::var_os("PATH") else {
        return false;
    };
    std::env::split_paths(&path_var).any(|dir| {
        dir.join(command).is_file()
            || (cfg!(windows) && dir.join(format!("{command}.exe")).is_file())
    })
}

// ---------------------------------------------------------------------------
// PhonemeTokenizer
// ---------------------------------------------------------------------------

const PAD: &str = "$";
const PUNCTUATION: &str = ";:,.!?¡¿—…\"«»“” ";
const LETTERS: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";
const LETTERS_IPA: &str = "ɑɐɒæɓʙβɔɕçɗɖðʤəɘɚɛɜɝɞɟʄɡɠɢʛɦɧħɥʜɨɪʝɭɬɫɮʟɱɯɰŋɳɲɴøɵɸθœɶʘɹɺɾɻʀʁɽʂʃʈʧʉʊʋⱱʌɣɤʍχʎʏʑʐʒʔʡʕʢǀǁǂǃˈˌːˑʼʴʰʱʲʷˠˤ˞↓↑→↗↘'̩'ᵻ";

#[derive(Debug, Deserialize)]
struct ModelVocab {
    vocab: HashMap<String, i64>,
}

/// Phoneme symbol → token id map.
#[derive(Debug, Clone)]
pub struct PhonemeTokenizer {
    ids: HashMap<char, i64>,
}

impl Default for PhonemeTokenizer {
    /// The StyleTTS2 symbol enumeration.  Kokoro's own `config.json` vocab
    /// leaves gaps, so some symbols (upper-case letters among them) map to
    /// different ids there; prefer [`PhonemeTokenizer::from_vocab_json`].
    fn default() -> Self {
        let ids = PAD
            .chars()
            .chain(PUNCTUATION.chars())
            .chain(LETTERS.chars())
            .chain(LETTERS_IPA.chars())
            .enumerate()
            .map(|(i, c)| (c, i as i64))
            .collect();
        Self { ids }
    }
}

impl PhonemeTokenizer {
    /// Load the `"vocab"` table from a Kokoro `config.json`.  Multi-character
    /// keys are ignored.
    pub fn from_vocab_json(path: &Path) -> Result<Self, TtsError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| TtsError::VoiceData(format!("{}: {e}", path.display())))?;
        Self::from_vocab_str(&text)
            .map_err(|e| TtsError::VoiceData(format!("{}: {e}", path.display())))
    }

    pub fn from_vocab_str(json: &str) -> Result<Self, serde_json::Error> {
        let parsed: ModelVocab = serde_json::from_str(json)?;
        let ids = parsed
            .vocab
            .into_iter()
            .filter_map(|(symbol, id)| {
                let mut chars = symbol.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Some((c, id)),
                    _ => None,
                }
            })
            .collect();
        Ok(Self { ids })
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn id(&self, symbol: char) -> Option<i64> {
        self.ids.get(&symbol).copied()
    }

    /// Token ids for `phonemes`.  Unknown symbols are skipped and the result
    /// is clamped to [`MAX_TOKENS`].
    pub fn tokenize(&self, phonemes: &str) -> Vec<i64> {
        let mut tokens: Vec<i64> = phonemes.chars().filter_map(|c| self.id(c)).collect();
        if tokens.len() > MAX_TOKENS {
            log::warn!(
                "phoneme sequence has {} tokens; truncating to {MAX_TOKENS}",
                tokens.len()
            );
            tokens.truncate(MAX_TOKENS);
        }
        tokens
    }
}

/// `[PAD, tokens…, PAD]`, the layout the model expects.
pub fn bracket(tokens: &[i64]) -> Vec<i64> {
    let mut out = Vec::with_capacity(tokens.len() + 2);
    out.push(PAD_TOKEN);
    out.extend_from_slice(tokens);
    out.push(PAD_TOKEN);
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
