//! Calibration settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and handed to each
//! pipeline stage by value.

use std::path::PathBuf;

use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};

use super::AppPaths;

// ---------------------------------------------------------------------------
// TargetConfig
// ---------------------------------------------------------------------------

/// Shape of every generated vowel file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    /// Output sample rate in Hz (default: `48_000`).
    pub sample_rate: u32,
    /// Output length in seconds (default: `3.0`).
    pub duration_secs: f64,
    /// Peak level the output is normalised to, in dBFS (default: `-3.0`).
    pub peak_dbfs: f64,
    /// Length of the linear fade-in / fade-out at the file edges, in
    /// milliseconds (default: `10`).
    pub fade_ms: u32,
    /// Maximum cross-fade between tiled copies of a short excerpt, in
    /// milliseconds (default: `10`).
    pub crossfade_ms: u32,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48_000,
            duration_secs: 3.0,
            peak_dbfs: -3.0,
            fade_ms: 10,
            crossfade_ms: 10,
        }
    }
}

impl TargetConfig {
    /// Exact output length in samples: `round(duration × rate)`.
    pub fn target_samples(&self) -> usize {
        (self.duration_secs * self.sample_rate as f64).round() as usize
    }
}

// ---------------------------------------------------------------------------
// AnalysisConfig
// ---------------------------------------------------------------------------

/// Pitch-analysis parameters shared by the region selector and the
/// statistics summarizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Analysis frame length in samples (default: `2048`).
    pub frame_size: usize,
    /// Step between frames in samples (default: `512`).
    pub hop_size: usize,
    /// CMNDF dip threshold for picking a pitch period (default: `0.15`).
    pub threshold: f64,
    /// Frames with confidence strictly above this count as voiced
    /// (default: `0.4`).
    pub voicing_threshold: f64,
    /// Lower bound of plausible speech F0, exclusive (default: `50.0`).
    pub min_f0_hz: f64,
    /// Upper bound of plausible speech F0, exclusive (default: `500.0`).
    pub max_f0_hz: f64,
    /// Shortest voiced run worth considering, in seconds (default: `0.3`).
    pub min_region_secs: f64,
    /// F0 reported when no voiced run qualifies (default: `200.0`).
    pub fallback_f0_hz: f64,
}

impl AnalysisConfig {
    /// Reject values the pitch tracker cannot run with.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.frame_size >= 4,
            "analysis.frame_size must be at least 4, got {}",
            self.frame_size
        );
        ensure!(self.hop_size > 0, "analysis.hop_size must be greater than 0");
        ensure!(
            self.min_f0_hz < self.max_f0_hz,
            "analysis.min_f0_hz ({}) must be below analysis.max_f0_hz ({})",
            self.min_f0_hz,
            self.max_f0_hz
        );
        Ok(())
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            frame_size: 2048,
            hop_size: 512,
            threshold: 0.15,
            voicing_threshold: 0.4,
            min_f0_hz: 50.0,
            max_f0_hz: 500.0,
            min_region_secs: 0.3,
            fallback_f0_hz: 200.0,
        }
    }
}

// ---------------------------------------------------------------------------
// SynthesisConfig
// ---------------------------------------------------------------------------

/// How the TTS engine is driven for each vowel prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisConfig {
    /// Speaking-rate scalar passed to the engine; slower speech gives longer
    /// vowels (default: `0.7`).
    pub speed: f32,
    /// espeak language tag used for phonemisation (default: `"en-us"`).
    pub language: String,
    /// Synthesised audio shorter than this is rejected (default: `0.3` s).
    pub min_synthesis_secs: f64,
    /// Highest style-vector row selected by token count (default: `509`).
    pub max_style_index: usize,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            speed: 0.7,
            language: "en-us".into(),
            min_synthesis_secs: 0.3,
            max_style_index: 509,
        }
    }
}

// ---------------------------------------------------------------------------
// ModelConfig
// ---------------------------------------------------------------------------

/// Optional overrides for the model files.  `None` means "use the file in
/// [`AppPaths::models_dir`]".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Path to the ONNX acoustic model.
    pub model_path: Option<PathBuf>,
    /// Path to the `.npz` voice-style archive.
    pub voices_path: Option<PathBuf>,
    /// Path to a `config.json` carrying a `vocab` symbol table.
    pub vocab_path: Option<PathBuf>,
}

impl ModelConfig {
    /// Model path, falling back to `<models_dir>/kokoro.onnx`.
    pub fn resolved_model_path(&self, paths: &AppPaths) -> PathBuf {
        self.model_path
            .clone()
            .unwrap_or_else(|| paths.default_model_file())
    }

    /// Voices path, falling back to `<models_dir>/voices.npz`.
    pub fn resolved_voices_path(&self, paths: &AppPaths) -> PathBuf {
        self.voices_path
            .clone()
            .unwrap_or_else(|| paths.default_voices_file())
    }

    /// Vocab file: the explicit `vocab_path`, else a `config.json` next to
    /// the resolved model when one exists.
    pub fn resolved_vocab_path(&self, paths: &AppPaths) -> Option<PathBuf> {
        if let Some(path) = &self.vocab_path {
            return Some(path.clone());
        }
        let sibling = self
            .resolved_model_path(paths)
            .parent()?
            .join("config.json");
        sibling.is_file().then_some(sibling)
    }
}

// ---------------------------------------------------------------------------
// CalibrationConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level configuration, serialised as `settings.toml`.
///
/// Missing sections and keys fall back to their defaults, so a settings
/// file only needs the values it changes:
///
/// ```rust
/// use vowel_calib::config::CalibrationConfig;
///
/// let cfg: CalibrationConfig = toml::from_str("[target]\nduration_secs = 1.5\n").unwrap();
/// assert_eq!(cfg.target.duration_secs, 1.5);
/// assert_eq!(cfg.target.sample_rate, 48_000);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Output file shape.
    pub target: TargetConfig,
    /// Pitch analysis parameters.
    pub analysis: AnalysisConfig,
    /// Engine invocation settings.
    pub synthesis: SynthesisConfig,
    /// Model file overrides.
    pub model: ModelConfig,
}

impl CalibrationConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(CalibrationConfig::default())` when the file does not
    /// exist.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path.  The loaded values are validated.
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check every value a run depends on.
    pub fn validate(&self) -> Result<()> {
        self.analysis.validate()?;
        ensure!(
            self.target.sample_rate > 0,
            "target.sample_rate must be greater than 0"
        );
        ensure!(
            self.target.duration_secs.is_finite() && self.target.duration_secs > 0.0,
            "target.duration_secs must be a positive number, got {}",
            self.target.duration_secs
        );
        let speed = self.synthesis.speed;
        ensure!(
            speed.is_finite() && speed > 0.0,
            "speed must be a positive number, got {speed}"
        );
        Ok(())
    }

    /// Save to an explicit path, creating parent directories as needed.
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
