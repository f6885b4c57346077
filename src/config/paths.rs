//! Cross-platform application paths using the `dirs` crate.
//!
//! Layout:
//!
//! Config dir (settings):
//!   Windows: %APPDATA%\vowel-calib\
//!   macOS:   ~/Library/Application Support/vowel-calib/
//!   Linux:   ~/.config/vowel-calib/
//!
//! Data dir (models):
//!   Windows: %LOCALAPPDATA%\vowel-calib\models\
//!   macOS:   ~/Library/Application Support/vowel-calib/models/
//!   Linux:   ~/.local/share/vowel-calib/models/

use std::path::PathBuf;

/// Holds all resolved application directory/file paths.
#[derive(Debug, Clone)]
pub struct AppPaths {
    /// Directory for `settings.toml`.
    pub config_dir: PathBuf,
    /// Full path to `settings.toml`.
    pub settings_file: PathBuf,
    /// Directory holding `kokoro.onnx` and `voices.npz`.
    pub models_dir: PathBuf,
}

impl AppPaths {
    const APP_NAME: &'static str = "vowel-calib";
    const MODEL_FILE: &'static str = "kokoro.onnx";
    const VOICES_FILE: &'static str = "voices.npz";

    /// Resolves all paths using the `dirs` crate.
    ///
    /// Falls back to the current directory if the platform cannot provide a
    /// standard path.
    pub fn new() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);

        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);

        Self {
            settings_file: config_dir.join("settings.toml"),
            config_dir,
            models_dir: data_dir.join("models"),
        }
    }

    /// `<models_dir>/kokoro.onnx`
    pub fn default_model_file(&self) -> PathBuf {
        self.models_dir.join(Self::MODEL_FILE)
    }

    /// `<models_dir>/voices.npz`
    pub fn default_voices_file(&self) -> PathBuf {
        self.models_dir.join(Self::VOICES_FILE)
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}
