//! Configuration module for vowel calibration.
//!
//! Provides `CalibrationConfig` (top-level settings), sub-configs for each
//! pipeline stage, `AppPaths` for cross-platform directories, and TOML
//! persistence via `CalibrationConfig::load_from` / `CalibrationConfig::save_to`.

pub mod paths;
pub mod settings;

pub use paths::AppPaths;
pub use settings::{
    AnalysisConfig, CalibrationConfig, ModelConfig, SynthesisConfig, TargetConfig,
};
