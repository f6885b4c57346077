//! Application entry point: vowel calibration generator.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Parse the command line.
//! 3. Load [`CalibrationConfig`] (defaults when no settings file exists) and
//!    apply command-line overrides.
//! 4. Check the model and voice files.
//! 5. Load the speech engine.
//! 6. Run the [`CalibrationRunner`] into the output directory.
//!
//! Any failure prints a diagnostic and exits with status 1.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use vowel_calib::{
    config::{AppPaths, CalibrationConfig},
    pipeline::{CalibrationRunner, PipelineError},
    tts::SpeechEngine,
};

// ---------------------------------------------------------------------------
// Command line
// ---------------------------------------------------------------------------

/// Generate vowel calibration WAVs (AH, EE, OO) from a TTS voice.
#[derive(Debug, Parser)]
#[command(name = "vowel-calib", version)]
struct Cli {
    /// Voice id, e.g. af_heart or am_fenrir.
    #[arg(long)]
    voice: String,

    /// Output directory for the WAVs and calib_report.json.
    #[arg(long)]
    out: PathBuf,

    /// Engine speaking rate; slower speech gives longer vowels [default: 0.7].
    #[arg(long)]
    speed: Option<f32>,

    /// Path to the ONNX model.
    #[arg(long)]
    model: Option<PathBuf>,

    /// Path to the .npz voice-style archive.
    #[arg(long, alias = "voices-npz")]
    voices: Option<PathBuf>,

    /// Kokoro config.json whose "vocab" maps phonemes to token ids
    /// [default: config.json next to the model]. Without one the built-in
    /// StyleTTS2 table is used, which does not match Kokoro's ids for every
    /// symbol.
    #[arg(long)]
    vocab: Option<PathBuf>,

    /// Settings file (TOML) to use instead of the platform default.
    #[arg(long)]
    config: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

fn load_config(cli: &Cli) -> Result<CalibrationConfig> {
    let mut config = match &cli.config {
        Some(path) => CalibrationConfig::load_from(path)
            .with_context(|| format!("failed to read settings {}", path.display()))?,
        None => CalibrationConfig::load().unwrap_or_else(|e| {
            log::warn!("Failed to load config ({e}); using defaults");
            CalibrationConfig::default()
        }),
    };

    if let Some(speed) = cli.speed {
        config.synthesis.speed = speed;
    }
    if let Some(model) = &cli.model {
        config.model.model_path = Some(model.clone());
    }
    if let Some(voices) = &cli.voices {
        config.model.voices_path = Some(voices.clone());
    }
    if let Some(vocab) = &cli.vocab {
        config.model.vocab_path = Some(vocab.clone());
    }

    config.validate()?;
    Ok(config)
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

#[cfg(feature = "kokoro")]
fn load_engine(
    config: &CalibrationConfig,
    paths: &AppPaths,
    voice: &str,
) -> Result<Box<dyn SpeechEngine>, PipelineError> {
    use vowel_calib::tts::{KokoroEngine, KokoroOptions};

    let model_path = config.model.resolved_model_path(paths);
    log::info!("Loading model: {}", model_path.display());

    let engine = KokoroEngine::load(KokoroOptions {
        model_path,
        voices_path: config.model.resolved_voices_path(paths),
        voice: voice.to_string(),
        vocab_path: config.model.resolved_vocab_path(paths),
        language: config.synthesis.language.clone(),
        max_style_index: config.synthesis.max_style_index,
    })?;
    Ok(Box::new(engine))
}

#[cfg(not(feature = "kokoro"))]
fn load_engine(
    _config: &CalibrationConfig,
    _paths: &AppPaths,
    _voice: &str,
) -> Result<Box<dyn SpeechEngine>, PipelineError> {
    Err(PipelineError::Configuration(
        "built without kokoro support; rebuild with `--features kokoro`".into(),
    ))
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli)?;
    let paths = AppPaths::new();

    let model_path = config.model.resolved_model_path(&paths);
    if !model_path.exists() {
        return Err(PipelineError::Configuration(format!(
            "Model not found: {}",
            model_path.display()
        ))
        .into());
    }
    let voices_path = config.model.resolved_voices_path(&paths);
    if !voices_path.exists() {
        return Err(PipelineError::Configuration(format!(
            "Voices not found: {}",
            voices_path.display()
        ))
        .into());
    }

    let mut engine = load_engine(&config, &paths, &cli.voice)?;

    log::info!(
        "Voice {} at speed {} → {}",
        cli.voice,
        config.synthesis.speed,
        cli.out.display()
    );
    let runner = CalibrationRunner::new(config, cli.voice.clone())?;
    let report = runner.run(engine.as_mut(), &cli.out)?;

    log::info!(
        "Done: {} vowels written to {}",
        report.vowels.len(),
        cli.out.display()
    );
    Ok(())
}

fn main() -> ExitCode {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // 2. Command line
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}{e:#}", failure_prefix(&e));
            ExitCode::from(1)
        }
    }
}

/// Points the user at their settings when the failure is theirs to fix.
fn failure_prefix(err: &anyhow::Error) -> &'static str {
    match err.downcast_ref::<PipelineError>() {
        Some(e) if e.is_configuration() => "check --model/--voices/--voice and settings: ",
        Some(_) => "calibration failed: ",
        None => "",
    }
}
