//! Calibration runner: drives every vowel through synthesis, analysis,
//! assembly and output.
//!
//! # Pipeline flow
//!
//! ```text
//! for vowel in AH, EE, OO:
//!   engine.synthesize(prompt, speed)              [Synthesized]
//!     └─▶ RegionSelector::select → excerpt        [RegionSelected]
//!           ├─▶ F0Summarizer::summarize (report)
//!           └─▶ WaveformAssembler::assemble       [Assembled]
//!                 └─▶ write <VOWEL>.wav           [Written]
//! write calib_report.json
//! ```
//!
//! Everything runs sequentially on the caller's thread; the first error
//! stops the run.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::audio::{
    write_wav, AssemblyError, F0Stats, F0Summarizer, RegionSelector, StableRegion,
    WaveformAssembler,
};
use crate::config::CalibrationConfig;
use crate::tts::{SpeechEngine, TtsError};

use super::report::{CalibrationReport, VowelReport, REPORT_FILE};
use super::state::{Vowel, VowelStage};

// ---------------------------------------------------------------------------
// PipelineError
// ---------------------------------------------------------------------------

/// Errors that stop a calibration run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Bad settings, paths, unknown voice or missing build feature.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The engine returned less audio than the region selector needs.
    #[error(
        "{vowel}: engine produced too little audio ({samples} samples, need {min_samples} \
         at {sample_rate} Hz); try a longer prompt or a different speed"
    )]
    SynthesisTooShort {
        vowel: Vowel,
        samples: usize,
        min_samples: usize,
        sample_rate: u32,
    },

    /// The engine failed while synthesizing.
    #[error("synthesis failed: {0}")]
    Synthesis(#[from] TtsError),

    /// The output buffer could not be built.
    #[error("assembly failed: {0}")]
    Assembly(#[from] AssemblyError),

    /// A WAV file, the report or the output directory could not be written.
    #[error("failed to write {}: {message}", path.display())]
    Output { path: PathBuf, message: String },
}

impl PipelineError {
    /// `true` when the user has to fix paths, voice id or build features.
    pub fn is_configuration(&self) -> bool {
        match self {
            PipelineError::Configuration(_) => true,
            PipelineError::Synthesis(e) => e.is_configuration(),
            _ => false,
        }
    }

    fn output(path: &Path, err: impl std::fmt::Display) -> Self {
        PipelineError::Output {
            path: path.to_path_buf(),
            message: err.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// VowelOutput
// ---------------------------------------------------------------------------

/// Everything produced for one vowel before it is written.
#[derive(Debug, Clone)]
pub struct VowelOutput {
    pub vowel: Vowel,
    /// Region of the synthesized buffer the output was built from.
    pub region: StableRegion,
    pub stats: F0Stats,
    /// Final audio at the target rate.
    pub audio: Vec<f32>,
    /// How far the vowel got; [`VowelStage::Assembled`] until written.
    pub stage: VowelStage,
}

// ---------------------------------------------------------------------------
// CalibrationRunner
// ---------------------------------------------------------------------------

/// Produces the calibration set for one voice.
///
/// ```rust,no_run
/// use std::path::Path;
/// use vowel_calib::config::CalibrationConfig;
/// use vowel_calib::pipeline::CalibrationRunner;
/// # use vowel_calib::tts::SpeechEngine;
/// # fn make_engine() -> Box<dyn SpeechEngine> { unimplemented!() }
///
/// let runner = CalibrationRunner::new(CalibrationConfig::default(), "af_heart").unwrap();
/// let mut engine = make_engine();
/// let report = runner.run(engine.as_mut(), Path::new("calib/af_heart")).unwrap();
/// println!("{}", report.to_json().unwrap());
/// ```
#[derive(Debug, Clone)]
pub struct CalibrationRunner {
    config: CalibrationConfig,
    voice: String,
    selector: RegionSelector,
    summarizer: F0Summarizer,
    assembler: WaveformAssembler,
}

impl CalibrationRunner {
    /// Build the stage components.  Invalid settings are reported as
    /// [`PipelineError::Configuration`].
    pub fn new(config: CalibrationConfig, voice: impl Into<String>) -> Result<Self, PipelineError> {
        config
            .validate()
            .map_err(|e| PipelineError::Configuration(format!("{e:#}")))?;
        Ok(Self {
            selector: RegionSelector::from_config(&config.analysis),
            summarizer: F0Summarizer::from_config(&config.analysis),
            assembler: WaveformAssembler::new(config.target.clone()),
            config,
            voice: voice.into(),
        })
    }

    /// Generate every vowel into `out_dir` (created if missing), then write
    /// the report next to them.
    pub fn run(
        &self,
        engine: &mut dyn SpeechEngine,
        out_dir: &Path,
    ) -> Result<CalibrationReport, PipelineError> {
        std::fs::create_dir_all(out_dir).map_err(|e| PipelineError::output(out_dir, e))?;

        let mut report =
            CalibrationReport::new(&self.voice, self.config.synthesis.speed, &self.config.target);

        for vowel in Vowel::ALL {
            let mut output = self.process_vowel(engine, vowel)?;
            let entry = self.write_vowel(&mut output, out_dir)?;
            if !output.stage.is_terminal() {
                return Err(PipelineError::output(
                    &out_dir.join(vowel.file_name()),
                    format!("{vowel} stopped at {}", output.stage),
                ));
            }
            report.insert(vowel.name(), entry);
        }

        let report_path = out_dir.join(REPORT_FILE);
        report
            .write(&report_path)
            .map_err(|e| PipelineError::output(&report_path, e))?;
        log::info!("report: {}", report_path.display());

        Ok(report)
    }

    /// Synthesize, analyse and assemble one vowel.  Nothing is written.
    pub fn process_vowel(
        &self,
        engine: &mut dyn SpeechEngine,
        vowel: Vowel,
    ) -> Result<VowelOutput, PipelineError> {
        let mut stage = VowelStage::PromptReady;
        let rate = engine.sample_rate();
        log::info!("{vowel}: generating");

        // ── Synthesize ───────────────────────────────────────────────────
        let speech = engine.synthesize(vowel.prompt(), self.config.synthesis.speed)?;
        let min_samples = (rate as f64 * self.config.synthesis.min_synthesis_secs).ceil() as usize;
        if speech.len() < min_samples {
            return Err(PipelineError::SynthesisTooShort {
                vowel,
                samples: speech.len(),
                min_samples,
                sample_rate: rate,
            });
        }
        advance(&mut stage, vowel);
        log::debug!(
            "{vowel}: {:.2}s of speech @ {rate} Hz",
            speech.len() as f64 / rate as f64
        );

        // ── Select region ────────────────────────────────────────────────
        let region = self
            .selector
            .select(&speech, rate, self.config.analysis.min_region_secs);
        let excerpt = region.excerpt(&speech);
        let stats = self.summarizer.summarize(&excerpt, rate);
        advance(&mut stage, vowel);
        log::info!(
            "{vowel}: region {:.2}-{:.2}s ({:.2}s), median F0 {:.1} Hz{}",
            region.start_sample as f64 / rate as f64,
            region.end_sample as f64 / rate as f64,
            region.duration_secs(rate),
            region.median_f0_hz,
            if region.is_fallback { " (fallback)" } else { "" }
        );

        // ── Assemble ─────────────────────────────────────────────────────
        let audio = self.assembler.assemble(&excerpt, rate)?;
        advance(&mut stage, vowel);

        Ok(VowelOutput {
            vowel,
            region,
            stats,
            audio,
            stage,
        })
    }

    /// Write `<VOWEL>.wav` and move `output` to [`VowelStage::Written`].
    fn write_vowel(
        &self,
        output: &mut VowelOutput,
        out_dir: &Path,
    ) -> Result<VowelReport, PipelineError> {
        let target = &self.config.target;
        let path = out_dir.join(output.vowel.file_name());
        write_wav(&path, &output.audio, target.sample_rate)
            .map_err(|e| PipelineError::output(&path, e))?;

        advance(&mut output.stage, output.vowel);

        let stats = &output.stats;
        log::info!(
            "{}: wrote {} ({:.1}s, {} Hz); F0 {:.1} ± {:.1} Hz, voiced {:.0}%, confidence {:.2}",
            output.vowel,
            path.display(),
            output.audio.len() as f64 / target.sample_rate as f64,
            target.sample_rate,
            stats.f0_mean,
            stats.f0_std,
            stats.voiced_ratio * 100.0,
            stats.confidence_mean
        );

        Ok(VowelReport::new(
            output.audio.len(),
            target.sample_rate,
            target.peak_dbfs,
            output.stats,
        ))
    }
}

fn advance(stage: &mut VowelStage, vowel: Vowel) {
    if let Some(next) = stage.next() {
        log::debug!("pipeline: {vowel} {stage} → {next}");
        *stage = next;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
