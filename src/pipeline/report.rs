//! `calib_report.json`: run parameters plus per-vowel pitch statistics.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::audio::stats::round_to;
use crate::audio::F0Stats;
use crate::config::TargetConfig;

/// File name of the report inside the output directory.
pub const REPORT_FILE: &str = "calib_report.json";

/// One vowel's entry.  The statistics are flattened into the same JSON
/// object as the size fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VowelReport {
    pub samples: usize,
    /// Seconds, rounded to 3 decimals.
    pub duration_sec: f64,
    /// Configured peak level, not a measurement.
    pub peak_dbfs: f64,
    #[serde(flatten)]
    pub stats: F0Stats,
}

impl VowelReport {
    pub fn new(samples: usize, sample_rate: u32, peak_dbfs: f64, stats: F0Stats) -> Self {
        Self {
            samples,
            duration_sec: round_to(samples as f64 / sample_rate as f64, 3),
            peak_dbfs,
            stats,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationReport {
    pub voice: String,
    pub speed: f32,
    pub target_sr: u32,
    pub target_duration: f64,
    pub peak_dbfs: f64,
    /// Keyed by vowel name (`AH`, `EE`, `OO`).
    pub vowels: BTreeMap<String, VowelReport>,
}

impl CalibrationReport {
    pub fn new(voice: impl Into<String>, speed: f32, target: &TargetConfig) -> Self {
        Self {
            voice: voice.into(),
            speed,
            target_sr: target.sample_rate,
            target_duration: target.duration_secs,
            peak_dbfs: target.peak_dbfs,
            vowels: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, vowel: &str, entry: VowelReport) {
        self.vowels.insert(vowel.to_string(), entry);
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Write the pretty-printed report to `path`, replacing any existing
    /// file.
    pub fn write(&self, path: &Path) -> anyhow::Result<()> {
        let json = self.to_json()?;
        std::fs::write(path, json)?;
        log::debug!("report written to {}", path.display());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn stats() -> F0Stats {
        F0Stats {
            f0_mean: 151.24,
            f0_std: 2.5,
            f0_min: 146.0,
            f0_max: 155.5,
            voiced_ratio: 0.95,
            confidence_mean: 0.932,
        }
    }

    #[test]
    fn duration_is_rounded() {
        let entry = VowelReport::new(144_000, 48_000, -3.0, F0Stats::default());
        assert_eq!(entry.duration_sec, 3.0);
        let entry = VowelReport::new(1_000, 48_000, -3.0, F0Stats::default());
        assert_eq!(entry.duration_sec, 0.021);
    }

    #[test]
    fn json_shape() {
        let mut report = CalibrationReport::new("af_heart", 0.7, &TargetConfig::default());
        report.insert("AH", VowelReport::new(144_000, 48_000, -3.0, stats()));

        let value: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(value["voice"], "af_heart");
        assert_eq!(value["target_sr"], 48_000);
        assert_eq!(value["target_duration"], 3.0);
        assert_eq!(value["peak_dbfs"], -3.0);

        let ah = &value["vowels"]["AH"];
        assert_eq!(ah["samples"], 144_000);
        assert_eq!(ah["duration_sec"], 3.0);
        assert_eq!(ah["f0_mean"], 151.24);
        assert_eq!(ah["voiced_ratio"], 0.95);
        assert_eq!(ah["confidence_mean"], 0.932);
        assert!(ah.get("stats").is_none(), "statistics must be flattened");

        let keys: Vec<_> = ah.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys.len(), 9);
    }

    #[test]
    fn json_round_trip() {
        let mut report = CalibrationReport::new("am_fenrir", 0.6, &TargetConfig::default());
        report.insert("OO", VowelReport::new(144_000, 48_000, -3.0, stats()));
        let back: CalibrationReport = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(back, report);
    }

    #[test]
    fn write_creates_pretty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(REPORT_FILE);
        CalibrationReport::new("af_heart", 0.7, &TargetConfig::default())
            .write(&path)
            .unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\n  \"voice\": \"af_heart\""));
    }
}
