//! Study configuration: directory layout, file naming and analysis parameters.

use std::fs;
use std::path::{Path, PathBuf};

use entrain_dtw::{FrameTiming, Metric};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::IoError;
use crate::atomic::write_text_atomic;

/// Local distance between feature frames, as named in the configuration file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricName {
    /// Euclidean (L2) distance. Default value.
    #[default]
    Euclidean,
    /// Manhattan (L1) distance.
    Manhattan,
}

impl From<MetricName> for Metric {
    fn from(name: MetricName) -> Self {
        match name {
            MetricName::Euclidean => Metric::Euclidean,
            MetricName::Manhattan => Metric::Manhattan,
        }
    }
}

/// File-name conventions inside a condition directory.
///
/// A session is identified by a stem such as `Px2_`; its files are the stem
/// followed by one of the suffixes below.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct FileNaming {
    /// Marker preceding the participant slot number in a stem.
    pub slot_marker: String,
    /// Participant feature file suffix.
    pub participant_suffix: String,
    /// Model feature file suffix.
    pub model_suffix: String,
    /// Per-session distance table suffix.
    pub distance_suffix: String,
    /// Per-session warping path table suffix.
    pub path_suffix: String,
    /// Per-session lag table suffix.
    pub lag_suffix: String,
    /// Per-condition distance summary file name.
    pub summary_file: String,
    /// Per-condition combined lag file name.
    pub condition_lag_file: String,
}

impl Default for FileNaming {
    fn default() -> Self {
        Self {
            slot_marker: "Px".to_string(),
            participant_suffix: "left.csv".to_string(),
            model_suffix: "right.csv".to_string(),
            distance_suffix: "distance.csv".to_string(),
            path_suffix: "path.csv".to_string(),
            lag_suffix: "lag.csv".to_string(),
            summary_file: "overallDistance.csv".to_string(),
            condition_lag_file: "combinedLag.csv".to_string(),
        }
    }
}

/// Directory layout of a study: `<base>/<cohort>/<day>/<script>/`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct StudyLayout {
    /// Root holding one directory per cohort. Relative paths are resolved
    /// against the configuration file's directory.
    pub base_directory: PathBuf,
    /// Day directory names, in order.
    pub day_labels: Vec<String>,
    /// Script directory names inside each day, in order.
    pub script_labels: Vec<String>,
    /// Number of participant slots per condition.
    pub participant_slot_count: usize,
    pub naming: FileNaming,
}

impl Default for StudyLayout {
    fn default() -> Self {
        Self {
            base_directory: PathBuf::from("participantDirectory"),
            day_labels: vec!["Day 1".into(), "Day 2".into(), "Day 3".into()],
            script_labels: vec!["SCRIPT 6 (STIM)".into(), "SCRIPT 10 (POST STIM)".into()],
            participant_slot_count: 3,
            naming: FileNaming::default(),
        }
    }
}

/// Parameters handed to the alignment core.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Samples between successive feature frames.
    pub hop_length: u32,
    /// Audio sample rate the features were extracted at, in Hz.
    pub sample_rate: u32,
    /// FastDTW search radius.
    pub radius: usize,
    pub metric: MetricName,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            hop_length: 110,
            sample_rate: 22050,
            radius: 1,
            metric: MetricName::default(),
        }
    }
}

impl AnalysisConfig {
    /// Frame timing described by `hop_length` and `sample_rate`.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::InvalidConfig`] if either value is zero.
    pub fn timing(&self) -> Result<FrameTiming, IoError> {
        FrameTiming::new(self.hop_length, self.sample_rate).map_err(|e| IoError::InvalidConfig {
            field: "analysis.hop_length/sample_rate",
            reason: e.to_string(),
        })
    }
}

/// Complete study configuration, stored as TOML.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct StudyConfig {
    pub layout: StudyLayout,
    pub analysis: AnalysisConfig,
}

impl StudyConfig {
    /// Load and validate a configuration file.
    ///
    /// Missing keys take their default values.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`IoError::FileNotFound`] | File doesn't exist or is unreadable |
    /// | [`IoError::ConfigParse`] | Not valid TOML, or a value has the wrong type |
    /// | [`IoError::InvalidConfig`] | A value is out of range |
    #[instrument(fields(path = %path.display()))]
    pub fn load(path: &Path) -> Result<Self, IoError> {
        let contents = fs::read_to_string(path).map_err(|e| IoError::FileNotFound {
            path: path.to_path_buf(),
            source: e,
        })?;
        let mut config: StudyConfig =
            toml::from_str(&contents).map_err(|e| IoError::ConfigParse {
                path: path.to_path_buf(),
                source: e,
            })?;

        if config.layout.base_directory.is_relative()
            && let Some(parent) = path.parent()
        {
            config.layout.base_directory = parent.join(&config.layout.base_directory);
        }
        config.validate()?;

        info!(
            base = %config.layout.base_directory.display(),
            radius = config.analysis.radius,
            "study configuration loaded"
        );
        Ok(config)
    }

    /// Write the configuration as pretty-printed TOML, replacing `path`.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`IoError::ConfigSerialize`] | The configuration cannot be rendered |
    /// | [`IoError::WriteFile`] | The file cannot be written |
    #[instrument(skip(self), fields(path = %path.display()))]
    pub fn save(&self, path: &Path) -> Result<(), IoError> {
        let contents =
            toml::to_string_pretty(self).map_err(|source| IoError::ConfigSerialize { source })?;
        write_text_atomic(path, &contents)
    }

    /// Check value ranges that serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::InvalidConfig`] naming the first offending field.
    pub fn validate(&self) -> Result<(), IoError> {
        let invalid = |field: &'static str, reason: &str| {
            Err(IoError::InvalidConfig {
                field,
                reason: reason.to_string(),
            })
        };

        let layout = &self.layout;
        if layout.participant_slot_count == 0 {
            return invalid("layout.participant_slot_count", "must be at least 1");
        }
        if layout.day_labels.is_empty() {
            return invalid("layout.day_labels", "must name at least one day");
        }
        if layout.script_labels.is_empty() {
            return invalid("layout.script_labels", "must name at least one script");
        }

        let naming = &layout.naming;
        for (field, value) in [
            ("layout.naming.slot_marker", &naming.slot_marker),
            ("layout.naming.participant_suffix", &naming.participant_suffix),
            ("layout.naming.model_suffix", &naming.model_suffix),
            ("layout.naming.distance_suffix", &naming.distance_suffix),
            ("layout.naming.path_suffix", &naming.path_suffix),
            ("layout.naming.lag_suffix", &naming.lag_suffix),
            ("layout.naming.summary_file", &naming.summary_file),
            ("layout.naming.condition_lag_file", &naming.condition_lag_file),
        ] {
            if value.is_empty() {
                return invalid(field, "must not be empty");
            }
        }
        if naming.participant_suffix == naming.model_suffix {
            return invalid(
                "layout.naming.model_suffix",
                "must differ from participant_suffix",
            );
        }

        if self.analysis.radius == 0 {
            return invalid("analysis.radius", "must be at least 1");
        }
        self.analysis.timing()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_reproduce_reference_layout() {
        let config = StudyConfig::default();
        assert_eq!(config.layout.participant_slot_count, 3);
        assert_eq!(config.layout.day_labels.len(), 3);
        assert_eq!(config.layout.naming.summary_file, "overallDistance.csv");
        assert_eq!(config.analysis.hop_length, 110);
        assert_eq!(config.analysis.sample_rate, 22050);
        assert_eq!(config.analysis.radius, 1);
        assert_eq!(Metric::from(config.analysis.metric), Metric::Euclidean);
        config.validate().unwrap();
    }

    #[test]
    fn save_then_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("study.toml");
        let mut config = StudyConfig::default();
        config.layout.base_directory = dir.path().join("data");
        config.analysis.metric = MetricName::Manhattan;
        config.save(&path).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("metric = \"manhattan\""));
        assert_eq!(StudyConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn partial_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("study.toml");
        fs::write(&path, "[analysis]\nradius = 5\n").unwrap();
        let config = StudyConfig::load(&path).unwrap();
        assert_eq!(config.analysis.radius, 5);
        assert_eq!(config.analysis.hop_length, 110);
        assert_eq!(
            config.layout.base_directory,
            dir.path().join("participantDirectory")
        );
    }

    #[test]
    fn invalid_values_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("study.toml");
        for (content, field) in [
            ("[analysis]\nradius = 0\n", "analysis.radius"),
            ("[layout]\nparticipant_slot_count = 0\n", "layout.participant_slot_count"),
            ("[layout.naming]\nslot_marker = \"\"\n", "layout.naming.slot_marker"),
        ] {
            fs::write(&path, content).unwrap();
            match StudyConfig::load(&path) {
                Err(IoError::InvalidConfig { field: f, .. }) => assert_eq!(f, field),
                other => panic!("expected InvalidConfig for {field}, got {other:?}"),
            }
        }
        fs::write(&path, "[analysis]\nsample_rate = 0\n").unwrap();
        assert!(matches!(
            StudyConfig::load(&path),
            Err(IoError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn malformed_toml_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("study.toml");
        fs::write(&path, "[analysis]\nmetric = \"cosine\"\n").unwrap();
        assert!(matches!(
            StudyConfig::load(&path),
            Err(IoError::ConfigParse { .. })
        ));
    }
}
