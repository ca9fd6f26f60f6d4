//! Preparation configuration.
//!
//! [`PrepConfig`] is the single source of truth for every parameter of a
//! corpus run: input layout, resampling rate, filter design, pre-fall span,
//! windowing and label coding. It is threaded explicitly through the
//! pipeline and serializable via [`serde`] so a run can be reproduced from
//! its JSON file.
//!
//! # Example
//!
//! ```rust
//! use fallprep_dataset::config::PrepConfig;
//!
//! let cfg = PrepConfig::default();
//! cfg.validate().expect("default config is valid");
//!
//! assert_eq!(cfg.window_size, 120);
//! assert_eq!(cfg.pre_fall_samples(), 120);
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use fallprep_signal::{ButterworthLowPass, LowPassConfig};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::labels::{self, LabelMap, LabelVocabulary, DEFAULT_FALL_LABELS};
use crate::recording::{CsvLayout, DEFAULT_CHANNELS, NUM_CHANNELS};
use crate::window::LabelStrategyKind;

// ---------------------------------------------------------------------------
// PrepConfig
// ---------------------------------------------------------------------------

/// Complete configuration for a dataset preparation run.
///
/// Missing fields in a JSON file take their default value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrepConfig {
    // -----------------------------------------------------------------------
    // Paths
    // -----------------------------------------------------------------------
    /// Root of the corpus: `base_dir/<activity>/*.csv`.
    /// Default: `data/Activities_Labelled`.
    pub base_dir: PathBuf,

    /// Directory receiving `windows.npy`, `labels.npy` and
    /// `norm_stats.json`. Default: `data/preprocessed`.
    pub out_dir: PathBuf,

    // -----------------------------------------------------------------------
    // Signal
    // -----------------------------------------------------------------------
    /// Target sampling rate of the resampled grid in Hz. Default: **20**.
    pub target_rate_hz: f64,

    /// Low-pass cutoff in Hz. Default: **8**.
    pub cutoff_hz: f64,

    /// Butterworth filter order. Default: **4**.
    pub filter_order: usize,

    // -----------------------------------------------------------------------
    // Labels
    // -----------------------------------------------------------------------
    /// Length of the PRE_FALL interval inserted before each fall onset, in
    /// seconds. Default: **6.0**.
    pub pre_fall_seconds: f64,

    /// Activity codes folded into FALL. Default: `FOL`, `FKL`, `BSC`, `SDL`.
    pub fall_labels: Vec<String>,

    /// Integer codes written to `labels.npy`.
    pub label_map: LabelMap,

    /// Rule assigning one label to each window. Default: first sample.
    pub label_strategy: LabelStrategyKind,

    // -----------------------------------------------------------------------
    // Windowing
    // -----------------------------------------------------------------------
    /// Window length in samples. Default: **120** (6 s at 20 Hz).
    pub window_size: usize,

    /// Distance between consecutive window starts. Default: **60**.
    pub stride: usize,

    // -----------------------------------------------------------------------
    // CSV layout
    // -----------------------------------------------------------------------
    /// Name of the timestamp column. Default: `rel_time`.
    pub time_column: String,

    /// Names of the six sensor columns, in channel order.
    pub channel_columns: Vec<String>,

    /// Name of the activity label column. Default: `label`.
    pub label_column: String,
}

impl Default for PrepConfig {
    fn default() -> Self {
        PrepConfig {
            base_dir: PathBuf::from("data/Activities_Labelled"),
            out_dir: PathBuf::from("data/preprocessed"),
            target_rate_hz: 20.0,
            cutoff_hz: 8.0,
            filter_order: 4,
            pre_fall_seconds: 6.0,
            fall_labels: DEFAULT_FALL_LABELS.iter().map(|s| s.to_string()).collect(),
            label_map: LabelMap::default(),
            label_strategy: LabelStrategyKind::default(),
            window_size: 120,
            stride: 60,
            time_column: "rel_time".to_string(),
            channel_columns: DEFAULT_CHANNELS.iter().map(|s| s.to_string()).collect(),
            label_column: "label".to_string(),
        }
    }
}

impl PrepConfig {
    /// Load a [`PrepConfig`] from a JSON file at `path` and validate it.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::FileRead`] if the file cannot be opened,
    /// [`ConfigError::ParseError`] if the JSON is malformed and
    /// [`ConfigError::InvalidValue`] if validation fails.
    pub fn from_json(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        let cfg: PrepConfig = serde_json::from_str(&contents).map_err(|source| {
            ConfigError::ParseError { path: path.to_path_buf(), source }
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Serialize this configuration to pretty-printed JSON and write it to
    /// `path`, creating parent directories if necessary.
    pub fn to_json(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::FileRead {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::invalid_value("(serialization)", e.to_string()))?;
        std::fs::write(path, json).map_err(|source| ConfigError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(())
    }

    /// PRE_FALL span in grid samples.
    pub fn pre_fall_samples(&self) -> usize {
        labels::pre_fall_samples(self.pre_fall_seconds, self.target_rate_hz)
    }

    /// Low-pass design parameters at the target rate.
    pub fn low_pass(&self) -> LowPassConfig {
        LowPassConfig {
            cutoff_hz: self.cutoff_hz,
            sample_rate_hz: self.target_rate_hz,
            order: self.filter_order,
        }
    }

    /// Label parser for the configured fall vocabulary.
    pub fn vocabulary(&self) -> LabelVocabulary {
        LabelVocabulary::new(&self.fall_labels)
    }

    /// Column names used when reading CSV recordings.
    pub fn csv_layout(&self) -> CsvLayout {
        CsvLayout {
            time_column: self.time_column.clone(),
            channel_columns: self.channel_columns.clone(),
            label_column: self.label_column.clone(),
        }
    }

    /// Validate all fields and return an error describing the first problem
    /// found.
    ///
    /// # Validated invariants
    ///
    /// - `target_rate_hz` is finite and strictly positive.
    /// - The low-pass design is realizable (`0 < cutoff < rate / 2`,
    ///   `1 <= order <= 16`).
    /// - `pre_fall_seconds` covers at least one grid sample.
    /// - `window_size` and `stride` are at least 1.
    /// - Exactly six distinct, non-empty channel columns; non-empty time and
    ///   label columns.
    /// - `label_map` codes are pairwise distinct.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.target_rate_hz.is_finite() || self.target_rate_hz <= 0.0 {
            return Err(ConfigError::invalid_value(
                "target_rate_hz",
                format!("must be finite and > 0, got {}", self.target_rate_hz),
            ));
        }

        if !self.cutoff_hz.is_finite() || self.cutoff_hz <= 0.0 {
            return Err(ConfigError::invalid_value(
                "cutoff_hz",
                format!("must be finite and > 0, got {}", self.cutoff_hz),
            ));
        }
        if self.cutoff_hz >= self.target_rate_hz / 2.0 {
            return Err(ConfigError::invalid_value(
                "cutoff_hz",
                format!(
                    "must be below the Nyquist frequency ({} Hz), got {}",
                    self.target_rate_hz / 2.0,
                    self.cutoff_hz
                ),
            ));
        }
        ButterworthLowPass::design(self.low_pass())
            .map_err(|e| ConfigError::invalid_value("filter_order", e.to_string()))?;

        if !self.pre_fall_seconds.is_finite() || self.pre_fall_seconds < 0.0 {
            return Err(ConfigError::invalid_value(
                "pre_fall_seconds",
                format!("must be finite and >= 0, got {}", self.pre_fall_seconds),
            ));
        }
        if self.pre_fall_samples() == 0 {
            return Err(ConfigError::invalid_value(
                "pre_fall_seconds",
                format!(
                    "{} s is shorter than one sample at {} Hz",
                    self.pre_fall_seconds, self.target_rate_hz
                ),
            ));
        }

        if self.window_size == 0 {
            return Err(ConfigError::invalid_value("window_size", "must be > 0"));
        }
        if self.stride == 0 {
            return Err(ConfigError::invalid_value("stride", "must be > 0"));
        }

        if self.channel_columns.len() != NUM_CHANNELS {
            return Err(ConfigError::invalid_value(
                "channel_columns",
                format!("expected {NUM_CHANNELS} columns, got {}", self.channel_columns.len()),
            ));
        }
        let mut seen = HashSet::new();
        for col in &self.channel_columns {
            if col.trim().is_empty() {
                return Err(ConfigError::invalid_value("channel_columns", "empty column name"));
            }
            if !seen.insert(col.as_str()) {
                return Err(ConfigError::invalid_value(
                    "channel_columns",
                    format!("duplicate column `{col}`"),
                ));
            }
        }
        if self.time_column.trim().is_empty() {
            return Err(ConfigError::invalid_value("time_column", "must not be empty"));
        }
        if self.label_column.trim().is_empty() {
            return Err(ConfigError::invalid_value("label_column", "must not be empty"));
        }

        if !self.label_map.is_injective() {
            return Err(ConfigError::invalid_value(
                "label_map",
                "NON, PRE_FALL and FALL must have distinct codes",
            ));
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn default_config_is_valid() {
        PrepConfig::default().validate().expect("default config should be valid");
    }

    #[test]
    fn json_round_trip() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("nested").join("prep.json");

        let mut original = PrepConfig::default();
        original.pre_fall_seconds = 3.0;
        original.label_strategy = LabelStrategyKind::MajorityVote;
        original.to_json(&path).expect("serialization should succeed");

        let loaded = PrepConfig::from_json(&path).expect("deserialization should succeed");
        assert_eq!(loaded, original);
    }

    #[test]
    fn partial_json_takes_defaults() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("prep.json");
        std::fs::write(&path, r#"{ "stride": 30, "base_dir": "/data/raw" }"#).unwrap();

        let cfg = PrepConfig::from_json(&path).unwrap();
        assert_eq!(cfg.stride, 30);
        assert_eq!(cfg.base_dir, PathBuf::from("/data/raw"));
        assert_eq!(cfg.window_size, 120);
        assert_eq!(cfg.label_column, "label");
    }

    #[test]
    fn malformed_json_is_parse_error() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("prep.json");
        std::fs::write(&path, "{ stride: ").unwrap();
        assert!(matches!(PrepConfig::from_json(&path), Err(ConfigError::ParseError { .. })));
    }

    #[test]
    fn missing_file_is_file_read_error() {
        let tmp = tempdir().unwrap();
        let err = PrepConfig::from_json(&tmp.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, ConfigError::FileRead { .. }));
    }

    #[test]
    fn cutoff_at_nyquist_is_invalid() {
        let cfg = PrepConfig { cutoff_hz: 10.0, ..PrepConfig::default() };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvalidValue { field: "cutoff_hz", .. })
        ));
    }

    #[test]
    fn zero_order_is_invalid() {
        let cfg = PrepConfig { filter_order: 0, ..PrepConfig::default() };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn zero_stride_is_invalid() {
        let cfg = PrepConfig { stride: 0, ..PrepConfig::default() };
        assert!(matches!(cfg.validate(), Err(ConfigError::InvalidValue { field: "stride", .. })));
    }

    #[test]
    fn sub_sample_pre_fall_is_invalid() {
        let cfg = PrepConfig { pre_fall_seconds: 0.01, ..PrepConfig::default() };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvalidValue { field: "pre_fall_seconds", .. })
        ));
    }

    #[test]
    fn duplicate_channels_are_invalid() {
        let mut cfg = PrepConfig::default();
        cfg.channel_columns[5] = "acc_x".into();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn colliding_label_codes_are_invalid() {
        let cfg = PrepConfig {
            label_map: LabelMap { non: 0, pre_fall: 2, fall: 2 },
            ..PrepConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(ConfigError::InvalidValue { field: "label_map", .. })));
    }

    #[test]
    fn derived_parameters() {
        let cfg = PrepConfig { pre_fall_seconds: 3.0, ..PrepConfig::default() };
        assert_eq!(cfg.pre_fall_samples(), 60);
        let lp = cfg.low_pass();
        assert_eq!(lp.order, 4);
        assert_eq!(lp.sample_rate_hz, 20.0);
        assert!(cfg.vocabulary().is_fall("bsc"));
        assert_eq!(cfg.csv_layout().channel_columns.len(), 6);
    }
}
