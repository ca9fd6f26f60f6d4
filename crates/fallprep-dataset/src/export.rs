//! Dataset artifacts on disk.
//!
//! | file              | contents                                        |
//! |-------------------|-------------------------------------------------|
//! | `windows.npy`     | `float32 [num_windows, window_size, 6]`         |
//! | `labels.npy`      | `int64 [num_windows]`                           |
//! | `norm_stats.json` | [`DatasetMetadata`] (statistics and parameters) |
//!
//! The metadata file is what inference-time preprocessing reads back to
//! reproduce the normalization.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use ndarray::{Array1, Array3};
use ndarray_npy::{ReadNpyExt, WriteNpyExt};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::PrepConfig;
use crate::error::PrepError;
use crate::labels::LabelMap;
use crate::normalize::NormalizationStats;
use crate::pipeline::PreparedDataset;
use crate::window::LabelStrategyKind;

/// Window tensor file name.
pub const WINDOWS_FILE: &str = "windows.npy";
/// Label array file name.
pub const LABELS_FILE: &str = "labels.npy";
/// Metadata file name.
pub const STATS_FILE: &str = "norm_stats.json";

// ---------------------------------------------------------------------------
// DatasetMetadata
// ---------------------------------------------------------------------------

/// Contents of `norm_stats.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetMetadata {
    /// Per-channel corpus mean.
    pub mean: Vec<f64>,
    /// Per-channel corpus population standard deviation.
    pub std: Vec<f64>,
    /// Window length in samples.
    pub window_size: usize,
    /// Window stride in samples.
    pub stride: usize,
    /// Sampling rate of the windows in Hz.
    pub fs: f64,
    /// Integer coding of `labels.npy`.
    pub label_map: LabelMap,
    /// Channel names in tensor order.
    pub channels: Vec<String>,
    /// PRE_FALL span in seconds.
    pub pre_fall_seconds: f64,
    /// Low-pass cutoff in Hz.
    pub cutoff_hz: f64,
    /// Butterworth order.
    pub filter_order: usize,
    /// Window labelling rule.
    pub label_strategy: LabelStrategyKind,
    /// Samples the statistics were computed from.
    pub num_samples: u64,
    /// Windows in the dataset.
    pub num_windows: usize,
    /// Creation time (UTC).
    pub created_at: DateTime<Utc>,
}

impl DatasetMetadata {
    /// Metadata for a run of `config` with frozen `stats`.
    pub fn new(config: &PrepConfig, stats: &NormalizationStats, num_windows: usize) -> Self {
        DatasetMetadata {
            mean: stats.mean.clone(),
            std: stats.std.clone(),
            window_size: config.window_size,
            stride: config.stride,
            fs: config.target_rate_hz,
            label_map: config.label_map,
            channels: config.channel_columns.clone(),
            pre_fall_seconds: config.pre_fall_seconds,
            cutoff_hz: config.cutoff_hz,
            filter_order: config.filter_order,
            label_strategy: config.label_strategy,
            num_samples: stats.count,
            num_windows,
            created_at: Utc::now(),
        }
    }

    /// The statistics, ready to normalize new data.
    pub fn stats(&self) -> NormalizationStats {
        NormalizationStats { mean: self.mean.clone(), std: self.std.clone(), count: self.num_samples }
    }

    /// Read metadata from a JSON file.
    pub fn load(path: &Path) -> Result<Self, PrepError> {
        let file = File::open(path).map_err(|e| PrepError::io(path, e))?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }

    /// Write metadata as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> Result<(), PrepError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).map_err(|e| PrepError::io(path, e))
    }
}

// ---------------------------------------------------------------------------
// Artifact I/O
// ---------------------------------------------------------------------------

/// Paths of the three artifacts in one output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    /// `windows.npy`.
    pub windows: PathBuf,
    /// `labels.npy`.
    pub labels: PathBuf,
    /// `norm_stats.json`.
    pub stats: PathBuf,
}

impl ArtifactPaths {
    /// Artifact paths inside `dir`.
    pub fn in_dir(dir: &Path) -> Self {
        ArtifactPaths {
            windows: dir.join(WINDOWS_FILE),
            labels: dir.join(LABELS_FILE),
            stats: dir.join(STATS_FILE),
        }
    }
}

/// Write `dataset` to `out_dir`, creating the directory if needed.
/// Existing artifacts are overwritten.
pub fn write_dataset(dataset: &PreparedDataset, out_dir: &Path) -> Result<ArtifactPaths, PrepError> {
    std::fs::create_dir_all(out_dir).map_err(|e| PrepError::io(out_dir, e))?;
    let paths = ArtifactPaths::in_dir(out_dir);

    let file = File::create(&paths.windows).map_err(|e| PrepError::io(&paths.windows, e))?;
    dataset
        .windows
        .write_npy(BufWriter::new(file))
        .map_err(|e| PrepError::npy(&paths.windows, e.to_string()))?;

    let file = File::create(&paths.labels).map_err(|e| PrepError::io(&paths.labels, e))?;
    dataset
        .labels
        .write_npy(BufWriter::new(file))
        .map_err(|e| PrepError::npy(&paths.labels, e.to_string()))?;

    dataset.metadata.save(&paths.stats)?;

    info!(
        "Saved {} windows of shape {:?} to {}",
        dataset.len(),
        &dataset.windows.shape()[1..],
        out_dir.display()
    );
    Ok(paths)
}

/// Read back the window tensor and label codes from `dir`.
pub fn read_arrays(dir: &Path) -> Result<(Array3<f32>, Array1<i64>), PrepError> {
    let paths = ArtifactPaths::in_dir(dir);

    let file = File::open(&paths.windows).map_err(|e| PrepError::io(&paths.windows, e))?;
    let windows = Array3::<f32>::read_npy(BufReader::new(file))
        .map_err(|e| PrepError::npy(&paths.windows, e.to_string()))?;

    let file = File::open(&paths.labels).map_err(|e| PrepError::io(&paths.labels, e))?;
    let labels = Array1::<i64>::read_npy(BufReader::new(file))
        .map_err(|e| PrepError::npy(&paths.labels, e.to_string()))?;

    if windows.shape()[0] != labels.len() {
        return Err(PrepError::shape_mismatch(vec![windows.shape()[0]], vec![labels.len()]));
    }
    Ok((windows, labels))
}

impl PreparedDataset {
    /// Write the three artifacts to `out_dir`.
    pub fn write(&self, out_dir: &Path) -> Result<ArtifactPaths, PrepError> {
        write_dataset(self, out_dir)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
