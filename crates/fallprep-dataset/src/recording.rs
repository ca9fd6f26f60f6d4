//! Raw recordings and the CSV reader that produces them.

use std::path::Path;

use ndarray::Array2;

use crate::error::RecordingError;
use crate::labels::{Label, LabelVocabulary};

/// Sensor channels per sample (3-axis accelerometer + 3-axis gyroscope).
pub const NUM_CHANNELS: usize = 6;

/// Default channel column names, in channel order.
pub const DEFAULT_CHANNELS: [&str; NUM_CHANNELS] =
    ["acc_x", "acc_y", "acc_z", "gyro_x", "gyro_y", "gyro_z"];

// ---------------------------------------------------------------------------
// RawRecording
// ---------------------------------------------------------------------------

/// One recording as read from disk, before resampling.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecording {
    /// Identifier used in logs and errors (path or synthetic name).
    pub id: String,
    /// Timestamps, seconds or milliseconds.
    pub timestamps: Vec<f64>,
    /// `[samples, NUM_CHANNELS]` sensor matrix.
    pub channels: Array2<f64>,
    /// One label per sample.
    pub labels: Vec<Label>,
}

impl RawRecording {
    /// Build a recording, checking that every per-sample array has the same
    /// length and that the matrix has [`NUM_CHANNELS`] columns.
    pub fn new(
        id: impl Into<String>,
        timestamps: Vec<f64>,
        channels: Array2<f64>,
        labels: Vec<Label>,
    ) -> Result<Self, RecordingError> {
        let id = id.into();
        let (rows, cols) = channels.dim();
        if cols != NUM_CHANNELS {
            return Err(RecordingError::invalid_format(
                id,
                format!("expected {NUM_CHANNELS} channels, got {cols}"),
            ));
        }
        if rows != timestamps.len() || labels.len() != timestamps.len() {
            return Err(RecordingError::invalid_format(
                id,
                format!(
                    "{} timestamps, {rows} channel rows, {} labels",
                    timestamps.len(),
                    labels.len()
                ),
            ));
        }
        Ok(RawRecording { id, timestamps, channels, labels })
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    /// `true` when the recording holds no samples.
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }
}

// ---------------------------------------------------------------------------
// CSV loading
// ---------------------------------------------------------------------------

/// Column names of a recording CSV.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvLayout {
    /// Timestamp column.
    pub time_column: String,
    /// Sensor columns in channel order.
    pub channel_columns: Vec<String>,
    /// Activity label column.
    pub label_column: String,
}

impl Default for CsvLayout {
    fn default() -> Self {
        CsvLayout {
            time_column: "rel_time".to_string(),
            channel_columns: DEFAULT_CHANNELS.iter().map(|s| s.to_string()).collect(),
            label_column: "label".to_string(),
        }
    }
}

/// Read one recording CSV.
///
/// Headers and cells are whitespace-trimmed. Every numeric cell must parse
/// to a finite `f64`; an empty label cell is kept as an empty activity.
/// Extra columns are ignored.
pub fn load_csv(
    path: &Path,
    layout: &CsvLayout,
    vocabulary: &LabelVocabulary,
) -> Result<RawRecording, RecordingError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| RecordingError::csv(path, e))?;

    let headers = reader.headers().map_err(|e| RecordingError::csv(path, e))?.clone();
    let column = |name: &str| {
        headers.iter().position(|h| h == name).ok_or_else(|| RecordingError::MissingColumn {
            path: path.to_path_buf(),
            column: name.to_string(),
        })
    };

    let time_idx = column(layout.time_column.as_str())?;
    let channel_idx = layout
        .channel_columns
        .iter()
        .map(|c| column(c.as_str()))
        .collect::<Result<Vec<_>, _>>()?;
    let label_idx = column(layout.label_column.as_str())?;

    let numeric = |record: &csv::StringRecord, idx: usize, row: usize, name: &str| {
        let cell = record.get(idx).unwrap_or("");
        match cell.parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(v),
            _ => Err(RecordingError::InvalidValue {
                path: path.to_path_buf(),
                row,
                column: name.to_string(),
                value: cell.to_string(),
            }),
        }
    };

    let mut timestamps = Vec::new();
    let mut flat = Vec::new();
    let mut labels = Vec::new();

    for (i, record) in reader.records().enumerate() {
        let record = record.map_err(|e| RecordingError::csv(path, e))?;
        let row = i + 1;
        timestamps.push(numeric(&record, time_idx, row, layout.time_column.as_str())?);
        for (&idx, name) in channel_idx.iter().zip(&layout.channel_columns) {
            flat.push(numeric(&record, idx, row, name.as_str())?);
        }
        labels.push(vocabulary.parse(record.get(label_idx).unwrap_or("")));
    }

    let id = path.display().to_string();
    let channels = Array2::from_shape_vec((timestamps.len(), channel_idx.len()), flat)
        .map_err(|e| RecordingError::invalid_format(id.clone(), e.to_string()))?;
    RawRecording::new(id, timestamps, channels, labels)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
