//! Error types for the dataset preparation pipeline.
//!
//! ## Hierarchy
//!
//! ```text
//! PrepError (top-level, fatal for the corpus run)
//! ├── ConfigError     (config validation / file loading)
//! ├── RecordingError  (one file: I/O, CSV, columns, resampling)
//! └── SignalError     (filter design)
//! ```
//!
//! A [`RecordingError`] raised during pass 1 is recovered locally: the
//! pipeline logs it and skips the recording. Everything that reaches the
//! caller as a [`PrepError`] aborts the run.

use std::path::PathBuf;

use fallprep_signal::SignalError;
use thiserror::Error;

// ---------------------------------------------------------------------------
// PrepResult
// ---------------------------------------------------------------------------

/// Convenient `Result` alias used by orchestration-level functions.
pub type PrepResult<T> = Result<T, PrepError>;

// ---------------------------------------------------------------------------
// PrepError: top-level aggregator
// ---------------------------------------------------------------------------

/// Top-level error type for a corpus run.
#[derive(Debug, Error)]
pub enum PrepError {
    /// A configuration validation or loading error.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A filter could not be designed.
    #[error("Signal error: {0}")]
    Signal(#[from] SignalError),

    /// A recording-level error that cannot be recovered by skipping.
    #[error("Recording error: {0}")]
    Recording(#[from] RecordingError),

    /// A recording has FALL samples but no PRE_FALL samples after pre-fall
    /// insertion.
    #[error(
        "Recording `{recording}` contains {fall_samples} FALL samples but no PRE_FALL \
         samples after pre-fall insertion; PRE_FALL insertion failed for this file"
    )]
    LabelInvariant {
        /// Identifier (usually the CSV path) of the offending recording.
        recording: String,
        /// Number of FALL samples in the resampled recording.
        fall_samples: usize,
    },

    /// Pass 1 found no usable recording.
    #[error("Corpus is empty: {discovered} recordings discovered, {skipped} skipped")]
    EmptyCorpus {
        /// Recordings offered by the source.
        discovered: usize,
        /// Recordings rejected as malformed.
        skipped: usize,
    },

    /// Every usable recording was shorter than one window.
    #[error("No windows produced from {recordings} recordings (window_size = {window_size})")]
    NoWindows {
        /// Recordings that reached the windowing stage.
        recordings: usize,
        /// Configured window length in samples.
        window_size: usize,
    },

    /// A recording that loaded in pass 1 failed in pass 2.
    #[error("Recording `{recording}` changed between passes: {source}")]
    CorpusChanged {
        /// Identifier of the recording.
        recording: String,
        /// Error raised in pass 2.
        #[source]
        source: RecordingError,
    },

    /// A shape mismatch was detected between two arrays.
    #[error("Shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        /// Expected shape.
        expected: Vec<usize>,
        /// Actual shape.
        actual: Vec<usize>,
    },

    /// The data directory does not exist.
    #[error("Directory not found: {path}")]
    DirectoryNotFound {
        /// The path that was not found.
        path: PathBuf,
    },

    /// File-system error while reading the corpus or writing artifacts.
    #[error("I/O error at `{path}`: {source}")]
    Io {
        /// Path being accessed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A `.npy` artifact could not be written or read.
    #[error("NumPy error at `{path}`: {message}")]
    Npy {
        /// Path of the `.npy` file.
        path: PathBuf,
        /// Error description.
        message: String,
    },

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PrepError {
    /// Construct a [`PrepError::Io`].
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PrepError::Io { path: path.into(), source }
    }

    /// Construct a [`PrepError::Npy`].
    pub fn npy<S: Into<String>>(path: impl Into<PathBuf>, msg: S) -> Self {
        PrepError::Npy { path: path.into(), message: msg.into() }
    }

    /// Construct a [`PrepError::ShapeMismatch`].
    pub fn shape_mismatch(expected: Vec<usize>, actual: Vec<usize>) -> Self {
        PrepError::ShapeMismatch { expected, actual }
    }
}

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Errors produced when loading or validating a [`PrepConfig`].
///
/// [`PrepConfig`]: crate::config::PrepConfig
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A field has an invalid value.
    #[error("Invalid value for `{field}`: {reason}")]
    InvalidValue {
        /// Name of the field.
        field: &'static str,
        /// Human-readable reason.
        reason: String,
    },

    /// A configuration file could not be read or written.
    #[error("Cannot access config file `{path}`: {source}")]
    FileRead {
        /// Path that was being accessed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A configuration file contains malformed JSON.
    #[error("Cannot parse config file `{path}`: {source}")]
    ParseError {
        /// Path that was being parsed.
        path: PathBuf,
        /// Underlying JSON parse error.
        #[source]
        source: serde_json::Error,
    },
}

impl ConfigError {
    /// Construct a [`ConfigError::InvalidValue`].
    pub fn invalid_value<S: Into<String>>(field: &'static str, reason: S) -> Self {
        ConfigError::InvalidValue { field, reason: reason.into() }
    }
}

// ---------------------------------------------------------------------------
// RecordingError
// ---------------------------------------------------------------------------

/// Errors confined to a single recording.
///
/// These are the "malformed recording" class: the pipeline skips the file
/// with a warning during pass 1 and keeps going.
#[derive(Debug, Error)]
pub enum RecordingError {
    /// The file could not be opened or read.
    #[error("I/O error reading `{path}`: {source}")]
    Io {
        /// Path being read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The CSV reader rejected the file.
    #[error("CSV error in `{path}`: {source}")]
    Csv {
        /// Path being parsed.
        path: PathBuf,
        /// Underlying CSV error.
        #[source]
        source: csv::Error,
    },

    /// A required column is absent from the header row.
    #[error("Missing required column `{column}` in `{path}`")]
    MissingColumn {
        /// Path of the file.
        path: PathBuf,
        /// Name of the missing column.
        column: String,
    },

    /// A numeric cell is empty, unparsable or non-finite.
    #[error("Invalid value {value:?} in column `{column}` at data row {row} of `{path}`")]
    InvalidValue {
        /// Path of the file.
        path: PathBuf,
        /// 1-based data row (header excluded).
        row: usize,
        /// Column name.
        column: String,
        /// Raw cell text.
        value: String,
    },

    /// The recording's arrays disagree in shape.
    #[error("Invalid recording `{recording}`: {message}")]
    InvalidFormat {
        /// Identifier of the recording.
        recording: String,
        /// Description of the problem.
        message: String,
    },

    /// Resampling rejected the recording.
    #[error("Cannot resample `{recording}`: {source}")]
    Signal {
        /// Identifier of the recording.
        recording: String,
        /// Underlying signal error.
        #[source]
        source: SignalError,
    },

    /// A source index is out of range.
    #[error("Index {idx} out of bounds (corpus has {len} recordings)")]
    IndexOutOfBounds {
        /// The requested index.
        idx: usize,
        /// Number of recordings in the source.
        len: usize,
    },
}

impl RecordingError {
    /// Construct a [`RecordingError::Io`].
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        RecordingError::Io { path: path.into(), source }
    }

    /// Construct a [`RecordingError::Csv`].
    pub fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        RecordingError::Csv { path: path.into(), source }
    }

    /// Construct a [`RecordingError::InvalidFormat`].
    pub fn invalid_format<S: Into<String>>(recording: impl Into<String>, msg: S) -> Self {
        RecordingError::InvalidFormat { recording: recording.into(), message: msg.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_invariant_names_the_file() {
        let e = PrepError::LabelInvariant {
            recording: "FOL/FOL_1_1_annotated.csv".into(),
            fall_samples: 12,
        };
        let msg = e.to_string();
        assert!(msg.contains("FOL/FOL_1_1_annotated.csv"));
        assert!(msg.contains("12 FALL samples"));
    }

    #[test]
    fn config_error_converts_into_prep_error() {
        let e: PrepError = ConfigError::invalid_value("stride", "must be > 0").into();
        assert!(matches!(e, PrepError::Config(ConfigError::InvalidValue { field: "stride", .. })));
    }

    #[test]
    fn corpus_changed_keeps_source() {
        use std::error::Error as _;
        let e = PrepError::CorpusChanged {
            recording: "a.csv".into(),
            source: RecordingError::IndexOutOfBounds { idx: 3, len: 2 },
        };
        assert!(e.source().is_some());
    }
}
