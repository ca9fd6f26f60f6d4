//! Fall / pre-fall windowed dataset preparation for IMU recordings.
//!
//! This crate turns a corpus of irregularly sampled, annotated inertial
//! recordings into fixed-length normalized windows with a three-class
//! target (`NON`, `PRE_FALL`, `FALL`).
//!
//! # Crate layout
//!
//! - [`config`]    – [`PrepConfig`], the explicit run configuration
//! - [`error`]     – error hierarchy ([`PrepError`], [`ConfigError`], [`RecordingError`])
//! - [`recording`] – [`RawRecording`] and the CSV reader
//! - [`corpus`]    – [`RecordingSource`] with CSV and in-memory sources
//! - [`labels`]    – label vocabulary, PRE_FALL insertion, class collapse
//! - [`normalize`] – streaming corpus statistics and z-scoring
//! - [`window`]    – windowing and per-window label strategies
//! - [`pipeline`]  – the two-pass orchestrator
//! - [`export`]    – `windows.npy` / `labels.npy` / `norm_stats.json`
//! - [`unify`]     – CSV tree label unification
//! - [`scan`]      – missing-value diagnostic
//! - [`synthetic`] – deterministic synthetic corpora
//!
//! # Quick start
//!
//! ```rust,no_run
//! use fallprep_dataset::{CsvCorpus, Pipeline, PrepConfig};
//!
//! let config = PrepConfig::default();
//! let corpus = CsvCorpus::from_config(&config).unwrap();
//! let dataset = Pipeline::new(config.clone()).unwrap().run(&corpus).unwrap();
//! dataset.write(&config.out_dir).unwrap();
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod corpus;
pub mod error;
pub mod export;
pub mod labels;
pub mod normalize;
pub mod pipeline;
pub mod recording;
pub mod scan;
pub mod synthetic;
pub mod unify;
pub mod window;

pub use config::PrepConfig;
pub use corpus::{CsvCorpus, InMemoryCorpus, RecordingSource};
pub use error::{ConfigError, PrepError, PrepResult, RecordingError};
pub use export::{read_arrays, write_dataset, ArtifactPaths, DatasetMetadata};
pub use labels::{ClassCounts, ClassLabel, Label, LabelMap, LabelVocabulary};
pub use normalize::{CorpusAccumulator, NormalizationStats, NORM_EPSILON};
pub use pipeline::{Pipeline, PreparedDataset, RunReport, SkippedRecording};
pub use recording::{RawRecording, NUM_CHANNELS};
pub use window::{FirstSample, LabelStrategy, LabelStrategyKind, MajorityVote, MostSevere, Windower};

/// Crate version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
