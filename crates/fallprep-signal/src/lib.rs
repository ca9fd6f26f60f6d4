//! # fallprep signal processing
//!
//! Low-level DSP for inertial-sensor recordings: conversion of an irregular
//! timestamp axis onto a fixed-rate grid, and zero-phase Butterworth
//! low-pass filtering of the resulting multichannel signal.
//!
//! Both stages operate on `ndarray` matrices laid out as
//! `[samples, channels]` and are deliberately free of any knowledge about
//! activity vocabularies or windowing; those live in `fallprep-dataset`.
//!
//! ```rust
//! use fallprep_signal::{resample, ButterworthLowPass, LowPassConfig};
//! use ndarray::Array2;
//!
//! let ts = [0.0, 0.04, 0.11, 0.15, 0.2];
//! let channels = Array2::from_shape_fn((5, 6), |(i, c)| (i + c) as f64);
//! let labels = ["WAL"; 5];
//!
//! let grid = resample(&ts, channels.view(), &labels, 20.0).unwrap();
//! assert_eq!(grid.len(), 5);
//!
//! let lp = ButterworthLowPass::design(LowPassConfig::default()).unwrap();
//! let filtered = lp.filtfilt_columns(grid.channels.view());
//! assert_eq!(filtered.dim(), grid.channels.dim());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod filter;
pub mod resample;

pub use filter::{Biquad, ButterworthLowPass, LowPassConfig};
pub use resample::{resample, Resampled, MILLIS_THRESHOLD};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Common result type for signal processing operations
pub type Result<T> = std::result::Result<T, SignalError>;

/// Unified error type for signal processing operations
#[derive(Debug, thiserror::Error)]
pub enum SignalError {
    /// Too few rows to define a time axis.
    #[error("Recording has {found} samples; at least {required} are required")]
    TooFewSamples {
        /// Rows present in the input.
        found: usize,
        /// Minimum rows required.
        required: usize,
    },

    /// Every timestamp collapsed onto fewer than two distinct instants.
    #[error("Recording has {found} distinct timestamps; at least 2 are required")]
    TooFewDistinctTimestamps {
        /// Distinct timestamps after de-duplication.
        found: usize,
    },

    /// A timestamp is NaN or infinite.
    #[error("Non-finite timestamp {value} at row {index}")]
    NonFiniteTimestamp {
        /// Row of the offending timestamp.
        index: usize,
        /// The offending value.
        value: f64,
    },

    /// Timestamps, channel rows and labels disagree in length.
    #[error(
        "Length mismatch: {timestamps} timestamps, {channel_rows} channel rows, {labels} labels"
    )]
    LengthMismatch {
        /// Number of timestamps.
        timestamps: usize,
        /// Number of channel rows.
        channel_rows: usize,
        /// Number of labels.
        labels: usize,
    },

    /// A filter cannot be designed from the given parameters.
    #[error("Invalid filter design: {0}")]
    InvalidFilter(String),

    /// A scalar parameter is out of range.
    #[error("Invalid parameter `{name}`: {reason}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Human-readable reason.
        reason: String,
    },
}

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::filter::{ButterworthLowPass, LowPassConfig};
    pub use crate::resample::{resample, Resampled};
    pub use crate::{Result, SignalError};
}
