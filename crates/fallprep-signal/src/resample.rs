//! Fixed-rate resampling of irregularly timestamped recordings.
//!
//! Phone and wearable IMU logs arrive with jittery, occasionally duplicated
//! timestamps, sometimes in milliseconds rather than seconds. [`resample`]
//! maps such a recording onto an evenly spaced grid:
//!
//! - the grid starts at the first timestamp and advances by exactly
//!   `1 / rate_hz` for `floor((t_last - t_first) * rate_hz) + 1` points,
//!   with every point clamped to `t_last`;
//! - every channel is linearly interpolated between its two bracketing
//!   source samples;
//! - labels are a step function: each grid point inherits the label of the
//!   most recent source timestamp at or before it (forward fill).
//!
//! Forward fill never looks ahead, so a label change at time `t` can only
//! affect grid points `>= t`.

use ndarray::{Array1, Array2, ArrayView2};
use tracing::debug;

use crate::SignalError;

/// Median timestamp magnitude above which the axis is treated as
/// milliseconds and divided by 1000.
pub const MILLIS_THRESHOLD: f64 = 1e5;

/// Slack added to `span * rate` before flooring, so a span that is an exact
/// multiple of the period up to rounding error still gets its final point.
const GRID_SLACK: f64 = 1e-9;

/// A recording mapped onto a fixed-rate grid.
#[derive(Debug, Clone)]
pub struct Resampled<L> {
    /// Grid timestamps in seconds, `t_first + k / rate_hz`.
    pub timestamps: Array1<f64>,

    /// Interpolated channels, shape `[grid_len, n_channels]`.
    pub channels: Array2<f64>,

    /// Forward-filled labels, one per grid point.
    pub labels: Vec<L>,

    /// Source timestamp each entry of `labels` was taken from.
    ///
    /// Always `<=` the corresponding grid timestamp.
    pub label_sources: Vec<f64>,

    /// Grid rate in Hz.
    pub rate_hz: f64,

    /// `true` when the raw axis was detected as milliseconds.
    pub millis_corrected: bool,
}

impl<L> Resampled<L> {
    /// Number of grid points.
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    /// Returns `true` when the grid is empty (never produced by [`resample`]).
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Grid spacing in seconds.
    pub fn period(&self) -> f64 {
        1.0 / self.rate_hz
    }
}

/// Resample one recording onto a `rate_hz` grid.
///
/// `channels` is `[n_samples, n_channels]` and row-aligned with
/// `timestamps` and `labels`. Rows need not be sorted; they are ordered by
/// timestamp with a stable sort and duplicate timestamps keep their first
/// occurrence.
///
/// # Errors
///
/// - [`SignalError::InvalidParameter`] if `rate_hz` is not a positive finite
///   number.
/// - [`SignalError::LengthMismatch`] if the three inputs disagree in length.
/// - [`SignalError::TooFewSamples`] for fewer than two rows.
/// - [`SignalError::NonFiniteTimestamp`] for NaN / infinite timestamps.
/// - [`SignalError::TooFewDistinctTimestamps`] if fewer than two distinct
///   instants remain after de-duplication.
pub fn resample<L: Clone>(
    timestamps: &[f64],
    channels: ArrayView2<'_, f64>,
    labels: &[L],
    rate_hz: f64,
) -> Result<Resampled<L>, SignalError> {
    if !(rate_hz.is_finite() && rate_hz > 0.0) {
        return Err(SignalError::InvalidParameter {
            name: "rate_hz",
            reason: format!("must be a positive finite number, got {rate_hz}"),
        });
    }

    let n = timestamps.len();
    if channels.nrows() != n || labels.len() != n {
        return Err(SignalError::LengthMismatch {
            timestamps: n,
            channel_rows: channels.nrows(),
            labels: labels.len(),
        });
    }
    if n < 2 {
        return Err(SignalError::TooFewSamples { found: n, required: 2 });
    }
    if let Some((index, &value)) = timestamps.iter().enumerate().find(|(_, t)| !t.is_finite()) {
        return Err(SignalError::NonFiniteTimestamp { index, value });
    }

    let millis_corrected = median(timestamps) > MILLIS_THRESHOLD;
    let divisor = if millis_corrected { 1000.0 } else { 1.0 };

    // (seconds, source row), sorted and de-duplicated.
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| timestamps[a].total_cmp(&timestamps[b]));
    let mut table: Vec<(f64, usize)> = Vec::with_capacity(n);
    for row in order {
        let t = timestamps[row] / divisor;
        match table.last() {
            Some(&(prev, _)) if prev == t => {}
            _ => table.push((t, row)),
        }
    }
    if table.len() < 2 {
        return Err(SignalError::TooFewDistinctTimestamps { found: table.len() });
    }

    let t_first = table[0].0;
    let t_last = table[table.len() - 1].0;
    let grid_len = ((t_last - t_first) * rate_hz + GRID_SLACK).floor() as usize + 1;
    let n_channels = channels.ncols();

    debug!(
        rows = n,
        distinct = table.len(),
        grid_len,
        millis_corrected,
        "resampling recording"
    );

    let timestamps_out =
        Array1::from_shape_fn(grid_len, |k| (t_first + k as f64 / rate_hz).min(t_last));
    let mut channels_out = Array2::<f64>::zeros((grid_len, n_channels));
    let mut labels_out = Vec::with_capacity(grid_len);
    let mut label_sources = Vec::with_capacity(grid_len);

    // `cursor` is the last table entry whose time is <= the grid point.
    let mut cursor = 0usize;
    for (k, &g) in timestamps_out.iter().enumerate() {
        while cursor + 1 < table.len() && table[cursor + 1].0 <= g {
            cursor += 1;
        }
        let (t0, row0) = table[cursor];

        if cursor + 1 < table.len() {
            let (t1, row1) = table[cursor + 1];
            let frac = ((g - t0) / (t1 - t0)).clamp(0.0, 1.0);
            for c in 0..n_channels {
                let v0 = channels[[row0, c]];
                let v1 = channels[[row1, c]];
                channels_out[[k, c]] = v0 + frac * (v1 - v0);
            }
        } else {
            for c in 0..n_channels {
                channels_out[[k, c]] = channels[[row0, c]];
            }
        }

        labels_out.push(labels[row0].clone());
        label_sources.push(t0);
    }

    Ok(Resampled {
        timestamps: timestamps_out,
        channels: channels_out,
        labels: labels_out,
        label_sources,
        rate_hz,
        millis_corrected,
    })
}

/// Median of a non-empty slice of finite values (sorts a copy).
fn median(data: &[f64]) -> f64 {
    let mut sorted = data.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}
