//! Corpus-wide per-channel z-score normalization.
//!
//! Statistics are gathered in pass 1 by a streaming [`CorpusAccumulator`]
//! (count, sum and sum of squares per channel, all `f64`) and frozen into
//! [`NormalizationStats`], which pass 2 applies to every recording.

use ndarray::{Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

use crate::error::PrepError;

/// Added to the standard deviation before dividing.
pub const NORM_EPSILON: f64 = 1e-8;

// ---------------------------------------------------------------------------
// CorpusAccumulator
// ---------------------------------------------------------------------------

/// Streaming per-channel moments over every observed sample.
#[derive(Debug, Clone)]
pub struct CorpusAccumulator {
    count: u64,
    recordings: usize,
    sum: Vec<f64>,
    sum_sq: Vec<f64>,
}

impl CorpusAccumulator {
    /// Empty accumulator for `channels` channels.
    pub fn new(channels: usize) -> Self {
        CorpusAccumulator {
            count: 0,
            recordings: 0,
            sum: vec![0.0; channels],
            sum_sq: vec![0.0; channels],
        }
    }

    /// Number of channels.
    pub fn channels(&self) -> usize {
        self.sum.len()
    }

    /// Samples observed so far.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Recordings observed so far.
    pub fn recordings(&self) -> usize {
        self.recordings
    }

    /// Fold every row of `data` into the running moments.
    pub fn observe(&mut self, data: ArrayView2<'_, f64>) -> Result<(), PrepError> {
        if data.ncols() != self.channels() {
            return Err(PrepError::shape_mismatch(
                vec![data.nrows(), self.channels()],
                data.shape().to_vec(),
            ));
        }
        for row in data.rows() {
            for ((s, sq), &v) in self.sum.iter_mut().zip(self.sum_sq.iter_mut()).zip(row) {
                *s += v;
                *sq += v * v;
            }
        }
        self.count += data.nrows() as u64;
        self.recordings += 1;
        Ok(())
    }

    /// Mean and population standard deviation, or `None` before any sample
    /// has been observed.
    pub fn finalize(&self) -> Option<NormalizationStats> {
        if self.count == 0 {
            return None;
        }
        let n = self.count as f64;
        let mean: Vec<f64> = self.sum.iter().map(|s| s / n).collect();
        let std = self
            .sum_sq
            .iter()
            .zip(&mean)
            .map(|(sq, m)| (sq / n - m * m).max(0.0).sqrt())
            .collect();
        Some(NormalizationStats { mean, std, count: self.count })
    }
}

// ---------------------------------------------------------------------------
// NormalizationStats
// ---------------------------------------------------------------------------

/// Frozen per-channel statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizationStats {
    /// Per-channel mean.
    pub mean: Vec<f64>,
    /// Per-channel population standard deviation.
    pub std: Vec<f64>,
    /// Samples the statistics were computed from.
    pub count: u64,
}

impl NormalizationStats {
    /// Number of channels.
    pub fn channels(&self) -> usize {
        self.mean.len()
    }

    /// `(x - mean) / (std + NORM_EPSILON)` per channel.
    pub fn apply(&self, data: ArrayView2<'_, f64>) -> Result<Array2<f64>, PrepError> {
        let mut out = data.to_owned();
        self.apply_in_place(&mut out)?;
        Ok(out)
    }

    /// In-place variant of [`NormalizationStats::apply`].
    pub fn apply_in_place(&self, data: &mut Array2<f64>) -> Result<(), PrepError> {
        if data.ncols() != self.channels() {
            return Err(PrepError::shape_mismatch(
                vec![data.nrows(), self.channels()],
                data.shape().to_vec(),
            ));
        }
        for (c, mut col) in data.axis_iter_mut(Axis(1)).enumerate() {
            let (m, s) = (self.mean[c], self.std[c] + NORM_EPSILON);
            col.mapv_inplace(|v| (v - m) / s);
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
    use approx::assert_abs_diff_eq;
    use ndarray::{array, concatenate};

    #[test]
    fn moments_match_direct_computation() {
        let a = array![[1.0, 10.0], [2.0, 20.0], [3.0, 30.0]];
        let b = array![[4.0, 40.0]];
        let mut acc = CorpusAccumulator::new(2);
        acc.observe(a.view()).unwrap();
        acc.observe(b.view()).unwrap();

        let stats = acc.finalize().unwrap();
        assert_eq!(stats.count, 4);
        assert_eq!(acc.recordings(), 2);
        assert_abs_diff_eq!(stats.mean[0], 2.5, epsilon = 1e-12);
        assert_abs_diff_eq!(stats.mean[1], 25.0, epsilon = 1e-12);
        // population std of 1..4
        assert_abs_diff_eq!(stats.std[0], 1.25f64.sqrt(), epsilon = 1e-12);
        assert_abs_diff_eq!(stats.std[1], 125.0f64.sqrt(), epsilon = 1e-9);
    }

    #[test]
    fn empty_accumulator_has_no_stats() {
        assert!(CorpusAccumulator::new(6).finalize().is_none());
    }

    #[test]
    fn normalized_corpus_is_standard() {
        let a = Array2::from_shape_fn((500, 3), |(i, c)| ((i * 7 + c * 13) % 17) as f64 * (c + 1) as f64 + c as f64);
        let b = Array2::from_shape_fn((300, 3), |(i, c)| (i as f64 * 0.1).sin() * 5.0 - c as f64);
        let mut acc = CorpusAccumulator::new(3);
        acc.observe(a.view()).unwrap();
        acc.observe(b.view()).unwrap();
        let stats = acc.finalize().unwrap();

        let all = concatenate(Axis(0), &[stats.apply(a.view()).unwrap().view(), stats.apply(b.view()).unwrap().view()]).unwrap();
        for col in all.axis_iter(Axis(1)) {
            let mean = col.mean().unwrap();
            let std = col.std(0.0);
            assert_abs_diff_eq!(mean, 0.0, epsilon = 1e-9);
            assert_abs_diff_eq!(std, 1.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn constant_channel_maps_to_zero() {
        let data = Array2::from_elem((10, 1), 4.2);
        let mut acc = CorpusAccumulator::new(1);
        acc.observe(data.view()).unwrap();
        let stats = acc.finalize().unwrap();
        assert_abs_diff_eq!(stats.std[0], 0.0, epsilon = 1e-6);
        let out = stats.apply(data.view()).unwrap();
        assert!(out.iter().all(|v| v.is_finite() && v.abs() < 1e-3));
    }

    #[test]
    fn channel_count_mismatch_is_error() {
        let mut acc = CorpusAccumulator::new(6);
        assert!(acc.observe(Array2::<f64>::zeros((4, 5)).view()).is_err());
        let stats = NormalizationStats { mean: vec![0.0; 6], std: vec![1.0; 6], count: 1 };
        assert!(stats.apply(Array2::<f64>::zeros((4, 3)).view()).is_err());
    }
}
