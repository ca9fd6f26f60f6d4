//! Zero-phase Butterworth low-pass filtering.
//!
//! The filter is designed as a cascade of second-order sections (plus one
//! first-order section for odd orders) obtained by the bilinear transform
//! with frequency pre-warping. [`ButterworthLowPass::filtfilt`] runs the
//! cascade forward and then backward over the signal, so the net response
//! has zero phase and squared magnitude: features are attenuated but never
//! shifted in time relative to the label axis.
//!
//! Edges are handled the way `filtfilt` usually does it: the signal is
//! extended by an odd reflection of `3 * (order + 1)` samples on each side
//! (fewer for very short signals) and each pass starts from the cascade's
//! step-response steady state scaled by the first sample it sees. The
//! output always has exactly the input length.

use ndarray::{Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::SignalError;

/// Highest supported filter order.
const MAX_ORDER: usize = 16;

/// Parameters of a Butterworth low-pass design.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LowPassConfig {
    /// -3 dB cutoff of the single-pass response, in Hz.
    pub cutoff_hz: f64,
    /// Sampling rate of the signal, in Hz.
    pub sample_rate_hz: f64,
    /// Filter order (number of poles).
    pub order: usize,
}

impl Default for LowPassConfig {
    fn default() -> Self {
        Self {
            cutoff_hz: 8.0,
            sample_rate_hz: 20.0,
            order: 4,
        }
    }
}

impl LowPassConfig {
    /// Nyquist frequency of the configured sampling rate.
    pub fn nyquist_hz(&self) -> f64 {
        0.5 * self.sample_rate_hz
    }

    /// Cutoff as a fraction of Nyquist, the convention of most filter
    /// design tools.
    pub fn normalized_cutoff(&self) -> f64 {
        self.cutoff_hz / self.nyquist_hz()
    }
}

/// One second-order section in transposed direct form II.
///
/// `a0` is normalised to 1; a first-order section has `b[2] == a[1] == 0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Biquad {
    /// Numerator `b0, b1, b2`.
    pub b: [f64; 3],
    /// Denominator `a1, a2`.
    pub a: [f64; 2],
}

impl Biquad {
    /// Section gain at DC.
    pub fn dc_gain(&self) -> f64 {
        (self.b[0] + self.b[1] + self.b[2]) / (1.0 + self.a[0] + self.a[1])
    }

    /// Internal state after an infinitely long unit-step input.
    fn step_state(&self) -> [f64; 2] {
        let g = self.dc_gain();
        let z2 = self.b[2] - self.a[1] * g;
        let z1 = self.b[1] - self.a[0] * g + z2;
        [z1, z2]
    }

    /// Filter `buf` in place starting from state `z`.
    fn run(&self, buf: &mut [f64], mut z: [f64; 2]) {
        let [b0, b1, b2] = self.b;
        let [a1, a2] = self.a;
        for x in buf.iter_mut() {
            let input = *x;
            let y = b0 * input + z[0];
            z[0] = b1 * input - a1 * y + z[1];
            z[1] = b2 * input - a2 * y;
            *x = y;
        }
    }
}

/// A designed Butterworth low-pass, ready to be applied with zero phase.
#[derive(Debug, Clone)]
pub struct ButterworthLowPass {
    config: LowPassConfig,
    sections: Vec<Biquad>,
    /// Per-section steady state for a unit step at the cascade input.
    step_states: Vec<[f64; 2]>,
    pad_len: usize,
}

impl ButterworthLowPass {
    /// Design the filter.
    ///
    /// # Errors
    ///
    /// Returns [`SignalError::InvalidFilter`] when the order is 0 or above
    /// 16, the sampling rate is not positive, or the cutoff is not strictly
    /// between 0 and Nyquist.
    pub fn design(config: LowPassConfig) -> Result<Self, SignalError> {
        if config.order == 0 || config.order > MAX_ORDER {
            return Err(SignalError::InvalidFilter(format!(
                "order must be in [1, {MAX_ORDER}], got {}",
                config.order
            )));
        }
        if !(config.sample_rate_hz.is_finite() && config.sample_rate_hz > 0.0) {
            return Err(SignalError::InvalidFilter(format!(
                "sample rate must be > 0 Hz, got {}",
                config.sample_rate_hz
            )));
        }
        let wn = config.normalized_cutoff();
        if !(wn > 0.0 && wn < 1.0) {
            return Err(SignalError::InvalidFilter(format!(
                "cutoff {} Hz must lie strictly between 0 and Nyquist ({} Hz)",
                config.cutoff_hz,
                config.nyquist_hz()
            )));
        }

        let n = config.order;
        let k = (PI * config.cutoff_hz / config.sample_rate_hz).tan();
        let k2 = k * k;
        let mut sections = Vec::with_capacity((n + 1) / 2);

        // Conjugate pole pairs; angle measured from the negative real axis.
        for i in 0..n / 2 {
            let psi = PI * (n - 1 - 2 * i) as f64 / (2 * n) as f64;
            let q = 1.0 / (2.0 * psi.cos());
            let norm = 1.0 / (1.0 + k / q + k2);
            let b0 = k2 * norm;
            sections.push(Biquad {
                b: [b0, 2.0 * b0, b0],
                a: [2.0 * (k2 - 1.0) * norm, (1.0 - k / q + k2) * norm],
            });
        }
        if n % 2 == 1 {
            let norm = 1.0 / (1.0 + k);
            sections.push(Biquad {
                b: [k * norm, k * norm, 0.0],
                a: [(k - 1.0) * norm, 0.0],
            });
        }

        let mut step_states = Vec::with_capacity(sections.len());
        let mut gain = 1.0;
        for s in &sections {
            let [z1, z2] = s.step_state();
            step_states.push([z1 * gain, z2 * gain]);
            gain *= s.dc_gain();
        }

        Ok(Self {
            config,
            sections,
            step_states,
            pad_len: 3 * (n + 1),
        })
    }

    /// The design parameters.
    pub fn config(&self) -> &LowPassConfig {
        &self.config
    }

    /// The cascaded sections, in application order.
    pub fn sections(&self) -> &[Biquad] {
        &self.sections
    }

    /// Default edge extension length on each side.
    pub fn pad_len(&self) -> usize {
        self.pad_len
    }

    /// Apply the filter forward and backward to a 1-D signal.
    pub fn filtfilt(&self, signal: &[f64]) -> Vec<f64> {
        let n = signal.len();
        if n == 0 {
            return Vec::new();
        }
        let pad = self.pad_len.min(n - 1);

        let first = signal[0];
        let last = signal[n - 1];
        let mut ext = Vec::with_capacity(n + 2 * pad);
        ext.extend((1..=pad).rev().map(|i| 2.0 * first - signal[i]));
        ext.extend_from_slice(signal);
        ext.extend((1..=pad).map(|i| 2.0 * last - signal[n - 1 - i]));

        self.run_cascade(&mut ext);
        ext.reverse();
        self.run_cascade(&mut ext);
        ext.reverse();

        ext.drain(..pad);
        ext.truncate(n);
        ext
    }

    /// Apply [`filtfilt`](Self::filtfilt) independently to every column of a
    /// `[samples, channels]` matrix.
    pub fn filtfilt_columns(&self, data: ArrayView2<'_, f64>) -> Array2<f64> {
        let mut out = Array2::<f64>::zeros(data.raw_dim());
        for (src, mut dst) in data.axis_iter(Axis(1)).zip(out.axis_iter_mut(Axis(1))) {
            let column: Vec<f64> = src.iter().copied().collect();
            for (d, v) in dst.iter_mut().zip(self.filtfilt(&column)) {
                *d = v;
            }
        }
        out
    }

    fn run_cascade(&self, buf: &mut [f64]) {
        let x0 = buf[0];
        for (section, state) in self.sections.iter().zip(&self.step_states) {
            section.run(buf, [state[0] * x0, state[1] * x0]);
        }
    }
}
