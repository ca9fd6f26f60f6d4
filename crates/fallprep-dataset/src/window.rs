//! Fixed-size windowing and per-window label assignment.
//!
//! A [`Windower`] slices a `[samples, channels]` matrix into windows of
//! `window_size` rows starting every `stride` rows. Trailing samples that do
//! not fill a whole window are dropped. The label of each window is chosen
//! by a [`LabelStrategy`] from the window's collapsed label subsequence;
//! the strategy never changes which windows are produced.

use ndarray::{s, Array3, ArrayView2};
use serde::{Deserialize, Serialize};

use crate::error::PrepError;
use crate::labels::{ClassCounts, ClassLabel};

// ---------------------------------------------------------------------------
// Window starts
// ---------------------------------------------------------------------------

/// Start indices `0, stride, 2*stride, ...` of every window fully contained
/// in a sequence of `len` samples.
///
/// # Panics
///
/// Panics if `stride` is zero.
pub fn window_starts(len: usize, window_size: usize, stride: usize) -> std::iter::StepBy<std::ops::Range<usize>> {
    assert!(stride > 0, "stride must be > 0");
    let end = if window_size > 0 && len >= window_size { len - window_size + 1 } else { 0 };
    (0..end).step_by(stride)
}

/// Number of windows [`window_starts`] yields.
pub fn window_count(len: usize, window_size: usize, stride: usize) -> usize {
    if window_size == 0 || len < window_size {
        0
    } else {
        (len - window_size) / stride + 1
    }
}

// ---------------------------------------------------------------------------
// LabelStrategy
// ---------------------------------------------------------------------------

/// Decides one label for a window from its per-sample labels.
pub trait LabelStrategy: Send + Sync {
    /// Short identifier used in logs and metadata.
    fn name(&self) -> &'static str;

    /// Label of a window whose samples carry `labels` (never empty).
    fn assign(&self, labels: &[ClassLabel]) -> ClassLabel;
}

/// The label of the window's first sample.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstSample;

impl LabelStrategy for FirstSample {
    fn name(&self) -> &'static str {
        "first_sample"
    }

    fn assign(&self, labels: &[ClassLabel]) -> ClassLabel {
        labels.first().copied().unwrap_or(ClassLabel::Non)
    }
}

/// The most frequent class in the window; ties go to FALL, then PRE_FALL,
/// then NON.
#[derive(Debug, Clone, Copy, Default)]
pub struct MajorityVote;

impl LabelStrategy for MajorityVote {
    fn name(&self) -> &'static str {
        "majority_vote"
    }

    fn assign(&self, labels: &[ClassLabel]) -> ClassLabel {
        let counts = ClassCounts::tally(labels.iter().copied());
        ClassLabel::ALL
            .into_iter()
            .max_by_key(|&c| (counts.get(c), c.priority()))
            .unwrap_or(ClassLabel::Non)
    }
}

/// The most severe class present anywhere in the window: FALL, then
/// PRE_FALL, then NON.
#[derive(Debug, Clone, Copy, Default)]
pub struct MostSevere;

impl LabelStrategy for MostSevere {
    fn name(&self) -> &'static str {
        "most_severe"
    }

    fn assign(&self, labels: &[ClassLabel]) -> ClassLabel {
        labels.iter().copied().max_by_key(|c| c.priority()).unwrap_or(ClassLabel::Non)
    }
}

/// Serializable selector for the built-in strategies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelStrategyKind {
    /// [`FirstSample`].
    #[default]
    FirstSample,
    /// [`MajorityVote`].
    MajorityVote,
    /// [`MostSevere`].
    MostSevere,
}

impl LabelStrategyKind {
    /// Instantiate the strategy.
    pub fn build(self) -> Box<dyn LabelStrategy> {
        match self {
            LabelStrategyKind::FirstSample => Box::new(FirstSample),
            LabelStrategyKind::MajorityVote => Box::new(MajorityVote),
            LabelStrategyKind::MostSevere => Box::new(MostSevere),
        }
    }
}

// ---------------------------------------------------------------------------
// Windower
// ---------------------------------------------------------------------------

/// Windows cut from one recording.
#[derive(Debug, Clone)]
pub struct Windowed {
    /// `[n_windows, window_size, channels]`, `f32`.
    pub windows: Array3<f32>,
    /// One label per window.
    pub labels: Vec<ClassLabel>,
    /// Start sample of each window.
    pub starts: Vec<usize>,
}

impl Windowed {
    /// Number of windows.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// `true` when the recording was shorter than one window.
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Fixed-size, fixed-stride windowing with a pluggable label strategy.
pub struct Windower {
    window_size: usize,
    stride: usize,
    strategy: Box<dyn LabelStrategy>,
}

impl std::fmt::Debug for Windower {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Windower")
            .field("window_size", &self.window_size)
            .field("stride", &self.stride)
            .field("strategy", &self.strategy.name())
            .finish()
    }
}

impl Windower {
    /// Create a windower.
    ///
    /// # Panics
    ///
    /// Panics if `window_size` or `stride` is zero.
    pub fn new(window_size: usize, stride: usize, strategy: Box<dyn LabelStrategy>) -> Self {
        assert!(window_size > 0, "window_size must be > 0");
        assert!(stride > 0, "stride must be > 0");
        Windower { window_size, stride, strategy }
    }

    /// Window length in samples.
    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Distance between window starts.
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Active label strategy.
    pub fn strategy(&self) -> &dyn LabelStrategy {
        self.strategy.as_ref()
    }

    /// Windows a sequence of `len` samples yields.
    pub fn count(&self, len: usize) -> usize {
        window_count(len, self.window_size, self.stride)
    }

    /// Cut `data` into windows and label each one.
    ///
    /// # Errors
    ///
    /// [`PrepError::ShapeMismatch`] when `labels` and `data` rows differ.
    pub fn segment(&self, data: ArrayView2<'_, f64>, labels: &[ClassLabel]) -> Result<Windowed, PrepError> {
        let (n, channels) = data.dim();
        if labels.len() != n {
            return Err(PrepError::shape_mismatch(vec![n], vec![labels.len()]));
        }

        let starts: Vec<usize> = window_starts(n, self.window_size, self.stride).collect();
        let mut windows = Array3::<f32>::zeros((starts.len(), self.window_size, channels));
        let mut window_labels = Vec::with_capacity(starts.len());

        for (w, &start) in starts.iter().enumerate() {
            let end = start + self.window_size;
            windows
                .slice_mut(s![w, .., ..])
                .assign(&data.slice(s![start..end, ..]).mapv(|v| v as f32));
            window_labels.push(self.strategy.assign(&labels[start..end]));
        }

        Ok(Windowed { windows, labels: window_labels, starts })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
