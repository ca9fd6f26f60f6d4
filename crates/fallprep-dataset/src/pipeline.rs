//! Two-pass corpus preparation.
//!
//! ```text
//! pass 1  load → resample → filter → accumulate moments        (per recording)
//!         freeze NormalizationStats
//! pass 2  load → resample → filter → PRE_FALL → check invariant
//!              → collapse → normalize → window → label          (per recording)
//!         concatenate, code labels
//! ```
//!
//! Both passes share [`Pipeline::condition`], so the statistics are computed
//! on exactly the signal they later normalize. Malformed recordings are
//! skipped in pass 1 and never revisited; any failure in pass 2 aborts the
//! run.

use ndarray::{s, Array1, Array2, Array3};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use fallprep_signal::{resample, ButterworthLowPass};

use crate::config::PrepConfig;
use crate::corpus::RecordingSource;
use crate::error::{PrepError, RecordingError};
use crate::export::DatasetMetadata;
use crate::labels::{collapse, insert_pre_fall, ClassCounts, ClassLabel, Label};
use crate::normalize::{CorpusAccumulator, NormalizationStats};
use crate::recording::{RawRecording, NUM_CHANNELS};
use crate::window::{Windowed, Windower};

// ---------------------------------------------------------------------------
// Intermediate products
// ---------------------------------------------------------------------------

/// A recording on the target grid, low-pass filtered, not yet normalized.
#[derive(Debug, Clone)]
pub struct Conditioned {
    /// Recording identifier.
    pub id: String,
    /// `[grid_len, NUM_CHANNELS]` filtered signal.
    pub signal: Array2<f64>,
    /// Forward-filled labels on the grid.
    pub labels: Vec<Label>,
    /// Whether the timestamp axis was converted from milliseconds.
    pub millis_corrected: bool,
}

/// A recording excluded in pass 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedRecording {
    /// Recording identifier.
    pub recording: String,
    /// Error that caused the skip.
    pub reason: String,
}

/// Outcome of pass 1.
#[derive(Debug, Clone)]
pub struct CorpusStatistics {
    /// Frozen normalization statistics.
    pub stats: NormalizationStats,
    /// Source indices that conditioned successfully, in source order.
    pub accepted: Vec<usize>,
    /// Recordings rejected as malformed.
    pub skipped: Vec<SkippedRecording>,
}

/// Per-recording line of the run report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordingSummary {
    /// Recording identifier.
    pub recording: String,
    /// Samples on the resampled grid.
    pub samples: usize,
    /// Fall onsets found.
    pub fall_onsets: usize,
    /// Windows contributed.
    pub windows: usize,
}

/// Summary of a corpus run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    /// Recordings offered by the source.
    pub recordings_discovered: usize,
    /// Per-recording results for every recording used in pass 2.
    pub recordings: Vec<RecordingSummary>,
    /// Recordings skipped in pass 1.
    pub skipped: Vec<SkippedRecording>,
    /// Recordings whose axis was converted from milliseconds.
    pub millis_corrected: usize,
    /// Per-class sample counts after PRE_FALL insertion.
    pub sample_counts: ClassCounts,
    /// Per-class window counts.
    pub window_counts: ClassCounts,
}

impl RunReport {
    /// Recordings that contributed to pass 2.
    pub fn recordings_used(&self) -> usize {
        self.recordings.len()
    }
}

/// The final dataset.
#[derive(Debug, Clone)]
pub struct PreparedDataset {
    /// `[num_windows, window_size, NUM_CHANNELS]` normalized windows.
    pub windows: Array3<f32>,
    /// `[num_windows]` label codes.
    pub labels: Array1<i64>,
    /// Statistics and parameters persisted as `norm_stats.json`.
    pub metadata: DatasetMetadata,
    /// Run summary.
    pub report: RunReport,
}

impl PreparedDataset {
    /// Number of windows.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// `true` when the dataset holds no windows.
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Window labels decoded through the metadata's label map.
    pub fn class_labels(&self) -> Vec<Option<ClassLabel>> {
        self.labels.iter().map(|&c| self.metadata.label_map.decode(c)).collect()
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Orchestrates the two passes over a [`RecordingSource`].
#[derive(Debug)]
pub struct Pipeline {
    config: PrepConfig,
    low_pass: ButterworthLowPass,
    windower: Windower,
}

impl Pipeline {
    /// Validate `config` and build the filter and windower it describes.
    pub fn new(config: PrepConfig) -> Result<Self, PrepError> {
        config.validate()?;
        let low_pass = ButterworthLowPass::design(config.low_pass())?;
        let windower = Windower::new(config.window_size, config.stride, config.label_strategy.build());
        Ok(Pipeline { config, low_pass, windower })
    }

    /// Active configuration.
    pub fn config(&self) -> &PrepConfig {
        &self.config
    }

    /// Active windower.
    pub fn windower(&self) -> &Windower {
        &self.windower
    }

    /// Resample onto the target grid and low-pass filter every channel.
    pub fn condition(&self, recording: RawRecording) -> Result<Conditioned, RecordingError> {
        let RawRecording { id, timestamps, channels, labels } = recording;
        let grid = resample(&timestamps, channels.view(), &labels, self.config.target_rate_hz)
            .map_err(|source| RecordingError::Signal { recording: id.clone(), source })?;
        if grid.millis_corrected {
            debug!("{id}: timestamps interpreted as milliseconds");
        }
        let signal = self.low_pass.filtfilt_columns(grid.channels.view());
        Ok(Conditioned {
            id,
            signal,
            labels: grid.labels,
            millis_corrected: grid.millis_corrected,
        })
    }

    /// Insert PRE_FALL, enforce the fall/pre-fall invariant and collapse to
    /// window classes.
    ///
    /// # Errors
    ///
    /// [`PrepError::LabelInvariant`] when the recording contains FALL
    /// samples but no PRE_FALL sample after insertion.
    pub fn label_samples(&self, id: &str, mut labels: Vec<Label>) -> Result<(Vec<ClassLabel>, usize), PrepError> {
        let insertion = insert_pre_fall(&mut labels, self.config.pre_fall_samples());
        let classes = collapse(&labels);
        let counts = ClassCounts::tally(classes.iter().copied());
        if counts.fall > 0 && counts.pre_fall == 0 {
            return Err(PrepError::LabelInvariant {
                recording: id.to_string(),
                fall_samples: counts.fall,
            });
        }
        if !insertion.onsets.is_empty() {
            debug!(
                "{id}: {} fall onsets, {} samples relabelled PRE_FALL",
                insertion.onsets.len(),
                insertion.relabelled
            );
        }
        Ok((classes, insertion.onsets.len()))
    }

    /// Pass 1: condition every recording and accumulate corpus moments.
    ///
    /// # Errors
    ///
    /// [`PrepError::EmptyCorpus`] when no recording survives.
    pub fn compute_statistics<S>(&self, source: &S) -> Result<CorpusStatistics, PrepError>
    where
        S: RecordingSource + ?Sized,
    {
        let mut acc = CorpusAccumulator::new(NUM_CHANNELS);
        let mut accepted = Vec::new();
        let mut skipped = Vec::new();

        for idx in 0..source.len() {
            let id = source.id(idx);
            let conditioned = match source.load(idx).and_then(|rec| self.condition(rec)) {
                Ok(c) => c,
                Err(e) => {
                    warn!("Skipping {id}: {e}");
                    skipped.push(SkippedRecording { recording: id, reason: e.to_string() });
                    continue;
                }
            };
            acc.observe(conditioned.signal.view())?;
            accepted.push(idx);
        }

        let stats = acc.finalize().ok_or(PrepError::EmptyCorpus {
            discovered: source.len(),
            skipped: skipped.len(),
        })?;
        info!(
            "Pass 1: {} recordings, {} samples, {} skipped",
            acc.recordings(),
            stats.count,
            skipped.len()
        );
        debug!("mean = {:?}, std = {:?}", stats.mean, stats.std);
        Ok(CorpusStatistics { stats, accepted, skipped })
    }

    /// Label, normalize and window one conditioned recording.
    pub fn windows_for(
        &self,
        conditioned: Conditioned,
        stats: &NormalizationStats,
    ) -> Result<(Windowed, RecordingSummary, ClassCounts), PrepError> {
        let samples = conditioned.labels.len();
        let (classes, fall_onsets) = self.label_samples(&conditioned.id, conditioned.labels)?;
        let normalized = stats.apply(conditioned.signal.view())?;
        let windowed = self.windower.segment(normalized.view(), &classes)?;
        let summary = RecordingSummary {
            recording: conditioned.id,
            samples,
            fall_onsets,
            windows: windowed.len(),
        };
        Ok((windowed, summary, ClassCounts::tally(classes)))
    }

    /// Run both passes over `source`.
    pub fn run<S>(&self, source: &S) -> Result<PreparedDataset, PrepError>
    where
        S: RecordingSource + ?Sized,
    {
        info!(
            "Preparing {} recordings from {} (rate {} Hz, window {}/{}, strategy {})",
            source.len(),
            source.name(),
            self.config.target_rate_hz,
            self.config.window_size,
            self.config.stride,
            self.windower.strategy().name()
        );

        let CorpusStatistics { stats, accepted, skipped } = self.compute_statistics(source)?;

        let mut report = RunReport {
            recordings_discovered: source.len(),
            skipped,
            ..RunReport::default()
        };
        let mut parts: Vec<Windowed> = Vec::with_capacity(accepted.len());

        for idx in accepted {
            let id = source.id(idx);
            let conditioned = source
                .load(idx)
                .and_then(|rec| self.condition(rec))
                .map_err(|e| PrepError::CorpusChanged { recording: id.clone(), source: e })?;
            if conditioned.millis_corrected {
                report.millis_corrected += 1;
            }

            let (windowed, summary, counts) = self.windows_for(conditioned, &stats)?;
            debug!("{id}: {} samples → {} windows", summary.samples, summary.windows);
            report.sample_counts.merge(&counts);
            report.window_counts.merge(&ClassCounts::tally(windowed.labels.iter().copied()));
            report.recordings.push(summary);
            parts.push(windowed);
        }

        let total: usize = parts.iter().map(Windowed::len).sum();
        if total == 0 {
            return Err(PrepError::NoWindows {
                recordings: report.recordings_used(),
                window_size: self.config.window_size,
            });
        }

        let mut windows = Array3::<f32>::zeros((total, self.config.window_size, NUM_CHANNELS));
        let mut codes = Vec::with_capacity(total);
        let mut offset = 0;
        for part in &parts {
            let n = part.len();
            windows.slice_mut(s![offset..offset + n, .., ..]).assign(&part.windows);
            codes.extend(part.labels.iter().map(|&c| self.config.label_map.code(c)));
            offset += n;
        }

        info!(
            "Produced {total} windows from {} recordings ({} skipped): {}",
            report.recordings_used(),
            report.skipped.len(),
            report.window_counts
        );

        let metadata = DatasetMetadata::new(&self.config, &stats, total);
        Ok(PreparedDataset { windows, labels: Array1::from(codes), metadata, report })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::InMemoryCorpus;

    fn recording(id: &str, n: usize, fall: std::ops::Range<usize>) -> RawRecording {
        let ts = (0..n).map(|i| i as f64 / 20.0).collect();
        let channels = Array2::from_shape_fn((n, NUM_CHANNELS), |(i, c)| ((i + c) % 7) as f64);
        let labels = (0..n)
            .map(|i| if fall.contains(&i) { Label::Fall } else { Label::Activity("WAL".into()) })
            .collect();
        RawRecording::new(id, ts, channels, labels).unwrap()
    }

    fn small_config() -> PrepConfig {
        PrepConfig { pre_fall_seconds: 3.0, window_size: 60, stride: 60, ..PrepConfig::default() }
    }

    #[test]
    fn condition_keeps_grid_length() {
        let pipeline = Pipeline::new(small_config()).unwrap();
        let c = pipeline.condition(recording("r", 200, 150..160)).unwrap();
        assert_eq!(c.signal.dim(), (200, NUM_CHANNELS));
        assert_eq!(c.labels.len(), 200);
        assert!(!c.millis_corrected);
    }

    #[test]
    fn label_samples_enforces_invariant() {
        let pipeline = Pipeline::new(small_config()).unwrap();
        let labels = vec![Label::Fall, Label::Fall, Label::Activity("WAL".into())];
        let err = pipeline.label_samples("edge.csv", labels).unwrap_err();
        assert!(matches!(err, PrepError::LabelInvariant { fall_samples: 2, .. }));
    }

    #[test]
    fn pass_one_skips_malformed() {
        let pipeline = Pipeline::new(small_config()).unwrap();
        let bad = RawRecording::new("one-row", vec![0.0], Array2::zeros((1, 6)), vec![Label::Fall]).unwrap();
        let corpus = InMemoryCorpus::new(vec![bad, recording("good", 200, 0..0)]);
        let out = pipeline.compute_statistics(&corpus).unwrap();
        assert_eq!(out.accepted, vec![1]);
        assert_eq!(out.skipped.len(), 1);
        assert_eq!(out.skipped[0].recording, "one-row");
        assert_eq!(out.stats.count, 200);
    }

    #[test]
    fn all_malformed_is_empty_corpus() {
        let pipeline = Pipeline::new(small_config()).unwrap();
        let bad = RawRecording::new("x", vec![1.0, 1.0], Array2::zeros((2, 6)), vec![Label::Fall, Label::Fall]).unwrap();
        let err = pipeline.run(&InMemoryCorpus::new(vec![bad])).unwrap_err();
        assert!(matches!(err, PrepError::EmptyCorpus { discovered: 1, skipped: 1 }));
    }

    #[test]
    fn short_corpus_is_no_windows() {
        let pipeline = Pipeline::new(small_config()).unwrap();
        let err = pipeline.run(&InMemoryCorpus::new(vec![recording("short", 40, 0..0)])).unwrap_err();
        assert!(matches!(err, PrepError::NoWindows { recordings: 1, window_size: 60 }));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let cfg = PrepConfig { window_size: 0, ..PrepConfig::default() };
        assert!(matches!(Pipeline::new(cfg), Err(PrepError::Config(_))));
    }
}
