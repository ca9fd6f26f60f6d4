//! Integration tests for [`fallprep_dataset::pipeline`].
//!
//! Recordings are built in memory or written to a [`tempfile::TempDir`];
//! everything is deterministic.

use std::cell::Cell;
use std::fs;
use std::path::Path;

use approx::assert_abs_diff_eq;
use ndarray::{concatenate, Array2, Axis};

use fallprep_dataset::error::{PrepError, RecordingError};
use fallprep_dataset::labels::{fall_onsets, ClassLabel, Label};
use fallprep_dataset::synthetic::{synthetic_corpus, SyntheticConfig};
use fallprep_dataset::window::LabelStrategyKind;
use fallprep_dataset::{
    read_arrays, CsvCorpus, DatasetMetadata, InMemoryCorpus, Pipeline, PrepConfig, RawRecording,
    RecordingSource, NUM_CHANNELS,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// `n` samples on an exact 20 Hz axis, `WAL` everywhere except `fall`.
fn walk_recording(id: &str, n: usize, fall: std::ops::Range<usize>) -> RawRecording {
    let timestamps = (0..n).map(|i| i as f64 / 20.0).collect();
    let channels = Array2::from_shape_fn((n, NUM_CHANNELS), |(i, c)| {
        (i as f64 * 0.3 + c as f64).sin() + c as f64
    });
    let labels = (0..n)
        .map(|i| if fall.contains(&i) { Label::Fall } else { Label::Activity("WAL".into()) })
        .collect();
    RawRecording::new(id, timestamps, channels, labels).unwrap()
}

fn scenario_config(strategy: LabelStrategyKind) -> PrepConfig {
    PrepConfig {
        pre_fall_seconds: 3.0,
        window_size: 60,
        stride: 60,
        label_strategy: strategy,
        ..PrepConfig::default()
    }
}

fn write_csv(path: &Path, rows: impl Iterator<Item = (f64, &'static str)>) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let mut text = String::from("rel_time,acc_x,acc_y,acc_z,gyro_x,gyro_y,gyro_z,label\n");
    for (i, (t, label)) in rows.enumerate() {
        let x = i as f64 * 0.1;
        text.push_str(&format!(
            "{t},{:.4},{:.4},{:.4},{:.4},{:.4},{:.4},{label}\n",
            x.sin(),
            x.cos(),
            9.81 + 0.2 * x.sin(),
            0.1 * x.cos(),
            0.05,
            -0.05 * x.sin()
        ));
    }
    fs::write(path, text).unwrap();
}

// ---------------------------------------------------------------------------
// End-to-end scenario: 200 samples, fall at 150..160, 3 s pre-fall
// ---------------------------------------------------------------------------

#[test]
fn scenario_sample_labels() {
    let pipeline = Pipeline::new(scenario_config(LabelStrategyKind::FirstSample)).unwrap();
    let conditioned = pipeline.condition(walk_recording("scenario", 200, 150..160)).unwrap();
    assert_eq!(conditioned.labels.len(), 200);

    let (classes, onsets) = pipeline.label_samples(&conditioned.id, conditioned.labels).unwrap();
    assert_eq!(onsets, 1);
    for (i, c) in classes.iter().enumerate() {
        let expected = match i {
            0..=89 => ClassLabel::Non,
            90..=149 => ClassLabel::PreFall,
            150..=159 => ClassLabel::Fall,
            _ => ClassLabel::Non,
        };
        assert_eq!(*c, expected, "sample {i}");
    }
}

#[test]
fn scenario_first_sample_windows() {
    let pipeline = Pipeline::new(scenario_config(LabelStrategyKind::FirstSample)).unwrap();
    let corpus = InMemoryCorpus::new(vec![walk_recording("scenario", 200, 150..160)]);
    let ds = pipeline.run(&corpus).unwrap();

    assert_eq!(ds.windows.dim(), (3, 60, NUM_CHANNELS));
    // Windows start on samples 0, 60 and 120: NON, NON, PRE_FALL.
    assert_eq!(ds.labels.to_vec(), vec![0, 0, 1]);
}

#[test]
fn scenario_most_severe_windows() {
    let pipeline = Pipeline::new(scenario_config(LabelStrategyKind::MostSevere)).unwrap();
    let corpus = InMemoryCorpus::new(vec![walk_recording("scenario", 200, 150..160)]);
    let ds = pipeline.run(&corpus).unwrap();

    assert_eq!(ds.labels.to_vec(), vec![0, 1, 2]);
    assert_eq!(
        ds.class_labels(),
        vec![Some(ClassLabel::Non), Some(ClassLabel::PreFall), Some(ClassLabel::Fall)]
    );
    assert_eq!(ds.report.window_counts.total(), 3);
    assert_eq!(ds.report.sample_counts.pre_fall, 60);
    assert_eq!(ds.report.sample_counts.fall, 10);
}

#[test]
fn custom_label_map_is_applied() {
    let mut cfg = scenario_config(LabelStrategyKind::MostSevere);
    cfg.label_map.non = 10;
    cfg.label_map.pre_fall = 20;
    cfg.label_map.fall = 30;
    let ds = Pipeline::new(cfg)
        .unwrap()
        .run(&InMemoryCorpus::new(vec![walk_recording("scenario", 200, 150..160)]))
        .unwrap();
    assert_eq!(ds.labels.to_vec(), vec![10, 20, 30]);
}

// ---------------------------------------------------------------------------
// Invariant and fatal errors
// ---------------------------------------------------------------------------

#[test]
fn fall_only_at_index_zero_aborts_run() {
    let pipeline = Pipeline::new(scenario_config(LabelStrategyKind::FirstSample)).unwrap();
    let corpus = InMemoryCorpus::new(vec![
        walk_recording("ok", 200, 150..160),
        walk_recording("starts-falling", 200, 0..10),
    ]);
    match pipeline.run(&corpus) {
        Err(PrepError::LabelInvariant { recording, fall_samples }) => {
            assert_eq!(recording, "starts-falling");
            assert_eq!(fall_samples, 10);
        }
        other => panic!("expected LabelInvariant, got {other:?}"),
    }
}

#[test]
fn pre_fall_precedes_every_onset_in_synthetic_corpus() {
    let cfg = PrepConfig::default();
    let pipeline = Pipeline::new(cfg).unwrap();
    let corpus = synthetic_corpus(&SyntheticConfig::default());

    for idx in 0..corpus.len() {
        let conditioned = pipeline.condition(corpus.load(idx).unwrap()).unwrap();
        let onsets = fall_onsets(&conditioned.labels);
        let (classes, _) = pipeline.label_samples(&conditioned.id, conditioned.labels).unwrap();

        let has_fall = classes.contains(&ClassLabel::Fall);
        let pre_fall: Vec<usize> = classes
            .iter()
            .enumerate()
            .filter(|(_, c)| **c == ClassLabel::PreFall)
            .map(|(i, _)| i)
            .collect();
        assert_eq!(has_fall, !pre_fall.is_empty(), "recording {idx}");
        if let Some(&last_onset) = onsets.last() {
            assert!(pre_fall.iter().all(|&i| i < last_onset));
        }
    }
}

/// A source whose recordings fail after their first load.
struct FlakySource {
    inner: InMemoryCorpus,
    loads: Cell<usize>,
}

impl RecordingSource for FlakySource {
    fn len(&self) -> usize {
        self.inner.len()
    }

    fn id(&self, idx: usize) -> String {
        self.inner.id(idx)
    }

    fn load(&self, idx: usize) -> Result<RawRecording, RecordingError> {
        let n = self.loads.get();
        self.loads.set(n + 1);
        if n >= self.inner.len() {
            return Err(RecordingError::invalid_format(self.inner.id(idx), "file vanished"));
        }
        self.inner.load(idx)
    }

    fn name(&self) -> &str {
        "FlakySource"
    }
}

#[test]
fn pass_two_failure_is_corpus_changed() {
    let source = FlakySource {
        inner: InMemoryCorpus::new(vec![walk_recording("a", 200, 0..0)]),
        loads: Cell::new(0),
    };
    let pipeline = Pipeline::new(scenario_config(LabelStrategyKind::FirstSample)).unwrap();
    let err = pipeline.run(&source).unwrap_err();
    assert!(matches!(err, PrepError::CorpusChanged { ref recording, .. } if recording == "a"));
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

#[test]
fn pass_one_statistics_standardize_pass_one_data() {
    let pipeline = Pipeline::new(PrepConfig::default()).unwrap();
    let corpus = synthetic_corpus(&SyntheticConfig { recordings: 3, ..SyntheticConfig::default() });
    let pass1 = pipeline.compute_statistics(&corpus).unwrap();
    assert_eq!(pass1.accepted, vec![0, 1, 2]);

    let normalized: Vec<Array2<f64>> = (0..corpus.len())
        .map(|i| {
            let c = pipeline.condition(corpus.load(i).unwrap()).unwrap();
            pass1.stats.apply(c.signal.view()).unwrap()
        })
        .collect();
    let views: Vec<_> = normalized.iter().map(|a| a.view()).collect();
    let all = concatenate(Axis(0), &views).unwrap();
    assert_eq!(all.nrows() as u64, pass1.stats.count);

    for col in all.axis_iter(Axis(1)) {
        assert_abs_diff_eq!(col.mean().unwrap(), 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(col.std(0.0), 1.0, epsilon = 1e-6);
    }
}

#[test]
fn runs_are_deterministic() {
    let cfg = PrepConfig { pre_fall_seconds: 3.0, ..PrepConfig::default() };
    let corpus = synthetic_corpus(&SyntheticConfig::default());
    let a = Pipeline::new(cfg.clone()).unwrap().run(&corpus).unwrap();
    let b = Pipeline::new(cfg).unwrap().run(&corpus).unwrap();
    assert_eq!(a.windows, b.windows);
    assert_eq!(a.labels, b.labels);
    assert_eq!(a.metadata.mean, b.metadata.mean);
    assert_eq!(a.report, b.report);
}

// ---------------------------------------------------------------------------
// CSV corpus end to end
// ---------------------------------------------------------------------------

#[test]
fn csv_corpus_end_to_end() {
    let tmp = tempfile::tempdir().unwrap();
    let base = tmp.path().join("Activities");
    let out = tmp.path().join("out");

    // 200 samples on a seconds axis, no fall.
    write_csv(&base.join("WAL/WAL_1.csv"), (0..200).map(|i| (i as f64 / 20.0, "wal")));
    // 400 samples on a millisecond axis, FOL at 300..320.
    write_csv(
        &base.join("FOL/FOL_1.csv"),
        (0..400).map(|i| {
            let label = if (300..320).contains(&i) { "FOL" } else { "STD" };
            (1_000_000.0 + 50.0 * i as f64, label)
        }),
    );
    // Missing gyro_z: skipped.
    fs::create_dir_all(base.join("BSC")).unwrap();
    fs::write(
        base.join("BSC/broken.csv"),
        "rel_time,acc_x,acc_y,acc_z,gyro_x,gyro_y,label\n0,1,2,3,4,5,BSC\n",
    )
    .unwrap();

    let cfg = PrepConfig {
        base_dir: base.clone(),
        out_dir: out.clone(),
        ..scenario_config(LabelStrategyKind::FirstSample)
    };
    let corpus = CsvCorpus::from_config(&cfg).unwrap();
    assert_eq!(corpus.len(), 3);

    let ds = Pipeline::new(cfg.clone()).unwrap().run(&corpus).unwrap();
    assert_eq!(ds.report.recordings_discovered, 3);
    assert_eq!(ds.report.recordings_used(), 2);
    assert_eq!(ds.report.skipped.len(), 1);
    assert!(ds.report.skipped[0].recording.contains("broken.csv"));
    assert_eq!(ds.report.millis_corrected, 1);
    // FOL (≈400 grid samples) → 6 windows, WAL (200) → 3 windows.
    assert_eq!(ds.len(), 9);
    assert!(ds.labels.iter().any(|&c| c == 1), "expected at least one PRE_FALL window");

    let paths = ds.write(&cfg.out_dir).unwrap();
    let (windows, labels) = read_arrays(&out).unwrap();
    assert_eq!(windows.dim(), (9, 60, NUM_CHANNELS));
    assert_eq!(labels, ds.labels);

    let meta = DatasetMetadata::load(&paths.stats).unwrap();
    assert_eq!(meta.window_size, 60);
    assert_eq!(meta.stride, 60);
    assert_eq!(meta.fs, 20.0);
    assert_eq!(meta.num_windows, 9);
    assert_eq!(meta.mean.len(), NUM_CHANNELS);
}

#[test]
fn empty_directory_is_empty_corpus() {
    let tmp = tempfile::tempdir().unwrap();
    let cfg = PrepConfig { base_dir: tmp.path().to_path_buf(), ..PrepConfig::default() };
    let corpus = CsvCorpus::from_config(&cfg).unwrap();
    let err = Pipeline::new(cfg).unwrap().run(&corpus).unwrap_err();
    assert!(matches!(err, PrepError::EmptyCorpus { discovered: 0, skipped: 0 }));
}
