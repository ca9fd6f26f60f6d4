//! Recording sources for the pipeline.
//!
//! The pipeline reads recordings through the [`RecordingSource`] trait so the
//! same two-pass logic runs over a directory of CSV files ([`CsvCorpus`]) or
//! over recordings already held in memory ([`InMemoryCorpus`], used by tests
//! and dry runs).
//!
//! # Directory layout
//!
//! ```text
//! base_dir/
//!   BSC/
//!     BSC_1_1_annotated.csv
//!   WAL/
//!     WAL_1_1_annotated.csv
//!     ...
//! ```
//!
//! Activity folders and the files inside them are visited in lexicographic
//! order, so a corpus run is deterministic.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::config::PrepConfig;
use crate::error::{PrepError, RecordingError};
use crate::labels::LabelVocabulary;
use crate::recording::{load_csv, CsvLayout, RawRecording};

// ---------------------------------------------------------------------------
// RecordingSource
// ---------------------------------------------------------------------------

/// An ordered, re-readable collection of recordings.
///
/// `load(idx)` must return the same recording every time it is called; the
/// pipeline reads each recording once per pass.
pub trait RecordingSource {
    /// Number of recordings.
    fn len(&self) -> usize;

    /// Identifier of recording `idx` for logs and skip reports.
    fn id(&self, idx: usize) -> String;

    /// Load recording `idx`.
    ///
    /// # Errors
    ///
    /// [`RecordingError::IndexOutOfBounds`] when `idx >= self.len()`, and
    /// source-specific errors for I/O or format problems.
    fn load(&self, idx: usize) -> Result<RawRecording, RecordingError>;

    /// Returns `true` when the source holds no recordings.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Human-readable name for logging.
    fn name(&self) -> &str;
}

// ---------------------------------------------------------------------------
// CsvCorpus
// ---------------------------------------------------------------------------

/// Recordings stored as `base_dir/<activity>/*.csv`.
#[derive(Debug, Clone)]
pub struct CsvCorpus {
    root: PathBuf,
    files: Vec<PathBuf>,
    layout: CsvLayout,
    vocabulary: LabelVocabulary,
}

impl CsvCorpus {
    /// Scan `root` for recording files.
    ///
    /// # Errors
    ///
    /// [`PrepError::DirectoryNotFound`] if `root` is not a directory, and
    /// [`PrepError::Io`] if a directory cannot be listed.
    pub fn discover(
        root: &Path,
        layout: CsvLayout,
        vocabulary: LabelVocabulary,
    ) -> Result<Self, PrepError> {
        let files = discover_csv_files(root)?;
        info!("Discovered {} CSV recordings under {}", files.len(), root.display());
        Ok(CsvCorpus { root: root.to_path_buf(), files, layout, vocabulary })
    }

    /// Scan `config.base_dir` with the configured layout and vocabulary.
    pub fn from_config(config: &PrepConfig) -> Result<Self, PrepError> {
        CsvCorpus::discover(&config.base_dir, config.csv_layout(), config.vocabulary())
    }

    /// Root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Discovered files in visiting order.
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }
}

impl RecordingSource for CsvCorpus {
    fn len(&self) -> usize {
        self.files.len()
    }

    fn id(&self, idx: usize) -> String {
        match self.files.get(idx) {
            Some(p) => p.strip_prefix(&self.root).unwrap_or(p).display().to_string(),
            None => format!("#{idx}"),
        }
    }

    fn load(&self, idx: usize) -> Result<RawRecording, RecordingError> {
        let path = self
            .files
            .get(idx)
            .ok_or(RecordingError::IndexOutOfBounds { idx, len: self.files.len() })?;
        debug!("Loading {}", path.display());
        let mut rec = load_csv(path, &self.layout, &self.vocabulary)?;
        rec.id = self.id(idx);
        Ok(rec)
    }

    fn name(&self) -> &str {
        "CsvCorpus"
    }
}

/// Sorted `root/<dir>/*.csv` paths (one level of activity folders).
pub fn discover_csv_files(root: &Path) -> Result<Vec<PathBuf>, PrepError> {
    if !root.is_dir() {
        return Err(PrepError::DirectoryNotFound { path: root.to_path_buf() });
    }

    let mut files = Vec::new();
    for dir in sorted_entries(root)?.into_iter().filter(|p| p.is_dir()) {
        let before = files.len();
        files.extend(sorted_entries(&dir)?.into_iter().filter(|p| is_csv(p)));
        debug!("{}: {} files", dir.display(), files.len() - before);
    }
    Ok(files)
}

/// Sorted `*.csv` paths anywhere below `root`.
pub fn walk_csv_files(root: &Path) -> Result<Vec<PathBuf>, PrepError> {
    if !root.is_dir() {
        return Err(PrepError::DirectoryNotFound { path: root.to_path_buf() });
    }

    let mut files = Vec::new();
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        for path in sorted_entries(&dir)? {
            if path.is_dir() {
                pending.push(path);
            } else if is_csv(&path) {
                files.push(path);
            }
        }
    }
    files.sort();
    Ok(files)
}

fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>, PrepError> {
    let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)
        .map_err(|e| PrepError::io(dir, e))?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .collect();
    entries.sort();
    Ok(entries)
}

fn is_csv(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("csv"))
            .unwrap_or(false)
}

// ---------------------------------------------------------------------------
// InMemoryCorpus
// ---------------------------------------------------------------------------

/// Recordings held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCorpus {
    recordings: Vec<RawRecording>,
}

impl InMemoryCorpus {
    /// Wrap a list of recordings; order is preserved.
    pub fn new(recordings: Vec<RawRecording>) -> Self {
        InMemoryCorpus { recordings }
    }

    /// Append a recording.
    pub fn push(&mut self, recording: RawRecording) {
        self.recordings.push(recording);
    }
}

impl RecordingSource for InMemoryCorpus {
    fn len(&self) -> usize {
        self.recordings.len()
    }

    fn id(&self, idx: usize) -> String {
        self.recordings.get(idx).map(|r| r.id.clone()).unwrap_or_else(|| format!("#{idx}"))
    }

    fn load(&self, idx: usize) -> Result<RawRecording, RecordingError> {
        self.recordings
            .get(idx)
            .cloned()
            .ok_or(RecordingError::IndexOutOfBounds { idx, len: self.recordings.len() })
    }

    fn name(&self) -> &str {
        "InMemoryCorpus"
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
