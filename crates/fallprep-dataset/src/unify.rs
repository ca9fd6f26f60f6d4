//! Rewrite a CSV tree with unified labels.
//!
//! Every `*.csv` below the input root is copied to the same relative path
//! under the output root with its label column normalized: cells are
//! trimmed and upper-cased, and every fall type becomes `FALL`. Other
//! columns are copied verbatim. Files without the label column are skipped
//! with a warning.

use std::path::Path;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::corpus::walk_csv_files;
use crate::error::{PrepError, RecordingError};
use crate::labels::LabelVocabulary;

/// Outcome of rewriting one file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UnifyFileStats {
    /// Data rows written.
    pub rows: usize,
    /// Rows whose label became `FALL`.
    pub fall_rows: usize,
}

/// Outcome of [`unify_tree`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UnifySummary {
    /// Files rewritten.
    pub files_written: usize,
    /// Files skipped (no label column or unreadable).
    pub files_skipped: usize,
    /// Data rows written across all files.
    pub rows: usize,
    /// Rows relabelled `FALL` across all files.
    pub fall_rows: usize,
}

/// Rewrite one CSV, returning `Ok(None)` when it has no `label_column`.
pub fn unify_file(
    input: &Path,
    output: &Path,
    label_column: &str,
    vocabulary: &LabelVocabulary,
) -> Result<Option<UnifyFileStats>, RecordingError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(input)
        .map_err(|e| RecordingError::csv(input, e))?;
    let headers = reader.headers().map_err(|e| RecordingError::csv(input, e))?.clone();

    let Some(label_idx) = headers.iter().position(|h| h.trim() == label_column) else {
        return Ok(None);
    };

    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent).map_err(|e| RecordingError::io(parent, e))?;
    }
    let mut writer = csv::Writer::from_path(output).map_err(|e| RecordingError::csv(output, e))?;
    writer.write_record(&headers).map_err(|e| RecordingError::csv(output, e))?;

    let mut stats = UnifyFileStats::default();
    for record in reader.records() {
        let record = record.map_err(|e| RecordingError::csv(input, e))?;
        let row: Vec<String> = record
            .iter()
            .enumerate()
            .map(|(i, cell)| if i == label_idx { vocabulary.unify_text(cell) } else { cell.to_string() })
            .collect();
        if vocabulary.is_fall(record.get(label_idx).unwrap_or("")) {
            stats.fall_rows += 1;
        }
        writer.write_record(&row).map_err(|e| RecordingError::csv(output, e))?;
        stats.rows += 1;
    }
    writer.flush().map_err(|e| RecordingError::io(output, e))?;
    Ok(Some(stats))
}

/// Rewrite every CSV under `input_root` into `output_root`.
///
/// Unreadable files are skipped with a warning; only a missing input root
/// is an error.
pub fn unify_tree(
    input_root: &Path,
    output_root: &Path,
    label_column: &str,
    vocabulary: &LabelVocabulary,
) -> Result<UnifySummary, PrepError> {
    let files = walk_csv_files(input_root)?;
    info!("Unifying labels in {} files under {}", files.len(), input_root.display());

    let mut summary = UnifySummary::default();
    for path in files {
        let relative = path.strip_prefix(input_root).unwrap_or(&path);
        let target = output_root.join(relative);
        match unify_file(&path, &target, label_column, vocabulary) {
            Ok(Some(stats)) => {
                debug!("{} → {} ({} rows)", path.display(), target.display(), stats.rows);
                summary.files_written += 1;
                summary.rows += stats.rows;
                summary.fall_rows += stats.fall_rows;
            }
            Ok(None) => {
                warn!("Skipping {}: no `{label_column}` column", path.display());
                summary.files_skipped += 1;
            }
            Err(e) => {
                warn!("Skipping {}: {e}", path.display());
                summary.files_skipped += 1;
            }
        }
    }

    info!(
        "Unified {} files ({} skipped), {} rows, {} FALL rows",
        summary.files_written, summary.files_skipped, summary.rows, summary.fall_rows
    );
    Ok(summary)
}
