//! Missing-value diagnostic over a CSV tree.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, warn};

use crate::corpus::walk_csv_files;
use crate::error::{PrepError, RecordingError};

/// Missing cells per column for one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissingValueReport {
    /// File scanned.
    pub path: PathBuf,
    /// Data rows read.
    pub rows: usize,
    /// `(column, missing cells)` for every column with at least one gap,
    /// in header order.
    pub missing: Vec<(String, usize)>,
}

impl MissingValueReport {
    /// Missing cells across all columns.
    pub fn total(&self) -> usize {
        self.missing.iter().map(|(_, n)| n).sum()
    }

    /// `true` when no cell is missing.
    pub fn is_clean(&self) -> bool {
        self.missing.is_empty()
    }
}

/// `true` for empty cells and the usual textual NA markers.
pub fn is_missing(cell: &str) -> bool {
    let cell = cell.trim();
    cell.is_empty()
        || ["nan", "na", "n/a", "null", "none"].iter().any(|m| cell.eq_ignore_ascii_case(m))
}

/// Count missing cells per column in one CSV. Short rows count their absent
/// trailing fields as missing.
pub fn scan_file(path: &Path) -> Result<MissingValueReport, RecordingError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .map_err(|e| RecordingError::csv(path, e))?;
    let headers = reader.headers().map_err(|e| RecordingError::csv(path, e))?.clone();

    let mut counts = vec![0usize; headers.len()];
    let mut rows = 0;
    for record in reader.records() {
        let record = record.map_err(|e| RecordingError::csv(path, e))?;
        for (i, count) in counts.iter_mut().enumerate() {
            if record.get(i).map_or(true, is_missing) {
                *count += 1;
            }
        }
        rows += 1;
    }

    let missing = headers
        .iter()
        .zip(counts)
        .filter(|(_, n)| *n > 0)
        .map(|(h, n)| (h.to_string(), n))
        .collect();
    Ok(MissingValueReport { path: path.to_path_buf(), rows, missing })
}

/// Scan every CSV under `root`. Files that cannot be read are logged and
/// left out.
pub fn scan_tree(root: &Path) -> Result<Vec<MissingValueReport>, PrepError> {
    let files = walk_csv_files(root)?;
    let mut reports = Vec::with_capacity(files.len());
    for path in files {
        match scan_file(&path) {
            Ok(r) => reports.push(r),
            Err(e) => warn!("Cannot scan {}: {e}", path.display()),
        }
    }
    let dirty = reports.iter().filter(|r| !r.is_clean()).count();
    info!("Scanned {} files, {dirty} with missing values", reports.len());
    Ok(reports)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn counts_missing_cells_per_column() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("r.csv");
        fs::write(&path, "rel_time,acc_x,label\n0.0,,WAL\n0.1,NaN,\n0.2,1.0\n0.3,2.0,WAL\n").unwrap();

        let report = scan_file(&path).unwrap();
        assert_eq!(report.rows, 4);
        assert_eq!(report.missing, vec![("acc_x".to_string(), 2), ("label".to_string(), 2)]);
        assert_eq!(report.total(), 4);
    }

    #[test]
    fn clean_tree() {
        let tmp = tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("WAL")).unwrap();
        fs::write(tmp.path().join("WAL/a.csv"), "a,b\n1,2\n").unwrap();
        let reports = scan_tree(tmp.path()).unwrap();
        assert_eq!(reports.len(), 1);
        assert!(reports[0].is_clean());
    }

    #[test]
    fn markers() {
        assert!(is_missing("  "));
        assert!(is_missing("NULL"));
        assert!(!is_missing("0"));
        assert!(!is_missing("WAL"));
    }
}
