//! Corpus maintenance commands: `unify` and `scan`.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use fallprep_dataset::labels::DEFAULT_FALL_LABELS;
use fallprep_dataset::scan::{scan_tree, MissingValueReport};
use fallprep_dataset::unify::unify_tree;
use fallprep_dataset::LabelVocabulary;

use crate::OutputFormat;

/// Arguments for the unify command
#[derive(Args, Debug)]
pub struct UnifyArgs {
    /// Root of the raw CSV tree
    #[arg(short, long)]
    pub input: PathBuf,

    /// Root of the rewritten tree (folder structure is preserved)
    #[arg(short, long)]
    pub output: PathBuf,

    /// Name of the label column
    #[arg(long, default_value = "label")]
    pub label_column: String,

    /// Activity codes folded into FALL (repeatable)
    #[arg(long = "fall-label", default_values_t = DEFAULT_FALL_LABELS.map(String::from))]
    pub fall_labels: Vec<String>,
}

/// Arguments for the scan command
#[derive(Args, Debug)]
pub struct ScanArgs {
    /// Root of the CSV tree
    #[arg(short, long)]
    pub input: PathBuf,

    /// Also list files without missing values
    #[arg(short, long)]
    pub all: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

/// Execute the unify command
pub fn execute_unify(args: UnifyArgs) -> Result<()> {
    let vocabulary = LabelVocabulary::new(&args.fall_labels);
    let summary = unify_tree(&args.input, &args.output, &args.label_column, &vocabulary)?;
    println!(
        "{} {} files written, {} skipped, {} rows ({} FALL) → {}",
        "[fallprep]".bright_cyan().bold(),
        summary.files_written,
        summary.files_skipped,
        summary.rows,
        summary.fall_rows,
        args.output.display()
    );
    Ok(())
}

#[derive(Tabled)]
struct MissingRow {
    #[tabled(rename = "File")]
    file: String,
    #[tabled(rename = "Rows")]
    rows: usize,
    #[tabled(rename = "Column")]
    column: String,
    #[tabled(rename = "Missing")]
    missing: usize,
}

fn missing_rows(reports: &[MissingValueReport], all: bool) -> Vec<MissingRow> {
    let mut rows = Vec::new();
    for r in reports {
        let file = r.path.display().to_string();
        if r.is_clean() {
            if all {
                rows.push(MissingRow { file, rows: r.rows, column: "-".into(), missing: 0 });
            }
            continue;
        }
        for (column, missing) in &r.missing {
            rows.push(MissingRow {
                file: file.clone(),
                rows: r.rows,
                column: column.clone(),
                missing: *missing,
            });
        }
    }
    rows
}

/// Execute the scan command
pub fn execute_scan(args: ScanArgs) -> Result<()> {
    let reports = scan_tree(&args.input)?;
    let dirty = reports.iter().filter(|r| !r.is_clean()).count();
    let shown: Vec<&MissingValueReport> =
        reports.iter().filter(|r| args.all || !r.is_clean()).collect();

    match args.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&shown)?);
        }
        OutputFormat::Compact => {
            for r in &shown {
                println!("{}\t{}\t{}", r.path.display(), r.rows, r.total());
            }
        }
        OutputFormat::Table => {
            let rows = missing_rows(&reports, args.all);
            if rows.is_empty() {
                println!(
                    "{} No missing values in {} files",
                    "[fallprep]".bright_cyan().bold(),
                    reports.len()
                );
            } else {
                println!("{}", Table::new(rows).with(Style::rounded()));
                println!();
                println!(
                    "{}",
                    format!("{dirty} of {} files have missing values", reports.len()).yellow()
                );
            }
        }
    }
    Ok(())
}
