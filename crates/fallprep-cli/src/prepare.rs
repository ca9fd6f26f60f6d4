//! `fallprep prepare`: run the pipeline over a corpus.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};
use tracing::info;

use fallprep_dataset::synthetic::{synthetic_corpus, SyntheticConfig};
use fallprep_dataset::{
    ClassLabel, CsvCorpus, LabelStrategyKind, Pipeline, PrepConfig, PreparedDataset,
};

use crate::OutputFormat;

/// Arguments for the prepare command
#[derive(Args, Debug)]
pub struct PrepareArgs {
    /// JSON configuration file (defaults are used when absent)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Corpus root containing one folder of CSV files per activity
    #[arg(short, long)]
    pub data_dir: Option<PathBuf>,

    /// Output directory for windows.npy, labels.npy and norm_stats.json
    #[arg(short, long)]
    pub out_dir: Option<PathBuf>,

    /// Length of the PRE_FALL interval before each fall onset, in seconds
    #[arg(long)]
    pub pre_fall_seconds: Option<f64>,

    /// Target sampling rate in Hz
    #[arg(long)]
    pub rate: Option<f64>,

    /// Window length in samples
    #[arg(long)]
    pub window_size: Option<usize>,

    /// Distance between window starts in samples
    #[arg(long)]
    pub stride: Option<usize>,

    /// Rule assigning one label per window
    #[arg(long, value_enum)]
    pub strategy: Option<StrategyArg>,

    /// Write the effective configuration to this file
    #[arg(long)]
    pub write_config: Option<PathBuf>,

    /// Run on a synthetic corpus and write nothing
    #[arg(long)]
    pub dry_run: bool,

    /// Number of synthetic recordings for --dry-run
    #[arg(long, default_value = "4", requires = "dry_run")]
    pub synthetic_recordings: usize,

    /// Output format of the run summary
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

/// Window label strategy argument enum for CLI
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum StrategyArg {
    /// Label of the window's first sample
    FirstSample,
    /// Most frequent class in the window
    MajorityVote,
    /// Most severe class present in the window
    MostSevere,
}

impl From<StrategyArg> for LabelStrategyKind {
    fn from(val: StrategyArg) -> Self {
        match val {
            StrategyArg::FirstSample => LabelStrategyKind::FirstSample,
            StrategyArg::MajorityVote => LabelStrategyKind::MajorityVote,
            StrategyArg::MostSevere => LabelStrategyKind::MostSevere,
        }
    }
}

impl PrepareArgs {
    /// Configuration file (or defaults) with command-line overrides applied.
    pub fn resolve_config(&self) -> Result<PrepConfig> {
        let mut config = match &self.config {
            Some(path) => PrepConfig::from_json(path)
                .with_context(|| format!("cannot load config {}", path.display()))?,
            None => PrepConfig::default(),
        };

        if let Some(dir) = &self.data_dir {
            config.base_dir = dir.clone();
        }
        if let Some(dir) = &self.out_dir {
            config.out_dir = dir.clone();
        }
        if let Some(s) = self.pre_fall_seconds {
            config.pre_fall_seconds = s;
        }
        if let Some(r) = self.rate {
            config.target_rate_hz = r;
        }
        if let Some(w) = self.window_size {
            config.window_size = w;
        }
        if let Some(s) = self.stride {
            config.stride = s;
        }
        if let Some(s) = self.strategy {
            config.label_strategy = s.into();
        }

        config.validate().context("invalid configuration")?;
        Ok(config)
    }
}

#[derive(Tabled)]
struct ClassRow {
    #[tabled(rename = "Class")]
    class: String,
    #[tabled(rename = "Code")]
    code: i64,
    #[tabled(rename = "Samples")]
    samples: usize,
    #[tabled(rename = "Windows")]
    windows: usize,
}

#[derive(Tabled)]
struct SkippedRow {
    #[tabled(rename = "Recording")]
    recording: String,
    #[tabled(rename = "Reason")]
    reason: String,
}

/// Execute the prepare command
pub fn execute(args: PrepareArgs) -> Result<()> {
    let config = args.resolve_config()?;

    if let Some(path) = &args.write_config {
        config
            .to_json(path)
            .with_context(|| format!("cannot write config {}", path.display()))?;
        info!("Wrote configuration to {}", path.display());
    }

    let pipeline = Pipeline::new(config.clone())?;

    let dataset = if args.dry_run {
        let synthetic = SyntheticConfig {
            recordings: args.synthetic_recordings,
            ..SyntheticConfig::default()
        };
        pipeline.run(&synthetic_corpus(&synthetic))?
    } else {
        let corpus = CsvCorpus::from_config(&config)?;
        pipeline.run(&corpus)?
    };

    if args.dry_run {
        info!("Dry run: no artifacts written");
    } else {
        let paths = dataset.write(&config.out_dir)?;
        info!("Dataset written to {}", paths.windows.display());
    }

    print_summary(&dataset, args.format)
}

fn print_summary(dataset: &PreparedDataset, format: OutputFormat) -> Result<()> {
    let report = &dataset.report;
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(report)?);
        }
        OutputFormat::Compact => {
            println!(
                "windows={} recordings={} skipped={} {}",
                dataset.len(),
                report.recordings_used(),
                report.skipped.len(),
                report.window_counts
            );
        }
        OutputFormat::Table => {
            println!(
                "{} {} windows of {} x {} from {} recordings",
                "[fallprep]".bright_cyan().bold(),
                dataset.len(),
                dataset.metadata.window_size,
                dataset.metadata.channels.len(),
                report.recordings_used()
            );
            println!();

            let rows: Vec<ClassRow> = ClassLabel::ALL
                .into_iter()
                .map(|c| ClassRow {
                    class: c.to_string(),
                    code: dataset.metadata.label_map.code(c),
                    samples: report.sample_counts.get(c),
                    windows: report.window_counts.get(c),
                })
                .collect();
            println!("{}", Table::new(rows).with(Style::rounded()));

            if !report.skipped.is_empty() {
                println!();
                println!("{}", format!("Skipped {} recordings:", report.skipped.len()).yellow());
                let rows = report.skipped.iter().map(|s| SkippedRow {
                    recording: s.recording.clone(),
                    reason: s.reason.clone(),
                });
                println!("{}", Table::new(rows).with(Style::rounded()));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Cli, Commands};
    use clap::Parser;

    fn prepare_args(argv: &[&str]) -> PrepareArgs {
        let mut full = vec!["fallprep", "prepare"];
        full.extend_from_slice(argv);
        match Cli::try_parse_from(full).unwrap().command {
            Commands::Prepare(args) => args,
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn overrides_apply_on_top_of_defaults() {
        let args = prepare_args(&[
            "--data-dir",
            "/corpus",
            "--pre-fall-seconds",
            "3",
            "--window-size",
            "60",
            "--stride",
            "30",
            "--strategy",
            "majority-vote",
        ]);
        let cfg = args.resolve_config().unwrap();
        assert_eq!(cfg.base_dir, PathBuf::from("/corpus"));
        assert_eq!(cfg.pre_fall_seconds, 3.0);
        assert_eq!(cfg.window_size, 60);
        assert_eq!(cfg.stride, 30);
        assert_eq!(cfg.label_strategy, LabelStrategyKind::MajorityVote);
        assert_eq!(cfg.target_rate_hz, 20.0);
    }

    #[test]
    fn overrides_apply_on_top_of_config_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("prep.json");
        PrepConfig { stride: 40, ..PrepConfig::default() }.to_json(&path).unwrap();

        let args = prepare_args(&["--config", path.to_str().unwrap(), "--rate", "25"]);
        let cfg = args.resolve_config().unwrap();
        assert_eq!(cfg.stride, 40);
        assert_eq!(cfg.target_rate_hz, 25.0);
    }

    #[test]
    fn invalid_override_is_rejected() {
        let args = prepare_args(&["--stride", "0"]);
        assert!(args.resolve_config().is_err());
    }

    #[test]
    fn synthetic_count_requires_dry_run() {
        let argv = ["fallprep", "prepare", "--synthetic-recordings", "2"];
        assert!(Cli::try_parse_from(argv).is_err());
    }

    #[test]
    fn dry_run_executes_without_writing() {
        let tmp = tempfile::tempdir().unwrap();
        let out = tmp.path().join("out");
        let config_path = tmp.path().join("effective.json");
        let args = prepare_args(&[
            "--dry-run",
            "--synthetic-recordings",
            "2",
            "--out-dir",
            out.to_str().unwrap(),
            "--write-config",
            config_path.to_str().unwrap(),
            "--format",
            "compact",
        ]);
        execute(args).unwrap();
        assert!(!out.exists());
        assert!(PrepConfig::from_json(&config_path).is_ok());
    }
}
