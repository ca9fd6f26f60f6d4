//! fallprep CLI
//!
//! Command-line interface for preparing windowed fall / pre-fall datasets
//! from annotated IMU recordings.
//!
//! # Features
//!
//! - **prepare**: Run the two-pass pipeline and write the dataset
//! - **unify**: Rewrite a CSV tree with fall types collapsed into `FALL`
//! - **scan**: Report missing values per file and column
//! - **version**: Display version information
//!
//! # Usage
//!
//! ```bash
//! # Prepare with defaults (6 s pre-fall, 120/60 windows at 20 Hz)
//! fallprep prepare --data-dir data/Activities_Labelled --out-dir data/preprocessed
//!
//! # Same run from a saved config, majority-vote window labels
//! fallprep prepare --config prep.json --strategy majority-vote
//!
//! # Unify fall labels into a new tree
//! fallprep unify --input data/raw --output data/Activities_Labelled
//!
//! # Look for gaps
//! fallprep scan --input data/raw
//! ```

use clap::{Parser, Subcommand, ValueEnum};

pub mod prepare;
pub mod tools;

/// fallprep Command Line Interface
#[derive(Parser, Debug)]
#[command(name = "fallprep")]
#[command(author, version, about = "Fall / pre-fall dataset preparation for IMU recordings")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Resample, filter, label, normalize and window a corpus
    Prepare(prepare::PrepareArgs),

    /// Rewrite CSV files with unified fall labels
    Unify(tools::UnifyArgs),

    /// Report missing values in CSV files
    Scan(tools::ScanArgs),

    /// Display version information
    Version,
}

/// Output format
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Pretty table output
    #[default]
    Table,
    /// JSON output
    Json,
    /// Compact single-line output
    Compact,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_version() {
        let cli = Cli::try_parse_from(["fallprep", "version"]).unwrap();
        assert!(matches!(cli.command, Commands::Version));
    }

    #[test]
    fn unify_requires_output() {
        assert!(Cli::try_parse_from(["fallprep", "unify", "--input", "raw"]).is_err());
    }
}
