//! fallprep CLI Entry Point
//!
//! This is the main entry point for the fallprep command-line tool.

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use fallprep_cli::{prepare, tools, Cli, Commands};

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Prepare(args) => prepare::execute(args)?,
        Commands::Unify(args) => tools::execute_unify(args)?,
        Commands::Scan(args) => tools::execute_scan(args)?,
        Commands::Version => {
            println!("fallprep {}", env!("CARGO_PKG_VERSION"));
            println!("dataset crate version: {}", fallprep_dataset::VERSION);
            println!("signal crate version: {}", fallprep_signal::VERSION);
        }
    }

    Ok(())
}
