//! CLI for the tripdata collection and conversion services.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tripdata_core::config;
use tripdata_core::jobs::JobRegistry;

use commands::{run_collect, run_convert, CollectArgs, ConvertArgs};

/// Top-level CLI for the tripdata job services.
#[derive(Debug, Parser)]
#[command(name = "tripdata")]
#[command(about = "Trip data collection and conversion job runner", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Collect monthly trip data files under a byte/file budget.
    Collect(CollectArgs),

    /// Convert collected CSV files to JSONL, one output per input.
    Convert(ConvertArgs),
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);
        let registry = Arc::new(JobRegistry::new());

        match cli.command {
            CliCommand::Collect(args) => run_collect(&registry, &cfg, args).await?,
            CliCommand::Convert(args) => run_convert(&registry, args).await?,
        }

        Ok(())
    }
}
