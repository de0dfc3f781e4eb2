//! `tripdata collect` – submit a collection job and poll it to completion.

use anyhow::Result;
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;

use tripdata_core::collector::{CollectionEngine, CollectionRequest};
use tripdata_core::config::TripdataConfig;
use tripdata_core::convert::NoConverter;
use tripdata_core::jobs::{self, JobRegistry, JobResult, JobStatus};
use tripdata_core::planner::{TaxiType, YearMonth};

use super::poll;

#[derive(Debug, Args)]
pub struct CollectArgs {
    /// Taxi type to collect (yellow, green, fhv, fhvhv).
    #[arg(long, default_value = "yellow")]
    pub taxi_type: String,

    /// Start year.
    #[arg(long, default_value = "2023")]
    pub start_year: i32,

    /// Start month (1-12).
    #[arg(long, default_value = "1")]
    pub start_month: u32,

    /// End year (default: current year).
    #[arg(long)]
    pub end_year: Option<i32>,

    /// End month (default: current month).
    #[arg(long)]
    pub end_month: Option<u32>,

    /// Maximum collection size in GB (default: from config).
    #[arg(long)]
    pub max_size_gb: Option<f64>,

    /// Maximum number of files to collect.
    #[arg(long)]
    pub max_files: Option<u64>,

    /// Output directory (default: from config).
    #[arg(long)]
    pub output_dir: Option<PathBuf>,
}

pub async fn run_collect(
    registry: &Arc<JobRegistry>,
    cfg: &TripdataConfig,
    args: CollectArgs,
) -> Result<()> {
    let taxi_type: TaxiType = args.taxi_type.parse()?;
    let start = YearMonth::new(args.start_year, args.start_month);
    let end = match (args.end_year, args.end_month) {
        (None, None) => None,
        (year, month) => {
            let current = YearMonth::current();
            Some(YearMonth::new(
                year.unwrap_or(current.year),
                month.unwrap_or(current.month),
            ))
        }
    };
    let max_size_bytes = match args.max_size_gb {
        Some(gb) => (gb * (1u64 << 30) as f64) as u64,
        None => cfg.max_size_bytes(),
    };

    let request = CollectionRequest {
        taxi_type,
        start,
        end,
        max_size_bytes,
        max_files: args.max_files,
        output_dir: args.output_dir.unwrap_or_else(|| cfg.output_dir.clone()),
    };

    println!("Taxi type: {taxi_type}");
    match end {
        Some(end) => println!("Period: {start} to {end}"),
        None => println!("Period: {start} to current month"),
    }
    println!("Max size: {max_size_bytes} bytes");
    println!("Output directory: {}", request.output_dir.display());

    let engine = Arc::new(CollectionEngine::new(cfg, Arc::new(NoConverter)));
    let id = jobs::submit_collection(registry, engine, request)?;
    println!("Submitted collection job {id}");

    let record = poll::wait_for_terminal(registry, &id).await?;
    if record.status == JobStatus::Failed {
        anyhow::bail!("collection job failed: {}", record.message);
    }
    if let Some(JobResult::Collection(result)) = record.result {
        println!(
            "Collection finished: {} files, {} bytes",
            result.files_count, result.total_bytes
        );
        for file in &result.files {
            println!("  {file}");
        }
    }
    Ok(())
}
