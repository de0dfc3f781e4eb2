//! `tripdata convert` – submit a conversion batch and poll it to completion.

use anyhow::Result;
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;

use tripdata_core::jobs::{self, JobRegistry, JobResult, JobStatus};
use tripdata_core::transcode::ConversionRequest;

use super::poll;

#[derive(Debug, Args)]
pub struct ConvertArgs {
    /// Directory holding input CSV files.
    #[arg(long)]
    pub input_dir: PathBuf,

    /// Directory converted JSONL files are written to.
    #[arg(long)]
    pub output_dir: PathBuf,

    /// Move successfully converted sources here.
    #[arg(long)]
    pub backup_dir: Option<PathBuf>,

    /// Explicit filenames relative to the input directory (default: every *.csv there).
    pub files: Vec<String>,
}

pub async fn run_convert(registry: &Arc<JobRegistry>, args: ConvertArgs) -> Result<()> {
    let request = ConversionRequest {
        input_dir: args.input_dir,
        output_dir: args.output_dir,
        backup_dir: args.backup_dir,
        files: if args.files.is_empty() {
            None
        } else {
            Some(args.files)
        },
    };

    println!("Input directory: {}", request.input_dir.display());
    println!("Output directory: {}", request.output_dir.display());

    let id = jobs::submit_conversion(registry, request)?;
    println!("Submitted conversion job {id}");

    let record = poll::wait_for_terminal(registry, &id).await?;
    if record.status == JobStatus::Failed {
        anyhow::bail!("conversion job failed: {}", record.message);
    }
    if let Some(JobResult::Conversion(result)) = record.result {
        println!(
            "Conversion finished: {} converted, {} failed of {} files",
            result.converted, result.failed, result.total_files
        );
        for r in &result.records {
            match (&r.output, &r.error) {
                (Some(output), _) => println!("  ok   {} -> {}", r.input, output),
                (None, Some(error)) => println!("  fail {} ({error})", r.input),
                (None, None) => println!("  fail {}", r.input),
            }
        }
    }
    Ok(())
}
