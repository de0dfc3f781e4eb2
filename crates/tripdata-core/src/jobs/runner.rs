//! Detached job execution.
//!
//! A runner executes one collection run or conversion batch outside the
//! submitting call's lifetime, writing transitions back to the registry.
//! Errors never escape a runner: they become a `failed` terminal state, so
//! no job is ever left `running`. Transitions attempted after the record
//! was deleted are dropped, never recreated.

use std::sync::Arc;

use anyhow::Result;

use crate::collector::{CollectionEngine, CollectionOutcome, CollectionRequest, RunState};
use crate::jobs::registry::{JobRegistry, RegistryError};
use crate::jobs::types::{CollectionJobResult, JobId, JobResult, JobStatus};
use crate::transcode::{self, ConversionRequest};

/// Write a transition, dropping `NotFound` (the job was deleted mid-run).
fn post(
    registry: &JobRegistry,
    id: &str,
    status: JobStatus,
    progress: u8,
    message: String,
    result: Option<JobResult>,
) {
    if let Err(RegistryError::NotFound(_)) =
        registry.transition(id, status, progress, message, result)
    {
        tracing::debug!(id, "job deleted mid-run, dropping transition");
    }
}

/// Validate and submit a collection job. Returns the new job id immediately;
/// the run proceeds on a detached task. Configuration errors (unknown type,
/// inverted range, zero ceiling) fail here, before any job record exists.
pub fn submit_collection(
    registry: &Arc<JobRegistry>,
    engine: Arc<CollectionEngine>,
    request: CollectionRequest,
) -> Result<JobId> {
    engine.check(&request)?;

    let record = registry.create();
    let id = record.id.clone();
    let registry = Arc::clone(registry);
    let job_id = record.id;

    tokio::spawn(async move {
        post(
            &registry,
            &job_id,
            JobStatus::Running,
            0,
            "collection started".to_string(),
            None,
        );

        let progress_registry = Arc::clone(&registry);
        let progress_id = job_id.clone();
        let run = tokio::task::spawn_blocking(move || {
            engine.run(&request, |progress| {
                post(
                    &progress_registry,
                    &progress_id,
                    JobStatus::Running,
                    progress.percent(),
                    progress.message(),
                    None,
                );
            })
        })
        .await;

        match run {
            Ok(Ok(outcome)) => {
                let message = outcome_message(&outcome);
                let result = JobResult::Collection(CollectionJobResult {
                    files_count: outcome.files_count,
                    total_bytes: outcome.total_bytes,
                    files: outcome.files,
                });
                post(
                    &registry,
                    &job_id,
                    JobStatus::Completed,
                    100,
                    message,
                    Some(result),
                );
            }
            Ok(Err(err)) => {
                tracing::error!(id = %job_id, error = %err, "collection job failed");
                post(
                    &registry,
                    &job_id,
                    JobStatus::Failed,
                    0,
                    format!("{err:#}"),
                    None,
                );
            }
            Err(join_err) => {
                tracing::error!(id = %job_id, error = %join_err, "collection task aborted");
                post(
                    &registry,
                    &job_id,
                    JobStatus::Failed,
                    0,
                    format!("collection task aborted: {join_err}"),
                    None,
                );
            }
        }
    });

    Ok(id)
}

fn outcome_message(outcome: &CollectionOutcome) -> String {
    let verdict = match outcome.state {
        RunState::Stopped => "collection stopped at ceiling",
        _ => "collection completed",
    };
    format!(
        "{}: {} files, {} bytes",
        verdict, outcome.files_count, outcome.total_bytes
    )
}

/// Validate and submit a conversion batch job. Returns the new job id
/// immediately; the batch proceeds on a detached task.
pub fn submit_conversion(
    registry: &Arc<JobRegistry>,
    request: ConversionRequest,
) -> Result<JobId> {
    anyhow::ensure!(
        request.input_dir.is_dir(),
        "input directory does not exist: {}",
        request.input_dir.display()
    );

    let record = registry.create();
    let id = record.id.clone();
    let registry = Arc::clone(registry);
    let job_id = record.id;

    tokio::spawn(async move {
        post(
            &registry,
            &job_id,
            JobStatus::Running,
            0,
            "conversion started".to_string(),
            None,
        );

        let progress_registry = Arc::clone(&registry);
        let progress_id = job_id.clone();
        let run = tokio::task::spawn_blocking(move || {
            transcode::run_batch(&request, |done, total| {
                let percent = if total == 0 {
                    100
                } else {
                    ((done * 100) / total).min(100) as u8
                };
                post(
                    &progress_registry,
                    &progress_id,
                    JobStatus::Running,
                    percent,
                    format!("converted {done}/{total} files"),
                    None,
                );
            })
        })
        .await;

        match run {
            Ok(Ok(result)) => {
                let message = format!(
                    "conversion completed: {} of {} files",
                    result.converted, result.total_files
                );
                post(
                    &registry,
                    &job_id,
                    JobStatus::Completed,
                    100,
                    message,
                    Some(JobResult::Conversion(result)),
                );
            }
            Ok(Err(err)) => {
                tracing::error!(id = %job_id, error = %err, "conversion job failed");
                post(
                    &registry,
                    &job_id,
                    JobStatus::Failed,
                    0,
                    format!("{err:#}"),
                    None,
                );
            }
            Err(join_err) => {
                tracing::error!(id = %job_id, error = %join_err, "conversion task aborted");
                post(
                    &registry,
                    &job_id,
                    JobStatus::Failed,
                    0,
                    format!("conversion task aborted: {join_err}"),
                    None,
                );
            }
        }
    });

    Ok(id)
}
