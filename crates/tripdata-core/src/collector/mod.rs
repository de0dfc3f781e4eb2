//! Bounded collection runs.
//!
//! Drives the planner's target sequence through the fetch pipeline under a
//! byte/file budget, with skip-if-present resumption and stop conditions.
//! Stopping at a ceiling is a successful outcome; only configuration errors
//! prevent a run from starting.

mod budget;

pub use budget::CollectionBudget;

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::config::TripdataConfig;
use crate::convert::ColumnarConverter;
use crate::fetch_head;
use crate::pipeline;
use crate::planner::{self, MonthPlan, PlanError, TaxiType, YearMonth};

/// Lifecycle of one collection run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    Idle,
    Collecting,
    /// The whole requested range was processed.
    Completed,
    /// A byte or file ceiling ended the run early. Not an error.
    Stopped,
}

impl RunState {
    pub fn as_str(self) -> &'static str {
        match self {
            RunState::Idle => "idle",
            RunState::Collecting => "collecting",
            RunState::Completed => "completed",
            RunState::Stopped => "stopped",
        }
    }
}

/// Parameters for one collection run.
#[derive(Debug, Clone)]
pub struct CollectionRequest {
    pub taxi_type: TaxiType,
    pub start: YearMonth,
    /// Inclusive end; defaults to the current UTC month.
    pub end: Option<YearMonth>,
    /// Byte ceiling for the run.
    pub max_size_bytes: u64,
    /// Optional file-count ceiling.
    pub max_files: Option<u64>,
    pub output_dir: PathBuf,
}

/// Snapshot emitted after each processed target.
#[derive(Debug, Clone)]
pub struct CollectionProgress {
    pub month: YearMonth,
    pub files: u64,
    pub bytes: u64,
    pub targets_done: usize,
    pub targets_total: usize,
}

impl CollectionProgress {
    /// Share of the requested range processed so far, 0–100.
    pub fn percent(&self) -> u8 {
        if self.targets_total == 0 {
            return 100;
        }
        ((self.targets_done * 100) / self.targets_total).min(100) as u8
    }

    pub fn message(&self) -> String {
        format!(
            "collected {} files, {} bytes ({}/{} months)",
            self.files, self.bytes, self.targets_done, self.targets_total
        )
    }
}

/// Final accounting for a run. Both `Completed` and `Stopped` are success.
#[derive(Debug, Clone, serde::Serialize)]
pub struct CollectionOutcome {
    pub state: RunState,
    pub files_count: u64,
    pub total_bytes: u64,
    /// Canonical filenames committed during this run, in collection order.
    pub files: Vec<String>,
}

/// Executes collection runs. One engine can serve many runs; each run gets
/// its own budget.
pub struct CollectionEngine {
    base_url: String,
    inter_target_delay: Duration,
    probe_timeout: Duration,
    download_timeout: Duration,
    converter: Arc<dyn ColumnarConverter>,
}

impl CollectionEngine {
    pub fn new(cfg: &TripdataConfig, converter: Arc<dyn ColumnarConverter>) -> Self {
        Self {
            base_url: cfg.base_url.clone(),
            inter_target_delay: cfg.inter_target_delay(),
            probe_timeout: cfg.probe_timeout(),
            download_timeout: cfg.download_timeout(),
            converter,
        }
    }

    /// Resolve the target sequence for a request.
    pub fn plan(&self, request: &CollectionRequest) -> Result<MonthPlan, PlanError> {
        planner::plan(&self.base_url, request.taxi_type, request.start, request.end)
    }

    /// Fail-fast validation of everything that must hold before a run starts.
    /// Submission surfaces these to the caller synchronously.
    pub fn check(&self, request: &CollectionRequest) -> Result<()> {
        anyhow::ensure!(
            request.max_size_bytes > 0,
            "byte ceiling must be greater than zero"
        );
        if let Some(limit) = request.max_files {
            anyhow::ensure!(limit > 0, "file limit must be greater than zero");
        }
        self.plan(request)?;
        Ok(())
    }

    /// Run one collection to a terminal state, invoking `on_progress` after
    /// each processed target.
    ///
    /// Blocking (network and sleeps); dispatch via `spawn_blocking` from
    /// async code.
    pub fn run(
        &self,
        request: &CollectionRequest,
        mut on_progress: impl FnMut(&CollectionProgress),
    ) -> Result<CollectionOutcome> {
        self.check(request)?;
        let plan = self.plan(request)?;
        let targets_total = plan.len();

        std::fs::create_dir_all(&request.output_dir).with_context(|| {
            format!(
                "failed to create output directory {}",
                request.output_dir.display()
            )
        })?;

        let budget = CollectionBudget::new(request.max_size_bytes, request.max_files);
        let mut files: Vec<String> = Vec::new();

        tracing::info!(
            taxi_type = %request.taxi_type,
            start = %request.start,
            months = targets_total,
            ceiling = request.max_size_bytes,
            max_files = ?request.max_files,
            output_dir = %request.output_dir.display(),
            "collection run started"
        );
        let mut state = RunState::Collecting;

        for (index, target) in plan.enumerate() {
            if budget.file_limit_reached() {
                tracing::info!(files = budget.files(), "file limit reached, stopping");
                state = RunState::Stopped;
                break;
            }
            if budget.remaining() == 0 {
                tracing::info!(bytes = budget.collected(), "byte ceiling reached, stopping");
                state = RunState::Stopped;
                break;
            }

            let probed = fetch_head::probe_size(&target.remote_url, self.probe_timeout);
            if probed == 0 {
                // Expected for unpublished future months or retired types.
                tracing::info!(month = %target.month, "remote resource absent, skipping");
                continue;
            }
            if budget.would_exceed(probed) {
                // Skipping ahead to a smaller month would break the
                // contiguous-prefix property of the collected range.
                tracing::info!(
                    month = %target.month,
                    probed,
                    remaining = budget.remaining(),
                    "next file would exceed byte ceiling, stopping"
                );
                state = RunState::Stopped;
                break;
            }

            let mut received: u64 = 0;
            let outcome = pipeline::fetch_and_materialize(
                &target,
                &request.output_dir,
                self.converter.as_ref(),
                self.download_timeout,
                &mut |chunk| received += chunk,
            );
            tracing::debug!(month = %target.month, received, outcome = ?outcome, "target finished");

            if outcome.bytes_retained() > 0 {
                budget.commit(outcome.bytes_retained());
                budget.record_file();
                files.push(target.local_filename.clone());
            }

            let progress = CollectionProgress {
                month: target.month,
                files: budget.files(),
                bytes: budget.collected(),
                targets_done: index + 1,
                targets_total,
            };
            on_progress(&progress);

            if outcome.attempted_transfer() && !self.inter_target_delay.is_zero() {
                std::thread::sleep(self.inter_target_delay);
            }
        }

        if state == RunState::Collecting {
            state = RunState::Completed;
        }
        tracing::info!(
            state = state.as_str(),
            files = budget.files(),
            bytes = budget.collected(),
            "collection run finished"
        );

        Ok(CollectionOutcome {
            state,
            files_count: budget.files(),
            total_bytes: budget.collected(),
            files,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::NoConverter;

    fn engine_for(base_url: &str) -> CollectionEngine {
        let mut cfg = TripdataConfig::default();
        cfg.base_url = base_url.to_string();
        cfg.inter_target_delay_secs = 0.0;
        CollectionEngine::new(&cfg, Arc::new(NoConverter))
    }

    #[test]
    fn check_rejects_zero_ceiling() {
        let engine = engine_for(planner::DEFAULT_BASE_URL);
        let request = CollectionRequest {
            taxi_type: TaxiType::Yellow,
            start: YearMonth::new(2021, 1),
            end: Some(YearMonth::new(2021, 2)),
            max_size_bytes: 0,
            max_files: None,
            output_dir: PathBuf::from("./data"),
        };
        assert!(engine.check(&request).is_err());
    }

    #[test]
    fn check_rejects_inverted_range() {
        let engine = engine_for(planner::DEFAULT_BASE_URL);
        let request = CollectionRequest {
            taxi_type: TaxiType::Yellow,
            start: YearMonth::new(2022, 5),
            end: Some(YearMonth::new(2022, 1)),
            max_size_bytes: 1024,
            max_files: None,
            output_dir: PathBuf::from("./data"),
        };
        let err = engine.check(&request).unwrap_err();
        assert!(err.downcast_ref::<PlanError>().is_some());
    }

    #[test]
    fn progress_percent_is_bounded() {
        let progress = CollectionProgress {
            month: YearMonth::new(2021, 3),
            files: 3,
            bytes: 300,
            targets_done: 3,
            targets_total: 12,
        };
        assert_eq!(progress.percent(), 25);
        let done = CollectionProgress {
            targets_done: 12,
            ..progress.clone()
        };
        assert_eq!(done.percent(), 100);
    }
}
