//! Fetch-and-materialize pipeline for one collection target.
//!
//! skip check → download to a `.part` path → optional conversion → retained
//! byte count. Transport and conversion failures are routine outcomes here,
//! not errors; the collection engine logs them and moves on. Size probing
//! lives in `fetch_head` and runs before the budget gate, in the engine.

use std::path::Path;
use std::time::Duration;

use crate::convert::ColumnarConverter;
use crate::downloader;
use crate::planner::CollectionTarget;
use crate::storage;

/// What the pipeline produced for one target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetOutcome {
    /// Canonical file was already on disk; its size counts as retained.
    AlreadyPresent(u64),
    /// Fresh download (and conversion when required) succeeded.
    Downloaded(u64),
    /// Nothing usable was produced for this target.
    Unusable,
}

impl TargetOutcome {
    pub fn bytes_retained(self) -> u64 {
        match self {
            TargetOutcome::AlreadyPresent(n) | TargetOutcome::Downloaded(n) => n,
            TargetOutcome::Unusable => 0,
        }
    }

    /// True when the target hit the network (drives the inter-target delay).
    pub fn attempted_transfer(self) -> bool {
        !matches!(self, TargetOutcome::AlreadyPresent(_))
    }
}

/// Materialize one target into `output_dir`.
///
/// On success exactly one canonical file exists for the target; on failure
/// no partial file is left under the canonical name and intermediates are
/// removed.
pub fn fetch_and_materialize(
    target: &CollectionTarget,
    output_dir: &Path,
    converter: &dyn ColumnarConverter,
    download_timeout: Duration,
    on_bytes: &mut dyn FnMut(u64),
) -> TargetOutcome {
    let canonical = output_dir.join(&target.local_filename);

    // Resumption: an earlier run already materialized this month.
    if let Ok(meta) = std::fs::metadata(&canonical) {
        tracing::info!(
            file = %target.local_filename,
            bytes = meta.len(),
            "already collected, skipping download"
        );
        return TargetOutcome::AlreadyPresent(meta.len());
    }

    let download_path = output_dir.join(&target.download_filename);
    let temp = storage::temp_path(&download_path);
    tracing::info!(url = %target.remote_url, dest = %download_path.display(), "downloading");

    let downloaded = match downloader::download_to(&target.remote_url, &temp, download_timeout, on_bytes)
    {
        Ok(n) => n,
        Err(err) => {
            tracing::warn!(url = %target.remote_url, error = %err, "download failed");
            storage::remove_if_exists(&temp);
            return TargetOutcome::Unusable;
        }
    };

    if !target.source_format.needs_conversion() {
        if let Err(err) = storage::finalize(&temp, &canonical) {
            tracing::warn!(error = %err, "finalize failed");
            storage::remove_if_exists(&temp);
            return TargetOutcome::Unusable;
        }
        return TargetOutcome::Downloaded(downloaded);
    }

    // Columnar month: land the download under its own name, convert into a
    // fresh temp, promote it, then drop the intermediate.
    if let Err(err) = storage::finalize(&temp, &download_path) {
        tracing::warn!(error = %err, "finalize failed");
        storage::remove_if_exists(&temp);
        return TargetOutcome::Unusable;
    }
    let converted_temp = storage::temp_path(&canonical);
    if let Err(err) = converter.convert(&download_path, &converted_temp) {
        tracing::warn!(
            file = %target.download_filename,
            error = %err,
            "conversion failed, discarding download"
        );
        storage::remove_if_exists(&converted_temp);
        storage::remove_if_exists(&download_path);
        return TargetOutcome::Unusable;
    }
    if let Err(err) = storage::finalize(&converted_temp, &canonical) {
        tracing::warn!(error = %err, "finalize failed");
        storage::remove_if_exists(&converted_temp);
        storage::remove_if_exists(&download_path);
        return TargetOutcome::Unusable;
    }
    storage::remove_if_exists(&download_path);

    match std::fs::metadata(&canonical) {
        Ok(meta) => TargetOutcome::Downloaded(meta.len()),
        Err(_) => TargetOutcome::Downloaded(downloaded),
    }
}
