//! Local file lifecycle: temp naming and atomic finalize.
//!
//! Downloads and conversion outputs are written under a `.part` name and
//! renamed into place on completion, so a canonical file is never visible
//! half-written under its final name.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Temporary file suffix used before atomic rename.
pub const TEMP_SUFFIX: &str = ".part";

/// Path for the temp file: appends `.part` to the final path
/// (e.g. `yellow_tripdata_2021-11.csv` → `yellow_tripdata_2021-11.csv.part`).
pub fn temp_path(final_path: &Path) -> PathBuf {
    let mut o = final_path.as_os_str().to_owned();
    o.push(TEMP_SUFFIX);
    PathBuf::from(o)
}

/// Atomically rename a completed temp file to its final name.
/// Fails if `final_path` is on a different filesystem.
pub fn finalize(temp_path: &Path, final_path: &Path) -> Result<()> {
    std::fs::rename(temp_path, final_path).with_context(|| {
        format!(
            "failed to rename {} to {}",
            temp_path.display(),
            final_path.display()
        )
    })
}

/// Best-effort removal of a leftover file. Missing files are fine; anything
/// else is logged and swallowed so cleanup never masks the original failure.
pub fn remove_if_exists(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => {}
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => tracing::warn!(path = %path.display(), error = %err, "cleanup failed"),
    }
}
