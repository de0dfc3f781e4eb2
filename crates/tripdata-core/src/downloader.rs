//! Single-stream HTTP GET downloader.
//!
//! Streams the response body sequentially into a local file, reporting
//! incremental bytes to a caller-supplied callback. Whole-file fetches only;
//! the caller owns cleanup of the destination on failure.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::time::Duration;

/// Downloads `url` with a single GET, writing the body to `dest`.
/// Returns the number of bytes written. `on_bytes` is invoked with each
/// received chunk's size.
///
/// Runs in the current thread; call from `spawn_blocking` if used from async code.
pub fn download_to(
    url: &str,
    dest: &Path,
    timeout: Duration,
    on_bytes: &mut dyn FnMut(u64),
) -> Result<u64> {
    let mut file = File::create(dest)
        .with_context(|| format!("failed to create {}", dest.display()))?;
    let mut written: u64 = 0;
    let mut write_error: Option<std::io::Error> = None;

    let mut easy = curl::easy::Easy::new();
    easy.url(url).context("invalid URL")?;
    easy.follow_location(true)?;
    easy.max_redirections(10)?;
    easy.connect_timeout(Duration::from_secs(15))?;
    easy.low_speed_limit(1024)?;
    easy.low_speed_time(Duration::from_secs(60))?;
    easy.timeout(timeout)?;

    let perform_result = {
        let mut transfer = easy.transfer();
        transfer.write_function(|data| {
            if let Err(err) = file.write_all(data) {
                write_error = Some(err);
                return Ok(0); // abort transfer
            }
            written += data.len() as u64;
            on_bytes(data.len() as u64);
            Ok(data.len())
        })?;
        transfer.perform()
    };

    if let Some(err) = write_error {
        return Err(err).with_context(|| format!("failed to write {}", dest.display()));
    }
    perform_result.context("GET request failed")?;

    let code = easy.response_code().context("no response code")?;
    if !(200..300).contains(&code) {
        anyhow::bail!("GET {} returned HTTP {}", url, code);
    }

    file.flush().context("flush failed")?;
    Ok(written)
}
