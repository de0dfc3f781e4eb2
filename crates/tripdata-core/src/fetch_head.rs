//! HTTP HEAD probing for remote resource size.
//!
//! A missing or unreachable month is a routine signal (future months are not
//! published yet, some types stop being published), so the probe never
//! surfaces an error: any failure reads as "0 bytes available".

use anyhow::{Context, Result};
use std::str;
use std::time::Duration;

/// Remote size in bytes for `url`, or 0 when the resource is absent, the
/// probe fails, or no `Content-Length` is sent.
///
/// Runs in the current thread; call from `spawn_blocking` if used from async code.
pub fn probe_size(url: &str, timeout: Duration) -> u64 {
    match head_content_length(url, timeout) {
        Ok(Some(size)) => size,
        Ok(None) => {
            tracing::debug!(url, "probe returned no content length");
            0
        }
        Err(err) => {
            tracing::debug!(url, error = %err, "probe failed, treating resource as absent");
            0
        }
    }
}

fn head_content_length(url: &str, timeout: Duration) -> Result<Option<u64>> {
    let mut headers: Vec<String> = Vec::new();

    let mut easy = curl::easy::Easy::new();
    easy.url(url).context("invalid URL")?;
    easy.nobody(true)?; // HEAD request
    easy.follow_location(true)?;
    easy.connect_timeout(Duration::from_secs(15))?;
    easy.timeout(timeout)?;

    {
        let mut transfer = easy.transfer();
        transfer.header_function(|data| {
            if let Ok(s) = str::from_utf8(data) {
                headers.push(s.trim_end().to_string());
            }
            true
        })?;
        transfer.perform().context("HEAD request failed")?;
    }

    let code = easy.response_code().context("no response code")?;
    if !(200..300).contains(&code) {
        anyhow::bail!("HEAD {} returned HTTP {}", url, code);
    }

    Ok(parse_content_length(&headers))
}

/// Parse collected header lines for a `Content-Length` value.
pub(crate) fn parse_content_length(lines: &[String]) -> Option<u64> {
    for line in lines {
        let line = line.trim();
        if let Some((name, value)) = line.split_once(':') {
            if name.trim().eq_ignore_ascii_case("content-length") {
                if let Ok(n) = value.trim().parse::<u64>() {
                    return Some(n);
                }
            }
        }
    }
    None
}
