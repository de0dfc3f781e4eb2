use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::planner;

/// Global configuration loaded from `~/.config/tripdata/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TripdataConfig {
    /// Remote base location for monthly trip data files.
    pub base_url: String,
    /// Default directory collected files land in.
    pub output_dir: PathBuf,
    /// Default byte ceiling per collection run, in gigabytes.
    pub max_size_gb: f64,
    /// Seconds to wait between consecutive remote fetches (load bound on the source).
    pub inter_target_delay_secs: f64,
    /// HEAD probe timeout in seconds.
    pub probe_timeout_secs: u64,
    /// Whole-transfer download timeout in seconds.
    pub download_timeout_secs: u64,
}

impl Default for TripdataConfig {
    fn default() -> Self {
        Self {
            base_url: planner::DEFAULT_BASE_URL.to_string(),
            output_dir: PathBuf::from("./data"),
            max_size_gb: 10.0,
            inter_target_delay_secs: 1.0,
            probe_timeout_secs: 10,
            download_timeout_secs: 3600,
        }
    }
}

impl TripdataConfig {
    /// Default byte ceiling as bytes.
    pub fn max_size_bytes(&self) -> u64 {
        (self.max_size_gb * (1024u64 * 1024 * 1024) as f64) as u64
    }

    pub fn inter_target_delay(&self) -> Duration {
        Duration::from_secs_f64(self.inter_target_delay_secs.max(0.0))
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("tripdata")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<TripdataConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = TripdataConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: TripdataConfig = toml::from_str(&data)?;
    Ok(cfg)
}
