use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::client::{Timeouts, DEFAULT_ENDPOINT};
use crate::retry::{RetryPolicy, DEFAULT_RETRY};

/// Retry policy parameters (optional `[retry]` section in config.toml).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Give up retrying after this many seconds.
    pub deadline_secs: f64,
    /// First backoff delay in seconds.
    pub initial_delay_secs: f64,
    /// Maximum backoff delay in seconds.
    pub max_delay_secs: f64,
    /// Growth factor between delays.
    pub multiplier: f32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            deadline_secs: DEFAULT_RETRY.deadline().as_secs_f64(),
            initial_delay_secs: DEFAULT_RETRY.initial_delay().as_secs_f64(),
            max_delay_secs: DEFAULT_RETRY.max_delay().as_secs_f64(),
            multiplier: DEFAULT_RETRY.multiplier(),
        }
    }
}

fn secs(value: f64) -> Duration {
    Duration::try_from_secs_f64(value.max(0.0)).unwrap_or(Duration::MAX)
}

impl RetryConfig {
    /// Policy derived from [`DEFAULT_RETRY`] with these parameters.
    pub fn to_policy(&self) -> RetryPolicy {
        DEFAULT_RETRY
            .with_deadline(secs(self.deadline_secs))
            .with_delay(
                secs(self.initial_delay_secs),
                secs(self.max_delay_secs),
                self.multiplier,
            )
    }
}

/// Global configuration loaded from `~/.config/bqr/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BqrConfig {
    /// Project used for dataset ids given without one.
    #[serde(default)]
    pub project: Option<String>,
    /// REST endpoint, e.g. an emulator URL for local testing.
    pub endpoint: String,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    /// Optional retry policy; if missing, built-in defaults are used.
    #[serde(default)]
    pub retry: Option<RetryConfig>,
}

impl Default for BqrConfig {
    fn default() -> Self {
        let timeouts = Timeouts::default();
        Self {
            project: None,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            connect_timeout_secs: timeouts.connect.as_secs(),
            request_timeout_secs: timeouts.request.as_secs(),
            retry: None,
        }
    }
}

impl BqrConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
            .as_ref()
            .map(RetryConfig::to_policy)
            .unwrap_or(DEFAULT_RETRY)
    }

    pub fn timeouts(&self) -> Timeouts {
        Timeouts {
            connect: Duration::from_secs(self.connect_timeout_secs),
            request: Duration::from_secs(self.request_timeout_secs),
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("bqr")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from `path`, creating a default file if none exists.
pub fn load_or_init_at(path: &Path) -> Result<BqrConfig> {
    if !path.exists() {
        let default_cfg = BqrConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(path)?;
    let cfg: BqrConfig =
        toml::from_str(&data).with_context(|| format!("invalid config {}", path.display()))?;
    Ok(cfg)
}

/// Load configuration from the XDG config dir, creating a default file if none exists.
pub fn load_or_init() -> Result<BqrConfig> {
    load_or_init_at(&config_path()?)
}
