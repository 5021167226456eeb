//! Configuration management for memcached-gmond.
//!
//! Two layers exist. `PollerConfig` is what the gmond host controls through
//! module parameters (`host`, `port`, `defs`). `Config` is the file format of
//! the standalone binary, which adds the polling interval and timeouts.
//! Files may be YAML, JSON or TOML.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use crate::error::{PollerError, Result};
use crate::every::Interval;
use crate::module::Params;

// Default configuration constants
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 11211;
pub const DEFAULT_DEFS: &str = "./memcached-metrics.json";
pub const DEFAULT_INTERVAL_SECONDS: f64 = 5.0;
pub const DEFAULT_TIMEOUT_MS: u64 = 5000;

/// Connection settings of the stats poller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollerConfig {
    pub host: String,
    pub port: u16,
    /// Path of the metric descriptor file.
    pub defs: PathBuf,
    pub connect_timeout_ms: u64,
    pub io_timeout_ms: u64,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            defs: PathBuf::from(DEFAULT_DEFS),
            connect_timeout_ms: DEFAULT_TIMEOUT_MS,
            io_timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

impl PollerConfig {
    /// Overlays host-supplied parameters. Unknown keys are ignored with a
    /// warning, a port that is not a valid u16 is an error.
    pub fn merge_params(&mut self, params: &Params) -> Result<()> {
        for (key, value) in params {
            match key.as_str() {
                "host" => self.host = value.clone(),
                "port" => {
                    self.port = value.trim().parse().map_err(|_| PollerError::InvalidParam {
                        key: key.clone(),
                        value: value.clone(),
                    })?;
                }
                "defs" => self.defs = PathBuf::from(value),
                other => warn!("Ignoring unknown module parameter '{}'", other),
            }
        }
        Ok(())
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn io_timeout(&self) -> Duration {
        Duration::from_millis(self.io_timeout_ms)
    }

    /// The same settings as host parameters, as passed to `init`.
    pub fn to_params(&self) -> Params {
        Params::from([
            ("host".to_string(), self.host.clone()),
            ("port".to_string(), self.port.to_string()),
            ("defs".to_string(), self.defs.to_string_lossy().to_string()),
        ])
    }
}

/// Configuration format options for output
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum ConfigFormat {
    Yaml,
    Json,
    Toml,
}

fn default_interval() -> Interval {
    Interval::seconds(DEFAULT_INTERVAL_SECONDS)
}

/// Configuration file of the standalone binary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub defs: Option<PathBuf>,

    #[serde(alias = "connect-timeout-ms")]
    pub connect_timeout_ms: Option<u64>,
    #[serde(alias = "io-timeout-ms")]
    pub io_timeout_ms: Option<u64>,

    #[serde(alias = "log-level")]
    pub log_level: Option<String>,

    /// Polling interval of the standalone loop. Kept last so TOML output
    /// places the table after plain values.
    #[serde(default = "default_interval")]
    pub interval: Interval,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: Some(DEFAULT_HOST.to_string()),
            port: Some(DEFAULT_PORT),
            defs: Some(PathBuf::from(DEFAULT_DEFS)),
            connect_timeout_ms: Some(DEFAULT_TIMEOUT_MS),
            io_timeout_ms: Some(DEFAULT_TIMEOUT_MS),
            log_level: Some("info".into()),
            interval: default_interval(),
        }
    }
}

impl Config {
    /// Effective poller settings, falling back to defaults for unset fields.
    pub fn poller_config(&self) -> PollerConfig {
        let defaults = PollerConfig::default();
        PollerConfig {
            host: self.host.clone().unwrap_or(defaults.host),
            port: self.port.unwrap_or(defaults.port),
            defs: self.defs.clone().unwrap_or(defaults.defs),
            connect_timeout_ms: self.connect_timeout_ms.unwrap_or(defaults.connect_timeout_ms),
            io_timeout_ms: self.io_timeout_ms.unwrap_or(defaults.io_timeout_ms),
        }
    }
}

/// Validate effective config (used by --check-config and at startup)
pub fn validate_effective_config(cfg: &Config) -> Result<(), Box<dyn std::error::Error>> {
    if cfg.host.as_deref().is_some_and(|h| h.trim().is_empty()) {
        return Err("host must not be empty".into());
    }
    if cfg.port == Some(0) {
        return Err("port must be between 1 and 65535".into());
    }
    if cfg.connect_timeout_ms == Some(0) || cfg.io_timeout_ms == Some(0) {
        return Err("timeouts must be greater than zero".into());
    }
    if cfg.interval.as_duration().is_zero() {
        return Err("interval must be greater than zero".into());
    }
    if let Some(defs) = &cfg.defs {
        if !defs.exists() {
            return Err(format!("Metric descriptor file not found: {}", defs.display()).into());
        }
    }
    Ok(())
}

/// Configuration loading with multiple format support
pub fn load_config(path: Option<&Path>) -> Result<Config, Box<dyn std::error::Error>> {
    let path = if let Some(p) = path {
        PathBuf::from(p)
    } else {
        // Try default locations
        let defaults = [
            "/etc/memcached-gmond/memcached-gmond.yaml",
            "/etc/memcached-gmond/memcached-gmond.yml",
            "/etc/memcached-gmond/memcached-gmond.json",
            "./memcached-gmond.yaml",
            "./memcached-gmond.yml",
            "./memcached-gmond.json",
        ];

        defaults
            .iter()
            .find(|p| Path::new(p).exists())
            .map(PathBuf::from)
            .unwrap_or_default()
    };

    if path.as_os_str().is_empty() || !path.exists() {
        return Ok(Config::default());
    }

    let content = fs::read_to_string(&path)?;

    match path.extension().and_then(|s| s.to_str()) {
        Some("json") => {
            let config: Config = serde_json::from_str(&content)?;
            info!("Loaded JSON configuration from: {}", path.display());
            Ok(config)
        }
        Some("toml") => {
            let config: Config = toml::from_str(&content)?;
            info!("Loaded TOML configuration from: {}", path.display());
            Ok(config)
        }
        _ => {
            // Default to YAML
            let config: Config = serde_yaml::from_str(&content)?;
            info!("Loaded YAML configuration from: {}", path.display());
            Ok(config)
        }
    }
}

/// Renders configuration in the requested format
pub fn render_config(
    config: &Config,
    format: ConfigFormat,
) -> Result<String, Box<dyn std::error::Error>> {
    let output = match format {
        ConfigFormat::Json => serde_json::to_string_pretty(config)?,
        ConfigFormat::Toml => toml::to_string_pretty(config)?,
        ConfigFormat::Yaml => serde_yaml::to_string(config)?,
    };
    Ok(output)
}
