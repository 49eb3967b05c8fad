//! Collector configuration.
//!
//! Read from TOML into `*Input` structs where every key is optional, then
//! resolved into the typed [`Config`] with defaults applied and durations
//! converted.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::sink::RetryPolicy;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ── Input (as written in the file) ──────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ConfigInput {
    pub nr5103: ModemConfigInput,
    pub influxdb: InfluxConfigInput,
    pub collector: CollectorConfigInput,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ModemConfigInput {
    pub url: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub verify_tls: Option<bool>,
    pub timeout_ms: Option<u64>,
    pub status_retries: Option<u32>,
    pub cookie_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct InfluxConfigInput {
    pub url: Option<String>,
    pub token: Option<String>,
    pub org: Option<String>,
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CollectorConfigInput {
    pub interval_ms: Option<u64>,
    pub bucket: Option<String>,
    pub ping_host: Option<String>,
    pub ping_timeout_s: Option<u64>,
    pub influxdb_retry_interval_ms: Option<u64>,
    pub influxdb_max_retries: Option<u32>,
    pub influxdb_max_retry_delay_ms: Option<u64>,
    pub influxdb_max_retry_time_ms: Option<u64>,
    pub influxdb_exponential_base: Option<u32>,
}

// ── Resolved ────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ModemConfig {
    pub url: String,
    pub username: String,
    pub password: String,
    /// The modem ships a self-signed certificate, so this defaults to off.
    pub verify_tls: bool,
    pub timeout: Duration,
    pub status_retries: u32,
    pub cookie_file: Option<PathBuf>,
}

impl Default for ModemConfig {
    fn default() -> Self {
        Self {
            url: "https://192.168.1.1".into(),
            username: "admin".into(),
            password: String::new(),
            verify_tls: false,
            timeout: Duration::from_secs(10),
            status_retries: 1,
            cookie_file: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct InfluxConfig {
    pub url: String,
    pub token: String,
    pub org: String,
    pub bucket: String,
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for InfluxConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8086".into(),
            token: String::new(),
            org: String::new(),
            bucket: "nr5103".into(),
            timeout: Duration::from_secs(10),
            retry: RetryPolicy::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CollectorConfig {
    pub interval: Duration,
    /// `None` disables the latency probe.
    pub ping_host: Option<String>,
    pub ping_timeout: Duration,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            ping_host: Some("8.8.8.8".into()),
            ping_timeout: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub modem: ModemConfig,
    pub influxdb: InfluxConfig,
    pub collector: CollectorConfig,
}

/// Command-line / environment values that win over the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub modem_url: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub influxdb_url: Option<String>,
    pub influxdb_token: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let trimmed = v.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

impl ConfigInput {
    pub fn resolve(self) -> Result<Config, ConfigError> {
        let modem_defaults = ModemConfig::default();
        let modem = ModemConfig {
            url: non_empty(self.nr5103.url)
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or(modem_defaults.url),
            username: non_empty(self.nr5103.username).unwrap_or(modem_defaults.username),
            password: self.nr5103.password.unwrap_or_default(),
            verify_tls: self.nr5103.verify_tls.unwrap_or(modem_defaults.verify_tls),
            timeout: self
                .nr5103
                .timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(modem_defaults.timeout),
            status_retries: self
                .nr5103
                .status_retries
                .unwrap_or(modem_defaults.status_retries)
                .max(1),
            cookie_file: self.nr5103.cookie_file,
        };

        let collector_defaults = CollectorConfig::default();
        let interval = self
            .collector
            .interval_ms
            .map(Duration::from_millis)
            .unwrap_or(collector_defaults.interval);
        if interval.is_zero() {
            return Err(ConfigError::Invalid("collector.interval_ms must be > 0".into()));
        }

        let ping_host = match self.collector.ping_host {
            // An explicit empty string turns the probe off.
            Some(host) => non_empty(Some(host)),
            None => collector_defaults.ping_host,
        };

        let collector = CollectorConfig {
            interval,
            ping_host,
            ping_timeout: self
                .collector
                .ping_timeout_s
                .map(Duration::from_secs)
                .unwrap_or(collector_defaults.ping_timeout)
                .max(Duration::from_secs(1)),
        };

        // Retries start at the poll interval unless configured otherwise.
        let retry_defaults = RetryPolicy::default();
        let exponential_base = self
            .collector
            .influxdb_exponential_base
            .unwrap_or(retry_defaults.exponential_base);
        if exponential_base < 1 {
            return Err(ConfigError::Invalid(
                "collector.influxdb_exponential_base must be >= 1".into(),
            ));
        }
        let retry = RetryPolicy {
            interval: self
                .collector
                .influxdb_retry_interval_ms
                .map(Duration::from_millis)
                .unwrap_or(interval),
            max_retries: self
                .collector
                .influxdb_max_retries
                .unwrap_or(retry_defaults.max_retries),
            max_delay: self
                .collector
                .influxdb_max_retry_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(retry_defaults.max_delay),
            max_time: self
                .collector
                .influxdb_max_retry_time_ms
                .map(Duration::from_millis)
                .unwrap_or(retry_defaults.max_time),
            exponential_base,
        };

        let influx_defaults = InfluxConfig::default();
        let influxdb = InfluxConfig {
            url: non_empty(self.influxdb.url)
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or(influx_defaults.url),
            token: self.influxdb.token.unwrap_or_default(),
            org: self.influxdb.org.unwrap_or_default(),
            bucket: non_empty(self.collector.bucket).unwrap_or(influx_defaults.bucket),
            timeout: self
                .influxdb
                .timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(influx_defaults.timeout),
            retry,
        };

        Ok(Config {
            modem,
            influxdb,
            collector,
        })
    }
}

impl Config {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        if input.trim().is_empty() {
            return ConfigInput::default().resolve();
        }
        let parsed: ConfigInput = toml::from_str(input)?;
        parsed.resolve()
    }

    /// Load from `path`, or the built-in defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return ConfigInput::default().resolve();
        };
        let input = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&input)
    }

    pub fn apply_overrides(&mut self, overrides: Overrides) {
        if let Some(url) = non_empty(overrides.modem_url) {
            self.modem.url = url.trim_end_matches('/').to_string();
        }
        if let Some(username) = non_empty(overrides.username) {
            self.modem.username = username;
        }
        if let Some(password) = overrides.password {
            self.modem.password = password;
        }
        if let Some(url) = non_empty(overrides.influxdb_url) {
            self.influxdb.url = url.trim_end_matches('/').to_string();
        }
        if let Some(token) = overrides.influxdb_token {
            self.influxdb.token = token;
        }
    }
}
