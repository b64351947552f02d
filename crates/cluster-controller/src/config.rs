//! # Cluster Controller Configuration
//!
//! Unified configuration for the subsystems and runtime parameters.
//!
//! Values come from an optional JSON file (path in `CC_CONFIG`) and are then
//! overridden by environment variables. Durations are written as `"5s"`,
//! `"500ms"` or `"2m"`.

use serde::{Deserialize, Serialize};
use shared_types::TrustLevel;
use std::path::Path;
use std::time::Duration;

/// Environment variable naming the JSON configuration file.
pub const CONFIG_PATH_ENV: &str = "CC_CONFIG";

/// Complete cluster controller configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterControllerConfig {
    /// Message routing configuration.
    pub routing: RoutingConfig,
    /// Dispatcher configuration.
    pub dispatcher: DispatcherConfig,
    /// Access control configuration.
    pub access_control: AccessControlConfig,
    /// Client cache configuration.
    pub cache: CacheConfig,
    /// Logging configuration.
    pub logging: LoggingConfig,
}

impl ClusterControllerConfig {
    /// Load from the file named by `CC_CONFIG` (defaults if unset), then
    /// apply environment overrides and validate.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) => Self::from_file(Path::new(&path))?,
            Err(_) => Self::default(),
        };
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(raw).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Override fields from `CC_LOG_LEVEL`, `CC_WORKER_COUNT`, `CC_JSON_LOGS`
    /// and `CC_ACCESS_CONTROL`. Unparseable values are ignored.
    pub fn apply_env_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(level) = var("CC_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(count) = var("CC_WORKER_COUNT").and_then(|v| v.parse().ok()) {
            self.dispatcher.worker_count = count;
        }
        if let Some(json) = var("CC_JSON_LOGS") {
            self.logging.json = parse_flag(&json);
        }
        if let Some(enabled) = var("CC_ACCESS_CONTROL") {
            self.access_control.enabled = parse_flag(&enabled);
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.dispatcher.worker_count == 0 {
            return Err(ConfigError::InvalidLimit(
                "dispatcher.worker_count cannot be 0".into(),
            ));
        }
        if self.dispatcher.queue_capacity == 0 {
            return Err(ConfigError::InvalidLimit(
                "dispatcher.queue_capacity cannot be 0".into(),
            ));
        }
        if self.cache.client_cache_capacity == 0 {
            return Err(ConfigError::InvalidLimit(
                "cache.client_cache_capacity cannot be 0".into(),
            ));
        }
        if self.routing.queue_sweep_interval.is_zero() {
            return Err(ConfigError::InvalidInterval(
                "routing.queue_sweep_interval cannot be 0".into(),
            ));
        }
        if self.dispatcher.correlation_sweep_interval.is_zero() {
            return Err(ConfigError::InvalidInterval(
                "dispatcher.correlation_sweep_interval cannot be 0".into(),
            ));
        }
        Ok(())
    }
}

fn parse_flag(value: &str) -> bool {
    value.eq_ignore_ascii_case("true") || value == "1"
}

/// Message routing configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// How often decayed queued messages are dropped.
    #[serde(with = "duration_serde")]
    pub queue_sweep_interval: Duration,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            queue_sweep_interval: Duration::from_secs(5),
        }
    }
}

/// Dispatcher configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    /// Worker tasks draining the dispatch queue.
    pub worker_count: usize,
    /// Envelopes buffered before ingress waits.
    pub queue_capacity: usize,
    /// How often unanswered requests and stale subscriptions are failed.
    #[serde(with = "duration_serde")]
    pub correlation_sweep_interval: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            worker_count: 4,
            queue_capacity: 1024,
            correlation_sweep_interval: Duration::from_secs(5),
        }
    }
}

/// Access control configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessControlConfig {
    /// Gate provider calls on consumer permission.
    pub enabled: bool,
    /// Trust level assumed for local consumers.
    pub trust_level: TrustLevel,
}

impl Default for AccessControlConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            trust_level: TrustLevel::High,
        }
    }
}

/// Client cache configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of cached attribute values.
    pub client_cache_capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            client_cache_capacity: 1000,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset.
    pub level: String,
    /// JSON output for containers.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file could not be read
    #[error("cannot read config file {path}: {reason}")]
    Read { path: String, reason: String },
    /// The configuration file is not valid JSON for this schema
    #[error("invalid config file: {0}")]
    Parse(String),
    /// Invalid size or count limit
    #[error("invalid limit: {0}")]
    InvalidLimit(String),
    /// Invalid interval
    #[error("invalid interval: {0}")]
    InvalidInterval(String),
}

/// Duration serialization as `"<n>s"`, `"<n>ms"` or `"<n>m"`.
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if duration.subsec_millis() == 0 {
            serializer.serialize_str(&format!("{}s", duration.as_secs()))
        } else {
            serializer.serialize_str(&format!("{}ms", duration.as_millis()))
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse_duration(&s).map_err(serde::de::Error::custom)
    }

    pub(super) fn parse_duration(s: &str) -> Result<Duration, &'static str> {
        let s = s.trim();
        if let Some(ms) = s.strip_suffix("ms") {
            ms.trim()
                .parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|_| "invalid milliseconds")
        } else if let Some(secs) = s.strip_suffix('s') {
            secs.trim()
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| "invalid seconds")
        } else if let Some(mins) = s.strip_suffix('m') {
            mins.trim()
                .parse::<u64>()
                .map(|m| Duration::from_secs(m * 60))
                .map_err(|_| "invalid minutes")
        } else {
            // Plain number means seconds
            s.parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| "invalid duration format")
        }
    }
}
