use config::{Config as ConfigBuilder, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use spectate_client::endpoints::{DEFAULT_HOST, DEFAULT_PLATFORM};

use crate::resilience::RetryPolicy;

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub spectator: SpectatorConfig,
    pub polling: PollingConfig,
    pub retrieval: RetrievalConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpectatorConfig {
    pub host: String,
    pub platform: String,
    pub request_timeout_seconds: u64,
    pub user_agent: String,
}

impl Default for SpectatorConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            platform: DEFAULT_PLATFORM.to_string(),
            request_timeout_seconds: 30,
            user_agent: concat!("spectate/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl SpectatorConfig {
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

/// Last-chunk-info polling
///
/// The backoff and failure ceiling also bound discovery and metadata retries.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    pub min_interval_ms: u64,
    pub max_interval_ms: u64,
    pub max_consecutive_failures: u32,
    pub backoff_min_ms: u64,
    pub backoff_max_ms: u64,
    /// Most ids of each kind revealed by one tick; a larger jump is
    /// revealed over several ticks
    pub max_reveal_per_tick: u32,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            min_interval_ms: 500,
            max_interval_ms: 30_000,
            max_consecutive_failures: 5,
            backoff_min_ms: 500,
            backoff_max_ms: 30_000,
            max_reveal_per_tick: 256,
        }
    }
}

impl PollingConfig {
    #[must_use]
    pub const fn min_interval(&self) -> Duration {
        Duration::from_millis(self.min_interval_ms)
    }

    #[must_use]
    pub const fn max_interval(&self) -> Duration {
        Duration::from_millis(self.max_interval_ms)
    }

    #[must_use]
    pub const fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            min_delay: Duration::from_millis(self.backoff_min_ms),
            max_delay: Duration::from_millis(self.backoff_max_ms),
            max_times: self.max_consecutive_failures as usize,
        }
    }
}

/// What to do with an id that could not be retrieved
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingChunkPolicy {
    /// Report a gap and keep delivering later ids
    #[default]
    Skip,
    /// End the session; ordering cannot continue past the hole
    Abort,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub workers: usize,
    pub max_retries: u32,
    pub backoff_min_ms: u64,
    pub backoff_max_ms: u64,
    /// Poll ticks a not-yet-available id may wait before it counts as missing
    pub max_deferrals: u32,
    pub missing_chunk_policy: MissingChunkPolicy,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            max_retries: 3,
            backoff_min_ms: 200,
            backoff_max_ms: 5_000,
            max_deferrals: 8,
            missing_chunk_policy: MissingChunkPolicy::Skip,
        }
    }
}

impl RetrievalConfig {
    #[must_use]
    pub const fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            min_delay: Duration::from_millis(self.backoff_min_ms),
            max_delay: Duration::from_millis(self.backoff_max_ms),
            max_times: self.max_retries as usize,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String, // "json" or "pretty"
    pub file_path: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            file_path: None,
        }
    }
}

impl Config {
    /// Load configuration from an optional file, then environment overrides
    pub fn load(config_file: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = ConfigBuilder::builder();

        if let Some(path) = config_file {
            if Path::new(path).exists() {
                builder = builder.add_source(File::with_name(path));
            }
        }

        // SPECTATE_SPECTATOR__PLATFORM, SPECTATE_RETRIEVAL__WORKERS, ...
        builder = builder.add_source(
            Environment::with_prefix("SPECTATE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Load from environment variables only
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(None)
    }

    /// Load from file path
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        Self::load(Some(path))
    }

    /// Check for settings that would make a session misbehave
    ///
    /// Returns every problem found rather than stopping at the first.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if !(self.spectator.host.starts_with("http://") || self.spectator.host.starts_with("https://")) {
            errors.push(format!(
                "spectator.host must be an http(s) URL, got '{}'",
                self.spectator.host
            ));
        }
        if self.spectator.platform.trim().is_empty() {
            errors.push("spectator.platform must not be empty".to_string());
        }
        if self.spectator.request_timeout_seconds == 0 {
            errors.push("spectator.request_timeout_seconds must be > 0".to_string());
        }

        if self.polling.min_interval_ms == 0 {
            errors.push("polling.min_interval_ms must be > 0".to_string());
        }
        if self.polling.min_interval_ms > self.polling.max_interval_ms {
            errors.push(format!(
                "polling.min_interval_ms ({}) exceeds polling.max_interval_ms ({})",
                self.polling.min_interval_ms, self.polling.max_interval_ms
            ));
        }
        if self.polling.backoff_min_ms > self.polling.backoff_max_ms {
            errors.push("polling.backoff_min_ms exceeds polling.backoff_max_ms".to_string());
        }
        if self.polling.max_reveal_per_tick == 0 {
            errors.push("polling.max_reveal_per_tick must be at least 1".to_string());
        }

        if self.retrieval.workers == 0 {
            errors.push("retrieval.workers must be at least 1".to_string());
        }
        if self.retrieval.backoff_min_ms > self.retrieval.backoff_max_ms {
            errors.push("retrieval.backoff_min_ms exceeds retrieval.backoff_max_ms".to_string());
        }

        if !matches!(self.logging.format.as_str(), "json" | "pretty") {
            errors.push(format!(
                "logging.format must be 'json' or 'pretty', got '{}'",
                self.logging.format
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
