//! Engine settings loaded from a TOML file and `DASHSYNC_*` environment
//! variables.
//!
//! Nested keys use a double underscore in the environment, for example
//! `DASHSYNC_INTERVALS__HIGH_MS=2000`.

use std::path::Path;
use std::time::Duration;

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::frequency::{FrequencyTable, PollMode};

/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "DASHSYNC";

/// Errors from loading or validating [`SyncConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Poll intervals per mode, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntervalConfig {
    pub high_ms: u64,
    pub normal_ms: u64,
    pub low_ms: u64,
}

impl Default for IntervalConfig {
    fn default() -> Self {
        let table = FrequencyTable::default();
        Self {
            high_ms: table.high.as_millis() as u64,
            normal_ms: table.normal.as_millis() as u64,
            low_ms: table.low.as_millis() as u64,
        }
    }
}

/// Everything needed to build a polling [`Dashboard`](crate::Dashboard).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Root of the welfare-program API, e.g. `https://api.example.org`.
    pub base_url: String,
    pub stats_path: String,
    pub request_timeout_secs: u64,
    pub freshness_window_secs: u64,
    pub mode: PollMode,
    pub intervals: IntervalConfig,
    #[serde(skip_serializing)]
    pub bearer_token: Option<String>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            stats_path: "/dashboard/stats".to_string(),
            request_timeout_secs: 10,
            freshness_window_secs: 120,
            mode: PollMode::Normal,
            intervals: IntervalConfig::default(),
            bearer_token: None,
        }
    }
}

impl SyncConfig {
    /// Load from an optional TOML file, then apply `DASHSYNC_*` overrides.
    ///
    /// The result is validated before it is returned.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with(path, environment(), None)
    }

    /// Like [`SyncConfig::load`], with a base URL that beats both file and
    /// environment.
    pub fn load_with_base_url(path: Option<&Path>, base_url: &str) -> Result<Self, ConfigError> {
        Self::load_with(path, environment(), Some(base_url))
    }

    fn load_with(
        path: Option<&Path>,
        env: Environment,
        base_url: Option<&str>,
    ) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }
        let config = builder
            .add_source(env)
            .set_override_option("base_url", base_url)?
            .build()?;

        let loaded: SyncConfig = config.try_deserialize()?;
        loaded.validate()?;
        Ok(loaded)
    }

    /// Reject settings the engine cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid(format!(
                "base_url is required (set {ENV_PREFIX}_BASE_URL)"
            )));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid("request_timeout_secs must be > 0".into()));
        }
        if self.freshness_window_secs == 0 {
            return Err(ConfigError::Invalid("freshness_window_secs must be > 0".into()));
        }
        for (name, value) in [
            ("high_ms", self.intervals.high_ms),
            ("normal_ms", self.intervals.normal_ms),
            ("low_ms", self.intervals.low_ms),
        ] {
            if value == 0 {
                return Err(ConfigError::Invalid(format!("intervals.{name} must be > 0")));
            }
        }
        Ok(())
    }

    pub fn frequency_table(&self) -> FrequencyTable {
        FrequencyTable {
            high: Duration::from_millis(self.intervals.high_ms),
            normal: Duration::from_millis(self.intervals.normal_ms),
            low: Duration::from_millis(self.intervals.low_ms),
        }
    }

    pub fn freshness_window(&self) -> Duration {
        Duration::from_secs(self.freshness_window_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Build the HTTP fetcher described by this config.
    ///
    /// Without a `bearer_token` every fetch fails as unauthorized without
    /// touching the network.
    #[cfg(feature = "http")]
    pub fn http_source(
        &self,
    ) -> Result<dashsync_adapters::http::HttpStatsSource, dashsync_adapters::FetchError> {
        use dashsync_adapters::{NoToken, StaticToken};

        let builder = dashsync_adapters::http::HttpStatsSource::builder()
            .base_url(&self.base_url)
            .path(&self.stats_path)
            .timeout(self.request_timeout());

        match &self.bearer_token {
            Some(token) => builder.token(StaticToken::new(token.clone())),
            None => builder.token(NoToken),
        }
        .build()
    }
}

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}
