//! Process-wide configuration surface (`spec.md` §6).
//!
//! A closed struct with explicit defaults, not a dynamic map, per `spec.md`
//! §9's "replacing dynamic configuration objects" design note. `Config` is a
//! process-level singleton assembled once at startup (`from_env`); nothing
//! downstream reaches for the environment directly.

use std::env;
use std::time::Duration;

use thiserror::Error;

/// Failure constructing a [`Config`] from the process environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// `SECRET_KEY` was absent while at least one connector is configured.
    #[error("SECRET_KEY is required when connectors are configured")]
    MissingSecretKey,

    /// A numeric environment variable failed to parse.
    #[error("{var}: invalid value {value:?}")]
    InvalidValue { var: &'static str, value: String },
}

/// Reconnect exponential-backoff shape (`spec.md` §6).
#[derive(Debug, Clone, Copy)]
pub struct ReconnectConfig {
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
    pub jitter: f64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(30_000),
            max_delay: Duration::from_millis(600_000),
            multiplier: 2.0,
            jitter: 0.25,
        }
    }
}

/// Sync-failure-driven health thresholds (`spec.md` §4.G, §6).
#[derive(Debug, Clone, Copy)]
pub struct SyncHealthConfig {
    pub degraded_threshold: u32,
    pub unhealthy_threshold: u32,
}

impl Default for SyncHealthConfig {
    fn default() -> Self {
        Self {
            degraded_threshold: 2,
            unhealthy_threshold: 5,
        }
    }
}

/// Per-sync-attempt retry shape (`spec.md` §6).
#[derive(Debug, Clone, Copy)]
pub struct SyncRetryConfig {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
}

impl Default for SyncRetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(30),
            max_delay: Duration::from_secs(300),
            multiplier: 2.0,
        }
    }
}

/// Batching thresholds (`spec.md` §4.E, §6).
#[derive(Debug, Clone, Copy)]
pub struct BatchingConfig {
    pub max_episodes_per_search: u32,
    pub max_movies_per_search: u32,
    pub season_search_min_missing_percent: u32,
    pub season_search_min_missing_count: u32,
}

impl Default for BatchingConfig {
    fn default() -> Self {
        Self {
            max_episodes_per_search: 10,
            max_movies_per_search: 10,
            season_search_min_missing_percent: 50,
            season_search_min_missing_count: 3,
        }
    }
}

/// Process-wide configuration (`spec.md` §6 table).
#[derive(Debug, Clone)]
pub struct Config {
    /// 32-byte key (hex or base64) used by the credential collaborator to
    /// decrypt API keys. `None` is fatal at startup only when a connector is
    /// configured; this crate doesn't own that check (it doesn't know the
    /// connector count), so `from_env` takes it as a parameter.
    pub secret_key: Option<String>,
    pub reconnect: ReconnectConfig,
    pub sync_health: SyncHealthConfig,
    pub sync_retry: SyncRetryConfig,
    pub batching: BatchingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            secret_key: None,
            reconnect: ReconnectConfig::default(),
            sync_health: SyncHealthConfig::default(),
            sync_retry: SyncRetryConfig::default(),
            batching: BatchingConfig::default(),
        }
    }
}

impl Config {
    /// Loads configuration from the process environment, falling back to
    /// documented defaults for anything unset.
    ///
    /// # Errors
    /// Returns [`ConfigError::MissingSecretKey`] when `active_connector_count > 0`
    /// and `SECRET_KEY` is unset, and [`ConfigError::InvalidValue`] when a
    /// numeric variable is present but unparsable.
    pub fn from_env(active_connector_count: usize) -> Result<Self, ConfigError> {
        let secret_key = env::var("SECRET_KEY").ok();
        if secret_key.is_none() && active_connector_count > 0 {
            return Err(ConfigError::MissingSecretKey);
        }

        let mut cfg = Self {
            secret_key,
            ..Self::default()
        };

        if let Some(v) = env_u64("RECONNECT_BASE_DELAY_MS")? {
            cfg.reconnect.base_delay = Duration::from_millis(v);
        }
        if let Some(v) = env_u64("RECONNECT_MAX_DELAY_MS")? {
            cfg.reconnect.max_delay = Duration::from_millis(v);
        }
        if let Some(v) = env_f64("RECONNECT_MULTIPLIER")? {
            cfg.reconnect.multiplier = v;
        }
        if let Some(v) = env_f64("RECONNECT_JITTER")? {
            cfg.reconnect.jitter = v;
        }
        if let Some(v) = env_u32("SYNC_UNHEALTHY_THRESHOLD")? {
            cfg.sync_health.unhealthy_threshold = v;
        }
        if let Some(v) = env_u32("SYNC_DEGRADED_THRESHOLD")? {
            cfg.sync_health.degraded_threshold = v;
        }
        if let Some(v) = env_u32("SYNC_MAX_RETRIES")? {
            cfg.sync_retry.max_retries = v;
        }
        if let Some(v) = env_u64("SYNC_RETRY_BASE_DELAY")? {
            cfg.sync_retry.base_delay = Duration::from_secs(v);
        }
        if let Some(v) = env_u64("SYNC_RETRY_MAX_DELAY")? {
            cfg.sync_retry.max_delay = Duration::from_secs(v);
        }
        if let Some(v) = env_f64("SYNC_RETRY_MULTIPLIER")? {
            cfg.sync_retry.multiplier = v;
        }
        if let Some(v) = env_u32("MAX_EPISODES_PER_SEARCH")? {
            cfg.batching.max_episodes_per_search = v;
        }
        if let Some(v) = env_u32("MAX_MOVIES_PER_SEARCH")? {
            cfg.batching.max_movies_per_search = v;
        }
        if let Some(v) = env_u32("SEASON_SEARCH_MIN_MISSING_PERCENT")? {
            cfg.batching.season_search_min_missing_percent = v;
        }
        if let Some(v) = env_u32("SEASON_SEARCH_MIN_MISSING_COUNT")? {
            cfg.batching.season_search_min_missing_count = v;
        }

        Ok(cfg)
    }
}

fn env_u64(var: &'static str) -> Result<Option<u64>, ConfigError> {
    match env::var(var) {
        Ok(value) => value
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { var, value }),
        Err(_) => Ok(None),
    }
}

fn env_u32(var: &'static str) -> Result<Option<u32>, ConfigError> {
    match env::var(var) {
        Ok(value) => value
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { var, value }),
        Err(_) => Ok(None),
    }
}

fn env_f64(var: &'static str) -> Result<Option<f64>, ConfigError> {
    match env::var(var) {
        Ok(value) => value
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { var, value }),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_table() {
        let cfg = Config::default();
        assert_eq!(cfg.reconnect.base_delay, Duration::from_millis(30_000));
        assert_eq!(cfg.reconnect.max_delay, Duration::from_millis(600_000));
        assert_eq!(cfg.sync_health.unhealthy_threshold, 5);
        assert_eq!(cfg.sync_health.degraded_threshold, 2);
        assert_eq!(cfg.batching.max_episodes_per_search, 10);
        assert_eq!(cfg.batching.season_search_min_missing_count, 3);
    }

    #[test]
    fn missing_secret_key_is_fatal_only_with_active_connectors() {
        assert!(Config::from_env(0).is_ok());
    }
}
