//! Cache configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_EXPIRATION, DEFAULT_MAX_ITEMS, ENV_DEFAULT_TTL_MS, ENV_EXPIRATION_INTERVAL_MS,
    ENV_MAX_ITEMS,
};
use crate::error::{CacheError, Result};

/// Cache configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of entries kept after a maintenance pass
    pub max_items: usize,
    /// Cache-wide default TTL in milliseconds (None = effectively unbounded)
    pub default_ttl_ms: Option<u64>,
    /// Interval for automatic maintenance passes in milliseconds (None = manual only)
    pub expiration_interval_ms: Option<u64>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_items: DEFAULT_MAX_ITEMS,
            default_ttl_ms: None,
            expiration_interval_ms: None,
        }
    }
}

impl CacheConfig {
    /// Creates a new default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the capacity bound.
    pub fn with_max_items(mut self, max_items: usize) -> Self {
        self.max_items = max_items;
        self
    }

    /// Sets the cache-wide default TTL.
    pub fn default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl_ms = Some(duration_to_ms(ttl));
        self
    }

    /// Enables automatic maintenance at the given interval.
    pub fn expiration_interval(mut self, interval: Duration) -> Self {
        self.expiration_interval_ms = Some(duration_to_ms(interval));
        self
    }

    /// TTL applied to entries created without a per-call override.
    pub fn default_expiration(&self) -> Duration {
        self.default_ttl_ms
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_EXPIRATION)
    }

    /// Interval between automatic maintenance passes, if configured.
    pub fn maintenance_interval(&self) -> Option<Duration> {
        self.expiration_interval_ms.map(Duration::from_millis)
    }

    /// Checks that the configuration can drive an engine.
    ///
    /// A zero `max_items` is accepted: every entry is evicted on the capacity phase.
    pub fn validate(&self) -> Result<()> {
        if self.default_ttl_ms == Some(0) {
            return Err(CacheError::ConfigError(
                "default TTL must be greater than zero".into(),
            ));
        }
        if self.expiration_interval_ms == Some(0) {
            return Err(CacheError::ConfigError(
                "expiration interval must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    /// Parses and validates a JSON configuration document.
    ///
    /// Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from `ASYNCVAL_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let config = Self {
            max_items: parse_var(&lookup, ENV_MAX_ITEMS)?.unwrap_or(defaults.max_items),
            default_ttl_ms: parse_var(&lookup, ENV_DEFAULT_TTL_MS)?,
            expiration_interval_ms: parse_var(&lookup, ENV_EXPIRATION_INTERVAL_MS)?,
        };
        config.validate()?;
        Ok(config)
    }
}

fn parse_var<T, F>(lookup: &F, name: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| CacheError::ConfigError(format!("{name}={raw:?}: {e}"))),
    }
}

fn duration_to_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
