//! Configuration Module
//!
//! Handles loading and validating cache configuration from environment
//! variables.

use std::env;
use std::time::Duration;

use crate::error::ConfigError;

/// Default entry lifetime: one hour.
pub const DEFAULT_TTL: Duration = Duration::from_secs(60 * 60);

/// Default byte budget: 100 MB.
pub const DEFAULT_MAX_SIZE: usize = 100 * 1024 * 1024;

/// Default sweep interval: five minutes.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);

// == Cache Config ==
/// Cache configuration parameters.
///
/// All values can come from environment variables with sensible defaults,
/// so the store is usable with no configuration at all.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Lifetime applied to entries stored without an explicit TTL
    pub default_ttl: Duration,
    /// Byte budget for the sum of estimated entry sizes
    pub max_size: usize,
    /// Interval between periodic expiry sweeps
    pub sweep_interval: Duration,
}

impl CacheConfig {
    /// Creates a CacheConfig from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_DEFAULT_TTL_MS` - Default entry TTL in milliseconds (default: 3600000)
    /// - `CACHE_MAX_SIZE_BYTES` - Byte budget (default: 104857600)
    /// - `CACHE_SWEEP_INTERVAL_SECS` - Sweep frequency in seconds (default: 300)
    pub fn from_env() -> Self {
        Self {
            default_ttl: env::var("CACHE_DEFAULT_TTL_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_TTL),
            max_size: env::var("CACHE_MAX_SIZE_BYTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_MAX_SIZE),
            sweep_interval: env::var("CACHE_SWEEP_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_SWEEP_INTERVAL),
        }
    }

    // == Validation ==
    /// Rejects configurations the store must never run with: a zero byte
    /// budget or zero TTL would turn every `set` into an eviction spin.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_size == 0 {
            return Err(ConfigError::ZeroBudget);
        }
        if self.default_ttl.is_zero() {
            return Err(ConfigError::ZeroTtl);
        }
        if self.sweep_interval.is_zero() {
            return Err(ConfigError::ZeroSweepInterval);
        }
        Ok(())
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl: DEFAULT_TTL,
            max_size: DEFAULT_MAX_SIZE,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }
}
