//! Sharded cache configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::DEFAULT_SHARD_COUNT;
use crate::error::{Error, Result};

/// Sharded cache configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShardedCacheConfig {
    /// Number of independent shards (fixed for the cache's lifetime)
    pub shard_count: usize,
    /// TTL applied by `Expiration::Default` writes (`None` or zero = never)
    pub default_expiration: Option<Duration>,
    /// Janitor sweep period (`None` or zero = no janitor)
    pub cleanup_interval: Option<Duration>,
}

impl Default for ShardedCacheConfig {
    fn default() -> Self {
        Self {
            shard_count: DEFAULT_SHARD_COUNT,
            default_expiration: None,
            cleanup_interval: None,
        }
    }
}

impl ShardedCacheConfig {
    pub fn with_shard_count(mut self, shard_count: usize) -> Self {
        self.shard_count = shard_count;
        self
    }

    pub fn with_default_expiration(mut self, ttl: Duration) -> Self {
        self.default_expiration = Some(ttl);
        self
    }

    pub fn with_cleanup_interval(mut self, interval: Duration) -> Self {
        self.cleanup_interval = Some(interval);
        self
    }

    /// Default expiration with zero normalized to "never"
    pub fn effective_default_expiration(&self) -> Option<Duration> {
        self.default_expiration.filter(|d| !d.is_zero())
    }

    /// Janitor interval, if one should run
    pub fn effective_cleanup_interval(&self) -> Option<Duration> {
        self.cleanup_interval.filter(|d| !d.is_zero())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.shard_count == 0 || u32::try_from(self.shard_count).is_err() {
            return Err(Error::InvalidShardCount(self.shard_count));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_default_config() {
        let config = ShardedCacheConfig::default();
        assert_eq!(config.shard_count, DEFAULT_SHARD_COUNT);
        assert!(config.validate().is_ok());
        assert_eq!(config.effective_cleanup_interval(), None);
    }

    #[test]
    fn test_zero_shards_rejected() {
        let config = ShardedCacheConfig::default().with_shard_count(0);
        assert_matches!(config.validate(), Err(Error::InvalidShardCount(0)));
    }

    #[test]
    fn test_zero_durations_normalized() {
        let config = ShardedCacheConfig::default()
            .with_default_expiration(Duration::ZERO)
            .with_cleanup_interval(Duration::ZERO);
        assert_eq!(config.effective_default_expiration(), None);
        assert_eq!(config.effective_cleanup_interval(), None);
    }

    #[test]
    fn test_deserialize_partial() {
        let config: ShardedCacheConfig = serde_json::from_str(
            r#"{"shard_count": 32, "cleanup_interval": {"secs": 1, "nanos": 0}}"#,
        )
        .unwrap();

        assert_eq!(config.shard_count, 32);
        assert_eq!(config.default_expiration, None);
        assert_eq!(config.cleanup_interval, Some(Duration::from_secs(1)));
    }
}
