//! Sharded Expiring Cache
//!
//! In-process key-value cache split across independently locked shards, with
//! per-entry TTL and a background janitor.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────────┐
//! │                          ShardedCache                                    │
//! ├──────────────────────────────────────────────────────────────────────────┤
//! │   key ──▶ djb33(seed, key) % N ──▶ Shard[i] (RwLock<HashMap>)            │
//! │                                                                          │
//! │   ┌─────────┐ ┌─────────┐ ┌─────────┐         ┌─────────┐                │
//! │   │ Shard 0 │ │ Shard 1 │ │ Shard 2 │   ...   │ Shard N │                │
//! │   └─────────┘ └─────────┘ └─────────┘         └─────────┘                │
//! │        ▲           ▲           ▲                   ▲                     │
//! │        └───────────┴─────┬─────┴───────────────────┘                     │
//! │                   Janitor (periodic delete_expired)                      │
//! └──────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Design Principles
//!
//! - No global lock: routing is pure, shards lock themselves
//! - Item count kept in a single atomic, approximate by construction
//! - Hash seeded per instance from the OS CSPRNG against hash flooding

mod config;
mod entry;
mod hash;
mod janitor;
mod metrics;
mod proptest;
mod shard;
mod sharded;

pub use config::ShardedCacheConfig;
pub use entry::{CacheValue, Expiration, Item, Value};
pub use hash::{djb33, random_seed, SeedSource};
pub use metrics::{CacheMetrics, MetricsSnapshot};
pub use shard::{EvictionCallback, Shard};
pub use sharded::ShardedCache;

/// Default number of shards
pub const DEFAULT_SHARD_COUNT: usize = 16;

/// Pass as a TTL to use the cache's default expiration
pub const DEFAULT_EXPIRATION: Expiration = Expiration::Default;

/// Pass as a TTL for entries that never expire
pub const NO_EXPIRATION: Expiration = Expiration::Never;

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ttl_constants() {
        assert_eq!(DEFAULT_EXPIRATION, Expiration::default());
        assert_eq!(NO_EXPIRATION, Expiration::Never);
    }
}
