//! shardcache - Sharded In-Process Expiring Cache
//!
//! A key-value cache with per-entry time-to-live that spreads keys over
//! independently locked shards instead of guarding one map with one lock.
//!
//! # Quick Start
//!
//! ```rust
//! use std::time::Duration;
//! use shardcache::{Expiration, ShardedCache};
//!
//! // 16 shards, entries live 5 minutes by default, swept every 30 seconds
//! let cache: ShardedCache<String> = ShardedCache::new(
//!     16,
//!     Some(Duration::from_secs(300)),
//!     Some(Duration::from_secs(30)),
//! )?;
//!
//! cache.set("greeting", "hello".to_string(), Expiration::Default);
//! assert_eq!(cache.get("greeting").as_deref(), Some("hello"));
//!
//! cache.close();
//! # Ok::<(), shardcache::Error>(())
//! ```
//!
//! # Modules
//!
//! - [`cache`] - Shards, routing, janitor and the sharded cache itself
//! - [`error`] - Error types

pub mod cache;
pub mod error;

// Re-export commonly used types
pub use cache::{
    CacheValue, Expiration, Item, MetricsSnapshot, SeedSource, ShardedCache, ShardedCacheConfig,
    Value, DEFAULT_EXPIRATION, NO_EXPIRATION,
};
pub use error::{Error, Result};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
