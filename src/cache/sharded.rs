//! Sharded Cache
//!
//! Routes every key to one of N independently locked shards through a seeded
//! hash, so writers to different shards never contend.
//!
//! # Design
//!
//! - `shard = shards[djb33(seed, key) % N]`; the seed is drawn per instance
//! - The routing layer takes no locks; each shard synchronizes itself
//! - The item count is a relaxed `AtomicU32` maintained without a global lock.
//!   It is approximate: `set_renew`, `add`, `replace` and passive expiry do
//!   not adjust it, and `delete` decrements even when the key was absent
//! - Whole-cache operations visit shards in index order and are not atomic
//!   as a whole

use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::config::ShardedCacheConfig;
use super::entry::{CacheValue, Expiration, Item};
use super::hash::{djb33, random_seed, SeedSource};
use super::janitor::{Janitor, Sweep};
use super::metrics::{CacheMetrics, MetricsSnapshot};
use super::shard::{EvictionCallback, Shard};
use crate::error::Result;

/// State shared with the janitor
struct Core<V> {
    seed: u32,
    seed_source: SeedSource,
    shards: Box<[Shard<V>]>,
    /// Approximate item count
    count: AtomicU32,
    on_evicted: RwLock<Option<EvictionCallback<V>>>,
    metrics: CacheMetrics,
}

impl<V: CacheValue> Core<V> {
    #[inline]
    fn shard_index(&self, key: &str) -> usize {
        // Lossless: construction caps the shard count at u32::MAX
        (djb33(self.seed, key) % self.shards.len() as u32) as usize
    }

    #[inline]
    fn bucket(&self, key: &str) -> &Shard<V> {
        &self.shards[self.shard_index(key)]
    }

    fn delete_expired(&self) -> usize {
        let start = Instant::now();
        let mut total = 0;

        for shard in self.shards.iter() {
            let removed = shard.delete_expired();
            if removed > 0 {
                self.count.fetch_sub(removed as u32, Ordering::Relaxed);
                total += removed;
            }
        }

        self.metrics.record_sweep(total, start.elapsed());
        total
    }
}

impl<V: CacheValue> Sweep for Core<V> {
    fn sweep(&self) -> usize {
        self.delete_expired()
    }
}

/// Sharded, time-expiring key-value cache.
///
/// Share it between threads with `Arc`. Dropping it (or calling
/// [`close`](Self::close)) stops the background janitor.
pub struct ShardedCache<V> {
    core: Arc<Core<V>>,
    janitor: Mutex<Option<Janitor>>,
}

impl<V: CacheValue> ShardedCache<V> {
    /// Create a cache with `shard_count` shards.
    ///
    /// `default_expiration` of `None` or zero means entries written with
    /// [`Expiration::Default`] never expire. A positive `cleanup_interval`
    /// starts a janitor that sweeps expired entries on that period.
    pub fn new(
        shard_count: usize,
        default_expiration: Option<Duration>,
        cleanup_interval: Option<Duration>,
    ) -> Result<Self> {
        Self::with_config(ShardedCacheConfig {
            shard_count,
            default_expiration,
            cleanup_interval,
        })
    }

    /// Create a cache from a configuration
    pub fn with_config(config: ShardedCacheConfig) -> Result<Self> {
        config.validate()?;
        let (seed, seed_source) = random_seed();
        Self::build(config, seed, seed_source)
    }

    fn build(config: ShardedCacheConfig, seed: u32, seed_source: SeedSource) -> Result<Self> {
        let default_expiration = config.effective_default_expiration();
        let shards: Box<[Shard<V>]> = (0..config.shard_count)
            .map(|_| Shard::new(default_expiration))
            .collect();

        let core = Arc::new(Core {
            seed,
            seed_source,
            shards,
            count: AtomicU32::new(0),
            on_evicted: RwLock::new(None),
            metrics: CacheMetrics::new(),
        });

        let janitor = match config.effective_cleanup_interval() {
            Some(interval) => Some(Janitor::start(interval, Arc::downgrade(&core))?),
            None => None,
        };

        Ok(Self {
            core,
            janitor: Mutex::new(janitor),
        })
    }

    /// Build with a fixed seed so routing is reproducible
    #[cfg(test)]
    pub(crate) fn with_seed(config: ShardedCacheConfig, seed: u32) -> Result<Self> {
        config.validate()?;
        Self::build(config, seed, SeedSource::Secure)
    }

    // =========================================================================
    // Routing
    // =========================================================================

    /// Number of shards
    pub fn shard_count(&self) -> usize {
        self.core.shards.len()
    }

    /// Index of the shard owning `key`
    pub fn shard_index(&self, key: &str) -> usize {
        self.core.shard_index(key)
    }

    /// Where this instance's hash seed came from
    pub fn seed_source(&self) -> SeedSource {
        self.core.seed_source
    }

    // =========================================================================
    // Single-key operations
    // =========================================================================

    /// Get a live value
    pub fn get(&self, key: &str) -> Option<V> {
        let value = self.core.bucket(key).get(key);
        match value {
            Some(_) => self.core.metrics.record_hit(),
            None => self.core.metrics.record_miss(),
        }
        value
    }

    /// Get a live value with its expiration deadline (`None` = never)
    pub fn get_with_expiration(&self, key: &str) -> Option<(V, Option<Instant>)> {
        let found = self.core.bucket(key).get_with_expiration(key);
        match found {
            Some(_) => self.core.metrics.record_hit(),
            None => self.core.metrics.record_miss(),
        }
        found
    }

    /// Insert or overwrite a value and count it
    pub fn set(&self, key: &str, value: V, ttl: impl Into<Expiration>) {
        self.core.bucket(key).set(key, value, ttl.into());
        self.core.count.fetch_add(1, Ordering::Relaxed);
        self.core.metrics.record_set();
    }

    /// [`set`](Self::set) with the default expiration
    pub fn set_default(&self, key: &str, value: V) {
        self.set(key, value, Expiration::Default);
    }

    /// Overwrite a value without counting it.
    ///
    /// For refreshing a key already counted by [`set`](Self::set); using it
    /// for new keys leaves [`item_count`](Self::item_count) low.
    pub fn set_renew(&self, key: &str, value: V, ttl: impl Into<Expiration>) {
        self.core.bucket(key).set(key, value, ttl.into());
        self.core.metrics.record_set();
    }

    /// Insert only if the key is absent or expired
    pub fn add(&self, key: &str, value: V, ttl: impl Into<Expiration>) -> Result<()> {
        self.core.bucket(key).add(key, value, ttl.into())
    }

    /// Overwrite only if the key is present and unexpired
    pub fn replace(&self, key: &str, value: V, ttl: impl Into<Expiration>) -> Result<()> {
        self.core.bucket(key).replace(key, value, ttl.into())
    }

    pub fn increment(&self, key: &str, delta: i64) -> Result<()> {
        self.core.bucket(key).increment(key, delta)
    }

    pub fn increment_float(&self, key: &str, delta: f64) -> Result<()> {
        self.core.bucket(key).increment_float(key, delta)
    }

    pub fn decrement(&self, key: &str, delta: i64) -> Result<()> {
        self.core.bucket(key).decrement(key, delta)
    }

    /// Remove a key and uncount it, returning the removed value.
    ///
    /// The count is decremented even if the key was absent, and wraps below
    /// zero.
    pub fn delete(&self, key: &str) -> Option<V> {
        let removed = self.core.bucket(key).delete(key);
        self.core.count.fetch_sub(1, Ordering::Relaxed);
        self.core.metrics.record_delete();
        removed
    }

    // =========================================================================
    // Whole-cache operations
    // =========================================================================

    /// Sweep expired entries from every shard, returning how many were removed
    pub fn delete_expired(&self) -> usize {
        self.core.delete_expired()
    }

    /// Per-shard snapshots, index-aligned with the shards.
    ///
    /// May include expired entries not yet swept; check
    /// [`Item::is_expired`] where that matters. Shards are read one after
    /// another, so concurrent writers may be observed in some shards and not
    /// others.
    pub fn items(&self) -> Vec<HashMap<String, Item<V>>> {
        self.core.shards.iter().map(|s| s.items()).collect()
    }

    /// Approximate number of items. Never blocks.
    pub fn item_count(&self) -> u32 {
        self.core.count.load(Ordering::Relaxed)
    }

    /// Clear every shard, subtracting what each actually held from the count
    pub fn flush(&self) {
        for shard in self.core.shards.iter() {
            let removed = shard.flush();
            if removed > 0 {
                self.core.count.fetch_sub(removed as u32, Ordering::Relaxed);
            }
        }
    }

    /// Register a callback for entries removed by `delete` or expiry sweeps.
    ///
    /// Applies to every shard immediately.
    pub fn on_evicted<F>(&self, callback: F)
    where
        F: Fn(&str, V) + Send + Sync + 'static,
    {
        let callback: EvictionCallback<V> = Arc::new(callback);
        *self.core.on_evicted.write() = Some(Arc::clone(&callback));
        for shard in self.core.shards.iter() {
            shard.on_evicted(Some(Arc::clone(&callback)));
        }
    }

    /// Whether an eviction callback is registered
    pub fn has_eviction_callback(&self) -> bool {
        self.core.on_evicted.read().is_some()
    }

    // =========================================================================
    // Lifecycle & metrics
    // =========================================================================

    /// Get metrics snapshot
    pub fn metrics(&self) -> MetricsSnapshot {
        self.core.metrics.snapshot()
    }

    /// Zero every metrics counter
    pub fn reset_metrics(&self) {
        self.core.metrics.reset();
    }

    /// Whether a janitor is running
    pub fn has_janitor(&self) -> bool {
        self.janitor.lock().as_ref().is_some_and(|j| j.is_running())
    }

    /// Stop the janitor and wait for it. Idempotent.
    pub fn close(&self) {
        let janitor = self.janitor.lock().take();
        if let Some(mut janitor) = janitor {
            janitor.stop();
        }
    }
}

impl<V> Drop for ShardedCache<V> {
    fn drop(&mut self) {
        if let Some(mut janitor) = self.janitor.get_mut().take() {
            janitor.stop();
        }
    }
}

impl<V> std::fmt::Debug for ShardedCache<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShardedCache")
            .field("shard_count", &self.core.shards.len())
            .field("item_count", &self.core.count.load(Ordering::Relaxed))
            .field("seed_source", &self.core.seed_source)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::Value;
    use crate::error::Error;
    use assert_matches::assert_matches;
    use std::thread;

    fn cache(shards: usize) -> ShardedCache<i64> {
        ShardedCache::new(shards, None, None).unwrap()
    }

    #[test]
    fn test_rejects_zero_shards() {
        assert_matches!(
            ShardedCache::<i64>::new(0, None, None),
            Err(Error::InvalidShardCount(0))
        );
    }

    #[test]
    fn test_cache_creation() {
        let cache = cache(16);
        assert_eq!(cache.shard_count(), 16);
        assert_eq!(cache.item_count(), 0);
        assert!(!cache.has_janitor());
        assert_eq!(cache.seed_source(), SeedSource::Secure);
    }

    #[test]
    fn test_single_shard() {
        let cache = cache(1);
        for i in 0..10 {
            assert_eq!(cache.shard_index(&format!("key{}", i)), 0);
        }
        cache.set("a", 1, Expiration::Default);
        assert_eq!(cache.get("a"), Some(1));
    }

    #[test]
    fn test_routing_matches_hash() {
        let config = ShardedCacheConfig::default().with_shard_count(7);
        let cache: ShardedCache<i64> = ShardedCache::with_seed(config, 1234).unwrap();

        for i in 0..200 {
            let key = format!("user:{}", i);
            assert_eq!(cache.shard_index(&key), (djb33(1234, &key) % 7) as usize);
        }
    }

    #[test]
    fn test_set_lands_in_owning_shard() {
        let cache = cache(8);
        cache.set("alpha", 1, Expiration::Default);

        let items = cache.items();
        assert_eq!(items.len(), 8);
        let owner = cache.shard_index("alpha");
        for (i, shard) in items.iter().enumerate() {
            assert_eq!(shard.contains_key("alpha"), i == owner);
        }
    }

    #[test]
    fn test_set_get_round_trip() {
        let cache = cache(16);
        cache.set("a", 1, Expiration::Default);
        cache.set("b", 2, Expiration::Never);
        cache.set("c", 3, Duration::from_secs(60));

        assert_eq!(cache.get("a"), Some(1));
        assert_eq!(cache.get("b"), Some(2));
        assert_eq!(cache.get("c"), Some(3));
        assert_eq!(cache.get("d"), None);
    }

    #[test]
    fn test_item_count_tracks_sets_and_deletes() {
        let cache = cache(16);
        for i in 0..100 {
            cache.set(&format!("key{}", i), i, Expiration::Default);
        }
        assert_eq!(cache.item_count(), 100);

        cache.delete("key0");
        cache.delete("key1");
        assert_eq!(cache.item_count(), 98);
    }

    #[test]
    fn test_set_default_counts() {
        let cache = cache(4);
        cache.set_default("a", 1);
        assert_eq!(cache.item_count(), 1);
        assert_eq!(cache.get("a"), Some(1));
    }

    #[test]
    fn test_set_renew_does_not_count() {
        let cache = cache(4);
        cache.set("a", 1, Expiration::Default);
        cache.set_renew("a", 2, Expiration::Never);

        assert_eq!(cache.item_count(), 1);
        assert_eq!(cache.get("a"), Some(2));
    }

    #[test]
    fn test_delete_absent_wraps_count() {
        let cache = cache(4);
        assert_eq!(cache.delete("missing"), None);
        assert_eq!(cache.item_count(), u32::MAX);
    }

    #[test]
    fn test_add_and_replace() {
        let cache = cache(16);

        assert!(cache.add("a", 1, Expiration::Default).is_ok());
        assert_matches!(
            cache.add("a", 2, Expiration::Default),
            Err(Error::AlreadyExists { .. })
        );
        assert_matches!(
            cache.replace("b", 1, Expiration::Default),
            Err(Error::NotFound { .. })
        );
        assert!(cache.replace("a", 3, Expiration::Default).is_ok());
        assert_eq!(cache.get("a"), Some(3));

        // Add and replace are not counted
        assert_eq!(cache.item_count(), 0);
    }

    #[test]
    fn test_arithmetic_dispatch() {
        let cache: ShardedCache<Value> = ShardedCache::new(8, None, None).unwrap();
        cache.set("n", Value::Int(1), Expiration::Default);
        cache.set("f", Value::Float(1.0), Expiration::Default);
        cache.set("s", Value::from("x"), Expiration::Default);

        cache.increment("n", 9).unwrap();
        cache.decrement("n", 3).unwrap();
        cache.increment_float("f", 0.5).unwrap();

        assert_eq!(cache.get("n"), Some(Value::Int(7)));
        assert_eq!(cache.get("f"), Some(Value::Float(1.5)));
        assert_matches!(cache.increment("s", 1), Err(Error::WrongType { .. }));
        assert_matches!(cache.increment("none", 1), Err(Error::NotFound { .. }));
    }

    #[test]
    fn test_expired_entries_hidden_then_swept() {
        let cache = cache(8);
        cache.set("a", 1, Duration::from_millis(10));
        cache.set("b", 2, Duration::from_millis(10));
        cache.set("c", 3, Expiration::Never);
        thread::sleep(Duration::from_millis(25));

        assert_eq!(cache.get("a"), None);
        assert_eq!(cache.item_count(), 3);

        assert_eq!(cache.delete_expired(), 2);
        assert_eq!(cache.item_count(), 1);
        assert_eq!(cache.get("c"), Some(3));
    }

    #[test]
    fn test_default_expiration_applies() {
        let cache: ShardedCache<i64> =
            ShardedCache::new(4, Some(Duration::from_millis(10)), None).unwrap();
        cache.set_default("a", 1);
        cache.set("b", 2, Expiration::Never);
        thread::sleep(Duration::from_millis(25));

        assert_eq!(cache.get("a"), None);
        assert_eq!(cache.get("b"), Some(2));
    }

    #[test]
    fn test_get_with_expiration() {
        let cache = cache(4);
        cache.set("a", 1, Duration::from_secs(60));
        cache.set("b", 2, Expiration::Never);

        let (value, deadline) = cache.get_with_expiration("a").unwrap();
        assert_eq!(value, 1);
        assert!(deadline.unwrap() > Instant::now());

        assert_eq!(cache.get_with_expiration("b"), Some((2, None)));
    }

    #[test]
    fn test_flush_subtracts_actual_items() {
        let cache = cache(16);
        for i in 0..50 {
            cache.set(&format!("key{}", i), i, Expiration::Default);
        }

        cache.flush();
        assert_eq!(cache.item_count(), 0);
        assert!(cache.items().iter().all(|s| s.is_empty()));

        // Flushing an empty cache leaves the count alone
        cache.flush();
        assert_eq!(cache.item_count(), 0);
    }

    #[test]
    fn test_on_evicted_is_eager() {
        let cache = cache(16);
        assert!(!cache.has_eviction_callback());

        let evicted = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&evicted);
        cache.on_evicted(move |k, v| sink.lock().push((k.to_string(), v)));
        assert!(cache.has_eviction_callback());
        assert!(cache.core.shards.iter().all(|s| s.has_eviction_callback()));

        // No add/replace needed for the callback to fire
        for i in 0..20 {
            cache.set(&format!("key{}", i), i, Expiration::Default);
        }
        for i in 0..20 {
            cache.delete(&format!("key{}", i));
        }

        assert_eq!(evicted.lock().len(), 20);
    }

    #[test]
    fn test_metrics() {
        let cache = cache(4);
        cache.set("a", 1, Expiration::Default);
        cache.get("a");
        cache.get("missing");
        cache.delete_expired();

        let metrics = cache.metrics();
        assert_eq!(metrics.hits, 1);
        assert_eq!(metrics.misses, 1);
        assert_eq!(metrics.sets, 1);
        assert_eq!(metrics.sweeps, 1);

        cache.reset_metrics();
        let metrics = cache.metrics();
        assert_eq!(metrics.hits, 0);
        assert_eq!(metrics.sets, 0);
        assert_eq!(metrics.sweeps, 0);

        // Counters keep working after a reset
        cache.get("a");
        assert_eq!(cache.metrics().hits, 1);
    }

    #[test]
    fn test_janitor_lifecycle() {
        let cache: ShardedCache<i64> =
            ShardedCache::new(4, None, Some(Duration::from_millis(5))).unwrap();
        assert!(cache.has_janitor());

        cache.close();
        assert!(!cache.has_janitor());
        cache.close();
    }

    #[test]
    fn test_huge_cleanup_interval_keeps_janitor() {
        let cache: ShardedCache<i64> =
            ShardedCache::new(4, None, Some(Duration::from_secs(u64::MAX))).unwrap();

        thread::sleep(Duration::from_millis(50));
        assert!(cache.has_janitor());
        cache.close();
    }

    #[test]
    fn test_zero_cleanup_interval_means_no_janitor() {
        let cache: ShardedCache<i64> = ShardedCache::new(4, None, Some(Duration::ZERO)).unwrap();
        assert!(!cache.has_janitor());
    }

    #[test]
    fn test_janitor_sweeps() {
        let cache: ShardedCache<i64> = ShardedCache::new(
            4,
            Some(Duration::from_millis(10)),
            Some(Duration::from_millis(5)),
        )
        .unwrap();
        cache.set_default("a", 1);
        cache.set_default("b", 2);

        thread::sleep(Duration::from_millis(80));
        assert_eq!(cache.item_count(), 0);
        assert!(cache.items().iter().all(|s| s.is_empty()));
        assert!(cache.metrics().expired_removed >= 2);
    }
}
