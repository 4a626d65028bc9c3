//! Property-Based Tests for Routing and Round-Trips
//!
//! # Test Properties
//!
//! 1. **Determinism**: the same (seed, key, N) always routes to the same shard
//! 2. **Bounds**: every shard index is below N
//! 3. **Round-trip**: set(k, v) then get(k) returns v for any key and TTL kind
//! 4. **Counting**: N distinct sets give an item count of N

#![cfg(test)]

use std::collections::HashSet;
use std::time::Duration;

use proptest::prelude::*;

use super::{djb33, Expiration, ShardedCache, ShardedCacheConfig};

// =============================================================================
// Property Strategies
// =============================================================================

/// Arbitrary keys, including empty and non-ASCII ones
fn key_strategy() -> impl Strategy<Value = String> {
    ".{0,64}"
}

fn shard_count_strategy() -> impl Strategy<Value = usize> {
    1usize..=64
}

fn ttl_strategy() -> impl Strategy<Value = Expiration> {
    prop_oneof![
        Just(Expiration::Default),
        Just(Expiration::Never),
        (60u64..3600).prop_map(|s| Expiration::After(Duration::from_secs(s))),
    ]
}

// =============================================================================
// Routing Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_routing_is_deterministic(
        seed in any::<u32>(),
        shards in shard_count_strategy(),
        key in key_strategy(),
    ) {
        let config = ShardedCacheConfig::default().with_shard_count(shards);
        let a: ShardedCache<u8> = ShardedCache::with_seed(config.clone(), seed).unwrap();
        let b: ShardedCache<u8> = ShardedCache::with_seed(config, seed).unwrap();

        let idx = a.shard_index(&key);
        prop_assert!(idx < shards);
        prop_assert_eq!(idx, b.shard_index(&key));
        prop_assert_eq!(idx, (djb33(seed, &key) % shards as u32) as usize);
    }

    #[test]
    fn prop_equal_hash_residues_share_a_shard(
        seed in any::<u32>(),
        shards in shard_count_strategy(),
        k1 in key_strategy(),
        k2 in key_strategy(),
    ) {
        let config = ShardedCacheConfig::default().with_shard_count(shards);
        let cache: ShardedCache<u8> = ShardedCache::with_seed(config, seed).unwrap();

        let same_residue = djb33(seed, &k1) % shards as u32 == djb33(seed, &k2) % shards as u32;
        prop_assert_eq!(same_residue, cache.shard_index(&k1) == cache.shard_index(&k2));
    }
}

// =============================================================================
// Cache Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_set_get_round_trip(
        key in key_strategy(),
        value in any::<i64>(),
        ttl in ttl_strategy(),
    ) {
        let cache: ShardedCache<i64> = ShardedCache::new(8, None, None).unwrap();
        cache.set(&key, value, ttl);
        prop_assert_eq!(cache.get(&key), Some(value));
    }

    #[test]
    fn prop_distinct_sets_are_counted(
        keys in prop::collection::hash_set(key_strategy(), 0..100),
    ) {
        let cache: ShardedCache<u8> = ShardedCache::new(16, None, None).unwrap();
        for key in &keys {
            cache.set(key, 0, Expiration::Default);
        }

        prop_assert_eq!(cache.item_count() as usize, keys.len());
        let stored: HashSet<String> = cache
            .items()
            .into_iter()
            .flat_map(|shard| shard.into_keys())
            .collect();
        prop_assert_eq!(stored, keys);
    }
}
