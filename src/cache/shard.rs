//! Expiring Shard
//!
//! One independently locked slice of the keyspace.
//!
//! # Design
//!
//! - Each shard has its own RwLock; reads never block each other
//! - Expired items stay in the map until a sweep or an overwrite removes them,
//!   reads simply treat them as absent
//! - Eviction callbacks run after the lock is released

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::entry::{CacheValue, Expiration, Item};
use crate::error::{Error, Result};

/// Callback invoked with the key and value of an evicted item
pub type EvictionCallback<V> = Arc<dyn Fn(&str, V) + Send + Sync>;

/// A single expiring key-value shard
pub struct Shard<V> {
    /// Applied when a write passes `Expiration::Default` (`None` = never)
    default_expiration: Option<Duration>,
    /// Items keyed by string
    items: RwLock<HashMap<String, Item<V>>>,
    /// Eviction callback, if registered
    on_evicted: RwLock<Option<EvictionCallback<V>>>,
}

impl<V> Shard<V> {
    /// Create a new empty shard
    pub fn new(default_expiration: Option<Duration>) -> Self {
        Self {
            default_expiration: default_expiration.filter(|d| !d.is_zero()),
            items: RwLock::new(HashMap::new()),
            on_evicted: RwLock::new(None),
        }
    }

    /// Default expiration for this shard
    pub fn default_expiration(&self) -> Option<Duration> {
        self.default_expiration
    }

    /// Number of stored items, including expired ones not yet swept
    pub fn item_count(&self) -> usize {
        self.items.read().len()
    }

    /// Register (or clear) the eviction callback
    pub fn on_evicted(&self, callback: Option<EvictionCallback<V>>) {
        *self.on_evicted.write() = callback;
    }

    /// Whether an eviction callback is registered
    pub fn has_eviction_callback(&self) -> bool {
        self.on_evicted.read().is_some()
    }

    /// Remove all items, returning how many were held
    pub fn flush(&self) -> usize {
        let mut guard = self.items.write();
        let removed = guard.len();
        guard.clear();
        removed
    }

    fn deadline(&self, ttl: Expiration) -> Option<Instant> {
        ttl.deadline(self.default_expiration, Instant::now())
    }

    fn callback(&self) -> Option<EvictionCallback<V>> {
        self.on_evicted.read().clone()
    }
}

impl<V: CacheValue> Shard<V> {
    /// Get a live value
    pub fn get(&self, key: &str) -> Option<V> {
        let guard = self.items.read();
        match guard.get(key) {
            Some(item) if !item.is_expired() => Some(item.object.clone()),
            _ => None,
        }
    }

    /// Get a live value along with its deadline
    pub fn get_with_expiration(&self, key: &str) -> Option<(V, Option<Instant>)> {
        let guard = self.items.read();
        match guard.get(key) {
            Some(item) if !item.is_expired() => Some((item.object.clone(), item.expiration)),
            _ => None,
        }
    }

    /// Insert or overwrite a value
    pub fn set(&self, key: &str, value: V, ttl: Expiration) {
        let item = Item::new(value, self.deadline(ttl));
        self.items.write().insert(key.to_string(), item);
    }

    /// Insert only if the key is absent or expired
    pub fn add(&self, key: &str, value: V, ttl: Expiration) -> Result<()> {
        let item = Item::new(value, self.deadline(ttl));
        let mut guard = self.items.write();
        if guard.get(key).is_some_and(|existing| !existing.is_expired()) {
            return Err(Error::AlreadyExists {
                key: key.to_string(),
            });
        }
        guard.insert(key.to_string(), item);
        Ok(())
    }

    /// Overwrite only if the key is present and unexpired
    pub fn replace(&self, key: &str, value: V, ttl: Expiration) -> Result<()> {
        let item = Item::new(value, self.deadline(ttl));
        let mut guard = self.items.write();
        match guard.get_mut(key) {
            Some(existing) if !existing.is_expired() => {
                *existing = item;
                Ok(())
            }
            _ => Err(Error::NotFound {
                key: key.to_string(),
            }),
        }
    }

    /// Add an integer delta to a numeric value
    pub fn increment(&self, key: &str, delta: i64) -> Result<()> {
        self.update_number(key, "an integer", |v| v.add_int(delta))
    }

    /// Add a float delta to a float value
    pub fn increment_float(&self, key: &str, delta: f64) -> Result<()> {
        self.update_number(key, "a float", |v| v.add_float(delta))
    }

    /// Subtract an integer delta from a numeric value
    pub fn decrement(&self, key: &str, delta: i64) -> Result<()> {
        self.update_number(key, "an integer", |v| v.sub_int(delta))
    }

    fn update_number<F>(&self, key: &str, expected: &'static str, apply: F) -> Result<()>
    where
        F: FnOnce(&mut V) -> bool,
    {
        let mut guard = self.items.write();
        let item = match guard.get_mut(key) {
            Some(item) if !item.is_expired() => item,
            _ => {
                return Err(Error::NotFound {
                    key: key.to_string(),
                })
            }
        };

        if apply(&mut item.object) {
            Ok(())
        } else {
            Err(Error::WrongType {
                key: key.to_string(),
                expected,
            })
        }
    }

    /// Remove a key, handing the value to the eviction callback
    pub fn delete(&self, key: &str) -> Option<V> {
        let removed = self.items.write().remove(key)?;
        match self.callback() {
            Some(callback) => {
                callback(key, removed.object.clone());
                Some(removed.object)
            }
            None => Some(removed.object),
        }
    }

    /// Remove every expired item, returning how many were removed
    pub fn delete_expired(&self) -> usize {
        let now = Instant::now();
        let evicted: Vec<(String, V)> = {
            let mut guard = self.items.write();
            let expired: Vec<String> = guard
                .iter()
                .filter(|(_, item)| item.is_expired_at(now))
                .map(|(k, _)| k.clone())
                .collect();
            expired
                .into_iter()
                .filter_map(|k| guard.remove(&k).map(|item| (k, item.object)))
                .collect()
        };

        let removed = evicted.len();
        if let Some(callback) = self.callback() {
            for (key, value) in evicted {
                callback(&key, value);
            }
        }
        removed
    }

    /// Snapshot of all items, including expired ones not yet swept
    pub fn items(&self) -> HashMap<String, Item<V>> {
        self.items.read().clone()
    }
}

// =============================================================================
// Tests
// =============================================================================
