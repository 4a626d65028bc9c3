//! Cache Entry Types
//!
//! Stored items, TTL selection, and the numeric capabilities values expose to
//! `increment`/`decrement`.

use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;

/// TTL selector for write operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Expiration {
    /// Use the shard's default expiration
    #[default]
    Default,
    /// Never expire
    Never,
    /// Expire after the given duration
    After(Duration),
}

impl Expiration {
    /// Resolve to an absolute deadline, `None` meaning never
    pub fn deadline(self, default: Option<Duration>, now: Instant) -> Option<Instant> {
        let ttl = match self {
            Expiration::Default => default,
            Expiration::Never => None,
            Expiration::After(d) if d.is_zero() => default,
            Expiration::After(d) => Some(d),
        };
        ttl.and_then(|d| now.checked_add(d))
    }
}

impl From<Duration> for Expiration {
    /// Zero maps to the shard default
    fn from(d: Duration) -> Self {
        if d.is_zero() {
            Expiration::Default
        } else {
            Expiration::After(d)
        }
    }
}

impl From<Option<Duration>> for Expiration {
    fn from(d: Option<Duration>) -> Self {
        d.map_or(Expiration::Never, Expiration::from)
    }
}

/// A stored value with its expiration deadline
#[derive(Debug, Clone, PartialEq)]
pub struct Item<V> {
    /// The cached value
    pub object: V,
    /// Absolute deadline (`None` = never expires)
    pub expiration: Option<Instant>,
}

impl<V> Item<V> {
    /// Create a new item
    pub fn new(object: V, expiration: Option<Instant>) -> Self {
        Self { object, expiration }
    }

    /// Check if the item has expired
    #[inline]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }

    #[inline]
    pub(crate) fn is_expired_at(&self, now: Instant) -> bool {
        matches!(self.expiration, Some(deadline) if now > deadline)
    }
}

/// Values storable in the cache.
///
/// The arithmetic hooks default to "not a number"; numeric types override
/// them so `increment`/`decrement` can update entries in place under the
/// shard lock.
pub trait CacheValue: Clone + Send + Sync + 'static {
    /// Add an integer delta in place.
    ///
    /// Returns `false` when the value does not hold a number.
    fn add_int(&mut self, delta: i64) -> bool {
        let _ = delta;
        false
    }

    /// Subtract an integer delta in place.
    ///
    /// Returns `false` when the value does not hold a number.
    fn sub_int(&mut self, delta: i64) -> bool {
        let _ = delta;
        false
    }

    /// Add a float delta in place.
    ///
    /// Returns `false` when the value does not hold a float.
    fn add_float(&mut self, delta: f64) -> bool {
        let _ = delta;
        false
    }
}

macro_rules! impl_integer_value {
    ($($t:ty),* $(,)?) => {
        $(
            impl CacheValue for $t {
                fn add_int(&mut self, delta: i64) -> bool {
                    *self = self.wrapping_add(delta as $t);
                    true
                }

                fn sub_int(&mut self, delta: i64) -> bool {
                    *self = self.wrapping_sub(delta as $t);
                    true
                }
            }
        )*
    };
}

macro_rules! impl_float_value {
    ($($t:ty),* $(,)?) => {
        $(
            impl CacheValue for $t {
                fn add_int(&mut self, delta: i64) -> bool {
                    *self += delta as $t;
                    true
                }

                fn sub_int(&mut self, delta: i64) -> bool {
                    *self -= delta as $t;
                    true
                }

                fn add_float(&mut self, delta: f64) -> bool {
                    *self += delta as $t;
                    true
                }
            }
        )*
    };
}

impl_integer_value!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);
impl_float_value!(f32, f64);

impl CacheValue for bool {}
impl CacheValue for String {}
impl CacheValue for Vec<u8> {}
impl CacheValue for Bytes {}
impl<T: ?Sized + Send + Sync + 'static> CacheValue for Arc<T> {}

/// Dynamically typed value for caches holding mixed content
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Uint(u64),
    Float(f64),
    Bool(bool),
    Text(String),
    Bytes(Bytes),
}

impl CacheValue for Value {
    fn add_int(&mut self, delta: i64) -> bool {
        match self {
            Value::Int(v) => v.add_int(delta),
            Value::Uint(v) => v.add_int(delta),
            Value::Float(v) => v.add_int(delta),
            _ => false,
        }
    }

    fn sub_int(&mut self, delta: i64) -> bool {
        match self {
            Value::Int(v) => v.sub_int(delta),
            Value::Uint(v) => v.sub_int(delta),
            Value::Float(v) => v.sub_int(delta),
            _ => false,
        }
    }

    fn add_float(&mut self, delta: f64) -> bool {
        match self {
            Value::Float(v) => v.add_float(delta),
            _ => false,
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::Uint(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<Bytes> for Value {
    fn from(v: Bytes) -> Self {
        Value::Bytes(v)
    }
}

// =============================================================================
// Tests
// =============================================================================
