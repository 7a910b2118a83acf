//! Counter store contract and implementations.
//!
//! The limiter core is agnostic to where counters live; it talks to any
//! [`CounterStore`]. The contract is fixed once, independent of backing
//! technology: 64-bit counters, atomic increment, and zero-for-absent
//! batched summation. Two implementations ship with the crate:
//!
//! - [`MemoryStore`]: in-process map, for tests and single-process callers.
//! - `RedisStore` (feature `redis`): shared counters across processes.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

mod memory;
#[cfg(feature = "redis")]
mod redis;

pub use self::memory::MemoryStore;
#[cfg(feature = "redis")]
pub use self::redis::{RedisStore, RedisStoreConfig};

/// Failure from the underlying counter store, passed through verbatim.
///
/// The limiter performs no retries and no partial-failure recovery; callers
/// should treat these as transient and decide retry policy themselves.
#[derive(Debug, Error)]
pub enum StoreError {
    /// I/O, timeout, or cancellation failure from the backend.
    #[error("counter store: {0}")]
    Backend(String),
}

/// Key-value counter storage shared by all limiter processes.
///
/// Implementations must provide atomic increments under concurrent callers;
/// the limiter adds no locking of its own. Cancellation follows the usual
/// async contract: dropping a returned future aborts the in-flight call,
/// and implementations must not silently retry.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Point read. `Ok(None)` signals an absent key, never an error.
    async fn read(&self, key: &str) -> Result<Option<u64>, StoreError>;

    /// Point write with a retention TTL.
    ///
    /// Retention must be at least the largest window the key can be summed
    /// into, so a day-window query can still read buckets up to 24h old.
    async fn write(&self, key: &str, value: u64, ttl: Duration) -> Result<(), StoreError>;

    /// Atomically add `delta` to the counter behind `key`, creating it at
    /// zero first if absent.
    async fn increment_by(&self, key: &str, delta: u64) -> Result<(), StoreError>;

    /// Sum the counters behind `keys` in a single round trip.
    ///
    /// Keys absent from the store contribute zero to the total. The read is
    /// not required to be a consistent snapshot across keys.
    async fn sum_keys(&self, keys: &[String]) -> Result<u64, StoreError>;

    /// Whether a live counter exists behind `key`.
    async fn exists(&self, key: &str) -> Result<bool, StoreError>;
}

#[async_trait]
impl<S: CounterStore + ?Sized> CounterStore for Arc<S> {
    async fn read(&self, key: &str) -> Result<Option<u64>, StoreError> {
        (**self).read(key).await
    }

    async fn write(&self, key: &str, value: u64, ttl: Duration) -> Result<(), StoreError> {
        (**self).write(key, value, ttl).await
    }

    async fn increment_by(&self, key: &str, delta: u64) -> Result<(), StoreError> {
        (**self).increment_by(key, delta).await
    }

    async fn sum_keys(&self, keys: &[String]) -> Result<u64, StoreError> {
        (**self).sum_keys(keys).await
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        (**self).exists(key).await
    }
}
