//! Redis-backed counter store.
//!
//! Counters live in a shared Redis keyspace so that every process checking
//! or recording usage sees the same trailing-window totals. The store uses
//! `redis::aio::ConnectionManager`, which multiplexes one connection and is
//! cheap to clone per call.
//!
//! Increments are pipelined `INCRBY` + `EXPIRE` inside MULTI/EXEC, so every
//! write refreshes the retention TTL. Batched sums are a single `MGET`;
//! absent keys come back nil and contribute zero.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client, RedisError};

use super::{CounterStore, StoreError};

impl From<RedisError> for StoreError {
    fn from(err: RedisError) -> Self {
        StoreError::Backend(err.to_string())
    }
}

/// Configuration for [`RedisStore`].
#[derive(Debug, Clone)]
pub struct RedisStoreConfig {
    /// Prefix prepended to every counter key, separating this limiter's
    /// keyspace from other users of the same Redis (default: `"tallygate:"`).
    pub key_prefix: String,
    /// Retention applied to counters on every write (default: 25 hours,
    /// comfortably above the largest supported window).
    pub ttl: Duration,
}

impl Default for RedisStoreConfig {
    fn default() -> Self {
        Self {
            key_prefix: "tallygate:".to_string(),
            ttl: Duration::from_secs(25 * 60 * 60),
        }
    }
}

/// Counter store backed by a shared Redis instance.
///
/// `INCRBY` is atomic on the server, which is what makes concurrent
/// [`record`](crate::RateLimiter::record) calls from many processes safe
/// without any client-side locking.
#[derive(Clone)]
pub struct RedisStore {
    connection: ConnectionManager,
    config: RedisStoreConfig,
}

impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl RedisStore {
    /// Connect with the default configuration.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        Self::connect_with_config(url, RedisStoreConfig::default()).await
    }

    /// Connect with a custom key prefix and TTL.
    pub async fn connect_with_config(
        url: &str,
        config: RedisStoreConfig,
    ) -> Result<Self, StoreError> {
        let client = Client::open(url)?;
        let connection = ConnectionManager::new(client).await?;
        Ok(Self { connection, config })
    }

    fn key(&self, key: &str) -> String {
        format!("{}{}", self.config.key_prefix, key)
    }
}

#[async_trait]
impl CounterStore for RedisStore {
    async fn read(&self, key: &str) -> Result<Option<u64>, StoreError> {
        let mut conn = self.connection.clone();
        let value: Option<u64> = conn.get(self.key(key)).await?;
        Ok(value)
    }

    async fn write(&self, key: &str, value: u64, ttl: Duration) -> Result<(), StoreError> {
        let mut conn = self.connection.clone();
        conn.set_ex::<_, _, ()>(self.key(key), value, ttl.as_secs())
            .await?;
        Ok(())
    }

    async fn increment_by(&self, key: &str, delta: u64) -> Result<(), StoreError> {
        let key = self.key(key);
        let ttl_secs = self.config.ttl.as_secs() as i64;
        let mut conn = self.connection.clone();

        let _: () = redis::pipe()
            .atomic()
            .incr(&key, delta)
            .ignore()
            .expire(&key, ttl_secs)
            .ignore()
            .query_async(&mut conn)
            .await?;

        tracing::trace!(key = %key, delta, "incremented counter");
        Ok(())
    }

    async fn sum_keys(&self, keys: &[String]) -> Result<u64, StoreError> {
        if keys.is_empty() {
            return Ok(0);
        }

        let prefixed: Vec<String> = keys.iter().map(|key| self.key(key)).collect();
        let mut conn = self.connection.clone();
        let values: Vec<Option<u64>> = conn.mget(&prefixed).await?;

        Ok(values
            .into_iter()
            .flatten()
            .fold(0u64, |total, value| total.saturating_add(value)))
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        let mut conn = self.connection.clone();
        Ok(conn.exists(self.key(key)).await?)
    }
}
