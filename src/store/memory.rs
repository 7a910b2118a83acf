//! In-process counter store.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use super::{CounterStore, StoreError};

#[derive(Debug, Clone, Copy)]
struct Entry {
    value: u64,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Retention applied to increment-created counters, comfortably above the
/// largest supported window.
const DEFAULT_RETENTION: Duration = Duration::from_secs(25 * 60 * 60);

/// Mutex-guarded counter map with lazy TTL expiry.
///
/// Suitable for tests and for single-process deployments that do not need
/// counters shared across instances. Every increment refreshes the
/// counter's retention TTL (25 hours by default, see
/// [`with_retention`](Self::with_retention)); expired entries are dropped
/// on access rather than by a background sweeper.
#[derive(Debug)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Entry>>,
    retention: Duration,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::with_retention(DEFAULT_RETENTION)
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store with a custom retention TTL for increment-created
    /// counters. Retention must be at least the largest window the
    /// counters can be summed into.
    pub fn with_retention(retention: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            retention,
        }
    }

    fn live_value(&self, key: &str) -> Option<u64> {
        let now = Instant::now();
        let mut entries = self.lock();
        match entries.get(key) {
            Some(entry) if entry.is_expired(now) => {
                entries.remove(key);
                None
            }
            Some(entry) => Some(entry.value),
            None => None,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Entry>> {
        // A poisoned lock only means another thread panicked mid-insert;
        // the map itself is still usable.
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl CounterStore for MemoryStore {
    async fn read(&self, key: &str) -> Result<Option<u64>, StoreError> {
        Ok(self.live_value(key))
    }

    async fn write(&self, key: &str, value: u64, ttl: Duration) -> Result<(), StoreError> {
        let entry = Entry {
            value,
            expires_at: Instant::now().checked_add(ttl),
        };
        self.lock().insert(key.to_string(), entry);
        Ok(())
    }

    async fn increment_by(&self, key: &str, delta: u64) -> Result<(), StoreError> {
        let now = Instant::now();
        let expires_at = now.checked_add(self.retention);
        let mut entries = self.lock();
        entries
            .entry(key.to_string())
            .and_modify(|entry| {
                if entry.is_expired(now) {
                    entry.value = 0;
                }
                entry.value = entry.value.saturating_add(delta);
                entry.expires_at = expires_at;
            })
            .or_insert(Entry {
                value: delta,
                expires_at,
            });
        Ok(())
    }

    async fn sum_keys(&self, keys: &[String]) -> Result<u64, StoreError> {
        let mut total = 0u64;
        for key in keys {
            if let Some(value) = self.live_value(key) {
                total = total.saturating_add(value);
            }
        }
        Ok(total)
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.live_value(key).is_some())
    }
}
