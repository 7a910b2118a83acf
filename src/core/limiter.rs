//! Rate limiter orchestration over a shared counter store.

use std::collections::HashMap;

use tracing::debug;

use super::LimitError;
use super::granularity::{Granularity, Limits, hour_stamp, minute_stamp, second_stamp};
use super::window::{bucket_key, decompose};
use crate::clock::{Clock, SystemClock};
use crate::store::CounterStore;

/// Multi-window rate limiter over a shared [`CounterStore`].
///
/// The limiter is stateless between calls apart from its immutable limit
/// table, so a single instance can be shared freely across tasks; all
/// mutable state lives in the store. Consistency is whatever the store
/// provides: [`check`](Self::check) reads many buckets in one batched call
/// that is not a snapshot, so concurrent writers may be partially visible.
///
/// # Example
///
/// ```
/// use std::collections::HashMap;
/// use tallygate::{Granularity, Limits, MemoryStore, RateLimiter};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), tallygate::LimitError> {
/// let limits = HashMap::from([(
///     "api_calls".to_string(),
///     Limits::new()
///         .with(Granularity::Minute, 100)
///         .with(Granularity::Day, 10_000),
/// )]);
/// let limiter = RateLimiter::new(MemoryStore::new(), limits);
///
/// limiter.record("api_calls", 1).await?;
/// let usage = limiter.check("api_calls", Granularity::Minute).await?;
/// assert!(usage <= 100);
/// # Ok(())
/// # }
/// ```
pub struct RateLimiter<S, C = SystemClock> {
    store: S,
    limits: HashMap<String, Limits>,
    clock: C,
}

impl<S: CounterStore> RateLimiter<S> {
    /// Create a limiter reading time from the system clock.
    pub fn new(store: S, limits: HashMap<String, Limits>) -> Self {
        Self::with_clock(store, limits, SystemClock::new())
    }
}

impl<S: CounterStore, C: Clock> RateLimiter<S, C> {
    /// Create a limiter with an explicit clock.
    pub fn with_clock(store: S, limits: HashMap<String, Limits>, clock: C) -> Self {
        Self {
            store,
            limits,
            clock,
        }
    }

    /// Record `amount` units of usage for `entity` at the current instant.
    ///
    /// Issues three sequential atomic increments, against the second-,
    /// minute-, and hour-granularity buckets in that order; day totals are
    /// derived at read time and never written. The first store failure
    /// aborts the call, and increments already applied are not rolled back:
    /// a failure after the minute increment leaves the second and minute
    /// buckets updated but not the hour bucket. This non-atomicity is a
    /// deliberate trade against transactional multi-key writes.
    ///
    /// # Errors
    ///
    /// [`LimitError::EntityNotConfigured`] if `entity` has no limit table
    /// entry (checked before any store call), or [`LimitError::Store`] for
    /// a failed increment.
    pub async fn record(&self, entity: &str, amount: u64) -> Result<(), LimitError> {
        if !self.limits.contains_key(entity) {
            return Err(LimitError::EntityNotConfigured(entity.to_string()));
        }

        let now = self.clock.now();
        for stamp in [second_stamp(now), minute_stamp(now), hour_stamp(now)] {
            self.store
                .increment_by(&bucket_key(entity, &stamp), amount)
                .await?;
        }

        debug!(entity, amount, "recorded usage");
        Ok(())
    }

    /// Compare usage over the trailing `granularity` window against the
    /// configured threshold, returning the observed usage on success.
    ///
    /// Decomposes the window ending at the current instant into bucket keys
    /// and sums them in a single batched store read. A sum strictly greater
    /// than the threshold fails with [`LimitError::LimitExceeded`]; a sum
    /// equal to the threshold still succeeds.
    ///
    /// # Errors
    ///
    /// [`LimitError::EntityNotConfigured`] / [`LimitError::LimitNotConfigured`]
    /// if the entity or its threshold for `granularity` is absent (both are
    /// checked before any store call), [`LimitError::LimitExceeded`] on an
    /// exceeded threshold, or [`LimitError::Store`] for a failed read.
    pub async fn check(&self, entity: &str, granularity: Granularity) -> Result<u64, LimitError> {
        let limits = self
            .limits
            .get(entity)
            .ok_or_else(|| LimitError::EntityNotConfigured(entity.to_string()))?;
        let threshold =
            limits
                .threshold(granularity)
                .ok_or_else(|| LimitError::LimitNotConfigured {
                    entity: entity.to_string(),
                    granularity,
                })?;

        let keys = decompose(entity, self.clock.now(), granularity);
        let usage = self.store.sum_keys(&keys).await?;

        if usage > threshold {
            debug!(entity, %granularity, usage, threshold, "limit exceeded");
            return Err(LimitError::LimitExceeded {
                entity: entity.to_string(),
                granularity,
                usage,
                threshold,
            });
        }

        debug!(entity, %granularity, usage, threshold, "within limit");
        Ok(usage)
    }
}
