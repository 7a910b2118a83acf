//! # tallygate
//!
//! Multi-window rate limiting over a shared counter store.
//!
//! ## Overview
//!
//! tallygate enforces per-entity usage caps over trailing time windows of
//! one second, one minute, one hour, and one day. Counters live in an
//! external key-value store (Redis in production, an in-process map for
//! tests), so many processes share one consistent view of recent usage
//! without keeping local state.
//!
//! Recording writes second-, minute-, and hour-granularity buckets.
//! Checking decomposes the requested window into the minimal set of bucket
//! keys whose sum equals usage over that window: a day window reads 142
//! buckets instead of 86,400 by reusing coarse buckets for the middle of
//! the window and second buckets at its partial edges. See
//! [`decompose`] for the arithmetic.
//!
//! ## Quick Start
//!
//! ```
//! use std::collections::HashMap;
//! use tallygate::{Granularity, Limits, MemoryStore, RateLimiter};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), tallygate::LimitError> {
//! let limits = HashMap::from([(
//!     "search_queries".to_string(),
//!     Limits::new()
//!         .with(Granularity::Second, 5)
//!         .with(Granularity::Minute, 100)
//!         .with(Granularity::Day, 50_000),
//! )]);
//!
//! let limiter = RateLimiter::new(MemoryStore::new(), limits);
//!
//! limiter.record("search_queries", 1).await?;
//!
//! match limiter.check("search_queries", Granularity::Minute).await {
//!     Ok(usage) => println!("within limit, {usage} used"),
//!     Err(tallygate::LimitError::LimitExceeded { usage, threshold, .. }) => {
//!         println!("over limit: {usage} > {threshold}");
//!     }
//!     Err(err) => return Err(err),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Counter stores
//!
//! Any [`CounterStore`] works as a backend. The crate ships two:
//!
//! - [`MemoryStore`]: in-process, for tests and single-instance services.
//! - `RedisStore` (feature `redis`): shared counters across processes,
//!   pipelined `INCRBY`/`EXPIRE` writes and one `MGET` per check.
//!
//! ## Consistency
//!
//! The limiter relies on the store's atomic increment for write safety and
//! adds no locking. Batched reads are not snapshots: a check racing with
//! writers may observe a state that never existed at any single instant.
//! Record's three increments are sequential and not transactional; a
//! mid-sequence failure leaves earlier buckets updated. Both trade-offs are
//! deliberate and documented on [`RateLimiter`].
//!
//! ## Features
//!
//! - `redis`: enable the Redis-backed counter store

pub mod clock;
pub mod core;
pub mod store;

pub use crate::clock::{Clock, FixedClock, SystemClock};
pub use crate::core::{Granularity, LimitError, Limits, RateLimiter, decompose};
#[cfg(feature = "redis")]
pub use crate::store::{RedisStore, RedisStoreConfig};
pub use crate::store::{CounterStore, MemoryStore, StoreError};
