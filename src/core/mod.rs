//! Core components of the tallygate rate limiting library
//!
//! This module contains the fundamental building blocks:
//! - [`granularity`]: time resolutions, bucket timestamp formats, limit tables
//! - [`window`]: trailing-window decomposition into bucket keys
//! - [`limiter`]: the record/check orchestration over a counter store

pub mod granularity;
pub mod limiter;
pub mod window;


pub use granularity::{Granularity, Limits};
pub use limiter::RateLimiter;
pub use window::decompose;

use thiserror::Error;

use crate::store::StoreError;

/// Errors surfaced by [`RateLimiter`] operations.
#[derive(Debug, Error)]
pub enum LimitError {
    /// The entity has no entry in the limit table.
    #[error("entity not configured: {0}")]
    EntityNotConfigured(String),

    /// The entity is known but carries no threshold for this granularity.
    #[error("no {granularity} limit configured for entity {entity}")]
    LimitNotConfigured {
        entity: String,
        granularity: Granularity,
    },

    /// Observed usage over the trailing window exceeds the threshold.
    ///
    /// Callers decide what to do with this signal; the limiter itself does
    /// not admit or block anything.
    #[error("limit exceeded for {entity} over the trailing {granularity}: {usage} > {threshold}")]
    LimitExceeded {
        entity: String,
        granularity: Granularity,
        usage: u64,
        threshold: u64,
    },

    /// Counter store failure, passed through verbatim.
    #[error(transparent)]
    Store(#[from] StoreError),
}
