//! Time granularities and per-entity limit tables.
//!
//! A [`Granularity`] is one of the four fixed resolutions the limiter reasons
//! about. Second, minute, and hour buckets are materialized in the counter
//! store; a day is only ever a window length, derived from finer buckets.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};

pub(crate) const SECOND_FORMAT: &str = "%Y%m%d%H%M%S";
pub(crate) const MINUTE_FORMAT: &str = "%Y%m%d%H%M";
pub(crate) const HOUR_FORMAT: &str = "%Y%m%d%H";

/// A time resolution the limiter stores or evaluates windows over.
///
/// Ordering follows coarseness (`Second < Minute < Hour < Day`), so the
/// coarsest configured granularity for an entity is simply the maximum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Granularity {
    Second,
    Minute,
    Hour,
    Day,
}

impl Granularity {
    /// Canonical length of this granularity in seconds.
    pub const fn as_secs(self) -> u64 {
        match self {
            Granularity::Second => 1,
            Granularity::Minute => 60,
            Granularity::Hour => 3_600,
            Granularity::Day => 86_400,
        }
    }

    /// Number of bucket keys a trailing window of this length decomposes
    /// into, independent of the clock's second/minute offsets.
    ///
    /// The hour count is `(60 - s) + 59 + s = 119` and the day count is
    /// `(60 - s) + (59 - m) + 23 + m + s = 142`: the partial-bucket terms
    /// cancel, so the fan-out per [`decompose`](crate::core::window::decompose)
    /// call is a small constant rather than the window length in seconds.
    pub const fn bucket_count(self) -> usize {
        match self {
            Granularity::Second => 1,
            Granularity::Minute => 60,
            Granularity::Hour => 119,
            Granularity::Day => 142,
        }
    }

    /// Bucket timestamp for `instant`, truncated to this resolution.
    ///
    /// Returns `None` for [`Granularity::Day`]: day totals are derived from
    /// finer buckets and no day bucket is ever persisted. Timestamps of the
    /// same granularity compare lexicographically in temporal order.
    pub fn bucket_stamp(self, instant: DateTime<Utc>) -> Option<String> {
        match self {
            Granularity::Second => Some(second_stamp(instant)),
            Granularity::Minute => Some(minute_stamp(instant)),
            Granularity::Hour => Some(hour_stamp(instant)),
            Granularity::Day => None,
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Granularity::Second => "second",
            Granularity::Minute => "minute",
            Granularity::Hour => "hour",
            Granularity::Day => "day",
        };
        f.write_str(name)
    }
}

pub(crate) fn second_stamp(instant: DateTime<Utc>) -> String {
    instant.format(SECOND_FORMAT).to_string()
}

pub(crate) fn minute_stamp(instant: DateTime<Utc>) -> String {
    instant.format(MINUTE_FORMAT).to_string()
}

pub(crate) fn hour_stamp(instant: DateTime<Utc>) -> String {
    instant.format(HOUR_FORMAT).to_string()
}

/// Per-entity thresholds, keyed by granularity.
///
/// Built once at limiter construction and immutable afterwards. An entity
/// may be known to the limiter while carrying no threshold for a given
/// granularity; [`RateLimiter::check`](crate::RateLimiter::check) reports
/// the two cases distinctly.
///
/// # Example
///
/// ```
/// use tallygate::{Granularity, Limits};
///
/// let limits = Limits::new()
///     .with(Granularity::Second, 5)
///     .with(Granularity::Day, 300);
///
/// assert_eq!(limits.threshold(Granularity::Second), Some(5));
/// assert_eq!(limits.threshold(Granularity::Hour), None);
/// assert_eq!(limits.coarsest(), Some(Granularity::Day));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Limits(BTreeMap<Granularity, u64>);

impl Limits {
    /// Create an empty threshold table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the threshold for a granularity, replacing any previous value.
    pub fn with(mut self, granularity: Granularity, threshold: u64) -> Self {
        self.0.insert(granularity, threshold);
        self
    }

    /// Threshold configured for `granularity`, if any.
    pub fn threshold(&self, granularity: Granularity) -> Option<u64> {
        self.0.get(&granularity).copied()
    }

    /// The coarsest granularity carrying a threshold.
    ///
    /// Useful for sizing store retention: counters must outlive the largest
    /// window they can be summed into.
    pub fn coarsest(&self) -> Option<Granularity> {
        self.0.last_key_value().map(|(granularity, _)| *granularity)
    }

    /// Whether no granularity carries a threshold.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(Granularity, u64)> for Limits {
    fn from_iter<I: IntoIterator<Item = (Granularity, u64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn canonical_lengths() {
        assert_eq!(Granularity::Second.as_secs(), 1);
        assert_eq!(Granularity::Minute.as_secs(), 60);
        assert_eq!(Granularity::Hour.as_secs(), 3_600);
        assert_eq!(Granularity::Day.as_secs(), 86_400);
    }

    #[test]
    fn ordering_follows_coarseness() {
        assert!(Granularity::Second < Granularity::Minute);
        assert!(Granularity::Minute < Granularity::Hour);
        assert!(Granularity::Hour < Granularity::Day);
    }

    #[test]
    fn stamps_truncate_to_resolution() {
        let instant = Utc.with_ymd_and_hms(2024, 2, 29, 23, 11, 11).unwrap();

        assert_eq!(
            Granularity::Second.bucket_stamp(instant).unwrap(),
            "20240229231111"
        );
        assert_eq!(
            Granularity::Minute.bucket_stamp(instant).unwrap(),
            "202402292311"
        );
        assert_eq!(
            Granularity::Hour.bucket_stamp(instant).unwrap(),
            "2024022923"
        );
    }

    #[test]
    fn day_has_no_stored_form() {
        let instant = Utc.with_ymd_and_hms(2024, 2, 29, 23, 11, 11).unwrap();
        assert_eq!(Granularity::Day.bucket_stamp(instant), None);
    }

    #[test]
    fn stamps_order_lexicographically() {
        let earlier = Utc.with_ymd_and_hms(2024, 2, 28, 23, 59, 59).unwrap();
        let later = Utc.with_ymd_and_hms(2024, 2, 29, 0, 0, 0).unwrap();

        assert!(second_stamp(earlier) < second_stamp(later));
        assert!(minute_stamp(earlier) < minute_stamp(later));
        assert!(hour_stamp(earlier) < hour_stamp(later));
    }

    #[test]
    fn limits_distinguish_missing_entries() {
        let limits = Limits::new().with(Granularity::Minute, 10);

        assert_eq!(limits.threshold(Granularity::Minute), Some(10));
        assert_eq!(limits.threshold(Granularity::Day), None);
        assert!(!limits.is_empty());
        assert!(Limits::new().is_empty());
    }

    #[test]
    fn coarsest_is_the_maximum_granularity() {
        let limits = Limits::new()
            .with(Granularity::Hour, 30)
            .with(Granularity::Second, 5);

        assert_eq!(limits.coarsest(), Some(Granularity::Hour));
        assert_eq!(Limits::new().coarsest(), None);
    }
}
