//! Trailing-window decomposition into counter bucket keys.
//!
//! This is the heart of the crate: summing one bucket per elapsed second
//! would cost up to 86,400 reads for a day window. [`decompose`] instead
//! reuses coarser pre-aggregated buckets for the fully-contained middle of
//! the window and falls back to second precision only at the two edges
//! where "now" creates partial minutes and hours. A day window always needs
//! exactly 142 keys, an hour window 119.

use chrono::{DateTime, Duration, Timelike, Utc};

use super::granularity::{Granularity, hour_stamp, minute_stamp, second_stamp};

/// Compose a bucket key from an entity identifier and a bucket timestamp.
pub(crate) fn bucket_key(entity: &str, stamp: &str) -> String {
    format!("{entity}:{stamp}")
}

/// Decompose the trailing window of length `window` ending at `now` into
/// bucket keys for `entity`, oldest first.
///
/// The returned keys cover the half-open interval `(now - window, now)`
/// exactly: every elapsed second is counted once, either through its own
/// second bucket or through the single minute or hour bucket containing it.
/// The function is pure; identical inputs yield identical, identically
/// ordered keys.
///
/// Let `start = now - window`, with `s` and `m` its seconds and minutes
/// components:
///
/// - **Second**: the one second bucket at `start`.
/// - **Minute**: 60 second buckets, one per elapsed second.
/// - **Hour**: `60 - s` second buckets completing the starting minute, the
///   59 fully-contained minute buckets, then `s` second buckets leading up
///   to `now`, always 119 in total.
/// - **Day**: `60 - s` second buckets and `59 - m` minute buckets completing
///   the starting hour, 23 fully-contained hour buckets, then `m` minute and
///   `s` second buckets leading up to `now`, always 142 in total.
pub fn decompose(entity: &str, now: DateTime<Utc>, window: Granularity) -> Vec<String> {
    let start = now - Duration::seconds(window.as_secs() as i64);
    let mut keys = Vec::with_capacity(window.bucket_count());

    match window {
        Granularity::Second => {
            keys.push(bucket_key(entity, &second_stamp(start)));
        }
        Granularity::Minute => {
            for i in 0..60 {
                let stamp = second_stamp(start + Duration::seconds(i));
                keys.push(bucket_key(entity, &stamp));
            }
        }
        Granularity::Hour => {
            let s = i64::from(start.second());

            // Head: seconds completing the starting minute.
            for i in 0..(60 - s) {
                let stamp = second_stamp(start + Duration::seconds(i));
                keys.push(bucket_key(entity, &stamp));
            }
            // Middle: the 59 whole minutes between the partial edges.
            for i in 1..=59 {
                let stamp = minute_stamp(start + Duration::minutes(i));
                keys.push(bucket_key(entity, &stamp));
            }
            // Tail: seconds of the final partial minute, up to now.
            for i in (1..=s).rev() {
                let stamp = second_stamp(start + Duration::minutes(60) - Duration::seconds(i));
                keys.push(bucket_key(entity, &stamp));
            }
        }
        Granularity::Day => {
            let s = i64::from(start.second());
            let m = i64::from(start.minute());

            // Head: seconds completing the starting minute, then minutes
            // completing the starting hour.
            for i in 0..(60 - s) {
                let stamp = second_stamp(start + Duration::seconds(i));
                keys.push(bucket_key(entity, &stamp));
            }
            for i in 1..(60 - m) {
                let stamp = minute_stamp(start + Duration::minutes(i));
                keys.push(bucket_key(entity, &stamp));
            }
            // Middle: the 23 whole hours.
            for i in 1..=23 {
                let stamp = hour_stamp(start + Duration::hours(i));
                keys.push(bucket_key(entity, &stamp));
            }
            // Tail: minutes of the final partial hour, then seconds of the
            // final partial minute.
            for i in (1..=m).rev() {
                let stamp = minute_stamp(start + Duration::hours(24) - Duration::minutes(i));
                keys.push(bucket_key(entity, &stamp));
            }
            for i in (1..=s).rev() {
                let stamp = second_stamp(start + Duration::hours(24) - Duration::seconds(i));
                keys.push(bucket_key(entity, &stamp));
            }
        }
    }

    keys
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDateTime, TimeZone};
    use std::collections::HashSet;

    const ENTITY: &str = "m";

    fn scenario_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 2, 29, 23, 11, 11).unwrap()
    }

    /// Expand a bucket key back into the epoch seconds it covers.
    fn covered_seconds(key: &str) -> Vec<i64> {
        let stamp = key
            .strip_prefix(&format!("{ENTITY}:"))
            .expect("key carries the entity prefix");

        let (padded, span) = match stamp.len() {
            14 => (stamp.to_string(), 1),
            12 => (format!("{stamp}00"), 60),
            10 => (format!("{stamp}0000"), 3_600),
            other => panic!("unexpected stamp width {other}: {stamp}"),
        };

        let parsed = NaiveDateTime::parse_from_str(&padded, "%Y%m%d%H%M%S")
            .expect("stamp parses back to an instant");
        let base = parsed.and_utc().timestamp();
        (base..base + span).collect()
    }

    /// Assert exact, gap-free, duplicate-free coverage of `(now - w, now)`.
    fn assert_exact_coverage(now: DateTime<Utc>, window: Granularity) {
        let keys = decompose(ENTITY, now, window);

        let mut seconds = Vec::new();
        for key in &keys {
            seconds.extend(covered_seconds(key));
        }

        let unique: HashSet<_> = seconds.iter().copied().collect();
        assert_eq!(unique.len(), seconds.len(), "duplicate coverage in {window} window");

        let start = now.timestamp() - window.as_secs() as i64;
        let expected: HashSet<_> = (start..now.timestamp()).collect();
        assert_eq!(unique, expected, "coverage mismatch for {window} window at {now}");
    }

    #[test]
    fn sizes_are_invariant_across_clock_offsets() {
        for minute in [0, 1, 11, 37, 59] {
            for second in [0, 1, 29, 58, 59] {
                let now = Utc
                    .with_ymd_and_hms(2024, 2, 29, 23, minute, second)
                    .unwrap();

                for window in [
                    Granularity::Second,
                    Granularity::Minute,
                    Granularity::Hour,
                    Granularity::Day,
                ] {
                    let keys = decompose(ENTITY, now, window);
                    assert_eq!(
                        keys.len(),
                        window.bucket_count(),
                        "{window} window at :{minute:02}:{second:02}"
                    );
                }
            }
        }
    }

    #[test]
    fn coverage_is_exact_across_clock_offsets() {
        for (minute, second) in [(0, 0), (0, 59), (11, 11), (59, 0), (59, 59)] {
            let now = Utc
                .with_ymd_and_hms(2024, 2, 29, 23, minute, second)
                .unwrap();

            for window in [
                Granularity::Second,
                Granularity::Minute,
                Granularity::Hour,
                Granularity::Day,
            ] {
                assert_exact_coverage(now, window);
            }
        }
    }

    #[test]
    fn decomposition_is_deterministic() {
        let now = scenario_now();
        assert_eq!(
            decompose(ENTITY, now, Granularity::Day),
            decompose(ENTITY, now, Granularity::Day)
        );
    }

    #[test]
    fn second_window_is_the_previous_second() {
        let keys = decompose(ENTITY, scenario_now(), Granularity::Second);
        assert_eq!(keys, vec!["m:20240229231110".to_string()]);
    }

    #[test]
    fn minute_window_spans_the_trailing_sixty_seconds() {
        let keys = decompose(ENTITY, scenario_now(), Granularity::Minute);

        assert_eq!(keys.len(), 60);
        assert_eq!(keys.first().unwrap(), "m:20240229231011");
        assert_eq!(keys.last().unwrap(), "m:20240229231110");
    }

    #[test]
    fn hour_window_mixes_second_and_minute_buckets() {
        let keys = decompose(ENTITY, scenario_now(), Granularity::Hour);

        assert_eq!(keys.len(), 119);
        // start = 22:11:11, so 49 seconds complete the starting minute.
        assert_eq!(keys[0], "m:20240229221111");
        assert_eq!(keys[48], "m:20240229221159");
        assert_eq!(keys[49], "m:202402292212");
        assert_eq!(keys[107], "m:202402292310");
        // 11 tail seconds lead up to now.
        assert_eq!(keys[108], "m:20240229231100");
        assert_eq!(keys[118], "m:20240229231110");
    }

    #[test]
    fn day_window_spans_the_leap_day_boundary() {
        let keys = decompose(ENTITY, scenario_now(), Granularity::Day);

        assert_eq!(keys.len(), 142);
        assert_eq!(keys.first().unwrap(), "m:20240228231111");
        assert_eq!(keys.last().unwrap(), "m:20240229231110");

        // 49 head seconds, 48 head minutes, 23 hours, 11 tail minutes,
        // 11 tail seconds.
        assert_eq!(keys[48], "m:20240228231159");
        assert_eq!(keys[49], "m:202402282312");
        assert_eq!(keys[96], "m:202402282359");
        assert_eq!(keys[97], "m:2024022900");
        assert_eq!(keys[119], "m:2024022922");
        assert_eq!(keys[120], "m:202402292300");
        assert_eq!(keys[130], "m:202402292310");
        assert_eq!(keys[131], "m:20240229231100");
    }

    #[test]
    fn aligned_clock_produces_no_partial_edges() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();

        let hour = decompose(ENTITY, now, Granularity::Hour);
        assert_eq!(hour.len(), 119);
        // 60 head seconds, then 59 whole minutes, no tail.
        assert_eq!(hour[0], "m:20240301110000");
        assert_eq!(hour[59], "m:20240301110059");
        assert_eq!(hour[60], "m:202403011101");
        assert_eq!(hour[118], "m:202403011159");

        let day = decompose(ENTITY, now, Granularity::Day);
        assert_eq!(day.len(), 142);
        // 60 head seconds, 59 head minutes, then 23 whole hours, no tail.
        assert_eq!(day[0], "m:20240229120000");
        assert_eq!(day[60], "m:202402291201");
        assert_eq!(day[118], "m:202402291259");
        assert_eq!(day[119], "m:2024022913");
        assert_eq!(day[141], "m:2024030111");
    }

    #[test]
    fn keys_carry_the_entity_prefix() {
        let keys = decompose("api_calls", scenario_now(), Granularity::Minute);
        assert!(keys.iter().all(|key| key.starts_with("api_calls:")));
    }
}
