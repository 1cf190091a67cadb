//! Timestamp utilities

use chrono::{DateTime, Duration, Timelike, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Truncate a timestamp down to the start of its minute bucket.
pub fn truncate_to_minute(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .expect("zero is a valid second and nanosecond")
}

/// Start of the minute bucket following the given timestamp's bucket.
pub fn next_minute(ts: DateTime<Utc>) -> DateTime<Utc> {
    truncate_to_minute(ts) + Duration::minutes(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> DateTime<Utc> {
        s.parse().expect("valid RFC 3339 timestamp")
    }

    #[test]
    fn truncate_drops_seconds_and_subseconds() {
        assert_eq!(
            truncate_to_minute(ts("2026-08-06T10:17:42.123Z")),
            ts("2026-08-06T10:17:00Z")
        );
    }

    #[test]
    fn truncate_is_idempotent() {
        let minute = ts("2026-08-06T10:17:00Z");
        assert_eq!(truncate_to_minute(minute), minute);
    }

    #[test]
    fn next_minute_advances_bucket() {
        assert_eq!(
            next_minute(ts("2026-08-06T23:59:30Z")),
            ts("2026-08-07T00:00:00Z")
        );
    }
}
