//! Timestamp conversion helpers.

use chrono::{DateTime, Utc};

/// Convert remote epoch seconds into a UTC timestamp.
///
/// Out-of-range values (the remote service should never produce them)
/// clamp to the epoch rather than failing the whole batch.
pub(crate) fn datetime_from_epoch(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_epoch_seconds() {
        let ts = datetime_from_epoch(1_593_500_000);
        assert_eq!(ts.to_rfc3339(), "2020-06-30T06:53:20+00:00");
    }

    #[test]
    fn out_of_range_clamps_to_epoch() {
        assert_eq!(datetime_from_epoch(i64::MAX).timestamp(), 0);
    }
}
