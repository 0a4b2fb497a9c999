//! Login events, the raw input of the retention pipeline.
//!
//! An [`Event`] is one authentication of one user at an absolute instant.
//! Events carry no time zone; calendar dates are only assigned during
//! aggregation, after converting the instant into the requested zone.

use chrono::{DateTime, NaiveDate, Offset as _, TimeZone as _, Utc};
use chrono_tz::Tz;

use crate::error::RetentionError;

/// One login of `user_id` at `timestamp`.
///
/// The user identifier is opaque: any hashable, comparable type works.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event<U> {
    pub timestamp: DateTime<Utc>,
    pub user_id: U,
}

impl<U> Event<U> {
    #[must_use]
    pub fn new(timestamp: DateTime<Utc>, user_id: U) -> Self {
        Self { timestamp, user_id }
    }

    /// Builds an event from a UNIX timestamp in seconds.
    ///
    /// # Examples
    ///
    /// ```
    /// use retention_analysis::event::Event;
    ///
    /// let event = Event::from_epoch_seconds(1_700_000_000, "u1").unwrap();
    /// assert_eq!(event.timestamp.to_rfc3339(), "2023-11-14T22:13:20+00:00");
    ///
    /// assert!(Event::from_epoch_seconds(i64::MAX, "u1").is_err());
    /// ```
    pub fn from_epoch_seconds(seconds: i64, user_id: U) -> Result<Self, RetentionError> {
        let timestamp = DateTime::from_timestamp(seconds, 0).ok_or_else(|| {
            RetentionError::malformed(format!("timestamp {seconds} is out of range"))
        })?;
        Ok(Self::new(timestamp, user_id))
    }

    /// Calendar date of this event in `timezone`.
    ///
    /// Fails with [`RetentionError::MalformedInput`] if the local time falls
    /// outside the representable calendar, which only happens at the very
    /// ends of the supported timestamp range.
    pub fn local_date(&self, timezone: Tz) -> Result<NaiveDate, RetentionError> {
        let utc = self.timestamp.naive_utc();
        let offset = timezone.offset_from_utc_datetime(&utc).fix();
        utc.checked_add_offset(offset)
            .map(|local| local.date())
            .ok_or_else(|| {
                RetentionError::malformed(format!(
                    "timestamp {} has no calendar date in {}",
                    self.timestamp.timestamp(),
                    timezone.name()
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone as _;

    use super::*;

    #[test]
    fn test_local_date_follows_timezone() {
        // 23:30 UTC on Jan 9 is already Jan 10 in Berlin (UTC+1 in winter)
        let event = Event::new(Utc.with_ymd_and_hms(2024, 1, 9, 23, 30, 0).unwrap(), 1);
        let berlin: Tz = "Europe/Berlin".parse().unwrap();

        assert_eq!(
            event.local_date(Tz::UTC).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 9).unwrap()
        );
        assert_eq!(
            event.local_date(berlin).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 10).unwrap()
        );
    }

    #[test]
    fn test_local_date_west_of_utc() {
        let event = Event::new(Utc.with_ymd_and_hms(2024, 7, 1, 3, 0, 0).unwrap(), 1);
        let new_york: Tz = "America/New_York".parse().unwrap();
        assert_eq!(
            event.local_date(new_york).unwrap(),
            NaiveDate::from_ymd_opt(2024, 6, 30).unwrap()
        );
    }

    #[test]
    fn test_from_epoch_seconds_rejects_out_of_range() {
        let err = Event::from_epoch_seconds(i64::MIN, ()).unwrap_err();
        assert!(matches!(err, RetentionError::MalformedInput { .. }));
    }

    #[test]
    fn test_from_epoch_seconds_negative_is_before_epoch() {
        let event = Event::from_epoch_seconds(-86_400, ()).unwrap();
        assert_eq!(
            event.local_date(Tz::UTC).unwrap(),
            NaiveDate::from_ymd_opt(1969, 12, 31).unwrap()
        );
    }

    #[test]
    fn test_calendar_edges_are_errors_not_panics() {
        let berlin: Tz = "Europe/Berlin".parse().unwrap();
        let latest = Event::from_epoch_seconds(DateTime::<Utc>::MAX_UTC.timestamp(), ()).unwrap();
        assert!(matches!(
            latest.local_date(berlin),
            Err(RetentionError::MalformedInput { .. })
        ));
        assert!(latest.local_date(Tz::UTC).is_ok());

        let new_york: Tz = "America/New_York".parse().unwrap();
        let earliest = Event::new(DateTime::<Utc>::MIN_UTC, ());
        assert!(matches!(
            earliest.local_date(new_york),
            Err(RetentionError::MalformedInput { .. })
        ));
    }
}
