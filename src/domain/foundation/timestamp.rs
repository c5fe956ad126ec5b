//! Timestamp value object for immutable points in time.

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use super::ValidationError;

/// Latest accepted channel timestamp, 9999-12-31T23:59:59.999Z.
pub const MAX_UNIX_MILLIS: i64 = 253_402_300_799_999;

/// Immutable point in time, always UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Creates a timestamp for the current moment.
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Returns the inner DateTime.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Creates a timestamp from Unix milliseconds, as sent by messaging channels.
    ///
    /// Accepts `0..=MAX_UNIX_MILLIS`; anything else is rejected.
    pub fn from_unix_millis(millis: i64) -> Result<Self, ValidationError> {
        if !(0..=MAX_UNIX_MILLIS).contains(&millis) {
            return Err(ValidationError::out_of_range("timestamp", 0, MAX_UNIX_MILLIS, millis));
        }
        Utc.timestamp_millis_opt(millis)
            .single()
            .map(Self)
            .ok_or_else(|| {
                ValidationError::invalid_format("timestamp", format!("{} is out of range", millis))
            })
    }

    /// Returns the timestamp as Unix milliseconds.
    pub fn as_unix_millis(&self) -> i64 {
        self.0.timestamp_millis()
    }

    /// Checks if this timestamp is before another.
    pub fn is_before(&self, other: &Timestamp) -> bool {
        self.0 < other.0
    }

    /// Checks if this timestamp is after another.
    pub fn is_after(&self, other: &Timestamp) -> bool {
        self.0 > other.0
    }

    /// Returns the duration from another timestamp to this one.
    ///
    /// Returns negative duration if other is after self.
    pub fn duration_since(&self, other: &Timestamp) -> Duration {
        self.0.signed_duration_since(other.0)
    }

    /// Whole seconds elapsed since `earlier`, saturating at zero.
    pub fn secs_since(&self, earlier: &Timestamp) -> u64 {
        self.duration_since(earlier).num_seconds().max(0) as u64
    }

    /// Creates a new timestamp by adding the specified number of seconds.
    pub fn plus_secs(&self, secs: u64) -> Self {
        self.plus(std::time::Duration::from_secs(secs))
    }

    /// Creates a new timestamp by adding the specified number of milliseconds.
    pub fn plus_millis(&self, millis: u64) -> Self {
        self.plus(std::time::Duration::from_millis(millis))
    }

    /// Saturates at the latest instant chrono can represent.
    fn plus(&self, delta: std::time::Duration) -> Self {
        Duration::from_std(delta)
            .ok()
            .and_then(|delta| self.0.checked_add_signed(delta))
            .map_or(Self(DateTime::<Utc>::MAX_UTC), Self)
    }

    /// Returns the later of two timestamps.
    pub fn max(self, other: Timestamp) -> Self {
        if other.0 > self.0 {
            other
        } else {
            self
        }
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    #[test]
    fn timestamp_now_creates_current_time() {
        let before = Utc::now();
        let ts = Timestamp::now();
        let after = Utc::now();

        assert!(ts.as_datetime() >= &before);
        assert!(ts.as_datetime() <= &after);
    }

    #[test]
    fn from_unix_millis_parses_channel_timestamps() {
        // 2024-01-15T00:00:00Z
        let ts = Timestamp::from_unix_millis(1_705_276_800_000).unwrap();
        assert_eq!(ts.as_datetime().year(), 2024);
        assert_eq!(ts.as_datetime().day(), 15);
        assert_eq!(ts.as_unix_millis(), 1_705_276_800_000);
    }

    #[test]
    fn from_unix_millis_rejects_unrepresentable_values() {
        assert!(Timestamp::from_unix_millis(i64::MAX).is_err());
    }

    #[test]
    fn from_unix_millis_rejects_values_outside_channel_range() {
        assert!(Timestamp::from_unix_millis(-1).is_err());
        assert!(Timestamp::from_unix_millis(MAX_UNIX_MILLIS + 1).is_err());
        let near_max = DateTime::<Utc>::MAX_UTC.timestamp_millis() - 500;
        assert!(Timestamp::from_unix_millis(near_max).is_err());
        assert!(Timestamp::from_unix_millis(MAX_UNIX_MILLIS).is_ok());
        assert!(Timestamp::from_unix_millis(0).is_ok());
    }

    #[test]
    fn additions_saturate_instead_of_overflowing() {
        let latest = Timestamp::from_unix_millis(MAX_UNIX_MILLIS).unwrap();
        let ceiling = Timestamp(DateTime::<Utc>::MAX_UTC);

        assert_eq!(latest.plus_secs(u64::MAX), ceiling);
        assert_eq!(latest.plus_millis(u64::MAX), ceiling);
        assert_eq!(ceiling.plus_millis(3_000), ceiling);
        assert!(latest.plus_secs(1800).is_after(&latest));
    }

    #[test]
    fn secs_since_saturates_at_zero() {
        let early = Timestamp::from_unix_millis(1_000_000).unwrap();
        let late = early.plus_secs(90);
        assert_eq!(late.secs_since(&early), 90);
        assert_eq!(early.secs_since(&late), 0);
    }

    #[test]
    fn plus_millis_adds_correctly() {
        let ts = Timestamp::from_unix_millis(5_000).unwrap();
        assert_eq!(ts.plus_millis(1_500).as_unix_millis(), 6_500);
    }

    #[test]
    fn max_returns_later_timestamp() {
        let a = Timestamp::from_unix_millis(1_000).unwrap();
        let b = Timestamp::from_unix_millis(2_000).unwrap();
        assert_eq!(a.max(b), b);
        assert_eq!(b.max(a), b);
    }

    #[test]
    fn timestamp_deserializes_from_json() {
        let json = "\"2024-01-15T10:30:00Z\"";
        let ts: Timestamp = serde_json::from_str(json).unwrap();

        assert_eq!(ts.as_datetime().year(), 2024);
    }

    #[test]
    fn timestamp_ordering_works() {
        let ts1 = Timestamp::from_unix_millis(10).unwrap();
        let ts2 = Timestamp::from_unix_millis(20).unwrap();

        assert!(ts1 < ts2);
        assert!(ts1.is_before(&ts2));
        assert!(ts2.is_after(&ts1));
    }
}
