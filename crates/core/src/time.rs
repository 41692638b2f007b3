use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use thiserror::Error;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TimeError {
    #[error("invalid ISO-8601 timestamp: {0}")]
    InvalidTimestamp(String),
}

//
// ─── TIMESTAMP NORMALIZATION ───────────────────────────────────────────────────
//

/// Parse an ISO-8601 timestamp into a UTC instant.
///
/// Timestamps with an explicit offset are converted to UTC; timestamps
/// without one are interpreted as already-UTC. The same normalization is
/// applied to stored start times and caller-supplied end times so that a
/// duration subtraction never mixes offsets.
///
/// # Errors
///
/// Returns `TimeError::InvalidTimestamp` if the input parses as neither
/// an offset-carrying nor a naive ISO-8601 datetime.
pub fn parse_utc(raw: &str) -> Result<DateTime<Utc>, TimeError> {
    let trimmed = raw.trim();

    if let Ok(with_offset) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(with_offset.with_timezone(&Utc));
    }

    // No offset: accept a naive datetime and treat it as UTC.
    trimmed
        .parse::<NaiveDateTime>()
        .map(|naive| naive.and_utc())
        .map_err(|_| TimeError::InvalidTimestamp(raw.to_string()))
}

//
// ─── CLOCK ─────────────────────────────────────────────────────────────────────
//

/// A simple clock abstraction for deterministic time in services and tests.
#[derive(Debug, Clone, Copy, Default)]
pub enum Clock {
    #[default]
    Default,
    Fixed(DateTime<Utc>),
}

impl Clock {
    /// Returns a clock that uses the current system time.
    #[must_use]
    pub fn default_clock() -> Self {
        Self::Default
    }

    /// Returns a clock fixed at the given timestamp.
    #[must_use]
    pub fn fixed(at: DateTime<Utc>) -> Self {
        Self::Fixed(at)
    }

    /// Returns the current time according to the clock.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        match self {
            Clock::Default => Utc::now(),
            Clock::Fixed(t) => *t,
        }
    }

    /// If this is a fixed clock, advance it by the given duration.
    ///
    /// Has no effect on `Clock::Default`.
    pub fn advance(&mut self, delta: Duration) {
        if let Clock::Fixed(t) = self {
            *t += delta;
        }
    }
}

/// Deterministic timestamp for tests and examples (2023-11-14T22:13:20Z).
pub const FIXED_TEST_TIMESTAMP: i64 = 1_700_000_000;

/// Returns a deterministic `DateTime<Utc>` for tests and doc examples.
///
/// # Panics
///
/// Panics if the fixed timestamp cannot be represented.
#[must_use]
pub fn fixed_now() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(FIXED_TEST_TIMESTAMP, 0)
        .expect("fixed timestamp should be valid")
}

/// Returns a `Clock` fixed at the deterministic test timestamp.
#[must_use]
pub fn fixed_clock() -> Clock {
    Clock::fixed(fixed_now())
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parses_explicit_utc_offset() {
        let parsed = parse_utc("2024-01-01T10:00:00Z").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap());
    }

    #[test]
    fn converts_non_utc_offsets() {
        let parsed = parse_utc("2024-01-01T11:00:00+01:00").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap());
    }

    #[test]
    fn naive_timestamps_are_treated_as_utc() {
        let parsed = parse_utc("2024-01-01T10:00:00").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap());

        // Fractional seconds without an offset, as emitted by the original
        // session records.
        let parsed = parse_utc("2024-01-01T10:00:00.250000").unwrap();
        assert_eq!(parsed.timestamp(), 1_704_103_200);
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(
            parse_utc("not-a-time"),
            Err(TimeError::InvalidTimestamp(_))
        ));
    }

    #[test]
    fn fixed_clock_advances() {
        let mut clock = fixed_clock();
        let before = clock.now();
        clock.advance(Duration::minutes(3));
        assert_eq!(clock.now(), before + Duration::minutes(3));
    }
}
