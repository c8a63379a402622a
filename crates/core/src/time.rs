use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid completion time (expected RFC3339): {raw:?}")]
pub struct ClockError {
    pub raw: String,
}

/// Source of completion timestamps.
///
/// `Pinned` stamps every completion with the same instant: tests use it, and
/// so does the CLI when given `--now`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Clock {
    #[default]
    System,
    Pinned(DateTime<Utc>),
}

impl Clock {
    #[must_use]
    pub fn fixed(at: DateTime<Utc>) -> Self {
        Self::Pinned(at)
    }

    /// Pin the clock to an RFC3339 timestamp such as `2024-03-01T14:30:00-03:00`.
    ///
    /// # Errors
    ///
    /// Returns `ClockError` if `raw` is not RFC3339.
    pub fn pinned_at(raw: &str) -> Result<Self, ClockError> {
        DateTime::parse_from_rfc3339(raw.trim())
            .map(|at| Self::Pinned(at.with_timezone(&Utc)))
            .map_err(|_| ClockError {
                raw: raw.to_owned(),
            })
    }

    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        match self {
            Clock::System => Utc::now(),
            Clock::Pinned(at) => *at,
        }
    }
}

/// 2023-11-14T22:13:20Z, the instant test completions are stamped with.
#[must_use]
pub fn fixed_now() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap_or_default()
}

#[must_use]
pub fn fixed_clock() -> Clock {
    Clock::fixed(fixed_now())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pinned_clock_parses_offsets_into_utc() {
        let clock = Clock::pinned_at("2024-03-01T14:30:00-03:00").unwrap();
        assert_eq!(clock.now().to_rfc3339(), "2024-03-01T17:30:00+00:00");
        assert_eq!(clock.now(), clock.now());
    }

    #[test]
    fn pinned_clock_rejects_other_formats() {
        let err = Clock::pinned_at("01/03/2024").unwrap_err();
        assert_eq!(err.raw, "01/03/2024");
    }

    #[test]
    fn fixed_clock_uses_test_instant() {
        assert_eq!(fixed_clock().now().timestamp(), 1_700_000_000);
    }
}
