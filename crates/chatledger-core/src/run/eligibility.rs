//! Cache run eligibility rules.
//!
//! Evaluated at creation time only; a run that is rejected leaves no
//! record behind. The trailing-day exclusion lives in the repository
//! because it has to be checked-and-created atomically against
//! concurrent requests.

use chrono::{DateTime, Utc};

/// A reason a cache run may not be created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EligibilityError {
    /// Start time is in the future.
    StartInFuture,
    /// Supplied end time is not after the start time.
    EndBeforeStart,
    /// Another run for the group started within the trailing 24 hours.
    AlreadyCachedToday,
}

impl EligibilityError {
    /// Get human-readable error message.
    #[must_use]
    pub const fn message(&self) -> &'static str {
        match self {
            Self::StartInFuture => "start time must be in the past",
            Self::EndBeforeStart => "end time must be after start time",
            Self::AlreadyCachedToday => "group can only cache messages once per day",
        }
    }

    /// Get the field name this error relates to.
    #[must_use]
    pub const fn field(&self) -> &'static str {
        match self {
            Self::StartInFuture => "started_at",
            Self::EndBeforeStart => "ended_at",
            Self::AlreadyCachedToday => "group",
        }
    }
}

impl std::fmt::Display for EligibilityError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for EligibilityError {}

/// Validate a run's time window against the clock.
///
/// Returns every violated rule, not just the first.
///
/// # Errors
///
/// Returns the violated rules if the start time is in the future or a
/// supplied end time is not after the start time.
pub fn validate_window(
    started_at: DateTime<Utc>,
    ended_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Result<(), Vec<EligibilityError>> {
    let mut errors = Vec::new();

    if started_at > now {
        errors.push(EligibilityError::StartInFuture);
    }
    if let Some(ended) = ended_at
        && ended <= started_at
    {
        errors.push(EligibilityError::EndBeforeStart);
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Duration;

    use super::*;

    #[test]
    fn accepts_past_start_with_no_end() {
        let now = Utc::now();
        assert!(validate_window(now - Duration::seconds(1), None, now).is_ok());
    }

    #[test]
    fn rejects_future_start() {
        let now = Utc::now();
        let errors = validate_window(now + Duration::seconds(5), None, now).unwrap_err();
        assert_eq!(errors, vec![EligibilityError::StartInFuture]);
    }

    #[test]
    fn rejects_end_at_or_before_start() {
        let now = Utc::now();
        let start = now - Duration::minutes(10);

        let errors = validate_window(start, Some(start), now).unwrap_err();
        assert_eq!(errors, vec![EligibilityError::EndBeforeStart]);

        assert!(validate_window(start, Some(start + Duration::seconds(1)), now).is_ok());
    }

    #[test]
    fn collects_every_violation() {
        let now = Utc::now();
        let start = now + Duration::minutes(1);
        let errors = validate_window(start, Some(start - Duration::minutes(2)), now).unwrap_err();
        assert_eq!(
            errors,
            vec![
                EligibilityError::StartInFuture,
                EligibilityError::EndBeforeStart,
            ]
        );
    }
}
