use std::time::Duration;

use crate::retry::classify::should_retry;
use crate::retry::error::{ClassifyError, RemoteError};

/// Predicate deciding whether a failed call may be retried.
pub type RetryPredicate = fn(&RemoteError) -> Result<bool, ClassifyError>;

/// Default policy used by every client call unless the caller derives another.
///
/// Customize with the `with_*` methods, e.g.
/// `DEFAULT_RETRY.with_deadline(Duration::from_secs(30))`.
pub const DEFAULT_RETRY: RetryPolicy = RetryPolicy {
    predicate: should_retry,
    deadline: Duration::from_secs(600),
    initial_delay: Duration::from_secs(1),
    max_delay: Duration::from_secs(60),
    multiplier: 2.0,
};

/// Retry predicate plus the parameters handed to the retry engine.
///
/// Immutable: the `with_*` methods return a new policy and leave the
/// receiver untouched, so holders of [`DEFAULT_RETRY`] never observe changes.
#[derive(Clone, Copy)]
pub struct RetryPolicy {
    predicate: RetryPredicate,
    deadline: Duration,
    initial_delay: Duration,
    max_delay: Duration,
    multiplier: f32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        DEFAULT_RETRY
    }
}

impl std::fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("deadline", &self.deadline)
            .field("initial_delay", &self.initial_delay)
            .field("max_delay", &self.max_delay)
            .field("multiplier", &self.multiplier)
            .finish_non_exhaustive()
    }
}

impl RetryPolicy {
    pub fn predicate(&self) -> RetryPredicate {
        self.predicate
    }

    /// Maximum total time spent retrying, measured from the first attempt.
    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    pub fn initial_delay(&self) -> Duration {
        self.initial_delay
    }

    pub fn max_delay(&self) -> Duration {
        self.max_delay
    }

    pub fn multiplier(&self) -> f32 {
        self.multiplier
    }

    /// Runs the predicate against `err`.
    pub fn should_retry(&self, err: &RemoteError) -> Result<bool, ClassifyError> {
        (self.predicate)(err)
    }

    pub fn with_deadline(&self, deadline: Duration) -> Self {
        Self { deadline, ..*self }
    }

    /// Backoff curve: first delay, cap, and growth factor (clamped to >= 1).
    pub fn with_delay(&self, initial: Duration, maximum: Duration, multiplier: f32) -> Self {
        Self {
            initial_delay: initial,
            max_delay: maximum.max(initial),
            multiplier: multiplier.max(1.0),
            ..*self
        }
    }

    pub fn with_predicate(&self, predicate: RetryPredicate) -> Self {
        Self { predicate, ..*self }
    }
}
