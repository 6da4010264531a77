//! Retry policy configuration.
//!
//! A [`RetryPolicy`] bundles the attempt bound, backoff parameters, and the
//! retry predicate. It is immutable once built and cheap to clone; one policy
//! may be shared across any number of concurrent executions without locks.
//!
//! Semantics:
//! - `max_attempts` counts total invocations (initial try plus retries).
//! - The predicate decides whether a failure is worth another attempt; the
//!   default accepts anything [`crate::classify::is_transient`] accepts.
//! - `retry_on` narrows the default classifier to specific categories (OR
//!   semantics); `retry_if` replaces it entirely.
//!
//! Invalid configurations are rejected by `build()` with a
//! [`ConfigError`]; an invalid policy never reaches the executor.
//!
//! Example
//! ```rust
//! use std::time::Duration;
//! use secondwind::{FailureCategory, RetryPolicy};
//!
//! let policy = RetryPolicy::<std::io::Error>::builder()
//!     .max_attempts(5)
//!     .initial_delay(Duration::from_millis(50))
//!     .retry_on([FailureCategory::Timeout, FailureCategory::Connection])
//!     .build()
//!     .unwrap();
//! assert_eq!(policy.max_attempts(), 5);
//! ```

use crate::classify::{categorize, is_transient, FailureCategory};
use crate::delay::Backoff;
use crate::error::ConfigError;
use std::sync::Arc;
use std::time::Duration;

/// Default total attempts.
pub const DEFAULT_MAX_ATTEMPTS: usize = 3;
/// Default base wait before the second attempt.
pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_millis(100);
/// Default geometric growth factor.
pub const DEFAULT_BACKOFF_MULTIPLIER: f64 = 2.0;
/// Default delay ceiling.
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(30);
/// Default symmetric jitter fraction.
pub const DEFAULT_JITTER_FACTOR: f64 = 0.1;

/// Immutable retry configuration: attempt bound, backoff, and predicate.
pub struct RetryPolicy<E> {
    max_attempts: usize,
    backoff: Backoff,
    predicate: Arc<dyn Fn(&E) -> bool + Send + Sync>,
}

impl<E> Clone for RetryPolicy<E> {
    fn clone(&self) -> Self {
        Self {
            max_attempts: self.max_attempts,
            backoff: self.backoff,
            predicate: self.predicate.clone(),
        }
    }
}

impl<E> std::fmt::Debug for RetryPolicy<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.max_attempts)
            .field("backoff", &self.backoff)
            .field("predicate", &"<predicate>")
            .finish()
    }
}

impl<E> RetryPolicy<E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    /// Construct a new builder with the documented defaults.
    pub fn builder() -> RetryPolicyBuilder<E> {
        RetryPolicyBuilder::new()
    }

    /// Total invocations permitted, initial try included.
    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    /// Backoff parameters used for the wait phase.
    pub fn backoff(&self) -> &Backoff {
        &self.backoff
    }

    /// Ask the policy whether a failure is worth retrying.
    pub fn is_retryable(&self, failure: &E) -> bool {
        (self.predicate)(failure)
    }
}

impl<E> Default for RetryPolicy<E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn default() -> Self {
        // Defaults are valid by construction, so no validation pass is needed.
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff: Backoff::new(
                DEFAULT_INITIAL_DELAY,
                DEFAULT_BACKOFF_MULTIPLIER,
                DEFAULT_MAX_DELAY,
                DEFAULT_JITTER_FACTOR,
            ),
            predicate: Arc::new(|failure: &E| is_transient(failure)),
        }
    }
}

/// Builder for [`RetryPolicy`].
pub struct RetryPolicyBuilder<E> {
    max_attempts: usize,
    initial_delay: Duration,
    backoff_multiplier: f64,
    max_delay: Duration,
    jitter_factor: f64,
    predicate: Arc<dyn Fn(&E) -> bool + Send + Sync>,
}

impl<E> RetryPolicyBuilder<E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    /// Create a builder with the documented defaults.
    pub fn new() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_delay: DEFAULT_INITIAL_DELAY,
            backoff_multiplier: DEFAULT_BACKOFF_MULTIPLIER,
            max_delay: DEFAULT_MAX_DELAY,
            jitter_factor: DEFAULT_JITTER_FACTOR,
            predicate: Arc::new(|failure: &E| is_transient(failure)),
        }
    }

    /// Set total attempts (initial try + retries). Must be >= 1.
    pub fn max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Set the base wait before the second attempt.
    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Set the geometric growth factor. Must be >= 1.0.
    pub fn backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// Set the delay ceiling, applied after growth and before jitter.
    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Set the symmetric jitter fraction. Must be in [0, 1].
    pub fn jitter_factor(mut self, factor: f64) -> Self {
        self.jitter_factor = factor;
        self
    }

    /// Retry only failures that classify as one of the given categories.
    pub fn retry_on(mut self, categories: impl IntoIterator<Item = FailureCategory>) -> Self {
        let accepted: Vec<FailureCategory> = categories.into_iter().collect();
        self.predicate = Arc::new(move |failure: &E| {
            categorize(failure).map_or(false, |category| accepted.contains(&category))
        });
        self
    }

    /// Replace the predicate entirely.
    pub fn retry_if<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.predicate = Arc::new(predicate);
        self
    }

    /// Build the policy, validating every numeric bound.
    pub fn build(self) -> Result<RetryPolicy<E>, ConfigError> {
        if self.max_attempts < 1 {
            return Err(ConfigError::InvalidMaxAttempts(self.max_attempts));
        }
        if !self.jitter_factor.is_finite() || !(0.0..=1.0).contains(&self.jitter_factor) {
            return Err(ConfigError::InvalidJitterFactor(self.jitter_factor));
        }
        if !self.backoff_multiplier.is_finite() || self.backoff_multiplier < 1.0 {
            return Err(ConfigError::InvalidBackoffMultiplier(self.backoff_multiplier));
        }
        Ok(RetryPolicy {
            max_attempts: self.max_attempts,
            backoff: Backoff::new(
                self.initial_delay,
                self.backoff_multiplier,
                self.max_delay,
                self.jitter_factor,
            ),
            predicate: self.predicate,
        })
    }
}

impl<E> Default for RetryPolicyBuilder<E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
