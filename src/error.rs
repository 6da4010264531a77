//! Error types for retry execution.
//!
//! Taxonomy:
//! - `Exhausted`: every permitted attempt was spent on a retryable failure;
//!   wraps the last underlying failure together with the operation name and
//!   the attempt count.
//! - `Interrupted`: the wait between attempts was cancelled; terminal and
//!   never retried.
//! - `Inner`: a non-retryable failure, propagated on first occurrence with
//!   transparent `Display` and `source`, so callers see the original failure
//!   untouched.
//!
//! Configuration problems are a separate type, [`ConfigError`], raised at
//! policy build time; an invalid policy never reaches the executor.

use std::fmt;

/// Terminal outcome of a failed retry execution.
#[derive(Debug)]
pub enum RetryError<E> {
    /// All attempts were used while the failure stayed retryable.
    Exhausted {
        /// Name the caller gave the operation.
        operation: String,
        /// Total attempts performed (equals the policy's `max_attempts`).
        attempts: usize,
        /// The failure from the final attempt.
        source: E,
    },
    /// The wait phase was cancelled before the next attempt started.
    Interrupted {
        /// Name the caller gave the operation.
        operation: String,
    },
    /// A non-retryable failure, passed through unchanged.
    Inner(E),
}

impl<E: fmt::Display> fmt::Display for RetryError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exhausted { operation, attempts, source } => {
                write!(
                    f,
                    "operation '{}' failed after {} attempts; last error: {}",
                    operation, attempts, source
                )
            }
            Self::Interrupted { operation } => {
                write!(f, "operation '{}' interrupted while waiting to retry", operation)
            }
            Self::Inner(e) => write!(f, "{}", e),
        }
    }
}

impl<E: std::error::Error + 'static> std::error::Error for RetryError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Exhausted { source, .. } => Some(source),
            Self::Interrupted { .. } => None,
            Self::Inner(e) => e.source(),
        }
    }
}

impl<E> RetryError<E> {
    /// Check whether all attempts were exhausted.
    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::Exhausted { .. })
    }

    /// Check whether the wait phase was cancelled.
    pub fn is_interrupted(&self) -> bool {
        matches!(self, Self::Interrupted { .. })
    }

    /// Check whether this is a non-retryable failure passed through.
    pub fn is_inner(&self) -> bool {
        matches!(self, Self::Inner(_))
    }

    /// Operation name, where the variant carries one.
    pub fn operation(&self) -> Option<&str> {
        match self {
            Self::Exhausted { operation, .. } | Self::Interrupted { operation } => Some(operation),
            Self::Inner(_) => None,
        }
    }

    /// Attempt count for exhaustion failures.
    pub fn attempts(&self) -> Option<usize> {
        match self {
            Self::Exhausted { attempts, .. } => Some(*attempts),
            _ => None,
        }
    }

    /// Borrow the underlying failure, for both `Exhausted` and `Inner`.
    pub fn last_error(&self) -> Option<&E> {
        match self {
            Self::Exhausted { source, .. } | Self::Inner(source) => Some(source),
            Self::Interrupted { .. } => None,
        }
    }

    /// Borrow the inner failure if this is a pass-through.
    pub fn as_inner(&self) -> Option<&E> {
        match self {
            Self::Inner(e) => Some(e),
            _ => None,
        }
    }

    /// Extract the inner failure if this is a pass-through.
    pub fn into_inner(self) -> Option<E> {
        match self {
            Self::Inner(e) => Some(e),
            _ => None,
        }
    }
}

/// Invalid policy configuration, reported by `RetryPolicyBuilder::build`.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// `max_attempts` must be at least 1.
    #[error("max_attempts must be >= 1 (got {0})")]
    InvalidMaxAttempts(usize),
    /// `jitter_factor` must be a finite value in [0, 1].
    #[error("jitter_factor must be in [0, 1] (got {0})")]
    InvalidJitterFactor(f64),
    /// `backoff_multiplier` must be a finite value >= 1.0.
    #[error("backoff_multiplier must be >= 1.0 (got {0})")]
    InvalidBackoffMultiplier(f64),
}
