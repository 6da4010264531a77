//! Blocking retry execution.
//!
//! The executor drives the attempt loop for a given policy:
//!
//! - invoke the operation; success returns immediately;
//! - a failure is classified by the policy's predicate - non-retryable
//!   failures propagate unchanged on first occurrence;
//! - a retryable failure on the final attempt becomes
//!   `RetryError::Exhausted`, wrapping the last failure;
//! - otherwise the executor computes the backoff delay, suspends the calling
//!   thread through its [`Waiter`], and tries again. A cancellation observed
//!   during that wait surfaces as `RetryError::Interrupted` and no further
//!   attempt starts.
//!
//! Invariants:
//! - The operation is invoked at most `max_attempts` times.
//! - Attempts are strictly sequential; attempt k+1 never starts before
//!   attempt k is classified and the full computed delay has elapsed.
//! - One `RetryEvent::Attempt` is emitted per invocation and one
//!   `RetryEvent::Completed` per execution; the executor never logs to a
//!   fixed sink itself.
//!
//! The executor holds no per-execution state; one instance may serve any
//! number of concurrent callers.
//!
//! Example
//! ```rust
//! use secondwind::{RetryExecutor, RetryPolicy};
//!
//! let executor = RetryExecutor::new();
//! let policy = RetryPolicy::default();
//! let result = executor.execute("fetch-profile", || {
//!     Ok::<_, std::io::Error>("profile")
//! }, &policy);
//! assert_eq!(result.unwrap(), "profile");
//! ```

use crate::cancel::CancelToken;
use crate::error::RetryError;
use crate::policy::RetryPolicy;
use crate::stats::RetryStats;
use crate::telemetry::{AttemptOutcome, RetryEvent, RetrySink, TracingSink};
use crate::wait::{ThreadWaiter, Waiter};
use std::sync::Arc;
use std::time::{Instant, SystemTime};

/// Stateless retry orchestrator. Cheap to clone; safe to share.
#[derive(Debug, Clone)]
pub struct RetryExecutor {
    sink: Arc<dyn RetrySink>,
    waiter: Arc<dyn Waiter>,
}

impl Default for RetryExecutor {
    fn default() -> Self {
        Self { sink: Arc::new(TracingSink), waiter: Arc::new(ThreadWaiter) }
    }
}

impl RetryExecutor {
    /// Executor with the default collaborators: `TracingSink` + `ThreadWaiter`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the observability sink.
    pub fn with_sink<S: RetrySink + 'static>(mut self, sink: S) -> Self {
        self.sink = Arc::new(sink);
        self
    }

    /// Replace the wait strategy (tests inject `InstantWaiter`/`TrackingWaiter`).
    pub fn with_waiter<W: Waiter + 'static>(mut self, waiter: W) -> Self {
        self.waiter = Arc::new(waiter);
        self
    }

    /// Execute `operation` under `policy`, blocking between attempts.
    pub fn execute<T, E, Op>(
        &self,
        operation_name: &str,
        operation: Op,
        policy: &RetryPolicy<E>,
    ) -> Result<T, RetryError<E>>
    where
        E: std::error::Error + Send + Sync + 'static,
        Op: FnMut() -> Result<T, E>,
    {
        self.execute_cancellable(operation_name, operation, policy, &CancelToken::new())
    }

    /// Execute with an externally observable cancellation point in the wait
    /// phase. A token cancelled mid-wait ends the execution with
    /// `RetryError::Interrupted`; an attempt already running is not aborted.
    pub fn execute_cancellable<T, E, Op>(
        &self,
        operation_name: &str,
        mut operation: Op,
        policy: &RetryPolicy<E>,
        token: &CancelToken,
    ) -> Result<T, RetryError<E>>
    where
        E: std::error::Error + Send + Sync + 'static,
        Op: FnMut() -> Result<T, E>,
    {
        let clock = Instant::now();
        let started_at = SystemTime::now();
        let max_attempts = policy.max_attempts();

        for attempt in 1..=max_attempts {
            match operation() {
                Ok(value) => {
                    self.emit_attempt(
                        operation_name,
                        attempt,
                        max_attempts,
                        AttemptOutcome::Succeeded,
                        clock,
                    );
                    self.finish(operation_name, attempt, true, clock, started_at);
                    return Ok(value);
                }
                Err(failure) => {
                    if !policy.is_retryable(&failure) {
                        self.emit_attempt(
                            operation_name,
                            attempt,
                            max_attempts,
                            AttemptOutcome::NonRetryable,
                            clock,
                        );
                        self.finish(operation_name, attempt, false, clock, started_at);
                        return Err(RetryError::Inner(failure));
                    }
                    if attempt == max_attempts {
                        self.emit_attempt(
                            operation_name,
                            attempt,
                            max_attempts,
                            AttemptOutcome::Exhausted,
                            clock,
                        );
                        self.finish(operation_name, attempt, false, clock, started_at);
                        return Err(RetryError::Exhausted {
                            operation: operation_name.to_string(),
                            attempts: attempt,
                            source: failure,
                        });
                    }

                    let delay = policy.backoff().delay(attempt);
                    self.emit_attempt(
                        operation_name,
                        attempt,
                        max_attempts,
                        AttemptOutcome::Retrying { delay },
                        clock,
                    );
                    if !self.waiter.wait(delay, token) {
                        self.finish(operation_name, attempt, false, clock, started_at);
                        return Err(RetryError::Interrupted {
                            operation: operation_name.to_string(),
                        });
                    }
                }
            }
        }

        // Every iteration above either returns or continues, and the final
        // iteration always returns.
        debug_assert!(false, "retry loop must return from its final iteration");
        unreachable!()
    }

    /// Execute with a fallback invoked only when all attempts are exhausted.
    ///
    /// Non-retryable and interrupted failures propagate unchanged; the
    /// fallback itself is never retried, and its failure surfaces as
    /// `RetryError::Inner`.
    pub fn execute_with_fallback<T, E, Op, Fb>(
        &self,
        operation_name: &str,
        operation: Op,
        fallback: Fb,
        policy: &RetryPolicy<E>,
    ) -> Result<T, RetryError<E>>
    where
        E: std::error::Error + Send + Sync + 'static,
        Op: FnMut() -> Result<T, E>,
        Fb: FnOnce() -> Result<T, E>,
    {
        match self.execute(operation_name, operation, policy) {
            Err(RetryError::Exhausted { .. }) => fallback().map_err(RetryError::Inner),
            other => other,
        }
    }

    pub(crate) fn emit_attempt(
        &self,
        operation: &str,
        attempt: usize,
        max_attempts: usize,
        outcome: AttemptOutcome,
        clock: Instant,
    ) {
        self.sink.record(&RetryEvent::Attempt {
            operation: operation.to_string(),
            attempt,
            max_attempts,
            outcome,
            elapsed: clock.elapsed(),
        });
    }

    pub(crate) fn finish(
        &self,
        operation: &str,
        attempts: usize,
        successful: bool,
        clock: Instant,
        started_at: SystemTime,
    ) {
        let stats = RetryStats::new(
            operation.to_string(),
            attempts,
            successful,
            clock.elapsed(),
            started_at,
            SystemTime::now(),
        );
        self.sink.record(&RetryEvent::Completed(stats));
    }
}
