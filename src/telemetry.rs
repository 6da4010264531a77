//! Structured events and sinks for observing retry executions.
//!
//! The executor emits exactly one [`RetryEvent::Attempt`] per invocation of
//! the wrapped operation and one [`RetryEvent::Completed`] per execution. It
//! never owns log formatting or transport: events flow into a [`RetrySink`],
//! and the crate ships three of them:
//!
//! - [`TracingSink`] (default): renders events as structured `tracing`
//!   records, severity chosen by outcome.
//! - [`NullSink`]: discards everything.
//! - [`MemorySink`]: bounded in-memory capture for tests and aggregation.

use crate::stats::RetryStats;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Outcome of a single attempt, as classified by the executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// The operation returned a value.
    Succeeded,
    /// The failure was retryable and attempts remain; the executor will wait
    /// for `delay` before the next attempt.
    Retrying {
        /// Computed backoff delay before the next attempt.
        delay: Duration,
    },
    /// The failure was not retryable; it propagates to the caller unchanged.
    NonRetryable,
    /// The failure was retryable but this was the final permitted attempt.
    Exhausted,
}

/// Event emitted to the observability collaborator.
#[derive(Debug, Clone, PartialEq)]
pub enum RetryEvent {
    /// One invocation of the wrapped operation was classified.
    Attempt {
        /// Name the caller gave the operation.
        operation: String,
        /// 1-indexed attempt number.
        attempt: usize,
        /// Attempt bound from the policy.
        max_attempts: usize,
        /// How the attempt ended.
        outcome: AttemptOutcome,
        /// Wall-clock time since the execution started.
        elapsed: Duration,
    },
    /// The execution reached a terminal state.
    Completed(RetryStats),
}

impl fmt::Display for AttemptOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptOutcome::Succeeded => write!(f, "succeeded"),
            AttemptOutcome::Retrying { delay } => write!(f, "retrying(delay={:?})", delay),
            AttemptOutcome::NonRetryable => write!(f, "non-retryable"),
            AttemptOutcome::Exhausted => write!(f, "exhausted"),
        }
    }
}

impl fmt::Display for RetryEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetryEvent::Attempt { operation, attempt, max_attempts, outcome, elapsed } => {
                write!(
                    f,
                    "{}: attempt {}/{} {} (elapsed {:?})",
                    operation, attempt, max_attempts, outcome, elapsed
                )
            }
            RetryEvent::Completed(stats) => {
                write!(
                    f,
                    "{}: completed attempts={} successful={} duration={:?}",
                    stats.operation(),
                    stats.attempts(),
                    stats.successful(),
                    stats.total_duration()
                )
            }
        }
    }
}

/// Consumer of retry events.
pub trait RetrySink: Send + Sync + fmt::Debug {
    fn record(&self, event: &RetryEvent);
}

/// Sink that renders events as structured `tracing` records.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl RetrySink for TracingSink {
    fn record(&self, event: &RetryEvent) {
        match event {
            RetryEvent::Attempt { operation, attempt, max_attempts, outcome, elapsed } => {
                match outcome {
                    AttemptOutcome::Succeeded if *attempt > 1 => tracing::info!(
                        operation = %operation,
                        attempt = *attempt,
                        max_attempts = *max_attempts,
                        elapsed_ms = elapsed.as_millis() as u64,
                        "operation succeeded after retrying"
                    ),
                    AttemptOutcome::Succeeded => tracing::debug!(
                        operation = %operation,
                        attempt = *attempt,
                        max_attempts = *max_attempts,
                        "operation succeeded"
                    ),
                    AttemptOutcome::Retrying { delay } => tracing::warn!(
                        operation = %operation,
                        attempt = *attempt,
                        max_attempts = *max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        "attempt failed, retrying"
                    ),
                    AttemptOutcome::NonRetryable => tracing::warn!(
                        operation = %operation,
                        attempt = *attempt,
                        "operation failed with non-retryable error"
                    ),
                    AttemptOutcome::Exhausted => tracing::error!(
                        operation = %operation,
                        attempts = *attempt,
                        "operation failed after all attempts"
                    ),
                }
            }
            RetryEvent::Completed(stats) => tracing::debug!(
                operation = %stats.operation(),
                attempts = stats.attempts(),
                successful = stats.successful(),
                duration_ms = stats.total_duration().as_millis() as u64,
                "retry execution completed"
            ),
        }
    }
}

/// Sink that discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl RetrySink for NullSink {
    fn record(&self, _event: &RetryEvent) {}
}

/// Sink that stores events in memory, evicting the oldest past `capacity`.
#[derive(Debug, Clone)]
pub struct MemorySink {
    events: Arc<Mutex<Vec<RetryEvent>>>,
    capacity: usize,
    evicted: Arc<AtomicU64>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::with_capacity(10_000)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            events: Arc::new(Mutex::new(Vec::new())),
            capacity: capacity.max(1),
            evicted: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Snapshot of the stored events, oldest first.
    pub fn events(&self) -> Vec<RetryEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().unwrap().is_empty()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }

    /// Number of events dropped to stay within capacity.
    pub fn evicted(&self) -> u64 {
        self.evicted.load(Ordering::Relaxed)
    }
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new()
    }
}

impl RetrySink for MemorySink {
    fn record(&self, event: &RetryEvent) {
        let mut events = self.events.lock().unwrap();
        if events.len() >= self.capacity {
            events.remove(0);
            self.evicted.fetch_add(1, Ordering::Relaxed);
        }
        events.push(event.clone());
    }
}
