//! Convenient re-exports for common Second Wind types.
pub use crate::{
    cancel::CancelToken,
    classify::{categorize, is_transient, FailureCategory},
    delay::Backoff,
    dispatch::RetryHandle,
    error::{ConfigError, RetryError},
    executor::RetryExecutor,
    policy::{RetryPolicy, RetryPolicyBuilder},
    stats::RetryStats,
    telemetry::{AttemptOutcome, MemorySink, NullSink, RetryEvent, RetrySink, TracingSink},
    wait::{InstantWaiter, ThreadWaiter, TrackingWaiter, Waiter},
};
