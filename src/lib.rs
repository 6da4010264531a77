#![forbid(unsafe_code)]
#![cfg_attr(not(test), deny(clippy::all))]

//! # Second Wind
//!
//! A resilient retry execution engine: bounded attempts, exponential backoff
//! with symmetric jitter, transient-failure classification, graceful
//! fallback, and both blocking and non-blocking entry points.
//!
//! ## Features
//!
//! - **Retry policies** built once, validated at build time, and shared
//!   lock-free across concurrent executions
//! - **Exponential backoff** with a hard delay ceiling and symmetric jitter
//!   to avoid retry storms
//! - **Transient-failure classification** by message heuristic and typed
//!   `io::Error` categories, with custom predicates for exactness
//! - **Async dispatch** onto the tokio runtime with cooperative cancellation
//! - **Fallbacks** invoked only when retries are exhausted
//! - **Structured telemetry** per attempt, with pluggable sinks
//!
//! ## Quick Start
//!
//! ```rust
//! use secondwind::{RetryExecutor, RetryPolicy};
//! use std::time::Duration;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let policy = RetryPolicy::builder()
//!         .max_attempts(3)
//!         .initial_delay(Duration::from_millis(100))
//!         .build()?;
//!
//!     let executor = RetryExecutor::new();
//!     let value = executor.execute("load-config", || {
//!         // Your fallible operation here
//!         Ok::<_, std::io::Error>(42)
//!     }, &policy)?;
//!     assert_eq!(value, 42);
//!     Ok(())
//! }
//! ```

pub mod cancel;
pub mod classify;
pub mod delay;
pub mod dispatch;
pub mod error;
pub mod executor;
pub mod policy;
pub mod prelude;
pub mod stats;
pub mod telemetry;
pub mod wait;

// Re-exports
pub use cancel::CancelToken;
pub use classify::{categorize, is_transient, FailureCategory, TRANSIENT_KEYWORDS};
pub use delay::Backoff;
pub use dispatch::RetryHandle;
pub use error::{ConfigError, RetryError};
pub use executor::RetryExecutor;
pub use policy::{RetryPolicy, RetryPolicyBuilder};
pub use stats::RetryStats;
pub use telemetry::{AttemptOutcome, MemorySink, NullSink, RetryEvent, RetrySink, TracingSink};
pub use wait::{InstantWaiter, ThreadWaiter, TrackingWaiter, Waiter};
