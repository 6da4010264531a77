//! Per-execution retry statistics.

use std::time::{Duration, SystemTime};

/// Passive record of one retry execution, produced when the execution
/// reaches a terminal state and delivered through the telemetry sink.
///
/// Never mutated after creation; owned by the consumer once delivered.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryStats {
    operation: String,
    attempts: usize,
    successful: bool,
    total_duration: Duration,
    started_at: SystemTime,
    ended_at: SystemTime,
}

impl RetryStats {
    pub(crate) fn new(
        operation: String,
        attempts: usize,
        successful: bool,
        total_duration: Duration,
        started_at: SystemTime,
        ended_at: SystemTime,
    ) -> Self {
        Self { operation, attempts, successful, total_duration, started_at, ended_at }
    }

    /// Name the caller gave the operation.
    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Invocations actually performed.
    pub fn attempts(&self) -> usize {
        self.attempts
    }

    /// Whether the execution ended in success.
    pub fn successful(&self) -> bool {
        self.successful
    }

    /// Wall-clock time from first invocation to terminal state.
    pub fn total_duration(&self) -> Duration {
        self.total_duration
    }

    /// Wall-clock start of the execution.
    pub fn started_at(&self) -> SystemTime {
        self.started_at
    }

    /// Wall-clock end of the execution.
    pub fn ended_at(&self) -> SystemTime {
        self.ended_at
    }
}
