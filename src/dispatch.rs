//! Non-blocking dispatch of retry executions.
//!
//! [`RetryExecutor::execute_async`] runs the whole attempt loop off the
//! caller's task and hands back a [`RetryHandle`] future. Each invocation of
//! the (blocking) operation runs on tokio's lazily created blocking pool, so
//! a slow attempt never stalls the async runtime; the wait between attempts
//! is an async timer raced against the handle's cancellation token rather
//! than a thread sleep. Blocking-pool workers do not keep the process alive
//! once the runtime shuts down.
//!
//! Cancellation semantics:
//! - cancelling during a wait aborts before the next attempt starts and the
//!   handle resolves to `RetryError::Interrupted`;
//! - cancelling while an attempt is in flight lets that attempt finish (the
//!   engine never forcibly aborts the operation) and stops the loop before
//!   the next attempt;
//! - a panic inside the operation resumes on the task awaiting the handle.
//!
//! Must be called from within a tokio runtime.

use crate::cancel::CancelToken;
use crate::error::RetryError;
use crate::executor::RetryExecutor;
use crate::policy::RetryPolicy;
use crate::telemetry::AttemptOutcome;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::{Instant, SystemTime};
use tokio::task::JoinHandle;

impl RetryExecutor {
    /// Execute `operation` under `policy` without blocking the caller.
    pub fn execute_async<T, E, Op>(
        &self,
        operation_name: impl Into<String>,
        operation: Op,
        policy: RetryPolicy<E>,
    ) -> RetryHandle<T, E>
    where
        T: Send + 'static,
        E: std::error::Error + Send + Sync + 'static,
        Op: FnMut() -> Result<T, E> + Send + 'static,
    {
        let operation_name = operation_name.into();
        let token = CancelToken::new();

        let executor = self.clone();
        let task_name = operation_name.clone();
        let task_token = token.clone();
        let join = tokio::spawn(async move {
            executor.run_async(task_name, operation, policy, task_token).await
        });

        RetryHandle { join, token, operation: operation_name }
    }

    async fn run_async<T, E, Op>(
        self,
        operation_name: String,
        mut operation: Op,
        policy: RetryPolicy<E>,
        token: CancelToken,
    ) -> Result<T, RetryError<E>>
    where
        T: Send + 'static,
        E: std::error::Error + Send + Sync + 'static,
        Op: FnMut() -> Result<T, E> + Send + 'static,
    {
        let clock = Instant::now();
        let started_at = SystemTime::now();
        let max_attempts = policy.max_attempts();

        for attempt in 1..=max_attempts {
            if token.is_cancelled() {
                self.finish(&operation_name, attempt.saturating_sub(1), false, clock, started_at);
                return Err(RetryError::Interrupted { operation: operation_name });
            }

            let (result, returned_op) = match tokio::task::spawn_blocking(move || {
                let mut op = operation;
                let result = op();
                (result, op)
            })
            .await
            {
                Ok(pair) => pair,
                Err(join_err) => {
                    if join_err.is_panic() {
                        std::panic::resume_unwind(join_err.into_panic());
                    }
                    // Runtime is shutting down; treat like a cancelled wait.
                    self.finish(&operation_name, attempt, false, clock, started_at);
                    return Err(RetryError::Interrupted { operation: operation_name });
                }
            };
            operation = returned_op;

            match result {
                Ok(value) => {
                    self.emit_attempt(
                        &operation_name,
                        attempt,
                        max_attempts,
                        AttemptOutcome::Succeeded,
                        clock,
                    );
                    self.finish(&operation_name, attempt, true, clock, started_at);
                    return Ok(value);
                }
                Err(failure) => {
                    if !policy.is_retryable(&failure) {
                        self.emit_attempt(
                            &operation_name,
                            attempt,
                            max_attempts,
                            AttemptOutcome::NonRetryable,
                            clock,
                        );
                        self.finish(&operation_name, attempt, false, clock, started_at);
                        return Err(RetryError::Inner(failure));
                    }
                    if attempt == max_attempts {
                        self.emit_attempt(
                            &operation_name,
                            attempt,
                            max_attempts,
                            AttemptOutcome::Exhausted,
                            clock,
                        );
                        self.finish(&operation_name, attempt, false, clock, started_at);
                        return Err(RetryError::Exhausted {
                            operation: operation_name,
                            attempts: attempt,
                            source: failure,
                        });
                    }

                    let delay = policy.backoff().delay(attempt);
                    self.emit_attempt(
                        &operation_name,
                        attempt,
                        max_attempts,
                        AttemptOutcome::Retrying { delay },
                        clock,
                    );
                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {}
                        _ = token.cancelled() => {
                            self.finish(&operation_name, attempt, false, clock, started_at);
                            return Err(RetryError::Interrupted { operation: operation_name });
                        }
                    }
                }
            }
        }

        debug_assert!(false, "retry loop must return from its final iteration");
        unreachable!()
    }
}

/// Future handle for an asynchronously dispatched retry execution.
///
/// Resolves to the operation's value or the terminal [`RetryError`].
#[derive(Debug)]
pub struct RetryHandle<T, E> {
    join: JoinHandle<Result<T, RetryError<E>>>,
    token: CancelToken,
    operation: String,
}

impl<T, E> RetryHandle<T, E> {
    /// Cooperatively cancel: a pending wait aborts and no further attempt
    /// starts. Awaiting the handle afterwards yields `RetryError::Interrupted`
    /// unless the execution already reached another terminal state.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Token shared with the running execution.
    pub fn cancel_token(&self) -> CancelToken {
        self.token.clone()
    }

    /// Name the caller gave the operation.
    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Whether the execution has reached a terminal state.
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }
}

impl<T, E> Future for RetryHandle<T, E> {
    type Output = Result<T, RetryError<E>>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        match Pin::new(&mut this.join).poll(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(join_err)) => {
                if join_err.is_panic() {
                    std::panic::resume_unwind(join_err.into_panic());
                }
                Poll::Ready(Err(RetryError::Interrupted { operation: this.operation.clone() }))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::{MemorySink, RetryEvent};
    use std::fmt;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct TestError(String);

    impl fmt::Display for TestError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{}", self.0)
        }
    }

    impl std::error::Error for TestError {}

    fn fast_policy(max_attempts: usize) -> RetryPolicy<TestError> {
        RetryPolicy::builder()
            .max_attempts(max_attempts)
            .initial_delay(Duration::from_millis(1))
            .jitter_factor(0.0)
            .retry_if(|e: &TestError| e.0.contains("transient"))
            .build()
            .expect("builder")
    }

    #[tokio::test]
    async fn async_execution_returns_the_value() {
        let executor = RetryExecutor::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let op_counter = counter.clone();

        let handle = executor.execute_async(
            "async-op",
            move || {
                op_counter.fetch_add(1, Ordering::SeqCst);
                Ok::<_, TestError>(42)
            },
            fast_policy(3),
        );

        assert_eq!(handle.operation(), "async-op");
        assert_eq!(handle.await.unwrap(), 42);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn async_execution_retries_then_succeeds() {
        let executor = RetryExecutor::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let op_counter = counter.clone();

        let handle = executor.execute_async(
            "async-op",
            move || {
                let attempt = op_counter.fetch_add(1, Ordering::SeqCst) + 1;
                if attempt < 3 {
                    Err(TestError("transient".to_string()))
                } else {
                    Ok("done")
                }
            },
            fast_policy(5),
        );

        assert_eq!(handle.await.unwrap(), "done");
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn async_exhaustion_reports_attempt_count() {
        let executor = RetryExecutor::new();

        let handle = executor.execute_async(
            "async-op",
            || Err::<(), _>(TestError("transient".to_string())),
            fast_policy(3),
        );

        let err = handle.await.unwrap_err();
        assert!(err.is_exhausted());
        assert_eq!(err.attempts(), Some(3));
        assert_eq!(err.operation(), Some("async-op"));
    }

    #[tokio::test]
    async fn async_non_retryable_passes_through() {
        let executor = RetryExecutor::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let op_counter = counter.clone();

        let handle = executor.execute_async(
            "async-op",
            move || {
                op_counter.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(TestError("invalid input".to_string()))
            },
            fast_policy(3),
        );

        let err = handle.await.unwrap_err();
        assert_eq!(err.into_inner(), Some(TestError("invalid input".to_string())));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cancelling_during_wait_interrupts_before_the_next_attempt() {
        let sink = MemorySink::new();
        let executor = RetryExecutor::new().with_sink(sink.clone());
        let counter = Arc::new(AtomicUsize::new(0));
        let op_counter = counter.clone();

        // A long first delay keeps the execution parked in the wait phase.
        let policy = RetryPolicy::builder()
            .max_attempts(3)
            .initial_delay(Duration::from_secs(30))
            .jitter_factor(0.0)
            .retry_if(|_: &TestError| true)
            .build()
            .expect("builder");

        let handle = executor.execute_async(
            "parked",
            move || {
                op_counter.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(TestError("transient".to_string()))
            },
            policy,
        );

        // Let attempt 1 fail and the wait begin, then cancel.
        while counter.load(Ordering::SeqCst) == 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
        handle.cancel();

        let err = handle.await.unwrap_err();
        assert!(err.is_interrupted());
        assert_eq!(counter.load(Ordering::SeqCst), 1, "attempt 2 must not run");

        // The emitted trail ends with an unsuccessful completion record.
        match sink.events().last() {
            Some(RetryEvent::Completed(stats)) => assert!(!stats.successful()),
            e => panic!("expected Completed, got {:?}", e),
        }
    }

    #[tokio::test]
    async fn cancel_token_is_shared_with_clones() {
        let executor = RetryExecutor::new();
        let policy = RetryPolicy::builder()
            .max_attempts(2)
            .initial_delay(Duration::from_secs(30))
            .jitter_factor(0.0)
            .retry_if(|_: &TestError| true)
            .build()
            .expect("builder");

        let handle =
            executor.execute_async("shared", || Err::<(), _>(TestError("transient".into())), policy);
        let token = handle.cancel_token();
        tokio::time::sleep(Duration::from_millis(50)).await;
        token.cancel();

        assert!(handle.await.unwrap_err().is_interrupted());
    }
}
