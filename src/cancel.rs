//! Cooperative cancellation for the wait phase.
//!
//! A [`CancelToken`] is shared between a caller and a running execution.
//! Cancellation is observed only between attempts: a token cancelled while an
//! operation is in flight lets that attempt finish, then stops the loop
//! before the next one. The blocking wait path parks on a condvar so a
//! cancel wakes it promptly; the async wait path races a timer against
//! [`CancelToken::cancelled`].
//!
//! Cancellation is permanent: once cancelled, a token stays cancelled.

use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::Notify;

/// Shared cancellation signal. Clones observe the same state.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    cancelled: Mutex<bool>,
    condvar: Condvar,
    notify: Notify,
}

impl CancelToken {
    /// Create a fresh, uncancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal cancellation, waking any blocked or suspended wait phase.
    pub fn cancel(&self) {
        let mut cancelled = self.inner.cancelled.lock().unwrap();
        *cancelled = true;
        drop(cancelled);
        self.inner.condvar.notify_all();
        self.inner.notify.notify_waiters();
    }

    /// Whether cancellation has been signalled.
    pub fn is_cancelled(&self) -> bool {
        *self.inner.cancelled.lock().unwrap()
    }

    /// Resolve once cancellation is signalled.
    pub async fn cancelled(&self) {
        use std::pin::pin;

        if self.is_cancelled() {
            return;
        }
        let mut notified = pin!(self.inner.notify.notified());
        // Register interest before the final flag check so a cancel landing
        // in between cannot be missed.
        notified.as_mut().enable();
        if self.is_cancelled() {
            return;
        }
        notified.await;
    }

    /// Block the calling thread for `duration` or until cancelled.
    ///
    /// Returns `true` if cancellation cut the wait short.
    pub(crate) fn block_for(&self, duration: Duration) -> bool {
        // A deadline past the representable range means the wait is
        // effectively unbounded; only cancellation ends it.
        let deadline = Instant::now().checked_add(duration);
        let mut cancelled = self.inner.cancelled.lock().unwrap();
        loop {
            if *cancelled {
                return true;
            }
            let remaining = match deadline {
                Some(deadline) => match deadline.checked_duration_since(Instant::now()) {
                    Some(remaining) if !remaining.is_zero() => remaining,
                    _ => return *cancelled,
                },
                None => Duration::from_secs(60),
            };
            let (guard, _) = self.inner.condvar.wait_timeout(cancelled, remaining).unwrap();
            cancelled = guard;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn starts_uncancelled_and_stays_cancelled() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
        token.cancel();
        assert!(token.is_cancelled());
        token.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn clones_share_state() {
        let token = CancelToken::new();
        let clone = token.clone();
        clone.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn block_for_runs_full_duration_when_uncancelled() {
        let token = CancelToken::new();
        let start = Instant::now();
        let cancelled = token.block_for(Duration::from_millis(50));
        assert!(!cancelled);
        assert!(start.elapsed() >= Duration::from_millis(45));
    }

    #[test]
    fn cancel_from_another_thread_wakes_a_blocked_wait() {
        let token = CancelToken::new();
        let remote = token.clone();

        let waker = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            remote.cancel();
        });

        let start = Instant::now();
        let cancelled = token.block_for(Duration::from_secs(60));
        waker.join().expect("waker thread");

        assert!(cancelled);
        assert!(start.elapsed() < Duration::from_secs(10), "wait should end promptly");
    }

    #[test]
    fn block_for_on_cancelled_token_returns_immediately() {
        let token = CancelToken::new();
        token.cancel();
        let start = Instant::now();
        assert!(token.block_for(Duration::from_secs(60)));
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn cancelled_future_resolves_after_cancel() {
        let token = CancelToken::new();
        let waiter = token.clone();

        let task = tokio::spawn(async move { waiter.cancelled().await });
        tokio::time::sleep(Duration::from_millis(20)).await;
        token.cancel();
        task.await.expect("cancelled future");
    }

    #[tokio::test]
    async fn cancelled_future_resolves_immediately_when_already_cancelled() {
        let token = CancelToken::new();
        token.cancel();
        token.cancelled().await;
    }
}
