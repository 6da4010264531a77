//! Abstraction for the blocking wait between attempts.
//!
//! Enables fast, deterministic tests without real time delays: production
//! uses [`ThreadWaiter`]; tests can inject [`InstantWaiter`] or
//! [`TrackingWaiter`].

use crate::cancel::CancelToken;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Strategy for suspending the calling thread between attempts.
pub trait Waiter: Send + Sync + std::fmt::Debug {
    /// Wait for `duration`, returning early if `token` is cancelled.
    ///
    /// Returns `true` when the full duration elapsed and the next attempt may
    /// start; `false` when cancellation cut the wait short.
    fn wait(&self, duration: Duration, token: &CancelToken) -> bool;
}

/// Production waiter that parks the thread on the token's condvar.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadWaiter;

impl Waiter for ThreadWaiter {
    fn wait(&self, duration: Duration, token: &CancelToken) -> bool {
        !token.block_for(duration)
    }
}

/// Test waiter that never sleeps.
#[derive(Debug, Default, Clone, Copy)]
pub struct InstantWaiter;

impl Waiter for InstantWaiter {
    fn wait(&self, _duration: Duration, token: &CancelToken) -> bool {
        !token.is_cancelled()
    }
}

/// Test waiter that records every requested wait without sleeping.
#[derive(Debug, Clone)]
pub struct TrackingWaiter {
    calls: Arc<Mutex<Vec<Duration>>>,
}

impl TrackingWaiter {
    pub fn new() -> Self {
        Self { calls: Arc::new(Mutex::new(Vec::new())) }
    }

    /// All wait durations requested so far, in order.
    pub fn calls(&self) -> Vec<Duration> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.calls.lock().unwrap().clear();
    }
}

impl Default for TrackingWaiter {
    fn default() -> Self {
        Self::new()
    }
}

impl Waiter for TrackingWaiter {
    fn wait(&self, duration: Duration, token: &CancelToken) -> bool {
        self.calls.lock().unwrap().push(duration);
        !token.is_cancelled()
    }
}
