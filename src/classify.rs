//! Transient-failure classification.
//!
//! The default retry predicate decides whether a failure is worth another
//! attempt. Two complementary checks are applied, in order:
//!
//! 1. A case-insensitive substring match of the failure's display text
//!    against a fixed transient-keyword list. This is the compatibility
//!    heuristic: it catches failures from clients that only surface a
//!    message.
//! 2. A typed check: `std::io::Error` kinds map to categories directly, and
//!    the `source()` chain is walked so a timeout wrapped inside a broader
//!    runtime failure still classifies as transient.
//!
//! The heuristic trades precision for coverage. Callers that need exactness
//! should install their own predicate via `RetryPolicyBuilder::retry_if`, or
//! restrict matching to specific categories via `retry_on`.

use std::error::Error;
use std::io;

/// Keywords that mark a failure message as transient (matched case-insensitively).
pub const TRANSIENT_KEYWORDS: [&str; 6] =
    ["timeout", "connection", "network", "unavailable", "throttl", "rate limit"];

/// Coarse category assigned to a transient failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureCategory {
    /// The operation or a wrapped cause timed out.
    Timeout,
    /// The remote end refused, reset, or dropped the connection.
    Connection,
    /// A network-level fault reported only through the message text.
    Network,
    /// The downstream service reported itself unavailable.
    Unavailable,
    /// The caller was throttled or rate limited.
    Throttled,
    /// Any other I/O failure.
    Io,
}

/// Classify a failure, returning `None` when it does not look transient.
///
/// Keyword matching runs before the typed check so the first matching keyword
/// (in [`TRANSIENT_KEYWORDS`] order) decides the category; "connection
/// timeout" therefore classifies as [`FailureCategory::Timeout`].
pub fn categorize(failure: &(dyn Error + 'static)) -> Option<FailureCategory> {
    let message = failure.to_string().to_lowercase();
    if message.contains("timeout") {
        return Some(FailureCategory::Timeout);
    }
    if message.contains("connection") {
        return Some(FailureCategory::Connection);
    }
    if message.contains("network") {
        return Some(FailureCategory::Network);
    }
    if message.contains("unavailable") {
        return Some(FailureCategory::Unavailable);
    }
    if message.contains("throttl") || message.contains("rate limit") {
        return Some(FailureCategory::Throttled);
    }

    if let Some(io_err) = failure.downcast_ref::<io::Error>() {
        return Some(categorize_io(io_err));
    }

    // A transient cause wrapped inside a generic failure is still transient.
    let mut cause = failure.source();
    while let Some(inner) = cause {
        if let Some(category) = categorize(inner) {
            return Some(category);
        }
        cause = inner.source();
    }

    None
}

/// Default retry predicate: retry anything that classifies as transient.
pub fn is_transient(failure: &(dyn Error + 'static)) -> bool {
    categorize(failure).is_some()
}

fn categorize_io(failure: &io::Error) -> FailureCategory {
    match failure.kind() {
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => FailureCategory::Timeout,
        io::ErrorKind::ConnectionRefused
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionAborted
        | io::ErrorKind::NotConnected => FailureCategory::Connection,
        _ => FailureCategory::Io,
    }
}
