//! Backoff delay calculation with symmetric jitter.
//!
//! Attempt semantics: `attempt` is 1-indexed; attempt 1 is the first retry
//! after the initial failure. The delay grows geometrically from
//! `initial_delay`, is capped at `max_delay`, and is then perturbed by up to
//! `jitter_factor` in either direction. Symmetric (rather than one-sided)
//! jitter decorrelates concurrent retriers without inflating the mean delay.
//!
//! Invariants:
//! - `jitter_factor == 0` makes the result deterministic:
//!   `min(initial_delay * multiplier^(attempt-1), max_delay)`.
//! - `jitter_factor == f` keeps the result within `[capped*(1-f), capped*(1+f)]`.
//! - The result is never negative; millisecond rounding saturates on overflow.
//!
//! RNG: uses `rand`'s thread-local RNG by default, which is safe to share
//! across concurrent executions of the same policy. Deterministic RNGs can be
//! injected via [`Backoff::delay_with_rng`].
//!
//! Example
//! ```rust
//! use std::time::Duration;
//! use secondwind::RetryPolicy;
//!
//! let policy = RetryPolicy::<std::io::Error>::builder()
//!     .initial_delay(Duration::from_millis(100))
//!     .backoff_multiplier(2.0)
//!     .jitter_factor(0.0)
//!     .build()
//!     .unwrap();
//! assert_eq!(policy.backoff().delay(1), Duration::from_millis(100));
//! assert_eq!(policy.backoff().delay(2), Duration::from_millis(200));
//! assert_eq!(policy.backoff().delay(3), Duration::from_millis(400));
//! ```

use rand::{rng, Rng};
use std::time::Duration;

/// Backoff parameters shared by every attempt of one execution.
///
/// Constructed by the policy builder; invalid combinations are rejected there,
/// so every `Backoff` reachable from a built policy is well-formed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Backoff {
    initial_delay: Duration,
    multiplier: f64,
    max_delay: Duration,
    jitter_factor: f64,
}

impl Backoff {
    pub(crate) fn new(
        initial_delay: Duration,
        multiplier: f64,
        max_delay: Duration,
        jitter_factor: f64,
    ) -> Self {
        Self { initial_delay, multiplier, max_delay, jitter_factor }
    }

    /// Base wait before the second attempt.
    pub fn initial_delay(&self) -> Duration {
        self.initial_delay
    }

    /// Geometric growth factor per retry.
    pub fn multiplier(&self) -> f64 {
        self.multiplier
    }

    /// Hard ceiling applied after growth, before jitter.
    pub fn max_delay(&self) -> Duration {
        self.max_delay
    }

    /// Fraction of the capped delay that may be randomly added or subtracted.
    pub fn jitter_factor(&self) -> f64 {
        self.jitter_factor
    }

    /// Calculate the delay before retry number `attempt` (1-indexed).
    pub fn delay(&self, attempt: usize) -> Duration {
        self.delay_with_rng(attempt, &mut rng())
    }

    /// Calculate the delay with a caller-supplied RNG (for deterministic tests).
    pub fn delay_with_rng<R: Rng>(&self, attempt: usize, rng: &mut R) -> Duration {
        let base_ms = saturating_millis(self.initial_delay) as f64;
        let max_ms = saturating_millis(self.max_delay) as f64;

        let exponent = attempt.saturating_sub(1).min(i32::MAX as usize) as i32;
        let exponential = base_ms * self.multiplier.powi(exponent);
        let capped = exponential.min(max_ms);

        let jittered = if self.jitter_factor > 0.0 {
            let u: f64 = rng.random_range(-1.0..=1.0);
            capped * (1.0 + u * self.jitter_factor)
        } else {
            capped
        };

        // f64 -> u64 casts saturate, so huge inputs clamp instead of wrapping.
        Duration::from_millis(jittered.max(0.0).round() as u64)
    }
}

fn saturating_millis(duration: Duration) -> u64 {
    duration.as_millis().try_into().unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn backoff(initial_ms: u64, multiplier: f64, max_ms: u64, jitter: f64) -> Backoff {
        Backoff::new(
            Duration::from_millis(initial_ms),
            multiplier,
            Duration::from_millis(max_ms),
            jitter,
        )
    }

    #[test]
    fn zero_jitter_is_deterministic_exponential() {
        let b = backoff(100, 2.0, 30_000, 0.0);
        assert_eq!(b.delay(1), Duration::from_millis(100));
        assert_eq!(b.delay(2), Duration::from_millis(200));
        assert_eq!(b.delay(3), Duration::from_millis(400));
        assert_eq!(b.delay(4), Duration::from_millis(800));
        assert_eq!(b.delay(5), Duration::from_millis(1600));
    }

    #[test]
    fn growth_is_capped_at_max_delay() {
        let b = backoff(100, 2.0, 1_000, 0.0);
        assert_eq!(b.delay(4), Duration::from_millis(800));
        assert_eq!(b.delay(5), Duration::from_millis(1_000)); // capped
        assert_eq!(b.delay(50), Duration::from_millis(1_000)); // still capped
    }

    #[test]
    fn multiplier_of_one_keeps_delay_constant() {
        let b = backoff(250, 1.0, 30_000, 0.0);
        assert_eq!(b.delay(1), Duration::from_millis(250));
        assert_eq!(b.delay(7), Duration::from_millis(250));
    }

    #[test]
    fn jitter_stays_within_symmetric_bounds() {
        let b = backoff(1_000, 2.0, 30_000, 0.25);
        let mut rng = StdRng::seed_from_u64(42);

        for _ in 0..200 {
            let d = b.delay_with_rng(1, &mut rng);
            assert!(d >= Duration::from_millis(750), "below 1-f bound: {:?}", d);
            assert!(d <= Duration::from_millis(1_250), "above 1+f bound: {:?}", d);
        }
    }

    #[test]
    fn jitter_applies_after_the_cap() {
        // Growth saturates at 1s; jitter of 0.5 must range over the cap, not
        // the uncapped exponential value.
        let b = backoff(1_000, 2.0, 1_000, 0.5);
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..200 {
            let d = b.delay_with_rng(10, &mut rng);
            assert!(d >= Duration::from_millis(500));
            assert!(d <= Duration::from_millis(1_500));
        }
    }

    #[test]
    fn full_jitter_factor_never_goes_negative() {
        let b = backoff(100, 2.0, 30_000, 1.0);
        let mut rng = StdRng::seed_from_u64(99);

        for _ in 0..500 {
            let d = b.delay_with_rng(1, &mut rng);
            assert!(d <= Duration::from_millis(200));
        }
    }

    #[test]
    fn zero_initial_delay_yields_zero() {
        let b = backoff(0, 2.0, 30_000, 0.0);
        assert_eq!(b.delay(1), Duration::ZERO);
        assert_eq!(b.delay(9), Duration::ZERO);
    }

    #[test]
    fn huge_attempt_saturates_at_max_delay() {
        let b = backoff(100, 2.0, 30_000, 0.0);
        assert_eq!(b.delay(1_000_000_000), Duration::from_millis(30_000));
    }

    #[test]
    fn huge_durations_do_not_panic() {
        let b = Backoff::new(Duration::MAX, 2.0, Duration::MAX, 0.0);
        let _ = b.delay(3);
    }
}
