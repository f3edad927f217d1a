//! Exponential restart backoff with cap and jitter.
//!
//! Delay formula: `min(max, base * 2^(attempt - 1))`, optionally scaled by a
//! jitter factor drawn uniformly from `[0.8, 1.2]`. The exponent is clamped
//! so large attempt numbers cannot overflow the multiplication.

// Layer 1: Standard library imports
use std::time::Duration;

// Layer 2: Third-party crate imports
use rand::Rng;

// Layer 3: Internal module imports
use super::types::ServiceConfig;

/// Exponent clamp; beyond 2^10 the cap dominates any sane configuration.
const MAX_SHIFT: u32 = 10;

/// Jitter envelope applied around the computed delay.
const JITTER_MIN: f64 = 0.8;
const JITTER_MAX: f64 = 1.2;

/// Restart delay calculator.
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
/// use steward::Backoff;
///
/// let backoff = Backoff::new(Duration::from_millis(100), Duration::from_secs(5))
///     .with_jitter(false);
///
/// assert_eq!(backoff.delay_for(1), Duration::from_millis(100));
/// assert_eq!(backoff.delay_for(2), Duration::from_millis(200));
/// assert_eq!(backoff.delay_for(3), Duration::from_millis(400));
/// // Capped at the configured maximum:
/// assert_eq!(backoff.delay_for(20), Duration::from_secs(5));
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Backoff {
    base: Duration,
    max: Duration,
    jitter: bool,
}

impl Backoff {
    /// Creates a backoff with the given base and cap, jitter enabled.
    pub fn new(base: Duration, max: Duration) -> Self {
        Self {
            base,
            max,
            jitter: true,
        }
    }

    /// Enables or disables jitter, builder style.
    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Derives the backoff from a service configuration.
    pub fn from_config(config: &ServiceConfig) -> Self {
        Self {
            base: config.backoff_base,
            max: config.backoff_max,
            jitter: config.jitter,
        }
    }

    /// Delay before restart attempt `attempt` (1-based).
    ///
    /// Attempt 0 is treated as attempt 1 so callers cannot underflow the
    /// exponent.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(MAX_SHIFT);
        let base_ms = self.base.as_millis() as u64;
        let raw_ms = base_ms.saturating_mul(1u64 << shift);
        let capped_ms = raw_ms.min(self.max.as_millis() as u64);

        if !self.jitter {
            return Duration::from_millis(capped_ms);
        }

        let factor = rand::thread_rng().gen_range(JITTER_MIN..=JITTER_MAX);
        Duration::from_millis((capped_ms as f64 * factor).round() as u64)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::supervisor::types::ServiceConfig;

    #[test]
    fn doubles_per_attempt_without_jitter() {
        let backoff = Backoff::new(Duration::from_millis(50), Duration::from_secs(60))
            .with_jitter(false);

        assert_eq!(backoff.delay_for(1), Duration::from_millis(50));
        assert_eq!(backoff.delay_for(2), Duration::from_millis(100));
        assert_eq!(backoff.delay_for(3), Duration::from_millis(200));
        assert_eq!(backoff.delay_for(4), Duration::from_millis(400));
    }

    #[test]
    fn caps_at_max() {
        let backoff = Backoff::new(Duration::from_millis(100), Duration::from_millis(750))
            .with_jitter(false);

        assert_eq!(backoff.delay_for(3), Duration::from_millis(400));
        assert_eq!(backoff.delay_for(4), Duration::from_millis(750));
        assert_eq!(backoff.delay_for(40), Duration::from_millis(750));
    }

    #[test]
    fn attempt_zero_is_treated_as_first() {
        let backoff =
            Backoff::new(Duration::from_millis(30), Duration::from_secs(1)).with_jitter(false);
        assert_eq!(backoff.delay_for(0), backoff.delay_for(1));
    }

    #[test]
    fn exponent_clamp_prevents_overflow() {
        let backoff =
            Backoff::new(Duration::from_millis(1), Duration::from_secs(3600)).with_jitter(false);
        // 2^10 ms, not 2^u32::MAX.
        assert_eq!(backoff.delay_for(u32::MAX), Duration::from_millis(1024));
    }

    #[test]
    fn jitter_stays_within_envelope() {
        let backoff = Backoff::new(Duration::from_millis(100), Duration::from_secs(60));
        for attempt in 1..=6 {
            let nominal = backoff.with_jitter(false).delay_for(attempt).as_millis() as f64;
            for _ in 0..50 {
                let jittered = backoff.delay_for(attempt).as_millis() as f64;
                assert!(jittered >= (nominal * JITTER_MIN).floor());
                assert!(jittered <= (nominal * JITTER_MAX).ceil());
            }
        }
    }

    #[test]
    fn from_config_copies_bounds() {
        let config = ServiceConfig::new()
            .with_backoff(Duration::from_millis(7), Duration::from_millis(70))
            .with_jitter(false);
        let backoff = Backoff::from_config(&config);
        assert_eq!(backoff.delay_for(1), Duration::from_millis(7));
        assert_eq!(backoff.delay_for(20), Duration::from_millis(70));
    }
}
