//! Cron scheduling: trigger trait, built-in interval trigger, and the
//! per-service ticker task.
//!
//! The supervisor does not parse cron expressions. A [`CronTrigger`] is an
//! opaque source of fire times, consulted once per tick; wiring a real cron
//! parser up to the trait is an implementer concern.

// Layer 1: Standard library imports
use std::sync::Arc;
use std::time::Duration;

// Layer 2: Third-party crate imports
use chrono::{DateTime, Utc};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::debug;

// Layer 3: Internal module imports
use super::events::LifecycleEventKind;
use super::registry::{Shared, TaskHandle};
use super::task::{run_scheduled, sleep_cancellable, RunContext};
use super::types::ServiceStatus;

/// Source of fire times for a scheduled service.
///
/// Implementations must be cheap to call; the ticker consults the trigger
/// once per tick.
///
/// # Examples
///
/// ```rust
/// use chrono::{DateTime, Duration, Timelike, Utc};
/// use steward::CronTrigger;
///
/// /// Fires at the top of every hour.
/// struct Hourly;
///
/// impl CronTrigger for Hourly {
///     fn next_fire(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
///         let this_hour = now.with_minute(0)?.with_second(0)?.with_nanosecond(0)?;
///         this_hour.checked_add_signed(Duration::hours(1))
///     }
/// }
/// ```
pub trait CronTrigger: Send + Sync + 'static {
    /// The next fire time strictly after `now`, or `None` when the schedule
    /// is exhausted (the ticker then exits).
    fn next_fire(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>>;
}

/// Fixed-period trigger: fires every `period` from the moment it is asked.
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
/// use chrono::Utc;
/// use steward::{CronTrigger, IntervalTrigger};
///
/// let trigger = IntervalTrigger::new(Duration::from_secs(30));
/// let now = Utc::now();
/// let next = trigger.next_fire(now).unwrap();
/// assert_eq!((next - now).num_seconds(), 30);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct IntervalTrigger {
    period: Duration,
}

impl IntervalTrigger {
    /// Creates a trigger firing every `period`.
    pub fn new(period: Duration) -> Self {
        Self { period }
    }

    /// The configured period.
    pub fn period(&self) -> Duration {
        self.period
    }
}

impl CronTrigger for IntervalTrigger {
    fn next_fire(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let period = chrono::Duration::from_std(self.period).ok()?;
        now.checked_add_signed(period)
    }
}

/// Spawns the ticker task for a cron-configured entry.
///
/// Per tick: wait (cancellably) until the trigger's next fire time, skip if
/// the user has requested a stop or a run is still active, otherwise fire a
/// single-attempt run and wait for it to finish. Skip-on-overlap means ticks
/// are never queued.
pub(crate) fn spawn_ticker(
    shared: Arc<Shared>,
    name: String,
    trigger: Arc<dyn CronTrigger>,
    run_timeout: Option<Duration>,
) -> TaskHandle {
    let token = CancellationToken::new();
    let ticker_token = token.clone();

    let handle = tokio::spawn(async move {
        loop {
            let now = Utc::now();
            let Some(next) = trigger.next_fire(now) else {
                debug!(service = %name, "cron trigger exhausted; ticker exiting");
                break;
            };
            let delay = (next - now).to_std().unwrap_or(Duration::ZERO);
            if !sleep_cancellable(delay, &ticker_token).await {
                break;
            }

            let fired = {
                let mut registry = shared.registry.lock();
                let Some(entry) = registry.get_mut(&name) else {
                    break;
                };
                if entry.user_stop {
                    break;
                }
                if entry.status.is_active() {
                    debug!(service = %name, status = %entry.status, "previous run still active; skipping tick");
                    None
                } else {
                    entry.status = ServiceStatus::Starting;
                    entry.run_seq += 1;
                    let run_token = CancellationToken::new();
                    let (done_tx, done_rx) = oneshot::channel();
                    let ctx = RunContext {
                        shared: Arc::clone(&shared),
                        name: name.clone(),
                        service: Arc::clone(&entry.service),
                        token: run_token.clone(),
                        seq: entry.run_seq,
                    };
                    let run = tokio::spawn(run_scheduled(ctx, run_timeout, done_tx));
                    entry.supervising = Some(TaskHandle {
                        handle: run,
                        token: run_token,
                    });
                    Some(done_rx)
                }
            };

            let Some(done_rx) = fired else { continue };
            shared.events.publish(&name, LifecycleEventKind::CronFired);

            // Wait for the run so ticks cannot overlap. A stop cancels both
            // this ticker and the run's own token.
            tokio::select! {
                biased;
                _ = ticker_token.cancelled() => break,
                _ = done_rx => {}
            }
        }
    });

    TaskHandle { handle, token }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn interval_trigger_advances_by_period() {
        let trigger = IntervalTrigger::new(Duration::from_millis(1_500));
        let now = Utc::now();
        let next = trigger.next_fire(now).unwrap();
        assert_eq!((next - now).num_milliseconds(), 1_500);
        assert_eq!(trigger.period(), Duration::from_millis(1_500));
    }

    #[test]
    fn interval_trigger_is_stateless() {
        let trigger = IntervalTrigger::new(Duration::from_secs(1));
        let now = Utc::now();
        assert_eq!(trigger.next_fire(now), trigger.next_fire(now));
    }
}
