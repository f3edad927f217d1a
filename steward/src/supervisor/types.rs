//! Type definitions for the supervisor: managed status, restart policies,
//! per-service configuration, supervisor options, and report shapes.

// Layer 1: Standard library imports
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

// Layer 2: Third-party crate imports
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// Layer 3: Internal module imports
use super::cron::CronTrigger;
use crate::service::HealthDetails;

/// Default bound on restart attempts for the on-failure policy.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default base delay for exponential restart backoff.
pub const DEFAULT_BACKOFF_BASE: Duration = Duration::from_millis(1_000);

/// Default cap for exponential restart backoff.
pub const DEFAULT_BACKOFF_MAX: Duration = Duration::from_secs(30);

/// Default bound on a single `stop()` invocation.
pub const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(10);

/// Default bound on a single `health_check()` invocation.
pub const DEFAULT_HEALTH_TIMEOUT: Duration = Duration::from_secs(2);

/// How long a start attempt may stay in flight before the service is
/// considered long-running and promoted to `Running`.
pub const DEFAULT_START_GRACE: Duration = Duration::from_millis(200);

/// Default concurrency cap for start-all / stop-all fan-outs.
pub const DEFAULT_FANOUT_LIMIT: usize = 32;

/// Default capacity of the lifecycle event channel (per supervisor).
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Supervisor-tracked lifecycle status of a service.
///
/// Authoritative: health reports always carry this status, regardless of
/// what the service reports about itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServiceStatus {
    /// Initial state, and terminal state after a clean stop.
    Stopped,

    /// A start attempt is in flight (including restart-loop re-entries).
    Starting,

    /// A long-running start is in flight past the grace window.
    Running,

    /// A user stop is in progress.
    Stopping,

    /// The service failed and no restart is pending (policy exhausted or
    /// none configured).
    Crashed,

    /// Cron-configured service, idle between fires.
    Scheduled,
}

impl ServiceStatus {
    /// Returns `true` for terminal states (`Stopped`, `Crashed`).
    pub fn is_terminal(&self) -> bool {
        matches!(self, ServiceStatus::Stopped | ServiceStatus::Crashed)
    }

    /// Returns `true` while a supervising task owns the service.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            ServiceStatus::Starting | ServiceStatus::Running | ServiceStatus::Stopping
        )
    }

    /// Returns `true` if the service is running.
    pub fn is_running(&self) -> bool {
        matches!(self, ServiceStatus::Running)
    }
}

impl fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ServiceStatus::Stopped => "stopped",
            ServiceStatus::Starting => "starting",
            ServiceStatus::Running => "running",
            ServiceStatus::Stopping => "stopping",
            ServiceStatus::Crashed => "crashed",
            ServiceStatus::Scheduled => "scheduled",
        };
        write!(f, "{label}")
    }
}

/// Declarative rule mapping run outcomes to restart decisions.
///
/// # Examples
///
/// ```rust
/// use steward::RestartPolicy;
///
/// assert_eq!(RestartPolicy::default(), RestartPolicy::No);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RestartPolicy {
    /// Never restart; a failure is terminal.
    #[default]
    No,

    /// Restart on failure, bounded by `max_retries`; a clean completion is
    /// terminal.
    OnFailure,

    /// Restart unconditionally after both failures and clean completions,
    /// until the user stops the service.
    Always,

    /// Restart after both outcomes unless the user has requested a stop.
    UnlessStopped,
}

/// Cron scheduling for a service: a trigger supplying fire times and an
/// optional per-run timeout.
///
/// The supervisor never parses cron expressions; the trigger is consulted
/// once per tick for the next fire time.
#[derive(Clone)]
pub struct CronConfig {
    /// Source of fire times.
    pub trigger: Arc<dyn CronTrigger>,

    /// Bound on each scheduled run; a run exceeding it is treated as failed.
    pub timeout: Option<Duration>,
}

impl CronConfig {
    /// Creates a cron config with no per-run timeout.
    pub fn new(trigger: Arc<dyn CronTrigger>) -> Self {
        Self {
            trigger,
            timeout: None,
        }
    }

    /// Sets the per-run timeout, builder style.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

impl fmt::Debug for CronConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CronConfig")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// Per-service configuration recognized by the supervisor.
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
/// use steward::{RestartPolicy, ServiceConfig};
///
/// let config = ServiceConfig::new()
///     .with_restart_policy(RestartPolicy::OnFailure)
///     .with_max_retries(5)
///     .with_backoff(Duration::from_millis(250), Duration::from_secs(10));
/// assert_eq!(config.max_retries, 5);
/// ```
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Restart policy applied by the supervising task.
    pub restart_policy: RestartPolicy,

    /// Bound on restart attempts; only consulted by
    /// [`RestartPolicy::OnFailure`].
    pub max_retries: u32,

    /// Base delay for exponential restart backoff.
    pub backoff_base: Duration,

    /// Cap for exponential restart backoff.
    pub backoff_max: Duration,

    /// Whether backoff delays carry ±20% jitter.
    pub jitter: bool,

    /// Optional cron scheduling.
    pub cron: Option<CronConfig>,
}

impl ServiceConfig {
    /// Creates a config with the documented defaults: no restarts, 3 max
    /// retries, 1 s base / 30 s cap backoff with jitter, no cron.
    pub fn new() -> Self {
        Self {
            restart_policy: RestartPolicy::default(),
            max_retries: DEFAULT_MAX_RETRIES,
            backoff_base: DEFAULT_BACKOFF_BASE,
            backoff_max: DEFAULT_BACKOFF_MAX,
            jitter: true,
            cron: None,
        }
    }

    /// Sets the restart policy, builder style.
    pub fn with_restart_policy(mut self, policy: RestartPolicy) -> Self {
        self.restart_policy = policy;
        self
    }

    /// Sets the retry bound for the on-failure policy, builder style.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Sets the backoff bounds, builder style.
    pub fn with_backoff(mut self, base: Duration, max: Duration) -> Self {
        self.backoff_base = base;
        self.backoff_max = max;
        self
    }

    /// Enables or disables backoff jitter, builder style.
    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Attaches cron scheduling, builder style.
    pub fn with_cron(mut self, cron: CronConfig) -> Self {
        self.cron = Some(cron);
        self
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Supervisor-wide tuning knobs.
#[derive(Debug, Clone)]
pub struct SupervisorOptions {
    /// Bound on each `stop()` invocation.
    pub stop_timeout: Duration,

    /// Bound on each `health_check()` invocation.
    pub health_timeout: Duration,

    /// How long a start attempt may stay in flight before the entry is
    /// promoted to `Running`.
    pub start_grace: Duration,

    /// Concurrency cap for start-all / stop-all fan-outs.
    pub fanout_limit: usize,

    /// Capacity of the lifecycle event channel.
    pub event_capacity: usize,
}

impl SupervisorOptions {
    /// Creates options with the documented defaults.
    pub fn new() -> Self {
        Self {
            stop_timeout: DEFAULT_STOP_TIMEOUT,
            health_timeout: DEFAULT_HEALTH_TIMEOUT,
            start_grace: DEFAULT_START_GRACE,
            fanout_limit: DEFAULT_FANOUT_LIMIT,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }

    /// Sets the stop timeout, builder style.
    pub fn with_stop_timeout(mut self, timeout: Duration) -> Self {
        self.stop_timeout = timeout;
        self
    }

    /// Sets the health-check timeout, builder style.
    pub fn with_health_timeout(mut self, timeout: Duration) -> Self {
        self.health_timeout = timeout;
        self
    }

    /// Sets the running-promotion grace window, builder style.
    pub fn with_start_grace(mut self, grace: Duration) -> Self {
        self.start_grace = grace;
        self
    }

    /// Sets the fan-out concurrency cap, builder style.
    pub fn with_fanout_limit(mut self, limit: usize) -> Self {
        self.fanout_limit = limit.max(1);
        self
    }

    /// Sets the event channel capacity, builder style.
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity.max(1);
        self
    }
}

impl Default for SupervisorOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time view of one registry entry, as returned by
/// [`Supervisor::services`](super::Supervisor::services).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceInfo {
    /// Registry key.
    pub name: String,

    /// Managed status at snapshot time.
    pub status: ServiceStatus,

    /// Restart attempts since the last clean stop or successful completion.
    pub restart_count: u32,

    /// Configured restart policy.
    pub restart_policy: RestartPolicy,

    /// Whether the entry carries cron scheduling.
    pub cron_configured: bool,
}

/// Aggregated health report for one service.
///
/// `status` is the supervisor's managed status; the service's own view is
/// folded into `details` (under `self_reported`) together with
/// `managed_status` and `restart_count`.
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    /// Managed status at composition time.
    pub status: ServiceStatus,

    /// Service-reported details augmented with supervisor bookkeeping.
    pub details: HealthDetails,

    /// Supervisor clock at composition time.
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn status_predicates() {
        assert!(ServiceStatus::Stopped.is_terminal());
        assert!(ServiceStatus::Crashed.is_terminal());
        assert!(!ServiceStatus::Scheduled.is_terminal());

        assert!(ServiceStatus::Starting.is_active());
        assert!(ServiceStatus::Running.is_active());
        assert!(ServiceStatus::Stopping.is_active());
        assert!(!ServiceStatus::Scheduled.is_active());

        assert!(ServiceStatus::Running.is_running());
        assert!(!ServiceStatus::Starting.is_running());
    }

    #[test]
    fn status_display_is_lowercase() {
        assert_eq!(ServiceStatus::Scheduled.to_string(), "scheduled");
        assert_eq!(ServiceStatus::Crashed.to_string(), "crashed");
    }

    #[test]
    fn config_defaults() {
        let config = ServiceConfig::default();
        assert_eq!(config.restart_policy, RestartPolicy::No);
        assert_eq!(config.max_retries, DEFAULT_MAX_RETRIES);
        assert_eq!(config.backoff_base, DEFAULT_BACKOFF_BASE);
        assert_eq!(config.backoff_max, DEFAULT_BACKOFF_MAX);
        assert!(config.jitter);
        assert!(config.cron.is_none());
    }

    #[test]
    fn config_builders() {
        let config = ServiceConfig::new()
            .with_restart_policy(RestartPolicy::Always)
            .with_max_retries(7)
            .with_backoff(Duration::from_millis(5), Duration::from_millis(50))
            .with_jitter(false);

        assert_eq!(config.restart_policy, RestartPolicy::Always);
        assert_eq!(config.max_retries, 7);
        assert_eq!(config.backoff_base, Duration::from_millis(5));
        assert!(!config.jitter);
    }

    #[test]
    fn options_defaults_and_floors() {
        let options = SupervisorOptions::default();
        assert_eq!(options.stop_timeout, DEFAULT_STOP_TIMEOUT);
        assert_eq!(options.fanout_limit, DEFAULT_FANOUT_LIMIT);

        let options = SupervisorOptions::new()
            .with_fanout_limit(0)
            .with_event_capacity(0);
        assert_eq!(options.fanout_limit, 1);
        assert_eq!(options.event_capacity, 1);
    }
}
