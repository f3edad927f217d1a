//! Restart-policy evaluation.
//!
//! A pure decision function from (policy, exit outcome, user-stop flag,
//! restart bookkeeping) to a restart decision. The supervising task calls it
//! after every run; nothing here touches state or time.
//!
//! Decision table:
//!
//! | Policy | On success | On failure |
//! |---|---|---|
//! | `No` | settle `Stopped` | settle `Crashed` |
//! | `OnFailure` | settle `Stopped` | restart while `restart_count < max_retries`, else `Crashed` |
//! | `Always` | restart | restart |
//! | `UnlessStopped` | restart unless user stop | restart unless user stop |
//!
//! A user-requested stop always settles, overriding unbounded policies. A
//! clean return of a long-running `start()` is not an error: `OnFailure`
//! treats it as a completed service and does not restart.

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
// (none - this module is pure)

// Layer 3: Internal module imports
use super::types::{RestartPolicy, ServiceStatus};

/// How one invocation of `start()` ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitKind {
    /// `start()` returned `Ok`.
    Completed,

    /// `start()` returned an error.
    Failed,
}

/// Decision for the supervising task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyDecision {
    /// Re-enter the start path after a backoff delay.
    Restart,

    /// Stop supervising and settle the entry at the given terminal status
    /// (`Stopped` for clean exits, `Crashed` for failures).
    Settle(ServiceStatus),
}

/// Evaluates the restart policy for one finished run.
///
/// `restart_count` is the number of restarts already performed in this
/// supervision cycle; `max_retries` bounds it for [`RestartPolicy::OnFailure`]
/// (counting retries, so a service allows `max_retries + 1` invocations in
/// total).
///
/// # Examples
///
/// ```rust
/// use steward::policy::{evaluate_exit, ExitKind, PolicyDecision};
/// use steward::{RestartPolicy, ServiceStatus};
///
/// let decision = evaluate_exit(RestartPolicy::OnFailure, ExitKind::Failed, false, 3, 3);
/// assert_eq!(decision, PolicyDecision::Settle(ServiceStatus::Crashed));
/// ```
pub fn evaluate_exit(
    policy: RestartPolicy,
    exit: ExitKind,
    user_stop: bool,
    restart_count: u32,
    max_retries: u32,
) -> PolicyDecision {
    match exit {
        ExitKind::Completed => {
            if user_stop {
                return PolicyDecision::Settle(ServiceStatus::Stopped);
            }
            match policy {
                RestartPolicy::Always | RestartPolicy::UnlessStopped => PolicyDecision::Restart,
                RestartPolicy::No | RestartPolicy::OnFailure => {
                    PolicyDecision::Settle(ServiceStatus::Stopped)
                }
            }
        }
        ExitKind::Failed => {
            if user_stop {
                return PolicyDecision::Settle(ServiceStatus::Crashed);
            }
            match policy {
                RestartPolicy::No => PolicyDecision::Settle(ServiceStatus::Crashed),
                RestartPolicy::OnFailure => {
                    if restart_count < max_retries {
                        PolicyDecision::Restart
                    } else {
                        PolicyDecision::Settle(ServiceStatus::Crashed)
                    }
                }
                RestartPolicy::Always | RestartPolicy::UnlessStopped => PolicyDecision::Restart,
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn no_policy_settles_both_ways() {
        assert_eq!(
            evaluate_exit(RestartPolicy::No, ExitKind::Completed, false, 0, 3),
            PolicyDecision::Settle(ServiceStatus::Stopped)
        );
        assert_eq!(
            evaluate_exit(RestartPolicy::No, ExitKind::Failed, false, 0, 3),
            PolicyDecision::Settle(ServiceStatus::Crashed)
        );
    }

    #[test]
    fn on_failure_restarts_until_bound() {
        for count in 0..3 {
            assert_eq!(
                evaluate_exit(RestartPolicy::OnFailure, ExitKind::Failed, false, count, 3),
                PolicyDecision::Restart
            );
        }
        assert_eq!(
            evaluate_exit(RestartPolicy::OnFailure, ExitKind::Failed, false, 3, 3),
            PolicyDecision::Settle(ServiceStatus::Crashed)
        );
    }

    #[test]
    fn on_failure_treats_completion_as_done() {
        assert_eq!(
            evaluate_exit(RestartPolicy::OnFailure, ExitKind::Completed, false, 1, 3),
            PolicyDecision::Settle(ServiceStatus::Stopped)
        );
    }

    #[test]
    fn always_restarts_unconditionally() {
        assert_eq!(
            evaluate_exit(RestartPolicy::Always, ExitKind::Completed, false, 10, 0),
            PolicyDecision::Restart
        );
        assert_eq!(
            evaluate_exit(RestartPolicy::Always, ExitKind::Failed, false, 10, 0),
            PolicyDecision::Restart
        );
    }

    #[test]
    fn unless_stopped_restarts_until_user_stop() {
        assert_eq!(
            evaluate_exit(RestartPolicy::UnlessStopped, ExitKind::Failed, false, 5, 0),
            PolicyDecision::Restart
        );
        assert_eq!(
            evaluate_exit(RestartPolicy::UnlessStopped, ExitKind::Completed, true, 0, 0),
            PolicyDecision::Settle(ServiceStatus::Stopped)
        );
        assert_eq!(
            evaluate_exit(RestartPolicy::UnlessStopped, ExitKind::Failed, true, 0, 0),
            PolicyDecision::Settle(ServiceStatus::Crashed)
        );
    }

    #[test]
    fn user_stop_overrides_always() {
        assert_eq!(
            evaluate_exit(RestartPolicy::Always, ExitKind::Completed, true, 0, 0),
            PolicyDecision::Settle(ServiceStatus::Stopped)
        );
        assert_eq!(
            evaluate_exit(RestartPolicy::Always, ExitKind::Failed, true, 0, 0),
            PolicyDecision::Settle(ServiceStatus::Crashed)
        );
    }

    #[test]
    fn zero_max_retries_crashes_on_first_failure() {
        assert_eq!(
            evaluate_exit(RestartPolicy::OnFailure, ExitKind::Failed, false, 0, 0),
            PolicyDecision::Settle(ServiceStatus::Crashed)
        );
    }
}
