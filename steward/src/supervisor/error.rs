//! Error types for supervisor operations.

// Layer 1: Standard library imports
use std::time::Duration;

// Layer 2: Third-party crate imports
use thiserror::Error;

// Layer 3: Internal module imports
use crate::service::BoxError;

/// Errors returned by supervisor operations.
///
/// Health-check failures never appear here; they are confined to the report
/// details. Internal cancellation signals (aborted backoff sleeps, cancelled
/// cron waits) are likewise never surfaced to callers.
///
/// # Examples
///
/// ```rust
/// use steward::SupervisorError;
///
/// let err = SupervisorError::NotFound { name: "worker".into() };
/// assert!(err.is_not_found());
/// assert_eq!(err.service_name(), Some("worker"));
/// ```
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// Operation referenced an unknown service name.
    #[error("service not found: '{name}'")]
    NotFound { name: String },

    /// A service with the same name is already registered.
    #[error("service name already registered: '{name}'")]
    NameAlreadyExists { name: String },

    /// Registration was rejected before touching the registry.
    #[error("invalid service configuration: {reason}")]
    InvalidConfig { reason: String },

    /// The service's `start()` failed and the restart policy allows no
    /// (further) retries.
    #[error("failed to start service '{name}': {source}")]
    StartFailed {
        name: String,
        #[source]
        source: BoxError,
    },

    /// The service's `stop()` did not return within its bound. The
    /// supervising task is cancelled regardless and the entry converges to
    /// `Stopped`.
    #[error("service '{name}' did not stop within {timeout:?}")]
    StopTimeout { name: String, timeout: Duration },

    /// One or more entries failed during a fan-out; carries per-name causes.
    #[error("{} of {total} services failed during fan-out", .failures.len())]
    Aggregate {
        total: usize,
        failures: Vec<(String, SupervisorError)>,
    },
}

impl SupervisorError {
    /// Returns `true` if this error indicates a missing service.
    pub fn is_not_found(&self) -> bool {
        matches!(self, SupervisorError::NotFound { .. })
    }

    /// Returns `true` if this error indicates a duplicate registration.
    pub fn is_name_conflict(&self) -> bool {
        matches!(self, SupervisorError::NameAlreadyExists { .. })
    }

    /// Returns `true` if this error wraps a failed start.
    pub fn is_start_failure(&self) -> bool {
        matches!(self, SupervisorError::StartFailed { .. })
    }

    /// Returns the service name associated with this error, if any.
    pub fn service_name(&self) -> Option<&str> {
        match self {
            SupervisorError::NotFound { name }
            | SupervisorError::NameAlreadyExists { name }
            | SupervisorError::StartFailed { name, .. }
            | SupervisorError::StopTimeout { name, .. } => Some(name),
            _ => None,
        }
    }

    /// For [`SupervisorError::Aggregate`], the names that failed, in fan-out
    /// completion order.
    pub fn failed_names(&self) -> Vec<&str> {
        match self {
            SupervisorError::Aggregate { failures, .. } => {
                failures.iter().map(|(name, _)| name.as_str()).collect()
            }
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::error::Error;

    use super::*;

    #[test]
    fn not_found_predicates() {
        let err = SupervisorError::NotFound {
            name: "ghost".into(),
        };
        assert!(err.is_not_found());
        assert!(!err.is_name_conflict());
        assert_eq!(err.service_name(), Some("ghost"));
        assert!(err.to_string().contains("ghost"));
    }

    #[test]
    fn start_failed_chains_source() {
        let err = SupervisorError::StartFailed {
            name: "worker".into(),
            source: "port already bound".into(),
        };
        assert!(err.is_start_failure());
        assert!(err.source().is_some());
        assert!(err.to_string().contains("port already bound"));
    }

    #[test]
    fn stop_timeout_display() {
        let err = SupervisorError::StopTimeout {
            name: "slow".into(),
            timeout: Duration::from_secs(10),
        };
        assert_eq!(err.service_name(), Some("slow"));
        assert!(err.to_string().contains("10"));
    }

    #[test]
    fn aggregate_collects_names() {
        let err = SupervisorError::Aggregate {
            total: 3,
            failures: vec![
                (
                    "a".into(),
                    SupervisorError::NotFound { name: "a".into() },
                ),
                (
                    "b".into(),
                    SupervisorError::StopTimeout {
                        name: "b".into(),
                        timeout: Duration::from_secs(1),
                    },
                ),
            ],
        };
        assert_eq!(err.failed_names(), vec!["a", "b"]);
        assert!(err.to_string().contains("2 of 3"));
    }
}
