//! Self-reported health types for services.

// Layer 1: Standard library imports
use std::fmt;

// Layer 2: Third-party crate imports
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Opaque key/value bag carried by health reports.
pub type HealthDetails = serde_json::Map<String, Value>;

/// Self-assessed condition reported by a service.
///
/// Advisory only: the supervisor records it inside the report details but
/// derives the report's status field from its own managed state.
///
/// # Examples
///
/// ```rust
/// use steward::ServiceCondition;
///
/// let degraded = ServiceCondition::Degraded("queue backlog".into());
/// assert!(degraded.is_degraded());
/// assert_eq!(degraded.reason(), Some("queue backlog"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServiceCondition {
    /// Service considers itself fully operational.
    Healthy,

    /// Service is operational but impaired (high latency, backlog, resource
    /// pressure).
    Degraded(String),

    /// Service considers itself broken.
    Unhealthy(String),
}

impl ServiceCondition {
    /// Returns `true` if the condition is healthy.
    pub fn is_healthy(&self) -> bool {
        matches!(self, ServiceCondition::Healthy)
    }

    /// Returns `true` if the condition is degraded.
    pub fn is_degraded(&self) -> bool {
        matches!(self, ServiceCondition::Degraded(_))
    }

    /// Returns `true` if the condition is unhealthy.
    pub fn is_unhealthy(&self) -> bool {
        matches!(self, ServiceCondition::Unhealthy(_))
    }

    /// Returns the reason string for degraded or unhealthy conditions.
    pub fn reason(&self) -> Option<&str> {
        match self {
            ServiceCondition::Healthy => None,
            ServiceCondition::Degraded(reason) | ServiceCondition::Unhealthy(reason) => {
                Some(reason)
            }
        }
    }
}

impl fmt::Display for ServiceCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceCondition::Healthy => write!(f, "healthy"),
            ServiceCondition::Degraded(reason) => write!(f, "degraded: {reason}"),
            ServiceCondition::Unhealthy(reason) => write!(f, "unhealthy: {reason}"),
        }
    }
}

/// A service's own view of its health: a condition plus an opaque detail
/// bag. Returned by [`Service::health_check`](super::Service::health_check).
///
/// # Examples
///
/// ```rust
/// use steward::ServiceHealth;
///
/// let health = ServiceHealth::degraded("replica lag")
///     .with_detail("lag_seconds", 42);
/// assert!(health.condition.is_degraded());
/// assert_eq!(health.details["lag_seconds"], 42);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceHealth {
    /// Self-assessed condition.
    pub condition: ServiceCondition,

    /// Opaque service-specific details.
    pub details: HealthDetails,
}

impl ServiceHealth {
    /// A healthy report with no details.
    pub fn healthy() -> Self {
        Self {
            condition: ServiceCondition::Healthy,
            details: HealthDetails::new(),
        }
    }

    /// A degraded report with the given reason.
    pub fn degraded(reason: impl Into<String>) -> Self {
        Self {
            condition: ServiceCondition::Degraded(reason.into()),
            details: HealthDetails::new(),
        }
    }

    /// An unhealthy report with the given reason.
    pub fn unhealthy(reason: impl Into<String>) -> Self {
        Self {
            condition: ServiceCondition::Unhealthy(reason.into()),
            details: HealthDetails::new(),
        }
    }

    /// Attaches a detail entry, builder style.
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }
}

impl Default for ServiceHealth {
    fn default() -> Self {
        Self::healthy()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn condition_predicates() {
        assert!(ServiceCondition::Healthy.is_healthy());
        assert!(ServiceCondition::Degraded("x".into()).is_degraded());
        assert!(ServiceCondition::Unhealthy("x".into()).is_unhealthy());
        assert_eq!(ServiceCondition::Healthy.reason(), None);
        assert_eq!(
            ServiceCondition::Unhealthy("broken pipe".into()).reason(),
            Some("broken pipe")
        );
    }

    #[test]
    fn condition_display() {
        assert_eq!(ServiceCondition::Healthy.to_string(), "healthy");
        assert_eq!(
            ServiceCondition::Degraded("slow".into()).to_string(),
            "degraded: slow"
        );
    }

    #[test]
    fn health_builders() {
        let health = ServiceHealth::healthy().with_detail("connections", 7);
        assert!(health.condition.is_healthy());
        assert_eq!(health.details["connections"], 7);

        let health = ServiceHealth::unhealthy("db unreachable");
        assert_eq!(health.condition.reason(), Some("db unreachable"));
    }

    #[test]
    fn health_serializes() {
        let health = ServiceHealth::degraded("lag").with_detail("lag_seconds", 3);
        let json = serde_json::to_value(&health).unwrap();
        assert_eq!(json["details"]["lag_seconds"], 3);
    }
}
