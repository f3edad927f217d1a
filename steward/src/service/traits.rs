//! Core service trait for supervised entities.
//!
//! Any value implementing [`Service`] can be placed under supervisor
//! management. The trait is intentionally small: the supervisor only ever
//! drives `start`, `stop`, and `health_check`; everything else about the
//! service is opaque to it. Worker-isolation adapters, RPC forwarders, and
//! plain in-process tasks all fit behind the same three methods.

// Layer 1: Standard library imports
use std::error::Error;

// Layer 2: Third-party crate imports
use async_trait::async_trait;

// Layer 3: Internal module imports
use super::types::ServiceHealth;

/// Boxed error type used across the service boundary.
///
/// Services surface their own error types; the supervisor only needs
/// something displayable it can attach to crash transitions and reports.
pub type BoxError = Box<dyn Error + Send + Sync>;

/// Service trait for entities that can be supervised.
///
/// The supervisor holds each registered service behind an `Arc<dyn Service>`
/// and may invoke `health_check` concurrently with a running `start`, so all
/// methods take `&self`; services manage their own interior mutability.
///
/// # Lifecycle Methods
///
/// - `start()`: run the service. A long-running service returns only when it
///   exits (or its future is dropped on cancellation); a short-lived one
///   returns promptly on success. Must be re-entrant: the supervisor will
///   call it again after a restart decision.
/// - `stop()`: request graceful shutdown. Must be idempotent and tolerate
///   being called when the service has already exited.
/// - `health_check()`: report self-assessed health (OPTIONAL, defaults to
///   healthy with no details). The supervisor treats the result as advisory
///   and never lets it override the managed status.
///
/// # Examples
///
/// ```rust,ignore
/// use steward::{Service, ServiceHealth, BoxError};
/// use async_trait::async_trait;
///
/// struct Heartbeat {
///     period: std::time::Duration,
/// }
///
/// #[async_trait]
/// impl Service for Heartbeat {
///     fn name(&self) -> &str {
///         "heartbeat"
///     }
///
///     async fn start(&self) -> Result<(), BoxError> {
///         loop {
///             tokio::time::sleep(self.period).await;
///             // emit a beat...
///         }
///     }
///
///     async fn stop(&self) -> Result<(), BoxError> {
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Service: Send + Sync + 'static {
    /// Unique name of this service within one supervisor.
    ///
    /// Acts as the registry key; must be non-empty and stable for the
    /// lifetime of the value.
    fn name(&self) -> &str;

    /// Run the service.
    ///
    /// # Errors
    ///
    /// Returns an error when the service fails to start or exits abnormally.
    /// The supervisor handles the error according to the configured restart
    /// policy.
    async fn start(&self) -> Result<(), BoxError>;

    /// Request graceful shutdown.
    ///
    /// The supervisor bounds this call with its stop timeout; a service that
    /// does not return in time is abandoned and its supervising task
    /// cancelled.
    ///
    /// # Errors
    ///
    /// Shutdown errors are logged by the supervisor but do not affect the
    /// stop transition; the service is being stopped regardless.
    async fn stop(&self) -> Result<(), BoxError>;

    /// Report self-assessed health.
    ///
    /// The default implementation reports healthy with an empty details map.
    /// Whatever this returns is folded into the supervisor's report as
    /// advisory detail; the report's status field always carries the managed
    /// status.
    ///
    /// # Errors
    ///
    /// Errors are confined to the health report and never propagate as
    /// operation failures.
    async fn health_check(&self) -> Result<ServiceHealth, BoxError> {
        Ok(ServiceHealth::healthy())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    struct NoopService;

    #[async_trait]
    impl Service for NoopService {
        fn name(&self) -> &str {
            "noop"
        }

        async fn start(&self) -> Result<(), BoxError> {
            Ok(())
        }

        async fn stop(&self) -> Result<(), BoxError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn default_health_check_is_healthy() {
        let service = NoopService;
        let health = service.health_check().await.unwrap();
        assert!(health.condition.is_healthy());
        assert!(health.details.is_empty());
    }

    #[test]
    fn service_trait_is_object_safe() {
        fn assert_object_safe(_: &dyn Service) {}
        assert_object_safe(&NoopService);
    }
}
