//! Closure-backed [`Service`] implementation.
//!
//! [`FnService`] lets embedders (and the test suite) define a service from
//! plain async closures instead of a dedicated type. Handlers for `stop` and
//! `health_check` are optional; omitted ones fall back to the trait
//! defaults.

// Layer 1: Standard library imports
use std::fmt;
use std::future::Future;

// Layer 2: Third-party crate imports
use async_trait::async_trait;
use futures::future::BoxFuture;

// Layer 3: Internal module imports
use super::traits::{BoxError, Service};
use super::types::ServiceHealth;

type StartHandler = Box<dyn Fn() -> BoxFuture<'static, Result<(), BoxError>> + Send + Sync>;
type HealthHandler =
    Box<dyn Fn() -> BoxFuture<'static, Result<ServiceHealth, BoxError>> + Send + Sync>;

/// A [`Service`] assembled from closures.
///
/// # Examples
///
/// ```rust,ignore
/// use steward::{FnService, ServiceHealth};
///
/// let service = FnService::new("flusher", || async {
///     flush_buffers().await?;
///     Ok(())
/// })
/// .on_stop(|| async { Ok(()) })
/// .on_health_check(|| async { Ok(ServiceHealth::healthy()) });
/// ```
pub struct FnService {
    name: String,
    on_start: StartHandler,
    on_stop: Option<StartHandler>,
    on_health_check: Option<HealthHandler>,
}

impl FnService {
    /// Creates a service from a name and a start handler.
    ///
    /// The handler is invoked once per run attempt; it must be re-entrant
    /// because restart policies may call it again after it returns.
    pub fn new<F, Fut>(name: impl Into<String>, on_start: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        Self {
            name: name.into(),
            on_start: Box::new(move || Box::pin(on_start())),
            on_stop: None,
            on_health_check: None,
        }
    }

    /// Installs a graceful-shutdown handler, builder style.
    pub fn on_stop<F, Fut>(mut self, handler: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        self.on_stop = Some(Box::new(move || Box::pin(handler())));
        self
    }

    /// Installs a health-check handler, builder style.
    pub fn on_health_check<F, Fut>(mut self, handler: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ServiceHealth, BoxError>> + Send + 'static,
    {
        self.on_health_check = Some(Box::new(move || Box::pin(handler())));
        self
    }
}

#[async_trait]
impl Service for FnService {
    fn name(&self) -> &str {
        &self.name
    }

    async fn start(&self) -> Result<(), BoxError> {
        (self.on_start)().await
    }

    async fn stop(&self) -> Result<(), BoxError> {
        match &self.on_stop {
            Some(handler) => handler().await,
            None => Ok(()),
        }
    }

    async fn health_check(&self) -> Result<ServiceHealth, BoxError> {
        match &self.on_health_check {
            Some(handler) => handler().await,
            None => Ok(ServiceHealth::healthy()),
        }
    }
}

impl fmt::Debug for FnService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnService")
            .field("name", &self.name)
            .field("has_stop_handler", &self.on_stop.is_some())
            .field("has_health_handler", &self.on_health_check.is_some())
            .finish()
    }
}
