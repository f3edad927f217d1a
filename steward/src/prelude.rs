//! Prelude module for convenient imports.
//!
//! Re-exports the surface most embedders touch:
//!
//! ```rust
//! use steward::prelude::*;
//! ```
//!
//! ## Service contract
//! - [`Service`] - the three-method trait every supervised entity implements
//! - [`FnService`] - closure-backed implementation
//! - [`ServiceHealth`], [`ServiceCondition`] - self-reported health
//! - [`BoxError`] - boxed error alias crossing the service boundary
//!
//! ## Supervision
//! - [`Supervisor`] - the supervisor itself
//! - [`ServiceConfig`], [`SupervisorOptions`] - configuration
//! - [`RestartPolicy`] - No, OnFailure, Always, UnlessStopped
//! - [`ServiceStatus`] - managed lifecycle status
//! - [`SupervisorError`] - operation error taxonomy
//! - [`HealthReport`], [`ServiceInfo`] - query results
//!
//! ## Scheduling and events
//! - [`CronTrigger`], [`IntervalTrigger`], [`CronConfig`] - recurring runs
//! - [`LifecycleEvent`], [`LifecycleEventKind`], [`EventStream`] - observers

pub use crate::service::{BoxError, FnService, HealthDetails, Service, ServiceCondition, ServiceHealth};
pub use crate::supervisor::{
    CronConfig, CronTrigger, EventStream, HealthReport, IntervalTrigger, LifecycleEvent,
    LifecycleEventKind, RestartPolicy, ServiceConfig, ServiceInfo, ServiceStatus, Supervisor,
    SupervisorError, SupervisorOptions,
};
