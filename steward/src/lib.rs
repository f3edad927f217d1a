//! # steward - Embedded Service Supervisor
//!
//! An in-process runtime that owns a set of user-defined long-running or
//! short-lived services, drives their lifecycle (start, stop, restart,
//! health-check), applies declarative restart policies with exponential
//! backoff, and re-enters recurring services on cron-like triggers.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use std::time::Duration;
//! use steward::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), SupervisorError> {
//!     let supervisor = Supervisor::new();
//!
//!     // 1. Register a long-running worker that restarts on failure.
//!     supervisor
//!         .add_service(
//!             Arc::new(FnService::new("ingest", || async {
//!                 run_ingest_loop().await // returns Result<(), BoxError>
//!             })),
//!             ServiceConfig::new()
//!                 .with_restart_policy(RestartPolicy::OnFailure)
//!                 .with_max_retries(5)
//!                 .with_backoff(Duration::from_millis(500), Duration::from_secs(30)),
//!         )
//!         .await?;
//!
//!     // 2. Register a recurring job on a fixed interval.
//!     supervisor
//!         .add_service(
//!             Arc::new(FnService::new("compact", || async { compact_segments().await })),
//!             ServiceConfig::new().with_cron(
//!                 CronConfig::new(Arc::new(IntervalTrigger::new(Duration::from_secs(300))))
//!                     .with_timeout(Duration::from_secs(60)),
//!             ),
//!         )
//!         .await?;
//!
//!     // 3. Drive and observe.
//!     supervisor.start_service("ingest").await?;
//!     let report = supervisor.health_check_service("ingest").await?;
//!     println!("ingest: {}", report.status);
//!
//!     supervisor.stop_all_services().await
//! }
//! ```
//!
//! # Core Concepts
//!
//! ## Managed status is authoritative
//!
//! The supervisor tracks each service as `Stopped`, `Starting`, `Running`,
//! `Stopping`, `Crashed`, or `Scheduled`. Health reports always carry this
//! status; whatever the service reports about itself is advisory detail.
//!
//! ## Restart policies
//!
//! - [`RestartPolicy::No`]: a failure is terminal (default)
//! - [`RestartPolicy::OnFailure`]: retry failures up to `max_retries`
//! - [`RestartPolicy::Always`]: re-enter after failures *and* clean
//!   completions, until the user stops the service
//! - [`RestartPolicy::UnlessStopped`]: like `Always`, gated on the durable
//!   user-stop flag
//!
//! Delays between attempts follow `min(max, base * 2^(n-1))` with optional
//! ±20% jitter, and every wait is cancellable: a stop during backoff aborts
//! the loop immediately.
//!
//! ## Cron scheduling
//!
//! A service configured with a [`CronConfig`] idles in `Scheduled` status.
//! Its ticker asks the opaque [`CronTrigger`] for the next fire time, then
//! re-enters the start path: one attempt, no restart loop, bounded by the
//! per-run timeout. Ticks never overlap; while a run is active, fires are
//! skipped rather than queued.
//!
//! ## Concurrency model
//!
//! One supervising tokio task per started service, one ticker task per
//! cron-configured service. All shared state sits behind a single
//! registry-scoped mutex that is never held across an `await` or around
//! service code; cancellation flows through `CancellationToken`s.

// Module declarations
pub mod prelude;
pub mod service;
pub mod supervisor;

// Re-exports for convenient access
pub use service::{BoxError, FnService, HealthDetails, Service, ServiceCondition, ServiceHealth};
pub use supervisor::policy;
pub use supervisor::{
    Backoff, CronConfig, CronTrigger, EventStream, HealthReport, IntervalTrigger, LifecycleEvent,
    LifecycleEventKind, RestartPolicy, ServiceConfig, ServiceInfo, ServiceStatus, Supervisor,
    SupervisorError, SupervisorOptions,
};
