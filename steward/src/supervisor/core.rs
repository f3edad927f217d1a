//! The supervisor: public lifecycle API, health aggregation, and fan-out
//! orchestration.

// Layer 1: Standard library imports
use std::collections::HashMap;
use std::sync::Arc;

// Layer 2: Third-party crate imports
use chrono::Utc;
use futures::future::join_all;
use futures::stream::{self, StreamExt};
use serde_json::{json, Value};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

// Layer 3: Internal module imports
use super::cron::spawn_ticker;
use super::error::SupervisorError;
use super::events::{EventStream, LifecycleEventKind};
use super::registry::{ServiceEntry, Shared, TaskHandle};
use super::task::{supervise, RunContext};
use super::types::{HealthReport, ServiceConfig, ServiceInfo, ServiceStatus, SupervisorOptions};
use crate::service::{HealthDetails, Service};

/// Fan-out operations share one bounded-concurrency driver.
#[derive(Debug, Clone, Copy)]
enum FanOutOp {
    Start,
    Stop,
}

/// What `stop_service` found under the lock.
enum StopPath {
    /// Already `Stopped` or `Crashed`.
    Noop,

    /// An idle cron entry; it settled straight to `Stopped` under the lock.
    Settled,

    /// An active entry to wind down.
    Active {
        seq: u64,
        supervising: Option<TaskHandle>,
        service: Arc<dyn Service>,
    },
}

/// An in-process service supervisor.
///
/// Owns a registry of named services and drives their lifecycle: start/stop
/// transitions, restart policies with exponential backoff, cron-fired
/// recurring runs, and managed health reporting. The supervisor is an
/// ordinary value; clone it to share one instance across tasks.
///
/// # Examples
///
/// ```rust,ignore
/// use std::sync::Arc;
/// use steward::{FnService, RestartPolicy, ServiceConfig, Supervisor};
///
/// let supervisor = Supervisor::new();
///
/// supervisor
///     .add_service(
///         Arc::new(FnService::new("ingest", || async {
///             run_ingest_loop().await
///         })),
///         ServiceConfig::new().with_restart_policy(RestartPolicy::OnFailure),
///     )
///     .await?;
///
/// supervisor.start_service("ingest").await?;
/// let report = supervisor.health_check_service("ingest").await?;
/// println!("ingest is {}", report.status);
/// ```
#[derive(Clone)]
pub struct Supervisor {
    shared: Arc<Shared>,
}

impl Supervisor {
    /// Creates a supervisor with default [`SupervisorOptions`].
    pub fn new() -> Self {
        Self::with_options(SupervisorOptions::default())
    }

    /// Creates a supervisor with the given options.
    pub fn with_options(options: SupervisorOptions) -> Self {
        Self {
            shared: Arc::new(Shared::new(options)),
        }
    }

    /// Registers a service without starting it.
    ///
    /// Cron-configured entries start in `Scheduled` status and get their
    /// ticker spawned immediately; everything else starts `Stopped`.
    ///
    /// # Errors
    ///
    /// [`SupervisorError::InvalidConfig`] for an empty name,
    /// [`SupervisorError::NameAlreadyExists`] for a duplicate one.
    pub async fn add_service(
        &self,
        service: Arc<dyn Service>,
        config: ServiceConfig,
    ) -> Result<(), SupervisorError> {
        let name = service.name().to_string();
        if name.is_empty() {
            return Err(SupervisorError::InvalidConfig {
                reason: "service name must not be empty".into(),
            });
        }

        {
            let mut registry = self.shared.registry.lock();
            if registry.contains(&name) {
                return Err(SupervisorError::NameAlreadyExists { name });
            }
            let mut entry = ServiceEntry::new(service, config);
            if let Some(cron) = entry.config.cron.clone() {
                entry.cron = Some(spawn_ticker(
                    Arc::clone(&self.shared),
                    name.clone(),
                    Arc::clone(&cron.trigger),
                    cron.timeout,
                ));
            }
            registry.insert(name.clone(), entry);
        }

        self.shared.events.publish(&name, LifecycleEventKind::Added);
        info!(service = %name, "service registered");
        Ok(())
    }

    /// Deregisters a service, stopping it best-effort first.
    ///
    /// Stop failures (including timeouts) are logged and swallowed; the
    /// entry is removed regardless.
    ///
    /// # Errors
    ///
    /// [`SupervisorError::NotFound`] if the name is unknown.
    pub async fn remove_service(&self, name: &str) -> Result<(), SupervisorError> {
        {
            let registry = self.shared.registry.lock();
            if !registry.contains(name) {
                return Err(SupervisorError::NotFound { name: name.into() });
            }
        }

        if let Err(error) = self.stop_service(name).await {
            debug!(service = name, error = %error, "ignoring stop failure during removal");
        }

        let removed = { self.shared.registry.lock().remove(name) };
        if let Some(entry) = removed {
            if let Some(cron) = &entry.cron {
                cron.cancel();
            }
            if let Some(supervising) = &entry.supervising {
                supervising.cancel();
            }
        }

        self.shared.events.publish(name, LifecycleEventKind::Removed);
        info!(service = name, "service removed");
        Ok(())
    }

    /// Starts a service under supervision.
    ///
    /// No-op success when the service is already `Starting` or `Running`.
    /// Otherwise clears the user-stop flag, resets the restart count, spawns
    /// a supervising task, and resolves with the outcome of the first
    /// attempt: success once the run is `Running` (or completed cleanly, or
    /// failed with a retry scheduled), failure only when the first attempt
    /// failed terminally.
    ///
    /// # Errors
    ///
    /// [`SupervisorError::NotFound`] for an unknown name,
    /// [`SupervisorError::StartFailed`] when the first attempt fails and the
    /// policy allows no retry.
    pub async fn start_service(&self, name: &str) -> Result<(), SupervisorError> {
        let ack_rx = {
            let mut registry = self.shared.registry.lock();
            let entry = registry
                .get_mut(name)
                .ok_or_else(|| SupervisorError::NotFound { name: name.into() })?;

            if matches!(
                entry.status,
                ServiceStatus::Starting | ServiceStatus::Running
            ) {
                debug!(service = name, status = %entry.status, "start is a no-op");
                None
            } else {
                entry.user_stop = false;
                entry.status = ServiceStatus::Starting;
                entry.restart_count = 0;
                entry.run_seq += 1;

                let token = CancellationToken::new();
                let (ack_tx, ack_rx) = oneshot::channel();
                let ctx = RunContext {
                    shared: Arc::clone(&self.shared),
                    name: name.to_string(),
                    service: Arc::clone(&entry.service),
                    token: token.clone(),
                    seq: entry.run_seq,
                };
                let config = entry.config.clone();
                let handle = tokio::spawn(supervise(ctx, config, ack_tx));
                entry.supervising = Some(TaskHandle { handle, token });

                // A user stop suppresses the cron ticker; a subsequent start
                // revives it.
                if let Some(cron) = entry.config.cron.clone() {
                    let needs_ticker = entry
                        .cron
                        .as_ref()
                        .map_or(true, |t| t.token.is_cancelled() || t.handle.is_finished());
                    if needs_ticker {
                        if let Some(old) = entry.cron.take() {
                            old.cancel();
                        }
                        entry.cron = Some(spawn_ticker(
                            Arc::clone(&self.shared),
                            name.to_string(),
                            Arc::clone(&cron.trigger),
                            cron.timeout,
                        ));
                    }
                }

                Some(ack_rx)
            }
        };

        let Some(ack_rx) = ack_rx else {
            return Ok(());
        };
        info!(service = name, "starting service");
        match ack_rx.await {
            Ok(result) => result,
            // The supervising task was torn down before reporting; a
            // concurrent stop superseded this start.
            Err(_) => Ok(()),
        }
    }

    /// Stops a service.
    ///
    /// Sets the durable user-stop flag, suppresses the cron ticker, invokes
    /// `stop()` under the stop timeout, cancels the supervising task, and
    /// converges the entry to `Stopped` with its restart count reset. No-op
    /// success when the service is already `Stopped` or `Crashed`. A
    /// `Scheduled` entry idling between fires has nothing running, so it
    /// settles straight to `Stopped` without a `Stopping` transition or a
    /// `stop()` invocation.
    ///
    /// # Errors
    ///
    /// [`SupervisorError::NotFound`] for an unknown name,
    /// [`SupervisorError::StopTimeout`] when `stop()` exceeded its bound
    /// (the supervising task is cancelled and the entry still converges to
    /// `Stopped`).
    pub async fn stop_service(&self, name: &str) -> Result<(), SupervisorError> {
        let path = {
            let mut registry = self.shared.registry.lock();
            let entry = registry
                .get_mut(name)
                .ok_or_else(|| SupervisorError::NotFound { name: name.into() })?;

            entry.user_stop = true;
            if let Some(cron) = &entry.cron {
                cron.cancel();
            }

            if entry.status.is_terminal() {
                StopPath::Noop
            } else if entry.status == ServiceStatus::Scheduled {
                entry.status = ServiceStatus::Stopped;
                entry.restart_count = 0;
                StopPath::Settled
            } else {
                entry.status = ServiceStatus::Stopping;
                StopPath::Active {
                    seq: entry.run_seq,
                    supervising: entry.supervising.take(),
                    service: Arc::clone(&entry.service),
                }
            }
        };

        let (seq, supervising, service) = match path {
            StopPath::Noop => {
                debug!(service = name, "stop is a no-op for a terminal service");
                return Ok(());
            }
            StopPath::Settled => {
                self.shared.events.publish(name, LifecycleEventKind::Stopped);
                info!(service = name, "scheduled service stopped");
                return Ok(());
            }
            StopPath::Active {
                seq,
                supervising,
                service,
            } => (seq, supervising, service),
        };

        self.shared
            .events
            .publish(name, LifecycleEventKind::Stopping);
        info!(service = name, "stopping service");

        let stop_timeout = self.shared.options.stop_timeout;
        let mut result = Ok(());
        match tokio::time::timeout(stop_timeout, service.stop()).await {
            Ok(Ok(())) => {}
            Ok(Err(error)) => {
                warn!(service = name, error = %error, "service stop handler returned an error");
            }
            Err(_) => {
                warn!(service = name, timeout = ?stop_timeout, "service stop timed out");
                result = Err(SupervisorError::StopTimeout {
                    name: name.into(),
                    timeout: stop_timeout,
                });
            }
        }

        if let Some(task) = supervising {
            task.cancel();
            let abort = task.handle.abort_handle();
            if tokio::time::timeout(stop_timeout, task.handle).await.is_err() {
                warn!(
                    service = name,
                    "supervising task ignored cancellation; abandoning it"
                );
                abort.abort();
            }
        }

        {
            let mut registry = self.shared.registry.lock();
            if let Some(entry) = registry.get_mut(name) {
                // A newer start owns the entry if the generation moved on.
                if entry.run_seq == seq && entry.status == ServiceStatus::Stopping {
                    entry.status = ServiceStatus::Stopped;
                    entry.restart_count = 0;
                }
            }
        }

        self.shared.events.publish(name, LifecycleEventKind::Stopped);
        result
    }

    /// Stops then starts a service.
    ///
    /// # Errors
    ///
    /// Propagates the first failure from either phase.
    pub async fn restart_service(&self, name: &str) -> Result<(), SupervisorError> {
        self.stop_service(name).await?;
        self.start_service(name).await
    }

    /// Composes a health report for one service.
    ///
    /// The report's status is always the managed status; the service's own
    /// `health_check()` runs under the health timeout and contributes only
    /// details (with `{"error": ...}` substituted on timeout or failure),
    /// augmented with `managed_status` and `restart_count`.
    ///
    /// # Errors
    ///
    /// [`SupervisorError::NotFound`] if the name is unknown.
    pub async fn health_check_service(
        &self,
        name: &str,
    ) -> Result<HealthReport, SupervisorError> {
        let service = {
            let registry = self.shared.registry.lock();
            let entry = registry
                .get(name)
                .ok_or_else(|| SupervisorError::NotFound { name: name.into() })?;
            Arc::clone(&entry.service)
        };

        let health_timeout = self.shared.options.health_timeout;
        let mut details =
            match tokio::time::timeout(health_timeout, service.health_check()).await {
                Ok(Ok(health)) => {
                    let mut details = health.details;
                    details.insert(
                        "self_reported".into(),
                        serde_json::to_value(&health.condition).unwrap_or(Value::Null),
                    );
                    details
                }
                Ok(Err(error)) => {
                    debug!(service = name, error = %error, "health check failed");
                    let mut details = HealthDetails::new();
                    details.insert("error".into(), Value::String(error.to_string()));
                    details
                }
                Err(_) => {
                    debug!(service = name, timeout = ?health_timeout, "health check timed out");
                    let mut details = HealthDetails::new();
                    details.insert(
                        "error".into(),
                        Value::String(format!(
                            "health check timed out after {health_timeout:?}"
                        )),
                    );
                    details
                }
            };

        let (status, restart_count) = {
            let registry = self.shared.registry.lock();
            let entry = registry
                .get(name)
                .ok_or_else(|| SupervisorError::NotFound { name: name.into() })?;
            (entry.status, entry.restart_count)
        };
        details.insert("managed_status".into(), Value::String(status.to_string()));
        details.insert("restart_count".into(), json!(restart_count));

        self.shared
            .events
            .publish(name, LifecycleEventKind::HealthChecked);
        Ok(HealthReport {
            status,
            details,
            timestamp: Utc::now(),
        })
    }

    /// Health-checks every registered service with unbounded concurrency.
    ///
    /// Per-service failures are confined to the individual report and never
    /// abort the fan-out: the map carries an entry for every service, with a
    /// check that failed outright (for example, the service was removed
    /// mid-fan-out) synthesized as a `Crashed` report carrying the failure
    /// under its `error` detail.
    pub async fn health_check_all_services(&self) -> HashMap<String, HealthReport> {
        let names = { self.shared.registry.lock().names() };
        let checks = names.into_iter().map(|name| async move {
            let report = match self.health_check_service(&name).await {
                Ok(report) => report,
                Err(error) => {
                    debug!(service = %name, error = %error, "synthesizing report for failed check");
                    let mut details = HealthDetails::new();
                    details.insert("error".into(), Value::String(error.to_string()));
                    HealthReport {
                        status: ServiceStatus::Crashed,
                        details,
                        timestamp: Utc::now(),
                    }
                }
            };
            (name, report)
        });

        join_all(checks).await.into_iter().collect()
    }

    /// Starts every registered service, bounded by the fan-out limit.
    ///
    /// # Errors
    ///
    /// [`SupervisorError::Aggregate`] listing per-name causes when any entry
    /// fails; individual failures never abort the fan-out.
    pub async fn start_all_services(&self) -> Result<(), SupervisorError> {
        self.fan_out(FanOutOp::Start).await
    }

    /// Stops every registered service, bounded by the fan-out limit.
    ///
    /// # Errors
    ///
    /// [`SupervisorError::Aggregate`] listing per-name causes when any entry
    /// fails; individual failures never abort the fan-out.
    pub async fn stop_all_services(&self) -> Result<(), SupervisorError> {
        self.fan_out(FanOutOp::Stop).await
    }

    async fn fan_out(&self, op: FanOutOp) -> Result<(), SupervisorError> {
        let names = { self.shared.registry.lock().names() };
        let total = names.len();

        let failures: Vec<(String, SupervisorError)> = stream::iter(names)
            .map(|name| async move {
                let result = match op {
                    FanOutOp::Start => self.start_service(&name).await,
                    FanOutOp::Stop => self.stop_service(&name).await,
                };
                (name, result)
            })
            .buffer_unordered(self.shared.options.fanout_limit)
            .filter_map(|(name, result)| async move { result.err().map(|error| (name, error)) })
            .collect()
            .await;

        if failures.is_empty() {
            Ok(())
        } else {
            for (name, error) in &failures {
                warn!(service = %name, error = %error, operation = ?op, "fan-out operation failed");
            }
            Err(SupervisorError::Aggregate { total, failures })
        }
    }

    /// Snapshot of registered services in insertion order.
    pub fn services(&self) -> Vec<ServiceInfo> {
        let registry = self.shared.registry.lock();
        registry
            .iter_ordered()
            .map(|(name, entry)| ServiceInfo {
                name: name.to_string(),
                status: entry.status,
                restart_count: entry.restart_count,
                restart_policy: entry.config.restart_policy,
                cron_configured: entry.config.cron.is_some(),
            })
            .collect()
    }

    /// Managed status of one service.
    ///
    /// # Errors
    ///
    /// [`SupervisorError::NotFound`] if the name is unknown.
    pub fn service_status(&self, name: &str) -> Result<ServiceStatus, SupervisorError> {
        let registry = self.shared.registry.lock();
        registry
            .get(name)
            .map(|entry| entry.status)
            .ok_or_else(|| SupervisorError::NotFound { name: name.into() })
    }

    /// Number of registered services.
    pub fn service_count(&self) -> usize {
        self.shared.registry.lock().len()
    }

    /// Subscribes to lifecycle events from this point onward.
    ///
    /// Events are per-service-ordered; cross-service ordering is
    /// best-effort. Back-pressure is drop-oldest per subscriber: a consumer
    /// lagging more than the channel capacity loses the oldest events.
    pub fn events(&self) -> EventStream {
        self.shared.events.subscribe()
    }
}

impl Default for Supervisor {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Supervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Supervisor")
            .field("services", &self.service_count())
            .finish_non_exhaustive()
    }
}
