//! Service registry: the single serialization point for all supervisor
//! state.
//!
//! Every entry's status, restart bookkeeping, and task handles live behind
//! one mutex. Lock scopes are short synchronous blocks; the lock is never
//! held across an `await` and never held while invoking service code.

// Layer 1: Standard library imports
use std::collections::HashMap;
use std::sync::Arc;

// Layer 2: Third-party crate imports
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

// Layer 3: Internal module imports
use super::events::EventBus;
use super::types::{ServiceConfig, ServiceStatus, SupervisorOptions};
use crate::service::Service;

/// Handle to a spawned task (supervising run or cron ticker) and its
/// cancellation token.
pub(crate) struct TaskHandle {
    pub(crate) handle: JoinHandle<()>,
    pub(crate) token: CancellationToken,
}

impl TaskHandle {
    /// Signals cancellation without waiting for the task to unwind.
    pub(crate) fn cancel(&self) {
        self.token.cancel();
    }
}

/// Runtime record for one registered service.
pub(crate) struct ServiceEntry {
    pub(crate) service: Arc<dyn Service>,
    pub(crate) config: ServiceConfig,
    pub(crate) status: ServiceStatus,
    pub(crate) restart_count: u32,

    /// Durable user-requested-stop flag. Overrides unbounded restart
    /// policies and suppresses the cron ticker until a subsequent start.
    pub(crate) user_stop: bool,

    /// Generation counter bumped on every spawned run. Supervising tasks
    /// compare it before terminal transitions so a superseded task cannot
    /// clobber a newer run's state.
    pub(crate) run_seq: u64,

    /// The task currently owning the service's execution; present iff
    /// status is `Starting`, `Running`, or `Stopping`.
    pub(crate) supervising: Option<TaskHandle>,

    /// Cron ticker, when cron-configured and not suppressed by a user stop.
    pub(crate) cron: Option<TaskHandle>,
}

impl ServiceEntry {
    pub(crate) fn new(service: Arc<dyn Service>, config: ServiceConfig) -> Self {
        let status = if config.cron.is_some() {
            ServiceStatus::Scheduled
        } else {
            ServiceStatus::Stopped
        };
        Self {
            service,
            config,
            status,
            restart_count: 0,
            user_stop: false,
            run_seq: 0,
            supervising: None,
            cron: None,
        }
    }
}

/// Name-keyed service map preserving insertion order for snapshots.
pub(crate) struct Registry {
    entries: HashMap<String, ServiceEntry>,
    order: Vec<String>,
}

impl Registry {
    pub(crate) fn new() -> Self {
        Self {
            entries: HashMap::new(),
            order: Vec::new(),
        }
    }

    pub(crate) fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Inserts an entry. The caller checks for duplicates first (under the
    /// same lock acquisition).
    pub(crate) fn insert(&mut self, name: String, entry: ServiceEntry) {
        self.order.push(name.clone());
        self.entries.insert(name, entry);
    }

    pub(crate) fn remove(&mut self, name: &str) -> Option<ServiceEntry> {
        let entry = self.entries.remove(name)?;
        self.order.retain(|existing| existing != name);
        Some(entry)
    }

    pub(crate) fn get(&self, name: &str) -> Option<&ServiceEntry> {
        self.entries.get(name)
    }

    pub(crate) fn get_mut(&mut self, name: &str) -> Option<&mut ServiceEntry> {
        self.entries.get_mut(name)
    }

    /// Registered names in insertion order.
    pub(crate) fn names(&self) -> Vec<String> {
        self.order.clone()
    }

    /// Entries in insertion order.
    pub(crate) fn iter_ordered(&self) -> impl Iterator<Item = (&str, &ServiceEntry)> {
        self.order
            .iter()
            .filter_map(|name| self.entries.get(name).map(|entry| (name.as_str(), entry)))
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

/// State shared between the public API, supervising tasks, and cron tickers.
pub(crate) struct Shared {
    pub(crate) registry: Mutex<Registry>,
    pub(crate) events: EventBus,
    pub(crate) options: SupervisorOptions,
}

impl Shared {
    pub(crate) fn new(options: SupervisorOptions) -> Self {
        Self {
            registry: Mutex::new(Registry::new()),
            events: EventBus::new(options.event_capacity),
            options,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::service::{BoxError, Service};
    use crate::supervisor::types::CronConfig;
    use crate::IntervalTrigger;
    use std::time::Duration;

    struct Dummy(&'static str);

    #[async_trait]
    impl Service for Dummy {
        fn name(&self) -> &str {
            self.0
        }

        async fn start(&self) -> Result<(), BoxError> {
            Ok(())
        }

        async fn stop(&self) -> Result<(), BoxError> {
            Ok(())
        }
    }

    fn entry(name: &'static str) -> ServiceEntry {
        ServiceEntry::new(Arc::new(Dummy(name)), ServiceConfig::default())
    }

    #[test]
    fn insertion_order_is_preserved() {
        let mut registry = Registry::new();
        registry.insert("c".into(), entry("c"));
        registry.insert("a".into(), entry("a"));
        registry.insert("b".into(), entry("b"));

        assert_eq!(registry.names(), vec!["c", "a", "b"]);
        let ordered: Vec<&str> = registry.iter_ordered().map(|(name, _)| name).collect();
        assert_eq!(ordered, vec!["c", "a", "b"]);
    }

    #[test]
    fn remove_drops_from_order() {
        let mut registry = Registry::new();
        registry.insert("a".into(), entry("a"));
        registry.insert("b".into(), entry("b"));

        assert!(registry.remove("a").is_some());
        assert!(registry.remove("a").is_none());
        assert_eq!(registry.names(), vec!["b"]);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn new_entry_starts_stopped_or_scheduled() {
        let plain = entry("plain");
        assert_eq!(plain.status, ServiceStatus::Stopped);
        assert_eq!(plain.restart_count, 0);
        assert!(!plain.user_stop);

        let cron_config = ServiceConfig::new().with_cron(CronConfig::new(Arc::new(
            IntervalTrigger::new(Duration::from_secs(60)),
        )));
        let scheduled = ServiceEntry::new(Arc::new(Dummy("cron")), cron_config);
        assert_eq!(scheduled.status, ServiceStatus::Scheduled);
    }
}
