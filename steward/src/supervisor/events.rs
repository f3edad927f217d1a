//! Lifecycle event stream.
//!
//! Every supervisor owns one broadcast topic. Transitions are published
//! best-effort: with no subscribers the send is a no-op, and a slow
//! subscriber loses the oldest events (drop-oldest back-pressure, surfaced
//! to the subscriber only as a debug log).

// Layer 1: Standard library imports
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

// Layer 2: Third-party crate imports
use chrono::{DateTime, Utc};
use futures::Stream;
use serde::Serialize;
use tokio::sync::broadcast;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tracing::debug;

/// What happened to a service.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum LifecycleEventKind {
    /// Service registered.
    Added,

    /// Service deregistered.
    Removed,

    /// A start attempt began.
    Starting,

    /// A long-running start passed the grace window.
    Running,

    /// A user stop began.
    Stopping,

    /// The service reached `Stopped` (clean completion or user stop).
    Stopped,

    /// A run failed.
    Crashed {
        /// Display form of the failure.
        error: String,
    },

    /// The policy scheduled a restart.
    RestartScheduled {
        /// 1-based restart attempt number.
        attempt: u32,
        /// Backoff delay before the attempt.
        delay: Duration,
    },

    /// A cron tick fired a scheduled run.
    CronFired,

    /// A health report was composed for the service.
    HealthChecked,
}

/// One lifecycle transition, stamped with the service name and the
/// supervisor clock.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LifecycleEvent {
    /// Registry key of the service.
    pub service: String,

    /// What happened.
    pub kind: LifecycleEventKind,

    /// When the supervisor observed it.
    pub timestamp: DateTime<Utc>,
}

impl LifecycleEvent {
    fn new(service: &str, kind: LifecycleEventKind) -> Self {
        Self {
            service: service.to_string(),
            kind,
            timestamp: Utc::now(),
        }
    }
}

/// Broadcast topic shared by all publishers of one supervisor.
pub(crate) struct EventBus {
    tx: broadcast::Sender<LifecycleEvent>,
}

impl EventBus {
    pub(crate) fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publishes a transition. Lossy by design: no subscribers means the
    /// event is dropped.
    pub(crate) fn publish(&self, service: &str, kind: LifecycleEventKind) {
        let _ = self.tx.send(LifecycleEvent::new(service, kind));
    }

    pub(crate) fn subscribe(&self) -> EventStream {
        EventStream {
            inner: BroadcastStream::new(self.tx.subscribe()),
        }
    }
}

/// Lazy sequence of [`LifecycleEvent`]s, as returned by
/// [`Supervisor::events`](super::Supervisor::events).
///
/// Each subscriber observes per-service-ordered events from its subscription
/// point onward. If the subscriber falls more than the channel capacity
/// behind, the oldest events are dropped and consumption resumes at the
/// newest available one.
pub struct EventStream {
    inner: BroadcastStream<LifecycleEvent>,
}

impl Stream for EventStream {
    type Item = LifecycleEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            match Pin::new(&mut self.inner).poll_next(cx) {
                Poll::Ready(Some(Ok(event))) => return Poll::Ready(Some(event)),
                Poll::Ready(Some(Err(BroadcastStreamRecvError::Lagged(skipped)))) => {
                    debug!(skipped, "event subscriber lagged; oldest events dropped");
                }
                Poll::Ready(None) => return Poll::Ready(None),
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

impl std::fmt::Debug for EventStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventStream").finish_non_exhaustive()
    }
}
