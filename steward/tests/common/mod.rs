//! Shared fixtures for the integration suites: counting services with
//! scriptable failure behavior.

#![allow(dead_code)]
#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use steward::prelude::*;

/// Installs a test subscriber once; controlled through `RUST_LOG`.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Options tuned for test timing: quick running-promotion, tight stop bound.
pub fn fast_options() -> SupervisorOptions {
    SupervisorOptions::new()
        .with_start_grace(Duration::from_millis(20))
        .with_stop_timeout(Duration::from_secs(1))
}

pub async fn sleep_ms(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

/// Every run fails immediately.
pub fn always_failing(name: &'static str) -> (Arc<FnService>, Arc<AtomicU32>) {
    let calls = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&calls);
    let service = FnService::new(name, move || {
        let counter = Arc::clone(&counter);
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err("synthetic failure".into())
        }
    });
    (Arc::new(service), calls)
}

/// Every run succeeds immediately.
pub fn short_lived(name: &'static str) -> (Arc<FnService>, Arc<AtomicU32>) {
    let calls = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&calls);
    let service = FnService::new(name, move || {
        let counter = Arc::clone(&counter);
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    });
    (Arc::new(service), calls)
}

/// Every run parks forever; only cancellation ends it.
pub fn long_running(name: &'static str) -> (Arc<FnService>, Arc<AtomicU32>) {
    let calls = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&calls);
    let service = FnService::new(name, move || {
        let counter = Arc::clone(&counter);
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            futures::future::pending::<()>().await;
            Ok(())
        }
    });
    (Arc::new(service), calls)
}

/// Fails while `remaining_failures` is positive, then parks forever.
///
/// Re-arm between supervision cycles by storing into the returned counter.
pub fn flaky(
    name: &'static str,
    initial_failures: u32,
) -> (Arc<FnService>, Arc<AtomicU32>, Arc<AtomicU32>) {
    let calls = Arc::new(AtomicU32::new(0));
    let remaining = Arc::new(AtomicU32::new(initial_failures));
    let call_counter = Arc::clone(&calls);
    let remaining_counter = Arc::clone(&remaining);
    let service = FnService::new(name, move || {
        let calls = Arc::clone(&call_counter);
        let remaining = Arc::clone(&remaining_counter);
        async move {
            calls.fetch_add(1, Ordering::SeqCst);
            if remaining
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                Err("flaky failure".into())
            } else {
                futures::future::pending::<()>().await;
                Ok(())
            }
        }
    });
    (Arc::new(service), calls, remaining)
}

/// Each run takes `busy` wall-clock time, tracking peak concurrency.
pub fn busy_service(
    name: &'static str,
    busy: Duration,
) -> (Arc<FnService>, Arc<AtomicU32>, Arc<AtomicU32>) {
    let calls = Arc::new(AtomicU32::new(0));
    let peak = Arc::new(AtomicU32::new(0));
    let in_flight = Arc::new(AtomicU32::new(0));
    let call_counter = Arc::clone(&calls);
    let peak_counter = Arc::clone(&peak);
    let service = FnService::new(name, move || {
        let calls = Arc::clone(&call_counter);
        let peak = Arc::clone(&peak_counter);
        let in_flight = Arc::clone(&in_flight);
        async move {
            calls.fetch_add(1, Ordering::SeqCst);
            let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(busy).await;
            in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(())
        }
    });
    (Arc::new(service), calls, peak)
}
