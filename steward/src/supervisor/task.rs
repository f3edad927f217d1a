//! Supervising tasks: the run loop that owns a service's execution.
//!
//! One task per started service. Each loop iteration runs a single
//! `start()` attempt, racing it against the cancellation token and the
//! running-promotion grace window, then consults the restart policy under
//! the registry lock. Cron-fired runs reuse the same attempt machinery
//! without the restart loop.
//!
//! The task never touches entry state without re-checking its run
//! generation: a `stop_service` or a newer `start_service` may have
//! superseded it, in which case the newer owner finalizes the status.

// Layer 1: Standard library imports
use std::sync::Arc;
use std::time::Duration;

// Layer 2: Third-party crate imports
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

// Layer 3: Internal module imports
use super::backoff::Backoff;
use super::error::SupervisorError;
use super::events::LifecycleEventKind;
use super::policy::{evaluate_exit, ExitKind, PolicyDecision};
use super::registry::Shared;
use super::types::{ServiceConfig, ServiceStatus};
use crate::service::{BoxError, Service};

/// Resolves the caller's `start_service` future with the outcome of the
/// first attempt.
pub(crate) type AckSender = oneshot::Sender<Result<(), SupervisorError>>;

/// Everything a run needs to execute and report back.
pub(crate) struct RunContext {
    pub(crate) shared: Arc<Shared>,
    pub(crate) name: String,
    pub(crate) service: Arc<dyn Service>,
    pub(crate) token: CancellationToken,
    pub(crate) seq: u64,
}

/// How one invocation of `start()` ended.
enum AttemptOutcome {
    Completed,
    Failed(BoxError),
    Cancelled,
}

fn send_ack(ack: &mut Option<AckSender>, result: Result<(), SupervisorError>) {
    if let Some(tx) = ack.take() {
        let _ = tx.send(result);
    }
}

/// Cancellable sleep. Returns `false` when the token won the race.
pub(crate) async fn sleep_cancellable(delay: Duration, token: &CancellationToken) -> bool {
    tokio::select! {
        biased;
        _ = token.cancelled() => false,
        _ = tokio::time::sleep(delay) => true,
    }
}

/// Runs one `start()` invocation.
///
/// The attempt is raced against the cancellation token; once the grace
/// window elapses with the start still in flight, the entry is promoted to
/// `Running` and the pending ack (if any) resolves successfully.
async fn run_attempt(ctx: &RunContext, ack: &mut Option<AckSender>) -> AttemptOutcome {
    let mut start_fut = ctx.service.start();
    let grace = tokio::time::sleep(ctx.shared.options.start_grace);
    tokio::pin!(grace);

    let early = tokio::select! {
        biased;
        _ = ctx.token.cancelled() => return AttemptOutcome::Cancelled,
        result = &mut start_fut => Some(result),
        _ = &mut grace => None,
    };

    let result = match early {
        Some(result) => result,
        None => {
            // Still in flight past the grace window: this is a long-running
            // service.
            let promoted = {
                let mut registry = ctx.shared.registry.lock();
                match registry.get_mut(&ctx.name) {
                    Some(entry)
                        if entry.run_seq == ctx.seq
                            && entry.status == ServiceStatus::Starting =>
                    {
                        entry.status = ServiceStatus::Running;
                        true
                    }
                    _ => false,
                }
            };
            if !promoted {
                return AttemptOutcome::Cancelled;
            }
            ctx.shared
                .events
                .publish(&ctx.name, LifecycleEventKind::Running);
            send_ack(ack, Ok(()));

            tokio::select! {
                biased;
                _ = ctx.token.cancelled() => return AttemptOutcome::Cancelled,
                result = &mut start_fut => result,
            }
        }
    };

    match result {
        Ok(()) => AttemptOutcome::Completed,
        Err(error) => AttemptOutcome::Failed(error),
    }
}

/// Consults the restart policy under the lock. `None` means the entry is
/// gone or this task has been superseded.
fn decide(ctx: &RunContext, config: &ServiceConfig, exit: ExitKind) -> Option<PolicyDecision> {
    let registry = ctx.shared.registry.lock();
    let entry = registry.get(&ctx.name)?;
    if entry.run_seq != ctx.seq {
        return None;
    }
    Some(evaluate_exit(
        config.restart_policy,
        exit,
        entry.user_stop,
        entry.restart_count,
        config.max_retries,
    ))
}

/// Writes a terminal status, guarded by generation and ownership: a stop in
/// progress (or a newer run) finalizes the entry itself.
fn settle(ctx: &RunContext, status: ServiceStatus, reset_count: bool) -> bool {
    let mut registry = ctx.shared.registry.lock();
    let Some(entry) = registry.get_mut(&ctx.name) else {
        return false;
    };
    if entry.run_seq != ctx.seq
        || !matches!(
            entry.status,
            ServiceStatus::Starting | ServiceStatus::Running
        )
    {
        return false;
    }
    entry.status = status;
    if reset_count {
        entry.restart_count = 0;
    }
    entry.supervising = None;
    true
}

/// Records a restart attempt and computes its delay. `None` means the run
/// was superseded and the loop must exit.
fn schedule_restart(ctx: &RunContext, backoff: &Backoff) -> Option<(u32, Duration)> {
    let mut registry = ctx.shared.registry.lock();
    let entry = registry.get_mut(&ctx.name)?;
    if entry.run_seq != ctx.seq
        || !matches!(
            entry.status,
            ServiceStatus::Starting | ServiceStatus::Running
        )
    {
        return None;
    }
    entry.restart_count += 1;
    entry.status = ServiceStatus::Starting;
    Some((entry.restart_count, backoff.delay_for(entry.restart_count)))
}

/// The supervising loop for a user-initiated start: attempt, evaluate
/// policy, back off, re-enter. Runs until a terminal settle or
/// cancellation.
pub(crate) async fn supervise(ctx: RunContext, config: ServiceConfig, ack: AckSender) {
    let mut ack = Some(ack);
    let backoff = Backoff::from_config(&config);

    loop {
        ctx.shared
            .events
            .publish(&ctx.name, LifecycleEventKind::Starting);

        match run_attempt(&ctx, &mut ack).await {
            AttemptOutcome::Cancelled => break,
            AttemptOutcome::Completed => {
                match decide(&ctx, &config, ExitKind::Completed) {
                    None => break,
                    Some(PolicyDecision::Settle(status)) => {
                        if settle(&ctx, status, true) {
                            ctx.shared
                                .events
                                .publish(&ctx.name, LifecycleEventKind::Stopped);
                            debug!(service = %ctx.name, "service completed");
                        }
                        // The entry has settled before the caller's start
                        // resolves, so a status read right after the call
                        // observes the terminal state.
                        send_ack(&mut ack, Ok(()));
                        break;
                    }
                    Some(PolicyDecision::Restart) => {
                        let Some((attempt, delay)) = schedule_restart(&ctx, &backoff) else {
                            break;
                        };
                        // A clean first run is a successful start even though
                        // the policy immediately re-enters.
                        send_ack(&mut ack, Ok(()));
                        ctx.shared.events.publish(
                            &ctx.name,
                            LifecycleEventKind::RestartScheduled { attempt, delay },
                        );
                        debug!(service = %ctx.name, attempt, ?delay, "restarting after completion");
                        if !sleep_cancellable(delay, &ctx.token).await {
                            break;
                        }
                    }
                }
            }
            AttemptOutcome::Failed(error) => {
                warn!(service = %ctx.name, error = %error, "service start attempt failed");
                ctx.shared.events.publish(
                    &ctx.name,
                    LifecycleEventKind::Crashed {
                        error: error.to_string(),
                    },
                );

                match decide(&ctx, &config, ExitKind::Failed) {
                    None => break,
                    Some(PolicyDecision::Settle(status)) => {
                        settle(&ctx, status, false);
                        send_ack(
                            &mut ack,
                            Err(SupervisorError::StartFailed {
                                name: ctx.name.clone(),
                                source: error,
                            }),
                        );
                        break;
                    }
                    Some(PolicyDecision::Restart) => {
                        let Some((attempt, delay)) = schedule_restart(&ctx, &backoff) else {
                            break;
                        };
                        // Supervision stays engaged; the caller's start has
                        // succeeded in handing the service over.
                        send_ack(&mut ack, Ok(()));
                        ctx.shared.events.publish(
                            &ctx.name,
                            LifecycleEventKind::RestartScheduled { attempt, delay },
                        );
                        debug!(service = %ctx.name, attempt, ?delay, "restarting after failure");
                        if !sleep_cancellable(delay, &ctx.token).await {
                            break;
                        }
                    }
                }
            }
        }
    }

    // A run cancelled before its first transition still resolves the
    // caller's start successfully; the stop path owns the final status.
    send_ack(&mut ack, Ok(()));
}

/// A single cron-fired run: one attempt under the per-run timeout, no
/// restart loop, settling back to `Scheduled` when the tick completes.
pub(crate) async fn run_scheduled(
    ctx: RunContext,
    run_timeout: Option<Duration>,
    done: oneshot::Sender<()>,
) {
    ctx.shared
        .events
        .publish(&ctx.name, LifecycleEventKind::Starting);

    let mut ack = None;
    let outcome = match run_timeout {
        Some(limit) => match tokio::time::timeout(limit, run_attempt(&ctx, &mut ack)).await {
            Ok(outcome) => outcome,
            Err(_) => AttemptOutcome::Failed(
                format!("scheduled run exceeded its {limit:?} timeout").into(),
            ),
        },
        None => run_attempt(&ctx, &mut ack).await,
    };

    match outcome {
        AttemptOutcome::Cancelled => {}
        AttemptOutcome::Completed => {
            if settle(&ctx, ServiceStatus::Scheduled, false) {
                ctx.shared
                    .events
                    .publish(&ctx.name, LifecycleEventKind::Stopped);
                debug!(service = %ctx.name, "scheduled run completed");
            }
        }
        AttemptOutcome::Failed(error) => {
            warn!(service = %ctx.name, error = %error, "scheduled run failed");
            ctx.shared.events.publish(
                &ctx.name,
                LifecycleEventKind::Crashed {
                    error: error.to_string(),
                },
            );
            // Crashed for this tick, then idle again until the next fire.
            if settle(&ctx, ServiceStatus::Crashed, false) {
                let mut registry = ctx.shared.registry.lock();
                if let Some(entry) = registry.get_mut(&ctx.name) {
                    if entry.run_seq == ctx.seq && entry.status == ServiceStatus::Crashed {
                        entry.status = ServiceStatus::Scheduled;
                    }
                }
            }
        }
    }

    let _ = done.send(());
}
