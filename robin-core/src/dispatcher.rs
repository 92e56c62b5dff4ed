//! Periodic polling: one poll-and-process cycle, and the ticking loop that drives it.
//!
//! The loop:
//!   - a single timer; the next tick is not considered until the current poll returns,
//!     so a slow poll delays the schedule instead of overlapping with it
//!   - a [`CancellationToken`] checked at every tick boundary; an in-flight poll is
//!     never aborted
//!   - transient errors are reported and the loop carries on; fatal ones
//!     (see [`HandlerError::is_fatal`]) stop it
//!
//! # Navigation
//! - [`receive_and_process`]: one cycle against a [`WorkSource`]
//! - [`Dispatcher`]: the `Idle -> Running -> Stopped` loop

use std::future::Future;
use std::time::Duration;

use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::contract::{ItemProcessor, PollOutcome, ReceiveParams, WorkSource};
use crate::error::{HandlerError, HandlerResult};
use crate::reporter::Reporter;

/// Poll `source` once and run every returned item through `processor`, in order.
///
/// Items are acknowledged only after `processor` accepts them. A rejected item keeps
/// its token unused and becomes visible again once its visibility timeout expires.
/// Acknowledgment failures are logged and not retried within the cycle.
///
/// The count in [`PollOutcome::ItemsProcessed`] is the number of items the source
/// returned, not the number acknowledged. A failed poll is returned as
/// [`HandlerError::Poll`].
pub async fn receive_and_process(
    source: &dyn WorkSource,
    processor: &dyn ItemProcessor,
    params: &ReceiveParams,
) -> HandlerResult<PollOutcome> {
    params.validate()?;

    let items = source.poll(params).await.map_err(|e| match e {
        HandlerError::Poll(_) => e,
        other if other.is_fatal() => other,
        other => HandlerError::Poll(other.to_string()),
    })?;

    if items.is_empty() {
        debug!("Poll returned no items");
        return Ok(PollOutcome::NoItems);
    }

    info!(count = items.len(), "Poll returned items");
    for item in &items {
        debug!(item_id = ?item.id, body = %item.body, "Processing item");
        if let Err(e) = processor.process(item).await {
            warn!(item_id = ?item.id, error = %e, "Item processing failed, leaving it for redelivery");
            continue;
        }
        match source.acknowledge(&item.token).await {
            Ok(()) => info!(item_id = ?item.id, "Item acknowledged"),
            Err(e) => {
                let e = match e {
                    HandlerError::Acknowledgment(_) => e,
                    other => HandlerError::Acknowledgment(other.to_string()),
                };
                error!(item_id = ?item.id, error = %e, "Failed to acknowledge item");
            }
        }
    }

    Ok(PollOutcome::ItemsProcessed(items.len()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatcherState {
    Idle,
    Running,
    Stopped,
}

/// Drives a poll function on a fixed cadence until cancelled.
pub struct Dispatcher<R> {
    reporter: R,
    cancel: CancellationToken,
    state: DispatcherState,
}

impl<R: Reporter> Dispatcher<R> {
    pub fn new(reporter: R) -> Self {
        Self::with_cancellation(reporter, CancellationToken::new())
    }

    /// Use an externally owned token, e.g. one cancelled from a signal handler.
    pub fn with_cancellation(reporter: R, cancel: CancellationToken) -> Self {
        Dispatcher {
            reporter,
            cancel,
            state: DispatcherState::Idle,
        }
    }

    pub fn state(&self) -> DispatcherState {
        self.state
    }

    /// A handle that stops the loop at its next tick boundary when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn reporter(&self) -> &R {
        &self.reporter
    }

    /// Run `poll_fn` once per `cadence` until the cancellation token fires.
    ///
    /// The first poll happens one cadence after the call. Returns `Ok(())` after a
    /// cancellation, or the first fatal error produced by `poll_fn` (which is still
    /// reported for its tick). Either way the dispatcher ends up `Stopped` and cannot
    /// be started again. A zero cadence, or one too large to schedule, is rejected
    /// and leaves the dispatcher `Idle`.
    pub async fn start<F, Fut>(&mut self, cadence: Duration, mut poll_fn: F) -> HandlerResult<()>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = HandlerResult<PollOutcome>>,
    {
        match self.state {
            DispatcherState::Idle => {}
            DispatcherState::Running => {
                return Err(HandlerError::InvalidState(
                    "dispatcher is already running".to_string(),
                ))
            }
            DispatcherState::Stopped => {
                return Err(HandlerError::InvalidState(
                    "dispatcher has been stopped and cannot be restarted".to_string(),
                ))
            }
        }
        if cadence.is_zero() {
            return Err(HandlerError::Configuration(
                "cadence must be greater than zero".to_string(),
            ));
        }
        let first_tick = Instant::now().checked_add(cadence).ok_or_else(|| {
            HandlerError::Configuration(format!("cadence of {cadence:?} is too large"))
        })?;

        self.state = DispatcherState::Running;
        let run_id = Uuid::new_v4();
        let run_span = info_span!("dispatcher", %run_id, cadence_secs = cadence.as_secs_f64());
        let result = self
            .run_loop(first_tick, cadence, &mut poll_fn)
            .instrument(run_span)
            .await;
        self.state = DispatcherState::Stopped;
        result
    }

    async fn run_loop<F, Fut>(
        &self,
        first_tick: Instant,
        cadence: Duration,
        poll_fn: &mut F,
    ) -> HandlerResult<()>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = HandlerResult<PollOutcome>>,
    {
        let mut ticker = interval_at(first_tick, cadence);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!("[WATCH] Starting periodic check on queue");

        let mut tick: u64 = 0;
        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    info!(ticks = tick, "[WATCH] Cancellation observed, stopping");
                    return Ok(());
                }
                _ = ticker.tick() => {}
            }
            tick += 1;

            let outcome = match poll_fn().instrument(info_span!("tick", tick)).await {
                Ok(outcome) => outcome,
                Err(e) if e.is_fatal() => {
                    error!(tick, error = %e, "[WATCH] Fatal error, stopping dispatcher");
                    self.reporter.report(&PollOutcome::Error(e.clone()));
                    return Err(e);
                }
                Err(e) => PollOutcome::Error(e),
            };
            self.reporter.report(&outcome);
        }
    }
}
