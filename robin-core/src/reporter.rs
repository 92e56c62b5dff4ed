//! Sinks for per-tick poll outcomes.

use std::io::Write;

#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;
use tracing::{info, warn};

use crate::contract::PollOutcome;

/// Receives the outcome of every dispatcher tick, exactly once per tick.
///
/// Implementations must not panic: the dispatcher calls `report` from inside its
/// loop and a failing sink must not take the loop down with it.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
pub trait Reporter: Send + Sync {
    fn report(&self, outcome: &PollOutcome);
}

/// Prints one status line per tick to stdout and mirrors it as a tracing event.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleReporter;

impl ConsoleReporter {
    fn status_line(outcome: &PollOutcome) -> String {
        match outcome {
            PollOutcome::ItemsProcessed(1) => {
                "A new message was received and processed from the queue.".to_string()
            }
            PollOutcome::ItemsProcessed(n) => {
                format!("{n} new messages were received and processed from the queue.")
            }
            PollOutcome::NoItems => "No new messages found in the queue.".to_string(),
            PollOutcome::Error(e) => format!("Error while checking messages: {e}"),
        }
    }
}

impl Reporter for ConsoleReporter {
    fn report(&self, outcome: &PollOutcome) {
        match outcome {
            PollOutcome::ItemsProcessed(count) => info!(count, "[WATCH] Items processed"),
            PollOutcome::NoItems => info!("[WATCH] No items"),
            PollOutcome::Error(e) => warn!(error = %e, "[WATCH] Poll failed"),
        }
        // A closed or broken stdout must not stop the watch loop.
        let _ = writeln!(std::io::stdout().lock(), "{}", Self::status_line(outcome));
    }
}

impl<R: Reporter + ?Sized> Reporter for std::sync::Arc<R> {
    fn report(&self, outcome: &PollOutcome) {
        (**self).report(outcome)
    }
}
