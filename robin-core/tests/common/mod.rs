#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use robin_core::contract::{AckToken, PollOutcome, WorkItem};
use robin_core::reporter::Reporter;
use tokio_util::sync::CancellationToken;
use tracing::field::{Field, Visit};
use tracing_subscriber::{layer::Context, Layer};

pub fn item(n: usize) -> WorkItem {
    WorkItem {
        id: Some(format!("msg-{n}")),
        body: format!("body {n}"),
        token: AckToken::new(format!("receipt-{n}")),
    }
}

/// Records every outcome and cancels the run once `cancel_after` outcomes arrived.
pub struct RecordingReporter {
    pub outcomes: Mutex<Vec<PollOutcome>>,
    cancel_after: usize,
    cancel: CancellationToken,
}

impl RecordingReporter {
    pub fn new(cancel_after: usize, cancel: CancellationToken) -> Arc<Self> {
        Arc::new(RecordingReporter {
            outcomes: Mutex::new(Vec::new()),
            cancel_after,
            cancel,
        })
    }

    pub fn outcomes(&self) -> Vec<PollOutcome> {
        self.outcomes.lock().unwrap().clone()
    }
}

impl Reporter for RecordingReporter {
    fn report(&self, outcome: &PollOutcome) {
        let mut outcomes = self.outcomes.lock().unwrap();
        outcomes.push(outcome.clone());
        if outcomes.len() >= self.cancel_after {
            self.cancel.cancel();
        }
    }
}

struct MessageVisitor<'a>(&'a mut String);

impl Visit for MessageVisitor<'_> {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.0.push_str(&format!("{value:?}"));
        }
    }
}

/// Layer that collects the message of every emitted event.
pub struct EventCollector {
    pub events: Arc<Mutex<Vec<String>>>,
}

impl<S> Layer<S> for EventCollector
where
    S: tracing::Subscriber,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let mut msg = String::new();
        event.record(&mut MessageVisitor(&mut msg));
        self.events.lock().unwrap().push(msg);
    }
}
