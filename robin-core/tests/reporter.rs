use std::sync::Arc;

use robin_core::{ConsoleReporter, HandlerError, PollOutcome, Reporter};

#[test]
fn console_reporter_handles_every_outcome() {
    let reporter = ConsoleReporter;
    for outcome in [
        PollOutcome::NoItems,
        PollOutcome::ItemsProcessed(1),
        PollOutcome::ItemsProcessed(3),
        PollOutcome::Error(HandlerError::Poll("connection reset".into())),
    ] {
        reporter.report(&outcome);
    }
}

#[test]
fn shared_reporter_forwards_to_inner() {
    let mut inner = robin_core::reporter::MockReporter::new();
    inner
        .expect_report()
        .withf(|outcome| *outcome == PollOutcome::NoItems)
        .times(2)
        .return_const(());

    let shared = Arc::new(inner);
    shared.report(&PollOutcome::NoItems);
    Reporter::report(&shared.clone(), &PollOutcome::NoItems);
}
