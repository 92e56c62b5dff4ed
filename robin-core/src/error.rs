//! Error taxonomy shared by composition, handler operations and the dispatcher.
//!
//! Messages are carried as strings so that a [`HandlerError`] can travel inside a
//! [`PollOutcome`](crate::contract::PollOutcome) and be compared in tests.

use crate::contract::BackendKind;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HandlerError {
    /// A required setting is absent or invalid, or an operation needs a backend
    /// that was never configured.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Connecting or authenticating a backend failed while composing a handler.
    #[error("{kind} backend unavailable: {message}")]
    BackendUnavailable { kind: BackendKind, message: String },

    /// The work source failed to return items for one cycle.
    #[error("poll failed: {0}")]
    Poll(String),

    /// A processed item could not be removed from its source.
    #[error("acknowledgment failed: {0}")]
    Acknowledgment(String),

    /// The per-item business action rejected an item.
    #[error("processing failed: {0}")]
    Processing(String),

    /// A request against a configured (non-queue) backend failed at runtime.
    #[error("{kind} request failed: {message}")]
    Request { kind: BackendKind, message: String },

    #[error("invalid state: {0}")]
    InvalidState(String),
}

impl HandlerError {
    /// Shorthand for the error returned when an operation needs `kind` but the
    /// handler was composed without it.
    pub fn missing_backend(kind: BackendKind) -> Self {
        HandlerError::Configuration(format!("{kind} backend is not configured"))
    }

    /// Fatal errors end a subcommand (and a running dispatcher). Everything else is
    /// isolated to the tick or item it happened in.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            HandlerError::Configuration(_)
                | HandlerError::BackendUnavailable { .. }
                | HandlerError::InvalidState(_)
        )
    }
}

pub type HandlerResult<T> = Result<T, HandlerError>;
