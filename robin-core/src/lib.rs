#![doc = "robin-core: backend composition and queue polling for robin."]

//! This crate holds all logic that does not depend on a particular cloud SDK:
//! the capability traits backends must implement, the handler that composes them,
//! and the dispatcher that polls a queue on a fixed cadence.
//!
//! # Usage
//! The `robin` CLI crate implements the traits in [`contract`] with real clients and
//! feeds them to a [`handler::HandlerBuilder`]. Tests use the exported mocks instead.

pub mod contract;
pub mod dispatcher;
pub mod error;
pub mod handler;
pub mod reporter;

pub use contract::{BackendKind, PollOutcome, ReceiveParams, WorkItem};
pub use dispatcher::{Dispatcher, DispatcherState};
pub use error::{HandlerError, HandlerResult};
pub use handler::{Backend, Handler, HandlerBuilder, HandlerOption};
pub use reporter::{ConsoleReporter, Reporter};
