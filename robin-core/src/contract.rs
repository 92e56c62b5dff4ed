#![allow(unused)]

//! # contract: capability interfaces for every backend robin can drive
//!
//! This module defines the traits a concrete backend client must satisfy, and the
//! plain data types that cross those trait boundaries. Nothing here knows about a
//! particular cloud SDK: the CLI crate implements the traits on top of real clients,
//! tests implement them with `mockall` mocks.
//!
//! ## Traits
//! - [`WorkSource`]: queue-like source with poll + acknowledge (at-least-once).
//! - [`ItemProcessor`]: business action applied to each polled item.
//! - [`ObjectStore`], [`DocumentStore`], [`Cache`]: the remaining backend kinds.
//!
//! ## Mocking & Testing
//! - Every trait is annotated for `mockall`. The mocks are exported when the
//!   `test-export-mocks` feature (on by default) is enabled, so downstream test
//!   suites can use `MockWorkSource` and friends directly.
//!
//! ## Errors
//! - All methods return [`HandlerError`]. Implementors map SDK failures onto the
//!   matching variant (`Poll`, `Acknowledgment`, `Request`) with a readable message.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use mockall::{automock, predicate::*};
use serde::{Deserialize, Serialize};

use crate::error::{HandlerError, HandlerResult};

/// The kinds of backend a handler can be composed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BackendKind {
    Queue,
    ObjectStore,
    DocumentStore,
    Cache,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BackendKind::Queue => "queue",
            BackendKind::ObjectStore => "object store",
            BackendKind::DocumentStore => "document store",
            BackendKind::Cache => "cache",
        };
        f.write_str(name)
    }
}

/// Opaque token used to remove an item from its source once it has been processed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AckToken(String);

impl AckToken {
    pub fn new(token: impl Into<String>) -> Self {
        AckToken(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// One unit of work discovered by a poll (e.g. one queue message).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    /// Source-assigned identifier, when the source has one.
    pub id: Option<String>,
    /// The raw message body.
    pub body: String,
    pub token: AckToken,
}

/// Parameters for one receive call against a [`WorkSource`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceiveParams {
    /// Seconds a received item stays hidden from other consumers.
    pub visibility_timeout: i32,
    /// Seconds to block waiting for at least one item (long polling).
    pub wait_time: i32,
    /// Upper bound on items returned by one poll.
    pub max_messages: i32,
}

impl Default for ReceiveParams {
    fn default() -> Self {
        ReceiveParams {
            visibility_timeout: 30,
            wait_time: 10,
            max_messages: 1,
        }
    }
}

impl ReceiveParams {
    pub fn validate(&self) -> HandlerResult<()> {
        if self.max_messages < 1 {
            return Err(HandlerError::Configuration(format!(
                "max_messages must be at least 1, got {}",
                self.max_messages
            )));
        }
        if self.wait_time < 0 {
            return Err(HandlerError::Configuration(format!(
                "wait_time must not be negative, got {}",
                self.wait_time
            )));
        }
        if self.visibility_timeout < 0 {
            return Err(HandlerError::Configuration(format!(
                "visibility_timeout must not be negative, got {}",
                self.visibility_timeout
            )));
        }
        Ok(())
    }
}

/// Result of one poll-and-process cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// The source returned this many items (acknowledged or not).
    ItemsProcessed(usize),
    NoItems,
    Error(HandlerError),
}

/// An object key together with its version id (empty when versioning is off).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectVersion {
    pub key: String,
    pub version_id: String,
}

/// Queue-like source of work with at-least-once delivery.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait WorkSource: Send + Sync {
    /// Receive up to `params.max_messages` items, waiting at most `params.wait_time`
    /// seconds for the first one. An empty vector means the wait elapsed.
    async fn poll(&self, params: &ReceiveParams) -> HandlerResult<Vec<WorkItem>>;

    /// Remove a processed item. Expired or already-used tokens yield an
    /// [`HandlerError::Acknowledgment`], never a panic.
    async fn acknowledge(&self, token: &AckToken) -> HandlerResult<()>;

    /// Best-effort teardown.
    async fn close(&self) {}
}

/// Business action applied to every polled item before it is acknowledged.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ItemProcessor: Send + Sync {
    async fn process(&self, item: &WorkItem) -> HandlerResult<()>;
}

/// Versioned object storage (a single bucket).
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Every object in the bucket with its version id. Objects whose version
    /// lookup fails are skipped.
    async fn list_object_versions(&self) -> HandlerResult<Vec<ObjectVersion>>;

    /// Version id of a single object.
    async fn object_version(&self, key: &str) -> HandlerResult<String>;

    async fn close(&self) {}
}

/// Document database bound to one database name.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert one JSON object as a document into `collection`.
    async fn insert_document(
        &self,
        collection: &str,
        document: serde_json::Value,
    ) -> HandlerResult<()>;

    async fn close(&self) {}
}

/// Key/value cache.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait Cache: Send + Sync {
    async fn ping(&self) -> HandlerResult<()>;

    async fn get(&self, key: &str) -> HandlerResult<Option<String>>;

    /// Store `value` under `key`; `ttl` of `None` means no expiry.
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> HandlerResult<()>;

    async fn close(&self) {}
}
