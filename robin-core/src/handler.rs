//! Composition of backend clients into a [`Handler`], and the operations it exposes.
//!
//! A handler is assembled by a [`HandlerBuilder`] from an ordered list of
//! [`HandlerOption`]s. Each option validates its own settings and builds exactly one
//! [`Backend`]. Composition is all-or-nothing: the first failing option aborts the
//! build, and every backend built before it is closed and dropped.
//!
//! Once built, a handler is immutable. Operations that need a backend kind the
//! handler was composed without fail with [`HandlerError::Configuration`] before
//! touching anything else.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::contract::{
    BackendKind, Cache, DocumentStore, ItemProcessor, ObjectStore, ObjectVersion, PollOutcome,
    ReceiveParams, WorkItem, WorkSource,
};
use crate::dispatcher::{receive_and_process, Dispatcher};
use crate::error::{HandlerError, HandlerResult};
use crate::reporter::Reporter;

/// One configured backend connection.
#[derive(Clone)]
pub enum Backend {
    Queue(Arc<dyn WorkSource>),
    ObjectStore(Arc<dyn ObjectStore>),
    DocumentStore(Arc<dyn DocumentStore>),
    Cache(Arc<dyn Cache>),
}

impl Backend {
    pub fn kind(&self) -> BackendKind {
        match self {
            Backend::Queue(_) => BackendKind::Queue,
            Backend::ObjectStore(_) => BackendKind::ObjectStore,
            Backend::DocumentStore(_) => BackendKind::DocumentStore,
            Backend::Cache(_) => BackendKind::Cache,
        }
    }

    /// Best-effort teardown of the underlying connection.
    pub async fn close(&self) {
        match self {
            Backend::Queue(b) => b.close().await,
            Backend::ObjectStore(b) => b.close().await,
            Backend::DocumentStore(b) => b.close().await,
            Backend::Cache(b) => b.close().await,
        }
    }
}

impl fmt::Debug for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Backend").field(&self.kind()).finish()
    }
}

/// One composition step: validate settings and construct a single backend.
///
/// Validation must happen before any network call, so that a missing setting is
/// reported as [`HandlerError::Configuration`] without side effects. Connection
/// failures map to [`HandlerError::BackendUnavailable`].
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait HandlerOption: Send + Sync {
    /// The kind of backend this option produces.
    fn kind(&self) -> BackendKind;

    async fn build(&self) -> HandlerResult<Backend>;
}

/// Business action used when none is supplied: log and print each message body.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingProcessor;

#[async_trait]
impl ItemProcessor for LoggingProcessor {
    async fn process(&self, item: &WorkItem) -> HandlerResult<()> {
        info!(item_id = ?item.id, body = %item.body, "Received message");
        println!("Received message: {}", item.body);
        Ok(())
    }
}

/// Ordered list of composition steps.
pub struct HandlerBuilder {
    options: Vec<Box<dyn HandlerOption>>,
    processor: Arc<dyn ItemProcessor>,
}

impl Default for HandlerBuilder {
    fn default() -> Self {
        HandlerBuilder {
            options: Vec::new(),
            processor: Arc::new(LoggingProcessor),
        }
    }
}

impl HandlerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a composition step. Steps run in the order they were added.
    pub fn with<O: HandlerOption + 'static>(mut self, option: O) -> Self {
        self.options.push(Box::new(option));
        self
    }

    /// Replace the per-item action applied by `receive_message` and `watch`.
    pub fn processor(mut self, processor: Arc<dyn ItemProcessor>) -> Self {
        self.processor = processor;
        self
    }

    /// Run every step. Fails with the first step's error, after closing all
    /// backends built so far.
    pub async fn build(self) -> HandlerResult<Handler> {
        let mut handler = Handler {
            queue: None,
            object_store: None,
            document_store: None,
            cache: None,
            processor: self.processor,
        };

        for (index, option) in self.options.iter().enumerate() {
            let kind = option.kind();
            info!(step = index, %kind, "[HANDLER] Applying option");

            let result = match option.build().await {
                Ok(backend) => handler.attach(backend).await,
                Err(e) => Err(e),
            };
            if let Err(e) = result {
                error!(step = index, %kind, error = %e, "[HANDLER] Option failed, discarding handler");
                handler.shutdown().await;
                return Err(e);
            }
            info!(step = index, %kind, "[HANDLER] Backend attached");
        }

        info!(backends = ?handler.backend_kinds(), "[HANDLER] Handler created");
        Ok(handler)
    }
}

/// The set of backends active for one invocation.
pub struct Handler {
    queue: Option<Arc<dyn WorkSource>>,
    object_store: Option<Arc<dyn ObjectStore>>,
    document_store: Option<Arc<dyn DocumentStore>>,
    cache: Option<Arc<dyn Cache>>,
    processor: Arc<dyn ItemProcessor>,
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler")
            .field("backends", &self.backend_kinds())
            .finish()
    }
}

impl Handler {
    pub fn builder() -> HandlerBuilder {
        HandlerBuilder::new()
    }

    async fn attach(&mut self, backend: Backend) -> HandlerResult<()> {
        let kind = backend.kind();
        if self.has(kind) {
            backend.close().await;
            return Err(HandlerError::Configuration(format!(
                "{kind} backend configured more than once"
            )));
        }
        match backend {
            Backend::Queue(b) => self.queue = Some(b),
            Backend::ObjectStore(b) => self.object_store = Some(b),
            Backend::DocumentStore(b) => self.document_store = Some(b),
            Backend::Cache(b) => self.cache = Some(b),
        }
        Ok(())
    }

    pub fn has(&self, kind: BackendKind) -> bool {
        match kind {
            BackendKind::Queue => self.queue.is_some(),
            BackendKind::ObjectStore => self.object_store.is_some(),
            BackendKind::DocumentStore => self.document_store.is_some(),
            BackendKind::Cache => self.cache.is_some(),
        }
    }

    /// Kinds of every configured backend, in declaration order of [`BackendKind`].
    pub fn backend_kinds(&self) -> Vec<BackendKind> {
        [
            BackendKind::Queue,
            BackendKind::ObjectStore,
            BackendKind::DocumentStore,
            BackendKind::Cache,
        ]
        .into_iter()
        .filter(|kind| self.has(*kind))
        .collect()
    }

    pub fn queue(&self) -> HandlerResult<&dyn WorkSource> {
        self.queue
            .as_deref()
            .ok_or_else(|| HandlerError::missing_backend(BackendKind::Queue))
    }

    pub fn object_store(&self) -> HandlerResult<&dyn ObjectStore> {
        self.object_store
            .as_deref()
            .ok_or_else(|| HandlerError::missing_backend(BackendKind::ObjectStore))
    }

    pub fn document_store(&self) -> HandlerResult<&dyn DocumentStore> {
        self.document_store
            .as_deref()
            .ok_or_else(|| HandlerError::missing_backend(BackendKind::DocumentStore))
    }

    pub fn cache(&self) -> HandlerResult<&dyn Cache> {
        self.cache
            .as_deref()
            .ok_or_else(|| HandlerError::missing_backend(BackendKind::Cache))
    }

    /// One poll-and-process cycle against the queue backend.
    pub async fn receive_message(&self, params: &ReceiveParams) -> HandlerResult<PollOutcome> {
        let queue = self.queue()?;
        let outcome = receive_and_process(queue, self.processor.as_ref(), params).await?;
        match &outcome {
            PollOutcome::ItemsProcessed(count) => {
                info!(count, "Message successfully received and processed via handler")
            }
            _ => info!("No messages received via handler"),
        }
        Ok(outcome)
    }

    /// Poll the queue every `cadence` until `cancel` fires, reporting each tick.
    ///
    /// Fails immediately if no queue backend is configured or `params` are invalid.
    pub async fn watch<R: Reporter>(
        &self,
        cadence: Duration,
        params: ReceiveParams,
        reporter: R,
        cancel: CancellationToken,
    ) -> HandlerResult<()> {
        self.queue()?;
        params.validate()?;

        let mut dispatcher = Dispatcher::with_cancellation(reporter, cancel);
        dispatcher
            .start(cadence, || self.receive_message(&params))
            .await
    }

    pub async fn list_object_versions(&self) -> HandlerResult<Vec<ObjectVersion>> {
        self.object_store()?.list_object_versions().await
    }

    pub async fn object_version(&self, key: &str) -> HandlerResult<String> {
        self.object_store()?.object_version(key).await
    }

    pub async fn insert_document(
        &self,
        collection: &str,
        document: serde_json::Value,
    ) -> HandlerResult<()> {
        let store = self.document_store()?;
        if !document.is_object() {
            return Err(HandlerError::Configuration(
                "document must be a JSON object".to_string(),
            ));
        }
        store.insert_document(collection, document).await
    }

    pub async fn cache_ping(&self) -> HandlerResult<()> {
        self.cache()?.ping().await
    }

    pub async fn cache_get(&self, key: &str) -> HandlerResult<Option<String>> {
        self.cache()?.get(key).await
    }

    pub async fn cache_set(
        &self,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
    ) -> HandlerResult<()> {
        self.cache()?.set(key, value, ttl).await
    }

    /// Close every configured backend concurrently. Never fails.
    pub async fn shutdown(&mut self) {
        let mut backends = Vec::new();
        if let Some(b) = self.queue.take() {
            backends.push(Backend::Queue(b));
        }
        if let Some(b) = self.object_store.take() {
            backends.push(Backend::ObjectStore(b));
        }
        if let Some(b) = self.document_store.take() {
            backends.push(Backend::DocumentStore(b));
        }
        if let Some(b) = self.cache.take() {
            backends.push(Backend::Cache(b));
        }
        if backends.is_empty() {
            return;
        }
        info!(count = backends.len(), "[HANDLER] Closing backends");
        join_all(backends.iter().map(|b| b.close())).await;
    }
}
