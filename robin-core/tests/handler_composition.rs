mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{item, RecordingReporter};
use robin_core::contract::{
    BackendKind, MockCache, MockDocumentStore, MockItemProcessor, MockObjectStore,
    MockWorkSource, ObjectVersion, PollOutcome, ReceiveParams,
};
use robin_core::handler::{Backend, Handler, MockHandlerOption};
use robin_core::HandlerError;
use tokio_util::sync::CancellationToken;

/// An option that yields `backend` once.
fn ready_option(backend: Backend) -> MockHandlerOption {
    let kind = backend.kind();
    let mut option = MockHandlerOption::new();
    option.expect_kind().return_const(kind);
    option.expect_build().times(1).return_once(move || Ok(backend));
    option
}

fn failing_option(kind: BackendKind, err: HandlerError) -> MockHandlerOption {
    let mut option = MockHandlerOption::new();
    option.expect_kind().return_const(kind);
    option.expect_build().times(1).return_once(move || Err(err));
    option
}

#[tokio::test]
async fn empty_handler_has_no_backends() {
    let handler = Handler::builder().build().await.expect("empty handler builds");

    assert!(handler.backend_kinds().is_empty());
    let err = handler
        .receive_message(&ReceiveParams::default())
        .await
        .expect_err("no queue configured");
    assert_eq!(err, HandlerError::missing_backend(BackendKind::Queue));
}

#[tokio::test]
async fn object_store_operation_on_queue_only_handler_fails_without_network() {
    // The queue mock has no expectations: touching it would fail the test.
    let queue = MockWorkSource::new();
    let handler = Handler::builder()
        .with(ready_option(Backend::Queue(Arc::new(queue))))
        .build()
        .await
        .unwrap();

    assert_eq!(handler.backend_kinds(), vec![BackendKind::Queue]);
    let err = handler
        .list_object_versions()
        .await
        .expect_err("object store is not configured");
    match err {
        HandlerError::Configuration(msg) => assert!(msg.contains("object store"), "{msg}"),
        other => panic!("expected ConfigurationError, got {other:?}"),
    }
}

#[tokio::test]
async fn failing_option_discards_and_closes_earlier_backends() {
    let mut queue = MockWorkSource::new();
    queue.expect_close().times(1).return_const(());
    let mut cache = MockCache::new();
    cache.expect_close().times(1).return_const(());

    // Never consulted: composition stops at the failing step.
    let after_failure = MockHandlerOption::new();

    let result = Handler::builder()
        .with(ready_option(Backend::Queue(Arc::new(queue))))
        .with(ready_option(Backend::Cache(Arc::new(cache))))
        .with(failing_option(
            BackendKind::ObjectStore,
            HandlerError::Configuration("s3.endpoint must be set".into()),
        ))
        .with(after_failure)
        .build()
        .await;

    let err = result.expect_err("composition is all-or-nothing");
    assert_eq!(
        err,
        HandlerError::Configuration("s3.endpoint must be set".into())
    );
}

#[tokio::test]
async fn first_option_failing_builds_nothing() {
    let result = Handler::builder()
        .with(failing_option(
            BackendKind::Queue,
            HandlerError::Configuration("sqs.url must be set".into()),
        ))
        .with(MockHandlerOption::new())
        .build()
        .await;

    assert!(matches!(result, Err(HandlerError::Configuration(_))));
}

#[tokio::test]
async fn backend_unavailable_is_propagated_unchanged() {
    let err = Handler::builder()
        .with(failing_option(
            BackendKind::DocumentStore,
            HandlerError::BackendUnavailable {
                kind: BackendKind::DocumentStore,
                message: "server selection timeout".into(),
            },
        ))
        .build()
        .await
        .expect_err("connection failure aborts composition");

    assert!(err.is_fatal());
    assert!(err.to_string().contains("document store backend unavailable"));
}

#[tokio::test]
async fn duplicate_backend_kind_is_a_configuration_error() {
    let mut first = MockWorkSource::new();
    first.expect_close().times(1).return_const(());
    let mut second = MockWorkSource::new();
    second.expect_close().times(1).return_const(());

    let err = Handler::builder()
        .with(ready_option(Backend::Queue(Arc::new(first))))
        .with(ready_option(Backend::Queue(Arc::new(second))))
        .build()
        .await
        .expect_err("one backend per kind");

    assert!(matches!(err, HandlerError::Configuration(ref msg) if msg.contains("more than once")));
}

#[tokio::test]
async fn receive_message_uses_the_configured_processor() {
    let mut queue = MockWorkSource::new();
    queue.expect_poll().times(1).returning(|_| Ok(vec![item(7)]));
    queue
        .expect_acknowledge()
        .withf(|token| token.as_str() == "receipt-7")
        .times(1)
        .returning(|_| Ok(()));

    let mut processor = MockItemProcessor::new();
    processor
        .expect_process()
        .withf(|item| item.body == "body 7")
        .times(1)
        .returning(|_| Ok(()));

    let handler = Handler::builder()
        .with(ready_option(Backend::Queue(Arc::new(queue))))
        .processor(Arc::new(processor))
        .build()
        .await
        .unwrap();

    let outcome = handler
        .receive_message(&ReceiveParams::default())
        .await
        .unwrap();
    assert_eq!(outcome, PollOutcome::ItemsProcessed(1));
}

#[tokio::test]
async fn watch_without_queue_fails_fast() {
    let handler = Handler::builder().build().await.unwrap();
    let cancel = CancellationToken::new();
    let reporter = RecordingReporter::new(1, cancel.clone());

    let err = handler
        .watch(
            Duration::from_secs(5),
            ReceiveParams::default(),
            reporter.clone(),
            cancel,
        )
        .await
        .expect_err("watch needs a queue");

    assert_eq!(err, HandlerError::missing_backend(BackendKind::Queue));
    assert!(reporter.outcomes().is_empty());
}

#[tokio::test(start_paused = true)]
async fn watch_polls_until_cancelled() {
    let mut queue = MockWorkSource::new();
    let mut polls = 0;
    queue.expect_poll().times(3).returning(move |_| {
        polls += 1;
        match polls {
            2 => Err(HandlerError::Poll("service unavailable".into())),
            _ => Ok(vec![]),
        }
    });

    let handler = Handler::builder()
        .with(ready_option(Backend::Queue(Arc::new(queue))))
        .build()
        .await
        .unwrap();

    let cancel = CancellationToken::new();
    let reporter = RecordingReporter::new(3, cancel.clone());
    handler
        .watch(
            Duration::from_secs(5),
            ReceiveParams::default(),
            reporter.clone(),
            cancel,
        )
        .await
        .unwrap();

    assert_eq!(
        reporter.outcomes(),
        vec![
            PollOutcome::NoItems,
            PollOutcome::Error(HandlerError::Poll("service unavailable".into())),
            PollOutcome::NoItems,
        ]
    );
}

#[tokio::test]
async fn object_store_operations_delegate() {
    let mut store = MockObjectStore::new();
    store.expect_list_object_versions().times(1).returning(|| {
        Ok(vec![ObjectVersion {
            key: "reports/q3.pdf".into(),
            version_id: "v2".into(),
        }])
    });
    store
        .expect_object_version()
        .withf(|key| key == "reports/q3.pdf")
        .times(1)
        .returning(|_| Ok("v2".to_string()));

    let handler = Handler::builder()
        .with(ready_option(Backend::ObjectStore(Arc::new(store))))
        .build()
        .await
        .unwrap();

    let versions = handler.list_object_versions().await.unwrap();
    assert_eq!(versions.len(), 1);
    assert_eq!(versions[0].key, "reports/q3.pdf");
    assert_eq!(handler.object_version("reports/q3.pdf").await.unwrap(), "v2");
}

#[tokio::test]
async fn insert_document_requires_a_json_object() {
    let mut store = MockDocumentStore::new();
    store
        .expect_insert_document()
        .withf(|collection, doc| collection == "files" && doc["name"] == "a.txt")
        .times(1)
        .returning(|_, _| Ok(()));

    let handler = Handler::builder()
        .with(ready_option(Backend::DocumentStore(Arc::new(store))))
        .build()
        .await
        .unwrap();

    handler
        .insert_document("files", serde_json::json!({ "name": "a.txt", "size": 12 }))
        .await
        .unwrap();

    let err = handler
        .insert_document("files", serde_json::json!(["not", "an", "object"]))
        .await
        .expect_err("arrays are not documents");
    assert!(matches!(err, HandlerError::Configuration(_)));
}

#[tokio::test]
async fn cache_operations_delegate() {
    let mut cache = MockCache::new();
    cache.expect_ping().times(1).returning(|| Ok(()));
    cache
        .expect_set()
        .withf(|key, value, ttl| key == "k" && value == "v" && *ttl == Some(Duration::from_secs(60)))
        .times(1)
        .returning(|_, _, _| Ok(()));
    cache
        .expect_get()
        .withf(|key| key == "k")
        .times(1)
        .returning(|_| Ok(Some("v".to_string())));

    let handler = Handler::builder()
        .with(ready_option(Backend::Cache(Arc::new(cache))))
        .build()
        .await
        .unwrap();

    handler.cache_ping().await.unwrap();
    handler
        .cache_set("k", "v", Some(Duration::from_secs(60)))
        .await
        .unwrap();
    assert_eq!(handler.cache_get("k").await.unwrap(), Some("v".to_string()));
}

#[tokio::test]
async fn shutdown_closes_every_backend() {
    let mut queue = MockWorkSource::new();
    queue.expect_close().times(1).return_const(());
    let mut store = MockObjectStore::new();
    store.expect_close().times(1).return_const(());

    let mut handler = Handler::builder()
        .with(ready_option(Backend::Queue(Arc::new(queue))))
        .with(ready_option(Backend::ObjectStore(Arc::new(store))))
        .build()
        .await
        .unwrap();

    handler.shutdown().await;
    assert!(handler.backend_kinds().is_empty());
    // A second shutdown has nothing left to close.
    handler.shutdown().await;
}
