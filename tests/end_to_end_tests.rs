/// End-to-end tests for the ingest → queue → drip-delivery flow
///
/// These tests validate complete workflows including:
/// - Authenticated ingest over HTTP and queue ordering
/// - Auth and configuration failures leaving the queue untouched
/// - Drip dispatch draining the queue in order through a channel
/// - Head-of-line retry across a downstream outage
use auditdrip::channel::{DeliveryChannel, DeliveryError};
use auditdrip::dispatch::{Dispatcher, TickOutcome};
use auditdrip::ingest::{router, IngestState};
use auditdrip::queue::AuditQueue;
use auditdrip::record::AuditRecord;
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::ServiceExt;

/// Helper: build the ingest router over a fresh queue
fn make_app(auth_token: Option<&str>) -> (axum::Router, Arc<AuditQueue>) {
    let queue = Arc::new(AuditQueue::new());
    let state = Arc::new(IngestState {
        queue: queue.clone(),
        auth_token: auth_token.map(str::to_string),
    });
    (router(state), queue)
}

/// Helper: POST a JSON body to /sfdc-audit-log
async fn post_ingest(app: axum::Router, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri("/sfdc-audit-log")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

/// Channel test double shared by the delivery scenarios.
struct RecordingChannel {
    failing: AtomicBool,
    delivered: Mutex<Vec<String>>,
}

impl RecordingChannel {
    fn new() -> Self {
        Self {
            failing: AtomicBool::new(false),
            delivered: Mutex::new(Vec::new()),
        }
    }

    fn delivered_users(&self) -> Vec<String> {
        self.delivered.lock().unwrap().clone()
    }
}

#[async_trait]
impl DeliveryChannel for RecordingChannel {
    async fn deliver(&self, record: &AuditRecord) -> Result<(), DeliveryError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(DeliveryError::Rejected {
                status: 500,
                body: "downstream down".to_string(),
            });
        }
        self.delivered.lock().unwrap().push(
            record
                .field("CreatedByUser")
                .unwrap_or_default()
                .to_string(),
        );
        Ok(())
    }
}

#[tokio::test]
async fn test_valid_batch_accepted_and_reversed() {
    let (app, queue) = make_app(Some("S3CR3T"));

    // Newest first, as the upstream sends it.
    let (status, body) = post_ingest(
        app,
        json!({
            "token": "S3CR3T",
            "logs": [
                { "Action": "Export", "CreatedByUser": "alice" },
                { "Action": "Login", "CreatedByUser": "bob" },
            ],
        }),
    )
    .await;

    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["queued"], 2);

    // Chronological order in the queue: bob's login happened first.
    assert_eq!(queue.len(), 2);
    let first = queue.pop_front().unwrap();
    assert_eq!(first.field("CreatedByUser"), Some("bob"));
    let second = queue.pop_front().unwrap();
    assert_eq!(second.field("CreatedByUser"), Some("alice"));
}

#[tokio::test]
async fn test_missing_token_rejected() {
    let (app, queue) = make_app(Some("S3CR3T"));

    let (status, body) = post_ingest(
        app,
        json!({ "logs": [{ "Action": "Export" }] }),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "invalid token");
    assert!(queue.is_empty());
}

#[tokio::test]
async fn test_wrong_token_never_mutates_queue() {
    let (app, queue) = make_app(Some("S3CR3T"));

    for _ in 0..3 {
        let (status, _) = post_ingest(
            app.clone(),
            json!({ "token": "guess", "logs": [{ "Action": "Export" }] }),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(queue.len(), 0);
    }
}

#[tokio::test]
async fn test_empty_logs_accepted_with_no_work() {
    let (app, queue) = make_app(Some("S3CR3T"));

    let (status, body) = post_ingest(app, json!({ "token": "S3CR3T", "logs": [] })).await;

    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["message"], "no logs to process");
    assert!(queue.is_empty());
}

#[tokio::test]
async fn test_non_array_logs_treated_as_empty() {
    let (app, queue) = make_app(Some("S3CR3T"));

    let (status, body) =
        post_ingest(app, json!({ "token": "S3CR3T", "logs": "not-a-list" })).await;

    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["message"], "no logs to process");
    assert!(queue.is_empty());
}

#[tokio::test]
async fn test_unconfigured_secret_is_server_error() {
    let (app, queue) = make_app(None);

    let (status, _) = post_ingest(
        app,
        json!({ "token": "S3CR3T", "logs": [{ "Action": "Export" }] }),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(queue.is_empty());
}

#[tokio::test]
async fn test_ingest_then_drip_delivers_chronologically() {
    let (app, queue) = make_app(Some("S3CR3T"));
    let channel = Arc::new(RecordingChannel::new());
    let dispatcher = Dispatcher::new(
        queue.clone(),
        channel.clone(),
        Duration::from_millis(1100),
        Duration::from_secs(1),
    );

    // Two batches, each newest-first.
    post_ingest(
        app.clone(),
        json!({
            "token": "S3CR3T",
            "logs": [
                { "CreatedByUser": "carol" },
                { "CreatedByUser": "bob" },
            ],
        }),
    )
    .await;
    post_ingest(
        app,
        json!({
            "token": "S3CR3T",
            "logs": [{ "CreatedByUser": "dave" }],
        }),
    )
    .await;

    while !queue.is_empty() {
        assert!(matches!(dispatcher.tick().await, TickOutcome::Delivered));
    }

    assert_eq!(channel.delivered_users(), vec!["bob", "carol", "dave"]);
}

#[tokio::test]
async fn test_outage_requeues_head_until_recovery() {
    let (app, queue) = make_app(Some("S3CR3T"));
    let channel = Arc::new(RecordingChannel::new());
    let dispatcher = Dispatcher::new(
        queue.clone(),
        channel.clone(),
        Duration::from_millis(1100),
        Duration::from_secs(1),
    );

    post_ingest(
        app.clone(),
        json!({
            "token": "S3CR3T",
            "logs": [
                { "CreatedByUser": "second" },
                { "CreatedByUser": "first" },
            ],
        }),
    )
    .await;

    // Downstream outage: the head is reattempted every tick, never skipped,
    // and the queue only grows while new batches arrive.
    channel.failing.store(true, Ordering::SeqCst);
    for _ in 0..4 {
        assert!(matches!(dispatcher.tick().await, TickOutcome::Requeued(_)));
        assert_eq!(queue.len(), 2);
    }

    post_ingest(
        app,
        json!({ "token": "S3CR3T", "logs": [{ "CreatedByUser": "third" }] }),
    )
    .await;
    assert!(matches!(dispatcher.tick().await, TickOutcome::Requeued(_)));
    assert_eq!(queue.len(), 3);

    // Recovery: everything drains in original order, nothing lost.
    channel.failing.store(false, Ordering::SeqCst);
    for _ in 0..3 {
        assert!(matches!(dispatcher.tick().await, TickOutcome::Delivered));
    }
    assert!(queue.is_empty());
    assert_eq!(channel.delivered_users(), vec!["first", "second", "third"]);
}
