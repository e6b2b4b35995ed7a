use crate::queue::AuditQueue;
use crate::record::AuditRecord;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Shared state for the ingest endpoint.
pub struct IngestState {
    pub queue: Arc<AuditQueue>,
    pub auth_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct IngestRequest {
    #[serde(default)]
    pub token: Option<String>,
    /// Kept as a raw value so a non-array `logs` is treated as "nothing to
    /// process" rather than failing body deserialization.
    #[serde(default)]
    pub logs: Option<serde_json::Value>,
}

impl IngestRequest {
    fn logs(self) -> Option<Vec<AuditRecord>> {
        self.logs
            .and_then(|value| serde_json::from_value(value).ok())
    }
}

/// Result of one ingest call. Only `Accepted` mutates the queue.
#[derive(Debug, PartialEq)]
pub enum IngestOutcome {
    /// Batch reversed to chronological order and queued.
    Accepted { queued: usize },
    /// Valid token, nothing to queue. Success, not an error.
    NoLogs,
    /// Token missing or wrong.
    Unauthorized,
    /// No shared secret in the server's own configuration.
    SecretNotConfigured,
}

/// Validate and enqueue a batch.
///
/// Checks run in a fixed order because it is externally observable: a
/// missing server-side secret answers before any token comparison, and an
/// invalid token answers before the logs are looked at. The upstream sends
/// batches newest-first; they are reversed here so the queue holds
/// chronological order end to end.
pub fn ingest(
    auth_token: Option<&str>,
    token: Option<&str>,
    logs: Option<Vec<AuditRecord>>,
    queue: &AuditQueue,
) -> IngestOutcome {
    let Some(secret) = auth_token else {
        return IngestOutcome::SecretNotConfigured;
    };

    if token != Some(secret) {
        return IngestOutcome::Unauthorized;
    }

    let Some(mut logs) = logs.filter(|l| !l.is_empty()) else {
        return IngestOutcome::NoLogs;
    };

    logs.reverse();
    let queued = logs.len();
    queue.append_all(logs);

    IngestOutcome::Accepted { queued }
}

impl IntoResponse for IngestOutcome {
    fn into_response(self) -> Response {
        match self {
            IngestOutcome::Accepted { queued } => (
                StatusCode::ACCEPTED,
                Json(serde_json::json!({ "queued": queued })),
            )
                .into_response(),
            IngestOutcome::NoLogs => (
                StatusCode::ACCEPTED,
                Json(serde_json::json!({ "message": "no logs to process" })),
            )
                .into_response(),
            IngestOutcome::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                Json(serde_json::json!({ "error": "invalid token" })),
            )
                .into_response(),
            IngestOutcome::SecretNotConfigured => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": "auth token not configured" })),
            )
                .into_response(),
        }
    }
}

/// POST /sfdc-audit-log
pub async fn ingest_handler(
    State(state): State<Arc<IngestState>>,
    Json(request): Json<IngestRequest>,
) -> IngestOutcome {
    let token = request.token.clone();
    let outcome = ingest(
        state.auth_token.as_deref(),
        token.as_deref(),
        request.logs(),
        &state.queue,
    );

    if let IngestOutcome::Accepted { queued } = outcome {
        info!(queued, total = state.queue.len(), "Audit batch ingested");
    }

    outcome
}

pub fn router(state: Arc<IngestState>) -> Router {
    Router::new()
        .route("/sfdc-audit-log", post(ingest_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the ingest HTTP server.
pub async fn start_server(
    listen_addr: SocketAddr,
    state: Arc<IngestState>,
) -> Result<(), std::io::Error> {
    let app = router(state);

    info!(addr = %listen_addr, "Starting ingest HTTP server");

    let listener = TcpListener::bind(listen_addr).await?;
    axum::serve(listener, app).await
}
