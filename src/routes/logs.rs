/**
 * Logs Route Handler
 * Diagnostic channel: the front end forwards its console output here
 */

use axum::{
    extract::{Extension, Json},
    http::StatusCode,
    response::IntoResponse,
};
use tower_http::request_id::RequestId;

use crate::logging::config::{ClientLogBatch, ClientLogEntry, LogLevel, LogResponse};

/// Entries above this many per batch are dropped.
const MAX_BATCH: usize = 100;
/// Longer messages are truncated.
const MAX_MESSAGE_CHARS: usize = 2_000;

/// POST /api/logs
#[tracing::instrument(skip(batch), fields(batch_size = batch.logs.len()))]
pub async fn receive_client_logs(
    request_id: Option<Extension<RequestId>>,
    Json(batch): Json<ClientLogBatch>,
) -> impl IntoResponse {
    let req_id = request_id
        .as_ref()
        .and_then(|ext| ext.0.header_value().to_str().ok())
        .unwrap_or("unknown");

    let received = batch.logs.len();
    if received > MAX_BATCH {
        tracing::warn!(request_id = %req_id, received, "client log batch truncated");
    }

    let mut processed = 0;
    for entry in batch.logs.iter().take(MAX_BATCH) {
        record_client_log(entry, req_id);
        processed += 1;
    }

    (
        StatusCode::ACCEPTED,
        Json(LogResponse {
            success: true,
            received,
            processed,
            error: None,
        }),
    )
}

fn record_client_log(entry: &ClientLogEntry, request_id: &str) {
    let message: String = entry.message.chars().take(MAX_MESSAGE_CHARS).collect();
    let component = entry.component.as_deref().unwrap_or("unknown");

    let span = tracing::info_span!(
        "client_log",
        request_id = %request_id,
        timestamp = %entry.timestamp,
        component = %component,
        source = "client",
    );
    let _enter = span.enter();

    match entry.level {
        LogLevel::Trace => tracing::trace!(message = %message, context = ?entry.context, "client log"),
        LogLevel::Debug => tracing::debug!(message = %message, context = ?entry.context, "client log"),
        LogLevel::Info => tracing::info!(message = %message, context = ?entry.context, "client log"),
        LogLevel::Warn => tracing::warn!(message = %message, context = ?entry.context, "client log"),
        LogLevel::Error => tracing::error!(message = %message, context = ?entry.context, "client log"),
    }
}
