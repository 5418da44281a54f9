use axum::{
    extract::Request,
    http::{header, StatusCode},
    middleware::Next,
    response::Response,
};
use std::time::Instant;
use tower_http::request_id::{
    MakeRequestUuid, PropagateRequestIdLayer, RequestId, SetRequestIdLayer,
};
use tracing::Instrument;

/// Runs the request inside an `http` span keyed by its `x-request-id` and
/// logs the outcome. Only the path is recorded (query strings may carry
/// visitor input) and only whether a bearer token was sent, never the token.
pub async fn log_request(request: Request, next: Next) -> Response {
    let request_id = request
        .extensions()
        .get::<RequestId>()
        .and_then(|id| id.header_value().to_str().ok())
        .unwrap_or("unknown")
        .to_owned();
    let span = tracing::info_span!(
        "http",
        request_id = %request_id,
        method = %request.method(),
        path = %request.uri().path(),
        bearer = request.headers().contains_key(header::AUTHORIZATION),
    );

    async move {
        let started = Instant::now();
        tracing::debug!("request received");
        let response = next.run(request).await;
        report(response.status(), started.elapsed().as_millis() as u64);
        response
    }
    .instrument(span)
    .await
}

fn report(status: StatusCode, elapsed_ms: u64) {
    let code = status.as_u16();
    if status.is_server_error() {
        tracing::error!(status = code, elapsed_ms, "request failed");
    } else if status.is_client_error() {
        tracing::warn!(status = code, elapsed_ms, "request rejected");
    } else {
        tracing::info!(status = code, elapsed_ms, "request served");
    }
}

pub fn request_id_layer() -> SetRequestIdLayer<MakeRequestUuid> {
    SetRequestIdLayer::x_request_id(MakeRequestUuid)
}

pub fn propagate_request_id_layer() -> PropagateRequestIdLayer {
    PropagateRequestIdLayer::x_request_id()
}
