/**
 * Health Routes
 * Endpoints for checking backend and remote store health
 */
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::AppState;
use crate::error::GatewayError;

/// Single service check result
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceCheck {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_time: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Detailed health check response
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailedHealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub uptime: u64,
    pub checks: HealthChecks,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthChecks {
    pub remote_store: ServiceCheck,
}

/// Ready check response
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadyResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub uptime: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Simple health response
#[derive(Debug, Serialize, Deserialize)]
pub struct SimpleHealthResponse {
    pub status: String,
}

async fn check_remote_store(state: &AppState) -> ServiceCheck {
    match state.gateway.check_connection().await {
        Ok(elapsed) => ServiceCheck {
            status: "healthy".to_string(),
            response_time: Some(elapsed.as_millis() as u64),
            error: None,
        },
        Err(GatewayError::NotConfigured) => ServiceCheck {
            status: "disabled".to_string(),
            response_time: None,
            error: Some(GatewayError::NotConfigured.to_string()),
        },
        Err(e) => ServiceCheck {
            status: "unhealthy".to_string(),
            response_time: None,
            error: Some(e.to_string()),
        },
    }
}

/// GET /health - Simple health ping
pub async fn health_ping() -> impl IntoResponse {
    Json(SimpleHealthResponse {
        status: "ok".to_string(),
    })
}

/// GET /health/detailed
/// Overall status stays "ok" while the process runs; the remote store check
/// is reported alongside.
pub async fn health_detailed(State(state): State<AppState>) -> impl IntoResponse {
    let response = DetailedHealthResponse {
        status: "ok".to_string(),
        timestamp: Utc::now(),
        uptime: state.started_at.elapsed().as_secs(),
        checks: HealthChecks {
            remote_store: check_remote_store(&state).await,
        },
    };

    (StatusCode::OK, Json(response))
}

/// GET /health/ready
/// Not ready only when a configured remote store cannot be reached. Running
/// without one is a supported mode.
pub async fn health_ready(State(state): State<AppState>) -> impl IntoResponse {
    let check = check_remote_store(&state).await;
    let is_ready = check.status != "unhealthy";

    let response = ReadyResponse {
        status: if is_ready {
            "ready".to_string()
        } else {
            "not ready".to_string()
        },
        timestamp: Utc::now(),
        uptime: state.started_at.elapsed().as_secs(),
        reason: if is_ready { None } else { check.error },
    };

    let status = if is_ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::Gateway;
    use crate::routes::test_support::{send, test_app};
    use axum::routing::get;
    use axum::Router;

    fn test_router(state: AppState) -> Router {
        Router::new()
            .route("/health", get(health_ping))
            .route("/health/detailed", get(health_detailed))
            .route("/health/ready", get(health_ready))
            .with_state(state)
    }

    #[test]
    fn test_service_check_skips_empty_fields() {
        let check = ServiceCheck {
            status: "healthy".to_string(),
            response_time: Some(10),
            error: None,
        };
        let json = serde_json::to_string(&check).unwrap();
        assert!(json.contains("responseTime"));
        assert!(!json.contains("error"));
    }

    #[tokio::test]
    async fn test_health_ping_returns_ok() {
        let app = test_app().await;
        let (status, body) = send(test_router(app.state), "GET", "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_health_detailed_reports_store() {
        let app = test_app().await;
        let (status, body) =
            send(test_router(app.state.clone()), "GET", "/health/detailed", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["checks"]["remoteStore"]["status"], "healthy");

        app.store.set_offline(true);
        let (status, body) =
            send(test_router(app.state), "GET", "/health/detailed", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["checks"]["remoteStore"]["status"], "unhealthy");
    }

    #[tokio::test]
    async fn test_health_ready_follows_store() {
        let app = test_app().await;
        let (status, body) =
            send(test_router(app.state.clone()), "GET", "/health/ready", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ready");

        app.store.set_offline(true);
        let (status, body) =
            send(test_router(app.state.clone()), "GET", "/health/ready", None, None).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["status"], "not ready");
    }

    #[tokio::test]
    async fn test_disabled_store_is_still_ready() {
        let app = test_app().await;
        let state = AppState::new(Gateway::disabled(), app.state.sessions.clone());
        let (status, body) = send(test_router(state), "GET", "/health/ready", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ready");
    }
}
