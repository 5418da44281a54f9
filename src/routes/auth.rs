/**
 * Admin Session Routes
 * Login with lockout, logout, session extension and status
 */
use axum::{
    extract::{ConnectInfo, FromRequestParts, State},
    http::{request::Parts, HeaderMap, StatusCode},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

use super::AppState;
use crate::error::{AppError, AuthError, ValidationError};
use crate::session::{AdminIdentity, SessionSnapshot};

#[derive(Debug, Deserialize, Serialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub success: bool,
    pub token: String,
    pub admin: AdminIdentity,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtendResponse {
    pub success: bool,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LogoutResponse {
    pub success: bool,
}

/// Extract bearer token from Authorization header
fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// The signed-in admin; rejects the request unless the bearer token belongs
/// to the live session.
#[derive(Debug, Clone)]
pub struct AdminSession(pub AdminIdentity);

impl FromRequestParts<AppState> for AdminSession {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_bearer_token(&parts.headers).ok_or(AuthError::Unauthenticated)?;
        let admin = state.sessions.authorize(&token).await?;
        Ok(AdminSession(admin))
    }
}

/// POST /api/admin/login
pub async fn login(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(payload): Json<LoginRequest>,
) -> Result<(StatusCode, Json<LoginResponse>), AppError> {
    let username = payload.username.trim();
    if username.is_empty() {
        return Err(ValidationError::Missing("username").into());
    }
    if payload.password.is_empty() {
        return Err(ValidationError::Missing("password").into());
    }

    tracing::info!(ip = %addr.ip(), username = %username, "admin login attempt");
    let success = state.sessions.login(username, &payload.password).await?;

    Ok((
        StatusCode::OK,
        Json(LoginResponse {
            success: true,
            token: success.token,
            admin: success.admin,
            expires_at: success.expires_at,
        }),
    ))
}

/// POST /api/admin/logout - always answers 200
/// Only the holder of the session token ends the session; any other caller
/// gets the same reply and leaves the session and lockout untouched.
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> (StatusCode, Json<LogoutResponse>) {
    let authorized = match extract_bearer_token(&headers) {
        Some(token) => state.sessions.authorize(&token).await.is_ok(),
        None => false,
    };

    if authorized {
        state.sessions.logout().await;
        state.dashboard.close();
    } else {
        tracing::debug!("logout without a valid session token ignored");
    }
    (StatusCode::OK, Json(LogoutResponse { success: true }))
}

/// POST /api/admin/session/extend
pub async fn extend_session(
    State(state): State<AppState>,
    AdminSession(_admin): AdminSession,
) -> Result<(StatusCode, Json<ExtendResponse>), AppError> {
    let expires_at = state
        .sessions
        .extend_session()
        .await
        .ok_or(AuthError::Unauthenticated)?;
    Ok((
        StatusCode::OK,
        Json(ExtendResponse {
            success: true,
            expires_at,
        }),
    ))
}

/// GET /api/admin/session
/// Session state and lockout status. The admin identity is only included
/// for the bearer of the session token.
pub async fn session_status(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> (StatusCode, Json<SessionSnapshot>) {
    let authorized = match extract_bearer_token(&headers) {
        Some(token) => state.sessions.authorize(&token).await.is_ok(),
        None => false,
    };

    let mut snapshot = state.sessions.snapshot().await;
    if !authorized {
        snapshot.admin = None;
    }
    (StatusCode::OK, Json(snapshot))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::test_support::{login as login_token, send, test_app};
    use axum::extract::connect_info::MockConnectInfo;
    use axum::routing::{get, post};
    use axum::Router;
    use chrono::Duration;
    use serde_json::json;

    fn auth_router(state: AppState) -> Router {
        Router::new()
            .route("/api/admin/login", post(login))
            .route("/api/admin/logout", post(logout))
            .route("/api/admin/session", get(session_status))
            .route("/api/admin/session/extend", post(extend_session))
            .layer(MockConnectInfo(SocketAddr::from(([127, 0, 0, 1], 12345))))
            .with_state(state)
    }

    #[test]
    fn test_extract_bearer_token() {
        let mut headers = HeaderMap::new();
        assert!(extract_bearer_token(&headers).is_none());
        headers.insert("authorization", "Bearer abc123".parse().unwrap());
        assert_eq!(extract_bearer_token(&headers).as_deref(), Some("abc123"));
        headers.insert("authorization", "Basic abc123".parse().unwrap());
        assert!(extract_bearer_token(&headers).is_none());
    }

    #[tokio::test]
    async fn test_login_success_returns_token() {
        let app = test_app().await;
        let (status, body) = send(
            auth_router(app.state.clone()),
            "POST",
            "/api/admin/login",
            None,
            Some(json!({"username": "admin", "password": "s3cret"})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["admin"]["fullName"], "Site Admin");
        assert!(body["token"].as_str().unwrap().len() >= 32);
    }

    #[tokio::test]
    async fn test_login_empty_username_returns_bad_request() {
        let app = test_app().await;
        let (status, body) = send(
            auth_router(app.state.clone()),
            "POST",
            "/api/admin/login",
            None,
            Some(json!({"username": "  ", "password": "s3cret"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_three_wrong_passwords_lock_the_account() {
        let app = test_app().await;
        let wrong = json!({"username": "admin", "password": "nope"});

        let (status, body) = send(
            auth_router(app.state.clone()),
            "POST",
            "/api/admin/login",
            None,
            Some(wrong.clone()),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Username atau password salah. Sisa percobaan: 2");

        let (_, body) = send(
            auth_router(app.state.clone()),
            "POST",
            "/api/admin/login",
            None,
            Some(wrong.clone()),
        )
        .await;
        assert_eq!(body["error"], "Username atau password salah. Sisa percobaan: 1");

        let (status, body) = send(
            auth_router(app.state.clone()),
            "POST",
            "/api/admin/login",
            None,
            Some(wrong),
        )
        .await;
        assert_eq!(status, StatusCode::LOCKED);
        assert_eq!(body["code"], "locked_out");

        app.clock.advance(Duration::minutes(3));
        let (status, body) = send(
            auth_router(app.state.clone()),
            "POST",
            "/api/admin/login",
            None,
            Some(json!({"username": "admin", "password": "s3cret"})),
        )
        .await;
        assert_eq!(status, StatusCode::LOCKED);
        assert_eq!(body["error"], "Account terkunci. Coba lagi dalam 12 menit.");
    }

    #[tokio::test]
    async fn test_login_with_store_down_is_bad_gateway() {
        let app = test_app().await;
        app.store.set_offline(true);
        let (status, body) = send(
            auth_router(app.state.clone()),
            "POST",
            "/api/admin/login",
            None,
            Some(json!({"username": "admin", "password": "s3cret"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"], "Terjadi kesalahan saat login. Silakan coba lagi.");
    }

    #[tokio::test]
    async fn test_extend_requires_token() {
        let app = test_app().await;
        let (status, _) = send(
            auth_router(app.state.clone()),
            "POST",
            "/api/admin/session/extend",
            None,
            None,
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let token = login_token(&app.state).await;
        app.clock.advance(Duration::minutes(20));
        let (status, body) = send(
            auth_router(app.state.clone()),
            "POST",
            "/api/admin/session/extend",
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(
            app.state.sessions.time_remaining().await,
            Duration::minutes(30)
        );
    }

    #[tokio::test]
    async fn test_session_status_hides_identity_without_token() {
        let app = test_app().await;
        let token = login_token(&app.state).await;

        let (status, body) = send(
            auth_router(app.state.clone()),
            "GET",
            "/api/admin/session",
            None,
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["state"], "authenticated");
        assert!(body["admin"].is_null());

        let (_, body) = send(
            auth_router(app.state.clone()),
            "GET",
            "/api/admin/session",
            Some(&token),
            None,
        )
        .await;
        assert_eq!(body["admin"]["username"], "admin");
        assert_eq!(body["remainingMs"], 30 * 60 * 1000);
    }

    #[tokio::test]
    async fn test_logout_with_token_ends_session() {
        let app = test_app().await;
        let token = login_token(&app.state).await;

        let (status, body) = send(
            auth_router(app.state.clone()),
            "POST",
            "/api/admin/logout",
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);

        let (status, _) = send(
            auth_router(app.state.clone()),
            "POST",
            "/api/admin/session/extend",
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_anonymous_logout_keeps_session() {
        let app = test_app().await;
        let token = login_token(&app.state).await;

        for bearer in [None, Some("forged-token")] {
            let (status, body) = send(
                auth_router(app.state.clone()),
                "POST",
                "/api/admin/logout",
                bearer,
                None,
            )
            .await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["success"], true);
        }

        assert!(app.state.sessions.authorize(&token).await.is_ok());
    }

    #[tokio::test]
    async fn test_anonymous_logout_during_lockout_keeps_lockout() {
        let app = test_app().await;
        let wrong = json!({"username": "admin", "password": "nope"});

        for _ in 0..3 {
            send(
                auth_router(app.state.clone()),
                "POST",
                "/api/admin/login",
                None,
                Some(wrong.clone()),
            )
            .await;
        }

        let (status, _) = send(
            auth_router(app.state.clone()),
            "POST",
            "/api/admin/logout",
            None,
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send(
            auth_router(app.state.clone()),
            "POST",
            "/api/admin/login",
            None,
            Some(json!({"username": "admin", "password": "s3cret"})),
        )
        .await;
        assert_eq!(status, StatusCode::LOCKED);
        assert_eq!(body["error"], "Account terkunci. Coba lagi dalam 15 menit.");
        assert_eq!(app.state.sessions.snapshot().await.failed_attempts, 3);
    }
}
