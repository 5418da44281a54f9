//! Portfolio Dashboard - library for app logic and testing
//!
//! Public portfolio API plus the admin dashboard, backed by a hosted row
//! store reached over PostgREST.

pub mod api_client;
pub mod config;
pub mod error;
pub mod gateway;
pub mod logging;
pub mod models;
pub mod routes;
pub mod session;
pub mod views;

use axum::{
    http::{HeaderValue, Method},
    middleware,
    routing::{delete, get, patch, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer,
};

use config::AppConfig;
use gateway::{Gateway, RestStore};
use routes::AppState;
use session::{JsonFileStore, SessionManager, SystemClock};

/// Configure CORS from environment variables.
/// Uses ALLOWED_ORIGINS (comma-separated) or FRONTEND_ORIGIN, falling back
/// to the local dev servers.
pub fn configure_cors() -> CorsLayer {
    let allowed_origins = std::env::var("ALLOWED_ORIGINS")
        .ok()
        .map(|s| {
            s.split(',')
                .filter_map(|origin| origin.trim().parse::<HeaderValue>().ok())
                .collect::<Vec<_>>()
        })
        .filter(|origins| !origins.is_empty())
        .or_else(|| {
            std::env::var("FRONTEND_ORIGIN")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(|origin| vec![origin])
        })
        .unwrap_or_else(|| {
            vec![
                HeaderValue::from_static("http://localhost:5173"),
                HeaderValue::from_static("http://localhost:3000"),
                HeaderValue::from_static("http://127.0.0.1:5173"),
            ]
        });

    CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::header::AUTHORIZATION,
        ])
        .allow_credentials(true)
}

/// Wire the gateway and session manager from configuration. Without remote
/// credentials the service still starts, with database features disabled.
pub fn build_state(config: &AppConfig) -> AppState {
    let gateway = match &config.remote {
        Some(remote) => match RestStore::new(remote) {
            Ok(store) => {
                tracing::info!(url = %remote.url, "remote store configured");
                Gateway::new(Arc::new(store))
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to build remote store client; database features disabled");
                Gateway::disabled()
            }
        },
        None => {
            tracing::warn!(
                "SUPABASE_URL / SUPABASE_ANON_KEY not set; database features are disabled"
            );
            Gateway::disabled()
        }
    };

    let sessions = SessionManager::new(
        config.session.clone(),
        Arc::new(JsonFileStore::new(&config.session_file)),
        Arc::new(gateway.clone()),
        Arc::new(SystemClock),
    );

    AppState::new(gateway, sessions)
}

/// Create and configure the application router.
pub fn create_app(state: AppState) -> Router {
    let cors = configure_cors();

    Router::new()
        .route("/api/logs", post(routes::logs::receive_client_logs))
        // Public
        .route("/api/projects", get(routes::projects::list_projects))
        .route("/api/projects/{id}", get(routes::projects::get_project))
        .route("/api/certificates", get(routes::certificates::list_certificates))
        .route("/api/contact", post(routes::contact::send_message))
        .route(
            "/api/comments",
            get(routes::comments::list_comments).post(routes::comments::create_comment),
        )
        // Admin session
        .route("/api/admin/login", post(routes::auth::login))
        .route("/api/admin/logout", post(routes::auth::logout))
        .route("/api/admin/session", get(routes::auth::session_status))
        .route("/api/admin/session/extend", post(routes::auth::extend_session))
        // Admin dashboard
        .route("/api/admin/dashboard/{tab}", get(routes::dashboard::open_tab))
        .route("/api/admin/projects", post(routes::projects::create_project))
        .route(
            "/api/admin/projects/{id}",
            patch(routes::projects::update_project).delete(routes::projects::delete_project),
        )
        .route(
            "/api/admin/certificates",
            post(routes::certificates::create_certificate),
        )
        .route(
            "/api/admin/certificates/{id}",
            patch(routes::certificates::update_certificate)
                .delete(routes::certificates::delete_certificate),
        )
        .route(
            "/api/admin/messages/{id}/status",
            patch(routes::contact::update_status),
        )
        .route(
            "/api/admin/messages/{id}",
            delete(routes::contact::delete_message),
        )
        .route(
            "/api/admin/comments/{id}/pin",
            post(routes::comments::toggle_pin),
        )
        .route(
            "/api/admin/comments/{id}",
            delete(routes::comments::delete_comment),
        )
        // Health
        .route("/health", get(routes::health::health_ping))
        .route("/health/detailed", get(routes::health::health_detailed))
        .route("/health/ready", get(routes::health::health_ready))
        .with_state(state)
        .layer(logging::middleware::propagate_request_id_layer())
        .layer(middleware::from_fn(logging::middleware::log_request))
        .layer(logging::middleware::request_id_layer())
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        // Global 2 MB request body cap
        .layer(RequestBodyLimitLayer::new(2 * 1024 * 1024))
        .layer(cors)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}

/// Run the server (used by main).
pub async fn run() {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env();

    // Guards must outlive the server or buffered log lines are lost.
    let _log_guards = logging::init(config.is_production());

    let state = build_state(&config);
    let session_state = state.sessions.init().await;
    tracing::info!(
        session = ?session_state,
        file = %config.session_file.display(),
        "admin session state loaded"
    );

    let app = create_app(state.clone());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .expect("Invalid HOST/PORT configuration");
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .expect("Server error");

    state.sessions.teardown().await;
    tracing::info!("server stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::test_support::{send, test_app};
    use axum::body::Body;
    use axum::extract::connect_info::MockConnectInfo;
    use axum::http::{Request, StatusCode};
    use serde_json::json;
    use tower::ServiceExt;

    fn app_router(state: AppState) -> Router {
        create_app(state).layer(MockConnectInfo(SocketAddr::from(([127, 0, 0, 1], 40000))))
    }

    #[tokio::test]
    async fn test_responses_carry_request_id() {
        let app = test_app().await;
        let req = Request::get("/health").body(Body::empty()).unwrap();
        let res = app_router(app.state).oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert!(res.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn test_unknown_route_is_not_found() {
        let app = test_app().await;
        let (status, _) = send(app_router(app.state), "GET", "/api/blog", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_admin_flow_end_to_end() {
        let app = test_app().await;

        let (status, body) = send(
            app_router(app.state.clone()),
            "POST",
            "/api/admin/login",
            None,
            Some(json!({"username": "admin", "password": "s3cret"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let token = body["token"].as_str().unwrap().to_string();

        let (status, body) = send(
            app_router(app.state.clone()),
            "POST",
            "/api/admin/projects",
            Some(&token),
            Some(json!({"title": "Site", "description": "Mine", "tags": "Rust, Axum"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["list"]["items"][0]["tags"], json!(["Rust", "Axum"]));

        let (status, body) =
            send(app_router(app.state.clone()), "GET", "/api/projects", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"][0]["title"], "Site");

        let (status, _) = send(
            app_router(app.state.clone()),
            "POST",
            "/api/admin/logout",
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = send(
            app_router(app.state.clone()),
            "GET",
            "/api/admin/dashboard/projects",
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_build_state_without_remote_disables_gateway() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig {
            environment: "test".to_string(),
            host: "127.0.0.1".to_string(),
            port: 0,
            remote: None,
            api_url: "http://localhost:3001".to_string(),
            session_file: dir.path().join("session.json"),
            session: config::SessionPolicy::default(),
        };
        let state = build_state(&config);
        assert!(!state.gateway.is_configured());
    }
}
