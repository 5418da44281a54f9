/**
 * Contact Routes
 * Visitor contact form and the admin inbox
 */
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use super::auth::AdminSession;
use super::{ApiResponse, AppState, MutationResponse};
use crate::error::AppError;
use crate::models::{ContactMessage, MessageStatus, RowId};
use crate::views::ContactForm;

#[derive(Debug, Deserialize, Serialize)]
pub struct StatusRequest {
    pub status: MessageStatus,
}

/// POST /api/contact
pub async fn send_message(
    State(state): State<AppState>,
    Json(form): Json<ContactForm>,
) -> Result<(StatusCode, Json<ApiResponse<()>>), AppError> {
    let input = form.validate()?;
    state.gateway.create_message(&input).await?;
    tracing::info!(email = %input.email, "contact message received");

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            success: true,
            data: None,
            message: Some("Message sent successfully!".to_string()),
            error: None,
        }),
    ))
}

/// PATCH /api/admin/messages/{id}/status
pub async fn update_status(
    State(state): State<AppState>,
    AdminSession(_admin): AdminSession,
    Path(id): Path<String>,
    Json(payload): Json<StatusRequest>,
) -> Result<(StatusCode, Json<MutationResponse<ContactMessage>>), AppError> {
    let outcome = state
        .dashboard
        .set_message_status(&RowId::new(id), payload.status)
        .await?;
    Ok((StatusCode::OK, Json(outcome.into())))
}

/// DELETE /api/admin/messages/{id}
pub async fn delete_message(
    State(state): State<AppState>,
    AdminSession(_admin): AdminSession,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<MutationResponse<ContactMessage>>), AppError> {
    let outcome = state.dashboard.delete_message(&RowId::new(id)).await?;
    Ok((StatusCode::OK, Json(outcome.into())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::test_support::{login, send, test_app};
    use axum::routing::{delete, patch, post};
    use axum::Router;
    use serde_json::json;

    fn contact_router(state: AppState) -> Router {
        Router::new()
            .route("/api/contact", post(send_message))
            .route("/api/admin/messages/{id}/status", patch(update_status))
            .route("/api/admin/messages/{id}", delete(delete_message))
            .with_state(state)
    }

    #[tokio::test]
    async fn test_contact_message_is_stored_unread() {
        let app = test_app().await;
        let (status, body) = send(
            contact_router(app.state.clone()),
            "POST",
            "/api/contact",
            None,
            Some(json!({
                "name": "Ana",
                "email": "ana@example.com",
                "subject": "Hello",
                "message": "Nice portfolio <b>!</b>"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["message"], "Message sent successfully!");

        let messages = app.state.gateway.list_messages().await.unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].status, MessageStatus::Unread);
        assert_eq!(messages[0].subject.as_deref(), Some("Hello"));
    }

    #[tokio::test]
    async fn test_contact_rejects_bad_email() {
        let app = test_app().await;
        let (status, body) = send(
            contact_router(app.state.clone()),
            "POST",
            "/api/contact",
            None,
            Some(json!({"name": "Ana", "email": "ana", "message": "hi"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().starts_with("email is invalid"));
    }

    #[tokio::test]
    async fn test_admin_marks_read_and_deletes() {
        let app = test_app().await;
        let token = login(&app.state).await;
        send(
            contact_router(app.state.clone()),
            "POST",
            "/api/contact",
            None,
            Some(json!({"name": "Ana", "email": "ana@example.com", "message": "hi"})),
        )
        .await;
        let id = app.state.gateway.list_messages().await.unwrap()[0]
            .id
            .to_string();

        let (status, body) = send(
            contact_router(app.state.clone()),
            "PATCH",
            &format!("/api/admin/messages/{id}/status"),
            Some(&token),
            Some(json!({"status": "read"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["list"]["items"][0]["status"], "read");

        let (status, body) = send(
            contact_router(app.state.clone()),
            "DELETE",
            &format!("/api/admin/messages/{id}"),
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Message deleted successfully!");
        assert_eq!(body["list"]["items"], json!([]));
    }

    #[tokio::test]
    async fn test_disabled_store_is_service_unavailable() {
        let app = test_app().await;
        let state = AppState::new(
            crate::gateway::Gateway::disabled(),
            app.state.sessions.clone(),
        );
        let (status, body) = send(
            contact_router(state),
            "POST",
            "/api/contact",
            None,
            Some(json!({"name": "Ana", "email": "ana@example.com", "message": "hi"})),
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["code"], "not_configured");
    }
}
