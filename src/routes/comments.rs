/**
 * Comment Routes
 * Public guestbook comments, pinned first; admin pin and delete
 */
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use super::auth::AdminSession;
use super::{ApiResponse, AppState, MutationResponse};
use crate::error::AppError;
use crate::models::{Comment, RowId};
use crate::views::CommentForm;

/// GET /api/comments
pub async fn list_comments(
    State(state): State<AppState>,
) -> (StatusCode, Json<ApiResponse<Vec<Comment>>>) {
    match state.gateway.list_comments().await {
        Ok(comments) => (StatusCode::OK, Json(ApiResponse::ok(comments))),
        Err(e) => {
            let err = AppError::from(e);
            tracing::error!(error = %err, "failed to list comments");
            (err.status(), Json(ApiResponse::empty_with_error(&err)))
        }
    }
}

/// POST /api/comments
pub async fn create_comment(
    State(state): State<AppState>,
    Json(form): Json<CommentForm>,
) -> Result<(StatusCode, Json<ApiResponse<Vec<Comment>>>), AppError> {
    let input = form.validate()?;
    state.gateway.create_comment(&input).await?;
    tracing::info!(name = %input.name, "comment posted");

    let comments = state.gateway.list_comments().await?;
    let mut response = ApiResponse::ok(comments);
    response.message = Some("Comment posted successfully!".to_string());
    Ok((StatusCode::CREATED, Json(response)))
}

/// POST /api/admin/comments/{id}/pin - toggles the pinned flag
pub async fn toggle_pin(
    State(state): State<AppState>,
    AdminSession(_admin): AdminSession,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<MutationResponse<Comment>>), AppError> {
    let outcome = state.dashboard.toggle_comment_pin(&RowId::new(id)).await?;
    Ok((StatusCode::OK, Json(outcome.into())))
}

/// DELETE /api/admin/comments/{id}
pub async fn delete_comment(
    State(state): State<AppState>,
    AdminSession(_admin): AdminSession,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<MutationResponse<Comment>>), AppError> {
    let outcome = state.dashboard.delete_comment(&RowId::new(id)).await?;
    Ok((StatusCode::OK, Json(outcome.into())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::tables;
    use crate::routes::test_support::{login, send, test_app};
    use axum::routing::{delete, get, post};
    use axum::Router;
    use serde_json::json;

    fn comments_router(state: AppState) -> Router {
        Router::new()
            .route("/api/comments", get(list_comments).post(create_comment))
            .route("/api/admin/comments/{id}/pin", post(toggle_pin))
            .route("/api/admin/comments/{id}", delete(delete_comment))
            .with_state(state)
    }

    #[tokio::test]
    async fn test_new_comment_starts_unpinned_without_likes() {
        let app = test_app().await;
        let (status, body) = send(
            comments_router(app.state.clone()),
            "POST",
            "/api/comments",
            None,
            Some(json!({"name": "Budi", "message": "Keren!"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"][0]["likes"], 0);
        assert_eq!(body["data"][0]["is_pinned"], false);
    }

    #[tokio::test]
    async fn test_pin_moves_comment_to_top() {
        let app = test_app().await;
        let token = login(&app.state).await;
        app.store.seed(
            tables::COMMENTS,
            json!({"id": 1, "name": "a", "message": "old", "created_at": "2024-01-01T00:00:00Z"}),
        );
        app.store.seed(
            tables::COMMENTS,
            json!({"id": 2, "name": "b", "message": "new", "created_at": "2024-02-01T00:00:00Z"}),
        );

        let (_, body) =
            send(comments_router(app.state.clone()), "GET", "/api/comments", None, None).await;
        assert_eq!(body["data"][0]["id"], 2);

        let (status, body) = send(
            comments_router(app.state.clone()),
            "POST",
            "/api/admin/comments/1/pin",
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Comment pinned successfully! 📌");
        assert_eq!(body["list"]["items"][0]["id"], 1);

        let (_, body) =
            send(comments_router(app.state.clone()), "GET", "/api/comments", None, None).await;
        assert_eq!(body["data"][0]["id"], 1);
        assert_eq!(body["data"][0]["is_pinned"], true);
    }

    #[tokio::test]
    async fn test_delete_comment_requires_admin() {
        let app = test_app().await;
        let (status, body) = send(
            comments_router(app.state.clone()),
            "DELETE",
            "/api/admin/comments/1",
            Some("forged"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Sesi admin tidak valid atau telah berakhir.");
    }
}
