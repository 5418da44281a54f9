/**
 * Project Routes
 * Public project listing and admin project management
 */
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use super::auth::AdminSession;
use super::{ApiResponse, AppState, MutationResponse};
use crate::error::AppError;
use crate::models::{Project, RowId};
use crate::views::ProjectForm;

/// GET /api/projects - newest first
pub async fn list_projects(
    State(state): State<AppState>,
) -> (StatusCode, Json<ApiResponse<Vec<Project>>>) {
    match state.gateway.list_projects().await {
        Ok(projects) => (StatusCode::OK, Json(ApiResponse::ok(projects))),
        Err(e) => {
            let err = AppError::from(e);
            tracing::error!(error = %err, "failed to list projects");
            (err.status(), Json(ApiResponse::empty_with_error(&err)))
        }
    }
}

/// GET /api/projects/{id}
pub async fn get_project(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<ApiResponse<Project>>), AppError> {
    let project = state
        .gateway
        .get_project(&RowId::new(id))
        .await?
        .ok_or(AppError::NotFound("project"))?;
    Ok((StatusCode::OK, Json(ApiResponse::ok(project))))
}

/// POST /api/admin/projects
pub async fn create_project(
    State(state): State<AppState>,
    AdminSession(_admin): AdminSession,
    Json(form): Json<ProjectForm>,
) -> Result<(StatusCode, Json<MutationResponse<Project>>), AppError> {
    let outcome = state.dashboard.create_project(&form).await?;
    Ok((StatusCode::CREATED, Json(outcome.into())))
}

/// PATCH /api/admin/projects/{id}
pub async fn update_project(
    State(state): State<AppState>,
    AdminSession(_admin): AdminSession,
    Path(id): Path<String>,
    Json(form): Json<ProjectForm>,
) -> Result<(StatusCode, Json<MutationResponse<Project>>), AppError> {
    let outcome = state
        .dashboard
        .update_project(&RowId::new(id), &form)
        .await?;
    Ok((StatusCode::OK, Json(outcome.into())))
}

/// DELETE /api/admin/projects/{id}
pub async fn delete_project(
    State(state): State<AppState>,
    AdminSession(_admin): AdminSession,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<MutationResponse<Project>>), AppError> {
    let outcome = state.dashboard.delete_project(&RowId::new(id)).await?;
    Ok((StatusCode::OK, Json(outcome.into())))
}
