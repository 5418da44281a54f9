/**
 * Certificate Routes
 */
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use super::auth::AdminSession;
use super::{ApiResponse, AppState, MutationResponse};
use crate::error::AppError;
use crate::models::{Certificate, RowId};
use crate::views::CertificateForm;

/// GET /api/certificates - most recently issued first
pub async fn list_certificates(
    State(state): State<AppState>,
) -> (StatusCode, Json<ApiResponse<Vec<Certificate>>>) {
    match state.gateway.list_certificates().await {
        Ok(certificates) => (StatusCode::OK, Json(ApiResponse::ok(certificates))),
        Err(e) => {
            let err = AppError::from(e);
            tracing::error!(error = %err, "failed to list certificates");
            (err.status(), Json(ApiResponse::empty_with_error(&err)))
        }
    }
}

/// POST /api/admin/certificates
pub async fn create_certificate(
    State(state): State<AppState>,
    AdminSession(_admin): AdminSession,
    Json(form): Json<CertificateForm>,
) -> Result<(StatusCode, Json<MutationResponse<Certificate>>), AppError> {
    let outcome = state.dashboard.create_certificate(&form).await?;
    Ok((StatusCode::CREATED, Json(outcome.into())))
}

/// PATCH /api/admin/certificates/{id}
pub async fn update_certificate(
    State(state): State<AppState>,
    AdminSession(_admin): AdminSession,
    Path(id): Path<String>,
    Json(form): Json<CertificateForm>,
) -> Result<(StatusCode, Json<MutationResponse<Certificate>>), AppError> {
    let outcome = state
        .dashboard
        .update_certificate(&RowId::new(id), &form)
        .await?;
    Ok((StatusCode::OK, Json(outcome.into())))
}

/// DELETE /api/admin/certificates/{id}
pub async fn delete_certificate(
    State(state): State<AppState>,
    AdminSession(_admin): AdminSession,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<MutationResponse<Certificate>>), AppError> {
    let outcome = state.dashboard.delete_certificate(&RowId::new(id)).await?;
    Ok((StatusCode::OK, Json(outcome.into())))
}
