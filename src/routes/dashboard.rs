/**
 * Admin Dashboard Route
 * Opens a dashboard tab and returns its freshly fetched list
 */
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;

use super::auth::AdminSession;
use super::AppState;
use crate::error::{AppError, ValidationError};
use crate::session::AdminIdentity;
use crate::views::{Tab, TabSnapshot};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardResponse {
    pub success: bool,
    pub admin: AdminIdentity,
    pub remaining_ms: i64,
    #[serde(flatten)]
    pub view: TabSnapshot,
}

/// GET /api/admin/dashboard/{tab}
pub async fn open_tab(
    State(state): State<AppState>,
    AdminSession(admin): AdminSession,
    Path(tab): Path<String>,
) -> Result<(StatusCode, Json<DashboardResponse>), AppError> {
    let tab: Tab = tab.parse().map_err(|_| ValidationError::Invalid {
        field: "tab",
        reason: format!("unknown tab '{tab}'"),
    })?;

    let view = state.dashboard.switch_tab(tab).await;
    let remaining_ms = state.sessions.time_remaining().await.num_milliseconds();

    Ok((
        StatusCode::OK,
        Json(DashboardResponse {
            success: true,
            admin,
            remaining_ms,
            view,
        }),
    ))
}
