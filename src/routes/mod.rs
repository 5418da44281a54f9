/**
 * Routes Module
 * API route handlers and the state they share
 */

pub mod auth;
pub mod certificates;
pub mod comments;
pub mod contact;
pub mod dashboard;
pub mod health;
pub mod logs;
pub mod projects;

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

use crate::error::AppError;
use crate::gateway::Gateway;
use crate::session::SessionManager;
use crate::views::{Dashboard, ListSnapshot, MutationOutcome};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub gateway: Gateway,
    pub sessions: Arc<SessionManager>,
    pub dashboard: Arc<Dashboard>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(gateway: Gateway, sessions: Arc<SessionManager>) -> Self {
        Self {
            dashboard: Arc::new(Dashboard::new(gateway.clone())),
            gateway,
            sessions,
            started_at: Instant::now(),
        }
    }
}

/// Envelope of the public endpoints and of `ApiClient` replies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    #[serde(default)]
    pub success: bool,
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: None,
            error: Some(error.into()),
        }
    }
}

/// A list that failed to load renders as an empty list plus the error.
impl<T> ApiResponse<Vec<T>> {
    pub fn empty_with_error(err: &AppError) -> Self {
        Self {
            success: false,
            data: Some(Vec::new()),
            message: None,
            error: Some(err.to_string()),
        }
    }
}

/// Admin mutation reply: confirmation text and the reloaded list.
#[derive(Debug, Serialize)]
pub struct MutationResponse<T> {
    pub success: bool,
    pub message: String,
    pub list: ListSnapshot<T>,
}

impl<T> From<MutationOutcome<T>> for MutationResponse<T> {
    fn from(outcome: MutationOutcome<T>) -> Self {
        Self {
            success: true,
            message: outcome.message,
            list: outcome.snapshot,
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Project;
    use serde_json::json;

    #[test]
    fn test_failed_envelope_decodes_without_data() {
        // `Project` has no `Default`; a missing `data` must still decode.
        let response: ApiResponse<Project> =
            serde_json::from_value(json!({"success": false, "error": "project not found"}))
                .unwrap();
        assert!(!response.success);
        assert!(response.data.is_none());
        assert_eq!(response.error.as_deref(), Some("project not found"));
    }
}
