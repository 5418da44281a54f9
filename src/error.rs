//! Error types shared across the gateway, the session manager, and the routes.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failures talking to the hosted row store.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Remote credentials were not provided; database features are disabled.
    #[error("database features are disabled: remote store is not configured")]
    NotConfigured,

    /// The request never produced a response (DNS, TLS, timeout, ...).
    #[error("remote store request failed: {0}")]
    Transport(String),

    /// The store answered with a non-success status.
    #[error("remote store returned {status}: {message}")]
    Server { status: u16, message: String },

    /// The response body did not match the expected shape.
    #[error("unexpected response from remote store: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for GatewayError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::Decode(e.to_string())
        } else {
            Self::Transport(e.to_string())
        }
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(e: serde_json::Error) -> Self {
        Self::Decode(e.to_string())
    }
}

/// Why a login was rejected with a lockout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockoutReason {
    /// An earlier lockout has not elapsed yet.
    StillLocked,
    /// This attempt used up the last remaining try.
    AttemptsExhausted,
}

/// Admin authentication failures.
///
/// The display strings are the user-facing messages of the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("{}", lockout_message(.reason, .remaining_minutes))]
    LockedOut {
        reason: LockoutReason,
        remaining_minutes: i64,
    },

    #[error("Username atau password salah. Sisa percobaan: {remaining_attempts}")]
    InvalidCredentials { remaining_attempts: u32 },

    /// The verifier could not be reached; the cause is kept for logging.
    #[error("Terjadi kesalahan saat login. Silakan coba lagi.")]
    VerificationFailed(String),

    #[error("Sesi admin tidak valid atau telah berakhir.")]
    Unauthenticated,
}

fn lockout_message(reason: &LockoutReason, minutes: &i64) -> String {
    match reason {
        LockoutReason::StillLocked => {
            format!("Account terkunci. Coba lagi dalam {minutes} menit.")
        }
        LockoutReason::AttemptsExhausted => format!(
            "Terlalu banyak percobaan login yang gagal. Account terkunci selama {minutes} menit."
        ),
    }
}

/// A form was submitted without a required field or with a malformed one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    Missing(&'static str),

    #[error("{field} is invalid: {reason}")]
    Invalid {
        field: &'static str,
        reason: String,
    },
}

/// Failures reading or writing the persisted session record.
#[derive(Debug, Error)]
pub enum SessionStoreError {
    #[error("session store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("session record is malformed: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// JSON body for every failed request.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

/// Handler-level error; converts into a JSON response.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// A mutation failed; carries the alert text shown to the operator.
    #[error("{message}")]
    Mutation {
        message: String,
        #[source]
        source: GatewayError,
    },

    #[error("{0} not found")]
    NotFound(&'static str),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Auth(AuthError::LockedOut { .. }) => StatusCode::LOCKED,
            AppError::Auth(AuthError::InvalidCredentials { .. })
            | AppError::Auth(AuthError::Unauthenticated) => StatusCode::UNAUTHORIZED,
            AppError::Auth(AuthError::VerificationFailed(_)) => StatusCode::BAD_GATEWAY,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Gateway(e) | AppError::Mutation { source: e, .. } => gateway_status(e),
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            AppError::Auth(AuthError::LockedOut { .. }) => "locked_out",
            AppError::Auth(AuthError::InvalidCredentials { .. }) => "invalid_credentials",
            AppError::Auth(AuthError::VerificationFailed(_)) => "verification_failed",
            AppError::Auth(AuthError::Unauthenticated) => "unauthenticated",
            AppError::Validation(_) => "validation",
            AppError::Gateway(GatewayError::NotConfigured)
            | AppError::Mutation {
                source: GatewayError::NotConfigured,
                ..
            } => "not_configured",
            AppError::Gateway(_) | AppError::Mutation { .. } => "remote_store",
            AppError::NotFound(_) => "not_found",
        }
    }
}

fn gateway_status(e: &GatewayError) -> StatusCode {
    match e {
        GatewayError::NotConfigured => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::BAD_GATEWAY,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(status = %status, error = %self, "request failed");
        } else {
            tracing::warn!(status = %status, error = %self, "request rejected");
        }

        let body = ErrorResponse {
            success: false,
            error: self.to_string(),
            code: Some(self.code().to_string()),
        };
        (status, Json(body)).into_response()
    }
}
