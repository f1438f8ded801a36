// Path: crates/gateway/src/error.rs
//! Error → HTTP mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use warden_types::error::{ErrorCode, WardenError};

/// The gateway's error envelope: preconditions travel verbatim with their
/// stable code; everything else is logged under the session and redacted.
pub enum AppError {
    /// Malformed request body or encoding.
    BadRequest(String),
    /// A coordinator error, mapped by its taxonomy.
    Coordinator(WardenError),
}

impl From<WardenError> for AppError {
    fn from(e: WardenError) -> Self {
        Self::Coordinator(e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message, violations) = match self {
            AppError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, "INVALID_REQUEST", message, None)
            }
            AppError::Coordinator(e) => {
                let status = status_of(&e);
                let violations = match &e {
                    WardenError::PolicyBlocked(violations) => Some(violations.clone()),
                    _ => None,
                };
                let message = if e.is_precondition() {
                    e.to_string()
                } else {
                    tracing::error!(target: "gateway", error = %e, "request failed");
                    "Internal server error".to_string()
                };
                (status, e.code(), message, violations)
            }
        };

        let mut body = serde_json::json!({ "code": code, "message": message });
        if let Some(violations) = violations {
            body["violations"] = serde_json::json!(violations);
        }
        (status, Json(body)).into_response()
    }
}

fn status_of(e: &WardenError) -> StatusCode {
    match e {
        WardenError::SignerNotFound(_) | WardenError::SessionNotFound(_) => StatusCode::NOT_FOUND,
        WardenError::SessionExpired
        | WardenError::SessionOwnership
        | WardenError::SignerNotActive(_)
        | WardenError::Saturated
        | WardenError::WrongSessionKind(_)
        | WardenError::PolicyBlocked(_) => StatusCode::FORBIDDEN,
        WardenError::MissingChainId => StatusCode::BAD_REQUEST,
        WardenError::Scheme(_)
        | WardenError::Chain(_)
        | WardenError::Crypto(_)
        | WardenError::Store(_)
        | WardenError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
