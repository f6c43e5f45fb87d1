//! HTTP error envelope. Every failure leaves the API as
//! `{ "error": { "code", "message" } }` with a matching status code.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::ledger::LedgerError;
use crate::pipeline::processor::PipelineError;
use crate::review::ReviewError;

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "VALIDATION", message)
    }

    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, "PERMISSION_DENIED", message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL", message)
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: &'static str,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(code = self.code, message = %self.message, "request failed");
        }
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::Validation(msg) => Self::validation(msg),
            LedgerError::NotFound(what) => {
                Self::new(StatusCode::NOT_FOUND, "NOT_FOUND", what)
            }
            LedgerError::AlreadyResolved { id, status } => Self::new(
                StatusCode::CONFLICT,
                "ALREADY_RESOLVED",
                format!("submission {id} already resolved as {status}"),
            ),
            LedgerError::Database(err) => Self::internal(err.to_string()),
        }
    }
}

impl From<ReviewError> for ApiError {
    fn from(err: ReviewError) -> Self {
        match err {
            ReviewError::PermissionDenied { actor_id } => {
                Self::permission_denied(format!("actor {actor_id} may not review submissions"))
            }
            ReviewError::EvidenceMissing { id } => Self::new(
                StatusCode::NOT_FOUND,
                "EVIDENCE_MISSING",
                format!("no stored evidence for submission {id}"),
            ),
            ReviewError::Ledger(err) => err.into(),
            ReviewError::Storage(err) => Self::internal(err.to_string()),
        }
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Ledger(err) => err.into(),
            PipelineError::Storage(err) => Self::internal(err.to_string()),
        }
    }
}
