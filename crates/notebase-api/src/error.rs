//! HTTP error envelope.
//!
//! Every failure leaves the service as `{"message": "..."}`. Store errors are
//! collapsed into the fixed messages clients already match on; the underlying
//! error is logged, not returned.

use std::any::Any;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::{error, warn};

/// Body of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub message: String,
}

pub const NO_NOTES: &str = "no notes found";
pub const NOTE_NOT_FOUND: &str = "note not found";
pub const SERVER_ERROR: &str = "server has a error";

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    PayloadTooLarge(String),
    Internal(String),
}

impl ApiError {
    /// `GET /notes` failed.
    pub fn list_failed(err: notebase_core::Error) -> Self {
        error!(route = "list", error = %err, "Listing notes failed");
        ApiError::NotFound(NO_NOTES.to_string())
    }

    /// `GET /notes/:id` failed. Every read failure is reported as not found.
    pub fn read_failed(id: &str, err: notebase_core::Error) -> Self {
        if err.is_not_found() {
            warn!(route = "read", note_id = id, error = %err, "Note not found");
        } else {
            error!(route = "read", note_id = id, error = %err, "Reading note failed");
        }
        ApiError::NotFound(NOTE_NOT_FOUND.to_string())
    }

    /// A create, update or delete failed.
    pub fn write_failed(route: &'static str, id: Option<&str>, err: notebase_core::Error) -> Self {
        let id = id.unwrap_or_default();
        if err.is_not_found() {
            warn!(route, note_id = id, error = %err, "Note not found");
            return ApiError::NotFound(NOTE_NOT_FOUND.to_string());
        }
        error!(route, note_id = id, error = %err, "Writing note failed");
        ApiError::Internal(SERVER_ERROR.to_string())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        let message = rejection.body_text();
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge(message)
        } else {
            ApiError::BadRequest(message)
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

/// Response for a handler that panicked.
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s
    } else {
        "unknown panic payload"
    };
    error!(panic = detail, "Handler panicked");
    ApiError::Internal(SERVER_ERROR.to_string()).into_response()
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            ApiError::NotFound(msg)
            | ApiError::BadRequest(msg)
            | ApiError::PayloadTooLarge(msg)
            | ApiError::Internal(msg) => msg,
        };
        (status, Json(ErrorBody { message })).into_response()
    }
}
