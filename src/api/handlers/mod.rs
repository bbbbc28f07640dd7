//! API request handlers.

pub mod books;
pub mod exchange;
pub mod notifications;
pub mod status;

use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::error::{ErrorKind, ExchangeError, InvalidOperation};

/// Error body returned by every handler.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

/// Maps workflow errors onto HTTP statuses.
#[derive(Debug)]
pub struct ApiError(pub ExchangeError);

impl From<ExchangeError> for ApiError {
    fn from(value: ExchangeError) -> Self {
        ApiError(value)
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(value: anyhow::Error) -> Self {
        ApiError(ExchangeError::Other(value))
    }
}

// Malformed bodies and query strings are client errors like any other
// validation failure, and get the same JSON body.
impl From<JsonRejection> for ApiError {
    fn from(value: JsonRejection) -> Self {
        ApiError(ExchangeError::Validation(value.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(value: QueryRejection) -> Self {
        ApiError(ExchangeError::Validation(value.body_text()))
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            ExchangeError::InvalidOperation(InvalidOperation::NotPending { .. }) => {
                StatusCode::CONFLICT
            }
            ExchangeError::InvalidOperation(_) => StatusCode::BAD_REQUEST,
            other => match other.kind() {
                ErrorKind::Validation => StatusCode::BAD_REQUEST,
                ErrorKind::NotFound => StatusCode::NOT_FOUND,
                ErrorKind::Conflict => StatusCode::CONFLICT,
                ErrorKind::InvalidOperation => StatusCode::BAD_REQUEST,
                ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self.0, "Request failed");
        }
        let body = ErrorBody {
            error: self.0.kind().to_string(),
            message: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
