//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  extract::rejection::{JsonRejection, PathRejection, QueryRejection},
  http::StatusCode,
  response::{IntoResponse, Response},
};
use netpatrol_core::ErrorKind;
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error(transparent)]
  Core(#[from] netpatrol_core::Error),

  /// An `Authorization` header was present but did not identify an account.
  #[error("invalid credentials")]
  InvalidCredentials,

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("credential hashing failed: {0}")]
  Hashing(String),
}

impl From<JsonRejection> for ApiError {
  fn from(rejection: JsonRejection) -> Self { Self::BadRequest(rejection.body_text()) }
}

impl From<PathRejection> for ApiError {
  fn from(rejection: PathRejection) -> Self { Self::BadRequest(rejection.body_text()) }
}

impl From<QueryRejection> for ApiError {
  fn from(rejection: QueryRejection) -> Self { Self::BadRequest(rejection.body_text()) }
}

pub fn status_for(kind: ErrorKind) -> StatusCode {
  match kind {
    ErrorKind::NotFound => StatusCode::NOT_FOUND,
    ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
    ErrorKind::Forbidden => StatusCode::FORBIDDEN,
    ErrorKind::InvalidState | ErrorKind::Conflict => StatusCode::CONFLICT,
    ErrorKind::ValidationFailed => StatusCode::UNPROCESSABLE_ENTITY,
    ErrorKind::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, kind) = match &self {
      ApiError::Core(e) => (status_for(e.kind()), e.kind().to_string()),
      ApiError::InvalidCredentials => {
        (StatusCode::UNAUTHORIZED, ErrorKind::Unauthorized.to_string())
      }
      ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request".to_string()),
      ApiError::Hashing(_) => {
        (StatusCode::INTERNAL_SERVER_ERROR, "internal".to_string())
      }
    };
    if status.is_server_error() {
      tracing::error!(error = %self, "request failed");
    } else {
      tracing::debug!(error = %self, %status, "request rejected");
    }
    (status, Json(json!({ "error": self.to_string(), "kind": kind }))).into_response()
  }
}
