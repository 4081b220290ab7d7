//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  /// The store is failing; in-memory state is intact and will be persisted
  /// by a later pass.
  #[error("unavailable: {0}")]
  Unavailable(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl From<warden_engine::Error> for ApiError {
  fn from(e: warden_engine::Error) -> Self {
    use warden_engine::Error as E;
    match e {
      E::WarrantNotFound(id) => Self::NotFound(format!("warrant {id} not found")),
      E::SubjectNotFound(id) => Self::NotFound(format!("prisoner {id} not found")),
      E::EmptyFilter => Self::BadRequest("void filter has no criteria".to_owned()),
      other => Self::Unavailable(Box::new(other)),
    }
  }
}

impl From<warden_core::Error> for ApiError {
  fn from(e: warden_core::Error) -> Self { Self::BadRequest(e.to_string()) }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::Unavailable(e) => {
        tracing::warn!(error = %e, "request failed on storage");
        (StatusCode::SERVICE_UNAVAILABLE, "try again later".to_owned())
      }
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}
