//! Error types and axum `IntoResponse` implementation.

use axum::{
  Json,
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("unauthorized")]
  Unauthorized,
  #[error("member {0} not found")]
  MemberNotFound(u64),
  #[error("store error: {0}")]
  Store(#[from] warden_store_sqlite::Error),
}

impl IntoResponse for Error {
  fn into_response(self) -> Response {
    match self {
      Error::Unauthorized => {
        let mut res =
          (StatusCode::UNAUTHORIZED, "Unauthorized").into_response();
        res.headers_mut().insert(
          header::WWW_AUTHENTICATE,
          HeaderValue::from_static("Basic realm=\"warden\""),
        );
        res
      }
      Error::MemberNotFound(id) => {
        let message = format!("member {id} not found");
        (StatusCode::NOT_FOUND, Json(json!({ "error": message }))).into_response()
      }
      Error::Store(e) => {
        tracing::warn!(error = %e, "member ledger request failed");
        (
          StatusCode::SERVICE_UNAVAILABLE,
          Json(json!({ "error": "try again later" })),
        )
          .into_response()
      }
    }
  }
}
