//! Error type for `warden-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] warden_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("invalid subject id in database: {0:?}")]
  SubjectId(String),

  #[error("negative schema version in database: {0}")]
  SchemaVersion(i64),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
