//! Error types for `warden-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("unsupported record schema version: {0}")]
  UnsupportedSchema(u32),

  #[error("malformed record: {0}")]
  MalformedRecord(String),

  #[error("invalid duration {0:?}")]
  InvalidDuration(String),

  #[error("negative duration: {0}s")]
  NegativeDuration(i64),

  #[error("duration of {0}s exceeds the longest finite term")]
  TermTooLong(i64),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
