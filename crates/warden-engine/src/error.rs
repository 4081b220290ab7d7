//! Error type for `warden-engine`.

use thiserror::Error;
use warden_core::ids::{SubjectId, WarrantId};

#[derive(Debug, Error)]
pub enum Error {
  #[error("warrant not found: {0}")]
  WarrantNotFound(WarrantId),

  #[error("subject not found: {0}")]
  SubjectNotFound(SubjectId),

  /// A bulk void with no criteria would void every warrant.
  #[error("void filter has no criteria")]
  EmptyFilter,

  #[error("core error: {0}")]
  Core(#[from] warden_core::Error),

  /// Saving, deleting, or loading failed. In-memory state stays
  /// authoritative and the write is retried on the next pass.
  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  pub(crate) fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(e))
  }

  /// Whether the failure is a missing id rather than an infrastructure fault.
  pub fn is_not_found(&self) -> bool {
    matches!(self, Self::WarrantNotFound(_) | Self::SubjectNotFound(_))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
