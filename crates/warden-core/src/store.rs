//! The `PrisonerStore` trait: durable storage keyed by subject id.
//!
//! The trait is implemented by storage backends (e.g. `warden-store-sqlite`).
//! The engine depends on this abstraction, not on any concrete backend.

use std::future::Future;

use crate::{ids::SubjectId, record::PrisonerRecord};

/// Abstraction over a prisoner store backend.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes.
pub trait PrisonerStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Upsert the full record for `record.subject_id`.
  fn save<'a>(
    &'a self,
    record: &'a PrisonerRecord,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Remove the record for `subject_id`. Succeeds if there was none.
  fn delete(
    &self,
    subject_id: SubjectId,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Read every stored record, migrated to the current schema.
  fn load_all(
    &self,
  ) -> impl Future<Output = Result<Vec<PrisonerRecord>, Self::Error>> + Send + '_;
}
