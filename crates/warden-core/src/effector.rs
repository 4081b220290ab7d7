//! The `ConfinementEffector` trait: the externally visible side of
//! confinement.
//!
//! An effector swaps a subject's role set for the single confinement marker
//! role and back again. Failures never escape a reconciliation step; the
//! engine logs them and retries on the next pass.

use std::future::Future;

use thiserror::Error;

use crate::ids::{RoleSet, SubjectId};

#[derive(Debug, Error)]
pub enum EffectError {
  /// The subject cannot be resolved, e.g. they left the server.
  #[error("subject {0} is unreachable")]
  Unreachable(SubjectId),

  #[error("effector backend error: {0}")]
  Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

pub trait ConfinementEffector: Send + Sync {
  /// The roles the subject holds right now, excluding the confinement marker.
  fn current_roles(
    &self,
    subject_id: SubjectId,
  ) -> impl Future<Output = Result<RoleSet, EffectError>> + Send + '_;

  /// Replace the subject's roles with the confinement marker alone.
  fn apply_confinement(
    &self,
    subject_id: SubjectId,
  ) -> impl Future<Output = Result<(), EffectError>> + Send + '_;

  /// Replace the subject's roles with `roles`.
  fn restore_roles<'a>(
    &'a self,
    subject_id: SubjectId,
    roles: &'a RoleSet,
  ) -> impl Future<Output = Result<(), EffectError>> + Send + 'a;
}
