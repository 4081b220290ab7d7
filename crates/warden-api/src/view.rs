//! Response shapes: domain types plus their derived status.

use chrono::{DateTime, Utc};
use serde::Serialize;
use warden_core::{
  ids::{RoleSet, SubjectId},
  prisoner::Prisoner,
  warrant::{Warrant, WarrantStatus},
};

#[derive(Debug, Serialize)]
pub struct WarrantView {
  pub subject_id:  SubjectId,
  #[serde(flatten)]
  pub warrant:     Warrant,
  pub status:      WarrantStatus,
  /// Human-readable rendering of `status`.
  pub status_text: String,
}

impl WarrantView {
  pub fn new(subject_id: SubjectId, warrant: Warrant, now: DateTime<Utc>) -> Self {
    let status = warrant.status(now);
    Self {
      subject_id,
      warrant,
      status,
      status_text: status.to_string(),
    }
  }
}

#[derive(Debug, Serialize)]
pub struct PrisonerView {
  pub subject_id:           SubjectId,
  pub confined:             bool,
  pub requires_confinement: bool,
  pub committed_at:         Option<DateTime<Utc>>,
  pub saved_roles:          Option<RoleSet>,
  pub warrants:             Vec<WarrantView>,
}

impl PrisonerView {
  pub fn new(prisoner: Prisoner, now: DateTime<Utc>) -> Self {
    let requires_confinement = prisoner.requires_confinement();
    let subject_id = prisoner.id;
    Self {
      subject_id,
      confined: prisoner.is_confined(),
      requires_confinement,
      committed_at: prisoner.committed_at,
      saved_roles: prisoner.saved_roles,
      warrants: prisoner
        .warrants
        .into_iter()
        .map(|w| WarrantView::new(subject_id, w, now))
        .collect(),
    }
  }
}
