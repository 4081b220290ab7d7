//! Encoding helpers between domain types and SQLite column text.
//!
//! Subject ids are stored as decimal strings (they exceed `i64` range in
//! principle), timestamps as RFC 3339, role sets as JSON arrays.

use chrono::{DateTime, Utc};
use warden_core::{
  ids::{RoleId, SubjectId},
  record::{self, PrisonerRecord},
};

use crate::{Error, Result};

// ─── SubjectId ────────────────────────────────────────────────────────────────

pub fn encode_subject(id: SubjectId) -> String { id.0.to_string() }

pub fn decode_subject(s: &str) -> Result<SubjectId> {
  s.parse().map(SubjectId).map_err(|_| Error::SubjectId(s.to_owned()))
}

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

// ─── Roles ───────────────────────────────────────────────────────────────────

pub fn encode_roles(roles: &[RoleId]) -> Result<String> {
  Ok(serde_json::to_string(roles)?)
}

pub fn decode_roles(s: &str) -> Result<Vec<RoleId>> { Ok(serde_json::from_str(s)?) }

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw values read directly from a `prisoners` row.
pub struct RawPrisoner {
  pub subject_id:     String,
  pub schema_version: i64,
  pub record_json:    String,
}

impl RawPrisoner {
  pub fn into_record(self) -> Result<PrisonerRecord> {
    let version = u32::try_from(self.schema_version)
      .map_err(|_| Error::SchemaVersion(self.schema_version))?;
    let record = record::decode(version, &self.record_json)?;

    // The key column is authoritative for which subject a row belongs to.
    let subject_id = decode_subject(&self.subject_id)?;
    if record.subject_id != subject_id {
      tracing::warn!(
        row = %subject_id,
        document = %record.subject_id,
        "prisoner document disagrees with its key; using the key"
      );
    }
    Ok(PrisonerRecord { subject_id, ..record })
  }
}
