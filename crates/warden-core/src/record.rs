//! The versioned, durable shape of a prisoner.
//!
//! Records are what the store persists; [`Prisoner`] is what the engine works
//! on. [`decode`] is the single entry point for reading stored documents and
//! migrates older shapes forward.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
  Error, Result,
  ids::{RoleId, RoleSet, SubjectId, WarrantId},
  prisoner::Prisoner,
  term::Term,
  warrant::Warrant,
};

/// Version written by [`PrisonerRecord::from`].
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

// ─── Current schema ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrisonerRecord {
  pub schema_version: u32,
  pub subject_id:     SubjectId,
  /// `Some` iff the confinement effect is applied.
  #[serde(default)]
  pub saved_roles:    Option<Vec<RoleId>>,
  #[serde(default)]
  pub committed_at:   Option<DateTime<Utc>>,
  #[serde(default)]
  pub warrants:       Vec<WarrantRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarrantRecord {
  pub id:               WarrantId,
  #[serde(default)]
  pub category:         String,
  #[serde(default)]
  pub description:      String,
  pub author_id:        u64,
  pub created_at:       DateTime<Utc>,
  #[serde(default)]
  pub started_at:       Option<DateTime<Utc>>,
  #[serde(default)]
  pub expires_at:       Option<DateTime<Utc>>,
  /// Seconds, with `-1` meaning indefinite.
  pub duration_seconds: i64,
  #[serde(default)]
  pub frozen:           bool,
  #[serde(default)]
  pub unenforced:       bool,
}

impl From<&Warrant> for WarrantRecord {
  fn from(w: &Warrant) -> Self {
    Self {
      id:               w.id.clone(),
      category:         w.category.clone(),
      description:      w.description.clone(),
      author_id:        w.author_id,
      created_at:       w.created_at,
      started_at:       w.started_at,
      expires_at:       w.expires_at,
      duration_seconds: w.term.to_seconds(),
      frozen:           w.frozen,
      unenforced:       w.unenforced,
    }
  }
}

impl From<WarrantRecord> for Warrant {
  fn from(r: WarrantRecord) -> Self {
    Self {
      id:          r.id,
      category:    r.category,
      description: r.description,
      author_id:   r.author_id,
      created_at:  r.created_at,
      started_at:  r.started_at,
      expires_at:  r.expires_at,
      term:        Term::from_seconds(r.duration_seconds),
      frozen:      r.frozen,
      unenforced:  r.unenforced,
    }
  }
}

impl From<&Prisoner> for PrisonerRecord {
  fn from(p: &Prisoner) -> Self {
    Self {
      schema_version: CURRENT_SCHEMA_VERSION,
      subject_id:     p.id,
      saved_roles:    p.saved_roles.as_ref().map(RoleSet::to_vec),
      committed_at:   p.committed_at,
      warrants:       p.warrants.iter().map(WarrantRecord::from).collect(),
    }
  }
}

impl From<PrisonerRecord> for Prisoner {
  fn from(r: PrisonerRecord) -> Self {
    Self {
      id:           r.subject_id,
      saved_roles:  r.saved_roles.map(|roles| roles.into_iter().collect()),
      committed_at: r.committed_at,
      warrants:     r.warrants.into_iter().map(Warrant::from).collect(),
    }
  }
}

impl PrisonerRecord {
  /// Serialise for storage alongside [`CURRENT_SCHEMA_VERSION`].
  pub fn to_json(&self) -> Result<String> { Ok(serde_json::to_string(self)?) }
}

// ─── Decoding and migration ──────────────────────────────────────────────────

/// Decode a stored document written under `schema_version`.
pub fn decode(schema_version: u32, json: &str) -> Result<PrisonerRecord> {
  match schema_version {
    0 => {
      let legacy: LegacyPrisoner = serde_json::from_str(json)?;
      legacy.migrate()
    }
    CURRENT_SCHEMA_VERSION => {
      let mut record: PrisonerRecord = serde_json::from_str(json)?;
      record.schema_version = CURRENT_SCHEMA_VERSION;
      Ok(record)
    }
    other => Err(Error::UnsupportedSchema(other)),
  }
}

/// The pre-versioning document shape: underscore ids, `roles` as a plain list
/// (empty meaning "not confined"), nullable flags, and timestamps that may
/// lack a zone.
#[derive(Debug, Deserialize)]
struct LegacyPrisoner {
  #[serde(rename = "_id")]
  id:        u64,
  #[serde(default)]
  roles:     Vec<u64>,
  #[serde(default)]
  committed: Value,
  #[serde(default)]
  warrants:  Vec<LegacyWarrant>,
}

#[derive(Debug, Deserialize)]
struct LegacyWarrant {
  #[serde(rename = "_id")]
  id:          String,
  #[serde(default)]
  category:    Option<String>,
  #[serde(default)]
  description: Option<String>,
  #[serde(default)]
  author:      Option<u64>,
  #[serde(default)]
  created:     Value,
  #[serde(default)]
  started:     Value,
  #[serde(default)]
  expires:     Value,
  #[serde(default)]
  len_seconds: Option<f64>,
  #[serde(default)]
  frozen:      Option<bool>,
  #[serde(default)]
  no_enforce:  Option<bool>,
}

impl LegacyPrisoner {
  fn migrate(self) -> Result<PrisonerRecord> {
    let warrants = self
      .warrants
      .into_iter()
      .map(LegacyWarrant::migrate)
      .collect::<Result<Vec<_>>>()?;

    Ok(PrisonerRecord {
      schema_version: CURRENT_SCHEMA_VERSION,
      subject_id:     SubjectId(self.id),
      saved_roles:    (!self.roles.is_empty())
        .then(|| self.roles.into_iter().map(RoleId).collect()),
      committed_at:   legacy_timestamp(&self.committed)?,
      warrants,
    })
  }
}

impl LegacyWarrant {
  fn migrate(self) -> Result<WarrantRecord> {
    let created_at = legacy_timestamp(&self.created)?.ok_or_else(|| {
      Error::MalformedRecord(format!("warrant {} has no creation time", self.id))
    })?;
    let expires_at = legacy_timestamp(&self.expires)?;
    // The old code only ever cleared `expires`; a stale `started` without
    // it is meaningless.
    let started_at = if expires_at.is_some() {
      legacy_timestamp(&self.started)?
    } else {
      None
    };

    Ok(WarrantRecord {
      id: WarrantId::from(self.id),
      category: self.category.unwrap_or_default(),
      description: self.description.unwrap_or_default(),
      author_id: self.author.unwrap_or_default(),
      created_at,
      started_at,
      expires_at,
      // `as` saturates; the clamp keeps absurd lengths schedulable.
      duration_seconds: Term::from_seconds(self.len_seconds.unwrap_or_default().trunc() as i64)
        .to_seconds(),
      frozen: self.frozen.unwrap_or_default(),
      unenforced: self.no_enforce.unwrap_or_default(),
    })
  }
}

/// Read a legacy timestamp, normalising to UTC.
///
/// Accepts `null`, RFC 3339 strings, zone-less ISO strings (taken as UTC),
/// and extended-JSON `{"$date": ...}` wrappers around either.
fn legacy_timestamp(value: &Value) -> Result<Option<DateTime<Utc>>> {
  match value {
    Value::Null => Ok(None),
    Value::Object(map) => match map.get("$date") {
      Some(inner) => legacy_timestamp(inner),
      None => Err(Error::MalformedRecord(format!("unexpected timestamp {value}"))),
    },
    Value::Number(n) => n
      .as_i64()
      .and_then(DateTime::from_timestamp_millis)
      .map(Some)
      .ok_or_else(|| Error::MalformedRecord(format!("bad epoch timestamp {n}"))),
    Value::String(s) => {
      if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(Some(dt.with_timezone(&Utc)));
      }
      ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|naive| Some(naive.and_utc()))
        .ok_or_else(|| Error::MalformedRecord(format!("bad timestamp {s:?}")))
    }
    other => Err(Error::MalformedRecord(format!("unexpected timestamp {other}"))),
  }
}
