//! [`SqliteStore`]: the SQLite implementation of [`PrisonerStore`].

use std::path::Path;

use chrono::Utc;
use warden_core::{
  ids::{RoleId, SubjectId},
  record::{CURRENT_SCHEMA_VERSION, PrisonerRecord},
  store::PrisonerStore,
};

use crate::{
  Error, Result,
  encode::{RawPrisoner, encode_dt, encode_subject},
  ledger::RoleLedger,
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A prisoner store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// A role ledger sharing this store's connection, using `prison_role` as
  /// the confinement marker.
  pub fn role_ledger(&self, prison_role: RoleId) -> RoleLedger {
    RoleLedger::new(self.conn.clone(), prison_role)
  }

  /// Write raw documents in the pre-versioning shape (`schema_version` 0).
  ///
  /// They are migrated when next loaded and rewritten in the current schema
  /// on the following save. Existing rows for the same subject are replaced.
  pub async fn import_legacy(&self, documents: &[serde_json::Value]) -> Result<usize> {
    let mut rows = Vec::with_capacity(documents.len());
    for doc in documents {
      // Validate up front so a bad document rejects the whole batch.
      let record = warden_core::record::decode(0, &doc.to_string())?;
      rows.push((encode_subject(record.subject_id), doc.to_string()));
    }
    let now_str = encode_dt(Utc::now());

    let count = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        {
          let mut stmt = tx.prepare(
            "INSERT INTO prisoners (subject_id, schema_version, record_json, updated_at)
             VALUES (?1, 0, ?2, ?3)
             ON CONFLICT(subject_id) DO UPDATE SET
               schema_version = excluded.schema_version,
               record_json    = excluded.record_json,
               updated_at     = excluded.updated_at",
          )?;
          for (subject, json) in &rows {
            stmt.execute(rusqlite::params![subject, json, now_str])?;
          }
        }
        tx.commit()?;
        Ok(rows.len())
      })
      .await?;

    Ok(count)
  }
}

// ─── PrisonerStore impl ──────────────────────────────────────────────────────

impl PrisonerStore for SqliteStore {
  type Error = Error;

  async fn save(&self, record: &PrisonerRecord) -> Result<()> {
    let subject_str = encode_subject(record.subject_id);
    let json        = record.to_json()?;
    let version     = i64::from(CURRENT_SCHEMA_VERSION);
    let at_str      = encode_dt(Utc::now());

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO prisoners (subject_id, schema_version, record_json, updated_at)
           VALUES (?1, ?2, ?3, ?4)
           ON CONFLICT(subject_id) DO UPDATE SET
             schema_version = excluded.schema_version,
             record_json    = excluded.record_json,
             updated_at     = excluded.updated_at",
          rusqlite::params![subject_str, version, json, at_str],
        )?;
        Ok(())
      })
      .await?;

    tracing::trace!(subject = %record.subject_id, "saved prisoner");
    Ok(())
  }

  async fn delete(&self, subject_id: SubjectId) -> Result<()> {
    let subject_str = encode_subject(subject_id);

    let removed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM prisoners WHERE subject_id = ?1",
          rusqlite::params![subject_str],
        )?)
      })
      .await?;

    tracing::trace!(subject = %subject_id, removed, "deleted prisoner");
    Ok(())
  }

  async fn load_all(&self) -> Result<Vec<PrisonerRecord>> {
    let raws: Vec<RawPrisoner> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT subject_id, schema_version, record_json
           FROM prisoners
           ORDER BY subject_id",
        )?;
        let rows = stmt
          .query_map([], |row| {
            Ok(RawPrisoner {
              subject_id:     row.get(0)?,
              schema_version: row.get(1)?,
              record_json:    row.get(2)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawPrisoner::into_record).collect()
  }
}
