//! [`RoleLedger`]: member role sets kept in SQLite.
//!
//! The ledger is the warden's view of who holds which roles. A chat adapter
//! keeps it in sync with the platform (members joining, leaving, changing
//! roles) and mirrors the confinement changes the warden writes back. A
//! member with no row has left and is unreachable.

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use warden_core::{
  effector::{ConfinementEffector, EffectError},
  ids::{RoleId, RoleSet, SubjectId},
};

use crate::{
  Error, Result,
  encode::{decode_roles, encode_dt, encode_roles, encode_subject},
};

#[derive(Clone)]
pub struct RoleLedger {
  conn:        tokio_rusqlite::Connection,
  prison_role: RoleId,
}

impl RoleLedger {
  pub(crate) fn new(conn: tokio_rusqlite::Connection, prison_role: RoleId) -> Self {
    Self { conn, prison_role }
  }

  pub fn prison_role(&self) -> RoleId { self.prison_role }

  /// Record that `subject` is present with exactly `roles`.
  pub async fn set_member_roles(&self, subject: SubjectId, roles: &[RoleId]) -> Result<()> {
    let subject_str = encode_subject(subject);
    let roles_str   = encode_roles(roles)?;
    let at_str      = encode_dt(Utc::now());

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO members (subject_id, roles_json, updated_at)
           VALUES (?1, ?2, ?3)
           ON CONFLICT(subject_id) DO UPDATE SET
             roles_json = excluded.roles_json,
             updated_at = excluded.updated_at",
          rusqlite::params![subject_str, roles_str, at_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Record that `subject` left. Returns whether they were present.
  pub async fn remove_member(&self, subject: SubjectId) -> Result<bool> {
    let subject_str = encode_subject(subject);

    let removed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM members WHERE subject_id = ?1",
          rusqlite::params![subject_str],
        )?)
      })
      .await?;
    Ok(removed > 0)
  }

  /// The member's full role list (marker included), or `None` if absent.
  pub async fn member_roles(&self, subject: SubjectId) -> Result<Option<Vec<RoleId>>> {
    let subject_str = encode_subject(subject);

    let raw: Option<String> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT roles_json FROM members WHERE subject_id = ?1",
              rusqlite::params![subject_str],
              |row| row.get(0),
            )
            .optional()?,
        )
      })
      .await?;

    raw.as_deref().map(decode_roles).transpose()
  }

  /// Overwrite an existing member's roles. `false` if the member is absent.
  async fn replace_roles(&self, subject: SubjectId, roles: &[RoleId]) -> Result<bool> {
    let subject_str = encode_subject(subject);
    let roles_str   = encode_roles(roles)?;
    let at_str      = encode_dt(Utc::now());

    let updated = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE members SET roles_json = ?2, updated_at = ?3 WHERE subject_id = ?1",
          rusqlite::params![subject_str, roles_str, at_str],
        )?)
      })
      .await?;
    Ok(updated > 0)
  }
}

fn backend(e: Error) -> EffectError { EffectError::Backend(Box::new(e)) }

impl ConfinementEffector for RoleLedger {
  async fn current_roles(&self, subject_id: SubjectId) -> Result<RoleSet, EffectError> {
    let roles = self
      .member_roles(subject_id)
      .await
      .map_err(backend)?
      .ok_or(EffectError::Unreachable(subject_id))?;
    Ok(
      roles
        .into_iter()
        .filter(|r| *r != self.prison_role)
        .collect(),
    )
  }

  async fn apply_confinement(&self, subject_id: SubjectId) -> Result<(), EffectError> {
    if self
      .replace_roles(subject_id, &[self.prison_role])
      .await
      .map_err(backend)?
    {
      Ok(())
    } else {
      Err(EffectError::Unreachable(subject_id))
    }
  }

  async fn restore_roles(
    &self,
    subject_id: SubjectId,
    roles: &RoleSet,
  ) -> Result<(), EffectError> {
    if self
      .replace_roles(subject_id, &roles.to_vec())
      .await
      .map_err(backend)?
    {
      Ok(())
    } else {
      Err(EffectError::Unreachable(subject_id))
    }
  }
}
