//! Handlers for `/members`: the chat adapter's view of member roles.
//!
//! The adapter keeps these rows in sync with the platform. The warden reads
//! them when booking and writes the confinement changes back.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/members/:subject_id` | Current roles, marker included |
//! | `PUT`    | `/members/:subject_id` | Body: `{"roles":[..]}`; member present |
//! | `DELETE` | `/members/:subject_id` | Member left |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
};
use serde::{Deserialize, Serialize};
use warden_core::ids::{RoleId, SubjectId};
use warden_store_sqlite::RoleLedger;

use crate::error::Error;

#[derive(Debug, Serialize, Deserialize)]
pub struct MemberRoles {
  pub roles: Vec<RoleId>,
}

/// `GET /members/:subject_id`
pub async fn get_one(
  State(ledger): State<RoleLedger>,
  Path(subject_id): Path<u64>,
) -> Result<Json<MemberRoles>, Error> {
  let roles = ledger
    .member_roles(SubjectId(subject_id))
    .await?
    .ok_or(Error::MemberNotFound(subject_id))?;
  Ok(Json(MemberRoles { roles }))
}

/// `PUT /members/:subject_id`
pub async fn put(
  State(ledger): State<RoleLedger>,
  Path(subject_id): Path<u64>,
  Json(body): Json<MemberRoles>,
) -> Result<StatusCode, Error> {
  ledger
    .set_member_roles(SubjectId(subject_id), &body.roles)
    .await?;
  Ok(StatusCode::NO_CONTENT)
}

/// `DELETE /members/:subject_id`
pub async fn delete(
  State(ledger): State<RoleLedger>,
  Path(subject_id): Path<u64>,
) -> Result<StatusCode, Error> {
  if ledger.remove_member(SubjectId(subject_id)).await? {
    Ok(StatusCode::NO_CONTENT)
  } else {
    Err(Error::MemberNotFound(subject_id))
  }
}
