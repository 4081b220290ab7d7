//! Handlers for `/warrants` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `POST`   | `/warrants` | Body: [`IssueBody`]; 201 + reconciled warrant, even if the write is deferred |
//! | `GET`    | `/warrants/:id` | 404 if no prisoner holds it |
//! | `DELETE` | `/warrants/:id` | Void, then reconcile the holder |
//! | `POST`   | `/warrants/void` | Body: [`VoidBody`]; bulk void |
//! | `POST`   | `/warrants/:id/freeze` | |
//! | `POST`   | `/warrants/:id/thaw` | |
//! | `POST`   | `/warrants/:id/enforcement` | Body: `{"enforced":false}` |
//!
//! Every edit reconciles the affected prisoner straight away so callers see
//! the resulting confinement state. A failed reconciliation is logged and
//! left to the periodic pass.

use std::{collections::BTreeSet, sync::Arc};

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::Utc;
use serde::Deserialize;
use warden_core::{
  effector::ConfinementEffector,
  ids::{SubjectId, WarrantId},
  store::PrisonerStore,
  term::parse_term,
  warrant::{NewWarrant, Warrant},
};
use warden_engine::{VoidFilter, Warden};

use crate::{error::ApiError, view::WarrantView};

type Shared<S, E> = State<Arc<Warden<S, E>>>;

/// Locate the holder of a warrant the caller just edited.
async fn holder<S, E>(warden: &Warden<S, E>, id: &WarrantId) -> Result<SubjectId, ApiError>
where
  S: PrisonerStore,
  E: ConfinementEffector,
{
  warden
    .prisoner_by_warrant_id(id)
    .await
    .map(|p| p.id)
    .ok_or_else(|| ApiError::NotFound(format!("warrant {id} not found")))
}

async fn settle<S, E>(warden: &Warden<S, E>, subject: SubjectId)
where
  S: PrisonerStore,
  E: ConfinementEffector,
{
  if let Err(e) = warden.reconcile_subject(subject, Utc::now()).await {
    tracing::warn!(%subject, error = %e, "reconcile after edit failed; next pass will retry");
  }
}

/// Re-read a warrant after settling; falls back to `edited` if it has since
/// expired out of the stack.
async fn reread<S, E>(
  warden: &Warden<S, E>,
  subject: SubjectId,
  edited: Warrant,
) -> WarrantView
where
  S: PrisonerStore,
  E: ConfinementEffector,
{
  let current = warden.warrant_by_id(&edited.id).await.unwrap_or(edited);
  WarrantView::new(subject, current, Utc::now())
}

// ─── Issue ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct IssueBody {
  pub subject_id:  u64,
  #[serde(default)]
  pub category:    String,
  #[serde(default)]
  pub description: String,
  pub author_id:   u64,
  /// `"1d12h"`, `"3600"`, or `"indefinite"`.
  pub duration:    String,
}

/// `POST /warrants`
pub async fn issue<S, E>(
  State(warden): Shared<S, E>,
  Json(body): Json<IssueBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: PrisonerStore,
  E: ConfinementEffector,
{
  let term = parse_term(&body.duration)?;
  let subject = SubjectId(body.subject_id);
  let issued = warden
    .issue_warrant(subject, NewWarrant {
      category: body.category,
      description: body.description,
      author_id: body.author_id,
      term,
    })
    .await;
  // The warrant is live either way; a failed write is retried by the next
  // pass, so the caller must not resubmit.
  if let Some(e) = &issued.persist_error {
    tracing::warn!(%subject, warrant = %issued.warrant.id, error = %e, "issued warrant pending persistence");
  }
  Ok((
    StatusCode::CREATED,
    Json(WarrantView::new(subject, issued.warrant, Utc::now())),
  ))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /warrants/:id`
pub async fn get_one<S, E>(
  State(warden): Shared<S, E>,
  Path(id): Path<String>,
) -> Result<Json<WarrantView>, ApiError>
where
  S: PrisonerStore,
  E: ConfinementEffector,
{
  let id = WarrantId::from(id);
  let prisoner = warden
    .prisoner_by_warrant_id(&id)
    .await
    .ok_or_else(|| ApiError::NotFound(format!("warrant {id} not found")))?;
  let warrant = prisoner
    .warrant(&id)
    .cloned()
    .ok_or_else(|| ApiError::NotFound(format!("warrant {id} not found")))?;
  Ok(Json(WarrantView::new(prisoner.id, warrant, Utc::now())))
}

// ─── Void ─────────────────────────────────────────────────────────────────────

/// `DELETE /warrants/:id`
pub async fn void_one<S, E>(
  State(warden): Shared<S, E>,
  Path(id): Path<String>,
) -> Result<Json<WarrantView>, ApiError>
where
  S: PrisonerStore,
  E: ConfinementEffector,
{
  let id = WarrantId::from(id);
  let subject = holder(&warden, &id).await?;
  let voided = warden.void_warrant_by_id(&id).await?;
  settle(&warden, subject).await;
  Ok(Json(WarrantView::new(subject, voided, Utc::now())))
}

#[derive(Debug, Deserialize)]
pub struct VoidBody {
  pub category:   Option<String>,
  pub author_id:  Option<u64>,
  pub subject_id: Option<u64>,
}

/// `POST /warrants/void`: bulk void by category, author or subject.
pub async fn void_matching<S, E>(
  State(warden): Shared<S, E>,
  Json(body): Json<VoidBody>,
) -> Result<Json<Vec<WarrantView>>, ApiError>
where
  S: PrisonerStore,
  E: ConfinementEffector,
{
  let filter = VoidFilter {
    category:  body.category,
    author_id: body.author_id,
    subject:   body.subject_id.map(SubjectId),
  };
  let voided = warden.void_warrants(&filter).await?;

  let subjects: BTreeSet<SubjectId> = voided.iter().map(|(s, _)| *s).collect();
  for subject in subjects {
    settle(&warden, subject).await;
  }

  let now = Utc::now();
  Ok(Json(
    voided
      .into_iter()
      .map(|(subject, w)| WarrantView::new(subject, w, now))
      .collect(),
  ))
}

// ─── Freeze / thaw / enforcement ──────────────────────────────────────────────

/// `POST /warrants/:id/freeze`
pub async fn freeze<S, E>(
  State(warden): Shared<S, E>,
  Path(id): Path<String>,
) -> Result<Json<WarrantView>, ApiError>
where
  S: PrisonerStore,
  E: ConfinementEffector,
{
  let id = WarrantId::from(id);
  let subject = holder(&warden, &id).await?;
  let frozen = warden.freeze_warrant(&id, Utc::now()).await?;
  settle(&warden, subject).await;
  Ok(Json(reread(&warden, subject, frozen).await))
}

/// `POST /warrants/:id/thaw`
pub async fn thaw<S, E>(
  State(warden): Shared<S, E>,
  Path(id): Path<String>,
) -> Result<Json<WarrantView>, ApiError>
where
  S: PrisonerStore,
  E: ConfinementEffector,
{
  let id = WarrantId::from(id);
  let subject = holder(&warden, &id).await?;
  let thawed = warden.thaw_warrant(&id).await?;
  settle(&warden, subject).await;
  Ok(Json(reread(&warden, subject, thawed).await))
}

#[derive(Debug, Deserialize)]
pub struct EnforcementBody {
  pub enforced: bool,
}

/// `POST /warrants/:id/enforcement`
pub async fn enforcement<S, E>(
  State(warden): Shared<S, E>,
  Path(id): Path<String>,
  Json(body): Json<EnforcementBody>,
) -> Result<Json<WarrantView>, ApiError>
where
  S: PrisonerStore,
  E: ConfinementEffector,
{
  let id = WarrantId::from(id);
  let subject = holder(&warden, &id).await?;
  let edited = warden.set_enforced(&id, body.enforced).await?;
  settle(&warden, subject).await;
  Ok(Json(reread(&warden, subject, edited).await))
}
