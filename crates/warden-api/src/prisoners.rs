//! Handlers for `/prisoners` and `/reconcile`.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/prisoners` | Every registered prisoner |
//! | `GET`  | `/prisoners/:subject_id` | 404 if not registered |
//! | `POST` | `/reconcile` | Run a full pass now |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
};
use chrono::Utc;
use serde::Serialize;
use warden_core::{effector::ConfinementEffector, ids::SubjectId, store::PrisonerStore};
use warden_engine::Warden;

use crate::{error::ApiError, view::PrisonerView};

/// `GET /prisoners`
pub async fn list<S, E>(State(warden): State<Arc<Warden<S, E>>>) -> Json<Vec<PrisonerView>>
where
  S: PrisonerStore,
  E: ConfinementEffector,
{
  let now = Utc::now();
  Json(
    warden
      .prisoners()
      .await
      .into_iter()
      .map(|p| PrisonerView::new(p, now))
      .collect(),
  )
}

/// `GET /prisoners/:subject_id`
pub async fn get_one<S, E>(
  State(warden): State<Arc<Warden<S, E>>>,
  Path(subject_id): Path<u64>,
) -> Result<Json<PrisonerView>, ApiError>
where
  S: PrisonerStore,
  E: ConfinementEffector,
{
  let prisoner = warden
    .prisoner_by_subject_id(SubjectId(subject_id))
    .await
    .ok_or_else(|| ApiError::NotFound(format!("prisoner {subject_id} not found")))?;
  Ok(Json(PrisonerView::new(prisoner, Utc::now())))
}

#[derive(Debug, Serialize)]
pub struct PassSummary {
  pub reconciled: usize,
  pub archived:   usize,
  pub deferred:   usize,
  pub failed:     Vec<SubjectId>,
}

/// `POST /reconcile`
pub async fn reconcile_all<S, E>(State(warden): State<Arc<Warden<S, E>>>) -> Json<PassSummary>
where
  S: PrisonerStore,
  E: ConfinementEffector,
{
  let report = warden.periodic_tick(Utc::now()).await;
  Json(PassSummary {
    reconciled: report.reconciled,
    archived:   report.archived,
    deferred:   report.deferred,
    failed:     report.failures.iter().map(|(s, _)| *s).collect(),
  })
}
