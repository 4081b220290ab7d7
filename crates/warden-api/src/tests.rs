use std::sync::Arc;

use axum::{
  body::Body,
  http::{Request, StatusCode, header},
};
use serde_json::{Value, json};
use tower::ServiceExt as _;
use warden_core::{
  effector::ConfinementEffector,
  ids::{RoleId, SubjectId},
  record::PrisonerRecord,
  store::PrisonerStore,
};
use warden_engine::Warden;
use warden_store_sqlite::{RoleLedger, SqliteStore};

use crate::api_router;

const PRISON_ROLE: RoleId = RoleId(999);

type TestWarden = Arc<Warden<SqliteStore, RoleLedger>>;

async fn make_warden() -> TestWarden {
  let store  = SqliteStore::open_in_memory().await.unwrap();
  let ledger = store.role_ledger(PRISON_ROLE);
  ledger
    .set_member_roles(SubjectId(7), &[RoleId(1), RoleId(2)])
    .await
    .unwrap();
  Arc::new(Warden::new(store, ledger))
}

async fn call<S, E>(
  warden: &Arc<Warden<S, E>>,
  method: &str,
  uri: &str,
  body: Option<Value>,
) -> (StatusCode, Value)
where
  S: PrisonerStore + 'static,
  E: ConfinementEffector + 'static,
{
  let mut builder = Request::builder().method(method).uri(uri);
  let body = match body {
    Some(v) => {
      builder = builder.header(header::CONTENT_TYPE, "application/json");
      Body::from(v.to_string())
    }
    None => Body::empty(),
  };
  let resp   = api_router(warden.clone()).oneshot(builder.body(body).unwrap()).await.unwrap();
  let status = resp.status();
  let bytes  = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  let value  = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
  (status, value)
}

async fn issue(warden: &TestWarden, subject: u64, duration: &str) -> Value {
  let (status, body) = call(
    warden,
    "POST",
    "/warrants",
    Some(json!({
      "subject_id":  subject,
      "category":    "mute",
      "description": "spam",
      "author_id":   42,
      "duration":    duration,
    })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED, "issue failed: {body}");
  body
}

async fn roles_of<S: PrisonerStore>(
  warden: &Arc<Warden<S, RoleLedger>>,
  subject: u64,
) -> Option<Vec<RoleId>> {
  warden.effector().member_roles(SubjectId(subject)).await.unwrap()
}

/// A store whose writes always fail.
struct DownStore;

#[derive(Debug, thiserror::Error)]
#[error("store unavailable")]
struct StoreDown;

impl PrisonerStore for DownStore {
  type Error = StoreDown;

  async fn save(&self, _: &PrisonerRecord) -> Result<(), StoreDown> { Err(StoreDown) }

  async fn delete(&self, _: SubjectId) -> Result<(), StoreDown> { Err(StoreDown) }

  async fn load_all(&self) -> Result<Vec<PrisonerRecord>, StoreDown> { Ok(Vec::new()) }
}

// ── Issue ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn issue_books_the_subject() {
  let warden = make_warden().await;
  let body   = issue(&warden, 7, "1h").await;

  assert_eq!(body["subject_id"], 7);
  assert_eq!(body["status"]["state"], "active");
  assert_eq!(body["category"], "mute");
  assert_eq!(roles_of(&warden, 7).await, Some(vec![PRISON_ROLE]));

  let (status, prisoner) = call(&warden, "GET", "/prisoners/7", None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(prisoner["confined"], true);
  assert_eq!(prisoner["saved_roles"], json!([1, 2]));
}

#[tokio::test]
async fn issue_with_bad_duration_is_400() {
  let warden = make_warden().await;
  let (status, body) = call(
    &warden,
    "POST",
    "/warrants",
    Some(json!({ "subject_id": 7, "author_id": 1, "duration": "soon" })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert!(body["error"].is_string());
  assert!(warden.prisoner_by_subject_id(SubjectId(7)).await.is_none());
}

#[tokio::test]
async fn issue_with_oversized_duration_is_400() {
  let warden = make_warden().await;
  let (status, _) = call(
    &warden,
    "POST",
    "/warrants",
    Some(json!({ "subject_id": 7, "author_id": 1, "duration": "300000000d" })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert!(warden.prisoner_by_subject_id(SubjectId(7)).await.is_none());
}

#[tokio::test]
async fn issue_succeeds_while_store_is_down() {
  let roles  = SqliteStore::open_in_memory().await.unwrap();
  let ledger = roles.role_ledger(PRISON_ROLE);
  ledger
    .set_member_roles(SubjectId(7), &[RoleId(1)])
    .await
    .unwrap();
  let warden = Arc::new(Warden::new(DownStore, ledger));

  let (status, body) = call(
    &warden,
    "POST",
    "/warrants",
    Some(json!({ "subject_id": 7, "author_id": 1, "duration": "1h" })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(body["status"]["state"], "active");

  let prisoner = warden.prisoner_by_subject_id(SubjectId(7)).await.unwrap();
  assert_eq!(prisoner.warrants.len(), 1);
  assert_eq!(roles_of(&warden, 7).await, Some(vec![PRISON_ROLE]));
}

#[tokio::test]
async fn indefinite_warrant_reports_indefinite() {
  let warden = make_warden().await;
  let body   = issue(&warden, 7, "indefinite").await;
  assert_eq!(body["status"]["state"], "indefinite");
  assert_eq!(body["status_text"], "active, indefinite");
}

// ── Lookup ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn get_unknown_warrant_is_404() {
  let warden = make_warden().await;
  let (status, _) = call(&warden, "GET", "/warrants/nope", None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn get_warrant_by_id() {
  let warden = make_warden().await;
  let issued = issue(&warden, 7, "2h").await;
  let id     = issued["id"].as_str().unwrap();

  let (status, body) = call(&warden, "GET", &format!("/warrants/{id}"), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["id"], id);
  assert_eq!(body["subject_id"], 7);
}

#[tokio::test]
async fn unknown_prisoner_is_404() {
  let warden = make_warden().await;
  let (status, _) = call(&warden, "GET", "/prisoners/123", None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn list_prisoners() {
  let warden = make_warden().await;
  issue(&warden, 7, "1h").await;
  issue(&warden, 8, "1h").await;

  let (status, body) = call(&warden, "GET", "/prisoners", None).await;
  assert_eq!(status, StatusCode::OK);
  let ids: Vec<u64> = body
    .as_array()
    .unwrap()
    .iter()
    .map(|p| p["subject_id"].as_u64().unwrap())
    .collect();
  assert_eq!(ids, vec![7, 8]);
}

// ── Void ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn voiding_last_warrant_releases_and_archives() {
  let warden = make_warden().await;
  let issued = issue(&warden, 7, "1h").await;
  let id     = issued["id"].as_str().unwrap();

  let (status, _) = call(&warden, "DELETE", &format!("/warrants/{id}"), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(roles_of(&warden, 7).await, Some(vec![RoleId(1), RoleId(2)]));

  let (status, _) = call(&warden, "GET", "/prisoners/7", None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  let (status, _) = call(&warden, "DELETE", &format!("/warrants/{id}"), None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn bulk_void_requires_a_filter() {
  let warden = make_warden().await;
  issue(&warden, 7, "1h").await;

  let (status, _) = call(&warden, "POST", "/warrants/void", Some(json!({}))).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert!(warden.prisoner_by_subject_id(SubjectId(7)).await.is_some());
}

#[tokio::test]
async fn bulk_void_by_category() {
  let warden = make_warden().await;
  issue(&warden, 7, "1h").await;

  let (status, body) = call(
    &warden,
    "POST",
    "/warrants/void",
    Some(json!({ "category": "mute" })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body.as_array().unwrap().len(), 1);
  assert_eq!(roles_of(&warden, 7).await, Some(vec![RoleId(1), RoleId(2)]));
  assert!(warden.prisoner_by_subject_id(SubjectId(7)).await.is_none());
}

// ── Freeze / thaw / enforcement ─────────────────────────────────────────────

#[tokio::test]
async fn freeze_releases_but_keeps_prisoner() {
  let warden = make_warden().await;
  let issued = issue(&warden, 7, "1h").await;
  let id     = issued["id"].as_str().unwrap();

  let (status, body) = call(&warden, "POST", &format!("/warrants/{id}/freeze"), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["status"]["state"], "frozen");
  assert_eq!(roles_of(&warden, 7).await, Some(vec![RoleId(1), RoleId(2)]));

  let (_, prisoner) = call(&warden, "GET", "/prisoners/7", None).await;
  assert_eq!(prisoner["confined"], false);

  let (status, body) = call(&warden, "POST", &format!("/warrants/{id}/thaw"), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["status"]["state"], "active");
  assert_eq!(roles_of(&warden, 7).await, Some(vec![PRISON_ROLE]));
}

#[tokio::test]
async fn unenforced_warrant_releases() {
  let warden = make_warden().await;
  let issued = issue(&warden, 7, "1h").await;
  let id     = issued["id"].as_str().unwrap();

  let (status, body) = call(
    &warden,
    "POST",
    &format!("/warrants/{id}/enforcement"),
    Some(json!({ "enforced": false })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["unenforced"], true);
  assert_eq!(roles_of(&warden, 7).await, Some(vec![RoleId(1), RoleId(2)]));
}

// ── Reconcile ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn reconcile_reports_deferred_for_absent_member() {
  let warden = make_warden().await;
  // Subject 9 has no ledger row, so booking is deferred.
  issue(&warden, 9, "1h").await;

  let (status, body) = call(&warden, "POST", "/reconcile", None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["reconciled"], 1);
  assert_eq!(body["deferred"], 1);
  assert_eq!(body["failed"], json!([]));
}
