//! HTTP host for the warden.
//!
//! Mounts the [`warden_api`] router and the member ledger endpoints under
//! `/api`, behind HTTP Basic auth, with request tracing.

pub mod auth;
pub mod error;
pub mod members;

pub use error::Error;

use std::{path::PathBuf, sync::Arc, time::Duration};

use axum::{Router, middleware, routing::get};
use serde::Deserialize;
use tower_http::trace::TraceLayer;
use warden_engine::{Warden, scheduler::DEFAULT_TICK_INTERVAL};
use warden_store_sqlite::{RoleLedger, SqliteStore};

use auth::{AuthConfig, require_auth};

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `WARDEN_*` environment variables.
#[derive(Deserialize, Clone)]
pub struct ServerConfig {
  pub host:               String,
  pub port:               u16,
  pub store_path:         PathBuf,
  /// The marker role applied to confined members.
  pub prison_role:        u64,
  #[serde(default = "default_tick_interval_secs")]
  pub tick_interval_secs: u64,
  pub auth_username:      String,
  pub auth_password_hash: String,
}

fn default_tick_interval_secs() -> u64 { DEFAULT_TICK_INTERVAL.as_secs() }

impl ServerConfig {
  /// The reconciliation period. Never zero.
  pub fn tick_interval(&self) -> Duration {
    Duration::from_secs(self.tick_interval_secs.max(1))
  }
}

// ─── Application state ────────────────────────────────────────────────────────

pub type SqliteWarden = Warden<SqliteStore, RoleLedger>;

/// Everything the router needs.
#[derive(Clone)]
pub struct AppState {
  pub warden: Arc<SqliteWarden>,
  pub ledger: RoleLedger,
  pub auth:   Arc<AuthConfig>,
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the full application router.
pub fn router(state: AppState) -> Router {
  let members = Router::new()
    .route(
      "/members/{subject_id}",
      get(members::get_one).put(members::put).delete(members::delete),
    )
    .with_state(state.ledger);

  let api = warden_api::api_router(state.warden).merge(members);

  Router::new()
    .nest("/api", api)
    .layer(middleware::from_fn_with_state(state.auth, require_auth))
    .layer(TraceLayer::new_for_http())
}

// ─── Integration tests ────────────────────────────────────────────────────────
