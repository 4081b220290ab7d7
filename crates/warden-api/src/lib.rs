//! JSON REST API for the warden.
//!
//! Exposes an axum [`Router`] over a shared [`Warden`]. This is the surface a
//! chat-platform command layer talks to. Authentication is left to the
//! host router.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", warden_api::api_router(warden.clone()))
//! ```

pub mod error;
pub mod prisoners;
pub mod view;
pub mod warrants;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use warden_core::{effector::ConfinementEffector, store::PrisonerStore};
use warden_engine::Warden;

pub use error::ApiError;

/// Build the API router for `warden`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S, E>(warden: Arc<Warden<S, E>>) -> Router<()>
where
  S: PrisonerStore + 'static,
  E: ConfinementEffector + 'static,
{
  Router::new()
    // Warrants
    .route("/warrants", post(warrants::issue::<S, E>))
    .route("/warrants/void", post(warrants::void_matching::<S, E>))
    .route(
      "/warrants/{id}",
      get(warrants::get_one::<S, E>).delete(warrants::void_one::<S, E>),
    )
    .route("/warrants/{id}/freeze", post(warrants::freeze::<S, E>))
    .route("/warrants/{id}/thaw", post(warrants::thaw::<S, E>))
    .route("/warrants/{id}/enforcement", post(warrants::enforcement::<S, E>))
    // Prisoners
    .route("/prisoners", get(prisoners::list::<S, E>))
    .route("/prisoners/{subject_id}", get(prisoners::get_one::<S, E>))
    .route("/reconcile", post(prisoners::reconcile_all::<S, E>))
    .with_state(warden)
}

#[cfg(test)]
mod tests;
