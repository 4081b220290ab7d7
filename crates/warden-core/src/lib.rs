//! Core types and trait definitions for the warden.
//!
//! This crate holds the warrant/prisoner state machine and nothing that does
//! I/O. Every derivation here is synchronous and side-effect free; the
//! suspension points (persistence, confinement effects) are expressed as
//! traits implemented elsewhere.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod audit;
pub mod effector;
pub mod error;
pub mod ids;
pub mod prisoner;
pub mod record;
pub mod store;
pub mod term;
pub mod warrant;

pub use error::{Error, Result};
