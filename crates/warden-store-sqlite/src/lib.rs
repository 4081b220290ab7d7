//! SQLite backend for the warden.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Provides both the prisoner store and
//! a [`RoleLedger`] that records member role sets and acts as the
//! confinement effector.

mod encode;
mod ledger;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use ledger::RoleLedger;
pub use store::SqliteStore;
