//! The warden's reconciliation engine.
//!
//! [`Warden`] owns the in-memory [`Registry`] of prisoners and drives each
//! one toward the state its warrant stack demands: expiring elapsed
//! warrants, promoting the next pending one, booking or releasing the
//! subject, and persisting or archiving the result.
//!
//! The host process owns the warden and the schedule; see
//! [`scheduler::run_scheduler`].

pub mod error;
pub mod registry;
pub mod scheduler;
pub mod warden;

pub use error::{Error, Result};
pub use registry::Registry;
pub use warden::{Issuance, StepOutcome, TickReport, VoidFilter, Warden};
