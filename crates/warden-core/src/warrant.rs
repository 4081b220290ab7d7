//! Warrants: individual, stackable punitive holds.
//!
//! A warrant is pending until promoted, then either counts down (finite term)
//! or is simply held (indefinite term). Freezing pauses a running countdown
//! and banks the remaining time in the term.

use std::fmt;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  ids::WarrantId,
  term::{MAX_TERM_SECONDS, Term, format_duration_long},
};

// ─── Warrant ─────────────────────────────────────────────────────────────────

/// One punitive hold against a prisoner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warrant {
  pub id:          WarrantId,
  /// Administrative grouping only; has no effect on reconciliation.
  pub category:    String,
  pub description: String,
  pub author_id:   u64,
  pub created_at:  DateTime<Utc>,
  /// Set together with `expires_at` while a finite term is running.
  pub started_at:  Option<DateTime<Utc>>,
  pub expires_at:  Option<DateTime<Utc>>,
  /// The requested term; rewritten to the remaining time on deactivation.
  pub term:        Term,
  pub frozen:      bool,
  /// Excused: still on the stack, but does not require confinement.
  pub unenforced:  bool,
}

/// Input to [`Warrant::new`].
#[derive(Debug, Clone)]
pub struct NewWarrant {
  pub category:    String,
  pub description: String,
  pub author_id:   u64,
  pub term:        Term,
}

impl Warrant {
  /// Create a fresh pending warrant with a new id.
  pub fn new(input: NewWarrant, now: DateTime<Utc>) -> Self {
    Self {
      id:          WarrantId::generate(),
      category:    input.category,
      description: input.description,
      author_id:   input.author_id,
      created_at:  now,
      started_at:  None,
      expires_at:  None,
      term:        input.term,
      frozen:      false,
      unenforced:  false,
    }
  }

  /// Whether a finite countdown is currently running.
  pub fn is_running(&self) -> bool { self.expires_at.is_some() }

  /// Whether the countdown has elapsed. Strict: a warrant expiring exactly at
  /// `now` is still held for this pass.
  pub fn has_elapsed(&self, now: DateTime<Utc>) -> bool {
    self.expires_at.is_some_and(|at| now > at)
  }

  /// Whether the promotion rule may pick this warrant.
  pub fn is_promotable(&self) -> bool {
    !self.is_running() && !self.frozen && !self.term.is_indefinite()
  }

  /// Whether this warrant demands the subject be confined.
  pub fn is_enforced(&self) -> bool { !self.frozen && !self.unenforced }

  /// Start the countdown. Indefinite warrants are never activated; this is a
  /// no-op for them.
  pub fn activate(&mut self, now: DateTime<Utc>) {
    let Term::Finite(seconds) = self.term else {
      return;
    };
    // Terms built directly (not via `Term::finite`) may exceed the cap.
    let expires_at = TimeDelta::try_seconds(seconds.clamp(0, MAX_TERM_SECONDS))
      .and_then(|delta| now.checked_add_signed(delta))
      .unwrap_or(DateTime::<Utc>::MAX_UTC);
    self.started_at = Some(now);
    self.expires_at = Some(expires_at);
  }

  /// Stop a running countdown, banking the remaining time into the term.
  pub fn deactivate(&mut self, now: DateTime<Utc>) {
    if let Some(expires_at) = self.expires_at.take() {
      let remaining = (expires_at - now).num_seconds().clamp(0, MAX_TERM_SECONDS);
      self.term = Term::Finite(remaining);
      self.started_at = None;
    }
  }

  pub fn freeze(&mut self, now: DateTime<Utc>) {
    self.deactivate(now);
    self.frozen = true;
  }

  /// Unfreeze; the banked remainder is served as an ordinary pending term.
  pub fn thaw(&mut self) { self.frozen = false; }

  pub fn status(&self, now: DateTime<Utc>) -> WarrantStatus {
    if let Some(expires_at) = self.expires_at {
      return WarrantStatus::Active {
        remaining: (expires_at - now).num_seconds().max(0),
      };
    }
    match self.term {
      Term::Indefinite if self.frozen => WarrantStatus::FrozenIndefinite,
      Term::Indefinite => WarrantStatus::Indefinite,
      Term::Finite(remaining) if self.frozen => WarrantStatus::Frozen { remaining },
      Term::Finite(length) => WarrantStatus::Pending { length },
    }
  }
}

// ─── Status ──────────────────────────────────────────────────────────────────

/// A derived, display-ready view of where a warrant is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum WarrantStatus {
  Active { remaining: i64 },
  Indefinite,
  Frozen { remaining: i64 },
  FrozenIndefinite,
  Pending { length: i64 },
}

impl fmt::Display for WarrantStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Active { remaining } => {
        write!(f, "active, {} remaining", format_duration_long(*remaining))
      }
      Self::Indefinite => f.write_str("active, indefinite"),
      Self::Frozen { remaining } => {
        write!(f, "frozen, {} remaining", format_duration_long(*remaining))
      }
      Self::FrozenIndefinite => f.write_str("frozen, indefinite"),
      Self::Pending { length } => {
        write!(f, "pending, length {}", format_duration_long(*length))
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  fn t0() -> DateTime<Utc> { Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap() }

  fn warrant(term: Term) -> Warrant {
    Warrant::new(
      NewWarrant {
        category:    "admin".into(),
        description: "spamming".into(),
        author_id:   42,
        term,
      },
      t0(),
    )
  }

  #[test]
  fn new_warrant_is_pending() {
    let w = warrant(Term::Finite(600));
    assert_eq!(w.created_at, t0());
    assert!(w.started_at.is_none() && w.expires_at.is_none());
    assert!(w.is_promotable());
    assert_eq!(w.status(t0()), WarrantStatus::Pending { length: 600 });
  }

  #[test]
  fn activate_sets_both_timestamps() {
    let mut w = warrant(Term::Finite(3_600));
    w.activate(t0());
    assert_eq!(w.started_at, Some(t0()));
    assert_eq!(w.expires_at, Some(t0() + TimeDelta::seconds(3_600)));
    assert_eq!(
      w.status(t0() + TimeDelta::seconds(600)),
      WarrantStatus::Active { remaining: 3_000 }
    );
  }

  #[test]
  fn indefinite_warrant_never_gets_an_expiry() {
    let mut w = warrant(Term::Indefinite);
    w.activate(t0());
    assert!(w.expires_at.is_none());
    assert!(!w.is_promotable());
    assert_eq!(w.status(t0()).to_string(), "active, indefinite");
  }

  #[test]
  fn freeze_banks_remaining_time() {
    let mut w = warrant(Term::Finite(3_600));
    w.activate(t0());
    w.freeze(t0() + TimeDelta::seconds(1_000));

    assert!(w.frozen);
    assert!(w.started_at.is_none() && w.expires_at.is_none());
    assert_eq!(w.term, Term::Finite(2_600));
    assert_eq!(w.status(t0()), WarrantStatus::Frozen { remaining: 2_600 });
    assert!(!w.is_promotable());
    assert!(!w.is_enforced());

    w.thaw();
    assert!(w.is_promotable());
    assert_eq!(w.status(t0()), WarrantStatus::Pending { length: 2_600 });
  }

  #[test]
  fn oversized_term_activates_without_overflow() {
    let mut w = warrant(Term::Finite(i64::MAX));
    w.activate(t0());
    assert_eq!(
      w.expires_at,
      Some(t0() + TimeDelta::seconds(MAX_TERM_SECONDS))
    );
    assert!(!w.has_elapsed(t0() + TimeDelta::days(365)));

    w.deactivate(t0());
    assert_eq!(w.term, Term::Finite(MAX_TERM_SECONDS));
  }

  #[test]
  fn frozen_indefinite_reads_as_frozen() {
    let mut w = warrant(Term::Indefinite);
    w.freeze(t0());
    assert_eq!(w.status(t0()), WarrantStatus::FrozenIndefinite);
    assert_eq!(w.status(t0()).to_string(), "frozen, indefinite");
    assert!(!w.is_enforced());

    w.thaw();
    assert_eq!(w.status(t0()), WarrantStatus::Indefinite);
  }

  #[test]
  fn deactivate_after_expiry_clamps_to_zero() {
    let mut w = warrant(Term::Finite(10));
    w.activate(t0());
    w.deactivate(t0() + TimeDelta::seconds(60));
    assert_eq!(w.term, Term::Finite(0));
  }

  #[test]
  fn elapsed_is_strict() {
    let mut w = warrant(Term::Finite(0));
    w.activate(t0());
    assert!(!w.has_elapsed(t0()));
    assert!(w.has_elapsed(t0() + TimeDelta::seconds(1)));
  }

  #[test]
  fn status_text() {
    assert_eq!(
      WarrantStatus::Active { remaining: 90 }.to_string(),
      "active, 1 minute, 30 seconds remaining"
    );
    assert_eq!(
      WarrantStatus::Pending { length: 7_200 }.to_string(),
      "pending, length 2 hours, 0 minutes, 0 seconds"
    );
    assert_eq!(
      WarrantStatus::Frozen { remaining: 5 }.to_string(),
      "frozen, 5 seconds remaining"
    );
  }
}
