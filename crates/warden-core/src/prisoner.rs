//! Prisoners: the ordered warrant stack held against one subject, plus the
//! bookkeeping needed to undo confinement.
//!
//! Everything here is a pure derivation over in-memory state. Calling the
//! confinement effector and the store is the engine's job; it feeds the
//! outcomes back through [`Prisoner::mark_booked`] and
//! [`Prisoner::mark_released`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  ids::{RoleSet, SubjectId, WarrantId},
  warrant::Warrant,
};

/// Result of [`Prisoner::requires_confinement`] when the stack is non-empty
/// but every warrant is frozen or unenforced.
pub const CONFINE_WHEN_ALL_EXCUSED: bool = false;

/// The aggregate of all open warrants against one subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prisoner {
  pub id:           SubjectId,
  /// Roles held just before confinement was applied. `Some` iff confined.
  pub saved_roles:  Option<RoleSet>,
  /// When confinement was most recently applied.
  pub committed_at: Option<DateTime<Utc>>,
  /// Stacking order is service order.
  pub warrants:     Vec<Warrant>,
}

/// What a call to [`Prisoner::promote`] changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Promotion {
  pub activated: WarrantId,
  /// A running warrant stacked after `activated`, paused to keep a single
  /// countdown.
  pub preempted: Option<WarrantId>,
}

impl Prisoner {
  pub fn new(id: SubjectId) -> Self {
    Self {
      id,
      saved_roles: None,
      committed_at: None,
      warrants: Vec::new(),
    }
  }

  pub fn is_confined(&self) -> bool { self.saved_roles.is_some() }

  pub fn warrant(&self, id: &WarrantId) -> Option<&Warrant> {
    self.warrants.iter().find(|w| &w.id == id)
  }

  pub fn warrant_mut(&mut self, id: &WarrantId) -> Option<&mut Warrant> {
    self.warrants.iter_mut().find(|w| &w.id == id)
  }

  pub fn push_warrant(&mut self, warrant: Warrant) { self.warrants.push(warrant); }

  /// Remove a warrant by id, returning it if present.
  pub fn remove_warrant(&mut self, id: &WarrantId) -> Option<Warrant> {
    let idx = self.warrants.iter().position(|w| &w.id == id)?;
    Some(self.warrants.remove(idx))
  }

  /// Remove every warrant matching `pred`, preserving the order of the rest.
  pub fn remove_warrants_where(
    &mut self,
    mut pred: impl FnMut(&Warrant) -> bool,
  ) -> Vec<Warrant> {
    let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.warrants)
      .into_iter()
      .partition(|w| pred(w));
    self.warrants = kept;
    removed
  }

  /// Drop every warrant whose countdown has elapsed.
  pub fn expire_elapsed(&mut self, now: DateTime<Utc>) -> Vec<Warrant> {
    self.remove_warrants_where(|w| w.has_elapsed(now))
  }

  /// Index of the warrant the promotion rule would start next, if any.
  ///
  /// Scans in stacking order. Frozen and indefinite warrants are stepped
  /// over; the first promotable warrant wins; reaching a running warrant
  /// first means a countdown is already being served and nothing is
  /// promoted.
  pub fn next_to_activate(&self) -> Option<usize> {
    for (idx, warrant) in self.warrants.iter().enumerate() {
      if warrant.is_running() {
        return None;
      }
      if warrant.is_promotable() {
        return Some(idx);
      }
    }
    None
  }

  /// Apply the promotion rule.
  ///
  /// If the promoted warrant is stacked ahead of one that is already running
  /// (possible after a thaw), the later one is paused so at most one
  /// countdown runs.
  pub fn promote(&mut self, now: DateTime<Utc>) -> Option<Promotion> {
    let idx = self.next_to_activate()?;

    let mut preempted = None;
    for later in self.warrants[idx + 1..].iter_mut() {
      if later.is_running() {
        later.deactivate(now);
        preempted = Some(later.id.clone());
      }
    }

    let warrant = &mut self.warrants[idx];
    warrant.activate(now);
    Some(Promotion { activated: warrant.id.clone(), preempted })
  }

  /// Whether the subject must currently be confined.
  ///
  /// An empty stack never requires confinement. Otherwise any enforced
  /// warrant requires it; a stack of only frozen/unenforced warrants yields
  /// [`CONFINE_WHEN_ALL_EXCUSED`].
  pub fn requires_confinement(&self) -> bool {
    if self.warrants.is_empty() {
      return false;
    }
    if self.warrants.iter().any(Warrant::is_enforced) {
      return true;
    }
    CONFINE_WHEN_ALL_EXCUSED
  }

  /// Whether nothing is left to serve or undo.
  pub fn can_archive(&self) -> bool {
    self.warrants.is_empty() && self.saved_roles.is_none()
  }

  /// The warrant currently counting down, if any.
  pub fn running_warrant(&self) -> Option<&Warrant> {
    self.warrants.iter().find(|w| w.is_running())
  }

  /// Record that confinement was applied after capturing `roles`.
  pub fn mark_booked(&mut self, roles: RoleSet, now: DateTime<Utc>) {
    self.saved_roles = Some(roles);
    self.committed_at = Some(now);
  }

  /// Record that the saved roles were restored; returns them.
  pub fn mark_released(&mut self) -> Option<RoleSet> {
    self.committed_at = None;
    self.saved_roles.take()
  }
}
