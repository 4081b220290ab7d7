//! The in-memory set of prisoners with open holds.
//!
//! Each prisoner lives in its own [`Slot`] behind an async mutex; every
//! mutation of a prisoner happens while holding that mutex, which serialises
//! the periodic pass against issuance and administrative edits for the same
//! subject. The map lock itself is only ever held briefly and never while
//! waiting on a slot.

use std::{collections::HashMap, sync::Arc};

use tokio::sync::{Mutex, RwLock};
use warden_core::{ids::SubjectId, prisoner::Prisoner, record::PrisonerRecord};

/// A prisoner plus the engine's bookkeeping for it.
#[derive(Debug)]
pub struct Slot {
  pub prisoner:   Prisoner,
  /// Set once the prisoner has been archived; holders of a stale handle must
  /// go back to the registry.
  pub archived:   bool,
  /// The last record successfully written, used to skip redundant saves.
  pub last_saved: Option<PrisonerRecord>,
}

impl Slot {
  fn new(prisoner: Prisoner) -> Self {
    Self { prisoner, archived: false, last_saved: None }
  }
}

pub type SlotHandle = Arc<Mutex<Slot>>;

/// Mapping from subject id to prisoner slot. At most one slot per subject.
#[derive(Debug, Default)]
pub struct Registry {
  slots: RwLock<HashMap<SubjectId, SlotHandle>>,
}

impl Registry {
  pub fn new() -> Self { Self::default() }

  pub async fn get(&self, subject_id: SubjectId) -> Option<SlotHandle> {
    self.slots.read().await.get(&subject_id).cloned()
  }

  /// Look up the slot for `subject_id`, creating an empty prisoner if absent.
  /// The flag is `true` when a slot was created.
  pub async fn get_or_create(&self, subject_id: SubjectId) -> (SlotHandle, bool) {
    if let Some(handle) = self.get(subject_id).await {
      return (handle, false);
    }
    let mut slots = self.slots.write().await;
    if let Some(handle) = slots.get(&subject_id) {
      return (handle.clone(), false);
    }
    let handle = Arc::new(Mutex::new(Slot::new(Prisoner::new(subject_id))));
    slots.insert(subject_id, handle.clone());
    (handle, true)
  }

  /// Insert a prisoner read from storage. Returns `false`, leaving the
  /// registry unchanged, if the subject is already present.
  pub async fn insert_loaded(&self, prisoner: Prisoner) -> bool {
    let mut slots = self.slots.write().await;
    if slots.contains_key(&prisoner.id) {
      return false;
    }
    slots.insert(prisoner.id, Arc::new(Mutex::new(Slot::new(prisoner))));
    true
  }

  /// Remove `subject_id` only if it still maps to `handle`.
  pub async fn remove_if_same(&self, subject_id: SubjectId, handle: &SlotHandle) -> bool {
    let mut slots = self.slots.write().await;
    match slots.get(&subject_id) {
      Some(current) if Arc::ptr_eq(current, handle) => {
        slots.remove(&subject_id);
        true
      }
      _ => false,
    }
  }

  /// A point-in-time copy of every handle, ordered by subject id.
  ///
  /// Iterating the snapshot tolerates slots being archived mid-iteration.
  pub async fn snapshot(&self) -> Vec<(SubjectId, SlotHandle)> {
    let mut handles: Vec<_> = self
      .slots
      .read()
      .await
      .iter()
      .map(|(id, handle)| (*id, handle.clone()))
      .collect();
    handles.sort_by_key(|(id, _)| *id);
    handles
  }

  pub async fn len(&self) -> usize { self.slots.read().await.len() }

  pub async fn is_empty(&self) -> bool { self.slots.read().await.is_empty() }

  pub async fn contains(&self, subject_id: SubjectId) -> bool {
    self.slots.read().await.contains_key(&subject_id)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn get_or_create_is_idempotent() {
    let registry = Registry::new();
    let (a, created_a) = registry.get_or_create(SubjectId(1)).await;
    let (b, created_b) = registry.get_or_create(SubjectId(1)).await;
    assert!(created_a);
    assert!(!created_b);
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(registry.len().await, 1);
  }

  #[tokio::test]
  async fn remove_ignores_stale_handles() {
    let registry = Registry::new();
    let (stale, _) = registry.get_or_create(SubjectId(1)).await;
    assert!(registry.remove_if_same(SubjectId(1), &stale).await);

    let (fresh, created) = registry.get_or_create(SubjectId(1)).await;
    assert!(created);
    assert!(!registry.remove_if_same(SubjectId(1), &stale).await);
    assert!(registry.contains(SubjectId(1)).await);
    assert!(registry.remove_if_same(SubjectId(1), &fresh).await);
    assert!(registry.is_empty().await);
  }

  #[tokio::test]
  async fn loaded_duplicates_are_rejected() {
    let registry = Registry::new();
    assert!(registry.insert_loaded(Prisoner::new(SubjectId(4))).await);
    assert!(!registry.insert_loaded(Prisoner::new(SubjectId(4))).await);
    assert_eq!(registry.snapshot().await.len(), 1);
  }
}
