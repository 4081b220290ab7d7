//! [`Warden`]: the registry owner and reconciliation driver.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use warden_core::{
  audit::{AuditEvent, AuditSink, TracingAudit},
  effector::ConfinementEffector,
  ids::{SubjectId, WarrantId},
  prisoner::Prisoner,
  record::PrisonerRecord,
  store::PrisonerStore,
  warrant::{NewWarrant, Warrant},
};

use crate::{
  Error, Result,
  registry::{Registry, Slot, SlotHandle},
};

// ─── Outcomes ────────────────────────────────────────────────────────────────

/// What one reconciliation step did to a prisoner.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepOutcome {
  pub expired:   Vec<WarrantId>,
  pub activated: Option<WarrantId>,
  pub booked:    bool,
  pub released:  bool,
  /// An effector call failed; the prisoner is left as-is until next pass.
  pub deferred:  bool,
  pub saved:     bool,
  pub archived:  bool,
}

/// Summary of one [`Warden::periodic_tick`].
#[derive(Debug, Default)]
pub struct TickReport {
  pub reconciled: usize,
  pub archived:   usize,
  pub deferred:   usize,
  /// Per-prisoner failures; they never stop the rest of the pass.
  pub failures:   Vec<(SubjectId, Error)>,
}

impl TickReport {
  pub fn is_clean(&self) -> bool { self.failures.is_empty() && self.deferred == 0 }
}

/// What [`Warden::issue_warrant_at`] produced.
#[derive(Debug)]
pub struct Issuance {
  /// The new warrant after reconciliation.
  pub warrant:       Warrant,
  /// The post-issuance write failed. The warrant is live in memory regardless.
  pub persist_error: Option<Error>,
}

/// Criteria for [`Warden::void_warrants`]. Set criteria are combined with
/// AND; at least one must be set.
#[derive(Debug, Clone, Default)]
pub struct VoidFilter {
  pub category:  Option<String>,
  pub author_id: Option<u64>,
  pub subject:   Option<SubjectId>,
}

impl VoidFilter {
  fn is_empty(&self) -> bool {
    self.category.is_none() && self.author_id.is_none() && self.subject.is_none()
  }

  fn matches(&self, subject: SubjectId, warrant: &Warrant) -> bool {
    self.category.as_ref().is_none_or(|c| &warrant.category == c)
      && self.author_id.is_none_or(|a| warrant.author_id == a)
      && self.subject.is_none_or(|s| subject == s)
  }
}

// ─── Warden ──────────────────────────────────────────────────────────────────

/// Owns the prisoner registry and drives reconciliation against a store and
/// a confinement effector.
pub struct Warden<S, E> {
  store:    S,
  effector: E,
  audit:    Arc<dyn AuditSink>,
  registry: Registry,
}

impl<S, E> Warden<S, E>
where
  S: PrisonerStore,
  E: ConfinementEffector,
{
  /// Build a warden with an empty registry that audits through `tracing`.
  pub fn new(store: S, effector: E) -> Self {
    Self {
      store,
      effector,
      audit: Arc::new(TracingAudit),
      registry: Registry::new(),
    }
  }

  pub fn with_audit(mut self, audit: Arc<dyn AuditSink>) -> Self {
    self.audit = audit;
    self
  }

  pub fn store(&self) -> &S { &self.store }

  pub fn effector(&self) -> &E { &self.effector }

  pub fn registry(&self) -> &Registry { &self.registry }

  // ── Startup ───────────────────────────────────────────────────────────────

  /// Populate the registry from the store. Does not reconcile; run a pass
  /// straight afterwards.
  pub async fn load(&self) -> Result<usize> {
    let records = self.store.load_all().await.map_err(Error::store)?;
    let mut loaded = 0;
    for record in records {
      let subject = record.subject_id;
      if self.registry.insert_loaded(Prisoner::from(record)).await {
        loaded += 1;
      } else {
        warn!(%subject, "duplicate prisoner record ignored");
      }
    }
    info!(loaded, "loaded prisoners");
    Ok(loaded)
  }

  // ── Issuance ──────────────────────────────────────────────────────────────

  /// Issue a warrant against `subject` now. See [`Warden::issue_warrant_at`].
  pub async fn issue_warrant(&self, subject: SubjectId, input: NewWarrant) -> Issuance {
    self.issue_warrant_at(subject, input, Utc::now()).await
  }

  /// Append a new warrant to `subject`'s stack (creating the prisoner if
  /// needed) and reconcile that prisoner before returning.
  ///
  /// The returned warrant reflects the post-reconciliation state. Issuance
  /// itself cannot fail: on a store failure the warrant stays registered in
  /// memory, the failure is reported in [`Issuance::persist_error`], and the
  /// next pass persists it.
  pub async fn issue_warrant_at(
    &self,
    subject: SubjectId,
    input: NewWarrant,
    now: DateTime<Utc>,
  ) -> Issuance {
    let warrant = Warrant::new(input, now);

    loop {
      let (handle, created) = self.registry.get_or_create(subject).await;
      let mut slot = handle.lock().await;
      if slot.archived {
        // Archived between lookup and lock; fetch a fresh slot.
        continue;
      }

      if created {
        self.emit(AuditEvent::PrisonerCreated { subject });
      }
      slot.prisoner.push_warrant(warrant.clone());
      self.emit(AuditEvent::WarrantIssued {
        subject,
        warrant: warrant.id.clone(),
        category: warrant.category.clone(),
      });

      let persist_error = self.reconcile_locked(&handle, &mut slot, now).await.err();
      if let Some(e) = &persist_error {
        warn!(%subject, error = %e, "issued warrant not yet persisted; next pass will retry");
      }

      let warrant = slot
        .prisoner
        .warrant(&warrant.id)
        .cloned()
        .unwrap_or(warrant);
      return Issuance { warrant, persist_error };
    }
  }

  // ── Administrative edits ──────────────────────────────────────────────────
  //
  // None of these reconcile. Callers trigger a pass (or wait for the next
  // periodic one) to realise promotion or release.

  /// Remove the warrant with `id` from whichever prisoner holds it.
  pub async fn void_warrant_by_id(&self, id: &WarrantId) -> Result<Warrant> {
    self
      .edit_warrant(id, |slot, subject| {
        let warrant = slot.prisoner.remove_warrant(id)?;
        Some((warrant, AuditEvent::WarrantVoided { subject, warrant: id.clone() }))
      })
      .await
  }

  /// Void every warrant matching `filter`, across all prisoners.
  pub async fn void_warrants(
    &self,
    filter: &VoidFilter,
  ) -> Result<Vec<(SubjectId, Warrant)>> {
    if filter.is_empty() {
      return Err(Error::EmptyFilter);
    }

    let mut voided = Vec::new();
    for (subject, handle) in self.registry.snapshot().await {
      if filter.subject.is_some_and(|s| s != subject) {
        continue;
      }
      let mut slot = handle.lock().await;
      if slot.archived {
        continue;
      }
      for warrant in slot
        .prisoner
        .remove_warrants_where(|w| filter.matches(subject, w))
      {
        self.emit(AuditEvent::WarrantVoided { subject, warrant: warrant.id.clone() });
        voided.push((subject, warrant));
      }
    }
    Ok(voided)
  }

  /// Pause a warrant, banking any running countdown.
  pub async fn freeze_warrant(
    &self,
    id: &WarrantId,
    now: DateTime<Utc>,
  ) -> Result<Warrant> {
    self
      .edit_warrant(id, |slot, subject| {
        let warrant = slot.prisoner.warrant_mut(id)?;
        warrant.freeze(now);
        Some((
          warrant.clone(),
          AuditEvent::WarrantFrozen { subject, warrant: id.clone() },
        ))
      })
      .await
  }

  pub async fn thaw_warrant(&self, id: &WarrantId) -> Result<Warrant> {
    self
      .edit_warrant(id, |slot, subject| {
        let warrant = slot.prisoner.warrant_mut(id)?;
        warrant.thaw();
        Some((
          warrant.clone(),
          AuditEvent::WarrantThawed { subject, warrant: id.clone() },
        ))
      })
      .await
  }

  /// Excuse (`enforced = false`) or re-impose a warrant without voiding it.
  pub async fn set_enforced(&self, id: &WarrantId, enforced: bool) -> Result<Warrant> {
    self
      .edit_warrant(id, |slot, subject| {
        let warrant = slot.prisoner.warrant_mut(id)?;
        warrant.unenforced = !enforced;
        Some((
          warrant.clone(),
          AuditEvent::EnforcementChanged { subject, warrant: id.clone(), enforced },
        ))
      })
      .await
  }

  async fn edit_warrant<F>(&self, id: &WarrantId, mut edit: F) -> Result<Warrant>
  where
    F: FnMut(&mut Slot, SubjectId) -> Option<(Warrant, AuditEvent)>,
  {
    for (subject, handle) in self.registry.snapshot().await {
      let mut slot = handle.lock().await;
      if slot.archived {
        continue;
      }
      if let Some((warrant, event)) = edit(&mut *slot, subject) {
        self.emit(event);
        return Ok(warrant);
      }
    }
    Err(Error::WarrantNotFound(id.clone()))
  }

  // ── Lookups ───────────────────────────────────────────────────────────────

  pub async fn warrant_by_id(&self, id: &WarrantId) -> Option<Warrant> {
    self
      .prisoner_by_warrant_id(id)
      .await
      .and_then(|p| p.warrant(id).cloned())
  }

  /// A snapshot of the prisoner holding warrant `id`.
  pub async fn prisoner_by_warrant_id(&self, id: &WarrantId) -> Option<Prisoner> {
    for (_, handle) in self.registry.snapshot().await {
      let slot = handle.lock().await;
      if !slot.archived && slot.prisoner.warrant(id).is_some() {
        return Some(slot.prisoner.clone());
      }
    }
    None
  }

  /// A snapshot of the prisoner for `subject`.
  pub async fn prisoner_by_subject_id(&self, subject: SubjectId) -> Option<Prisoner> {
    let handle = self.registry.get(subject).await?;
    let slot = handle.lock().await;
    (!slot.archived).then(|| slot.prisoner.clone())
  }

  /// Snapshots of every registered prisoner, ordered by subject id.
  pub async fn prisoners(&self) -> Vec<Prisoner> {
    let mut out = Vec::new();
    for (_, handle) in self.registry.snapshot().await {
      let slot = handle.lock().await;
      if !slot.archived {
        out.push(slot.prisoner.clone());
      }
    }
    out
  }

  // ── Reconciliation ────────────────────────────────────────────────────────

  /// Run one reconciliation step for a single prisoner.
  pub async fn reconcile_subject(
    &self,
    subject: SubjectId,
    now: DateTime<Utc>,
  ) -> Result<StepOutcome> {
    let handle = self
      .registry
      .get(subject)
      .await
      .ok_or(Error::SubjectNotFound(subject))?;
    let mut slot = handle.lock().await;
    if slot.archived {
      return Err(Error::SubjectNotFound(subject));
    }
    self.reconcile_locked(&handle, &mut slot, now).await
  }

  /// Reconcile every prisoner, one at a time.
  pub async fn periodic_tick(&self, now: DateTime<Utc>) -> TickReport {
    let mut report = TickReport::default();

    for (subject, handle) in self.registry.snapshot().await {
      let mut slot = handle.lock().await;
      if slot.archived {
        continue;
      }
      match self.reconcile_locked(&handle, &mut slot, now).await {
        Ok(outcome) => {
          report.reconciled += 1;
          if outcome.archived {
            report.archived += 1;
          }
          if outcome.deferred {
            report.deferred += 1;
          }
        }
        Err(e) => {
          warn!(%subject, error = %e, "reconciliation failed");
          report.failures.push((subject, e));
        }
      }
    }

    report
  }

  /// The reconciliation step proper. The caller holds the slot lock.
  ///
  /// Order matters: expiry frees the running slot before promotion, and
  /// booking/release settles before the archive check.
  async fn reconcile_locked(
    &self,
    handle: &SlotHandle,
    slot: &mut Slot,
    now: DateTime<Utc>,
  ) -> Result<StepOutcome> {
    let subject = slot.prisoner.id;
    let mut outcome = StepOutcome::default();

    for warrant in slot.prisoner.expire_elapsed(now) {
      self.emit(AuditEvent::WarrantExpired { subject, warrant: warrant.id.clone() });
      outcome.expired.push(warrant.id);
    }

    if let Some(promotion) = slot.prisoner.promote(now) {
      if let Some(preempted) = promotion.preempted {
        self.emit(AuditEvent::WarrantPreempted { subject, warrant: preempted });
      }
      self.emit(AuditEvent::WarrantActivated {
        subject,
        warrant: promotion.activated.clone(),
      });
      outcome.activated = Some(promotion.activated);
    }

    if slot.prisoner.requires_confinement() {
      self.book(&mut slot.prisoner, now, &mut outcome).await;
    } else {
      self.release(&mut slot.prisoner, &mut outcome).await;
    }

    if slot.prisoner.can_archive() {
      self.store.delete(subject).await.map_err(Error::store)?;
      slot.archived = true;
      self.registry.remove_if_same(subject, handle).await;
      self.emit(AuditEvent::PrisonerArchived { subject });
      outcome.archived = true;
    } else {
      let record = PrisonerRecord::from(&slot.prisoner);
      if slot.last_saved.as_ref() != Some(&record) {
        self.store.save(&record).await.map_err(Error::store)?;
        slot.last_saved = Some(record);
        outcome.saved = true;
      }
    }

    debug!(%subject, ?outcome, "reconciled prisoner");
    Ok(outcome)
  }

  /// Capture the subject's roles and apply confinement. No-op if already
  /// booked, so the true pre-confinement roles are never overwritten.
  async fn book(
    &self,
    prisoner: &mut Prisoner,
    now: DateTime<Utc>,
    outcome: &mut StepOutcome,
  ) {
    if prisoner.is_confined() {
      return;
    }
    let subject = prisoner.id;

    let roles = match self.effector.current_roles(subject).await {
      Ok(roles) => roles,
      Err(e) => {
        warn!(%subject, error = %e, "could not read roles; booking deferred");
        outcome.deferred = true;
        return;
      }
    };

    // Only record the booking once the effect has actually landed.
    if let Err(e) = self.effector.apply_confinement(subject).await {
      warn!(%subject, error = %e, "could not apply confinement; booking deferred");
      outcome.deferred = true;
      return;
    }

    prisoner.mark_booked(roles, now);
    self.emit(AuditEvent::PrisonerBooked { subject });
    outcome.booked = true;
  }

  /// Restore the saved roles. No-op if not booked.
  async fn release(&self, prisoner: &mut Prisoner, outcome: &mut StepOutcome) {
    let subject = prisoner.id;
    let Some(roles) = prisoner.saved_roles.as_ref() else {
      return;
    };

    if let Err(e) = self.effector.restore_roles(subject, roles).await {
      warn!(%subject, error = %e, "could not restore roles; release deferred");
      outcome.deferred = true;
      return;
    }

    prisoner.mark_released();
    self.emit(AuditEvent::PrisonerReleased { subject });
    outcome.released = true;
  }

  fn emit(&self, event: AuditEvent) { self.audit.record(&event); }
}
