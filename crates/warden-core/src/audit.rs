//! Audit events: a one-way record of everything the warden does.
//!
//! Sinks are fire-and-forget and never consulted for decisions.

use serde::Serialize;

use crate::ids::{SubjectId, WarrantId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AuditEvent {
  PrisonerCreated { subject: SubjectId },
  WarrantIssued { subject: SubjectId, warrant: WarrantId, category: String },
  WarrantActivated { subject: SubjectId, warrant: WarrantId },
  /// A running warrant paused so an earlier-stacked one could run.
  WarrantPreempted { subject: SubjectId, warrant: WarrantId },
  WarrantExpired { subject: SubjectId, warrant: WarrantId },
  WarrantVoided { subject: SubjectId, warrant: WarrantId },
  WarrantFrozen { subject: SubjectId, warrant: WarrantId },
  WarrantThawed { subject: SubjectId, warrant: WarrantId },
  EnforcementChanged { subject: SubjectId, warrant: WarrantId, enforced: bool },
  PrisonerBooked { subject: SubjectId },
  PrisonerReleased { subject: SubjectId },
  PrisonerArchived { subject: SubjectId },
}

impl AuditEvent {
  pub fn subject(&self) -> SubjectId {
    match self {
      Self::PrisonerCreated { subject }
      | Self::WarrantIssued { subject, .. }
      | Self::WarrantActivated { subject, .. }
      | Self::WarrantPreempted { subject, .. }
      | Self::WarrantExpired { subject, .. }
      | Self::WarrantVoided { subject, .. }
      | Self::WarrantFrozen { subject, .. }
      | Self::WarrantThawed { subject, .. }
      | Self::EnforcementChanged { subject, .. }
      | Self::PrisonerBooked { subject }
      | Self::PrisonerReleased { subject }
      | Self::PrisonerArchived { subject } => *subject,
    }
  }

  /// Short machine name, matching the serialised `event` tag.
  pub fn kind(&self) -> &'static str {
    match self {
      Self::PrisonerCreated { .. } => "prisoner_created",
      Self::WarrantIssued { .. } => "warrant_issued",
      Self::WarrantActivated { .. } => "warrant_activated",
      Self::WarrantPreempted { .. } => "warrant_preempted",
      Self::WarrantExpired { .. } => "warrant_expired",
      Self::WarrantVoided { .. } => "warrant_voided",
      Self::WarrantFrozen { .. } => "warrant_frozen",
      Self::WarrantThawed { .. } => "warrant_thawed",
      Self::EnforcementChanged { .. } => "enforcement_changed",
      Self::PrisonerBooked { .. } => "prisoner_booked",
      Self::PrisonerReleased { .. } => "prisoner_released",
      Self::PrisonerArchived { .. } => "prisoner_archived",
    }
  }
}

/// Receives audit events.
pub trait AuditSink: Send + Sync {
  fn record(&self, event: &AuditEvent);
}

/// Emits each event as a structured `tracing` event under `warden::audit`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAudit;

impl AuditSink for TracingAudit {
  fn record(&self, event: &AuditEvent) {
    let detail = serde_json::to_string(event).unwrap_or_default();
    tracing::info!(
      target: "warden::audit",
      event = event.kind(),
      subject = %event.subject(),
      %detail,
      "audit event"
    );
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn kind_matches_serialised_tag() {
    let event = AuditEvent::EnforcementChanged {
      subject:  SubjectId(1),
      warrant:  WarrantId::from("w"),
      enforced: false,
    };
    let json = serde_json::to_value(&event).unwrap();
    assert_eq!(json["event"], event.kind());
    assert_eq!(json["subject"], 1);
  }
}
