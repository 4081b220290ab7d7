//! The periodic reconciliation driver.

use std::{future::Future, sync::Arc, time::Duration};

use chrono::Utc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};
use warden_core::{effector::ConfinementEffector, store::PrisonerStore};

use crate::Warden;

/// The interval the warden has historically run at.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(15 * 60);

/// Run [`Warden::periodic_tick`] every `period` until `shutdown` resolves.
///
/// The first pass runs immediately, which also serves as the post-load pass.
/// Passes never overlap; a pass that overruns delays the next tick rather
/// than queueing a burst.
pub async fn run_scheduler<S, E>(
  warden: Arc<Warden<S, E>>,
  period: Duration,
  shutdown: impl Future<Output = ()>,
) where
  S: PrisonerStore,
  E: ConfinementEffector,
{
  let mut interval = tokio::time::interval(period);
  interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
  tokio::pin!(shutdown);

  info!(period_secs = period.as_secs(), "reconciliation scheduler started");

  loop {
    tokio::select! {
      _ = &mut shutdown => {
        info!("reconciliation scheduler stopping");
        break;
      }
      _ = interval.tick() => {
        let report = warden.periodic_tick(Utc::now()).await;
        for (subject, error) in &report.failures {
          warn!(%subject, %error, "prisoner left unreconciled until next pass");
        }
        if report.is_clean() {
          debug!(reconciled = report.reconciled, archived = report.archived, "pass complete");
        } else {
          info!(
            reconciled = report.reconciled,
            archived = report.archived,
            deferred = report.deferred,
            failed = report.failures.len(),
            "pass complete with outstanding work"
          );
        }
      }
    }
  }
}
