//! Background driver for the refresh and quota sweeps.
//!
//! One tokio task ticks at the refresh interval. Each tick runs the refresh
//! sweep, then the quota sweep if at least the quota interval has passed since
//! the last one (or none has run yet). Shutdown is observed between ticks, so
//! an in-flight tick always completes.

use std::{sync::Arc, time::Duration};

use cvault_core::{provider::OAuthProvider, store::SessionStore};
use serde::Serialize;
use tokio::{
  sync::watch,
  task::{JoinError, JoinHandle},
  time::{Instant, MissedTickBehavior},
};

use crate::{SessionManager, outcome::SweepReport};

/// What a single tick did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TickReport {
  pub refresh: SweepReport,
  /// `None` when the quota sweep was not due.
  pub quota:   Option<SweepReport>,
}

/// Decides whether the quota sweep is due.
#[derive(Debug, Clone)]
struct QuotaGate {
  interval: Duration,
  last_run: Option<Instant>,
}

impl QuotaGate {
  fn due(&self, now: Instant) -> bool {
    self
      .last_run
      .is_none_or(|last| now.saturating_duration_since(last) >= self.interval)
  }
}

pub struct SweepScheduler<S, P> {
  manager: Arc<SessionManager<S, P>>,
  gate:    QuotaGate,
}

impl<S, P> SweepScheduler<S, P>
where
  S: SessionStore + 'static,
  P: OAuthProvider + 'static,
{
  pub fn new(manager: Arc<SessionManager<S, P>>) -> Self {
    let interval = manager.config().quota_interval();
    Self { manager, gate: QuotaGate { interval, last_run: None } }
  }

  /// Run one tick in the current task.
  pub async fn tick(&mut self) -> TickReport {
    let refresh = self.manager.refresh_sweep().await;

    let now = Instant::now();
    let quota = if self.gate.due(now) {
      self.gate.last_run = Some(now);
      Some(self.manager.quota_sweep().await)
    } else {
      None
    };

    TickReport { refresh, quota }
  }

  /// Move the scheduler onto a background task.
  pub fn spawn(mut self) -> SchedulerHandle {
    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

    let task = tokio::spawn(async move {
      let mut ticker = tokio::time::interval(self.manager.config().refresh_interval());
      ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
      tracing::info!(
        refresh_interval_secs = self.manager.config().refresh_interval_secs,
        quota_interval_secs = self.manager.config().quota_interval_secs,
        "session sweep scheduler started"
      );

      loop {
        tokio::select! {
          biased;
          changed = shutdown_rx.changed() => {
            if changed.is_err() || *shutdown_rx.borrow() {
              break;
            }
          }
          _ = ticker.tick() => {
            self.tick().await;
          }
        }
      }

      tracing::info!("session sweep scheduler stopped");
    });

    SchedulerHandle { shutdown: shutdown_tx, task }
  }
}

/// Owner of a running scheduler task.
pub struct SchedulerHandle {
  shutdown: watch::Sender<bool>,
  task:     JoinHandle<()>,
}

impl SchedulerHandle {
  /// Signal the scheduler to stop and wait for the current tick to finish.
  pub async fn shutdown(self) {
    let _ = self.shutdown.send(true);
    if let Err(e) = self.task.await {
      tracing::error!(error = %e, "session sweep scheduler task failed");
    }
  }

  pub fn is_finished(&self) -> bool { self.task.is_finished() }

  /// Resolves only if the scheduler task ends on its own, which means it
  /// panicked. Do not call [`shutdown`](Self::shutdown) after this returns.
  pub async fn stopped(&mut self) -> Result<(), JoinError> { (&mut self.task).await }
}
