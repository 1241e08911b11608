//! [`SessionManager`]: the credential session state machine.
//!
//! ```text
//!   create ──▶ ACTIVE_FRESH ◀──── refresh ok ────┐
//!                   │                            │
//!           expiry buffer reached                │
//!                   ▼                            │
//!            ACTIVE_NEEDS_REFRESH ───────────────┘
//!                   │
//!     refresh failures ≥ max  /  revoke (from any state)
//!                   ▼
//!              DEACTIVATED ──── create (re-authorization) ──▶ ACTIVE_*
//! ```
//!
//! Every mutation of a session runs under that session's lock and ends in a
//! single `update_session` write.

use std::sync::Arc;

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::Utc;
use rand_core::{OsRng, RngCore};
use uuid::Uuid;

use cvault_core::{
  OwnerId,
  provider::{OAuthProvider, ProviderError},
  session::{
    CredentialSession, QuotaSnapshot, QuotaWarning, QuotaWarningLevel, TokenData,
  },
  store::SessionStore,
};

use crate::{
  Error, Result,
  config::SessionConfig,
  error::store_err,
  locks::KeyedLocks,
  outcome::{RefreshOutcome, SweepReport},
  quota::{push_warning, round2, usage_percentage},
  status::SessionStatus,
};

/// Generate an opaque, unguessable session handle (256 bits, URL-safe).
fn generate_persistent_id() -> String {
  let mut bytes = [0u8; 32];
  OsRng.fill_bytes(&mut bytes);
  URL_SAFE_NO_PAD.encode(bytes)
}

pub struct SessionManager<S, P> {
  store:         Arc<S>,
  provider:      Arc<P>,
  config:        SessionConfig,
  session_locks: KeyedLocks<Uuid>,
  owner_locks:   KeyedLocks<OwnerId>,
}

impl<S, P> SessionManager<S, P>
where
  S: SessionStore,
  P: OAuthProvider,
{
  pub fn new(store: Arc<S>, provider: Arc<P>, config: SessionConfig) -> Self {
    Self {
      store,
      provider,
      config,
      session_locks: KeyedLocks::new(),
      owner_locks: KeyedLocks::new(),
    }
  }

  pub fn config(&self) -> &SessionConfig { &self.config }

  async fn load(&self, id: Uuid) -> Result<CredentialSession> {
    self
      .store
      .get_session(id)
      .await
      .map_err(store_err)?
      .ok_or(Error::SessionNotFound(id))
  }

  async fn save(&self, session: CredentialSession) -> Result<()> {
    self.store.update_session(session).await.map_err(store_err)
  }

  // ── Creation ──────────────────────────────────────────────────────────────

  /// Store the tokens from a completed authorization flow.
  ///
  /// An owner never gets a second session: if one exists it is updated in
  /// place, reactivated, and its failure count reset. Its id and
  /// `persistent_session_id` are kept.
  pub async fn create_or_update_session(
    &self,
    owner_id: OwnerId,
    tokens: TokenData,
  ) -> Result<CredentialSession> {
    let _owner_guard = self.owner_locks.lock(owner_id).await;
    let now = Utc::now();

    let existing = self
      .store
      .get_session_by_owner(owner_id)
      .await
      .map_err(store_err)?;

    if let Some(existing) = existing {
      let _session_guard = self.session_locks.lock(existing.id).await;
      // Re-read under the session lock; a refresh may have just written.
      let mut session = self.load(existing.id).await?;

      session.access_token = tokens.access_token;
      if let Some(refresh_token) = tokens.refresh_token {
        session.refresh_token = Some(refresh_token);
      }
      session.token_expires_at = tokens.expires_at;
      session.refresh_attempts = 0;
      session.is_active = true;
      session.deactivated_at = None;
      session.deactivated_reason = None;
      session.last_activity_at = Some(now);
      session.updated_at = now;

      self.save(session.clone()).await?;
      tracing::info!(session_id = %session.id, owner_id, "credential session updated");
      return Ok(session);
    }

    let session = CredentialSession {
      id: Uuid::new_v4(),
      owner_id,
      access_token: tokens.access_token,
      refresh_token: tokens.refresh_token,
      token_expires_at: tokens.expires_at,
      is_persistent: true,
      auto_refresh_enabled: true,
      is_active: true,
      persistent_session_id: generate_persistent_id(),
      refresh_attempts: 0,
      max_refresh_failures: self.config.max_refresh_failures,
      last_refresh_at: None,
      deactivated_at: None,
      deactivated_reason: None,
      drive_quota_total: None,
      drive_quota_used: None,
      last_quota_check: None,
      quota_warning_level: QuotaWarningLevel::None,
      quota_warnings_sent: Vec::new(),
      last_activity_at: Some(now),
      created_at: now,
      updated_at: now,
    };

    let session = self.store.insert_session(session).await.map_err(store_err)?;
    tracing::info!(session_id = %session.id, owner_id, "credential session created");
    Ok(session)
  }

  // ── Refresh ───────────────────────────────────────────────────────────────

  /// Refresh the access token if it expires within the configured buffer.
  pub async fn refresh_if_needed(&self, session_id: Uuid) -> Result<RefreshOutcome> {
    let _guard = self.session_locks.lock(session_id).await;
    self.refresh_locked(session_id, false).await
  }

  /// Refresh regardless of expiry. Deactivation and failure accounting still
  /// apply.
  pub async fn force_refresh(&self, session_id: Uuid) -> Result<RefreshOutcome> {
    let _guard = self.session_locks.lock(session_id).await;
    self.refresh_locked(session_id, true).await
  }

  /// Caller must hold the session lock.
  async fn refresh_locked(&self, session_id: Uuid, force: bool) -> Result<RefreshOutcome> {
    let mut session = self.load(session_id).await?;

    if !force && !session.needs_refresh(Utc::now(), self.config.expiry_buffer()) {
      return Ok(RefreshOutcome::NotNeeded { expires_at: session.token_expires_at });
    }
    if !session.is_active {
      tracing::debug!(%session_id, "refresh skipped: session deactivated");
      return Ok(RefreshOutcome::SessionDeactivated);
    }

    let result = match session.refresh_token.clone() {
      Some(token) => self.provider.refresh(token).await,
      None => Err(ProviderError::MissingRefreshToken),
    };

    let now = Utc::now();
    session.last_refresh_at = Some(now);
    session.updated_at = now;

    let outcome = match result {
      Ok(token) => {
        session.access_token = token.access_token;
        session.token_expires_at = token.expires_at;
        if let Some(rotated) = token.refresh_token {
          session.refresh_token = Some(rotated);
        }
        session.refresh_attempts = 0;
        tracing::info!(%session_id, expires_at = %token.expires_at, "token refreshed");
        RefreshOutcome::Refreshed { expires_at: token.expires_at }
      }
      Err(e) => {
        session.refresh_attempts = session.refresh_attempts.saturating_add(1);
        let attempts = session.refresh_attempts;
        let deactivated = attempts >= session.max_refresh_failures;
        if deactivated {
          session.deactivate(now, format!("too many refresh failures ({attempts})"));
          tracing::error!(%session_id, attempts, error = %e, "session deactivated after refresh failures");
        } else {
          tracing::warn!(%session_id, attempts, error = %e, "token refresh failed");
        }
        RefreshOutcome::RefreshFailed { attempts, deactivated, reason: e.to_string() }
      }
    };

    self.save(session).await?;
    Ok(outcome)
  }

  // ── Revocation ────────────────────────────────────────────────────────────

  /// Deactivate a session, whatever its state. Returns `false` if no such
  /// session exists. Revoking an inactive session succeeds but keeps its
  /// original deactivation time and reason.
  ///
  /// The provider-side revoke is attempted only when the session was still
  /// active, and its failure never blocks the local deactivation.
  pub async fn revoke(&self, session_id: Uuid, reason: &str) -> Result<bool> {
    let _guard = self.session_locks.lock(session_id).await;

    let Some(mut session) =
      self.store.get_session(session_id).await.map_err(store_err)?
    else {
      return Ok(false);
    };

    if session.is_active {
      let token = session
        .refresh_token
        .clone()
        .unwrap_or_else(|| session.access_token.clone());
      if let Err(e) = self.provider.revoke(token).await {
        tracing::warn!(%session_id, error = %e, "provider token revoke failed");
      }
    }

    session.deactivate(Utc::now(), reason);
    self.save(session).await?;
    tracing::info!(%session_id, reason, "credential session revoked");
    Ok(true)
  }

  // ── Quota ─────────────────────────────────────────────────────────────────

  /// Poll the provider for storage usage and update the warning level.
  ///
  /// Returns `None` for inactive or unknown sessions, when the token cannot
  /// be refreshed, and on any provider or store failure. Failures are logged
  /// and never propagate, so one session cannot abort a sweep.
  pub async fn check_storage_quota(&self, session_id: Uuid) -> Option<QuotaSnapshot> {
    let _guard = self.session_locks.lock(session_id).await;
    match self.check_quota_locked(session_id).await {
      Ok(snapshot) => snapshot,
      Err(e) => {
        tracing::error!(%session_id, error = %e, "quota check failed");
        None
      }
    }
  }

  async fn check_quota_locked(&self, session_id: Uuid) -> Result<Option<QuotaSnapshot>> {
    let Some(mut session) =
      self.store.get_session(session_id).await.map_err(store_err)?
    else {
      return Ok(None);
    };
    if !session.is_active {
      return Ok(None);
    }

    if session.is_expired(Utc::now()) {
      let outcome = self.refresh_locked(session_id, false).await?;
      if !outcome.is_success() {
        tracing::warn!(%session_id, outcome = %outcome.message(), "quota check skipped: token unavailable");
        return Ok(None);
      }
      session = self.load(session_id).await?;
    }

    let quota = match self.provider.get_quota(session.access_token.clone()).await {
      Ok(quota) => quota,
      Err(e) => {
        tracing::warn!(%session_id, error = %e, "quota query failed");
        return Ok(None);
      }
    };

    let now = Utc::now();
    let percentage = usage_percentage(quota.total, quota.used);
    let level = self.config.thresholds.level_for(percentage);
    let rounded = round2(percentage);

    let previous = session.quota_warning_level;
    if level != previous {
      push_warning(
        &mut session.quota_warnings_sent,
        QuotaWarning {
          timestamp:        now,
          old_level:        previous,
          new_level:        level,
          usage_percentage: rounded,
        },
        self.config.quota_history_limit,
      );
      session.quota_warning_level = level;
      if level > previous {
        tracing::warn!(
          %session_id,
          owner_id = session.owner_id,
          old_level = %previous,
          new_level = %level,
          usage = rounded,
          "storage quota warning raised"
        );
      } else {
        tracing::info!(
          %session_id,
          owner_id = session.owner_id,
          old_level = %previous,
          new_level = %level,
          usage = rounded,
          "storage quota warning lowered"
        );
      }
    }

    session.drive_quota_total = Some(quota.total);
    session.drive_quota_used = Some(quota.used);
    session.last_quota_check = Some(now);
    session.updated_at = now;
    self.save(session).await?;

    Ok(Some(QuotaSnapshot {
      total:            quota.total,
      used:             quota.used,
      usage_percentage: rounded,
      warning_level:    level,
      last_check:       now,
    }))
  }

  // ── Reads & activity ──────────────────────────────────────────────────────

  /// Read-only status projection. Returns `None` if the session is unknown.
  pub async fn get_status(&self, session_id: Uuid) -> Result<Option<SessionStatus>> {
    let session = self.store.get_session(session_id).await.map_err(store_err)?;
    Ok(session.map(|s| SessionStatus::project(s, Utc::now(), self.config.expiry_buffer())))
  }

  /// Stamp `last_activity_at`. Returns `false` if the session is unknown.
  pub async fn record_activity(&self, session_id: Uuid) -> Result<bool> {
    let _guard = self.session_locks.lock(session_id).await;
    let Some(mut session) =
      self.store.get_session(session_id).await.map_err(store_err)?
    else {
      return Ok(false);
    };
    let now = Utc::now();
    session.last_activity_at = Some(now);
    session.updated_at = now;
    self.save(session).await?;
    Ok(true)
  }
}

// ── Sweeps ──────────────────────────────────────────────────────────────────

impl<S, P> SessionManager<S, P>
where
  S: SessionStore + 'static,
  P: OAuthProvider + 'static,
{
  /// Refresh every active session whose token is within the expiry buffer.
  ///
  /// Sessions are processed one at a time, each on its own task, so a
  /// failing or panicking session is logged and counted but never stops the
  /// rest of the sweep.
  pub async fn refresh_sweep(self: &Arc<Self>) -> SweepReport {
    let deadline = Utc::now() + self.config.expiry_buffer();
    let sessions = match self.store.list_sessions_expiring_before(deadline).await {
      Ok(sessions) => sessions,
      Err(e) => {
        tracing::error!(error = %e, "refresh sweep could not list sessions");
        return SweepReport::default();
      }
    };

    let mut report = SweepReport::default();
    for session in sessions {
      if !session.auto_refresh_enabled {
        report.skipped += 1;
        continue;
      }
      report.processed += 1;

      let manager = Arc::clone(self);
      let session_id = session.id;
      let task = tokio::spawn(async move { manager.refresh_if_needed(session_id).await });

      match task.await {
        Ok(Ok(outcome)) if outcome.is_success() => report.succeeded += 1,
        Ok(Ok(outcome)) => {
          report.failed += 1;
          tracing::warn!(%session_id, outcome = %outcome.message(), "sweep refresh unsuccessful");
        }
        Ok(Err(e)) => {
          report.failed += 1;
          tracing::error!(%session_id, error = %e, "sweep refresh errored");
        }
        Err(e) => {
          report.failed += 1;
          tracing::error!(%session_id, error = %e, "sweep refresh task panicked");
        }
      }
    }

    tracing::info!(
      processed = report.processed,
      succeeded = report.succeeded,
      failed = report.failed,
      skipped = report.skipped,
      "refresh sweep finished"
    );
    report
  }

  /// Check storage quota for every active session, isolated like
  /// [`refresh_sweep`](Self::refresh_sweep).
  pub async fn quota_sweep(self: &Arc<Self>) -> SweepReport {
    let sessions = match self.store.list_active_sessions().await {
      Ok(sessions) => sessions,
      Err(e) => {
        tracing::error!(error = %e, "quota sweep could not list sessions");
        return SweepReport::default();
      }
    };

    let mut report = SweepReport::default();
    for session in sessions {
      report.processed += 1;

      let manager = Arc::clone(self);
      let session_id = session.id;
      let task = tokio::spawn(async move { manager.check_storage_quota(session_id).await });

      match task.await {
        Ok(Some(_)) => report.succeeded += 1,
        Ok(None) => report.failed += 1,
        Err(e) => {
          report.failed += 1;
          tracing::error!(%session_id, error = %e, "quota check task panicked");
        }
      }
    }

    tracing::info!(
      processed = report.processed,
      succeeded = report.succeeded,
      failed = report.failed,
      "quota sweep finished"
    );
    report
  }
}
