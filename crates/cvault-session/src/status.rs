//! Read-only projection of a session for admin and status endpoints.
//!
//! Tokens are never included; only whether a refresh token is present.

use chrono::{DateTime, Utc};
use cvault_core::{
  OwnerId,
  session::{CredentialSession, QuotaWarning, QuotaWarningLevel, SessionState},
};
use serde::Serialize;
use uuid::Uuid;

use crate::quota::{round2, usage_percentage};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionStatus {
  pub session_id:             Uuid,
  pub owner_id:               OwnerId,
  pub state:                  SessionState,
  pub is_active:              bool,
  pub is_persistent:          bool,
  pub auto_refresh_enabled:   bool,
  pub persistent_session_id:  String,
  pub has_refresh_token:      bool,
  pub token_expires_at:       DateTime<Utc>,
  /// Negative once the token has expired.
  pub time_until_expiry_secs: i64,
  pub needs_refresh:          bool,
  pub refresh_attempts:       u32,
  pub max_refresh_failures:   u32,
  pub last_refresh_at:        Option<DateTime<Utc>>,
  pub deactivated_at:         Option<DateTime<Utc>>,
  pub deactivated_reason:     Option<String>,
  pub drive_quota_total:      Option<u64>,
  pub drive_quota_used:       Option<u64>,
  pub usage_percentage:       Option<f64>,
  pub last_quota_check:       Option<DateTime<Utc>>,
  pub quota_warning_level:    QuotaWarningLevel,
  pub quota_warnings_sent:    Vec<QuotaWarning>,
  pub last_activity_at:       Option<DateTime<Utc>>,
  pub created_at:             DateTime<Utc>,
  pub updated_at:             DateTime<Utc>,
}

impl SessionStatus {
  pub fn project(
    session: CredentialSession,
    now: DateTime<Utc>,
    buffer: chrono::Duration,
  ) -> Self {
    let usage = match (session.drive_quota_total, session.drive_quota_used) {
      (Some(total), Some(used)) => Some(round2(usage_percentage(total, used))),
      _ => None,
    };

    Self {
      session_id:             session.id,
      owner_id:               session.owner_id,
      state:                  session.state(now, buffer),
      is_active:              session.is_active,
      is_persistent:          session.is_persistent,
      auto_refresh_enabled:   session.auto_refresh_enabled,
      has_refresh_token:      session.refresh_token.is_some(),
      token_expires_at:       session.token_expires_at,
      time_until_expiry_secs: session.time_until_expiry(now).num_seconds(),
      needs_refresh:          session.needs_refresh(now, buffer),
      refresh_attempts:       session.refresh_attempts,
      max_refresh_failures:   session.max_refresh_failures,
      last_refresh_at:        session.last_refresh_at,
      deactivated_at:         session.deactivated_at,
      deactivated_reason:     session.deactivated_reason,
      drive_quota_total:      session.drive_quota_total,
      drive_quota_used:       session.drive_quota_used,
      usage_percentage:       usage,
      last_quota_check:       session.last_quota_check,
      quota_warning_level:    session.quota_warning_level,
      quota_warnings_sent:    session.quota_warnings_sent,
      last_activity_at:       session.last_activity_at,
      created_at:             session.created_at,
      updated_at:             session.updated_at,
      persistent_session_id:  session.persistent_session_id,
    }
  }
}
