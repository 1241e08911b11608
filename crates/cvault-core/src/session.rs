//! Credential sessions: one long-lived external-provider credential per
//! owner.
//!
//! A session is never physically deleted. It is deactivated logically, either
//! by explicit revocation or after too many consecutive refresh failures.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, OwnerId};

// ─── Quota warning levels ────────────────────────────────────────────────────

/// Storage-usage band a session's quota currently falls in. Ordered from
/// least to most severe.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize,
  Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum QuotaWarningLevel {
  #[default]
  None,
  Low,
  Medium,
  High,
  Critical,
}

impl QuotaWarningLevel {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::None => "none",
      Self::Low => "low",
      Self::Medium => "medium",
      Self::High => "high",
      Self::Critical => "critical",
    }
  }
}

impl fmt::Display for QuotaWarningLevel {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for QuotaWarningLevel {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "none" => Ok(Self::None),
      "low" => Ok(Self::Low),
      "medium" => Ok(Self::Medium),
      "high" => Ok(Self::High),
      "critical" => Ok(Self::Critical),
      other => Err(Error::UnknownWarningLevel(other.to_owned())),
    }
  }
}

/// One entry in a session's warning history, appended whenever the computed
/// level differs from the stored one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuotaWarning {
  pub timestamp:        DateTime<Utc>,
  pub old_level:        QuotaWarningLevel,
  pub new_level:        QuotaWarningLevel,
  pub usage_percentage: f64,
}

/// The result of a successful quota check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuotaSnapshot {
  pub total:            u64,
  pub used:             u64,
  /// Rounded to two decimals.
  pub usage_percentage: f64,
  pub warning_level:    QuotaWarningLevel,
  pub last_check:       DateTime<Utc>,
}

// ─── Tokens ──────────────────────────────────────────────────────────────────

/// Tokens handed over by the external authorization flow.
#[derive(Debug, Clone)]
pub struct TokenData {
  pub access_token:  String,
  /// `None` keeps whatever refresh token an existing session already holds.
  pub refresh_token: Option<String>,
  pub expires_at:    DateTime<Utc>,
}

// ─── State ───────────────────────────────────────────────────────────────────

/// Derived lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
  /// Token valid and outside the expiry buffer.
  ActiveFresh,
  /// Token within the expiry buffer or already expired.
  ActiveNeedsRefresh,
  /// Terminal until the owner re-authorizes.
  Deactivated,
}

// ─── CredentialSession ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredentialSession {
  pub id:                    Uuid,
  /// Unique: at most one session per owner.
  pub owner_id:              OwnerId,

  pub access_token:          String,
  pub refresh_token:         Option<String>,
  pub token_expires_at:      DateTime<Utc>,

  pub is_persistent:         bool,
  pub auto_refresh_enabled:  bool,
  pub is_active:             bool,
  /// Opaque and unguessable; generated once at creation.
  pub persistent_session_id: String,

  /// Consecutive failed refreshes; reset by any success.
  pub refresh_attempts:      u32,
  pub max_refresh_failures:  u32,
  pub last_refresh_at:       Option<DateTime<Utc>>,

  pub deactivated_at:        Option<DateTime<Utc>>,
  pub deactivated_reason:    Option<String>,

  pub drive_quota_total:     Option<u64>,
  pub drive_quota_used:      Option<u64>,
  pub last_quota_check:      Option<DateTime<Utc>>,
  pub quota_warning_level:   QuotaWarningLevel,
  /// Newest last; bounded by the manager's history limit.
  pub quota_warnings_sent:   Vec<QuotaWarning>,

  pub last_activity_at:      Option<DateTime<Utc>>,
  pub created_at:            DateTime<Utc>,
  pub updated_at:            DateTime<Utc>,
}

impl CredentialSession {
  /// True when the token expires at or before `now + buffer`.
  pub fn needs_refresh(&self, now: DateTime<Utc>, buffer: Duration) -> bool {
    self.token_expires_at <= now + buffer
  }

  pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
    self.token_expires_at <= now
  }

  /// Negative once the token has expired.
  pub fn time_until_expiry(&self, now: DateTime<Utc>) -> Duration {
    self.token_expires_at - now
  }

  pub fn state(&self, now: DateTime<Utc>, buffer: Duration) -> SessionState {
    if !self.is_active {
      SessionState::Deactivated
    } else if self.needs_refresh(now, buffer) {
      SessionState::ActiveNeedsRefresh
    } else {
      SessionState::ActiveFresh
    }
  }

  /// Mark the session inactive and record `reason`.
  ///
  /// Both deactivation fields are only written on the active → inactive
  /// transition, so deactivating twice keeps the original time and reason.
  pub fn deactivate(&mut self, now: DateTime<Utc>, reason: impl Into<String>) {
    if self.is_active {
      self.is_active = false;
      self.deactivated_at = Some(now);
      self.deactivated_reason = Some(reason.into());
    }
    self.updated_at = now;
  }
}
