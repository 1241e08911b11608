//! Results of refresh attempts and sweeps.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// What [`SessionManager::refresh_if_needed`](crate::SessionManager::refresh_if_needed)
/// did. Provider rejections are reported here rather than as errors.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RefreshOutcome {
  /// The token is outside the expiry buffer; nothing was changed.
  NotNeeded { expires_at: DateTime<Utc> },
  /// The provider issued a new access token.
  Refreshed { expires_at: DateTime<Utc> },
  /// The session is inactive; the owner has to re-authorize.
  SessionDeactivated,
  /// The provider refused the refresh. `deactivated` is true when this
  /// failure used up the session's budget.
  RefreshFailed {
    attempts:    u32,
    deactivated: bool,
    reason:      String,
  },
}

impl RefreshOutcome {
  pub fn is_success(&self) -> bool {
    matches!(self, Self::NotNeeded { .. } | Self::Refreshed { .. })
  }

  /// The new expiry, only when a refresh actually happened.
  pub fn new_expiry(&self) -> Option<DateTime<Utc>> {
    match self {
      Self::Refreshed { expires_at } => Some(*expires_at),
      _ => None,
    }
  }

  pub fn message(&self) -> String {
    match self {
      Self::NotNeeded { .. } => "refresh not needed".into(),
      Self::Refreshed { .. } => "token refreshed".into(),
      Self::SessionDeactivated => "session is deactivated".into(),
      Self::RefreshFailed { attempts, deactivated: true, reason } => {
        format!("refresh failed ({reason}); session deactivated after {attempts} attempts")
      }
      Self::RefreshFailed { attempts, deactivated: false, reason } => {
        format!("refresh failed ({reason}); attempt {attempts}")
      }
    }
  }
}

/// Tally of one sweep pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
  pub processed: usize,
  pub succeeded: usize,
  pub failed:    usize,
  /// Sessions matched by the sweep filter but excluded from processing.
  pub skipped:   usize,
}
