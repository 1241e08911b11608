//! Tunables for the session manager and its sweep scheduler.

use std::time::Duration as StdDuration;

use chrono::Duration;
use serde::Deserialize;

use crate::{Error, Result};

/// Upper bound on the expiry buffer; anything longer would keep every token
/// permanently "near expiry".
const MAX_EXPIRY_BUFFER_SECS: u64 = 24 * 60 * 60;

/// Usage percentages at which each warning level starts.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct QuotaThresholds {
  pub low:      f64,
  pub medium:   f64,
  pub high:     f64,
  pub critical: f64,
}

impl Default for QuotaThresholds {
  fn default() -> Self {
    Self { low: 80.0, medium: 85.0, high: 90.0, critical: 95.0 }
  }
}

/// Runtime configuration, usually deserialised from the `[session]` table of
/// the worker's config file. Every field has a default.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
  /// Tokens expiring within this many seconds are refreshed.
  pub expiry_buffer_secs:    u64,
  /// Consecutive refresh failures after which a new session deactivates.
  pub max_refresh_failures:  u32,
  /// Period of the refresh sweep.
  pub refresh_interval_secs: u64,
  /// Minimum wall-clock gap between quota sweeps.
  pub quota_interval_secs:   u64,
  /// Number of warning-level transitions kept per session.
  pub quota_history_limit:   usize,
  pub thresholds:            QuotaThresholds,
}

impl Default for SessionConfig {
  fn default() -> Self {
    Self {
      expiry_buffer_secs:    5 * 60,
      max_refresh_failures:  3,
      refresh_interval_secs: 15 * 60,
      quota_interval_secs:   6 * 60 * 60,
      quota_history_limit:   10,
      thresholds:            QuotaThresholds::default(),
    }
  }
}

impl SessionConfig {
  pub fn expiry_buffer(&self) -> Duration {
    Duration::seconds(self.expiry_buffer_secs.min(MAX_EXPIRY_BUFFER_SECS) as i64)
  }

  pub fn refresh_interval(&self) -> StdDuration {
    StdDuration::from_secs(self.refresh_interval_secs)
  }

  pub fn quota_interval(&self) -> StdDuration {
    StdDuration::from_secs(self.quota_interval_secs)
  }

  /// Reject configurations the manager cannot run with.
  pub fn validate(&self) -> Result<()> {
    if self.expiry_buffer_secs > MAX_EXPIRY_BUFFER_SECS {
      return Err(Error::InvalidConfig(format!(
        "expiry_buffer_secs must be at most {MAX_EXPIRY_BUFFER_SECS}"
      )));
    }
    if self.max_refresh_failures == 0 {
      return Err(Error::InvalidConfig("max_refresh_failures must be positive".into()));
    }
    if self.refresh_interval_secs == 0 || self.quota_interval_secs == 0 {
      return Err(Error::InvalidConfig("sweep intervals must be positive".into()));
    }
    if self.quota_history_limit == 0 {
      return Err(Error::InvalidConfig("quota_history_limit must be positive".into()));
    }
    let t = self.thresholds;
    let ascending = 0.0 <= t.low && t.low < t.medium && t.medium < t.high && t.high < t.critical;
    if !ascending || t.critical > 100.0 {
      return Err(Error::InvalidConfig(
        "quota thresholds must ascend within 0..=100".into(),
      ));
    }
    Ok(())
  }
}
