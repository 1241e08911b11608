//! Quota arithmetic: usage percentage, threshold mapping, bounded history.

use cvault_core::session::{QuotaWarning, QuotaWarningLevel};

use crate::config::QuotaThresholds;

/// `used / total * 100`; an unknown or zero total counts as 0% used.
pub fn usage_percentage(total: u64, used: u64) -> f64 {
  if total == 0 {
    return 0.0;
  }
  used as f64 / total as f64 * 100.0
}

pub fn round2(value: f64) -> f64 { (value * 100.0).round() / 100.0 }

impl QuotaThresholds {
  /// The band `percentage` falls in. Each threshold is inclusive.
  pub fn level_for(&self, percentage: f64) -> QuotaWarningLevel {
    if percentage >= self.critical {
      QuotaWarningLevel::Critical
    } else if percentage >= self.high {
      QuotaWarningLevel::High
    } else if percentage >= self.medium {
      QuotaWarningLevel::Medium
    } else if percentage >= self.low {
      QuotaWarningLevel::Low
    } else {
      QuotaWarningLevel::None
    }
  }
}

/// Append `entry`, evicting the oldest entries beyond `limit`.
pub fn push_warning(history: &mut Vec<QuotaWarning>, entry: QuotaWarning, limit: usize) {
  history.push(entry);
  if history.len() > limit {
    let excess = history.len() - limit;
    history.drain(..excess);
  }
}
