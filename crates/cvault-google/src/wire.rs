//! Response bodies returned by Google's endpoints.

use chrono::{DateTime, Duration, Utc};
use cvault_core::provider::{DriveQuota, ProviderError, RefreshedToken};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
  pub access_token:  String,
  /// Lifetime in seconds.
  pub expires_in:    i64,
  #[serde(default)]
  pub refresh_token: Option<String>,
}

/// Longest token lifetime accepted from the token endpoint. Google issues
/// one-hour tokens; anything past a day is a broken or hostile response.
pub(crate) const MAX_EXPIRES_IN_SECS: i64 = 24 * 60 * 60;

impl TokenResponse {
  /// Negative lifetimes count as already expired.
  pub fn into_refreshed(self, now: DateTime<Utc>) -> Result<RefreshedToken, ProviderError> {
    if self.expires_in > MAX_EXPIRES_IN_SECS {
      return Err(ProviderError::Malformed(format!(
        "expires_in = {} exceeds {MAX_EXPIRES_IN_SECS}s",
        self.expires_in
      )));
    }
    let expires_at = Duration::try_seconds(self.expires_in.max(0))
      .and_then(|lifetime| now.checked_add_signed(lifetime))
      .ok_or_else(|| ProviderError::Malformed(format!("expires_in = {}", self.expires_in)))?;

    Ok(RefreshedToken {
      access_token: self.access_token,
      expires_at,
      refresh_token: self.refresh_token,
    })
  }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AboutResponse {
  pub storage_quota: StorageQuota,
}

/// Drive reports byte counts as decimal strings. `limit` is absent for
/// accounts with unlimited storage.
#[derive(Debug, Deserialize)]
pub(crate) struct StorageQuota {
  #[serde(default)]
  pub limit: Option<String>,
  #[serde(default)]
  pub usage: Option<String>,
}

impl StorageQuota {
  pub fn into_quota(self) -> Result<DriveQuota, ProviderError> {
    Ok(DriveQuota {
      total: parse_bytes("limit", self.limit)?,
      used:  parse_bytes("usage", self.usage)?,
    })
  }
}

fn parse_bytes(field: &str, value: Option<String>) -> Result<u64, ProviderError> {
  match value {
    None => Ok(0),
    Some(v) => v
      .parse()
      .map_err(|_| ProviderError::Malformed(format!("storageQuota.{field} = {v:?}"))),
  }
}
