//! The external OAuth provider the session manager talks to.

use std::future::Future;

use chrono::{DateTime, Utc};
use thiserror::Error;

/// A token response from the provider's refresh grant.
#[derive(Debug, Clone)]
pub struct RefreshedToken {
  pub access_token:  String,
  pub expires_at:    DateTime<Utc>,
  /// Present only when the provider rotates the refresh token.
  pub refresh_token: Option<String>,
}

/// Storage usage reported by the provider, in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriveQuota {
  pub total: u64,
  pub used:  u64,
}

#[derive(Debug, Error)]
pub enum ProviderError {
  #[error("transport error: {0}")]
  Transport(String),

  #[error("provider rejected request ({status}): {body}")]
  Rejected { status: u16, body: String },

  #[error("session has no refresh token")]
  MissingRefreshToken,

  #[error("malformed provider response: {0}")]
  Malformed(String),
}

/// Abstraction over an OAuth 2.0 provider with a storage quota API.
pub trait OAuthProvider: Send + Sync {
  /// Exchange a refresh token for a new access token.
  fn refresh(
    &self,
    refresh_token: String,
  ) -> impl Future<Output = Result<RefreshedToken, ProviderError>> + Send + '_;

  /// Query total/used storage on behalf of `access_token`.
  fn get_quota(
    &self,
    access_token: String,
  ) -> impl Future<Output = Result<DriveQuota, ProviderError>> + Send + '_;

  /// Revoke a token at the provider.
  fn revoke(
    &self,
    token: String,
  ) -> impl Future<Output = Result<(), ProviderError>> + Send + '_;
}
