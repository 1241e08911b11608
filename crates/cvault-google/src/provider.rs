//! [`GoogleProvider`], a reqwest-backed [`OAuthProvider`].

use std::time::Duration;

use chrono::Utc;
use cvault_core::provider::{DriveQuota, OAuthProvider, ProviderError, RefreshedToken};
use reqwest::{Client, Response};

use crate::{
  config::GoogleConfig,
  wire::{AboutResponse, TokenResponse},
};

/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct GoogleProvider {
  client: Client,
  config: GoogleConfig,
}

fn transport(e: reqwest::Error) -> ProviderError { ProviderError::Transport(e.to_string()) }

/// Turn a non-2xx response into [`ProviderError::Rejected`], keeping the body
/// for diagnostics.
async fn check(resp: Response) -> Result<Response, ProviderError> {
  let status = resp.status();
  if status.is_success() {
    return Ok(resp);
  }
  let body = resp.text().await.unwrap_or_default();
  Err(ProviderError::Rejected { status: status.as_u16(), body })
}

impl GoogleProvider {
  pub fn new(config: GoogleConfig) -> Result<Self, ProviderError> {
    let client = Client::builder()
      .timeout(Duration::from_secs(config.timeout_secs))
      .build()
      .map_err(transport)?;
    Ok(Self { client, config })
  }
}

impl OAuthProvider for GoogleProvider {
  /// `POST {token_url}` with `grant_type=refresh_token`
  async fn refresh(&self, refresh_token: String) -> Result<RefreshedToken, ProviderError> {
    let resp = self
      .client
      .post(&self.config.token_url)
      .form(&[
        ("grant_type", "refresh_token"),
        ("refresh_token", refresh_token.as_str()),
        ("client_id", self.config.client_id.as_str()),
        ("client_secret", self.config.client_secret.as_str()),
      ])
      .send()
      .await
      .map_err(transport)?;
    let resp = check(resp).await?;

    let body: TokenResponse = resp
      .json()
      .await
      .map_err(|e| ProviderError::Malformed(e.to_string()))?;
    tracing::debug!(expires_in = body.expires_in, rotated = body.refresh_token.is_some(), "google token refreshed");
    body.into_refreshed(Utc::now())
  }

  /// `GET {drive_api_url}/about?fields=storageQuota`
  async fn get_quota(&self, access_token: String) -> Result<DriveQuota, ProviderError> {
    let resp = self
      .client
      .get(self.config.about_url())
      .query(&[("fields", "storageQuota")])
      .bearer_auth(&access_token)
      .send()
      .await
      .map_err(transport)?;
    let resp = check(resp).await?;

    let body: AboutResponse = resp
      .json()
      .await
      .map_err(|e| ProviderError::Malformed(e.to_string()))?;
    body.storage_quota.into_quota()
  }

  /// `POST {revoke_url}` with `token=...`
  async fn revoke(&self, token: String) -> Result<(), ProviderError> {
    let resp = self
      .client
      .post(&self.config.revoke_url)
      .form(&[("token", token.as_str())])
      .send()
      .await
      .map_err(transport)?;
    check(resp).await?;
    Ok(())
  }
}
