use serde::Deserialize;

/// OAuth client credentials and endpoint overrides.
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleConfig {
  pub client_id:     String,
  pub client_secret: String,
  #[serde(default = "default_token_url")]
  pub token_url:     String,
  #[serde(default = "default_revoke_url")]
  pub revoke_url:    String,
  #[serde(default = "default_drive_api_url")]
  pub drive_api_url: String,
  /// Per-request timeout.
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs:  u64,
}

fn default_token_url() -> String { "https://oauth2.googleapis.com/token".into() }

fn default_revoke_url() -> String { "https://oauth2.googleapis.com/revoke".into() }

fn default_drive_api_url() -> String { "https://www.googleapis.com/drive/v3".into() }

fn default_timeout_secs() -> u64 { 30 }

impl GoogleConfig {
  pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
    Self {
      client_id:     client_id.into(),
      client_secret: client_secret.into(),
      token_url:     default_token_url(),
      revoke_url:    default_revoke_url(),
      drive_api_url: default_drive_api_url(),
      timeout_secs:  default_timeout_secs(),
    }
  }

  pub(crate) fn about_url(&self) -> String {
    format!("{}/about", self.drive_api_url.trim_end_matches('/'))
  }
}
