//! Shared fixtures: an in-memory store and a scriptable OAuth provider.

#![allow(dead_code)]

use std::{
  collections::{HashMap, HashSet},
  sync::{
    Arc, Mutex,
    atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
  },
  time::Duration,
};

use chrono::Utc;
use cvault_core::provider::{DriveQuota, OAuthProvider, ProviderError, RefreshedToken};
use cvault_session::{SessionConfig, SessionManager};
use cvault_store_sqlite::SqliteStore;

/// Provider double. Refreshes succeed with a one-hour token unless the
/// refresh token is marked failing (or every refresh is). Quota answers are
/// keyed by access token; unknown tokens fail. Tokens marked with
/// `panic_on_token` make either call panic.
#[derive(Default)]
pub struct MockProvider {
  pub refresh_calls: AtomicUsize,
  pub quota_calls:   AtomicUsize,
  pub revoked:       Mutex<Vec<String>>,
  fail_all:          AtomicBool,
  failing_tokens:    Mutex<HashSet<String>>,
  panicking_tokens:  Mutex<HashSet<String>>,
  quotas:            Mutex<HashMap<String, DriveQuota>>,
  refresh_delay_ms:  AtomicU64,
  issued:            AtomicUsize,
}

impl MockProvider {
  pub fn fail_every_refresh(&self) { self.fail_all.store(true, Ordering::SeqCst); }

  pub fn succeed_refreshes(&self) { self.fail_all.store(false, Ordering::SeqCst); }

  pub fn fail_refresh_token(&self, token: &str) {
    self.failing_tokens.lock().unwrap().insert(token.to_owned());
  }

  /// Refreshing `token`, or querying quota with it, panics.
  pub fn panic_on_token(&self, token: &str) {
    self.panicking_tokens.lock().unwrap().insert(token.to_owned());
  }

  fn panics_on(&self, token: &str) -> bool {
    self.panicking_tokens.lock().unwrap().contains(token)
  }

  pub fn set_quota(&self, access_token: &str, total: u64, used: u64) {
    self
      .quotas
      .lock()
      .unwrap()
      .insert(access_token.to_owned(), DriveQuota { total, used });
  }

  pub fn slow_refreshes(&self, delay: Duration) {
    self.refresh_delay_ms.store(delay.as_millis() as u64, Ordering::SeqCst);
  }

  pub fn refreshes(&self) -> usize { self.refresh_calls.load(Ordering::SeqCst) }

  pub fn quota_queries(&self) -> usize { self.quota_calls.load(Ordering::SeqCst) }
}

impl OAuthProvider for MockProvider {
  async fn refresh(&self, refresh_token: String) -> Result<RefreshedToken, ProviderError> {
    self.refresh_calls.fetch_add(1, Ordering::SeqCst);
    let delay = self.refresh_delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
      tokio::time::sleep(Duration::from_millis(delay)).await;
    }

    if self.panics_on(&refresh_token) {
      panic!("provider blew up refreshing {refresh_token}");
    }

    let failing = self.fail_all.load(Ordering::SeqCst)
      || self.failing_tokens.lock().unwrap().contains(&refresh_token);
    if failing {
      return Err(ProviderError::Rejected { status: 400, body: "invalid_grant".into() });
    }

    let n = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
    Ok(RefreshedToken {
      access_token:  format!("refreshed-{n}"),
      expires_at:    Utc::now() + chrono::Duration::hours(1),
      refresh_token: None,
    })
  }

  async fn get_quota(&self, access_token: String) -> Result<DriveQuota, ProviderError> {
    self.quota_calls.fetch_add(1, Ordering::SeqCst);
    if self.panics_on(&access_token) {
      panic!("provider blew up reading quota for {access_token}");
    }
    self
      .quotas
      .lock()
      .unwrap()
      .get(&access_token)
      .copied()
      .ok_or_else(|| ProviderError::Transport("connection reset".into()))
  }

  async fn revoke(&self, token: String) -> Result<(), ProviderError> {
    self.revoked.lock().unwrap().push(token);
    Ok(())
  }
}

pub type Manager = SessionManager<SqliteStore, MockProvider>;

pub async fn manager_with(config: SessionConfig) -> (Arc<Manager>, Arc<SqliteStore>, Arc<MockProvider>) {
  let store = Arc::new(SqliteStore::open_in_memory().await.expect("in-memory store"));
  let provider = Arc::new(MockProvider::default());
  let manager = Arc::new(SessionManager::new(
    Arc::clone(&store),
    Arc::clone(&provider),
    config,
  ));
  (manager, store, provider)
}

pub async fn manager() -> (Arc<Manager>, Arc<SqliteStore>, Arc<MockProvider>) {
  manager_with(SessionConfig::default()).await
}
