mod common;

use std::time::Duration as StdDuration;

use chrono::{Duration, Utc};
use cvault_core::{session::TokenData, store::SessionStore};
use cvault_session::{SessionConfig, SweepScheduler};

use common::manager_with;

fn expiring(access: &str) -> TokenData {
  TokenData {
    access_token:  access.into(),
    refresh_token: Some(format!("{access}-refresh")),
    expires_at:    Utc::now() + Duration::minutes(1),
  }
}

#[tokio::test]
async fn quota_sweep_runs_on_first_tick_then_waits() {
  let (m, _, provider) = manager_with(SessionConfig {
    quota_interval_secs: 3_600,
    ..SessionConfig::default()
  })
  .await;
  m.create_or_update_session(1, expiring("a")).await.unwrap();
  provider.set_quota("refreshed-1", 100, 10);

  let mut scheduler = SweepScheduler::new(m.clone());

  let first = scheduler.tick().await;
  assert_eq!(first.refresh.processed, 1);
  assert_eq!(first.refresh.succeeded, 1);
  let quota = first.quota.expect("quota sweep due on first tick");
  assert_eq!(quota.succeeded, 1);

  let second = scheduler.tick().await;
  // Token is fresh now, so nothing is left to refresh.
  assert_eq!(second.refresh.processed, 0);
  assert!(second.quota.is_none());
  assert_eq!(provider.quota_queries(), 1);
}

#[tokio::test]
async fn spawned_scheduler_refreshes_and_shuts_down() {
  let (m, store, provider) = manager_with(SessionConfig {
    refresh_interval_secs: 3_600,
    ..SessionConfig::default()
  })
  .await;
  let session = m.create_or_update_session(1, expiring("a")).await.unwrap();

  // The first interval tick fires immediately.
  let handle = SweepScheduler::new(m.clone()).spawn();

  let deadline = tokio::time::Instant::now() + StdDuration::from_secs(5);
  while provider.refreshes() == 0 {
    assert!(tokio::time::Instant::now() < deadline, "scheduler never ticked");
    tokio::time::sleep(StdDuration::from_millis(10)).await;
  }

  assert!(!handle.is_finished());
  tokio::time::timeout(StdDuration::from_secs(5), handle.shutdown())
    .await
    .expect("shutdown completes");

  let stored = store.get_session(session.id).await.unwrap().unwrap();
  assert!(stored.access_token.starts_with("refreshed-"));
}

#[tokio::test]
async fn panicking_session_does_not_stop_later_ticks() {
  let (m, store, provider) = manager_with(SessionConfig {
    refresh_interval_secs: 1,
    ..SessionConfig::default()
  })
  .await;
  m.create_or_update_session(1, TokenData {
    access_token:  "bad".into(),
    refresh_token: Some("bad".into()),
    expires_at:    Utc::now() - Duration::minutes(1),
  })
  .await
  .unwrap();
  let good = m.create_or_update_session(2, expiring("good")).await.unwrap();
  provider.panic_on_token("bad");

  let handle = SweepScheduler::new(m.clone()).spawn();

  // The bad session is retried on every tick; seeing it twice proves the
  // task outlived the first panic.
  let deadline = tokio::time::Instant::now() + StdDuration::from_secs(10);
  while provider.refreshes() < 3 {
    assert!(tokio::time::Instant::now() < deadline, "scheduler stopped ticking");
    tokio::time::sleep(StdDuration::from_millis(20)).await;
  }

  assert!(!handle.is_finished());
  handle.shutdown().await;

  let stored = store.get_session(good.id).await.unwrap().unwrap();
  assert!(stored.access_token.starts_with("refreshed-"));
}
