//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::{Duration, TimeZone, Utc};
use cvault_core::{
  file::NewFileRecord,
  session::{CredentialSession, QuotaWarning, QuotaWarningLevel},
  store::{FileStore, SessionStore},
};
use uuid::Uuid;

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

// ─── Files ───────────────────────────────────────────────────────────────────

fn upload(owner_id: i64, hash: &str, name: &str) -> NewFileRecord {
  NewFileRecord {
    owner_id,
    content_hash: hash.into(),
    original_name: name.into(),
    display_name: name.into(),
    is_duplicate: false,
    duplicate_sequence: 0,
    canonical_record_id: None,
  }
}

#[tokio::test]
async fn insert_and_get_file() {
  let s = store().await;

  let record = s.insert_file(upload(1, "abc", "resume.pdf")).await.unwrap();
  assert!(record.is_active());

  let fetched = s.get_file(record.id).await.unwrap().unwrap();
  assert_eq!(fetched.id, record.id);
  assert_eq!(fetched.display_name, "resume.pdf");
  assert_eq!(fetched.duplicate_sequence, 0);
  assert!(fetched.canonical_record_id.is_none());
}

#[tokio::test]
async fn get_file_missing_returns_none() {
  let s = store().await;
  assert!(s.get_file(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn find_active_by_hash_is_scoped_and_ordered() {
  let s = store().await;

  let first = s.insert_file(upload(1, "abc", "a.pdf")).await.unwrap();
  let mut dup = upload(1, "abc", "a.pdf");
  dup.is_duplicate = true;
  dup.duplicate_sequence = 1;
  dup.canonical_record_id = Some(first.id);
  let second = s.insert_file(dup).await.unwrap();
  s.insert_file(upload(1, "other", "b.pdf")).await.unwrap();
  s.insert_file(upload(2, "abc", "a.pdf")).await.unwrap();

  let matches = s.find_active_by_hash(1, "abc".into()).await.unwrap();
  let ids: Vec<Uuid> = matches.iter().map(|r| r.id).collect();
  assert_eq!(ids, vec![first.id, second.id]);
  assert_eq!(matches[1].canonical_record_id, Some(first.id));
}

#[tokio::test]
async fn soft_delete_hides_from_hash_lookup() {
  let s = store().await;

  let record = s.insert_file(upload(1, "abc", "a.pdf")).await.unwrap();
  assert!(s.soft_delete_file(record.id).await.unwrap());
  // Second delete is a no-op.
  assert!(!s.soft_delete_file(record.id).await.unwrap());

  assert!(s.find_active_by_hash(1, "abc".into()).await.unwrap().is_empty());

  let fetched = s.get_file(record.id).await.unwrap().unwrap();
  assert!(fetched.deleted_at.is_some());

  assert!(s.list_files(1, false).await.unwrap().is_empty());
  assert_eq!(s.list_files(1, true).await.unwrap().len(), 1);
}

// ─── Sessions ────────────────────────────────────────────────────────────────

fn session(owner_id: i64, expires_in: Duration) -> CredentialSession {
  let now = Utc::now();
  CredentialSession {
    id: Uuid::new_v4(),
    owner_id,
    access_token: "access".into(),
    refresh_token: Some("refresh".into()),
    token_expires_at: now + expires_in,
    is_persistent: true,
    auto_refresh_enabled: true,
    is_active: true,
    persistent_session_id: Uuid::new_v4().to_string(),
    refresh_attempts: 0,
    max_refresh_failures: 3,
    last_refresh_at: None,
    deactivated_at: None,
    deactivated_reason: None,
    drive_quota_total: None,
    drive_quota_used: None,
    last_quota_check: None,
    quota_warning_level: QuotaWarningLevel::None,
    quota_warnings_sent: vec![],
    last_activity_at: None,
    created_at: now,
    updated_at: now,
  }
}

#[tokio::test]
async fn insert_and_get_session() {
  let s = store().await;
  let inserted = s.insert_session(session(1, Duration::hours(1))).await.unwrap();

  let by_id = s.get_session(inserted.id).await.unwrap().unwrap();
  assert_eq!(by_id.owner_id, 1);
  assert_eq!(by_id.refresh_token.as_deref(), Some("refresh"));
  assert!(by_id.is_active);

  let by_owner = s.get_session_by_owner(1).await.unwrap().unwrap();
  assert_eq!(by_owner.id, inserted.id);
  assert!(s.get_session_by_owner(2).await.unwrap().is_none());
}

#[tokio::test]
async fn second_session_for_owner_is_rejected() {
  let s = store().await;
  s.insert_session(session(1, Duration::hours(1))).await.unwrap();

  let err = s
    .insert_session(session(1, Duration::hours(1)))
    .await
    .unwrap_err();
  assert!(matches!(err, crate::Error::SessionOwnerTaken(1)));
}

#[tokio::test]
async fn other_constraint_failures_are_not_owner_conflicts() {
  let s = store().await;
  let first = s.insert_session(session(1, Duration::hours(1))).await.unwrap();

  // Different owner, colliding persistent id.
  let mut clash = session(2, Duration::hours(1));
  clash.persistent_session_id = first.persistent_session_id.clone();
  let err = s.insert_session(clash).await.unwrap_err();
  assert!(matches!(err, crate::Error::Database(_)), "got {err:?}");

  // Different owner, colliding primary key.
  let mut clash = session(3, Duration::hours(1));
  clash.id = first.id;
  let err = s.insert_session(clash).await.unwrap_err();
  assert!(matches!(err, crate::Error::Database(_)), "got {err:?}");

  assert!(s.get_session_by_owner(2).await.unwrap().is_none());
}

#[tokio::test]
async fn update_session_roundtrips_quota_fields() {
  let s = store().await;
  let mut sess = s.insert_session(session(1, Duration::hours(1))).await.unwrap();

  let at = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
  sess.drive_quota_total = Some(15_000_000_000);
  sess.drive_quota_used = Some(13_000_000_000);
  sess.last_quota_check = Some(at);
  sess.quota_warning_level = QuotaWarningLevel::Medium;
  sess.quota_warnings_sent = vec![QuotaWarning {
    timestamp:        at,
    old_level:        QuotaWarningLevel::None,
    new_level:        QuotaWarningLevel::Medium,
    usage_percentage: 86.67,
  }];
  sess.refresh_attempts = 2;
  s.update_session(sess.clone()).await.unwrap();

  let fetched = s.get_session(sess.id).await.unwrap().unwrap();
  assert_eq!(fetched.drive_quota_total, Some(15_000_000_000));
  assert_eq!(fetched.drive_quota_used, Some(13_000_000_000));
  assert_eq!(fetched.last_quota_check, Some(at));
  assert_eq!(fetched.quota_warning_level, QuotaWarningLevel::Medium);
  assert_eq!(fetched.quota_warnings_sent, sess.quota_warnings_sent);
  assert_eq!(fetched.refresh_attempts, 2);
}

#[tokio::test]
async fn update_missing_session_errors() {
  let s = store().await;
  let err = s
    .update_session(session(1, Duration::hours(1)))
    .await
    .unwrap_err();
  assert!(matches!(err, crate::Error::SessionNotFound(_)));
}

#[tokio::test]
async fn expiring_query_skips_inactive_and_fresh() {
  let s = store().await;

  let soon = s.insert_session(session(1, Duration::minutes(2))).await.unwrap();
  s.insert_session(session(2, Duration::hours(2))).await.unwrap();
  let mut gone = session(3, -Duration::minutes(1));
  gone.is_active = false;
  s.insert_session(gone).await.unwrap();

  let deadline = Utc::now() + Duration::minutes(5);
  let expiring = s.list_sessions_expiring_before(deadline).await.unwrap();
  assert_eq!(expiring.len(), 1);
  assert_eq!(expiring[0].id, soon.id);

  let active = s.list_active_sessions().await.unwrap();
  assert_eq!(active.len(), 2);
  assert!(active.iter().all(|a| a.is_active));
}
