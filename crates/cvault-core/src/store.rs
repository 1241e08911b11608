//! The `FileStore` and `SessionStore` traits.
//!
//! Both are implemented by storage backends (e.g. `cvault-store-sqlite`). The
//! identity resolver and the session manager depend on these abstractions,
//! not on any concrete backend.

use std::future::Future;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
  OwnerId,
  file::{FileRecord, NewFileRecord},
  session::CredentialSession,
};

// ─── Files ───────────────────────────────────────────────────────────────────

/// Persistence for uploaded file records.
///
/// Soft-deleted records stay in the store. Reads that feed duplicate
/// detection must exclude them.
pub trait FileStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Persist a new record. `id` and `created_at` are set by the store.
  fn insert_file(
    &self,
    input: NewFileRecord,
  ) -> impl Future<Output = Result<FileRecord, Self::Error>> + Send + '_;

  /// Retrieve a record by id, deleted or not. Returns `None` if not found.
  fn get_file(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<FileRecord>, Self::Error>> + Send + '_;

  /// All active records of `owner_id` with the given content hash, oldest
  /// first.
  fn find_active_by_hash(
    &self,
    owner_id: OwnerId,
    content_hash: String,
  ) -> impl Future<Output = Result<Vec<FileRecord>, Self::Error>> + Send + '_;

  /// All records of `owner_id`, oldest first.
  fn list_files(
    &self,
    owner_id: OwnerId,
    include_deleted: bool,
  ) -> impl Future<Output = Result<Vec<FileRecord>, Self::Error>> + Send + '_;

  /// Stamp `deleted_at` on an active record. Returns `false` if the record
  /// does not exist or is already deleted.
  fn soft_delete_file(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;
}

// ─── Sessions ────────────────────────────────────────────────────────────────

/// Persistence for credential sessions.
///
/// Each write replaces a whole session row, so a single session update is a
/// single commit.
pub trait SessionStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Persist a freshly built session. Fails if its owner already has one.
  fn insert_session(
    &self,
    session: CredentialSession,
  ) -> impl Future<Output = Result<CredentialSession, Self::Error>> + Send + '_;

  /// Overwrite every mutable field of an existing session.
  fn update_session(
    &self,
    session: CredentialSession,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn get_session(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<CredentialSession>, Self::Error>>
  + Send
  + '_;

  fn get_session_by_owner(
    &self,
    owner_id: OwnerId,
  ) -> impl Future<Output = Result<Option<CredentialSession>, Self::Error>>
  + Send
  + '_;

  /// Active sessions whose token expires at or before `deadline`.
  fn list_sessions_expiring_before(
    &self,
    deadline: DateTime<Utc>,
  ) -> impl Future<Output = Result<Vec<CredentialSession>, Self::Error>>
  + Send
  + '_;

  fn list_active_sessions(
    &self,
  ) -> impl Future<Output = Result<Vec<CredentialSession>, Self::Error>>
  + Send
  + '_;
}
