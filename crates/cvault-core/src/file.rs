//! File records: the persisted identity of an uploaded resume file.
//!
//! Records are never physically removed by this core. Deletion is logical
//! (`deleted_at`), and every duplicate lookup filters soft-deleted rows out at
//! read time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::OwnerId;

// ─── FileRecord ──────────────────────────────────────────────────────────────

/// A stored file belonging to one owner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
  /// Assigned by the store.
  pub id:                  Uuid,
  pub owner_id:            OwnerId,
  /// Lowercase hex SHA-256 of the full file contents.
  pub content_hash:        String,
  /// Name as uploaded.
  pub original_name:       String,
  /// Name shown to the user; carries a ` (n)` suffix for duplicates.
  pub display_name:        String,
  pub is_duplicate:        bool,
  /// `0` for the canonical record of a hash, positive for duplicates.
  pub duplicate_sequence:  u32,
  /// The canonical record this one duplicates; `None` for the canonical.
  pub canonical_record_id: Option<Uuid>,
  /// Server-assigned; defines creation order among siblings.
  pub created_at:          DateTime<Utc>,
  pub deleted_at:          Option<DateTime<Utc>>,
}

impl FileRecord {
  pub fn is_active(&self) -> bool { self.deleted_at.is_none() }
}

// ─── NewFileRecord ───────────────────────────────────────────────────────────

/// Input to [`crate::store::FileStore::insert_file`].
/// `id` and `created_at` are always set by the store.
#[derive(Debug, Clone)]
pub struct NewFileRecord {
  pub owner_id:            OwnerId,
  pub content_hash:        String,
  pub original_name:       String,
  pub display_name:        String,
  pub is_duplicate:        bool,
  pub duplicate_sequence:  u32,
  pub canonical_record_id: Option<Uuid>,
}

impl NewFileRecord {
  /// Build the record to persist for an upload from the resolver's decision.
  pub fn from_decision(
    owner_id: OwnerId,
    original_name: impl Into<String>,
    decision: &DuplicateDecision,
  ) -> Self {
    Self {
      owner_id,
      content_hash: decision.content_hash.clone(),
      original_name: original_name.into(),
      display_name: decision.display_name.clone(),
      is_duplicate: decision.is_duplicate,
      duplicate_sequence: decision.duplicate_sequence,
      canonical_record_id: decision.canonical_record_id,
    }
  }
}

// ─── DuplicateDecision ───────────────────────────────────────────────────────

/// How an incoming upload relates to the owner's existing active files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateDecision {
  pub is_duplicate:        bool,
  pub display_name:        String,
  pub duplicate_sequence:  u32,
  pub canonical_record_id: Option<Uuid>,
  pub content_hash:        String,
}
