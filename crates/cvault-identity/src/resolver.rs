//! [`DuplicateResolver`]: content-hash identity for uploads.

use std::{
  io::{self, Read},
  sync::Arc,
};

use cvault_core::{
  OwnerId,
  file::{DuplicateDecision, FileRecord},
  store::FileStore,
};

use crate::{
  Error, Result,
  hash::{DEFAULT_CHUNK_SIZE, hash_reader},
  naming::sequenced_name,
};

/// Decides canonical vs. duplicate status for incoming uploads.
///
/// Matching is always scoped to one owner and only ever sees active
/// (non-deleted) records.
pub struct DuplicateResolver<S> {
  store:      Arc<S>,
  chunk_size: usize,
}

impl<S> Clone for DuplicateResolver<S> {
  fn clone(&self) -> Self {
    Self { store: Arc::clone(&self.store), chunk_size: self.chunk_size }
  }
}

impl<S: FileStore> DuplicateResolver<S> {
  pub fn new(store: Arc<S>) -> Self {
    Self { store, chunk_size: DEFAULT_CHUNK_SIZE }
  }

  /// Override the read size used while hashing.
  pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
    self.chunk_size = chunk_size;
    self
  }

  /// Fingerprint `source` and decide how the upload relates to the owner's
  /// existing active files.
  ///
  /// Hashing runs inline on the calling task, so this is meant for sources
  /// that are already in memory. Plain byte slices work directly since
  /// `&[u8]` implements [`Read`]. Use
  /// [`resolve_blocking`](Self::resolve_blocking) for files and streams.
  pub async fn resolve<R: Read>(
    &self,
    owner_id: OwnerId,
    candidate_filename: &str,
    source: R,
  ) -> Result<DuplicateDecision> {
    let content_hash = hash_reader(source, self.chunk_size)?;
    self.decide_for(owner_id, candidate_filename, content_hash).await
  }

  /// Like [`resolve`](Self::resolve), but hashes on tokio's blocking pool so
  /// a slow or large source never stalls the async runtime.
  pub async fn resolve_blocking<R>(
    &self,
    owner_id: OwnerId,
    candidate_filename: &str,
    source: R,
  ) -> Result<DuplicateDecision>
  where
    R: Read + Send + 'static,
  {
    let chunk_size = self.chunk_size;
    let content_hash = tokio::task::spawn_blocking(move || hash_reader(source, chunk_size))
      .await
      .map_err(|e| Error::HashComputationFailed(io::Error::other(e)))??;
    self.decide_for(owner_id, candidate_filename, content_hash).await
  }

  async fn decide_for(
    &self,
    owner_id: OwnerId,
    candidate_filename: &str,
    content_hash: String,
  ) -> Result<DuplicateDecision> {
    let matches = self
      .store
      .find_active_by_hash(owner_id, content_hash.clone())
      .await
      .map_err(|e| Error::DuplicateLookupFailed(Box::new(e)))?;

    let decision = decide(candidate_filename, content_hash, &matches);
    tracing::debug!(
      owner_id,
      content_hash = %decision.content_hash,
      is_duplicate = decision.is_duplicate,
      sequence = decision.duplicate_sequence,
      "resolved upload identity"
    );
    Ok(decision)
  }
}

/// Pure decision step of [`DuplicateResolver::resolve`].
///
/// `active_matches` must be the owner's active records with this hash, oldest
/// first. The new sequence number is the number of active matches, so a
/// sequence freed by a soft delete can be handed out again.
pub fn decide(
  candidate_filename: &str,
  content_hash: String,
  active_matches: &[FileRecord],
) -> DuplicateDecision {
  let Some(earliest) = active_matches.first() else {
    return DuplicateDecision {
      is_duplicate: false,
      display_name: candidate_filename.to_owned(),
      duplicate_sequence: 0,
      canonical_record_id: None,
      content_hash,
    };
  };

  // Prefer the record holding sequence 0; fall back to the oldest survivor
  // when the canonical itself was deleted.
  let canonical = active_matches
    .iter()
    .find(|r| r.duplicate_sequence == 0)
    .unwrap_or(earliest);

  let next_sequence = u32::try_from(active_matches.len()).unwrap_or(u32::MAX);

  DuplicateDecision {
    is_duplicate: true,
    display_name: sequenced_name(candidate_filename, next_sequence),
    duplicate_sequence: next_sequence,
    canonical_record_id: Some(canonical.id),
    content_hash,
  }
}

#[cfg(test)]
mod tests {
  use chrono::Utc;
  use uuid::Uuid;

  use super::*;

  fn record(sequence: u32) -> FileRecord {
    FileRecord {
      id:                  Uuid::new_v4(),
      owner_id:            1,
      content_hash:        "h".into(),
      original_name:       "resume.pdf".into(),
      display_name:        "resume.pdf".into(),
      is_duplicate:        sequence > 0,
      duplicate_sequence:  sequence,
      canonical_record_id: None,
      created_at:          Utc::now(),
      deleted_at:          None,
    }
  }

  #[test]
  fn no_matches_is_canonical() {
    let d = decide("resume.pdf", "h".into(), &[]);
    assert!(!d.is_duplicate);
    assert_eq!(d.display_name, "resume.pdf");
    assert_eq!(d.duplicate_sequence, 0);
    assert!(d.canonical_record_id.is_none());
  }

  #[test]
  fn sequence_counts_active_matches() {
    let matches = vec![record(0), record(1), record(2)];
    let d = decide("resume.pdf", "h".into(), &matches);
    assert!(d.is_duplicate);
    assert_eq!(d.duplicate_sequence, 3);
    assert_eq!(d.display_name, "resume (3).pdf");
    assert_eq!(d.canonical_record_id, Some(matches[0].id));
  }

  #[test]
  fn deleted_canonical_falls_back_to_oldest_survivor() {
    let matches = vec![record(1), record(2)];
    let d = decide("resume.pdf", "h".into(), &matches);
    assert_eq!(d.canonical_record_id, Some(matches[0].id));
    assert_eq!(d.duplicate_sequence, 2);
  }
}
