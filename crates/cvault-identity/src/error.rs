//! Error type for `cvault-identity`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// The byte source could not be read to the end.
  #[error("hash computation failed: {0}")]
  HashComputationFailed(#[source] std::io::Error),

  /// The store could not answer the duplicate lookup. Never treated as
  /// "no duplicates".
  #[error("duplicate lookup failed: {0}")]
  DuplicateLookupFailed(#[source] Box<dyn std::error::Error + Send + Sync>),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
