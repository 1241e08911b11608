//! Error type for `cvault-session`.
//!
//! Provider failures are not errors here: they surface as
//! [`RefreshOutcome`](crate::RefreshOutcome) values or as a missing quota
//! snapshot. Only store failures and unknown sessions are errors.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  #[error("credential session not found: {0}")]
  SessionNotFound(Uuid),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("invalid session config: {0}")]
  InvalidConfig(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

pub(crate) fn store_err<E>(e: E) -> Error
where
  E: std::error::Error + Send + Sync + 'static,
{
  Error::Store(Box::new(e))
}
