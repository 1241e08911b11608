//! Error types for `cvault-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("unknown quota warning level: {0:?}")]
  UnknownWarningLevel(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
