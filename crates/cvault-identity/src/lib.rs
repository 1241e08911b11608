//! Duplicate identity resolution for uploaded files.
//!
//! Given an owner, a candidate filename and a byte source, the
//! [`DuplicateResolver`] fingerprints the content and decides whether the
//! upload is the canonical copy of that content or a numbered duplicate of an
//! existing active record. It never persists anything itself; the caller
//! stores the record built from the returned
//! [`DuplicateDecision`](cvault_core::file::DuplicateDecision).

pub mod error;
pub mod hash;
pub mod naming;
mod resolver;

pub use error::{Error, Result};
pub use resolver::{DuplicateResolver, decide};
