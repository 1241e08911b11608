//! Core types and trait definitions for the cvault resume backend.
//!
//! This crate is deliberately free of HTTP and database dependencies. It
//! describes the records the identity resolver and the session manager work
//! on, and the collaborators (persistence store, OAuth provider) they consume.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod error;
pub mod file;
pub mod provider;
pub mod session;
pub mod store;

pub use error::{Error, Result};

/// Identifier of the user that owns files and sessions. Users live outside
/// this core; only their numeric id is referenced.
pub type OwnerId = i64;
