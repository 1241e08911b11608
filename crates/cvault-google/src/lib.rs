//! Google OAuth 2.0 and Drive quota client.
//!
//! Implements [`OAuthProvider`](cvault_core::provider::OAuthProvider) against
//! Google's token, revoke, and Drive `about` endpoints.

pub mod config;
pub mod provider;
mod wire;

pub use config::GoogleConfig;
pub use provider::GoogleProvider;
