//! Lifecycle management for long-lived OAuth credential sessions.
//!
//! [`SessionManager`] owns creation, refresh-if-needed with failure
//! accounting and auto-deactivation, revocation, and storage-quota polling
//! with threshold alerts. [`SweepScheduler`] drives the periodic refresh and
//! quota sweeps on a background task.

mod locks;

pub mod config;
pub mod error;
pub mod manager;
pub mod outcome;
pub mod quota;
pub mod scheduler;
pub mod status;

pub use config::{QuotaThresholds, SessionConfig};
pub use error::{Error, Result};
pub use manager::SessionManager;
pub use outcome::{RefreshOutcome, SweepReport};
pub use scheduler::{SchedulerHandle, SweepScheduler, TickReport};
pub use status::SessionStatus;
