//! Two-Factor Authentication Backend Module
//!
//! Clean Architecture structure:
//! - `domain/` - Entities, value objects, domain services, repository traits
//! - `application/` - The manager, channel implementations, configuration
//! - `infra/` - In-memory store and tracing audit sink
//!
//! ## Features
//! - Multi-method 2FA: authenticator app (TOTP), email codes, messaging-bot codes
//! - Enrollment state machine: Disabled -> PendingSetup -> Enabled
//! - Single-use backup recovery codes (salted hashes, shown once)
//! - Attempt-count rate limiting on outstanding challenges
//!
//! ## Security Model
//! - A method is only enabled after the user proves possession of it
//! - One-time codes and backup codes are stored as salted SHA-256 hashes
//! - All record mutations run under per-user mutual exclusion
//! - Code delivery never happens while the per-user lock is held

pub mod application;
pub mod domain;
pub mod error;
pub mod infra;

// Re-exports for convenience
pub use application::config::TwoFactorConfig;
pub use application::manager::TwoFactorManager;
pub use error::{ErrorKind, TwoFactorError, TwoFactorResult};
pub use infra::memory::{InMemoryEnrollmentStore, TracingAuditSink};

// Convenience re-exports
pub mod config {
    pub use crate::application::config::*;
}

pub mod models {
    pub use crate::domain::entity::enrollment::*;
    pub use crate::domain::value_object::*;
}

pub mod channels {
    pub use crate::application::channel::*;
}

pub mod store {
    pub use crate::infra::memory::InMemoryEnrollmentStore as EnrollmentStore;
}
