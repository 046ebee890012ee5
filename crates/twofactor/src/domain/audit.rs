//! Audit Events
//!
//! The manager reports security-relevant transitions to an injected sink.
//! Persistence format is the collaborator's business.

use serde::Serialize;

use crate::domain::value_object::{Method, UserId};

/// Security-relevant event emitted by the manager
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AuditEvent {
    SetupStarted { user_id: UserId, method: Method },
    CodeSent { user_id: UserId, method: Method },
    Enabled { user_id: UserId, method: Method },
    Disabled { user_id: UserId },
    VerificationSucceeded { user_id: UserId, used_backup_code: bool },
    VerificationFailed { user_id: UserId },
    BackupCodesRegenerated { user_id: UserId, count: usize },
}

/// Audit sink capability trait
///
/// Recording is best-effort from the manager's point of view; a sink that
/// cannot keep up must not fail user-facing operations.
#[trait_variant::make(AuditSink: Send)]
pub trait LocalAuditSink {
    async fn record(&self, event: AuditEvent);
}
