//! In-Memory Repository Implementations
//!
//! Reference store for tests and single-process deployments. The map-wide
//! mutex gives the per-user mutual exclusion the repository contract
//! requires; a production deployment supplies its own store (row locks or
//! an optimistic-concurrency check) behind the same trait.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::domain::audit::{AuditEvent, AuditSink};
use crate::domain::entity::enrollment::EnrollmentRecord;
use crate::domain::repository::EnrollmentRepository;
use crate::domain::value_object::UserId;
use crate::error::{TwoFactorError, TwoFactorResult};

/// In-memory enrollment store
#[derive(Default)]
pub struct InMemoryEnrollmentStore {
    records: Mutex<HashMap<UserId, EnrollmentRecord>>,
}

impl InMemoryEnrollmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> TwoFactorResult<std::sync::MutexGuard<'_, HashMap<UserId, EnrollmentRecord>>> {
        self.records
            .lock()
            .map_err(|_| TwoFactorError::Storage("Enrollment store lock poisoned".to_string()))
    }
}

impl EnrollmentRepository for InMemoryEnrollmentStore {
    async fn find(&self, user_id: &UserId) -> TwoFactorResult<Option<EnrollmentRecord>> {
        let records = self.lock()?;
        Ok(records.get(user_id).cloned())
    }

    async fn mutate<F, T>(&self, user_id: &UserId, f: F) -> TwoFactorResult<T>
    where
        F: FnOnce(&mut EnrollmentRecord) -> TwoFactorResult<T> + Send,
        T: Send,
    {
        let mut records = self.lock()?;

        // Work on a copy so a closure error leaves the stored record untouched
        let mut working = records
            .get(user_id)
            .cloned()
            .unwrap_or_else(|| EnrollmentRecord::new(*user_id));
        let out = f(&mut working)?;
        records.insert(*user_id, working);
        Ok(out)
    }
}

/// Audit sink that logs events through `tracing`
#[derive(Default)]
pub struct TracingAuditSink;

impl TracingAuditSink {
    pub fn new() -> Self {
        Self
    }
}

impl AuditSink for TracingAuditSink {
    async fn record(&self, event: AuditEvent) {
        tracing::info!(event = ?event, "Two-factor audit event");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::enrollment::EnrollmentState;

    #[tokio::test]
    async fn test_find_missing_is_none() {
        let store = InMemoryEnrollmentStore::new();
        assert!(store.find(&UserId::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_mutate_creates_lazily_and_persists() {
        let store = InMemoryEnrollmentStore::new();
        let user_id = UserId::new();

        let state = store
            .mutate(&user_id, |record| Ok(record.state()))
            .await
            .unwrap();
        assert_eq!(state, EnrollmentState::Disabled);
        assert!(store.find(&user_id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_mutate_error_aborts_write() {
        let store = InMemoryEnrollmentStore::new();
        let user_id = UserId::new();

        // Seed a record
        store
            .mutate(&user_id, |_record| Ok(()))
            .await
            .unwrap();
        let before = store.find(&user_id).await.unwrap().unwrap();

        let result: TwoFactorResult<()> = store
            .mutate(&user_id, |record| {
                record.mark_verified();
                Err(TwoFactorError::VerificationFailed)
            })
            .await;
        assert!(result.is_err());

        let after = store.find(&user_id).await.unwrap().unwrap();
        assert_eq!(before.last_verified_at, after.last_verified_at);
        assert!(after.last_verified_at.is_none());
    }
}
