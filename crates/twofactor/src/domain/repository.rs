//! Repository Traits
//!
//! Interfaces for data persistence. Implementation is in infrastructure
//! layer (or supplied by the embedding application).

use crate::domain::entity::enrollment::EnrollmentRecord;
use crate::domain::value_object::UserId;
use crate::error::TwoFactorResult;

/// Enrollment record repository trait
///
/// `mutate` is the concurrency boundary: the store must load (or lazily
/// create) the user's record, apply the closure, and persist the result as
/// one atomic unit under per-user mutual exclusion. Two concurrent verify
/// attempts must serialize here so a single-use challenge or backup code
/// cannot be spent twice.
#[trait_variant::make(EnrollmentRepository: Send)]
pub trait LocalEnrollmentRepository {
    /// Read a record without mutating (None if the user has never touched 2FA)
    async fn find(&self, user_id: &UserId) -> TwoFactorResult<Option<EnrollmentRecord>>;

    /// Load-or-create the record and apply `f` under per-user mutual exclusion.
    /// The closure's error aborts the write; the record is only persisted on Ok.
    async fn mutate<F, T>(&self, user_id: &UserId, f: F) -> TwoFactorResult<T>
    where
        F: FnOnce(&mut EnrollmentRecord) -> TwoFactorResult<T> + Send,
        T: Send;
}
