//! Two-Factor Error Types
//!
//! Domain-specific error variants plus the [`ErrorKind`] classification the
//! controller layer maps onto its transport (HTTP status codes or otherwise).

use serde::Serialize;
use thiserror::Error;

use crate::domain::entity::enrollment::EnrollmentState;

/// Two-factor result type alias
pub type TwoFactorResult<T> = Result<T, TwoFactorError>;

/// Two-factor error variants
///
/// Every manager operation returns one of these; persistence and transport
/// errors are wrapped, never leaked raw past the manager boundary.
#[derive(Debug, Error)]
pub enum TwoFactorError {
    /// Operation attempted from a state that forbids it
    #[error("Operation not allowed while two-factor state is {0}")]
    InvalidState(EnrollmentState),

    /// Verify called with no outstanding challenge
    #[error("No verification challenge is outstanding")]
    ChallengeNotFound,

    /// The outstanding challenge passed its expiry
    #[error("Verification challenge expired")]
    ChallengeExpired,

    /// Attempt ceiling reached on the outstanding challenge
    #[error("Too many failed attempts; request a new code")]
    AttemptsExhausted,

    /// Code or backup code mismatch - a normal negative outcome
    #[error("Invalid verification code")]
    VerificationFailed,

    /// Destination address or handle failed validation
    #[error("Invalid destination: {0}")]
    InvalidDestination(String),

    /// Push-channel delivery failed; the stored challenge stays valid
    #[error("Code delivery failed: {0}")]
    Transport(String),

    /// Persistence error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error classification
///
/// Deliberately transport-agnostic: `status_code()` gives the conventional
/// HTTP mapping for controllers that want it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[non_exhaustive]
pub enum ErrorKind {
    BadRequest,
    Unauthorized,
    Conflict,
    Gone,
    TooManyRequests,
    ServiceUnavailable,
    InternalServerError,
}

impl ErrorKind {
    pub const fn status_code(&self) -> u16 {
        match self {
            ErrorKind::BadRequest => 400,
            ErrorKind::Unauthorized => 401,
            ErrorKind::Conflict => 409,
            ErrorKind::Gone => 410,
            ErrorKind::TooManyRequests => 429,
            ErrorKind::ServiceUnavailable => 503,
            ErrorKind::InternalServerError => 500,
        }
    }
}

impl TwoFactorError {
    /// Get the ErrorKind for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            TwoFactorError::InvalidState(_) => ErrorKind::Conflict,
            TwoFactorError::ChallengeNotFound | TwoFactorError::ChallengeExpired => ErrorKind::Gone,
            TwoFactorError::AttemptsExhausted => ErrorKind::TooManyRequests,
            TwoFactorError::VerificationFailed => ErrorKind::Unauthorized,
            TwoFactorError::InvalidDestination(_) => ErrorKind::BadRequest,
            TwoFactorError::Transport(_) => ErrorKind::ServiceUnavailable,
            TwoFactorError::Storage(_) | TwoFactorError::Internal(_) => {
                ErrorKind::InternalServerError
            }
        }
    }

    /// Log the error with appropriate level
    pub fn log(&self) {
        match self {
            TwoFactorError::Storage(msg) => {
                tracing::error!(message = %msg, "Two-factor storage error");
            }
            TwoFactorError::Internal(msg) => {
                tracing::error!(message = %msg, "Two-factor internal error");
            }
            TwoFactorError::Transport(msg) => {
                tracing::error!(message = %msg, "Two-factor code delivery failed");
            }
            TwoFactorError::VerificationFailed => {
                tracing::warn!("Invalid two-factor code attempt");
            }
            TwoFactorError::AttemptsExhausted => {
                tracing::warn!("Two-factor attempt ceiling reached");
            }
            _ => {
                tracing::debug!(error = %self, "Two-factor error");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        assert_eq!(
            TwoFactorError::ChallengeExpired.kind(),
            ErrorKind::Gone
        );
        assert_eq!(
            TwoFactorError::AttemptsExhausted.kind().status_code(),
            429
        );
        assert_eq!(
            TwoFactorError::InvalidState(EnrollmentState::Disabled).kind(),
            ErrorKind::Conflict
        );
    }
}
