//! Enrollment Entity
//!
//! Per-user two-factor state. One record per user, created lazily on the
//! first 2FA-related call and never hard-deleted: disabling clears the
//! credential material but the record persists for audit continuity.
//!
//! All mutations go through entity methods so the invariants hold at one
//! place: `enabled` implies a secret and an active method, at most one
//! pending challenge is outstanding, used backup codes stay used.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use platform::crypto::{constant_time_eq, random_bytes, salted_sha256};

use crate::domain::value_object::{BackupCode, Destination, Method, TotpSecret, UserId};

/// Credential material bound to the active method
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MethodSecret {
    /// Shared secret for the authenticator method
    Totp(TotpSecret),
    /// Validated delivery address for a push-style method
    Destination(Destination),
}

impl MethodSecret {
    pub fn as_totp(&self) -> Option<&TotpSecret> {
        match self {
            MethodSecret::Totp(secret) => Some(secret),
            MethodSecret::Destination(_) => None,
        }
    }

    pub fn as_destination(&self) -> Option<&Destination> {
        match self {
            MethodSecret::Totp(_) => None,
            MethodSecret::Destination(dest) => Some(dest),
        }
    }
}

/// Derived enrollment state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrollmentState {
    /// No method provisioned
    Disabled,
    /// Method provisioned, possession not yet proven
    PendingSetup,
    /// Possession proven; 2FA active
    Enabled,
}

impl fmt::Display for EnrollmentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EnrollmentState::Disabled => "disabled",
            EnrollmentState::PendingSetup => "pending_setup",
            EnrollmentState::Enabled => "enabled",
        };
        f.write_str(s)
    }
}

/// Salt length for stored challenge code hashes
const CHALLENGE_SALT_LEN: usize = 16;

/// Transient proof request opened by setup or send_code
///
/// For push-style methods the issued code is stored as a salted hash.
/// For the authenticator method no code is stored - the device computes
/// it - so the challenge only carries expiry and attempt accounting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingChallenge {
    code_salt: Option<Vec<u8>>,
    code_hash: Option<Vec<u8>>,
    pub expires_at_ms: i64,
    pub attempt_count: u8,
    pub created_at: DateTime<Utc>,
}

impl PendingChallenge {
    /// Open a challenge carrying a delivered one-time code
    pub fn for_code(code: &str, ttl_ms: i64) -> Self {
        let salt = random_bytes(CHALLENGE_SALT_LEN);
        let hash = salted_sha256(&salt, code.as_bytes()).to_vec();
        let now = Utc::now();
        Self {
            code_salt: Some(salt),
            code_hash: Some(hash),
            expires_at_ms: now.timestamp_millis() + ttl_ms,
            attempt_count: 0,
            created_at: now,
        }
    }

    /// Open a challenge for the authenticator method (no stored code)
    pub fn for_authenticator(ttl_ms: i64) -> Self {
        let now = Utc::now();
        Self {
            code_salt: None,
            code_hash: None,
            expires_at_ms: now.timestamp_millis() + ttl_ms,
            attempt_count: 0,
            created_at: now,
        }
    }

    /// Check if the challenge has expired
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp_millis() > self.expires_at_ms
    }

    /// Whether a delivered code is stored on this challenge
    pub fn has_code(&self) -> bool {
        self.code_hash.is_some()
    }

    /// Compare a submitted code against the stored hash
    pub fn matches_code(&self, submitted: &str) -> bool {
        match (&self.code_salt, &self.code_hash) {
            (Some(salt), Some(hash)) => {
                let candidate = salted_sha256(salt, submitted.trim().as_bytes());
                constant_time_eq(&candidate, hash)
            }
            _ => false,
        }
    }
}

/// Per-user two-factor enrollment record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrollmentRecord {
    pub user_id: UserId,
    /// True only after a successful verification during setup
    pub enabled: bool,
    pub active_method: Option<Method>,
    pub secret: Option<MethodSecret>,
    pub backup_codes: Vec<BackupCode>,
    pub pending_challenge: Option<PendingChallenge>,
    pub last_verified_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EnrollmentRecord {
    /// Create a fresh record (lazily, on first 2FA-related call)
    pub fn new(user_id: UserId) -> Self {
        let now = Utc::now();
        Self {
            user_id,
            enabled: false,
            active_method: None,
            secret: None,
            backup_codes: Vec::new(),
            pending_challenge: None,
            last_verified_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Derived state machine position
    pub fn state(&self) -> EnrollmentState {
        if self.enabled {
            EnrollmentState::Enabled
        } else if self.secret.is_some() {
            EnrollmentState::PendingSetup
        } else {
            EnrollmentState::Disabled
        }
    }

    /// Count of backup codes not yet spent
    pub fn backup_codes_remaining(&self) -> usize {
        self.backup_codes.iter().filter(|c| !c.used).count()
    }

    /// Begin setup for a method: store the secret and open the challenge.
    /// Replaces any previous provisioning or outstanding challenge.
    pub fn begin_setup(&mut self, method: Method, secret: MethodSecret, challenge: PendingChallenge) {
        self.active_method = Some(method);
        self.secret = Some(secret);
        self.pending_challenge = Some(challenge);
        self.enabled = false;
        self.updated_at = Utc::now();
    }

    /// Replace the outstanding challenge (new expiry, attempt count reset)
    pub fn refresh_challenge(&mut self, challenge: PendingChallenge) {
        self.pending_challenge = Some(challenge);
        self.updated_at = Utc::now();
    }

    /// Consume the outstanding challenge
    pub fn clear_challenge(&mut self) {
        self.pending_challenge = None;
        self.updated_at = Utc::now();
    }

    /// Count a failed verification attempt against the open challenge
    pub fn record_failed_attempt(&mut self) {
        if let Some(challenge) = self.pending_challenge.as_mut() {
            challenge.attempt_count = challenge.attempt_count.saturating_add(1);
        }
        self.updated_at = Utc::now();
    }

    /// Activate the provisioned method after possession is proven.
    /// No-op if no secret is stored; `enabled` never holds without one.
    pub fn enable(&mut self) {
        if self.secret.is_some() && self.active_method.is_some() {
            self.enabled = true;
            self.updated_at = Utc::now();
        }
    }

    /// Record a successful verification
    pub fn mark_verified(&mut self) {
        let now = Utc::now();
        self.last_verified_at = Some(now);
        self.updated_at = now;
    }

    /// Clear all credential material. The record itself persists.
    pub fn reset(&mut self) {
        self.enabled = false;
        self.active_method = None;
        self.secret = None;
        self.backup_codes.clear();
        self.pending_challenge = None;
        self.updated_at = Utc::now();
    }

    /// Replace the backup-code batch; any prior batch is invalidated
    pub fn replace_backup_codes(&mut self, codes: Vec<BackupCode>) {
        self.backup_codes = codes;
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn totp_secret() -> MethodSecret {
        MethodSecret::Totp(TotpSecret::generate())
    }

    #[test]
    fn test_new_record_is_disabled() {
        let record = EnrollmentRecord::new(UserId::new());
        assert_eq!(record.state(), EnrollmentState::Disabled);
        assert!(record.pending_challenge.is_none());
        assert!(record.last_verified_at.is_none());
    }

    #[test]
    fn test_begin_setup_transitions_to_pending() {
        let mut record = EnrollmentRecord::new(UserId::new());
        record.begin_setup(
            Method::Authenticator,
            totp_secret(),
            PendingChallenge::for_authenticator(600_000),
        );

        assert_eq!(record.state(), EnrollmentState::PendingSetup);
        assert!(record.pending_challenge.is_some());
    }

    #[test]
    fn test_begin_setup_replaces_previous_challenge() {
        let mut record = EnrollmentRecord::new(UserId::new());
        record.begin_setup(
            Method::Email,
            MethodSecret::Destination(Destination::email("a@example.com").unwrap()),
            PendingChallenge::for_code("111111", 600_000),
        );
        record.record_failed_attempt();
        assert_eq!(record.pending_challenge.as_ref().unwrap().attempt_count, 1);

        // Restarting setup opens a fresh challenge
        record.begin_setup(
            Method::Email,
            MethodSecret::Destination(Destination::email("a@example.com").unwrap()),
            PendingChallenge::for_code("222222", 600_000),
        );
        let challenge = record.pending_challenge.as_ref().unwrap();
        assert_eq!(challenge.attempt_count, 0);
        assert!(challenge.matches_code("222222"));
        assert!(!challenge.matches_code("111111"));
    }

    #[test]
    fn test_enable_requires_secret() {
        let mut record = EnrollmentRecord::new(UserId::new());
        record.enable();
        assert_eq!(record.state(), EnrollmentState::Disabled);

        record.begin_setup(
            Method::Authenticator,
            totp_secret(),
            PendingChallenge::for_authenticator(600_000),
        );
        record.enable();
        assert_eq!(record.state(), EnrollmentState::Enabled);
        assert!(record.secret.is_some());
        assert!(record.active_method.is_some());
    }

    #[test]
    fn test_reset_clears_material_keeps_record() {
        let mut record = EnrollmentRecord::new(UserId::new());
        record.begin_setup(
            Method::Authenticator,
            totp_secret(),
            PendingChallenge::for_authenticator(600_000),
        );
        record.enable();
        record.replace_backup_codes(vec![BackupCode::issue("ABCD2345EF")]);

        record.reset();
        assert_eq!(record.state(), EnrollmentState::Disabled);
        assert!(record.secret.is_none());
        assert!(record.active_method.is_none());
        assert!(record.backup_codes.is_empty());
        assert!(record.pending_challenge.is_none());
    }

    #[test]
    fn test_challenge_expiry() {
        let live = PendingChallenge::for_code("123456", 600_000);
        assert!(!live.is_expired());

        let expired = PendingChallenge::for_code("123456", -1_000);
        assert!(expired.is_expired());
    }

    #[test]
    fn test_authenticator_challenge_has_no_code() {
        let challenge = PendingChallenge::for_authenticator(600_000);
        assert!(!challenge.has_code());
        assert!(!challenge.matches_code("123456"));
    }

    #[test]
    fn test_backup_codes_remaining() {
        let mut record = EnrollmentRecord::new(UserId::new());
        let mut codes = vec![BackupCode::issue("AAAA"), BackupCode::issue("BBBB")];
        codes[0].mark_used(Utc::now());
        record.replace_backup_codes(codes);
        assert_eq!(record.backup_codes_remaining(), 1);
    }
}
