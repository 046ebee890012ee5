//! Domain Services
//!
//! Pure code-generation and backup-code vault logic. No persistence,
//! no transport - callers own expiry and storage.

use chrono::Utc;

use platform::crypto::{random_alphabet_code, random_numeric_code};

use crate::domain::value_object::{BackupCode, TotpSecret, backup_code};
use crate::error::TwoFactorResult;

/// Generate the TOTP code for a secret at a unix timestamp (seconds).
/// Deterministic in its inputs.
pub fn generate_totp(secret: &TotpSecret, time: u64) -> TwoFactorResult<String> {
    secret.generate_at(time)
}

/// Verify a TOTP code at a unix timestamp, tolerating one step of clock
/// skew either side. Malformed input is a plain mismatch, never an error.
pub fn verify_totp(secret: &TotpSecret, code: &str, time: u64) -> bool {
    secret.check_at(code.trim(), time)
}

/// Verify a TOTP code against the current wall clock
pub fn verify_totp_now(secret: &TotpSecret, code: &str) -> bool {
    secret.check_now(code.trim())
}

/// Generate a random numeric one-time code for push-style channels.
/// No time derivation; the caller bounds its life via the pending challenge.
pub fn generate_random_code(length: usize) -> String {
    random_numeric_code(length)
}

/// A freshly generated backup-code batch
///
/// `plaintext` is handed to the caller exactly once for display;
/// only `codes` (salted hashes) may be persisted.
#[derive(Debug)]
pub struct BackupCodeBatch {
    pub plaintext: Vec<String>,
    pub codes: Vec<BackupCode>,
}

/// Generate a batch of recovery codes over a confusion-free alphabet
pub fn generate_backup_codes(count: usize, length: usize) -> BackupCodeBatch {
    let plaintext: Vec<String> = (0..count).map(|_| random_alphabet_code(length)).collect();
    let codes = plaintext.iter().map(|p| BackupCode::issue(p)).collect();
    BackupCodeBatch { plaintext, codes }
}

/// Consume a submitted backup code against the stored batch.
///
/// On the first unused match, marks exactly that entry used and returns
/// true. Used entries are permanently excluded; no match returns false.
pub fn consume_backup_code(codes: &mut [BackupCode], submitted: &str) -> bool {
    let normalized = backup_code::normalize(submitted);
    if normalized.is_empty() {
        return false;
    }

    for code in codes.iter_mut() {
        if !code.used && code.matches(&normalized) {
            code.mark_used(Utc::now());
            return true;
        }
    }
    false
}
