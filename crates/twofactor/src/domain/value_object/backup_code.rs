//! Backup Code Value Object
//!
//! A single stored recovery code. Only the salted SHA-256 hash is kept;
//! the plaintext is returned once at generation time and never again.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use platform::crypto::{constant_time_eq, random_bytes, salted_sha256};

/// Salt length for stored code hashes
const SALT_LEN: usize = 16;

/// A single-use hashed recovery code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupCode {
    salt: Vec<u8>,
    hash: Vec<u8>,
    /// Once true, the code is permanently spent
    pub used: bool,
    pub used_at: Option<DateTime<Utc>>,
}

impl BackupCode {
    /// Hash a freshly generated plaintext code for storage
    pub fn issue(plaintext: &str) -> Self {
        let salt = random_bytes(SALT_LEN);
        let hash = salted_sha256(&salt, normalize(plaintext).as_bytes()).to_vec();
        Self {
            salt,
            hash,
            used: false,
            used_at: None,
        }
    }

    /// Whether a submitted code matches this entry (ignores the used flag)
    pub fn matches(&self, submitted: &str) -> bool {
        let candidate = salted_sha256(&self.salt, normalize(submitted).as_bytes());
        constant_time_eq(&candidate, &self.hash)
    }

    /// Permanently spend this code
    pub fn mark_used(&mut self, now: DateTime<Utc>) {
        self.used = true;
        self.used_at = Some(now);
    }
}

/// Normalize a submitted code: strip separators and whitespace, uppercase.
/// Codes survive being read over the phone or pasted with dashes.
pub fn normalize(code: &str) -> String {
    code.chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect::<String>()
        .to_uppercase()
}
