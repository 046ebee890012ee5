//! TOTP Secret Value Object
//!
//! Wraps a shared TOTP secret for the authenticator method.
//! Uses Google Authenticator compatible settings: SHA-1, 6 digits,
//! 30-second step, clock-skew tolerance of one step either side.

use serde::{Deserialize, Serialize};
use totp_rs::{Algorithm, Secret, TOTP};

use crate::error::{TwoFactorError, TwoFactorResult};

/// TOTP configuration constants
const TOTP_DIGITS: usize = 6;
const TOTP_STEP: u64 = 30;
const TOTP_SKEW: u8 = 1;

/// TOTP secret for the authenticator method
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TotpSecret {
    /// Base32-encoded secret
    secret_base32: String,
}

impl TotpSecret {
    /// Generate a new random TOTP secret
    pub fn generate() -> Self {
        let secret = Secret::generate_secret();
        Self {
            secret_base32: secret.to_encoded().to_string(),
        }
    }

    /// Create from a base32-encoded string (from storage)
    pub fn from_base32(secret: impl Into<String>) -> TwoFactorResult<Self> {
        let secret_str = secret.into();
        // Validate by trying to decode
        Secret::Encoded(secret_str.clone())
            .to_bytes()
            .map_err(|e| TwoFactorError::Internal(format!("Invalid TOTP secret: {:?}", e)))?;

        Ok(Self {
            secret_base32: secret_str,
        })
    }

    /// Get the base32-encoded secret for storage or manual entry
    pub fn as_base32(&self) -> &str {
        &self.secret_base32
    }

    /// Number of seconds in one TOTP time step
    pub fn step() -> u64 {
        TOTP_STEP
    }

    /// Create a TOTP instance for this secret
    fn to_totp(&self, issuer: Option<String>, account_name: String) -> TwoFactorResult<TOTP> {
        let secret = Secret::Encoded(self.secret_base32.clone());

        TOTP::new(
            Algorithm::SHA1,
            TOTP_DIGITS,
            TOTP_SKEW,
            TOTP_STEP,
            secret
                .to_bytes()
                .map_err(|e| TwoFactorError::Internal(format!("Invalid TOTP secret: {:?}", e)))?,
            issuer,
            account_name,
        )
        .map_err(|e| TwoFactorError::Internal(format!("Failed to create TOTP: {}", e)))
    }

    /// TOTP instance with no enrollment labels, for code math only
    fn bare_totp(&self) -> TwoFactorResult<TOTP> {
        self.to_totp(None, String::new())
    }

    /// Generate the code for a given unix timestamp (seconds)
    pub fn generate_at(&self, time: u64) -> TwoFactorResult<String> {
        Ok(self.bare_totp()?.generate(time))
    }

    /// Check a code against a given unix timestamp, with skew tolerance
    pub fn check_at(&self, code: &str, time: u64) -> bool {
        self.bare_totp()
            .map(|totp| totp.check(code, time))
            .unwrap_or(false)
    }

    /// Check a code against the current wall clock
    pub fn check_now(&self, code: &str) -> bool {
        self.bare_totp()
            .map(|totp| totp.check_current(code).unwrap_or(false))
            .unwrap_or(false)
    }

    /// Get the otpauth:// URL for manual enrollment
    pub fn otpauth_url(&self, issuer: &str, account_name: &str) -> TwoFactorResult<String> {
        let totp = self.to_totp(Some(issuer.to_string()), account_name.to_string())?;
        Ok(totp.get_url())
    }

    /// Generate the enrollment QR code as base64-encoded PNG
    pub fn qr_code_base64(&self, issuer: &str, account_name: &str) -> TwoFactorResult<String> {
        let totp = self.to_totp(Some(issuer.to_string()), account_name.to_string())?;
        totp.get_qr_base64()
            .map_err(|e| TwoFactorError::Internal(format!("Failed to generate QR code: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_totp_secret_generate() {
        let secret = TotpSecret::generate();
        assert!(!secret.as_base32().is_empty());
    }

    #[test]
    fn test_totp_generate_and_check_at_time() {
        let secret = TotpSecret::generate();
        let time = 1_700_000_000;

        let code = secret.generate_at(time).unwrap();
        assert_eq!(code.len(), 6);
        assert!(secret.check_at(&code, time));

        // Wrong code should fail
        assert!(!secret.check_at("000000", time));
    }

    #[test]
    fn test_totp_skew_window() {
        let secret = TotpSecret::generate();
        let time = 1_700_000_000;
        let step = TotpSecret::step();

        let code = secret.generate_at(time).unwrap();
        // One step either side is accepted
        assert!(secret.check_at(&code, time - step));
        assert!(secret.check_at(&code, time + step));
        // Two steps away is rejected
        assert!(!secret.check_at(&code, time - 2 * step));
        assert!(!secret.check_at(&code, time + 2 * step));
    }

    #[test]
    fn test_totp_secret_from_base32() {
        let secret = TotpSecret::generate();
        let base32 = secret.as_base32().to_string();

        let restored = TotpSecret::from_base32(base32).unwrap();
        assert_eq!(secret, restored);
    }

    #[test]
    fn test_totp_provisioning_payloads() {
        let secret = TotpSecret::generate();
        let url = secret.otpauth_url("toolhub", "alice").unwrap();
        assert!(url.starts_with("otpauth://totp/"));

        let qr = secret.qr_code_base64("toolhub", "alice").unwrap();
        assert!(!qr.is_empty());
    }
}
