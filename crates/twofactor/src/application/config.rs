//! Application Configuration
//!
//! Tunables for the two-factor application layer. All values are
//! reasonable defaults, not contractual constants.

use std::time::Duration;

/// Two-factor application configuration
#[derive(Debug, Clone)]
pub struct TwoFactorConfig {
    /// Issuer label shown in authenticator apps
    pub issuer: String,
    /// Length of delivered one-time codes
    pub code_length: usize,
    /// How long an open challenge stays valid
    pub challenge_ttl: Duration,
    /// Failed attempts allowed per challenge before it is invalidated
    pub max_attempts: u8,
    /// Backup codes per batch
    pub backup_code_count: usize,
    /// Length of each backup code
    pub backup_code_length: usize,
}

impl Default for TwoFactorConfig {
    fn default() -> Self {
        Self {
            issuer: "toolhub".to_string(),
            code_length: 6,
            challenge_ttl: Duration::from_secs(10 * 60),
            max_attempts: 5,
            backup_code_count: 10,
            backup_code_length: 10,
        }
    }
}

impl TwoFactorConfig {
    pub fn challenge_ttl_ms(&self) -> i64 {
        self.challenge_ttl.as_millis() as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TwoFactorConfig::default();
        assert_eq!(config.code_length, 6);
        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.challenge_ttl_ms(), 600_000);
    }
}
