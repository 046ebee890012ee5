//! Destination Value Object
//!
//! A validated delivery address for push-style methods: an email address
//! or a messaging handle. Basic validation only - proof of control happens
//! through code verification, not here.

use serde::{Deserialize, Serialize};

use crate::error::{TwoFactorError, TwoFactorResult};

/// Maximum email length (per RFC 5321)
const EMAIL_MAX_LENGTH: usize = 254;
/// Maximum messaging handle length
const HANDLE_MAX_LENGTH: usize = 64;

/// Validated delivery address for a push-style method
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Destination(String);

impl Destination {
    /// Create a validated email destination
    pub fn email(raw: impl Into<String>) -> TwoFactorResult<Self> {
        let email = raw.into().trim().to_lowercase();

        if email.is_empty() {
            return Err(TwoFactorError::InvalidDestination(
                "Email cannot be empty".to_string(),
            ));
        }
        if email.len() > EMAIL_MAX_LENGTH {
            return Err(TwoFactorError::InvalidDestination(format!(
                "Email must be at most {} characters",
                EMAIL_MAX_LENGTH
            )));
        }
        if !Self::is_valid_email_format(&email) {
            return Err(TwoFactorError::InvalidDestination(
                "Invalid email format".to_string(),
            ));
        }

        Ok(Self(email))
    }

    /// Create a validated messaging-bot handle
    pub fn handle(raw: impl Into<String>) -> TwoFactorResult<Self> {
        let handle = raw.into().trim().trim_start_matches('@').to_string();

        if handle.is_empty() {
            return Err(TwoFactorError::InvalidDestination(
                "Handle cannot be empty".to_string(),
            ));
        }
        if handle.len() > HANDLE_MAX_LENGTH {
            return Err(TwoFactorError::InvalidDestination(format!(
                "Handle must be at most {} characters",
                HANDLE_MAX_LENGTH
            )));
        }
        if !handle
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == '-')
        {
            return Err(TwoFactorError::InvalidDestination(
                "Handle may only contain letters, digits, '_', '.', '-'".to_string(),
            ));
        }

        Ok(Self(handle))
    }

    /// Basic email format validation
    fn is_valid_email_format(email: &str) -> bool {
        // Must contain exactly one @
        let parts: Vec<&str> = email.split('@').collect();
        if parts.len() != 2 {
            return false;
        }

        let local = parts[0];
        let domain = parts[1];

        if local.is_empty() || local.len() > 64 {
            return false;
        }
        if domain.is_empty() || !domain.contains('.') {
            return false;
        }
        if domain.starts_with('.') || domain.ends_with('.') {
            return false;
        }

        true
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Masked form for acknowledgements and logs (e.g. "a***@example.com")
    pub fn masked(&self) -> String {
        match self.0.split_once('@') {
            Some((local, domain)) => {
                let head = local.chars().next().map(String::from).unwrap_or_default();
                format!("{}***@{}", head, domain)
            }
            None => {
                let head = self.0.chars().next().map(String::from).unwrap_or_default();
                format!("{}***", head)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_valid() {
        let dest = Destination::email("  Alice@Example.COM ").unwrap();
        assert_eq!(dest.as_str(), "alice@example.com");
    }

    #[test]
    fn test_email_invalid() {
        assert!(Destination::email("").is_err());
        assert!(Destination::email("no-at-sign").is_err());
        assert!(Destination::email("two@@example.com").is_err());
        assert!(Destination::email("a@nodot").is_err());
        assert!(Destination::email("a@.leading.dot").is_err());
    }

    #[test]
    fn test_handle_valid() {
        let dest = Destination::handle("@team_lead.01").unwrap();
        assert_eq!(dest.as_str(), "team_lead.01");
    }

    #[test]
    fn test_handle_invalid() {
        assert!(Destination::handle("").is_err());
        assert!(Destination::handle("has space").is_err());
        assert!(Destination::handle("x".repeat(65)).is_err());
    }

    #[test]
    fn test_masked() {
        let email = Destination::email("alice@example.com").unwrap();
        assert_eq!(email.masked(), "a***@example.com");

        let handle = Destination::handle("team_lead").unwrap();
        assert_eq!(handle.masked(), "t***");
    }
}
