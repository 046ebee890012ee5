//! Verification Method Value Object

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A way of proving possession of a second factor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Method {
    /// Authenticator app (TOTP); the user's device computes the code
    Authenticator,
    /// One-time code delivered by email
    Email,
    /// One-time code delivered through the messaging bot
    MessagingBot,
}

impl Method {
    /// Every method the subsystem supports
    pub const ALL: [Method; 3] = [Method::Authenticator, Method::Email, Method::MessagingBot];

    /// Push-style methods get codes delivered to them; the authenticator
    /// is pull-style (the device computes the code itself).
    pub fn is_push(&self) -> bool {
        !matches!(self, Method::Authenticator)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Authenticator => "authenticator",
            Method::Email => "email",
            Method::MessagingBot => "messaging_bot",
        }
    }

    /// Short user-facing setup instructions for this method
    pub fn instructions(&self) -> &'static str {
        match self {
            Method::Authenticator => {
                "Scan the QR code with your authenticator app, then enter the 6-digit code it shows."
            }
            Method::Email => {
                "We will email a one-time code to your address. Enter it here to finish setup."
            }
            Method::MessagingBot => {
                "We will message a one-time code to your handle via the bot. Enter it here to finish setup."
            }
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "authenticator" => Ok(Method::Authenticator),
            "email" => Ok(Method::Email),
            "messaging_bot" => Ok(Method::MessagingBot),
            other => Err(format!("Unknown two-factor method: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_classification() {
        assert!(!Method::Authenticator.is_push());
        assert!(Method::Email.is_push());
        assert!(Method::MessagingBot.is_push());
    }

    #[test]
    fn test_roundtrip_str() {
        for method in Method::ALL {
            assert_eq!(method.as_str().parse::<Method>().unwrap(), method);
        }
        assert!("carrier_pigeon".parse::<Method>().is_err());
    }

    #[test]
    fn test_serde_snake_case() {
        let json = serde_json::to_string(&Method::MessagingBot).unwrap();
        assert_eq!(json, "\"messaging_bot\"");
    }
}
