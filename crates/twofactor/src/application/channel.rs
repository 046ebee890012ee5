//! Verification Channels
//!
//! One implementation per method, plus the [`Channel`] dispatch enum the
//! manager selects once per operation by `active_method`. Outbound delivery
//! is a capability ([`CodeSender`]) supplied by the embedding application;
//! this module never opens network connections itself.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use crate::domain::entity::enrollment::{MethodSecret, PendingChallenge};
use crate::domain::services;
use crate::domain::value_object::{Destination, Method, TotpSecret, UserId};
use crate::error::{TwoFactorError, TwoFactorResult};

/// Delivery failure reported by a sender
#[derive(Debug, Error)]
#[error("{0}")]
pub struct SendError(pub String);

/// Outbound code transport capability (email provider, bot API, ...)
#[trait_variant::make(CodeSender: Send)]
pub trait LocalCodeSender {
    async fn send(&self, destination: &Destination, code: &str) -> Result<(), SendError>;
}

/// Provisioning payload returned by `setup`
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Provisioning {
    /// Authenticator enrollment artifacts (secret shown once)
    Authenticator {
        secret_base32: String,
        otpauth_url: String,
        qr_code_base64: String,
    },
    /// Push-style destination acknowledgement
    Delivery {
        method: Method,
        destination_masked: String,
    },
}

/// Authenticator-app (TOTP) channel - pull-style, no transport
pub struct AuthenticatorChannel {
    issuer: String,
}

impl AuthenticatorChannel {
    pub fn new(issuer: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
        }
    }

    /// Generate a fresh shared secret and its enrollment artifacts
    pub fn provision(&self, user_id: &UserId) -> TwoFactorResult<(MethodSecret, Provisioning)> {
        let secret = TotpSecret::generate();
        let account = user_id.to_string();
        let provisioning = Provisioning::Authenticator {
            secret_base32: secret.as_base32().to_string(),
            otpauth_url: secret.otpauth_url(&self.issuer, &account)?,
            qr_code_base64: secret.qr_code_base64(&self.issuer, &account)?,
        };
        Ok((MethodSecret::Totp(secret), provisioning))
    }

    pub fn verify(&self, secret: &TotpSecret, code: &str) -> bool {
        services::verify_totp_now(secret, code)
    }
}

/// Email one-time-code channel - push-style
pub struct EmailChannel<S>
where
    S: CodeSender,
{
    sender: Arc<S>,
}

impl<S> EmailChannel<S>
where
    S: CodeSender,
{
    pub fn new(sender: Arc<S>) -> Self {
        Self { sender }
    }

    /// Validate the address; possession is proven later by code verification
    pub fn provision(&self, raw_destination: &str) -> TwoFactorResult<(MethodSecret, Provisioning)> {
        let destination = Destination::email(raw_destination)?;
        let provisioning = Provisioning::Delivery {
            method: Method::Email,
            destination_masked: destination.masked(),
        };
        Ok((MethodSecret::Destination(destination), provisioning))
    }

    pub async fn issue(&self, destination: &Destination, code: &str) -> TwoFactorResult<()> {
        self.sender
            .send(destination, code)
            .await
            .map_err(|e| TwoFactorError::Transport(e.to_string()))
    }
}

/// Messaging-bot one-time-code channel - push-style
pub struct MessagingBotChannel<S>
where
    S: CodeSender,
{
    sender: Arc<S>,
}

impl<S> MessagingBotChannel<S>
where
    S: CodeSender,
{
    pub fn new(sender: Arc<S>) -> Self {
        Self { sender }
    }

    pub fn provision(&self, raw_destination: &str) -> TwoFactorResult<(MethodSecret, Provisioning)> {
        let destination = Destination::handle(raw_destination)?;
        let provisioning = Provisioning::Delivery {
            method: Method::MessagingBot,
            destination_masked: destination.masked(),
        };
        Ok((MethodSecret::Destination(destination), provisioning))
    }

    pub async fn issue(&self, destination: &Destination, code: &str) -> TwoFactorResult<()> {
        self.sender
            .send(destination, code)
            .await
            .map_err(|e| TwoFactorError::Transport(e.to_string()))
    }
}

/// The single dispatch point over the channel variants.
///
/// The manager resolves `active_method` to one of these once per operation;
/// nothing outside this enum branches on the concrete channel type.
pub enum Channel<'a, E, M>
where
    E: CodeSender,
    M: CodeSender,
{
    Authenticator(&'a AuthenticatorChannel),
    Email(&'a EmailChannel<E>),
    MessagingBot(&'a MessagingBotChannel<M>),
}

impl<'a, E, M> Channel<'a, E, M>
where
    E: CodeSender,
    M: CodeSender,
{
    pub fn method(&self) -> Method {
        match self {
            Channel::Authenticator(_) => Method::Authenticator,
            Channel::Email(_) => Method::Email,
            Channel::MessagingBot(_) => Method::MessagingBot,
        }
    }

    /// Create credential material for this channel.
    /// Push-style variants require a destination; the authenticator ignores it.
    pub fn provision(
        &self,
        user_id: &UserId,
        destination: Option<&str>,
    ) -> TwoFactorResult<(MethodSecret, Provisioning)> {
        match self {
            Channel::Authenticator(channel) => channel.provision(user_id),
            Channel::Email(channel) => {
                let raw = destination.ok_or_else(|| {
                    TwoFactorError::InvalidDestination(
                        "Email destination is required".to_string(),
                    )
                })?;
                channel.provision(raw)
            }
            Channel::MessagingBot(channel) => {
                let raw = destination.ok_or_else(|| {
                    TwoFactorError::InvalidDestination(
                        "Messaging handle is required".to_string(),
                    )
                })?;
                channel.provision(raw)
            }
        }
    }

    /// Dispatch a one-time code through the channel's transport.
    /// No-op for the authenticator: the user's device computes the code.
    pub async fn dispatch(&self, secret: &MethodSecret, code: &str) -> TwoFactorResult<()> {
        match self {
            Channel::Authenticator(_) => Ok(()),
            Channel::Email(channel) => {
                let destination = secret.as_destination().ok_or_else(|| {
                    TwoFactorError::Internal("Email channel requires a destination".to_string())
                })?;
                channel.issue(destination, code).await
            }
            Channel::MessagingBot(channel) => {
                let destination = secret.as_destination().ok_or_else(|| {
                    TwoFactorError::Internal("Messaging channel requires a destination".to_string())
                })?;
                channel.issue(destination, code).await
            }
        }
    }

    /// Verify a submitted code against the secret and outstanding challenge.
    /// Returns false on any mismatch or malformed input, never errors.
    pub fn verify(&self, secret: &MethodSecret, challenge: &PendingChallenge, code: &str) -> bool {
        match self {
            Channel::Authenticator(channel) => secret
                .as_totp()
                .map(|totp| channel.verify(totp, code))
                .unwrap_or(false),
            Channel::Email(_) | Channel::MessagingBot(_) => challenge.matches_code(code.trim()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NullSender;

    impl CodeSender for NullSender {
        async fn send(&self, _destination: &Destination, _code: &str) -> Result<(), SendError> {
            Ok(())
        }
    }

    #[test]
    fn test_authenticator_provision_payload() {
        let channel = AuthenticatorChannel::new("toolhub");
        let (secret, provisioning) = channel.provision(&UserId::new()).unwrap();

        let totp = secret.as_totp().expect("authenticator secret");
        match provisioning {
            Provisioning::Authenticator {
                secret_base32,
                otpauth_url,
                qr_code_base64,
            } => {
                assert_eq!(secret_base32, totp.as_base32());
                assert!(otpauth_url.starts_with("otpauth://totp/"));
                assert!(otpauth_url.contains("toolhub"));
                assert!(!qr_code_base64.is_empty());
            }
            other => panic!("Unexpected provisioning: {:?}", other),
        }
    }

    #[test]
    fn test_email_provision_validates() {
        let channel: EmailChannel<NullSender> = EmailChannel::new(Arc::new(NullSender));
        assert!(channel.provision("not-an-email").is_err());

        let (secret, provisioning) = channel.provision("alice@example.com").unwrap();
        assert_eq!(
            secret.as_destination().unwrap().as_str(),
            "alice@example.com"
        );
        match provisioning {
            Provisioning::Delivery {
                method,
                destination_masked,
            } => {
                assert_eq!(method, Method::Email);
                assert_eq!(destination_masked, "a***@example.com");
            }
            other => panic!("Unexpected provisioning: {:?}", other),
        }
    }

    #[test]
    fn test_push_verify_matches_challenge() {
        let sender = Arc::new(NullSender);
        let email: EmailChannel<NullSender> = EmailChannel::new(sender);
        let (secret, _) = email.provision("alice@example.com").unwrap();

        let challenge = PendingChallenge::for_code("493028", 600_000);
        let channel: Channel<'_, NullSender, NullSender> = Channel::Email(&email);

        assert!(channel.verify(&secret, &challenge, "493028"));
        assert!(channel.verify(&secret, &challenge, " 493028 "));
        assert!(!channel.verify(&secret, &challenge, "000000"));
    }

    #[test]
    fn test_authenticator_verify_rejects_push_secret() {
        let auth = AuthenticatorChannel::new("toolhub");
        let channel: Channel<'_, NullSender, NullSender> = Channel::Authenticator(&auth);

        let secret = MethodSecret::Destination(Destination::email("a@example.com").unwrap());
        let challenge = PendingChallenge::for_authenticator(600_000);
        assert!(!channel.verify(&secret, &challenge, "123456"));
    }
}
