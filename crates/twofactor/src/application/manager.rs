//! Two-Factor Manager
//!
//! Orchestrates channel selection, enrollment state transitions,
//! verification attempts, attempt-count rate limiting, and backup-code
//! fallback. All collaborators are injected at construction: the
//! enrollment store, one sender per push channel, and the audit sink.
//!
//! Locking discipline: every state transition runs inside a single
//! `EnrollmentRepository::mutate` call (per-user mutual exclusion); code
//! delivery happens only after that call returns, so a slow provider never
//! serializes verification for the same user.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::application::channel::{
    AuthenticatorChannel, Channel, CodeSender, EmailChannel, MessagingBotChannel, Provisioning,
};
use crate::application::config::TwoFactorConfig;
use crate::domain::audit::{AuditEvent, AuditSink};
use crate::domain::entity::enrollment::{EnrollmentState, PendingChallenge};
use crate::domain::repository::EnrollmentRepository;
use crate::domain::services;
use crate::domain::value_object::{Method, UserId};
use crate::error::{TwoFactorError, TwoFactorResult};

/// Current enrollment status for a user
#[derive(Debug, Clone, Serialize)]
pub struct StatusOutput {
    pub state: EnrollmentState,
    pub active_method: Option<Method>,
    pub last_verified_at: Option<DateTime<Utc>>,
    pub backup_codes_remaining: usize,
}

/// Acknowledgement that a one-time code was dispatched
#[derive(Debug, Clone, Serialize)]
pub struct DeliveryAck {
    pub method: Method,
    pub destination_masked: String,
    pub expires_at_ms: i64,
}

/// Successful verification outcome
#[derive(Debug, Clone, Serialize)]
pub struct VerifyOutput {
    /// True when this verification completed setup (PendingSetup -> Enabled)
    pub newly_enabled: bool,
}

/// Outcome of the verify state transition, computed under the record lock.
/// Persisted variants (Mismatch/Expired/Exhausted mutate the record) are
/// mapped to errors only after the write committed.
enum VerifyDecision {
    Success { newly_enabled: bool, method: Method },
    Mismatch,
    Expired,
    Exhausted,
}

/// Two-factor manager
pub struct TwoFactorManager<R, E, M, A>
where
    R: EnrollmentRepository + Sync,
    E: CodeSender + Sync,
    M: CodeSender + Sync,
    A: AuditSink + Sync,
{
    repo: Arc<R>,
    authenticator: AuthenticatorChannel,
    email: EmailChannel<E>,
    messaging_bot: MessagingBotChannel<M>,
    audit: Arc<A>,
    config: Arc<TwoFactorConfig>,
}

impl<R, E, M, A> TwoFactorManager<R, E, M, A>
where
    R: EnrollmentRepository + Sync,
    E: CodeSender + Sync,
    M: CodeSender + Sync,
    A: AuditSink + Sync,
{
    pub fn new(
        repo: Arc<R>,
        email_sender: Arc<E>,
        bot_sender: Arc<M>,
        audit: Arc<A>,
        config: Arc<TwoFactorConfig>,
    ) -> Self {
        Self {
            repo,
            authenticator: AuthenticatorChannel::new(config.issuer.clone()),
            email: EmailChannel::new(email_sender),
            messaging_bot: MessagingBotChannel::new(bot_sender),
            audit,
            config,
        }
    }

    /// The one place `active_method` resolves to a concrete channel
    fn channel(&self, method: Method) -> Channel<'_, E, M> {
        match method {
            Method::Authenticator => Channel::Authenticator(&self.authenticator),
            Method::Email => Channel::Email(&self.email),
            Method::MessagingBot => Channel::MessagingBot(&self.messaging_bot),
        }
    }

    /// Static capability list
    pub fn available_methods(&self) -> &'static [Method] {
        &Method::ALL
    }

    /// User-facing setup instructions for a method
    pub fn instructions(&self, method: Method) -> &'static str {
        method.instructions()
    }

    /// Current enrollment state; users without a record read as Disabled
    pub async fn status(&self, user_id: &UserId) -> TwoFactorResult<StatusOutput> {
        let record = self.repo.find(user_id).await?;
        Ok(match record {
            Some(record) => StatusOutput {
                state: record.state(),
                active_method: record.active_method,
                last_verified_at: record.last_verified_at,
                backup_codes_remaining: record.backup_codes_remaining(),
            },
            None => StatusOutput {
                state: EnrollmentState::Disabled,
                active_method: None,
                last_verified_at: None,
                backup_codes_remaining: 0,
            },
        })
    }

    /// Begin enrollment for a method.
    ///
    /// Provisions the channel, stores the secret, opens the challenge and
    /// moves the record to PendingSetup. Push-style methods get their first
    /// code dispatched after the record lock is released. Restarting setup
    /// replaces any previous provisioning. Forbidden while Enabled: the
    /// user must disable first.
    pub async fn setup(
        &self,
        user_id: &UserId,
        method: Method,
        destination: Option<&str>,
    ) -> TwoFactorResult<Provisioning> {
        let channel = self.channel(method);
        let (secret, provisioning) = channel.provision(user_id, destination)?;

        let code = method
            .is_push()
            .then(|| services::generate_random_code(self.config.code_length));
        let challenge = match &code {
            Some(code) => PendingChallenge::for_code(code, self.config.challenge_ttl_ms()),
            None => PendingChallenge::for_authenticator(self.config.challenge_ttl_ms()),
        };

        let stored_secret = secret.clone();
        self.repo
            .mutate(user_id, move |record| {
                if record.state() == EnrollmentState::Enabled {
                    return Err(TwoFactorError::InvalidState(EnrollmentState::Enabled));
                }
                record.begin_setup(method, stored_secret, challenge);
                Ok(())
            })
            .await?;

        tracing::info!(user_id = %user_id, method = %method, "Two-factor setup started");
        self.audit
            .record(AuditEvent::SetupStarted {
                user_id: *user_id,
                method,
            })
            .await;

        // Lock released; dispatch may block on the provider now
        if let Some(code) = code {
            channel.dispatch(&secret, &code).await?;
            self.audit
                .record(AuditEvent::CodeSent {
                    user_id: *user_id,
                    method,
                })
                .await;
        }

        Ok(provisioning)
    }

    /// Send (or re-send) a one-time code for the active push-style method.
    /// Opens a fresh challenge: new expiry, attempt count back to zero.
    pub async fn send_code(&self, user_id: &UserId) -> TwoFactorResult<DeliveryAck> {
        let code = services::generate_random_code(self.config.code_length);
        let ttl_ms = self.config.challenge_ttl_ms();

        let challenge_code = code.clone();
        let (method, secret, expires_at_ms) = self
            .repo
            .mutate(user_id, move |record| {
                if record.state() == EnrollmentState::Disabled {
                    return Err(TwoFactorError::InvalidState(EnrollmentState::Disabled));
                }
                let method = record.active_method.ok_or_else(|| {
                    TwoFactorError::Internal("Enrollment record has no active method".to_string())
                })?;
                if !method.is_push() {
                    return Err(TwoFactorError::InvalidState(record.state()));
                }
                let secret = record.secret.clone().ok_or_else(|| {
                    TwoFactorError::Internal("Enrollment record has no secret".to_string())
                })?;

                let challenge = PendingChallenge::for_code(&challenge_code, ttl_ms);
                let expires_at_ms = challenge.expires_at_ms;
                record.refresh_challenge(challenge);
                Ok((method, secret, expires_at_ms))
            })
            .await?;

        let channel = self.channel(method);
        channel.dispatch(&secret, &code).await?;

        let destination_masked = secret
            .as_destination()
            .map(|dest| dest.masked())
            .unwrap_or_default();

        tracing::info!(
            user_id = %user_id,
            method = %method,
            destination = %destination_masked,
            "Two-factor code dispatched"
        );
        self.audit
            .record(AuditEvent::CodeSent {
                user_id: *user_id,
                method,
            })
            .await;

        Ok(DeliveryAck {
            method,
            destination_masked,
            expires_at_ms,
        })
    }

    /// Verify a submitted code against the outstanding challenge.
    ///
    /// On success from PendingSetup the record becomes Enabled; when already
    /// Enabled only `last_verified_at` refreshes. Either way the challenge is
    /// consumed. Failures count against the challenge; at the attempt
    /// ceiling the challenge is invalidated and `AttemptsExhausted` returned
    /// regardless of code correctness.
    pub async fn verify(&self, user_id: &UserId, code: &str) -> TwoFactorResult<VerifyOutput> {
        let max_attempts = self.config.max_attempts;
        let decision = self
            .repo
            .mutate(user_id, |record| {
                if record.state() == EnrollmentState::Disabled {
                    return Err(TwoFactorError::InvalidState(EnrollmentState::Disabled));
                }
                let challenge = record
                    .pending_challenge
                    .clone()
                    .ok_or(TwoFactorError::ChallengeNotFound)?;

                // Expiry is lazily evaluated here; no background timer
                if challenge.is_expired() {
                    record.clear_challenge();
                    return Ok(VerifyDecision::Expired);
                }
                if challenge.attempt_count >= max_attempts {
                    record.clear_challenge();
                    return Ok(VerifyDecision::Exhausted);
                }

                let method = record.active_method.ok_or_else(|| {
                    TwoFactorError::Internal("Enrollment record has no active method".to_string())
                })?;
                let secret = record.secret.clone().ok_or_else(|| {
                    TwoFactorError::Internal("Enrollment record has no secret".to_string())
                })?;

                if self.channel(method).verify(&secret, &challenge, code) {
                    let newly_enabled = record.state() == EnrollmentState::PendingSetup;
                    record.clear_challenge();
                    if newly_enabled {
                        record.enable();
                    }
                    record.mark_verified();
                    Ok(VerifyDecision::Success {
                        newly_enabled,
                        method,
                    })
                } else {
                    record.record_failed_attempt();
                    Ok(VerifyDecision::Mismatch)
                }
            })
            .await?;

        match decision {
            VerifyDecision::Success {
                newly_enabled,
                method,
            } => {
                if newly_enabled {
                    tracing::info!(user_id = %user_id, method = %method, "Two-factor enabled");
                    self.audit
                        .record(AuditEvent::Enabled {
                            user_id: *user_id,
                            method,
                        })
                        .await;
                }
                self.audit
                    .record(AuditEvent::VerificationSucceeded {
                        user_id: *user_id,
                        used_backup_code: false,
                    })
                    .await;
                Ok(VerifyOutput { newly_enabled })
            }
            VerifyDecision::Mismatch => {
                tracing::warn!(user_id = %user_id, "Two-factor verification failed");
                self.audit
                    .record(AuditEvent::VerificationFailed { user_id: *user_id })
                    .await;
                Err(TwoFactorError::VerificationFailed)
            }
            VerifyDecision::Expired => Err(TwoFactorError::ChallengeExpired),
            VerifyDecision::Exhausted => {
                tracing::warn!(user_id = %user_id, "Two-factor attempt ceiling reached");
                self.audit
                    .record(AuditEvent::VerificationFailed { user_id: *user_id })
                    .await;
                Err(TwoFactorError::AttemptsExhausted)
            }
        }
    }

    /// Complete setup by proving possession. Alias for [`Self::verify`];
    /// exposed so the controller surface maps one operation per intent.
    pub async fn enable(&self, user_id: &UserId, code: &str) -> TwoFactorResult<VerifyOutput> {
        self.verify(user_id, code).await
    }

    /// Turn two-factor off, clearing secret, method, challenge and backup
    /// codes. Idempotent: a second call is a no-op success. The record
    /// itself persists for audit continuity.
    pub async fn disable(&self, user_id: &UserId) -> TwoFactorResult<()> {
        let was_active = self
            .repo
            .mutate(user_id, |record| {
                let was_active = record.state() != EnrollmentState::Disabled;
                record.reset();
                Ok(was_active)
            })
            .await?;

        if was_active {
            tracing::info!(user_id = %user_id, "Two-factor disabled");
            self.audit
                .record(AuditEvent::Disabled { user_id: *user_id })
                .await;
        }
        Ok(())
    }

    /// Re-render the authenticator enrollment QR code (base64 PNG).
    /// Only meaningful while an authenticator secret is provisioned.
    pub async fn qr_code(&self, user_id: &UserId) -> TwoFactorResult<String> {
        let record = self
            .repo
            .find(user_id)
            .await?
            .ok_or(TwoFactorError::InvalidState(EnrollmentState::Disabled))?;

        let state = record.state();
        let secret = record
            .secret
            .as_ref()
            .and_then(|secret| secret.as_totp())
            .ok_or(TwoFactorError::InvalidState(state))?;

        secret.qr_code_base64(&self.config.issuer, &record.user_id.to_string())
    }

    /// Generate a fresh batch of backup codes, invalidating any prior batch.
    /// Plaintext is returned here once and never retrievable again.
    pub async fn generate_backup_codes(&self, user_id: &UserId) -> TwoFactorResult<Vec<String>> {
        let count = self.config.backup_code_count;
        let length = self.config.backup_code_length;

        let plaintext = self
            .repo
            .mutate(user_id, move |record| {
                if record.state() != EnrollmentState::Enabled {
                    return Err(TwoFactorError::InvalidState(record.state()));
                }
                let batch = services::generate_backup_codes(count, length);
                record.replace_backup_codes(batch.codes);
                Ok(batch.plaintext)
            })
            .await?;

        tracing::info!(user_id = %user_id, count, "Backup codes regenerated");
        self.audit
            .record(AuditEvent::BackupCodesRegenerated {
                user_id: *user_id,
                count,
            })
            .await;

        Ok(plaintext)
    }

    /// Verify-and-spend a backup code. Success refreshes `last_verified_at`
    /// and leaves the enrollment state untouched.
    pub async fn verify_backup_code(&self, user_id: &UserId, code: &str) -> TwoFactorResult<()> {
        let consumed = self
            .repo
            .mutate(user_id, |record| {
                if record.state() != EnrollmentState::Enabled {
                    return Err(TwoFactorError::InvalidState(record.state()));
                }
                let consumed = services::consume_backup_code(&mut record.backup_codes, code);
                if consumed {
                    record.mark_verified();
                }
                Ok(consumed)
            })
            .await?;

        if consumed {
            tracing::info!(user_id = %user_id, "Backup code consumed");
            self.audit
                .record(AuditEvent::VerificationSucceeded {
                    user_id: *user_id,
                    used_backup_code: true,
                })
                .await;
            Ok(())
        } else {
            tracing::warn!(user_id = %user_id, "Backup code rejected");
            self.audit
                .record(AuditEvent::VerificationFailed { user_id: *user_id })
                .await;
            Err(TwoFactorError::VerificationFailed)
        }
    }
}
