//! One-time passcode issuance and verification.
//!
//! Codes are 6 random digits, stored only as SHA-256 hex. Issuance runs
//! through an atomic rate-limit consume; verification increments the attempt
//! counter before comparing, so a wrong guess is never free.

use std::sync::LazyLock;

use chrono::{Duration, Utc};
use rand::RngExt;
use regex::Regex;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use uuid::Uuid;

use crate::crypto::token::TokenSigner;
use crate::domain::repository::{
    AuditSink, IdentityRepository, Notifier, OtpRateLimitRepository, OtpRepository,
    PermissionPort, RefreshTokenRepository,
};
use crate::domain::types::{
    AccountStatus, AuditEvent, Identity, OTP_CODE_LEN, OTP_MAX_ATTEMPTS, OTP_TTL_SECS,
    OtpChannel, OtpCode, OtpPurpose, RateLimitDecision, RatePolicy, SessionTokens,
};
use crate::error::AuthError;
use crate::usecase::{emit_audit, session::mint_session};

// E.164: leading + and 8-15 digits, no leading zero.
static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+[1-9][0-9]{7,14}$").expect("static regex"));

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("static regex"));

/// Normalize and validate a contact identifier for its channel.
pub fn normalize_identifier(raw: &str, channel: OtpChannel) -> Result<String, AuthError> {
    match channel {
        OtpChannel::Sms => {
            let cleaned: String = raw
                .chars()
                .filter(|c| !matches!(c, ' ' | '-' | '(' | ')'))
                .collect();
            if PHONE_RE.is_match(&cleaned) {
                Ok(cleaned)
            } else {
                Err(AuthError::InvalidIdentifier)
            }
        }
        OtpChannel::Email => {
            let cleaned = raw.trim().to_lowercase();
            if EMAIL_RE.is_match(&cleaned) {
                Ok(cleaned)
            } else {
                Err(AuthError::InvalidIdentifier)
            }
        }
    }
}

/// Redact an identifier for display: `+14155552671` → `****2671`,
/// `jo@example.com` → `jo****@example.com`.
pub fn mask_identifier(identifier: &str, channel: OtpChannel) -> String {
    match channel {
        OtpChannel::Sms => {
            let tail: String = identifier
                .chars()
                .rev()
                .take(4)
                .collect::<Vec<_>>()
                .into_iter()
                .rev()
                .collect();
            format!("****{tail}")
        }
        OtpChannel::Email => match identifier.split_once('@') {
            Some((local, domain)) => {
                let head: String = local.chars().take(2).collect();
                format!("{head}****@{domain}")
            }
            None => "****".to_owned(),
        },
    }
}

fn generate_code() -> String {
    let mut rng = rand::rng();
    (0..OTP_CODE_LEN)
        .map(|_| char::from(b'0' + rng.random_range(0..10u8)))
        .collect()
}

pub(crate) fn hash_otp_code(code: &str) -> String {
    hex::encode(Sha256::digest(code.as_bytes()))
}

fn code_matches(stored_hash: &str, candidate: &str) -> bool {
    let candidate_hash = hash_otp_code(candidate);
    stored_hash
        .as_bytes()
        .ct_eq(candidate_hash.as_bytes())
        .into()
}

// ── RequestOtp ───────────────────────────────────────────────────────────────

pub struct RequestOtpInput {
    pub identifier: String,
    pub purpose: OtpPurpose,
    pub channel: OtpChannel,
    pub ip: String,
    pub user_agent: String,
}

#[derive(Debug)]
pub struct RequestOtpOutput {
    pub masked_identifier: String,
    pub expires_in_secs: i64,
}

pub struct RequestOtpUseCase<O, L, N, A>
where
    O: OtpRepository,
    L: OtpRateLimitRepository,
    N: Notifier,
    A: AuditSink,
{
    pub otps: O,
    pub rate_limits: L,
    pub notifier: N,
    pub audit: A,
    pub policy: RatePolicy,
}

impl<O, L, N, A> RequestOtpUseCase<O, L, N, A>
where
    O: OtpRepository,
    L: OtpRateLimitRepository,
    N: Notifier,
    A: AuditSink,
{
    pub async fn execute(&self, input: RequestOtpInput) -> Result<RequestOtpOutput, AuthError> {
        let identifier = normalize_identifier(&input.identifier, input.channel)?;
        self.issue(&identifier, &input).await
    }

    /// Cooldown-gated resend: outstanding unverified codes are invalidated
    /// before a fresh one is issued, so only the newest code can verify.
    pub async fn resend(&self, input: RequestOtpInput) -> Result<RequestOtpOutput, AuthError> {
        let identifier = normalize_identifier(&input.identifier, input.channel)?;
        self.check_rate_limit(&identifier, &input).await?;
        self.otps
            .expire_live(&identifier, input.purpose, input.channel, Utc::now())
            .await?;
        self.dispatch(&identifier, &input).await
    }

    async fn issue(
        &self,
        identifier: &str,
        input: &RequestOtpInput,
    ) -> Result<RequestOtpOutput, AuthError> {
        self.check_rate_limit(identifier, input).await?;
        self.dispatch(identifier, input).await
    }

    async fn check_rate_limit(
        &self,
        identifier: &str,
        input: &RequestOtpInput,
    ) -> Result<(), AuthError> {
        let decision = self
            .rate_limits
            .consume(identifier, input.channel, &self.policy, Utc::now())
            .await?;
        match decision {
            RateLimitDecision::Allowed => Ok(()),
            RateLimitDecision::Cooldown => {
                self.audit_event("otp_rate_limited", input).await;
                Err(AuthError::OtpCooldown)
            }
            RateLimitDecision::Limited => {
                self.audit_event("otp_rate_limited", input).await;
                Err(AuthError::OtpRateLimited)
            }
        }
    }

    async fn dispatch(
        &self,
        identifier: &str,
        input: &RequestOtpInput,
    ) -> Result<RequestOtpOutput, AuthError> {
        let now = Utc::now();
        let code = generate_code();
        let record = OtpCode {
            id: Uuid::new_v4(),
            identifier: identifier.to_owned(),
            purpose: input.purpose,
            channel: input.channel,
            code_hash: hash_otp_code(&code),
            expires_at: now + Duration::seconds(OTP_TTL_SECS),
            verified_at: None,
            attempts: 0,
            created_at: now,
        };
        self.otps.create(&record).await?;

        let send_result = match input.channel {
            OtpChannel::Sms => {
                let body = format!("Your verification code is {code}. It expires in 5 minutes.");
                self.notifier.send_sms(identifier, &body).await
            }
            OtpChannel::Email => {
                let body = format!("Your verification code is {code}. It expires in 5 minutes.");
                self.notifier
                    .send_email(identifier, "Your verification code", &body)
                    .await
            }
        };

        if let Err(e) = send_result {
            tracing::warn!(
                channel = input.channel.as_str(),
                error = %e,
                "otp dispatch failed"
            );
            // An undeliverable code must not stay verifiable.
            self.otps
                .expire_live(identifier, input.purpose, input.channel, Utc::now())
                .await?;
            self.audit_event("otp_send_failure", input).await;
            return Err(AuthError::OtpSendFailed);
        }

        self.audit_event("otp_requested", input).await;
        Ok(RequestOtpOutput {
            masked_identifier: mask_identifier(identifier, input.channel),
            expires_in_secs: OTP_TTL_SECS,
        })
    }

    async fn audit_event(&self, action: &'static str, input: &RequestOtpInput) {
        emit_audit(
            &self.audit,
            AuditEvent {
                action,
                user_id: None,
                tenant_id: None,
                ip: input.ip.clone(),
                user_agent: input.user_agent.clone(),
                timestamp: Utc::now(),
            },
        )
        .await;
    }
}

// ── VerifyOtp ────────────────────────────────────────────────────────────────

pub struct VerifyOtpInput {
    pub tenant_id: Uuid,
    pub identifier: String,
    pub code: String,
    pub purpose: OtpPurpose,
    pub channel: OtpChannel,
    pub ip: String,
    pub user_agent: String,
}

#[derive(Debug)]
pub struct VerifyOtpOutput {
    pub user_id: Uuid,
    pub tokens: SessionTokens,
}

pub struct VerifyOtpUseCase<O, I, R, P, A>
where
    O: OtpRepository,
    I: IdentityRepository,
    R: RefreshTokenRepository,
    P: PermissionPort,
    A: AuditSink,
{
    pub otps: O,
    pub identities: I,
    pub refresh_tokens: R,
    pub permissions: P,
    pub audit: A,
    pub signer: TokenSigner,
}

impl<O, I, R, P, A> VerifyOtpUseCase<O, I, R, P, A>
where
    O: OtpRepository,
    I: IdentityRepository,
    R: RefreshTokenRepository,
    P: PermissionPort,
    A: AuditSink,
{
    pub async fn execute(&self, input: VerifyOtpInput) -> Result<VerifyOtpOutput, AuthError> {
        let now = Utc::now();
        let identifier = normalize_identifier(&input.identifier, input.channel)?;

        let Some(code) = self
            .otps
            .find_latest_live(&identifier, input.purpose, input.channel, now)
            .await?
        else {
            self.audit_event("otp_verify_expired", None, &input).await;
            return Err(AuthError::OtpExpired);
        };

        // Charge the attempt before comparing. If the ceiling was already
        // reached the increment is refused and the code stays dead.
        if !self
            .otps
            .increment_attempts_below(code.id, OTP_MAX_ATTEMPTS)
            .await?
        {
            self.audit_event("otp_max_attempts", None, &input).await;
            return Err(AuthError::OtpMaxAttempts);
        }

        if !code_matches(&code.code_hash, &input.code) {
            if code.attempts + 1 >= OTP_MAX_ATTEMPTS {
                self.audit_event("otp_max_attempts", None, &input).await;
                return Err(AuthError::OtpMaxAttempts);
            }
            self.audit_event("otp_verify_invalid", None, &input).await;
            return Err(AuthError::OtpInvalid);
        }

        // Single consume: a concurrent winner already took this code.
        if !self.otps.mark_verified(code.id, now).await? {
            self.audit_event("otp_verify_consumed", None, &input).await;
            return Err(AuthError::OtpExpired);
        }

        let identity = self.resolve_identity(&identifier, &input).await?;

        if identity.is_locked(now) {
            self.audit_event("otp_verify_locked", Some(identity.id), &input)
                .await;
            return Err(AuthError::AccountLocked);
        }
        if identity.status == AccountStatus::Inactive {
            self.audit_event("otp_verify_inactive", Some(identity.id), &input)
                .await;
            return Err(AuthError::AccountInactive);
        }

        let channel_already_verified = match input.channel {
            OtpChannel::Sms => identity.phone_verified_at.is_some(),
            OtpChannel::Email => identity.email_verified_at.is_some(),
        };
        if !channel_already_verified {
            self.identities
                .mark_channel_verified(identity.id, input.channel, now)
                .await?;
        }

        self.identities.record_login(identity.id, now).await?;

        let perms = self
            .permissions
            .resolve(identity.tenant_id, identity.id)
            .await?;
        let tokens = mint_session(&self.signer, &self.refresh_tokens, &identity, perms).await?;

        self.audit_event("otp_login_success", Some(identity.id), &input)
            .await;

        Ok(VerifyOtpOutput {
            user_id: identity.id,
            tokens,
        })
    }

    /// Login OTPs provision an identity on first contact; verification OTPs
    /// only attach to an existing one.
    async fn resolve_identity(
        &self,
        identifier: &str,
        input: &VerifyOtpInput,
    ) -> Result<Identity, AuthError> {
        if let Some(identity) = self
            .identities
            .find_by_identifier(input.tenant_id, identifier, input.channel)
            .await?
        {
            return Ok(identity);
        }

        if input.purpose != OtpPurpose::Login {
            self.audit_event("otp_verify_unknown_user", None, input).await;
            return Err(AuthError::UserNotFound);
        }

        let now = Utc::now();
        let identity = Identity {
            id: Uuid::new_v4(),
            tenant_id: input.tenant_id,
            email: matches!(input.channel, OtpChannel::Email).then(|| identifier.to_owned()),
            phone: matches!(input.channel, OtpChannel::Sms).then(|| identifier.to_owned()),
            password_hash: None,
            status: AccountStatus::Active,
            failed_attempts: 0,
            locked_until: None,
            totp_enabled: false,
            totp_secret_enc: None,
            totp_pending_secret_enc: None,
            totp_enabled_at: None,
            email_verified_at: None,
            phone_verified_at: None,
            last_login_at: None,
            created_at: now,
        };
        self.identities.create(&identity).await?;
        tracing::info!(user_id = %identity.id, tenant_id = %input.tenant_id, "provisioned identity via otp login");
        Ok(identity)
    }

    async fn audit_event(
        &self,
        action: &'static str,
        user_id: Option<Uuid>,
        input: &VerifyOtpInput,
    ) {
        emit_audit(
            &self.audit,
            AuditEvent {
                action,
                user_id,
                tenant_id: Some(input.tenant_id),
                ip: input.ip.clone(),
                user_agent: input.user_agent.clone(),
                timestamp: Utc::now(),
            },
        )
        .await;
    }
}
