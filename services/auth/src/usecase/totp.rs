//! Authenticator-app second factor: setup, confirmation, login, recovery.
//!
//! Secrets exist in plaintext only inside a single call frame; storage sees
//! the [`SecretCipher`] blob. Backup codes are single-use, stored as SHA-256
//! hex, and matched with a constant-time scan over the whole unused set.

use chrono::{Duration, Utc};
use rand::RngExt;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use totp_rs::{Algorithm, Secret, TOTP};
use uuid::Uuid;

use crate::crypto::cipher::SecretCipher;
use crate::crypto::token::TokenSigner;
use crate::domain::repository::{
    AuditSink, IdentityRepository, PermissionPort, RefreshTokenRepository, TotpRepository,
};
use crate::domain::types::{
    AccountStatus, AuditEvent, BACKUP_CODE_COUNT, Identity, SessionTokens,
    TOTP_ATTEMPT_WINDOW_SECS, TOTP_ATTEMPTS_PER_IP, TOTP_ATTEMPTS_PER_USER,
};
use crate::error::AuthError;
use crate::usecase::{emit_audit, session::mint_session};

const TOTP_DIGITS: usize = 6;
const TOTP_STEP_SECS: u64 = 30;
/// Accept one step of clock skew either side.
const TOTP_SKEW: u8 = 1;

// No 0/O, 1/I/L — backup codes get read over the phone.
const BACKUP_CODE_ALPHABET: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";
const BACKUP_CODE_LEN: usize = 10;

fn build_totp(secret: Vec<u8>, issuer: &str, account: &str) -> Result<TOTP, AuthError> {
    TOTP::new(
        Algorithm::SHA1,
        TOTP_DIGITS,
        TOTP_SKEW,
        TOTP_STEP_SECS,
        secret,
        Some(issuer.to_owned()),
        account.to_owned(),
    )
    .map_err(|e| anyhow::anyhow!("totp construction failure: {e}").into())
}

fn account_label(identity: &Identity) -> String {
    identity
        .email
        .clone()
        .or_else(|| identity.phone.clone())
        .unwrap_or_else(|| identity.id.to_string())
}

fn generate_backup_code() -> String {
    let mut rng = rand::rng();
    let chars: String = (0..BACKUP_CODE_LEN)
        .map(|_| char::from(BACKUP_CODE_ALPHABET[rng.random_range(0..BACKUP_CODE_ALPHABET.len())]))
        .collect();
    format!("{}-{}", &chars[..BACKUP_CODE_LEN / 2], &chars[BACKUP_CODE_LEN / 2..])
}

fn normalize_backup_code(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

fn hash_backup_code(normalized: &str) -> String {
    hex::encode(Sha256::digest(normalized.as_bytes()))
}

fn generate_backup_set() -> (Vec<String>, Vec<String>) {
    let codes: Vec<String> = (0..BACKUP_CODE_COUNT).map(|_| generate_backup_code()).collect();
    let hashes = codes
        .iter()
        .map(|c| hash_backup_code(&normalize_backup_code(c)))
        .collect();
    (codes, hashes)
}

// ── SetupTotp ────────────────────────────────────────────────────────────────

pub struct SetupTotpInput {
    pub user_id: Uuid,
    pub ip: String,
    pub user_agent: String,
}

#[derive(Debug)]
pub struct SetupTotpOutput {
    /// Base32 secret for manual entry.
    pub secret_base32: String,
    /// otpauth:// provisioning URI for QR rendering by the caller.
    pub otpauth_uri: String,
}

pub struct SetupTotpUseCase<I, T, A>
where
    I: IdentityRepository,
    T: TotpRepository,
    A: AuditSink,
{
    pub identities: I,
    pub totp: T,
    pub audit: A,
    pub cipher: SecretCipher,
    pub issuer: String,
}

impl<I, T, A> SetupTotpUseCase<I, T, A>
where
    I: IdentityRepository,
    T: TotpRepository,
    A: AuditSink,
{
    /// Generate a fresh secret and park it as pending. Re-running setup
    /// before confirmation simply replaces the pending secret.
    pub async fn execute(&self, input: SetupTotpInput) -> Result<SetupTotpOutput, AuthError> {
        let identity = self
            .identities
            .find_by_id(input.user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;
        if identity.totp_enabled {
            return Err(AuthError::TotpAlreadyEnabled);
        }

        let secret = Secret::generate_secret()
            .to_bytes()
            .map_err(|e| anyhow::anyhow!("totp secret generation failure: {e:?}"))?;

        let secret_enc = self
            .cipher
            .encrypt(&secret, identity.tenant_id, identity.id)?;
        self.totp.set_pending_secret(identity.id, &secret_enc).await?;

        let totp = build_totp(secret, &self.issuer, &account_label(&identity))?;

        emit_audit(
            &self.audit,
            AuditEvent {
                action: "totp_setup",
                user_id: Some(identity.id),
                tenant_id: Some(identity.tenant_id),
                ip: input.ip,
                user_agent: input.user_agent,
                timestamp: Utc::now(),
            },
        )
        .await;

        Ok(SetupTotpOutput {
            secret_base32: totp.get_secret_base32(),
            otpauth_uri: totp.get_url(),
        })
    }
}

// ── EnableTotp ───────────────────────────────────────────────────────────────

pub struct EnableTotpInput {
    pub user_id: Uuid,
    pub code: String,
    pub ip: String,
    pub user_agent: String,
}

#[derive(Debug)]
pub struct EnableTotpOutput {
    /// Plaintext backup codes, shown exactly once.
    pub backup_codes: Vec<String>,
}

pub struct EnableTotpUseCase<I, T, A>
where
    I: IdentityRepository,
    T: TotpRepository,
    A: AuditSink,
{
    pub identities: I,
    pub totp: T,
    pub audit: A,
    pub cipher: SecretCipher,
    pub issuer: String,
}

impl<I, T, A> EnableTotpUseCase<I, T, A>
where
    I: IdentityRepository,
    T: TotpRepository,
    A: AuditSink,
{
    /// Confirm the pending secret with a live code; on success the secret
    /// becomes active and a fresh backup-code set is issued atomically.
    pub async fn execute(&self, input: EnableTotpInput) -> Result<EnableTotpOutput, AuthError> {
        let now = Utc::now();
        let identity = self
            .identities
            .find_by_id(input.user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;
        if identity.totp_enabled {
            return Err(AuthError::TotpAlreadyEnabled);
        }
        let Some(pending_enc) = identity.totp_pending_secret_enc.as_deref() else {
            return Err(AuthError::TotpNotSetup);
        };

        let secret = self
            .cipher
            .decrypt(pending_enc, identity.tenant_id, identity.id)?;
        let totp = build_totp(secret, &self.issuer, &account_label(&identity))?;

        if !totp.check_current(&input.code).unwrap_or(false) {
            self.totp
                .record_attempt(Some(identity.id), &input.ip, false, now)
                .await?;
            emit_audit(
                &self.audit,
                AuditEvent {
                    action: "totp_enable_failure",
                    user_id: Some(identity.id),
                    tenant_id: Some(identity.tenant_id),
                    ip: input.ip,
                    user_agent: input.user_agent,
                    timestamp: now,
                },
            )
            .await;
            return Err(AuthError::TotpInvalidCode);
        }

        let (codes, hashes) = generate_backup_set();
        self.totp
            .enable_with_backup_codes(identity.id, pending_enc, &hashes, now)
            .await?;

        emit_audit(
            &self.audit,
            AuditEvent {
                action: "totp_enabled",
                user_id: Some(identity.id),
                tenant_id: Some(identity.tenant_id),
                ip: input.ip,
                user_agent: input.user_agent,
                timestamp: now,
            },
        )
        .await;

        Ok(EnableTotpOutput { backup_codes: codes })
    }
}

// ── TotpLogin (second factor) ────────────────────────────────────────────────

pub struct TotpLoginInput {
    pub user_id: Uuid,
    pub code: String,
    pub ip: String,
    pub user_agent: String,
}

#[derive(Debug)]
pub struct TotpLoginOutput {
    pub user_id: Uuid,
    pub tokens: SessionTokens,
    /// Set when a backup code was consumed; callers should prompt the user
    /// to regenerate once few remain.
    pub backup_code_used: bool,
}

enum SecondFactorMatch {
    Totp,
    BackupCode,
    None,
}

pub struct TotpLoginUseCase<I, T, R, P, A>
where
    I: IdentityRepository,
    T: TotpRepository,
    R: RefreshTokenRepository,
    P: PermissionPort,
    A: AuditSink,
{
    pub identities: I,
    pub totp: T,
    pub refresh_tokens: R,
    pub permissions: P,
    pub audit: A,
    pub signer: TokenSigner,
    pub cipher: SecretCipher,
    pub issuer: String,
}

impl<I, T, R, P, A> TotpLoginUseCase<I, T, R, P, A>
where
    I: IdentityRepository,
    T: TotpRepository,
    R: RefreshTokenRepository,
    P: PermissionPort,
    A: AuditSink,
{
    pub async fn execute(&self, input: TotpLoginInput) -> Result<TotpLoginOutput, AuthError> {
        let now = Utc::now();

        // Rate limit off the append-only attempt log, per user and per IP.
        let since = now - Duration::seconds(TOTP_ATTEMPT_WINDOW_SECS);
        let (by_user, by_ip) = self
            .totp
            .count_attempts_since(input.user_id, &input.ip, since)
            .await?;
        if by_user >= TOTP_ATTEMPTS_PER_USER || by_ip >= TOTP_ATTEMPTS_PER_IP {
            self.totp
                .record_attempt(Some(input.user_id), &input.ip, false, now)
                .await?;
            self.audit_event("totp_rate_limited", Some(input.user_id), None, &input)
                .await;
            return Err(AuthError::TotpRateLimited);
        }

        let identity = self
            .identities
            .find_by_id(input.user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;
        if !identity.totp_enabled {
            return Err(AuthError::TotpNotEnabled);
        }
        if identity.is_locked(now) {
            return Err(AuthError::AccountLocked);
        }
        if identity.status == AccountStatus::Inactive {
            return Err(AuthError::AccountInactive);
        }

        let outcome = self.check_second_factor(&identity, &input.code, now).await?;
        let matched = !matches!(outcome, SecondFactorMatch::None);
        self.totp
            .record_attempt(Some(identity.id), &input.ip, matched, now)
            .await?;

        if !matched {
            self.audit_event(
                "totp_login_failure",
                Some(identity.id),
                Some(identity.tenant_id),
                &input,
            )
            .await;
            return Err(AuthError::TotpInvalidCode);
        }

        self.identities.record_login(identity.id, now).await?;

        let perms = self
            .permissions
            .resolve(identity.tenant_id, identity.id)
            .await?;
        let tokens = mint_session(&self.signer, &self.refresh_tokens, &identity, perms).await?;

        let backup_code_used = matches!(outcome, SecondFactorMatch::BackupCode);
        let action = if backup_code_used {
            "totp_backup_code_used"
        } else {
            "totp_login_success"
        };
        self.audit_event(action, Some(identity.id), Some(identity.tenant_id), &input)
            .await;

        Ok(TotpLoginOutput {
            user_id: identity.id,
            tokens,
            backup_code_used,
        })
    }

    async fn check_second_factor(
        &self,
        identity: &Identity,
        code: &str,
        now: chrono::DateTime<Utc>,
    ) -> Result<SecondFactorMatch, AuthError> {
        let secret_enc = identity
            .totp_secret_enc
            .as_deref()
            .ok_or(AuthError::TotpNotSetup)?;
        let secret = self
            .cipher
            .decrypt(secret_enc, identity.tenant_id, identity.id)?;
        let totp = build_totp(secret, &self.issuer, &account_label(identity))?;

        if totp.check_current(code).unwrap_or(false) {
            return Ok(SecondFactorMatch::Totp);
        }

        // Fall back to backup codes. Scan the full unused set without an
        // early exit so timing does not leak which (if any) hash matched.
        let candidate_hash = hash_backup_code(&normalize_backup_code(code));
        let unused = self.totp.find_unused_backup_codes(identity.id).await?;
        let mut matched_id: Option<Uuid> = None;
        for backup in &unused {
            let eq: bool = backup
                .code_hash
                .as_bytes()
                .ct_eq(candidate_hash.as_bytes())
                .into();
            if eq && matched_id.is_none() {
                matched_id = Some(backup.id);
            }
        }

        if let Some(id) = matched_id {
            // Conditional consume: a concurrent login racing on the same
            // backup code leaves exactly one winner.
            if self.totp.consume_backup_code(id, now).await? {
                return Ok(SecondFactorMatch::BackupCode);
            }
        }
        Ok(SecondFactorMatch::None)
    }

    async fn audit_event(
        &self,
        action: &'static str,
        user_id: Option<Uuid>,
        tenant_id: Option<Uuid>,
        input: &TotpLoginInput,
    ) {
        emit_audit(
            &self.audit,
            AuditEvent {
                action,
                user_id,
                tenant_id,
                ip: input.ip.clone(),
                user_agent: input.user_agent.clone(),
                timestamp: Utc::now(),
            },
        )
        .await;
    }
}

// ── DisableTotp ──────────────────────────────────────────────────────────────

pub struct DisableTotpInput {
    pub user_id: Uuid,
    pub password: String,
    pub ip: String,
    pub user_agent: String,
}

pub struct DisableTotpUseCase<I, T, A>
where
    I: IdentityRepository,
    T: TotpRepository,
    A: AuditSink,
{
    pub identities: I,
    pub totp: T,
    pub audit: A,
}

impl<I, T, A> DisableTotpUseCase<I, T, A>
where
    I: IdentityRepository,
    T: TotpRepository,
    A: AuditSink,
{
    /// Password-gated teardown: clears the secret and deletes all backup
    /// codes in one transaction.
    pub async fn execute(&self, input: DisableTotpInput) -> Result<(), AuthError> {
        let identity = self
            .identities
            .find_by_id(input.user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;
        if !identity.totp_enabled {
            return Err(AuthError::TotpNotEnabled);
        }
        let Some(stored_hash) = identity.password_hash.as_deref() else {
            return Err(AuthError::InvalidPassword);
        };

        if let Err(e) = crate::crypto::password::verify_password(&input.password, stored_hash) {
            emit_audit(
                &self.audit,
                AuditEvent {
                    action: "totp_disable_failure",
                    user_id: Some(identity.id),
                    tenant_id: Some(identity.tenant_id),
                    ip: input.ip,
                    user_agent: input.user_agent,
                    timestamp: Utc::now(),
                },
            )
            .await;
            return Err(e);
        }

        self.totp.disable(identity.id).await?;

        emit_audit(
            &self.audit,
            AuditEvent {
                action: "totp_disabled",
                user_id: Some(identity.id),
                tenant_id: Some(identity.tenant_id),
                ip: input.ip,
                user_agent: input.user_agent,
                timestamp: Utc::now(),
            },
        )
        .await;
        Ok(())
    }
}

// ── RegenerateBackupCodes ────────────────────────────────────────────────────

pub struct RegenerateBackupCodesInput {
    pub user_id: Uuid,
    pub code: String,
    pub ip: String,
    pub user_agent: String,
}

#[derive(Debug)]
pub struct RegenerateBackupCodesOutput {
    pub backup_codes: Vec<String>,
}

pub struct RegenerateBackupCodesUseCase<I, T, A>
where
    I: IdentityRepository,
    T: TotpRepository,
    A: AuditSink,
{
    pub identities: I,
    pub totp: T,
    pub audit: A,
    pub cipher: SecretCipher,
    pub issuer: String,
}

impl<I, T, A> RegenerateBackupCodesUseCase<I, T, A>
where
    I: IdentityRepository,
    T: TotpRepository,
    A: AuditSink,
{
    /// Issue a fresh backup-code set, invalidating every remaining old code.
    /// Gated on a live TOTP code.
    pub async fn execute(
        &self,
        input: RegenerateBackupCodesInput,
    ) -> Result<RegenerateBackupCodesOutput, AuthError> {
        let now = Utc::now();
        let identity = self
            .identities
            .find_by_id(input.user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;
        if !identity.totp_enabled {
            return Err(AuthError::TotpNotEnabled);
        }
        let secret_enc = identity
            .totp_secret_enc
            .as_deref()
            .ok_or(AuthError::TotpNotSetup)?;

        let secret = self
            .cipher
            .decrypt(secret_enc, identity.tenant_id, identity.id)?;
        let totp = build_totp(secret, &self.issuer, &account_label(&identity))?;

        if !totp.check_current(&input.code).unwrap_or(false) {
            self.totp
                .record_attempt(Some(identity.id), &input.ip, false, now)
                .await?;
            return Err(AuthError::TotpInvalidCode);
        }

        let (codes, hashes) = generate_backup_set();
        self.totp
            .replace_backup_codes(identity.id, &hashes, now)
            .await?;

        emit_audit(
            &self.audit,
            AuditEvent {
                action: "totp_backup_codes_regenerated",
                user_id: Some(identity.id),
                tenant_id: Some(identity.tenant_id),
                ip: input.ip,
                user_agent: input.user_agent,
                timestamp: now,
            },
        )
        .await;

        Ok(RegenerateBackupCodesOutput { backup_codes: codes })
    }
}
