//! Session minting and refresh-token rotation.
//!
//! Rotation is the one place concurrency is load-bearing: two callers
//! presenting the same refresh token must resolve to exactly one winner.
//! The port's `revoke_if_active` compare-and-set carries that guarantee.

use chrono::Utc;
use uuid::Uuid;

use crate::crypto::token::{TokenSigner, hash_refresh_token};
use crate::domain::repository::{
    AuditSink, IdentityRepository, PermissionPort, RefreshTokenRepository,
};
use crate::domain::types::{AuditEvent, Identity, RefreshTokenRecord, SessionTokens};
use crate::error::AuthError;
use crate::usecase::emit_audit;

/// Mint an access/refresh pair for the identity and persist the refresh
/// token's hash. The raw refresh value exists only in the returned struct.
pub async fn mint_session<R: RefreshTokenRepository>(
    signer: &TokenSigner,
    refresh_tokens: &R,
    identity: &Identity,
    permissions: Vec<String>,
) -> Result<SessionTokens, AuthError> {
    let (access_token, expires_at) = signer.issue_access_token(identity, permissions)?;
    let (raw_refresh, refresh_expires_at) = signer.issue_refresh_token();

    let record = RefreshTokenRecord {
        id: Uuid::new_v4(),
        user_id: identity.id,
        token_hash: hash_refresh_token(&raw_refresh),
        expires_at: refresh_expires_at,
        revoked_at: None,
        created_at: Utc::now(),
    };
    refresh_tokens.create(&record).await?;

    Ok(SessionTokens {
        access_token,
        refresh_token: raw_refresh,
        expires_at,
    })
}

// ── RefreshSession ───────────────────────────────────────────────────────────

pub struct RefreshSessionInput {
    pub raw_token: String,
    pub ip: String,
    pub user_agent: String,
}

#[derive(Debug)]
pub struct RefreshSessionOutput {
    pub user_id: Uuid,
    pub tokens: SessionTokens,
}

pub struct RefreshSessionUseCase<R, I, P, A>
where
    R: RefreshTokenRepository,
    I: IdentityRepository,
    P: PermissionPort,
    A: AuditSink,
{
    pub refresh_tokens: R,
    pub identities: I,
    pub permissions: P,
    pub audit: A,
    pub signer: TokenSigner,
}

impl<R, I, P, A> RefreshSessionUseCase<R, I, P, A>
where
    R: RefreshTokenRepository,
    I: IdentityRepository,
    P: PermissionPort,
    A: AuditSink,
{
    pub async fn execute(
        &self,
        input: RefreshSessionInput,
    ) -> Result<RefreshSessionOutput, AuthError> {
        let now = Utc::now();
        let hash = hash_refresh_token(&input.raw_token);

        let Some(record) = self.refresh_tokens.find_by_hash(&hash).await? else {
            self.audit_event("token_refresh_failure", None, None, &input)
                .await;
            return Err(AuthError::RefreshNotFound);
        };

        if record.is_expired(now) {
            self.audit_event("token_refresh_failure", Some(record.user_id), None, &input)
                .await;
            return Err(AuthError::RefreshExpired);
        }

        if record.revoked_at.is_some() {
            // Replay of an already-rotated token: containment, then surface.
            let revoked = self
                .refresh_tokens
                .revoke_all_for_user(record.user_id, now)
                .await?;
            tracing::warn!(
                user_id = %record.user_id,
                revoked,
                "refresh token reuse detected; revoked all active sessions"
            );
            self.audit_event("token_refresh_reuse", Some(record.user_id), None, &input)
                .await;
            return Err(AuthError::RefreshRevoked);
        }

        // Single atomic conditional update; the loser of a concurrent race
        // observes `false` here and gets the revoked outcome.
        if !self.refresh_tokens.revoke_if_active(record.id, now).await? {
            self.audit_event("token_refresh_reuse", Some(record.user_id), None, &input)
                .await;
            return Err(AuthError::RefreshRevoked);
        }

        let identity = self
            .identities
            .find_by_id(record.user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        if identity.is_locked(now) {
            self.audit_event(
                "token_refresh_failure",
                Some(identity.id),
                Some(identity.tenant_id),
                &input,
            )
            .await;
            return Err(AuthError::AccountLocked);
        }
        if identity.status == crate::domain::types::AccountStatus::Inactive {
            self.audit_event(
                "token_refresh_failure",
                Some(identity.id),
                Some(identity.tenant_id),
                &input,
            )
            .await;
            return Err(AuthError::AccountInactive);
        }

        let perms = self
            .permissions
            .resolve(identity.tenant_id, identity.id)
            .await?;
        let tokens = mint_session(&self.signer, &self.refresh_tokens, &identity, perms).await?;

        self.audit_event(
            "token_refresh",
            Some(identity.id),
            Some(identity.tenant_id),
            &input,
        )
        .await;

        Ok(RefreshSessionOutput {
            user_id: identity.id,
            tokens,
        })
    }

    async fn audit_event(
        &self,
        action: &'static str,
        user_id: Option<Uuid>,
        tenant_id: Option<Uuid>,
        input: &RefreshSessionInput,
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

// ── RevokeSession (logout) ───────────────────────────────────────────────────

pub struct RevokeSessionInput {
    pub raw_token: String,
    pub ip: String,
    pub user_agent: String,
}

pub struct RevokeSessionUseCase<R, A>
where
    R: RefreshTokenRepository,
    A: AuditSink,
{
    pub refresh_tokens: R,
    pub audit: A,
}

impl<R, A> RevokeSessionUseCase<R, A>
where
    R: RefreshTokenRepository,
    A: AuditSink,
{
    /// Revoke the presented refresh token. Idempotent: revoking an unknown
    /// or already-revoked token is not an error — logout always succeeds.
    pub async fn execute(&self, input: RevokeSessionInput) -> Result<(), AuthError> {
        let now = Utc::now();
        let hash = hash_refresh_token(&input.raw_token);

        if let Some(record) = self.refresh_tokens.find_by_hash(&hash).await? {
            self.refresh_tokens.revoke_if_active(record.id, now).await?;
            emit_audit(
                &self.audit,
                AuditEvent {
                    action: "logout",
                    user_id: Some(record.user_id),
                    tenant_id: None,
                    ip: input.ip,
                    user_agent: input.user_agent,
                    timestamp: now,
                },
            )
            .await;
        }
        Ok(())
    }
}
