//! Password login with failed-attempt lockout.

use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::crypto::password::verify_password;
use crate::crypto::token::TokenSigner;
use crate::domain::repository::{
    AuditSink, IdentityRepository, PermissionPort, RefreshTokenRepository,
};
use crate::domain::types::{
    AccountStatus, AuditEvent, LOCKOUT_SECS, MAX_FAILED_LOGINS, SessionTokens,
};
use crate::error::AuthError;
use crate::usecase::{emit_audit, session::mint_session};

pub struct PasswordLoginInput {
    pub tenant_id: Uuid,
    pub email: String,
    pub password: String,
    pub ip: String,
    pub user_agent: String,
}

#[derive(Debug)]
pub enum PasswordLoginOutcome {
    /// Credentials accepted, no second factor configured.
    Session {
        user_id: Uuid,
        tokens: SessionTokens,
    },
    /// Credentials accepted but the account has TOTP enabled; no session is
    /// minted until the second factor clears.
    SecondFactorRequired { user_id: Uuid },
}

pub struct PasswordLoginUseCase<I, R, P, A>
where
    I: IdentityRepository,
    R: RefreshTokenRepository,
    P: PermissionPort,
    A: AuditSink,
{
    pub identities: I,
    pub refresh_tokens: R,
    pub permissions: P,
    pub audit: A,
    pub signer: TokenSigner,
}

impl<I, R, P, A> PasswordLoginUseCase<I, R, P, A>
where
    I: IdentityRepository,
    R: RefreshTokenRepository,
    P: PermissionPort,
    A: AuditSink,
{
    pub async fn execute(
        &self,
        input: PasswordLoginInput,
    ) -> Result<PasswordLoginOutcome, AuthError> {
        let now = Utc::now();
        let email = input.email.trim().to_lowercase();

        let Some(identity) = self
            .identities
            .find_by_email(input.tenant_id, &email)
            .await?
        else {
            self.audit_event("password_login_failure", None, &input).await;
            return Err(AuthError::UserNotFound);
        };

        if identity.is_locked(now) {
            self.audit_event("password_login_locked", Some(identity.id), &input)
                .await;
            return Err(AuthError::AccountLocked);
        }
        if identity.status == AccountStatus::Inactive {
            self.audit_event("password_login_failure", Some(identity.id), &input)
                .await;
            return Err(AuthError::AccountInactive);
        }

        // An account provisioned through OTP only has no hash; a password
        // attempt against it is a plain credential failure.
        let Some(stored_hash) = identity.password_hash.as_deref() else {
            self.record_failure(&identity, &input).await?;
            return Err(AuthError::InvalidPassword);
        };

        match verify_password(&input.password, stored_hash) {
            Ok(()) => {}
            Err(AuthError::InvalidPassword) => {
                self.record_failure(&identity, &input).await?;
                return Err(AuthError::InvalidPassword);
            }
            Err(e) => {
                self.audit_event("password_login_failure", Some(identity.id), &input)
                    .await;
                return Err(e);
            }
        }

        if identity.totp_enabled {
            self.audit_event("password_login_second_factor", Some(identity.id), &input)
                .await;
            return Ok(PasswordLoginOutcome::SecondFactorRequired {
                user_id: identity.id,
            });
        }

        // Successful login resets the failure counter and clears any lapsed
        // lock.
        self.identities.record_login(identity.id, now).await?;

        let perms = self
            .permissions
            .resolve(identity.tenant_id, identity.id)
            .await?;
        let tokens = mint_session(&self.signer, &self.refresh_tokens, &identity, perms).await?;

        self.audit_event("password_login_success", Some(identity.id), &input)
            .await;

        Ok(PasswordLoginOutcome::Session {
            user_id: identity.id,
            tokens,
        })
    }

    async fn record_failure(
        &self,
        identity: &crate::domain::types::Identity,
        input: &PasswordLoginInput,
    ) -> Result<(), AuthError> {
        let now = Utc::now();
        let lock_until = now + Duration::seconds(LOCKOUT_SECS);
        let failed = self
            .identities
            .record_login_failure(identity.id, MAX_FAILED_LOGINS, lock_until)
            .await?;

        if failed >= MAX_FAILED_LOGINS {
            tracing::warn!(user_id = %identity.id, failed, "account locked after repeated failures");
            self.audit_event("account_locked", Some(identity.id), input)
                .await;
        } else {
            self.audit_event("password_login_failure", Some(identity.id), input)
                .await;
        }
        Ok(())
    }

    async fn audit_event(
        &self,
        action: &'static str,
        user_id: Option<Uuid>,
        input: &PasswordLoginInput,
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
