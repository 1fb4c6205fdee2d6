//! sea-orm implementations of the persistence ports.
//!
//! Every conditional state change (rotation, attempt counting, single
//! consume) is one guarded UPDATE judged by `rows_affected` — never a read
//! followed by a write.

use anyhow::Context as _;
use chrono::{DateTime, Duration, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, DatabaseTransaction,
    EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, TransactionTrait, sea_query::Expr,
};
use uuid::Uuid;

use campus_auth_schema::{
    audit_events, backup_codes, identities, otp_codes, otp_rate_limits, refresh_tokens,
    totp_attempts,
};

use crate::domain::repository::{
    AuditSink, IdentityRepository, OtpRateLimitRepository, OtpRepository, RefreshTokenRepository,
    TotpRepository,
};
use crate::domain::types::{
    AccountStatus, AuditEvent, BackupCode, Identity, OtpChannel, OtpCode, OtpPurpose,
    RateLimitDecision, RatePolicy, RefreshTokenRecord,
};
use crate::error::AuthError;

// ── Identity repository ──────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbIdentityRepository {
    pub db: DatabaseConnection,
}

impl IdentityRepository for DbIdentityRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Identity>, AuthError> {
        let model = identities::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .context("find identity by id")?;
        model.map(identity_from_model).transpose()
    }

    async fn find_by_email(
        &self,
        tenant_id: Uuid,
        email: &str,
    ) -> Result<Option<Identity>, AuthError> {
        let model = identities::Entity::find()
            .filter(identities::Column::TenantId.eq(tenant_id))
            .filter(identities::Column::Email.eq(email))
            .one(&self.db)
            .await
            .context("find identity by email")?;
        model.map(identity_from_model).transpose()
    }

    async fn find_by_identifier(
        &self,
        tenant_id: Uuid,
        identifier: &str,
        channel: OtpChannel,
    ) -> Result<Option<Identity>, AuthError> {
        let query = identities::Entity::find().filter(identities::Column::TenantId.eq(tenant_id));
        let query = match channel {
            OtpChannel::Sms => query.filter(identities::Column::Phone.eq(identifier)),
            OtpChannel::Email => query.filter(identities::Column::Email.eq(identifier)),
        };
        let model = query
            .one(&self.db)
            .await
            .context("find identity by identifier")?;
        model.map(identity_from_model).transpose()
    }

    async fn create(&self, identity: &Identity) -> Result<(), AuthError> {
        identities::ActiveModel {
            id: Set(identity.id),
            tenant_id: Set(identity.tenant_id),
            email: Set(identity.email.clone()),
            phone: Set(identity.phone.clone()),
            password_hash: Set(identity.password_hash.clone()),
            status: Set(identity.status.as_str().to_owned()),
            failed_attempts: Set(identity.failed_attempts),
            locked_until: Set(identity.locked_until),
            totp_enabled: Set(identity.totp_enabled),
            totp_secret_enc: Set(identity.totp_secret_enc.clone()),
            totp_pending_secret_enc: Set(identity.totp_pending_secret_enc.clone()),
            totp_enabled_at: Set(identity.totp_enabled_at),
            email_verified_at: Set(identity.email_verified_at),
            phone_verified_at: Set(identity.phone_verified_at),
            last_login_at: Set(identity.last_login_at),
            created_at: Set(identity.created_at),
        }
        .insert(&self.db)
        .await
        .context("create identity")?;
        Ok(())
    }

    async fn record_login(&self, id: Uuid, now: DateTime<Utc>) -> Result<(), AuthError> {
        self.db
            .transaction::<_, (), sea_orm::DbErr>(move |txn| {
                Box::pin(async move {
                    identities::Entity::update_many()
                        .col_expr(identities::Column::FailedAttempts, Expr::value(0))
                        .col_expr(identities::Column::LastLoginAt, Expr::value(Some(now)))
                        .col_expr(
                            identities::Column::LockedUntil,
                            Expr::value(Option::<DateTime<Utc>>::None),
                        )
                        .filter(identities::Column::Id.eq(id))
                        .exec(txn)
                        .await?;
                    // A lapsed lock is cleared by the successful login.
                    identities::Entity::update_many()
                        .col_expr(
                            identities::Column::Status,
                            Expr::value(AccountStatus::Active.as_str()),
                        )
                        .filter(identities::Column::Id.eq(id))
                        .filter(identities::Column::Status.eq(AccountStatus::Locked.as_str()))
                        .exec(txn)
                        .await?;
                    Ok(())
                })
            })
            .await
            .context("record login")?;
        Ok(())
    }

    async fn record_login_failure(
        &self,
        id: Uuid,
        threshold: i32,
        lock_until: DateTime<Utc>,
    ) -> Result<i32, AuthError> {
        let count = self
            .db
            .transaction::<_, i32, sea_orm::DbErr>(move |txn| {
                Box::pin(async move {
                    identities::Entity::update_many()
                        .col_expr(
                            identities::Column::FailedAttempts,
                            Expr::col(identities::Column::FailedAttempts).add(1),
                        )
                        .filter(identities::Column::Id.eq(id))
                        .exec(txn)
                        .await?;

                    let model = identities::Entity::find_by_id(id).one(txn).await?;
                    let count = model.map(|m| m.failed_attempts).unwrap_or(0);

                    if count >= threshold {
                        identities::Entity::update_many()
                            .col_expr(
                                identities::Column::Status,
                                Expr::value(AccountStatus::Locked.as_str()),
                            )
                            .col_expr(
                                identities::Column::LockedUntil,
                                Expr::value(Some(lock_until)),
                            )
                            .filter(identities::Column::Id.eq(id))
                            .exec(txn)
                            .await?;
                    }
                    Ok(count)
                })
            })
            .await
            .context("record login failure")?;
        Ok(count)
    }

    async fn mark_channel_verified(
        &self,
        id: Uuid,
        channel: OtpChannel,
        now: DateTime<Utc>,
    ) -> Result<(), AuthError> {
        let update = identities::Entity::update_many().filter(identities::Column::Id.eq(id));
        let update = match channel {
            OtpChannel::Sms => update
                .col_expr(identities::Column::PhoneVerifiedAt, Expr::value(Some(now)))
                .filter(identities::Column::PhoneVerifiedAt.is_null()),
            OtpChannel::Email => update
                .col_expr(identities::Column::EmailVerifiedAt, Expr::value(Some(now)))
                .filter(identities::Column::EmailVerifiedAt.is_null()),
        };
        update
            .exec(&self.db)
            .await
            .context("mark channel verified")?;
        Ok(())
    }
}

fn identity_from_model(model: identities::Model) -> Result<Identity, AuthError> {
    let status = AccountStatus::parse(&model.status)
        .with_context(|| format!("unknown account status {:?}", model.status))?;
    Ok(Identity {
        id: model.id,
        tenant_id: model.tenant_id,
        email: model.email,
        phone: model.phone,
        password_hash: model.password_hash,
        status,
        failed_attempts: model.failed_attempts,
        locked_until: model.locked_until,
        totp_enabled: model.totp_enabled,
        totp_secret_enc: model.totp_secret_enc,
        totp_pending_secret_enc: model.totp_pending_secret_enc,
        totp_enabled_at: model.totp_enabled_at,
        email_verified_at: model.email_verified_at,
        phone_verified_at: model.phone_verified_at,
        last_login_at: model.last_login_at,
        created_at: model.created_at,
    })
}

// ── Refresh token repository ─────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbRefreshTokenRepository {
    pub db: DatabaseConnection,
}

impl RefreshTokenRepository for DbRefreshTokenRepository {
    async fn create(&self, record: &RefreshTokenRecord) -> Result<(), AuthError> {
        refresh_tokens::ActiveModel {
            id: Set(record.id),
            user_id: Set(record.user_id),
            token_hash: Set(record.token_hash.clone()),
            expires_at: Set(record.expires_at),
            revoked_at: Set(record.revoked_at),
            created_at: Set(record.created_at),
        }
        .insert(&self.db)
        .await
        .context("create refresh token")?;
        Ok(())
    }

    async fn find_by_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<RefreshTokenRecord>, AuthError> {
        let model = refresh_tokens::Entity::find()
            .filter(refresh_tokens::Column::TokenHash.eq(token_hash))
            .one(&self.db)
            .await
            .context("find refresh token by hash")?;
        Ok(model.map(refresh_token_from_model))
    }

    async fn revoke_if_active(&self, id: Uuid, now: DateTime<Utc>) -> Result<bool, AuthError> {
        let result = refresh_tokens::Entity::update_many()
            .col_expr(refresh_tokens::Column::RevokedAt, Expr::value(Some(now)))
            .filter(refresh_tokens::Column::Id.eq(id))
            .filter(refresh_tokens::Column::RevokedAt.is_null())
            .exec(&self.db)
            .await
            .context("revoke refresh token")?;
        Ok(result.rows_affected > 0)
    }

    async fn revoke_all_for_user(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<u64, AuthError> {
        let result = refresh_tokens::Entity::update_many()
            .col_expr(refresh_tokens::Column::RevokedAt, Expr::value(Some(now)))
            .filter(refresh_tokens::Column::UserId.eq(user_id))
            .filter(refresh_tokens::Column::RevokedAt.is_null())
            .exec(&self.db)
            .await
            .context("revoke all refresh tokens for user")?;
        Ok(result.rows_affected)
    }
}

fn refresh_token_from_model(model: refresh_tokens::Model) -> RefreshTokenRecord {
    RefreshTokenRecord {
        id: model.id,
        user_id: model.user_id,
        token_hash: model.token_hash,
        expires_at: model.expires_at,
        revoked_at: model.revoked_at,
        created_at: model.created_at,
    }
}

// ── OTP repository ───────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbOtpRepository {
    pub db: DatabaseConnection,
}

impl OtpRepository for DbOtpRepository {
    async fn create(&self, code: &OtpCode) -> Result<(), AuthError> {
        otp_codes::ActiveModel {
            id: Set(code.id),
            identifier: Set(code.identifier.clone()),
            purpose: Set(code.purpose.as_str().to_owned()),
            channel: Set(code.channel.as_str().to_owned()),
            code_hash: Set(code.code_hash.clone()),
            expires_at: Set(code.expires_at),
            verified_at: Set(code.verified_at),
            attempts: Set(code.attempts),
            created_at: Set(code.created_at),
        }
        .insert(&self.db)
        .await
        .context("create otp code")?;
        Ok(())
    }

    async fn find_latest_live(
        &self,
        identifier: &str,
        purpose: OtpPurpose,
        channel: OtpChannel,
        now: DateTime<Utc>,
    ) -> Result<Option<OtpCode>, AuthError> {
        let model = otp_codes::Entity::find()
            .filter(otp_codes::Column::Identifier.eq(identifier))
            .filter(otp_codes::Column::Purpose.eq(purpose.as_str()))
            .filter(otp_codes::Column::Channel.eq(channel.as_str()))
            .filter(otp_codes::Column::VerifiedAt.is_null())
            .filter(otp_codes::Column::ExpiresAt.gt(now))
            .order_by_desc(otp_codes::Column::CreatedAt)
            .one(&self.db)
            .await
            .context("find latest live otp")?;
        model.map(otp_from_model).transpose()
    }

    async fn increment_attempts_below(&self, id: Uuid, max: i32) -> Result<bool, AuthError> {
        let result = otp_codes::Entity::update_many()
            .col_expr(
                otp_codes::Column::Attempts,
                Expr::col(otp_codes::Column::Attempts).add(1),
            )
            .filter(otp_codes::Column::Id.eq(id))
            .filter(otp_codes::Column::Attempts.lt(max))
            .exec(&self.db)
            .await
            .context("increment otp attempts")?;
        Ok(result.rows_affected > 0)
    }

    async fn mark_verified(&self, id: Uuid, now: DateTime<Utc>) -> Result<bool, AuthError> {
        let result = otp_codes::Entity::update_many()
            .col_expr(otp_codes::Column::VerifiedAt, Expr::value(Some(now)))
            .filter(otp_codes::Column::Id.eq(id))
            .filter(otp_codes::Column::VerifiedAt.is_null())
            .exec(&self.db)
            .await
            .context("mark otp verified")?;
        Ok(result.rows_affected > 0)
    }

    async fn expire_live(
        &self,
        identifier: &str,
        purpose: OtpPurpose,
        channel: OtpChannel,
        now: DateTime<Utc>,
    ) -> Result<u64, AuthError> {
        let result = otp_codes::Entity::update_many()
            .col_expr(otp_codes::Column::ExpiresAt, Expr::value(now))
            .filter(otp_codes::Column::Identifier.eq(identifier))
            .filter(otp_codes::Column::Purpose.eq(purpose.as_str()))
            .filter(otp_codes::Column::Channel.eq(channel.as_str()))
            .filter(otp_codes::Column::VerifiedAt.is_null())
            .filter(otp_codes::Column::ExpiresAt.gt(now))
            .exec(&self.db)
            .await
            .context("expire live otps")?;
        Ok(result.rows_affected)
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, AuthError> {
        // Keep consumed codes for a day so recent flows stay debuggable.
        let retain_after = now - Duration::days(1);
        let result = otp_codes::Entity::delete_many()
            .filter(
                otp_codes::Column::ExpiresAt
                    .lte(retain_after)
                    .or(otp_codes::Column::VerifiedAt.lte(retain_after)),
            )
            .exec(&self.db)
            .await
            .context("purge expired otps")?;
        Ok(result.rows_affected)
    }
}

fn otp_from_model(model: otp_codes::Model) -> Result<OtpCode, AuthError> {
    let purpose = OtpPurpose::parse(&model.purpose)
        .with_context(|| format!("unknown otp purpose {:?}", model.purpose))?;
    let channel = OtpChannel::parse(&model.channel)
        .with_context(|| format!("unknown otp channel {:?}", model.channel))?;
    Ok(OtpCode {
        id: model.id,
        identifier: model.identifier,
        purpose,
        channel,
        code_hash: model.code_hash,
        expires_at: model.expires_at,
        verified_at: model.verified_at,
        attempts: model.attempts,
        created_at: model.created_at,
    })
}

// ── OTP rate limit repository ────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbOtpRateLimitRepository {
    pub db: DatabaseConnection,
}

impl OtpRateLimitRepository for DbOtpRateLimitRepository {
    async fn consume(
        &self,
        identifier: &str,
        channel: OtpChannel,
        policy: &RatePolicy,
        now: DateTime<Utc>,
    ) -> Result<RateLimitDecision, AuthError> {
        let identifier = identifier.to_owned();
        let policy = *policy;
        let decision = self
            .db
            .transaction::<_, RateLimitDecision, sea_orm::DbErr>(move |txn| {
                Box::pin(async move { consume_in_txn(txn, &identifier, channel, &policy, now).await })
            })
            .await
            .context("consume otp rate limit")?;
        Ok(decision)
    }
}

async fn consume_in_txn(
    txn: &DatabaseTransaction,
    identifier: &str,
    channel: OtpChannel,
    policy: &RatePolicy,
    now: DateTime<Utc>,
) -> Result<RateLimitDecision, sea_orm::DbErr> {
    let existing = otp_rate_limits::Entity::find()
        .filter(otp_rate_limits::Column::Identifier.eq(identifier))
        .filter(otp_rate_limits::Column::Channel.eq(channel.as_str()))
        .one(txn)
        .await?;

    let Some(row) = existing else {
        otp_rate_limits::ActiveModel {
            id: Set(Uuid::new_v4()),
            identifier: Set(identifier.to_owned()),
            channel: Set(channel.as_str().to_owned()),
            request_count: Set(1),
            window_started_at: Set(now),
            last_request_at: Set(now),
        }
        .insert(txn)
        .await?;
        return Ok(RateLimitDecision::Allowed);
    };

    // The policy judges the state as read; the writes below enforce it.
    match policy.evaluate(row.request_count, row.window_started_at, row.last_request_at, now) {
        RateLimitDecision::Cooldown => Ok(RateLimitDecision::Cooldown),
        RateLimitDecision::Limited => Ok(RateLimitDecision::Limited),
        RateLimitDecision::Allowed if policy.window_lapsed(row.window_started_at, now) => {
            // Window lapsed: restart it with this request as the first.
            otp_rate_limits::Entity::update_many()
                .col_expr(otp_rate_limits::Column::RequestCount, Expr::value(1))
                .col_expr(otp_rate_limits::Column::WindowStartedAt, Expr::value(now))
                .col_expr(otp_rate_limits::Column::LastRequestAt, Expr::value(now))
                .filter(otp_rate_limits::Column::Id.eq(row.id))
                .exec(txn)
                .await?;
            Ok(RateLimitDecision::Allowed)
        }
        RateLimitDecision::Allowed => {
            // Guarded increment: losing the cap race means the limit is hit.
            let result = otp_rate_limits::Entity::update_many()
                .col_expr(
                    otp_rate_limits::Column::RequestCount,
                    Expr::col(otp_rate_limits::Column::RequestCount).add(1),
                )
                .col_expr(otp_rate_limits::Column::LastRequestAt, Expr::value(now))
                .filter(otp_rate_limits::Column::Id.eq(row.id))
                .filter(otp_rate_limits::Column::RequestCount.lt(policy.max_requests))
                .exec(txn)
                .await?;

            if result.rows_affected > 0 {
                Ok(RateLimitDecision::Allowed)
            } else {
                Ok(RateLimitDecision::Limited)
            }
        }
    }
}

// ── TOTP repository ──────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbTotpRepository {
    pub db: DatabaseConnection,
}

impl TotpRepository for DbTotpRepository {
    async fn set_pending_secret(
        &self,
        user_id: Uuid,
        secret_enc: &str,
    ) -> Result<(), AuthError> {
        identities::Entity::update_many()
            .col_expr(
                identities::Column::TotpPendingSecretEnc,
                Expr::value(Some(secret_enc.to_owned())),
            )
            .filter(identities::Column::Id.eq(user_id))
            .exec(&self.db)
            .await
            .context("set pending totp secret")?;
        Ok(())
    }

    async fn enable_with_backup_codes(
        &self,
        user_id: Uuid,
        secret_enc: &str,
        code_hashes: &[String],
        now: DateTime<Utc>,
    ) -> Result<(), AuthError> {
        let secret_enc = secret_enc.to_owned();
        let code_hashes = code_hashes.to_vec();
        self.db
            .transaction::<_, (), sea_orm::DbErr>(move |txn| {
                Box::pin(async move {
                    identities::Entity::update_many()
                        .col_expr(
                            identities::Column::TotpSecretEnc,
                            Expr::value(Some(secret_enc)),
                        )
                        .col_expr(
                            identities::Column::TotpPendingSecretEnc,
                            Expr::value(Option::<String>::None),
                        )
                        .col_expr(identities::Column::TotpEnabled, Expr::value(true))
                        .col_expr(identities::Column::TotpEnabledAt, Expr::value(Some(now)))
                        .filter(identities::Column::Id.eq(user_id))
                        .exec(txn)
                        .await?;
                    replace_codes_in_txn(txn, user_id, &code_hashes, now).await
                })
            })
            .await
            .context("enable totp with backup codes")?;
        Ok(())
    }

    async fn replace_backup_codes(
        &self,
        user_id: Uuid,
        code_hashes: &[String],
        now: DateTime<Utc>,
    ) -> Result<(), AuthError> {
        let code_hashes = code_hashes.to_vec();
        self.db
            .transaction::<_, (), sea_orm::DbErr>(move |txn| {
                Box::pin(async move { replace_codes_in_txn(txn, user_id, &code_hashes, now).await })
            })
            .await
            .context("replace backup codes")?;
        Ok(())
    }

    async fn disable(&self, user_id: Uuid) -> Result<(), AuthError> {
        self.db
            .transaction::<_, (), sea_orm::DbErr>(move |txn| {
                Box::pin(async move {
                    identities::Entity::update_many()
                        .col_expr(
                            identities::Column::TotpSecretEnc,
                            Expr::value(Option::<String>::None),
                        )
                        .col_expr(
                            identities::Column::TotpPendingSecretEnc,
                            Expr::value(Option::<String>::None),
                        )
                        .col_expr(identities::Column::TotpEnabled, Expr::value(false))
                        .col_expr(
                            identities::Column::TotpEnabledAt,
                            Expr::value(Option::<DateTime<Utc>>::None),
                        )
                        .filter(identities::Column::Id.eq(user_id))
                        .exec(txn)
                        .await?;
                    backup_codes::Entity::delete_many()
                        .filter(backup_codes::Column::UserId.eq(user_id))
                        .exec(txn)
                        .await?;
                    Ok(())
                })
            })
            .await
            .context("disable totp")?;
        Ok(())
    }

    async fn find_unused_backup_codes(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<BackupCode>, AuthError> {
        let models = backup_codes::Entity::find()
            .filter(backup_codes::Column::UserId.eq(user_id))
            .filter(backup_codes::Column::UsedAt.is_null())
            .all(&self.db)
            .await
            .context("find unused backup codes")?;
        Ok(models.into_iter().map(backup_code_from_model).collect())
    }

    async fn consume_backup_code(&self, id: Uuid, now: DateTime<Utc>) -> Result<bool, AuthError> {
        let result = backup_codes::Entity::update_many()
            .col_expr(backup_codes::Column::UsedAt, Expr::value(Some(now)))
            .filter(backup_codes::Column::Id.eq(id))
            .filter(backup_codes::Column::UsedAt.is_null())
            .exec(&self.db)
            .await
            .context("consume backup code")?;
        Ok(result.rows_affected > 0)
    }

    async fn record_attempt(
        &self,
        user_id: Option<Uuid>,
        ip: &str,
        success: bool,
        now: DateTime<Utc>,
    ) -> Result<(), AuthError> {
        totp_attempts::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            ip: Set(ip.to_owned()),
            success: Set(success),
            created_at: Set(now),
        }
        .insert(&self.db)
        .await
        .context("record totp attempt")?;
        Ok(())
    }

    async fn count_attempts_since(
        &self,
        user_id: Uuid,
        ip: &str,
        since: DateTime<Utc>,
    ) -> Result<(u64, u64), AuthError> {
        let by_user = totp_attempts::Entity::find()
            .filter(totp_attempts::Column::UserId.eq(user_id))
            .filter(totp_attempts::Column::CreatedAt.gt(since))
            .count(&self.db)
            .await
            .context("count totp attempts by user")?;
        let by_ip = totp_attempts::Entity::find()
            .filter(totp_attempts::Column::Ip.eq(ip))
            .filter(totp_attempts::Column::CreatedAt.gt(since))
            .count(&self.db)
            .await
            .context("count totp attempts by ip")?;
        Ok((by_user, by_ip))
    }
}

async fn replace_codes_in_txn(
    txn: &DatabaseTransaction,
    user_id: Uuid,
    code_hashes: &[String],
    now: DateTime<Utc>,
) -> Result<(), sea_orm::DbErr> {
    backup_codes::Entity::delete_many()
        .filter(backup_codes::Column::UserId.eq(user_id))
        .exec(txn)
        .await?;
    let models = code_hashes.iter().map(|hash| backup_codes::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        code_hash: Set(hash.clone()),
        used_at: Set(None),
        created_at: Set(now),
    });
    backup_codes::Entity::insert_many(models).exec(txn).await?;
    Ok(())
}

fn backup_code_from_model(model: backup_codes::Model) -> BackupCode {
    BackupCode {
        id: model.id,
        user_id: model.user_id,
        code_hash: model.code_hash,
        used_at: model.used_at,
        created_at: model.created_at,
    }
}

// ── Audit sink ───────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbAuditSink {
    pub db: DatabaseConnection,
}

impl AuditSink for DbAuditSink {
    async fn record(&self, event: &AuditEvent) -> Result<(), AuthError> {
        audit_events::ActiveModel {
            id: Set(Uuid::new_v4()),
            action: Set(event.action.to_owned()),
            user_id: Set(event.user_id),
            tenant_id: Set(event.tenant_id),
            ip: Set(event.ip.clone()),
            user_agent: Set(event.user_agent.clone()),
            created_at: Set(event.timestamp),
        }
        .insert(&self.db)
        .await
        .context("record audit event")?;
        Ok(())
    }
}
