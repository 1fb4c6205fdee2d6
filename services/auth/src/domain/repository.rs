#![allow(async_fn_in_trait)]

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::types::{
    AuditEvent, BackupCode, Identity, OtpChannel, OtpCode, OtpPurpose, RateLimitDecision,
    RatePolicy, RefreshTokenRecord,
};
use crate::error::AuthError;

/// Identity lookups and the narrow set of mutations this core performs.
pub trait IdentityRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Identity>, AuthError>;

    async fn find_by_email(
        &self,
        tenant_id: Uuid,
        email: &str,
    ) -> Result<Option<Identity>, AuthError>;

    /// Find by normalized contact identifier — email or phone, per channel.
    async fn find_by_identifier(
        &self,
        tenant_id: Uuid,
        identifier: &str,
        channel: OtpChannel,
    ) -> Result<Option<Identity>, AuthError>;

    async fn create(&self, identity: &Identity) -> Result<(), AuthError>;

    /// Reset the failed-attempt counter and record the login time.
    async fn record_login(&self, id: Uuid, now: DateTime<Utc>) -> Result<(), AuthError>;

    /// Atomically increment the failed-attempt counter, locking the account
    /// when the new count reaches `threshold`. Returns the new count.
    async fn record_login_failure(
        &self,
        id: Uuid,
        threshold: i32,
        lock_until: DateTime<Utc>,
    ) -> Result<i32, AuthError>;

    /// Mark the contact channel (phone or email) as verified.
    async fn mark_channel_verified(
        &self,
        id: Uuid,
        channel: OtpChannel,
        now: DateTime<Utc>,
    ) -> Result<(), AuthError>;
}

/// Refresh-token persistence. Only hashes are stored.
pub trait RefreshTokenRepository: Send + Sync {
    async fn create(&self, record: &RefreshTokenRecord) -> Result<(), AuthError>;

    async fn find_by_hash(&self, token_hash: &str)
    -> Result<Option<RefreshTokenRecord>, AuthError>;

    /// Conditionally revoke: set `revoked_at` only if it is currently unset.
    /// Returns `true` when this caller performed the revocation — the
    /// rotation exclusivity invariant hangs on this being a single atomic
    /// compare-and-set, never a read-then-write.
    async fn revoke_if_active(&self, id: Uuid, now: DateTime<Utc>) -> Result<bool, AuthError>;

    /// Revoke every active token owned by the user (logout-everywhere,
    /// reuse containment). Returns the number of tokens revoked.
    async fn revoke_all_for_user(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<u64, AuthError>;
}

/// OTP code persistence with atomic attempt accounting.
pub trait OtpRepository: Send + Sync {
    async fn create(&self, code: &OtpCode) -> Result<(), AuthError>;

    /// Most recent live (unexpired, unconsumed) code for the identifier.
    async fn find_latest_live(
        &self,
        identifier: &str,
        purpose: OtpPurpose,
        channel: OtpChannel,
        now: DateTime<Utc>,
    ) -> Result<Option<OtpCode>, AuthError>;

    /// Atomically increment the attempt counter while it is below `max`.
    /// Returns `false` when the ceiling was already reached (no increment).
    async fn increment_attempts_below(&self, id: Uuid, max: i32) -> Result<bool, AuthError>;

    /// Consume the code: set `verified_at` only if currently unset.
    /// Returns `false` if the code was already consumed.
    async fn mark_verified(&self, id: Uuid, now: DateTime<Utc>) -> Result<bool, AuthError>;

    /// Invalidate all outstanding unverified codes for the identifier
    /// (resend path). Returns the number invalidated.
    async fn expire_live(
        &self,
        identifier: &str,
        purpose: OtpPurpose,
        channel: OtpChannel,
        now: DateTime<Utc>,
    ) -> Result<u64, AuthError>;

    /// Idempotent maintenance sweep of dead rows; safe under live traffic.
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, AuthError>;
}

/// Rolling-window send limiter. `consume` is one atomic operation:
/// check-and-increment must never be two separate store round-trips.
pub trait OtpRateLimitRepository: Send + Sync {
    async fn consume(
        &self,
        identifier: &str,
        channel: OtpChannel,
        policy: &RatePolicy,
        now: DateTime<Utc>,
    ) -> Result<RateLimitDecision, AuthError>;
}

/// TOTP state: encrypted secrets on the identity, backup codes, and the
/// append-only attempt log that feeds rate limiting.
pub trait TotpRepository: Send + Sync {
    /// Store a freshly encrypted secret as pending (enabled stays false).
    async fn set_pending_secret(&self, user_id: Uuid, secret_enc: &str)
    -> Result<(), AuthError>;

    /// Single transaction: promote the pending secret to active, flip the
    /// enabled flag, delete any prior backup codes, insert the new set.
    async fn enable_with_backup_codes(
        &self,
        user_id: Uuid,
        secret_enc: &str,
        code_hashes: &[String],
        now: DateTime<Utc>,
    ) -> Result<(), AuthError>;

    /// Single transaction: delete the existing set, insert the new one.
    async fn replace_backup_codes(
        &self,
        user_id: Uuid,
        code_hashes: &[String],
        now: DateTime<Utc>,
    ) -> Result<(), AuthError>;

    /// Single transaction: clear secret + flag, delete backup codes.
    async fn disable(&self, user_id: Uuid) -> Result<(), AuthError>;

    async fn find_unused_backup_codes(&self, user_id: Uuid)
    -> Result<Vec<BackupCode>, AuthError>;

    /// Consume a backup code: set `used_at` only if currently unset.
    async fn consume_backup_code(&self, id: Uuid, now: DateTime<Utc>)
    -> Result<bool, AuthError>;

    /// Append one attempt row (never updated afterwards).
    async fn record_attempt(
        &self,
        user_id: Option<Uuid>,
        ip: &str,
        success: bool,
        now: DateTime<Utc>,
    ) -> Result<(), AuthError>;

    /// Attempt counts since `since`: (by user, by IP).
    async fn count_attempts_since(
        &self,
        user_id: Uuid,
        ip: &str,
        since: DateTime<Utc>,
    ) -> Result<(u64, u64), AuthError>;
}

/// Append-only audit log. Engines treat delivery as fire-and-forget.
pub trait AuditSink: Send + Sync {
    async fn record(&self, event: &AuditEvent) -> Result<(), AuthError>;
}

/// Outbound SMS/email delivery, supplied by the surrounding application.
/// Both calls are synchronous and fallible; a failed send must surface.
pub trait Notifier: Send + Sync {
    async fn send_sms(&self, to: &str, body: &str) -> anyhow::Result<()>;
    async fn send_email(&self, to: &str, subject: &str, body: &str) -> anyhow::Result<()>;
}

/// Port to the caller's authorization layer: permissions arrive already
/// resolved — this core only embeds them in issued claims.
pub trait PermissionPort: Send + Sync {
    async fn resolve(&self, tenant_id: Uuid, user_id: Uuid) -> Result<Vec<String>, AuthError>;
}
