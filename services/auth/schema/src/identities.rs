use sea_orm::entity::prelude::*;

/// Identity record owned by the auth service.
///
/// Stores only what authentication needs: contact identifiers, the encoded
/// password hash, account status/lockout counters, and 2FA state. The raw
/// TOTP secret is never stored — only its AES-GCM blob.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "identities")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub email: Option<String>,
    pub phone: Option<String>,
    /// PHC-encoded Argon2id hash; absent for passwordless (OTP-only) accounts.
    pub password_hash: Option<String>,
    /// One of `active`, `inactive`, `locked`.
    pub status: String,
    pub failed_attempts: i32,
    pub locked_until: Option<chrono::DateTime<chrono::Utc>>,
    pub totp_enabled: bool,
    /// base64(nonce || ciphertext) of the confirmed TOTP secret.
    pub totp_secret_enc: Option<String>,
    /// Encrypted secret awaiting first-code confirmation.
    pub totp_pending_secret_enc: Option<String>,
    pub totp_enabled_at: Option<chrono::DateTime<chrono::Utc>>,
    pub email_verified_at: Option<chrono::DateTime<chrono::Utc>>,
    pub phone_verified_at: Option<chrono::DateTime<chrono::Utc>>,
    pub last_login_at: Option<chrono::DateTime<chrono::Utc>>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::refresh_tokens::Entity")]
    RefreshTokens,
    #[sea_orm(has_many = "super::backup_codes::Entity")]
    BackupCodes,
}

impl Related<super::refresh_tokens::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RefreshTokens.def()
    }
}

impl Related<super::backup_codes::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BackupCodes.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
