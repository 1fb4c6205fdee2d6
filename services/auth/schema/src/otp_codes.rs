use sea_orm::entity::prelude::*;

/// One-time passcode sent over SMS or email.
/// Expires after 5 minutes; at most 5 verification attempts; consumed once.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "otp_codes")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Normalized phone (E.164) or lowercased email.
    pub identifier: String,
    /// One of `login`, `verify`.
    pub purpose: String,
    /// One of `sms`, `email`.
    pub channel: String,
    /// SHA-256 hex digest of the 6-digit code.
    pub code_hash: String,
    pub expires_at: chrono::DateTime<chrono::Utc>,
    pub verified_at: Option<chrono::DateTime<chrono::Utc>>,
    pub attempts: i32,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
