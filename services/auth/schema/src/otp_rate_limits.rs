use sea_orm::entity::prelude::*;

/// Rolling-window request counter per identifier + channel.
/// Guards OTP issuance: window cap plus a minimum cooldown between sends.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "otp_rate_limits")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub identifier: String,
    /// One of `sms`, `email`.
    pub channel: String,
    pub request_count: i32,
    pub window_started_at: chrono::DateTime<chrono::Utc>,
    pub last_request_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
