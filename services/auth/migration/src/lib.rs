use sea_orm_migration::prelude::*;

mod m20260815_000001_create_identities;
mod m20260815_000002_create_refresh_tokens;
mod m20260815_000003_create_otp_codes;
mod m20260815_000004_create_otp_rate_limits;
mod m20260815_000005_create_backup_codes;
mod m20260815_000006_create_totp_attempts;
mod m20260815_000007_create_audit_events;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260815_000001_create_identities::Migration),
            Box::new(m20260815_000002_create_refresh_tokens::Migration),
            Box::new(m20260815_000003_create_otp_codes::Migration),
            Box::new(m20260815_000004_create_otp_rate_limits::Migration),
            Box::new(m20260815_000005_create_backup_codes::Migration),
            Box::new(m20260815_000006_create_totp_attempts::Migration),
            Box::new(m20260815_000007_create_audit_events::Migration),
        ]
    }
}
