use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Identities::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Identities::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Identities::TenantId).uuid().not_null())
                    .col(ColumnDef::new(Identities::Email).string())
                    .col(ColumnDef::new(Identities::Phone).string())
                    .col(ColumnDef::new(Identities::PasswordHash).string())
                    .col(ColumnDef::new(Identities::Status).string().not_null())
                    .col(
                        ColumnDef::new(Identities::FailedAttempts)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Identities::LockedUntil).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(Identities::TotpEnabled)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Identities::TotpSecretEnc).string())
                    .col(ColumnDef::new(Identities::TotpPendingSecretEnc).string())
                    .col(ColumnDef::new(Identities::TotpEnabledAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Identities::EmailVerifiedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Identities::PhoneVerifiedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Identities::LastLoginAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(Identities::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .table(Identities::Table)
                    .col(Identities::TenantId)
                    .col(Identities::Email)
                    .name("idx_identities_tenant_email")
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .table(Identities::Table)
                    .col(Identities::TenantId)
                    .col(Identities::Phone)
                    .name("idx_identities_tenant_phone")
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Identities::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Identities {
    Table,
    Id,
    TenantId,
    Email,
    Phone,
    PasswordHash,
    Status,
    FailedAttempts,
    LockedUntil,
    TotpEnabled,
    TotpSecretEnc,
    TotpPendingSecretEnc,
    TotpEnabledAt,
    EmailVerifiedAt,
    PhoneVerifiedAt,
    LastLoginAt,
    CreatedAt,
}
