use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(TotpAttempts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(TotpAttempts::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(TotpAttempts::UserId).uuid())
                    .col(ColumnDef::new(TotpAttempts::Ip).string().not_null())
                    .col(ColumnDef::new(TotpAttempts::Success).boolean().not_null())
                    .col(
                        ColumnDef::new(TotpAttempts::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .table(TotpAttempts::Table)
                    .col(TotpAttempts::UserId)
                    .col(TotpAttempts::CreatedAt)
                    .name("idx_totp_attempts_user_created")
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .table(TotpAttempts::Table)
                    .col(TotpAttempts::Ip)
                    .col(TotpAttempts::CreatedAt)
                    .name("idx_totp_attempts_ip_created")
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(TotpAttempts::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum TotpAttempts {
    Table,
    Id,
    UserId,
    Ip,
    Success,
    CreatedAt,
}
