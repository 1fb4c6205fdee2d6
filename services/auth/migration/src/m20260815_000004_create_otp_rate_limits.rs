use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(OtpRateLimits::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(OtpRateLimits::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(OtpRateLimits::Identifier).string().not_null())
                    .col(ColumnDef::new(OtpRateLimits::Channel).string().not_null())
                    .col(
                        ColumnDef::new(OtpRateLimits::RequestCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(OtpRateLimits::WindowStartedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(OtpRateLimits::LastRequestAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // One counter row per identifier + channel; the consume path relies on it.
        manager
            .create_index(
                Index::create()
                    .table(OtpRateLimits::Table)
                    .col(OtpRateLimits::Identifier)
                    .col(OtpRateLimits::Channel)
                    .unique()
                    .name("idx_otp_rate_limits_identifier_channel")
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(OtpRateLimits::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum OtpRateLimits {
    Table,
    Id,
    Identifier,
    Channel,
    RequestCount,
    WindowStartedAt,
    LastRequestAt,
}
