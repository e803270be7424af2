use sea_orm_migration::prelude::*;

#[derive(DeriveIden)]
enum PointUsageHistory {
    Table,
    Id,
    UserId,
    PointsUsed,
    UsageType,
    Description,
    RelatedChatId,
    RelatedMessageId,
    TransactionDetails,
    CreatedAt,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PointUsageHistory::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PointUsageHistory::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(PointUsageHistory::UserId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PointUsageHistory::PointsUsed)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PointUsageHistory::UsageType)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PointUsageHistory::Description)
                            .string()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(PointUsageHistory::RelatedChatId)
                            .string_len(64)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(PointUsageHistory::RelatedMessageId)
                            .string_len(64)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(PointUsageHistory::TransactionDetails)
                            .json()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PointUsageHistory::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_puh_user_created")
                    .table(PointUsageHistory::Table)
                    .col(PointUsageHistory::UserId)
                    .col(PointUsageHistory::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(
                Table::drop()
                    .if_exists()
                    .table(PointUsageHistory::Table)
                    .to_owned(),
            )
            .await?;
        Ok(())
    }
}
