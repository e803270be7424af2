use sea_orm_migration::prelude::*;

#[derive(DeriveIden)]
enum PointGrantClaims {
    Table,
    Id,
    UserId,
    ClaimKey,
    EntryId,
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
                    .table(PointGrantClaims::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PointGrantClaims::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(PointGrantClaims::UserId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PointGrantClaims::ClaimKey)
                            .string_len(128)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PointGrantClaims::EntryId)
                            .big_integer()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(PointGrantClaims::CreatedAt)
                            .timestamp_with_time_zone()
                            .default(Expr::current_timestamp())
                            .null(),
                    )
                    .to_owned(),
            )
            .await?;

        // unique (user_id, claim_key)：每日签到 / 推荐奖励 / 支付回调的幂等标记
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("uq_point_grant_claims_user_key")
                    .table(PointGrantClaims::Table)
                    .col(PointGrantClaims::UserId)
                    .col(PointGrantClaims::ClaimKey)
                    .unique()
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
                    .table(PointGrantClaims::Table)
                    .to_owned(),
            )
            .await?;
        Ok(())
    }
}
