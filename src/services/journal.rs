use crate::entities::{UsageType, spend_record_entity as spends};
use crate::models::SpendDetails;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseTransaction, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde_json::Value;

/// 追加一条消费记录，只在扣费事务内调用；记录写入后不再修改
pub async fn append(
    txn: &DatabaseTransaction,
    user_id: i64,
    points_used: i64,
    usage_type: UsageType,
    details: SpendDetails,
    transaction_details: Value,
) -> Result<spends::Model, DbErr> {
    spends::ActiveModel {
        user_id: Set(user_id),
        points_used: Set(points_used),
        usage_type: Set(usage_type),
        description: Set(details.description),
        related_chat_id: Set(details.related_chat_id),
        related_message_id: Set(details.related_message_id),
        transaction_details: Set(transaction_details),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(txn)
    .await
}

pub async fn count_for_user<C: ConnectionTrait>(db: &C, user_id: i64) -> Result<u64, DbErr> {
    spends::Entity::find()
        .filter(spends::Column::UserId.eq(user_id))
        .count(db)
        .await
}

pub async fn list_recent<C: ConnectionTrait>(
    db: &C,
    user_id: i64,
    limit: u64,
    offset: u64,
) -> Result<Vec<spends::Model>, DbErr> {
    spends::Entity::find()
        .filter(spends::Column::UserId.eq(user_id))
        .order_by_desc(spends::Column::CreatedAt)
        .order_by_desc(spends::Column::Id)
        .limit(limit)
        .offset(offset)
        .all(db)
        .await
}
