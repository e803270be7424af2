use super::enums::{PointKind, PointSource};
use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;

/// 积分获取流水。`amount` / `acquired_at` / `expires_at` 写入后不再变化，
/// 只有对账与迁移流程可以改写 `balance`。
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "point_transactions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub user_id: i64,
    pub kind: PointKind,
    pub amount: i64,
    pub balance: i64,
    pub source: PointSource,
    pub description: Option<String>,
    pub acquired_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Model {
    /// `0 <= balance <= amount`
    pub fn is_consistent(&self) -> bool {
        self.balance >= 0 && self.balance <= self.amount
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
