//! Acquisition ledger (`point_transactions`).
//!
//! Spend sites only ever append; `balance` is rewritten solely by reconciliation,
//! migration and the `ledger_fifo` consumption policy through [`drain_fifo`].

use crate::entities::{PointKind, PointSource, ledger_entry_entity as ledger};
use crate::error::AppError;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseTransaction, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};

#[derive(Debug, Clone)]
pub struct NewLedgerEntry {
    pub user_id: i64,
    pub kind: PointKind,
    pub amount: i64,
    pub balance: i64,
    pub source: PointSource,
    pub description: Option<String>,
    pub acquired_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl NewLedgerEntry {
    /// 普通发放：balance 等于 amount
    pub fn grant(
        user_id: i64,
        kind: PointKind,
        amount: i64,
        source: PointSource,
        acquired_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id,
            kind,
            amount,
            balance: amount,
            source,
            description: None,
            acquired_at,
            expires_at,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

pub async fn append<C: ConnectionTrait>(db: &C, entry: NewLedgerEntry) -> Result<i64, DbErr> {
    let model = ledger::ActiveModel {
        user_id: Set(entry.user_id),
        kind: Set(entry.kind),
        amount: Set(entry.amount),
        balance: Set(entry.balance),
        source: Set(entry.source),
        description: Set(entry.description),
        acquired_at: Set(entry.acquired_at),
        expires_at: Set(entry.expires_at),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await?;
    Ok(model.id)
}

/// 未过期且仍有余额的流水，按到期时间、获取时间升序（先到期的在前）
pub async fn list_active<C: ConnectionTrait>(
    db: &C,
    user_id: i64,
    kind: PointKind,
    now: DateTime<Utc>,
) -> Result<Vec<ledger::Model>, DbErr> {
    ledger::Entity::find()
        .filter(ledger::Column::UserId.eq(user_id))
        .filter(ledger::Column::Kind.eq(kind))
        .filter(ledger::Column::ExpiresAt.gt(now))
        .filter(ledger::Column::Balance.gt(0))
        .order_by_asc(ledger::Column::ExpiresAt)
        .order_by_asc(ledger::Column::AcquiredAt)
        .order_by_asc(ledger::Column::Id)
        .all(db)
        .await
}

/// 检查 `0 <= balance <= amount`，违规的流水记录到日志并按 0 计算
pub fn usable_balance(entry: &ledger::Model) -> i64 {
    if entry.is_consistent() {
        entry.balance
    } else {
        let violation = AppError::LedgerIntegrityViolation {
            entry_id: entry.id,
            balance: entry.balance,
            amount: entry.amount,
        };
        log::error!("{violation} (user {}), skipped", entry.user_id);
        0
    }
}

pub fn active_total(entries: &[ledger::Model]) -> i64 {
    entries.iter().map(usable_balance).sum()
}

/// 从最早到期的流水开始扣减 `amount`，返回实际扣减的数量
pub(crate) async fn drain_fifo(
    txn: &DatabaseTransaction,
    user_id: i64,
    kind: PointKind,
    amount: i64,
    now: DateTime<Utc>,
) -> Result<i64, DbErr> {
    let mut remaining = amount;
    for entry in list_active(txn, user_id, kind, now).await? {
        if remaining <= 0 {
            break;
        }
        let available = usable_balance(&entry);
        if available == 0 {
            continue;
        }
        let take = available.min(remaining);
        ledger::Entity::update_many()
            .col_expr(ledger::Column::Balance, Expr::value(available - take))
            .filter(ledger::Column::Id.eq(entry.id))
            .exec(txn)
            .await?;
        remaining -= take;
    }
    if remaining > 0 {
        log::warn!(
            "Ledger for user {user_id} ({kind}) is short by {remaining} points while draining {amount}"
        );
    }
    Ok(amount - remaining)
}

pub async fn has_source<C: ConnectionTrait>(db: &C, source: PointSource) -> Result<bool, DbErr> {
    let count = ledger::Entity::find()
        .filter(ledger::Column::Source.eq(source))
        .count(db)
        .await?;
    Ok(count > 0)
}

/// 某用户某来源流水的 balance 合计（迁移校验用，不过滤过期）
pub async fn source_balance<C: ConnectionTrait>(
    db: &C,
    user_id: i64,
    kind: PointKind,
    source: PointSource,
) -> Result<i64, DbErr> {
    let balances: Vec<i64> = ledger::Entity::find()
        .select_only()
        .column(ledger::Column::Balance)
        .filter(ledger::Column::UserId.eq(user_id))
        .filter(ledger::Column::Kind.eq(kind))
        .filter(ledger::Column::Source.eq(source))
        .into_tuple()
        .all(db)
        .await?;
    Ok(balances.into_iter().sum())
}

pub async fn count_for_user<C: ConnectionTrait>(db: &C, user_id: i64) -> Result<u64, DbErr> {
    ledger::Entity::find()
        .filter(ledger::Column::UserId.eq(user_id))
        .count(db)
        .await
}

/// 按获取时间倒序读取，供积分明细使用
pub async fn list_recent<C: ConnectionTrait>(
    db: &C,
    user_id: i64,
    limit: u64,
    offset: u64,
) -> Result<Vec<ledger::Model>, DbErr> {
    ledger::Entity::find()
        .filter(ledger::Column::UserId.eq(user_id))
        .order_by_desc(ledger::Column::AcquiredAt)
        .order_by_desc(ledger::Column::Id)
        .limit(limit)
        .offset(offset)
        .all(db)
        .await
}
