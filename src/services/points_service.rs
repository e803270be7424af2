use crate::config::{ConsumptionPolicy, PointsConfig};
use crate::entities::{PointKind, PointSource, UsageType};
use crate::error::{AppError, AppResult};
use crate::models::{
    BalanceResponse, HistoryItem, HistoryKind, HistoryQuery, PaginatedResponse, PaginationParams,
    SpendDetails, SpendOutcome,
};
use crate::services::ledger::NewLedgerEntry;
use crate::services::{balance, history, journal, ledger};
use chrono::{DateTime, Utc};
use sea_orm::{DatabaseConnection, DatabaseTransaction, DbErr, TransactionTrait};
use serde_json::json;
use std::future::Future;

/// 事务序列化冲突时整体重试一次，其余错误原样返回
pub(crate) async fn retry_once<T, F, Fut>(operation: &str, mut run: F) -> AppResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = AppResult<T>>,
{
    match run().await {
        Err(e) if e.is_retryable() => {
            log::warn!("{operation} hit a serialization conflict, retrying once");
            run().await
        }
        other => other,
    }
}

/// 在调用方事务内追加流水并增加余额缓存；两步同成同败
pub(crate) async fn record_acquisition(
    txn: &DatabaseTransaction,
    entry: NewLedgerEntry,
) -> Result<i64, DbErr> {
    let (user_id, kind, amount) = (entry.user_id, entry.kind, entry.amount);
    let entry_id = ledger::append(txn, entry).await?;
    balance::credit(txn, user_id, kind, amount).await?;
    Ok(entry_id)
}

#[derive(Clone)]
pub struct PointsService {
    pool: DatabaseConnection,
    config: PointsConfig,
}

impl PointsService {
    pub fn new(pool: DatabaseConnection, config: PointsConfig) -> Self {
        Self { pool, config }
    }

    /// 扣费：同一事务内校验余额、先免费后付费扣减、写消费记录
    pub async fn spend(
        &self,
        user_id: i64,
        cost: i64,
        usage_type: UsageType,
        details: SpendDetails,
    ) -> AppResult<SpendOutcome> {
        if cost < 0 {
            return Err(AppError::ValidationError(
                "Cost must not be negative".to_string(),
            ));
        }
        if cost == 0 {
            let current = balance::read(&self.pool, user_id).await?;
            return Ok(SpendOutcome {
                free_used: 0,
                paid_used: 0,
                balance: BalanceResponse::new(current.free, current.paid),
                record_id: None,
            });
        }

        retry_once("spend", || {
            self.spend_once(user_id, cost, usage_type, details.clone())
        })
        .await
    }

    async fn spend_once(
        &self,
        user_id: i64,
        cost: i64,
        usage_type: UsageType,
        details: SpendDetails,
    ) -> AppResult<SpendOutcome> {
        let txn = self.pool.begin().await?;

        // 余额不足时直接返回，txn 被 drop 即回滚
        let split = balance::debit(&txn, user_id, cost).await?;

        if self.config.consumption_policy == ConsumptionPolicy::LedgerFifo {
            let now = Utc::now();
            ledger::drain_fifo(&txn, user_id, PointKind::Free, split.free_used, now).await?;
            ledger::drain_fifo(&txn, user_id, PointKind::Paid, split.paid_used, now).await?;
        }

        let breakdown = json!({
            "free_used": split.free_used,
            "paid_used": split.paid_used,
            "free_after": split.after.free,
            "paid_after": split.after.paid,
            "policy": self.config.consumption_policy,
        });
        let record = journal::append(&txn, user_id, cost, usage_type, details, breakdown).await?;

        txn.commit().await?;

        log::debug!(
            "User {user_id} spent {cost} points on {usage_type} (free {}, paid {})",
            split.free_used,
            split.paid_used
        );

        Ok(SpendOutcome {
            free_used: split.free_used,
            paid_used: split.paid_used,
            balance: BalanceResponse::new(split.after.free, split.after.paid),
            record_id: Some(record.id),
        })
    }

    /// 发放积分：写流水并增加余额缓存，返回流水 ID
    pub async fn acquire(
        &self,
        user_id: i64,
        kind: PointKind,
        amount: i64,
        source: PointSource,
        expires_at: DateTime<Utc>,
        description: Option<String>,
    ) -> AppResult<i64> {
        let now = Utc::now();
        validate_grant(amount, now, expires_at)?;

        retry_once("acquire", || {
            let mut entry = NewLedgerEntry::grant(user_id, kind, amount, source, now, expires_at);
            entry.description = description.clone();
            async move {
                let txn = self.pool.begin().await?;
                let entry_id = record_acquisition(&txn, entry).await?;
                txn.commit().await?;
                Ok(entry_id)
            }
        })
        .await
    }

    pub async fn get_balance(&self, user_id: i64) -> AppResult<BalanceResponse> {
        let current = balance::read(&self.pool, user_id).await?;
        Ok(BalanceResponse::new(current.free, current.paid))
    }

    /// 积分明细，`all` 模式下对合并后的序列分页
    pub async fn get_history(
        &self,
        user_id: i64,
        query: &HistoryQuery,
    ) -> AppResult<PaginatedResponse<HistoryItem>> {
        let params = PaginationParams::new(query.limit, query.offset);
        let limit = params.get_limit(self.config.max_history_limit);
        let offset = params.validate_offset().map_err(AppError::ValidationError)?;

        let (items, total): (Vec<HistoryItem>, u64) = match query.kind {
            HistoryKind::Earn => {
                let total = ledger::count_for_user(&self.pool, user_id).await?;
                let rows = ledger::list_recent(&self.pool, user_id, limit, offset).await?;
                (rows.into_iter().map(|r| HistoryItem::Earn(r.into())).collect(), total)
            }
            HistoryKind::Spend => {
                let total = journal::count_for_user(&self.pool, user_id).await?;
                let rows = journal::list_recent(&self.pool, user_id, limit, offset).await?;
                (rows.into_iter().map(|r| HistoryItem::Spend(r.into())).collect(), total)
            }
            HistoryKind::All => {
                let window = offset + limit;
                let earn_total = ledger::count_for_user(&self.pool, user_id).await?;
                let spend_total = journal::count_for_user(&self.pool, user_id).await?;
                let earns = ledger::list_recent(&self.pool, user_id, window, 0)
                    .await?
                    .into_iter()
                    .map(|r| HistoryItem::Earn(r.into()))
                    .collect();
                let spends = journal::list_recent(&self.pool, user_id, window, 0)
                    .await?
                    .into_iter()
                    .map(|r| HistoryItem::Spend(r.into()))
                    .collect();
                (
                    history::merge_page(earns, spends, offset, limit),
                    earn_total + spend_total,
                )
            }
        };

        Ok(PaginatedResponse::new(items, limit, offset, total))
    }

    pub fn config(&self) -> &PointsConfig {
        &self.config
    }
}

pub(crate) fn validate_grant(
    amount: i64,
    now: DateTime<Utc>,
    expires_at: DateTime<Utc>,
) -> AppResult<()> {
    if amount <= 0 {
        return Err(AppError::ValidationError(
            "Amount must be positive".to_string(),
        ));
    }
    if expires_at <= now {
        return Err(AppError::ValidationError(
            "Expiry must be in the future".to_string(),
        ));
    }
    Ok(())
}
