use crate::config::PointsConfig;
use crate::entities::{PointKind, PointSource};
use crate::error::AppResult;
use crate::models::{ReconcileDiff, ReconcileSummary, UserReconcileReport};
use crate::services::balance;
use crate::services::ledger::{self, NewLedgerEntry};
use crate::services::points_service::retry_once;
use chrono::{DateTime, Duration, Utc};
use sea_orm::{DatabaseConnection, DatabaseTransaction, DbErr, TransactionTrait};

/// 以未过期流水为准校正余额缓存，并为每次校正留下审计流水
#[derive(Clone)]
pub struct ReconciliationService {
    pool: DatabaseConnection,
    config: PointsConfig,
}

impl ReconciliationService {
    pub fn new(pool: DatabaseConnection, config: PointsConfig) -> Self {
        Self { pool, config }
    }

    /// 对单个用户对账，整个读取与修正在一个事务内完成
    pub async fn reconcile_user(&self, user_id: i64) -> AppResult<Vec<ReconcileDiff>> {
        retry_once("reconcile", || async move {
            let txn = self.pool.begin().await?;
            balance::ensure(&txn, user_id).await?;
            let stored = balance::lock(&txn, user_id).await?.unwrap_or_default();
            let now = Utc::now();
            let lifetime = self.config.grant_lifetime();

            let mut diffs = Vec::with_capacity(2);
            for kind in [PointKind::Free, PointKind::Paid] {
                let diff =
                    reconcile_kind(&txn, user_id, kind, stored.get(kind), now, lifetime).await?;
                diffs.push(diff);
            }

            txn.commit().await?;
            Ok(diffs)
        })
        .await
    }

    /// 逐个用户对账；单个用户失败只记录日志，不影响其他用户
    pub async fn reconcile_all(&self) -> AppResult<ReconcileSummary> {
        let user_ids = balance::list_user_ids(&self.pool).await?;
        let mut summary = ReconcileSummary {
            users_checked: 0,
            users_corrected: 0,
            users_failed: 0,
            reports: Vec::new(),
        };

        for user_id in user_ids {
            summary.users_checked += 1;
            match self.reconcile_user(user_id).await {
                Ok(diffs) => {
                    let report = UserReconcileReport {
                        user_id,
                        diffs,
                        error: None,
                    };
                    if report.corrected() {
                        summary.users_corrected += 1;
                        summary.reports.push(report);
                    }
                }
                Err(e) => {
                    log::error!("Reconciliation failed for user {user_id}: {e}");
                    summary.users_failed += 1;
                    summary.reports.push(UserReconcileReport {
                        user_id,
                        diffs: Vec::new(),
                        error: Some(e.to_string()),
                    });
                }
            }
        }

        log::info!(
            "Reconciliation pass finished: {} checked, {} corrected, {} failed",
            summary.users_checked,
            summary.users_corrected,
            summary.users_failed
        );
        Ok(summary)
    }
}

async fn reconcile_kind(
    txn: &DatabaseTransaction,
    user_id: i64,
    kind: PointKind,
    stored: i64,
    now: DateTime<Utc>,
    lifetime: Duration,
) -> Result<ReconcileDiff, DbErr> {
    let active = ledger::list_active(txn, user_id, kind, now).await?;
    let actual = ledger::active_total(&active);
    let delta = actual - stored;

    if delta == 0 {
        return Ok(ReconcileDiff {
            kind,
            stored,
            actual,
            corrected: false,
        });
    }

    let description = format!(
        "Reconciliation: {kind} points corrected from {stored} to {actual} (delta {delta:+})"
    );
    let correction = NewLedgerEntry::grant(
        user_id,
        kind,
        delta.abs(),
        PointSource::AdminGrant,
        now,
        now + lifetime,
    )
    .with_description(description.clone());

    if delta > 0 {
        // 修正流水本身计入后续合计，同额从原有流水中扣除，保证再次对账时差值为 0
        ledger::drain_fifo(txn, user_id, kind, delta, now).await?;
        ledger::append(txn, correction).await?;
    } else {
        // 向下修正只留审计记录，不计入余额
        ledger::append(txn, NewLedgerEntry { balance: 0, ..correction }).await?;
    }
    balance::overwrite(txn, user_id, kind, actual).await?;

    log::warn!("User {user_id}: {description}");

    Ok(ReconcileDiff {
        kind,
        stored,
        actual,
        corrected: true,
    })
}
