use crate::config::PointsConfig;
use crate::entities::{PointKind, PointSource, balance_entity as points};
use crate::error::{AppError, AppResult};
use crate::models::{MigrationMismatch, MigrationReport};
use crate::services::balance::{self, Balance};
use crate::services::grant_service::claim;
use crate::services::ledger::{self, NewLedgerEntry};
use chrono::Utc;
use sea_orm::{DatabaseConnection, TransactionTrait};

/// 一次性把旧版扁平余额回填为流水，余额缓存保持不变
// 运行标记挂在 user_id 0 下，与回填写入同一事务
const MIGRATION_MARKER_USER: i64 = 0;
const MIGRATION_MARKER_KEY: &str = "migration:v1";

#[derive(Clone)]
pub struct MigrationService {
    pool: DatabaseConnection,
    config: PointsConfig,
}

impl MigrationService {
    pub fn new(pool: DatabaseConnection, config: PointsConfig) -> Self {
        Self { pool, config }
    }

    pub async fn run_migration(&self) -> AppResult<MigrationReport> {
        let txn = self.pool.begin().await?;

        // 没有旧余额时也会留下标记，之后的正常发放不会被当成旧余额再回填一次
        if ledger::has_source(&txn, PointSource::Migration).await?
            || !claim(&txn, MIGRATION_MARKER_USER, MIGRATION_MARKER_KEY).await?
        {
            log::warn!("Points migration requested but it has already run");
            return Err(AppError::MigrationAlreadyRun);
        }

        let legacy = balance::list_nonzero(&txn).await?;
        let now = Utc::now();
        let mut entries_created = 0u64;

        for row in &legacy {
            let acquired_at = row.updated_at.unwrap_or(now);
            let expires_at = acquired_at + self.config.grant_lifetime();
            for (kind, amount) in [
                (PointKind::Free, row.free_points),
                (PointKind::Paid, row.paid_points),
            ] {
                if amount <= 0 {
                    continue;
                }
                let entry = NewLedgerEntry::grant(
                    row.user_id,
                    kind,
                    amount,
                    PointSource::Migration,
                    acquired_at,
                    expires_at,
                )
                .with_description(format!("Migrated legacy {kind} balance"));
                ledger::append(&txn, entry).await?;
                entries_created += 1;
            }
        }

        txn.commit().await?;

        log::info!(
            "Points migration created {entries_created} ledger entries for {} users",
            legacy.len()
        );

        let verification_mismatches = self.verify(&legacy).await?;

        Ok(MigrationReport {
            users_processed: legacy.len() as u64,
            entries_created,
            verification_mismatches,
        })
    }

    // 尽力而为的校验：只记录不一致，不回滚
    async fn verify(&self, legacy: &[points::Model]) -> AppResult<Vec<MigrationMismatch>> {
        let mut mismatches = Vec::new();
        for row in legacy {
            let expected = Balance::from(row);
            for kind in [PointKind::Free, PointKind::Paid] {
                let migrated =
                    ledger::source_balance(&self.pool, row.user_id, kind, PointSource::Migration)
                        .await?;
                if migrated != expected.get(kind) {
                    log::error!(
                        "Migration mismatch for user {}: {kind} expected {}, migrated {migrated}",
                        row.user_id,
                        expected.get(kind)
                    );
                    mismatches.push(MigrationMismatch {
                        user_id: row.user_id,
                        kind,
                        expected: expected.get(kind),
                        migrated,
                    });
                }
            }
        }
        Ok(mismatches)
    }
}
