use crate::config::PointsConfig;
use crate::entities::{PointKind, PointSource, grant_claim_entity as claims};
use crate::error::{AppError, AppResult};
use crate::models::{BalanceResponse, DailyAttendanceResponse, GrantResponse, ReferralRewardResponse};
use crate::services::balance;
use crate::services::ledger::NewLedgerEntry;
use crate::services::points_service::{record_acquisition, retry_once, validate_grant};
use chrono::Utc;
use sea_orm::sea_query::{Expr, OnConflict, Query};
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction, DbErr, EntityTrait,
    QueryFilter, TransactionTrait,
};

/// 各种积分获取渠道（签到、推荐、购买、管理员发放），都走同一条事务内的发放路径
#[derive(Clone)]
pub struct GrantService {
    pool: DatabaseConnection,
    config: PointsConfig,
}

// 幂等标记：插入成功返回 true，已存在返回 false
pub(crate) async fn claim(txn: &DatabaseTransaction, user_id: i64, claim_key: &str) -> Result<bool, DbErr> {
    let insert = Query::insert()
        .into_table(claims::Entity)
        .columns([
            claims::Column::UserId,
            claims::Column::ClaimKey,
            claims::Column::CreatedAt,
        ])
        .values_panic([user_id.into(), claim_key.into(), Utc::now().into()])
        .on_conflict(
            OnConflict::columns([claims::Column::UserId, claims::Column::ClaimKey])
                .do_nothing()
                .to_owned(),
        )
        .to_owned();
    let stmt = txn.get_database_backend().build(&insert);
    let res = txn.execute(stmt).await?;
    Ok(res.rows_affected() > 0)
}

async fn attach_entry(
    txn: &DatabaseTransaction,
    user_id: i64,
    claim_key: &str,
    entry_id: i64,
) -> Result<(), DbErr> {
    claims::Entity::update_many()
        .col_expr(claims::Column::EntryId, Expr::value(entry_id))
        .filter(claims::Column::UserId.eq(user_id))
        .filter(claims::Column::ClaimKey.eq(claim_key))
        .exec(txn)
        .await?;
    Ok(())
}

async fn claimed_entry<C: ConnectionTrait>(
    db: &C,
    user_id: i64,
    claim_key: &str,
) -> Result<Option<i64>, DbErr> {
    let row = claims::Entity::find()
        .filter(claims::Column::UserId.eq(user_id))
        .filter(claims::Column::ClaimKey.eq(claim_key))
        .one(db)
        .await?;
    Ok(row.and_then(|r| r.entry_id))
}

impl GrantService {
    pub fn new(pool: DatabaseConnection, config: PointsConfig) -> Self {
        Self { pool, config }
    }

    fn entry(&self, user_id: i64, kind: PointKind, amount: i64, source: PointSource) -> NewLedgerEntry {
        let now = Utc::now();
        NewLedgerEntry::grant(
            user_id,
            kind,
            amount,
            source,
            now,
            now + self.config.grant_lifetime(),
        )
    }

    /// 注册时创建零余额的缓存行
    pub async fn open_account(&self, user_id: i64) -> AppResult<BalanceResponse> {
        balance::ensure(&self.pool, user_id).await?;
        let current = balance::read(&self.pool, user_id).await?;
        Ok(BalanceResponse::new(current.free, current.paid))
    }

    /// 每日签到（按 UTC 日期），同一天重复领取不写任何数据
    pub async fn claim_daily_attendance(&self, user_id: i64) -> AppResult<DailyAttendanceResponse> {
        let points = self.config.daily_attendance_points;
        if points <= 0 {
            return Err(AppError::ValidationError(
                "Daily attendance points must be positive".to_string(),
            ));
        }
        let claim_key = format!("daily_attendance:{}", Utc::now().format("%Y-%m-%d"));
        let claim_key = claim_key.as_str();

        let claimed = retry_once("daily attendance", || async move {
            let txn = self.pool.begin().await?;
            if !claim(&txn, user_id, claim_key).await? {
                txn.commit().await?;
                return Ok(false);
            }
            let entry = self
                .entry(user_id, PointKind::Free, points, PointSource::DailyAttendance)
                .with_description("Daily attendance bonus");
            let entry_id = record_acquisition(&txn, entry).await?;
            attach_entry(&txn, user_id, claim_key, entry_id).await?;
            txn.commit().await?;
            Ok(true)
        })
        .await?;

        if claimed {
            log::info!("User {user_id} claimed daily attendance bonus of {points} points");
        }

        let current = balance::read(&self.pool, user_id).await?;
        Ok(DailyAttendanceResponse {
            claimed,
            points: if claimed { points } else { 0 },
            balance: BalanceResponse::new(current.free, current.paid),
        })
    }

    /// 推荐奖励：推荐人与被推荐人各得一次免费积分，以被推荐人为幂等键
    pub async fn reward_referral(
        &self,
        referrer_id: i64,
        referee_id: i64,
    ) -> AppResult<ReferralRewardResponse> {
        if referrer_id == referee_id {
            return Err(AppError::ValidationError(
                "Users cannot refer themselves".to_string(),
            ));
        }
        let claim_key = format!("referral:{referee_id}");
        let claim_key = claim_key.as_str();
        let referrer_points = self.config.referral_points;
        let referee_points = self.config.referee_points;

        let outcome = retry_once("referral reward", || async move {
            let txn = self.pool.begin().await?;
            // 被推荐人只能被推荐一次，以被推荐人自己的标记为准
            if !claim(&txn, referee_id, claim_key).await? {
                txn.commit().await?;
                return Ok(None);
            }
            claim(&txn, referrer_id, claim_key).await?;

            let mut referrer_entry = None;
            if referrer_points > 0 {
                let entry = self
                    .entry(referrer_id, PointKind::Free, referrer_points, PointSource::Referral)
                    .with_description(format!("Referral reward for inviting user {referee_id}"));
                let id = record_acquisition(&txn, entry).await?;
                attach_entry(&txn, referrer_id, claim_key, id).await?;
                referrer_entry = Some(id);
            }
            let mut referee_entry = None;
            if referee_points > 0 {
                let entry = self
                    .entry(referee_id, PointKind::Free, referee_points, PointSource::Referral)
                    .with_description(format!("Welcome bonus for joining via user {referrer_id}"));
                let id = record_acquisition(&txn, entry).await?;
                attach_entry(&txn, referee_id, claim_key, id).await?;
                referee_entry = Some(id);
            }
            txn.commit().await?;
            Ok(Some((referrer_entry, referee_entry)))
        })
        .await?;

        Ok(match outcome {
            Some((referrer_entry_id, referee_entry_id)) => {
                log::info!("Referral reward granted: referrer {referrer_id}, referee {referee_id}");
                ReferralRewardResponse {
                    rewarded: true,
                    referrer_entry_id,
                    referee_entry_id,
                }
            }
            None => ReferralRewardResponse {
                rewarded: false,
                referrer_entry_id: None,
                referee_entry_id: None,
            },
        })
    }

    /// 支付确认后发放付费积分；同一支付凭证重复回调时返回原流水
    pub async fn credit_purchase(
        &self,
        user_id: i64,
        points: i64,
        payment_reference: &str,
    ) -> AppResult<GrantResponse> {
        let payment_reference = payment_reference.trim();
        if payment_reference.is_empty() {
            return Err(AppError::ValidationError(
                "Payment reference is required".to_string(),
            ));
        }
        let now = Utc::now();
        validate_grant(points, now, now + self.config.grant_lifetime())?;
        let claim_key = format!("purchase:{payment_reference}");
        let claim_key = claim_key.as_str();

        let (entry_id, replayed) = retry_once("purchase credit", || async move {
            let txn = self.pool.begin().await?;
            if !claim(&txn, user_id, claim_key).await? {
                let existing = claimed_entry(&txn, user_id, claim_key).await?;
                txn.commit().await?;
                let entry_id = existing.ok_or_else(|| {
                    AppError::InternalError(format!(
                        "Purchase claim {claim_key} has no ledger entry"
                    ))
                })?;
                return Ok((entry_id, true));
            }
            let entry = self
                .entry(user_id, PointKind::Paid, points, PointSource::Purchase)
                .with_description(format!("Purchase {payment_reference}"));
            let entry_id = record_acquisition(&txn, entry).await?;
            attach_entry(&txn, user_id, claim_key, entry_id).await?;
            txn.commit().await?;
            Ok((entry_id, false))
        })
        .await?;

        if replayed {
            log::info!("Purchase {payment_reference} for user {user_id} already credited");
        } else {
            log::info!("Credited {points} paid points to user {user_id} for {payment_reference}");
        }

        let current = balance::read(&self.pool, user_id).await?;
        Ok(GrantResponse {
            entry_id,
            replayed,
            balance: BalanceResponse::new(current.free, current.paid),
        })
    }

    /// 管理员手动发放（source = admin_grant）
    pub async fn admin_grant(
        &self,
        user_id: i64,
        kind: PointKind,
        amount: i64,
        description: Option<String>,
    ) -> AppResult<GrantResponse> {
        let now = Utc::now();
        validate_grant(amount, now, now + self.config.grant_lifetime())?;

        let entry_id = retry_once("admin grant", || {
            let mut entry = self.entry(user_id, kind, amount, PointSource::AdminGrant);
            entry.description = description.clone();
            async move {
                let txn = self.pool.begin().await?;
                let entry_id = record_acquisition(&txn, entry).await?;
                txn.commit().await?;
                Ok(entry_id)
            }
        })
        .await?;

        log::info!("Admin granted {amount} {kind} points to user {user_id} (entry {entry_id})");

        let current = balance::read(&self.pool, user_id).await?;
        Ok(GrantResponse {
            entry_id,
            replayed: false,
            balance: BalanceResponse::new(current.free, current.paid),
        })
    }
}
