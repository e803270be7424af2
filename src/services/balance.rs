//! Balance cache: the per-user `points` row consulted on every spend.
//!
//! Reads are plain queries; every mutation takes a `DatabaseTransaction` so the
//! sufficiency check and the write can never be split across transactions.

use crate::entities::{PointKind, balance_entity as points};
use crate::error::{AppError, AppResult};
use chrono::Utc;
use sea_orm::sea_query::{Expr, OnConflict, Query};
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseTransaction, DbErr, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Balance {
    pub free: i64,
    pub paid: i64,
}

impl Balance {
    pub fn total(&self) -> i64 {
        self.free + self.paid
    }

    pub fn get(&self, kind: PointKind) -> i64 {
        match kind {
            PointKind::Free => self.free,
            PointKind::Paid => self.paid,
        }
    }
}

impl From<&points::Model> for Balance {
    fn from(row: &points::Model) -> Self {
        Self {
            free: row.free_points,
            paid: row.paid_points,
        }
    }
}

/// 一次扣费在免费/付费积分之间的拆分
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DebitSplit {
    pub free_used: i64,
    pub paid_used: i64,
    pub after: Balance,
}

/// 先扣免费积分，再扣付费积分；余额不足时不做任何变动
pub fn split_debit(current: Balance, cost: i64) -> AppResult<DebitSplit> {
    if current.total() < cost {
        return Err(AppError::InsufficientFunds {
            required: cost,
            available: current.total(),
        });
    }
    let free_after = (current.free - cost).max(0);
    let remainder = (cost - current.free).max(0);
    let paid_after = (current.paid - remainder).max(0);

    Ok(DebitSplit {
        free_used: current.free - free_after,
        paid_used: current.paid - paid_after,
        after: Balance {
            free: free_after,
            paid: paid_after,
        },
    })
}

fn column_for(kind: PointKind) -> points::Column {
    match kind {
        PointKind::Free => points::Column::FreePoints,
        PointKind::Paid => points::Column::PaidPoints,
    }
}

/// 创建零余额行（注册时调用），已存在则不变
pub async fn ensure<C: ConnectionTrait>(db: &C, user_id: i64) -> Result<(), DbErr> {
    let now = Utc::now();
    let insert = Query::insert()
        .into_table(points::Entity)
        .columns([
            points::Column::UserId,
            points::Column::FreePoints,
            points::Column::PaidPoints,
            points::Column::CreatedAt,
            points::Column::UpdatedAt,
        ])
        .values_panic([
            user_id.into(),
            0i64.into(),
            0i64.into(),
            now.into(),
            now.into(),
        ])
        .on_conflict(
            OnConflict::column(points::Column::UserId)
                .do_nothing()
                .to_owned(),
        )
        .to_owned();
    let stmt = db.get_database_backend().build(&insert);
    db.execute(stmt).await?;
    Ok(())
}

/// 读取余额；没有缓存行的用户视为零余额
pub async fn read<C: ConnectionTrait>(db: &C, user_id: i64) -> Result<Balance, DbErr> {
    let row = points::Entity::find()
        .filter(points::Column::UserId.eq(user_id))
        .one(db)
        .await?;
    Ok(row.as_ref().map(Balance::from).unwrap_or_default())
}

/// 锁定用户的缓存行（Postgres 上为 `SELECT ... FOR UPDATE`），同一用户的写操作在此串行
pub async fn lock(txn: &DatabaseTransaction, user_id: i64) -> Result<Option<Balance>, DbErr> {
    let row = points::Entity::find()
        .filter(points::Column::UserId.eq(user_id))
        .lock_exclusive()
        .one(txn)
        .await?;
    Ok(row.as_ref().map(Balance::from))
}

/// 原子增加某一类积分
pub async fn credit(
    txn: &DatabaseTransaction,
    user_id: i64,
    kind: PointKind,
    amount: i64,
) -> Result<(), DbErr> {
    ensure(txn, user_id).await?;
    let column = column_for(kind);
    points::Entity::update_many()
        .col_expr(column, Expr::col(column).add(amount))
        .col_expr(points::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(points::Column::UserId.eq(user_id))
        .exec(txn)
        .await?;
    Ok(())
}

/// 在调用方事务内：锁行、校验余额、按先免费后付费扣减
pub async fn debit(txn: &DatabaseTransaction, user_id: i64, cost: i64) -> AppResult<DebitSplit> {
    let current = lock(txn, user_id).await?.unwrap_or_default();
    let split = split_debit(current, cost)?;

    points::Entity::update_many()
        .col_expr(points::Column::FreePoints, Expr::value(split.after.free))
        .col_expr(points::Column::PaidPoints, Expr::value(split.after.paid))
        .col_expr(points::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(points::Column::UserId.eq(user_id))
        .exec(txn)
        .await?;

    Ok(split)
}

/// 直接覆盖某一类积分，仅供对账使用
pub(crate) async fn overwrite(
    txn: &DatabaseTransaction,
    user_id: i64,
    kind: PointKind,
    value: i64,
) -> Result<(), DbErr> {
    points::Entity::update_many()
        .col_expr(column_for(kind), Expr::value(value))
        .col_expr(points::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(points::Column::UserId.eq(user_id))
        .exec(txn)
        .await?;
    Ok(())
}

pub async fn list_user_ids<C: ConnectionTrait>(db: &C) -> Result<Vec<i64>, DbErr> {
    points::Entity::find()
        .select_only()
        .column(points::Column::UserId)
        .order_by_asc(points::Column::Id)
        .into_tuple::<i64>()
        .all(db)
        .await
}

/// 旧版扁平余额中任一类积分大于 0 的用户
pub async fn list_nonzero<C: ConnectionTrait>(db: &C) -> Result<Vec<points::Model>, DbErr> {
    points::Entity::find()
        .filter(
            points::Column::FreePoints
                .gt(0)
                .or(points::Column::PaidPoints.gt(0)),
        )
        .order_by_asc(points::Column::Id)
        .all(db)
        .await
}
