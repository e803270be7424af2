#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use migration::{Migrator, MigratorTrait};
use points_ledger::config::{ConsumptionPolicy, PointsConfig};
use points_ledger::entities::{
    PointKind, PointSource, UsageType, balance_entity as points, ledger_entry_entity as ledger,
    spend_record_entity as spends,
};
use points_ledger::services::ledger::{self as ledger_store, NewLedgerEntry};
use points_ledger::services::{GrantService, MigrationService, PointsService, ReconciliationService};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectOptions, Database, DatabaseConnection, EntityTrait,
    QueryFilter, QueryOrder, Set,
};

/// 内存 SQLite，只开一个连接，否则每个连接各自是一个空库
pub async fn setup_db() -> DatabaseConnection {
    let mut options = ConnectOptions::new("sqlite::memory:".to_string());
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);
    let db = Database::connect(options).await.unwrap();
    Migrator::up(&db, None).await.unwrap();
    db
}

pub fn points_config() -> PointsConfig {
    PointsConfig::default()
}

pub fn fifo_config() -> PointsConfig {
    PointsConfig {
        consumption_policy: ConsumptionPolicy::LedgerFifo,
        ..PointsConfig::default()
    }
}

pub struct Services {
    pub db: DatabaseConnection,
    pub points: PointsService,
    pub grants: GrantService,
    pub reconciliation: ReconciliationService,
    pub migration: MigrationService,
}

pub async fn services_with(config: PointsConfig) -> Services {
    let db = setup_db().await;
    Services {
        points: PointsService::new(db.clone(), config.clone()),
        grants: GrantService::new(db.clone(), config.clone()),
        reconciliation: ReconciliationService::new(db.clone(), config.clone()),
        migration: MigrationService::new(db.clone(), config),
        db,
    }
}

pub async fn services() -> Services {
    services_with(points_config()).await
}

/// Whole seconds so values survive the SQLite text round trip unchanged.
pub fn days_ago(days: i64) -> DateTime<Utc> {
    let now = Utc::now().timestamp();
    Utc.timestamp_opt(now, 0).unwrap() - Duration::days(days)
}

pub fn days_from_now(days: i64) -> DateTime<Utc> {
    days_ago(-days)
}

/// 直接写一条流水，不经过余额缓存
pub async fn seed_entry(
    db: &DatabaseConnection,
    user_id: i64,
    kind: PointKind,
    amount: i64,
    balance: i64,
    expires_at: DateTime<Utc>,
) -> i64 {
    let entry = NewLedgerEntry {
        user_id,
        kind,
        amount,
        balance,
        source: PointSource::Purchase,
        description: None,
        acquired_at: days_ago(30),
        expires_at,
    };
    ledger_store::append(db, entry).await.unwrap()
}

/// 直接写缓存行（旧版扁平余额或人为制造的偏差）
pub async fn seed_cache(
    db: &DatabaseConnection,
    user_id: i64,
    free: i64,
    paid: i64,
    updated_at: Option<DateTime<Utc>>,
) {
    points::ActiveModel {
        user_id: Set(user_id),
        free_points: Set(free),
        paid_points: Set(paid),
        created_at: Set(Some(days_ago(400))),
        updated_at: Set(updated_at),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap();
}

pub async fn seed_spend(
    db: &DatabaseConnection,
    user_id: i64,
    points_used: i64,
    created_at: DateTime<Utc>,
) -> i64 {
    let record = spends::ActiveModel {
        user_id: Set(user_id),
        points_used: Set(points_used),
        usage_type: Set(UsageType::ChatMessage),
        description: Set(None),
        related_chat_id: Set(None),
        related_message_id: Set(None),
        transaction_details: Set(serde_json::json!({})),
        created_at: Set(created_at),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap();
    record.id
}

pub async fn ledger_entries(db: &DatabaseConnection, user_id: i64) -> Vec<ledger::Model> {
    ledger::Entity::find()
        .filter(ledger::Column::UserId.eq(user_id))
        .order_by_asc(ledger::Column::Id)
        .all(db)
        .await
        .unwrap()
}

pub async fn spend_records(db: &DatabaseConnection, user_id: i64) -> Vec<spends::Model> {
    spends::Entity::find()
        .filter(spends::Column::UserId.eq(user_id))
        .order_by_asc(spends::Column::Id)
        .all(db)
        .await
        .unwrap()
}

/// 当前未过期流水的 balance 合计
pub async fn active_ledger_total(db: &DatabaseConnection, user_id: i64, kind: PointKind) -> i64 {
    let active = ledger_store::list_active(db, user_id, kind, Utc::now())
        .await
        .unwrap();
    ledger_store::active_total(&active)
}
