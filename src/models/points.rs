use crate::entities::{
    PointKind, PointSource, UsageType, ledger_entry_entity as ledger, spend_record_entity as spends,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct BalanceResponse {
    pub free: i64,
    pub paid: i64,
    pub total: i64,
}

impl BalanceResponse {
    pub fn new(free: i64, paid: i64) -> Self {
        Self {
            free,
            paid,
            total: free + paid,
        }
    }
}

/// 扣费时由调用方（聊天服务）提供的上下文
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct SpendDetails {
    pub description: Option<String>,
    pub related_chat_id: Option<String>,
    pub related_message_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SpendRequest {
    pub user_id: i64,
    pub cost: i64,
    pub usage_type: UsageType,
    #[serde(flatten)]
    pub details: SpendDetails,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct SpendOutcome {
    pub free_used: i64,
    pub paid_used: i64,
    pub balance: BalanceResponse,
    /// cost 为 0 时不会写入消费记录
    pub record_id: Option<i64>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum HistoryKind {
    Earn,
    Spend,
    #[default]
    All,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct HistoryQuery {
    pub limit: Option<u64>,
    pub offset: Option<u64>,
    #[serde(default)]
    pub kind: HistoryKind,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct EarnHistoryItem {
    pub id: i64,
    pub kind: PointKind,
    pub amount: i64,
    pub balance: i64,
    pub source: PointSource,
    pub description: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub occurred_at: DateTime<Utc>,
}

impl From<ledger::Model> for EarnHistoryItem {
    fn from(entry: ledger::Model) -> Self {
        Self {
            id: entry.id,
            kind: entry.kind,
            amount: entry.amount,
            balance: entry.balance,
            source: entry.source,
            description: entry.description,
            expires_at: entry.expires_at,
            occurred_at: entry.acquired_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct SpendHistoryItem {
    pub id: i64,
    pub points_used: i64,
    pub usage_type: UsageType,
    pub description: Option<String>,
    pub related_chat_id: Option<String>,
    pub related_message_id: Option<String>,
    #[schema(value_type = Object)]
    pub details: serde_json::Value,
    pub occurred_at: DateTime<Utc>,
}

impl From<spends::Model> for SpendHistoryItem {
    fn from(record: spends::Model) -> Self {
        Self {
            id: record.id,
            points_used: record.points_used,
            usage_type: record.usage_type,
            description: record.description,
            related_chat_id: record.related_chat_id,
            related_message_id: record.related_message_id,
            details: record.transaction_details,
            occurred_at: record.created_at,
        }
    }
}

/// 积分明细：获取与消费两张表合并后的一条
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HistoryItem {
    Earn(EarnHistoryItem),
    Spend(SpendHistoryItem),
}

impl HistoryItem {
    pub fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            HistoryItem::Earn(item) => item.occurred_at,
            HistoryItem::Spend(item) => item.occurred_at,
        }
    }

    pub fn id(&self) -> i64 {
        match self {
            HistoryItem::Earn(item) => item.id,
            HistoryItem::Spend(item) => item.id,
        }
    }

    fn source_rank(&self) -> u8 {
        match self {
            HistoryItem::Spend(_) => 0,
            HistoryItem::Earn(_) => 1,
        }
    }

    /// Newest first. Ties on the timestamp put spends before earns, then higher ids first,
    /// matching the `ORDER BY ... DESC, id DESC` both tables are read with.
    pub fn newest_first(a: &HistoryItem, b: &HistoryItem) -> Ordering {
        b.occurred_at()
            .cmp(&a.occurred_at())
            .then_with(|| a.source_rank().cmp(&b.source_rank()))
            .then_with(|| b.id().cmp(&a.id()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct ReconcileDiff {
    pub kind: PointKind,
    pub stored: i64,
    pub actual: i64,
    pub corrected: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserReconcileReport {
    pub user_id: i64,
    pub diffs: Vec<ReconcileDiff>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl UserReconcileReport {
    pub fn corrected(&self) -> bool {
        self.diffs.iter().any(|d| d.corrected)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReconcileSummary {
    pub users_checked: u64,
    pub users_corrected: u64,
    pub users_failed: u64,
    /// 只包含发生修正或失败的用户
    pub reports: Vec<UserReconcileReport>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ReconcileRequest {
    pub user_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct MigrationMismatch {
    pub user_id: i64,
    pub kind: PointKind,
    pub expected: i64,
    pub migrated: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MigrationReport {
    pub users_processed: u64,
    pub entries_created: u64,
    pub verification_mismatches: Vec<MigrationMismatch>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DailyAttendanceResponse {
    pub claimed: bool,
    pub points: i64,
    pub balance: BalanceResponse,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PurchaseCreditRequest {
    pub user_id: i64,
    pub points: i64,
    /// 支付方的唯一凭证（如 Stripe checkout session id），用于幂等
    pub payment_reference: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReferralRewardRequest {
    pub referrer_id: i64,
    pub referee_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReferralRewardResponse {
    pub rewarded: bool,
    pub referrer_entry_id: Option<i64>,
    pub referee_entry_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AdminGrantRequest {
    pub user_id: i64,
    pub kind: PointKind,
    pub amount: i64,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OpenAccountRequest {
    pub user_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct GrantResponse {
    pub entry_id: i64,
    /// 重复的支付回调返回原始流水
    pub replayed: bool,
    pub balance: BalanceResponse,
}
