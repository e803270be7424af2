use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// 积分类别：免费积分（签到、推荐、迁移）与付费积分（购买）
#[derive(
    Debug,
    Clone,
    Copy,
    Serialize,
    Deserialize,
    PartialEq,
    Eq,
    Hash,
    ToSchema,
    DeriveActiveEnum,
    EnumIter,
)]
#[sea_orm(rs_type = "String", db_type = "String(Some(16))")]
#[serde(rename_all = "snake_case")]
pub enum PointKind {
    #[sea_orm(string_value = "free")]
    Free,
    #[sea_orm(string_value = "paid")]
    Paid,
}

impl std::fmt::Display for PointKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PointKind::Free => write!(f, "free"),
            PointKind::Paid => write!(f, "paid"),
        }
    }
}

/// 积分来源
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema, DeriveActiveEnum, EnumIter,
)]
#[sea_orm(rs_type = "String", db_type = "String(Some(32))")]
#[serde(rename_all = "snake_case")]
pub enum PointSource {
    #[sea_orm(string_value = "daily_attendance")]
    DailyAttendance,
    #[sea_orm(string_value = "purchase")]
    Purchase,
    #[sea_orm(string_value = "referral")]
    Referral,
    #[sea_orm(string_value = "admin_grant")]
    AdminGrant,
    #[sea_orm(string_value = "migration")]
    Migration,
}

impl std::fmt::Display for PointSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PointSource::DailyAttendance => write!(f, "daily_attendance"),
            PointSource::Purchase => write!(f, "purchase"),
            PointSource::Referral => write!(f, "referral"),
            PointSource::AdminGrant => write!(f, "admin_grant"),
            PointSource::Migration => write!(f, "migration"),
        }
    }
}

/// 消耗积分的动作
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema, DeriveActiveEnum, EnumIter,
)]
#[sea_orm(rs_type = "String", db_type = "String(Some(32))")]
#[serde(rename_all = "snake_case")]
pub enum UsageType {
    #[sea_orm(string_value = "chat_message")]
    ChatMessage,
    #[sea_orm(string_value = "response_boost")]
    ResponseBoost,
}

impl std::fmt::Display for UsageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UsageType::ChatMessage => write!(f, "chat_message"),
            UsageType::ResponseBoost => write!(f, "response_boost"),
        }
    }
}
