//! 分页相关的数据结构

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const DEFAULT_LIMIT: u64 = 20;
/// 合并分页要从两张表各读 offset + limit 行，offset 需要上限
pub const MAX_OFFSET: u64 = 10_000;

#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
pub struct PaginationParams {
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl PaginationParams {
    pub fn new(limit: Option<u64>, offset: Option<u64>) -> Self {
        Self { limit, offset }
    }

    pub fn get_offset(&self) -> u64 {
        self.offset.unwrap_or(0)
    }

    pub fn validate_offset(&self) -> Result<u64, String> {
        let offset = self.get_offset();
        if offset > MAX_OFFSET {
            return Err(format!("offset must not exceed {MAX_OFFSET}"));
        }
        Ok(offset)
    }

    /// 限制在 1..=max_limit 之间
    pub fn get_limit(&self, max_limit: u64) -> u64 {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, max_limit.max(1))
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub limit: u64,
    pub offset: u64,
    pub total: u64,
    pub has_more: bool,
}

impl<T> PaginatedResponse<T> {
    pub fn new(data: Vec<T>, limit: u64, offset: u64, total: u64) -> Self {
        let has_more = offset.saturating_add(data.len() as u64) < total;
        Self {
            data,
            limit,
            offset,
            total,
            has_more,
        }
    }
}
