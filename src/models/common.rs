use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// 错误响应中 `error` 字段的结构，见 `AppError::error_response`
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}
