pub mod admin;
pub mod internal;
pub mod points;

pub use admin::admin_config;
pub use internal::internal_config;
pub use points::points_config;

use crate::error::{AppError, AppResult};
use crate::middlewares::AuthUser;
use crate::utils::Role;
use actix_web::{HttpMessage, HttpRequest};

pub(crate) fn current_user(req: &HttpRequest) -> AppResult<AuthUser> {
    req.extensions()
        .get::<AuthUser>()
        .copied()
        .ok_or_else(|| AppError::AuthError("Missing access token".to_string()))
}

/// 取出调用方并检查角色
pub(crate) fn require_role(req: &HttpRequest, allowed: &[Role]) -> AppResult<AuthUser> {
    let user = current_user(req)?;
    if !allowed.contains(&user.role) {
        log::warn!("User {} with role {} denied", user.user_id, user.role);
        return Err(AppError::Forbidden);
    }
    Ok(user)
}

/// 挂载 `/api/v1` 下的全部积分路由
pub fn api_config(cfg: &mut actix_web::web::ServiceConfig) {
    cfg.service(
        actix_web::web::scope("/api/v1")
            .configure(points_config)
            .configure(internal_config)
            .configure(admin_config),
    );
}
