use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;

use crate::handlers::current_user;
use crate::models::*;
use crate::services::{GrantService, PointsService};

#[utoipa::path(
    get,
    path = "/points/balance",
    tag = "points",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "当前积分余额", body = BalanceResponse),
        (status = 401, description = "未授权")
    )
)]
pub async fn get_balance(
    points_service: web::Data<PointsService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let user = match current_user(&req) {
        Ok(user) => user,
        Err(e) => return Ok(e.error_response()),
    };

    match points_service.get_balance(user.user_id).await {
        Ok(balance) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": balance
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/points/history",
    tag = "points",
    params(
        ("limit" = Option<u64>, Query, description = "每页数量"),
        ("offset" = Option<u64>, Query, description = "偏移量，最大 10000"),
        ("kind" = Option<HistoryKind>, Query, description = "earn / spend / all")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "积分明细（获取与消费合并，按时间倒序）"),
        (status = 400, description = "偏移量超出上限"),
        (status = 401, description = "未授权")
    )
)]
pub async fn get_history(
    points_service: web::Data<PointsService>,
    req: HttpRequest,
    query: web::Query<HistoryQuery>,
) -> Result<HttpResponse> {
    let user = match current_user(&req) {
        Ok(user) => user,
        Err(e) => return Ok(e.error_response()),
    };

    match points_service.get_history(user.user_id, &query).await {
        Ok(page) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": page
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/points/daily-attendance",
    tag = "points",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "签到结果，当天已签到时 claimed 为 false", body = DailyAttendanceResponse),
        (status = 401, description = "未授权")
    )
)]
pub async fn claim_daily_attendance(
    grant_service: web::Data<GrantService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let user = match current_user(&req) {
        Ok(user) => user,
        Err(e) => return Ok(e.error_response()),
    };

    match grant_service.claim_daily_attendance(user.user_id).await {
        Ok(result) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": result
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn points_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/points")
            .route("/balance", web::get().to(get_balance))
            .route("/history", web::get().to(get_history))
            .route("/daily-attendance", web::post().to(claim_daily_attendance)),
    );
}
