//! Service-to-service endpoints: the chat service spends, the payment
//! service confirms purchases, signup opens accounts and credits referrals.

use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;

use crate::handlers::require_role;
use crate::models::*;
use crate::services::{GrantService, PointsService};
use crate::utils::Role;

const CALLERS: &[Role] = &[Role::Service, Role::Admin];

#[utoipa::path(
    post,
    path = "/internal/points/spend",
    tag = "internal",
    request_body = SpendRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "扣费成功", body = SpendOutcome),
        (status = 400, description = "请求参数错误"),
        (status = 402, description = "积分不足"),
        (status = 403, description = "无权限")
    )
)]
pub async fn spend(
    points_service: web::Data<PointsService>,
    req: HttpRequest,
    request: web::Json<SpendRequest>,
) -> Result<HttpResponse> {
    if let Err(e) = require_role(&req, CALLERS) {
        return Ok(e.error_response());
    }
    let request = request.into_inner();

    match points_service
        .spend(request.user_id, request.cost, request.usage_type, request.details)
        .await
    {
        Ok(outcome) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": outcome
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/internal/points/purchases",
    tag = "internal",
    request_body = PurchaseCreditRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "付费积分已入账（重复回调返回原流水）", body = GrantResponse),
        (status = 400, description = "请求参数错误"),
        (status = 403, description = "无权限")
    )
)]
pub async fn credit_purchase(
    grant_service: web::Data<GrantService>,
    req: HttpRequest,
    request: web::Json<PurchaseCreditRequest>,
) -> Result<HttpResponse> {
    if let Err(e) = require_role(&req, CALLERS) {
        return Ok(e.error_response());
    }

    match grant_service
        .credit_purchase(request.user_id, request.points, &request.payment_reference)
        .await
    {
        Ok(result) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": result
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/internal/points/referrals",
    tag = "internal",
    request_body = ReferralRewardRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "推荐奖励结果", body = ReferralRewardResponse),
        (status = 400, description = "不能推荐自己"),
        (status = 403, description = "无权限")
    )
)]
pub async fn reward_referral(
    grant_service: web::Data<GrantService>,
    req: HttpRequest,
    request: web::Json<ReferralRewardRequest>,
) -> Result<HttpResponse> {
    if let Err(e) = require_role(&req, CALLERS) {
        return Ok(e.error_response());
    }

    match grant_service
        .reward_referral(request.referrer_id, request.referee_id)
        .await
    {
        Ok(result) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": result
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/internal/points/accounts",
    tag = "internal",
    request_body = OpenAccountRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "积分账户已创建", body = BalanceResponse),
        (status = 403, description = "无权限")
    )
)]
pub async fn open_account(
    grant_service: web::Data<GrantService>,
    req: HttpRequest,
    request: web::Json<OpenAccountRequest>,
) -> Result<HttpResponse> {
    if let Err(e) = require_role(&req, CALLERS) {
        return Ok(e.error_response());
    }

    match grant_service.open_account(request.user_id).await {
        Ok(balance) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": balance
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn internal_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/internal/points")
            .route("/spend", web::post().to(spend))
            .route("/purchases", web::post().to(credit_purchase))
            .route("/referrals", web::post().to(reward_referral))
            .route("/accounts", web::post().to(open_account)),
    );
}
