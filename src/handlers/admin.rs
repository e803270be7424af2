use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;

use crate::handlers::require_role;
use crate::models::*;
use crate::services::{GrantService, MigrationService, ReconciliationService};
use crate::utils::Role;

#[utoipa::path(
    post,
    path = "/admin/points/grant",
    tag = "admin",
    request_body = AdminGrantRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "发放成功", body = GrantResponse),
        (status = 400, description = "请求参数错误"),
        (status = 403, description = "无权限")
    )
)]
pub async fn grant_points(
    grant_service: web::Data<GrantService>,
    req: HttpRequest,
    request: web::Json<AdminGrantRequest>,
) -> Result<HttpResponse> {
    if let Err(e) = require_role(&req, &[Role::Admin]) {
        return Ok(e.error_response());
    }
    let request = request.into_inner();

    match grant_service
        .admin_grant(request.user_id, request.kind, request.amount, request.description)
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
    path = "/admin/points/reconcile",
    tag = "admin",
    request_body = ReconcileRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "对账完成，指定 user_id 时返回该用户的差异，否则返回汇总"),
        (status = 403, description = "无权限")
    )
)]
pub async fn reconcile(
    reconciliation_service: web::Data<ReconciliationService>,
    req: HttpRequest,
    request: Option<web::Json<ReconcileRequest>>,
) -> Result<HttpResponse> {
    if let Err(e) = require_role(&req, &[Role::Admin]) {
        return Ok(e.error_response());
    }
    let request = request.map(|r| r.into_inner()).unwrap_or_default();

    match request.user_id {
        Some(user_id) => match reconciliation_service.reconcile_user(user_id).await {
            Ok(diffs) => Ok(HttpResponse::Ok().json(json!({
                "success": true,
                "data": {
                    "user_id": user_id,
                    "diffs": diffs
                }
            }))),
            Err(e) => Ok(e.error_response()),
        },
        None => match reconciliation_service.reconcile_all().await {
            Ok(summary) => Ok(HttpResponse::Ok().json(json!({
                "success": true,
                "data": summary
            }))),
            Err(e) => Ok(e.error_response()),
        },
    }
}

#[utoipa::path(
    post,
    path = "/admin/points/migrate",
    tag = "admin",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "迁移完成", body = MigrationReport),
        (status = 403, description = "无权限"),
        (status = 409, description = "迁移已执行过")
    )
)]
pub async fn migrate(
    migration_service: web::Data<MigrationService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    if let Err(e) = require_role(&req, &[Role::Admin]) {
        return Ok(e.error_response());
    }

    match migration_service.run_migration().await {
        Ok(report) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": report,
            "message": "积分迁移完成"
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn admin_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/admin/points")
            .route("/grant", web::post().to(grant_points))
            .route("/reconcile", web::post().to(reconcile))
            .route("/migrate", web::post().to(migrate)),
    );
}
