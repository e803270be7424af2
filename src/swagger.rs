use actix_web::web;
use utoipa::OpenApi;
use utoipa::{
    Modify,
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use crate::entities::{PointKind, PointSource, UsageType};
use crate::handlers;
use crate::models::*;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            )
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::points::get_balance,
        handlers::points::get_history,
        handlers::points::claim_daily_attendance,
        handlers::internal::spend,
        handlers::internal::credit_purchase,
        handlers::internal::reward_referral,
        handlers::internal::open_account,
        handlers::admin::grant_points,
        handlers::admin::reconcile,
        handlers::admin::migrate,
    ),
    components(
        schemas(
            PointKind,
            PointSource,
            UsageType,
            BalanceResponse,
            SpendDetails,
            SpendRequest,
            SpendOutcome,
            HistoryKind,
            EarnHistoryItem,
            SpendHistoryItem,
            HistoryItem,
            ReconcileDiff,
            UserReconcileReport,
            ReconcileSummary,
            ReconcileRequest,
            MigrationMismatch,
            MigrationReport,
            DailyAttendanceResponse,
            PurchaseCreditRequest,
            ReferralRewardRequest,
            ReferralRewardResponse,
            AdminGrantRequest,
            OpenAccountRequest,
            GrantResponse,
            ApiError,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "points", description = "User points API"),
        (name = "internal", description = "Service-to-service points API"),
        (name = "admin", description = "Points administration API"),
    ),
    info(
        title = "Points Ledger API",
        version = "1.0.0",
        description = "Points balance, ledger and reconciliation REST API documentation"
    ),
    servers(
        (url = "/api/v1", description = "Local server")
    )
)]
pub struct ApiDoc;

pub fn swagger_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
    )
    .route(
        "/swagger-ui",
        web::get().to(|| async {
            actix_web::HttpResponse::Found()
                .append_header(("Location", "/swagger-ui/"))
                .finish()
        }),
    );
}
