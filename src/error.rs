use actix_web::{HttpResponse, ResponseError};
use sea_orm::{DbErr, RuntimeErr, SqlxError};
use serde_json::json;
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Insufficient funds: required {required}, available {available}")]
    InsufficientFunds { required: i64, available: i64 },

    #[error("Concurrent modification, retry the operation")]
    ConcurrentModification,

    #[error("Ledger integrity violation: entry {entry_id} has balance {balance} outside [0, {amount}]")]
    LedgerIntegrityViolation {
        entry_id: i64,
        balance: i64,
        amount: i64,
    },

    #[error("Point migration has already run")]
    MigrationAlreadyRun,

    #[error("Database unavailable: {0}")]
    DatabaseUnavailable(String),

    #[error("Database error: {0}")]
    DatabaseError(DbErr),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Auth error: {0}")]
    AuthError(String),

    #[error("Forbidden")]
    Forbidden,

    #[error("Internal server error: {0}")]
    InternalError(String),

    #[error("JWT error: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

impl AppError {
    /// 只有事务序列化冲突可以整体重试一次
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::ConcurrentModification)
    }
}

// Postgres: serialization_failure / deadlock_detected
const RETRYABLE_SQLSTATES: [&str; 2] = ["40001", "40P01"];

fn sqlstate(err: &DbErr) -> Option<String> {
    let runtime = match err {
        DbErr::Exec(e) | DbErr::Query(e) | DbErr::Conn(e) => e,
        _ => return None,
    };
    match runtime {
        RuntimeErr::SqlxError(SqlxError::Database(db)) => {
            db.code().map(|c| c.into_owned())
        }
        _ => None,
    }
}

fn is_connection_failure(err: &DbErr) -> bool {
    match err {
        DbErr::Conn(_) | DbErr::ConnectionAcquire(_) => true,
        DbErr::Exec(RuntimeErr::SqlxError(e)) | DbErr::Query(RuntimeErr::SqlxError(e)) => matches!(
            e,
            SqlxError::Io(_) | SqlxError::PoolTimedOut | SqlxError::PoolClosed
        ),
        _ => false,
    }
}

impl From<DbErr> for AppError {
    fn from(err: DbErr) -> Self {
        if let Some(code) = sqlstate(&err)
            && RETRYABLE_SQLSTATES.contains(&code.as_str())
        {
            return AppError::ConcurrentModification;
        }
        if is_connection_failure(&err) {
            return AppError::DatabaseUnavailable(err.to_string());
        }
        AppError::DatabaseError(err)
    }
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let (status_code, error_code, message) = match self {
            AppError::InsufficientFunds {
                required,
                available,
            } => {
                log::info!("Insufficient points: required {required}, available {available}");
                (
                    actix_web::http::StatusCode::PAYMENT_REQUIRED,
                    "INSUFFICIENT_FUNDS",
                    "not enough points".to_string(),
                )
            }
            AppError::MigrationAlreadyRun => {
                log::warn!("Point migration requested again");
                (
                    actix_web::http::StatusCode::CONFLICT,
                    "MIGRATION_ALREADY_RUN",
                    self.to_string(),
                )
            }
            AppError::ValidationError(msg) => {
                log::warn!("Validation error: {msg}");
                (
                    actix_web::http::StatusCode::BAD_REQUEST,
                    "VALIDATION_ERROR",
                    msg.clone(),
                )
            }
            AppError::AuthError(msg) => {
                log::warn!("Authentication error: {msg}");
                (
                    actix_web::http::StatusCode::UNAUTHORIZED,
                    "AUTH_ERROR",
                    msg.clone(),
                )
            }
            AppError::JwtError(err) => {
                log::warn!("JWT error: {err}");
                (
                    actix_web::http::StatusCode::UNAUTHORIZED,
                    "AUTH_ERROR",
                    "Invalid access token".to_string(),
                )
            }
            AppError::Forbidden => {
                log::warn!("Forbidden access");
                (
                    actix_web::http::StatusCode::FORBIDDEN,
                    "FORBIDDEN",
                    "Forbidden".to_string(),
                )
            }
            AppError::DatabaseError(err) => {
                log::error!("Database error: {err}");
                (
                    actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "Database error".to_string(),
                )
            }
            AppError::DatabaseUnavailable(msg) => {
                log::error!("Database unavailable: {msg}");
                (
                    actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_UNAVAILABLE",
                    "Database unavailable".to_string(),
                )
            }
            _ => {
                log::error!("Internal error: {self}");
                (
                    actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "Internal server error".to_string(),
                )
            }
        };

        HttpResponse::build(status_code).json(json!({
            "success": false,
            "error": {
                "code": error_code,
                "message": message
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;

    #[test]
    fn test_insufficient_funds_maps_to_payment_required() {
        let err = AppError::InsufficientFunds {
            required: 10,
            available: 3,
        };
        assert_eq!(err.error_response().status(), StatusCode::PAYMENT_REQUIRED);
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_migration_already_run_maps_to_conflict() {
        assert_eq!(
            AppError::MigrationAlreadyRun.error_response().status(),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn test_db_errors_are_classified() {
        let err = AppError::from(DbErr::ConnectionAcquire(sea_orm::ConnAcquireErr::Timeout));
        assert!(matches!(err, AppError::DatabaseUnavailable(_)));

        let err = AppError::from(DbErr::RecordNotFound("points".to_string()));
        assert!(matches!(err, AppError::DatabaseError(_)));
        assert_eq!(
            err.error_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[derive(Debug)]
    struct PgError(&'static str);

    impl std::fmt::Display for PgError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "postgres error {}", self.0)
        }
    }

    impl std::error::Error for PgError {}

    impl sqlx::error::DatabaseError for PgError {
        fn message(&self) -> &str {
            "could not serialize access"
        }

        fn code(&self) -> Option<std::borrow::Cow<'_, str>> {
            Some(self.0.into())
        }

        fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn std::error::Error + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> sqlx::error::ErrorKind {
            sqlx::error::ErrorKind::Other
        }
    }

    fn pg_error(code: &'static str) -> DbErr {
        DbErr::Exec(RuntimeErr::SqlxError(SqlxError::Database(Box::new(PgError(code)))))
    }

    #[test]
    fn test_serialization_failures_map_to_concurrent_modification() {
        for code in ["40001", "40P01"] {
            let err = AppError::from(pg_error(code));
            assert!(matches!(err, AppError::ConcurrentModification), "{code}");
            assert!(err.is_retryable());
        }

        let err = AppError::from(pg_error("23505"));
        assert!(matches!(err, AppError::DatabaseError(_)));
    }

    #[test]
    fn test_pool_timeout_maps_to_unavailable() {
        let err = AppError::from(DbErr::Query(RuntimeErr::SqlxError(SqlxError::PoolTimedOut)));
        assert!(matches!(err, AppError::DatabaseUnavailable(_)));
    }

    #[test]
    fn test_only_concurrent_modification_is_retryable() {
        assert!(AppError::ConcurrentModification.is_retryable());
        assert!(!AppError::MigrationAlreadyRun.is_retryable());
    }
}
