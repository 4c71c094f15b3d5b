//! Service-layer error type for kyora-cloud
//!
//! `ServiceError` bridges DB-layer errors (`sqlx::Error`, `BoxError`) and the
//! API-layer error (`AppError`), so handlers can use `?` on storage calls.

use axum::response::IntoResponse;
use shared::error::{AppError, ErrorCode};

use crate::BoxError;

/// Postgres SQLSTATE for unique_violation
const UNIQUE_VIOLATION: &str = "23505";
/// Postgres SQLSTATE for foreign_key_violation
const FOREIGN_KEY_VIOLATION: &str = "23503";

/// Service-layer error
///
/// - `Db`: database/infrastructure errors (logged, mapped to InternalError)
/// - `App`: business-rule errors (passed through to the client)
#[derive(Debug)]
pub enum ServiceError {
    Db(BoxError),
    App(AppError),
}

impl From<sqlx::Error> for ServiceError {
    fn from(e: sqlx::Error) -> Self {
        match classify_sqlx(&e) {
            Some(app_err) => ServiceError::App(app_err),
            None => ServiceError::Db(e.into()),
        }
    }
}

impl From<BoxError> for ServiceError {
    fn from(e: BoxError) -> Self {
        ServiceError::Db(e)
    }
}

impl From<AppError> for ServiceError {
    fn from(e: AppError) -> Self {
        ServiceError::App(e)
    }
}

impl From<ServiceError> for AppError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::App(app_err) => app_err,
            ServiceError::Db(db_err) => {
                tracing::error!(error = %db_err, "Service database error");
                AppError::new(ErrorCode::InternalError)
            }
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> axum::response::Response {
        let app_error: AppError = self.into();
        app_error.into_response()
    }
}

/// Convenience type alias for service-layer results
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Map the sqlx errors that carry client-facing meaning.
fn classify_sqlx(e: &sqlx::Error) -> Option<AppError> {
    match e {
        sqlx::Error::RowNotFound => Some(AppError::new(ErrorCode::NotFound)),
        sqlx::Error::Database(db) => match db.code().as_deref() {
            Some(UNIQUE_VIOLATION) => {
                let mut err = AppError::new(ErrorCode::Conflict);
                if let Some(constraint) = db.constraint() {
                    err = err.with_detail("constraint", constraint);
                }
                Some(err)
            }
            Some(FOREIGN_KEY_VIOLATION) => Some(AppError::with_message(
                ErrorCode::Conflict,
                "referenced resource does not exist or is still in use",
            )),
            _ => None,
        },
        _ => None,
    }
}

/// `true` when the error is a unique violation on `constraint`.
pub fn is_unique_violation(e: &sqlx::Error, constraint: &str) -> bool {
    match e {
        sqlx::Error::Database(db) => {
            db.code().as_deref() == Some(UNIQUE_VIOLATION) && db.constraint() == Some(constraint)
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_not_found_maps_to_404() {
        let err: AppError = ServiceError::from(sqlx::Error::RowNotFound).into();
        assert_eq!(err.code, ErrorCode::NotFound);
        assert_eq!(err.http_status(), http::StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_db_error_hides_details() {
        let err: AppError = ServiceError::from(sqlx::Error::PoolTimedOut).into();
        assert_eq!(err.code, ErrorCode::InternalError);
        assert!(!err.message.contains("pool"));
    }

    #[test]
    fn test_app_error_passes_through() {
        let err: AppError =
            ServiceError::from(AppError::new(ErrorCode::ExpenseNotFound)).into();
        assert_eq!(err.code, ErrorCode::ExpenseNotFound);
    }
}
