//! Error type and its Problem JSON rendering

use super::codes::ErrorCode;
use http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use thiserror::Error;

/// Media type of every error body
pub const PROBLEM_JSON_CONTENT_TYPE: &str = "application/problem+json";

/// Application error with structured error code and details
///
/// This is the primary error type for kyora, providing:
/// - Standardized error codes via [`ErrorCode`]
/// - Human-readable messages
/// - Optional structured details, rendered as Problem `extensions`
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct AppError {
    /// The error code identifying the type of error
    pub code: ErrorCode,
    /// Human-readable error message
    pub message: String,
    /// Optional additional details (field-level errors, ids, context)
    pub details: Option<HashMap<String, Value>>,
}

impl AppError {
    /// Create a new error with the default message for the error code
    pub fn new(code: ErrorCode) -> Self {
        Self {
            message: code.message().to_string(),
            code,
            details: None,
        }
    }

    /// Create a new error with a custom message
    pub fn with_message(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    /// Add a detail entry to this error
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }

    /// Get the HTTP status code for this error
    pub fn http_status(&self) -> StatusCode {
        self.code.http_status()
    }

    // ==================== Convenience constructors ====================

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::ValidationFailed, msg)
    }

    /// Create a generic not found error
    pub fn not_found(resource: impl Into<String>) -> Self {
        let r = resource.into();
        Self::with_message(ErrorCode::NotFound, format!("{r} not found")).with_detail("resource", r)
    }

    /// Create a conflict error
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::Conflict, msg)
    }

    /// Create an invalid request error
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::InvalidRequest, msg)
    }

    /// Create a not authenticated error
    pub fn unauthorized() -> Self {
        Self::new(ErrorCode::NotAuthenticated)
    }

    /// Create a permission denied error
    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::PermissionDenied, msg)
    }

    /// Create an invalid credentials error
    pub fn invalid_credentials() -> Self {
        Self::new(ErrorCode::InvalidCredentials)
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::InternalError, msg)
    }

    /// Build the Problem body for this error
    pub fn to_problem(&self) -> ProblemDetails {
        let status = self.http_status();
        let mut extensions = Map::new();
        if let Some(details) = &self.details {
            for (k, v) in details {
                extensions.insert(k.clone(), v.clone());
            }
        }
        extensions.insert("code".into(), Value::String(self.code.key().to_string()));

        ProblemDetails {
            problem_type: "about:blank".to_string(),
            title: status
                .canonical_reason()
                .unwrap_or("Unknown Error")
                .to_string(),
            status: status.as_u16(),
            detail: self.message.clone(),
            extensions,
        }
    }
}

/// RFC 7807 style error body
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProblemDetails {
    #[serde(rename = "type")]
    pub problem_type: String,
    pub title: String,
    pub status: u16,
    pub detail: String,
    #[serde(default)]
    pub extensions: Map<String, Value>,
}

impl ProblemDetails {
    /// Machine-readable code from `extensions.code`
    pub fn code(&self) -> Option<&str> {
        self.extensions.get("code").and_then(Value::as_str)
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields = Map::new();
        for (field, errs) in errors.field_errors() {
            let messages: Vec<Value> = errs
                .iter()
                .map(|e| {
                    Value::String(
                        e.message
                            .as_ref()
                            .map(|m| m.to_string())
                            .unwrap_or_else(|| e.code.to_string()),
                    )
                })
                .collect();
            fields.insert(field.to_string(), Value::Array(messages));
        }
        AppError::validation("Request validation failed").with_detail("fields", Value::Object(fields))
    }
}

/// Type alias for Result with AppError
pub type AppResult<T> = Result<T, AppError>;

// ===== Axum Integration =====

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        use axum::Json;

        let status = self.http_status();
        let body = self.to_problem();

        // Log system errors
        if matches!(
            self.code.category(),
            super::category::ErrorCategory::System
        ) {
            tracing::error!(
                code = %self.code,
                message = %self.message,
                "System error occurred"
            );
        }

        (
            status,
            [(http::header::CONTENT_TYPE, PROBLEM_JSON_CONTENT_TYPE)],
            Json(body),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[test]
    fn test_app_error_new() {
        let err = AppError::new(ErrorCode::ExpenseNotFound);
        assert_eq!(err.code, ErrorCode::ExpenseNotFound);
        assert_eq!(err.message, "Expense not found");
        assert!(err.details.is_none());
    }

    #[test]
    fn test_app_error_with_detail() {
        let err = AppError::validation("Missing required fields")
            .with_detail("field", "email")
            .with_detail("reason", "required");

        assert_eq!(err.code, ErrorCode::ValidationFailed);
        let details = err.details.unwrap();
        assert_eq!(details.get("field").unwrap(), "email");
        assert_eq!(details.get("reason").unwrap(), "required");
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::with_message(ErrorCode::OrderNotFound, "order ord_1 not found");
        assert_eq!(format!("{}", err), "order ord_1 not found");
    }

    #[test]
    fn test_problem_body_shape() {
        let err = AppError::new(ErrorCode::RecurringExpenseInvalidStatusTransition)
            .with_detail("from", "ended")
            .with_detail("to", "active");
        let problem = err.to_problem();

        assert_eq!(problem.status, 409);
        assert_eq!(problem.title, "Conflict");
        assert_eq!(problem.problem_type, "about:blank");
        assert_eq!(problem.detail, "invalid status transition");
        assert_eq!(
            problem.code(),
            Some("recurring_expense.invalid_status_transition")
        );
        assert_eq!(problem.extensions.get("from").unwrap(), "ended");
        assert_eq!(problem.extensions.get("to").unwrap(), "active");
    }

    #[test]
    fn test_problem_serialize() {
        let problem = AppError::not_found("thing").to_problem();
        let json = serde_json::to_value(&problem).unwrap();
        assert_eq!(json["type"], "about:blank");
        assert_eq!(json["status"], 404);
        assert_eq!(json["title"], "Not Found");
        assert_eq!(json["detail"], "thing not found");
        assert_eq!(json["extensions"]["code"], "general.not_found");
        assert_eq!(json["extensions"]["resource"], "thing");
    }

    #[test]
    fn test_code_extension_cannot_be_overridden_by_details() {
        let problem = AppError::conflict("dup")
            .with_detail("code", "spoofed")
            .to_problem();
        assert_eq!(problem.code(), Some("general.conflict"));
    }

    #[derive(Validate)]
    struct Payload {
        #[validate(length(min = 1, message = "name is required"))]
        name: String,
    }

    #[test]
    fn test_from_validation_errors() {
        let errors = Payload {
            name: String::new(),
        }
        .validate()
        .unwrap_err();
        let err: AppError = errors.into();
        assert_eq!(err.code, ErrorCode::ValidationFailed);
        let fields = &err.details.unwrap()["fields"];
        assert_eq!(fields["name"][0], "name is required");
    }

    #[test]
    fn test_into_response_status_and_content_type() {
        use axum::response::IntoResponse;

        let response = AppError::new(ErrorCode::CustomerNotFound).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            response.headers().get(http::header::CONTENT_TYPE).unwrap(),
            PROBLEM_JSON_CONTENT_TYPE
        );
    }
}
