//! Unified error system for kyora
//!
//! This module provides:
//! - [`ErrorCode`]: Standardized error codes with dot-namespaced keys
//! - [`ErrorCategory`]: Classification of errors by domain
//! - [`AppError`]: Rich error type with codes, messages, and details
//! - [`ProblemDetails`]: the `application/problem+json` body every error renders as
//!
//! # Example
//!
//! ```
//! use shared::error::{AppError, ErrorCode};
//!
//! let err = AppError::new(ErrorCode::ExpenseNotFound).with_detail("id", "exp_123");
//! let problem = err.to_problem();
//! assert_eq!(problem.status, 404);
//! assert_eq!(problem.code(), Some("expense.not_found"));
//! ```

mod category;
mod codes;
mod http;
mod types;

pub use category::ErrorCategory;
pub use codes::{ALL_ERROR_CODES, ErrorCode, InvalidErrorCode};
pub use types::{AppError, AppResult, PROBLEM_JSON_CONTENT_TYPE, ProblemDetails};
