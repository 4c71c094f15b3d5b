//! Shared types for kyora
//!
//! Error codes and the Problem JSON body, list/pagination types, domain
//! models with their request payloads, and the pure domain logic (state
//! machines, order totals, recurring expense date math) used by the server.

pub mod error;
pub mod list;
pub mod models;
pub mod recurrence;
pub mod util;

// Re-exports
pub use axum::Json;
pub use error::{AppError, AppResult, ErrorCode};
pub use list::{ListQuery, ListRequest, ListResponse, SortField};
pub use serde::{Deserialize, Serialize};
