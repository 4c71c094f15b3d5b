//! Authentication and tenant scoping middleware
//!
//! Request chain for business routes: `require_auth` (Bearer JWT → [`Actor`])
//! → `business_scope` (`{bd}` → [`Business`](shared::models::Business)) → handler,
//! which checks `Actor::require` for the action it performs.

pub mod business_scope;
pub mod jwt;
pub mod rate_limit;

pub use jwt::Actor;
