//! Business (tenant) scoping
//!
//! Resolves the `{bd}` path segment to a business owned by the caller's
//! workspace. Anything else, including businesses of other workspaces, is a 404.

use axum::{
    extract::{Path, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use shared::error::{AppError, AppResult, ErrorCode};
use shared::models::{Action, Business, Resource};

use super::Actor;
use crate::db;
use crate::error::ServiceError;
use crate::state::AppState;

/// `{bd}` path parameter; extra parameters of nested routes are ignored
#[derive(Debug, Deserialize)]
pub struct BusinessPath {
    pub bd: String,
}

/// Middleware inserting the resolved [`Business`] as a request extension.
///
/// Must run after `require_auth`.
pub async fn business_scope(
    State(state): State<AppState>,
    Path(path): Path<BusinessPath>,
    mut request: Request,
    next: Next,
) -> Result<Response, Response> {
    let actor = request
        .extensions()
        .get::<Actor>()
        .cloned()
        .ok_or_else(|| AppError::unauthorized().into_response())?;

    let business = db::businesses::find_by_descriptor(&state.pool, &actor.workspace_id, &path.bd)
        .await
        .map_err(|e| ServiceError::from(e).into_response())?
        .ok_or_else(|| {
            AppError::new(ErrorCode::BusinessNotFound)
                .with_detail("descriptor", path.bd.as_str())
                .into_response()
        })?;

    tracing::trace!(business_id = %business.id, user_id = %actor.user_id, "Business scope resolved");
    request.extensions_mut().insert(business);

    Ok(next.run(request).await)
}

/// Write access: role permission plus the business must not be archived.
pub fn require_manage(actor: &Actor, business: &Business, resource: Resource) -> AppResult<()> {
    actor.require(Action::Manage, resource)?;
    if business.archived_at.is_some() {
        return Err(AppError::new(ErrorCode::BusinessArchived)
            .with_detail("descriptor", business.descriptor.as_str()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use shared::models::Role;

    fn business(archived_at: Option<i64>) -> Business {
        Business {
            id: "bus_1".into(),
            workspace_id: "wrk_1".into(),
            descriptor: "acme".into(),
            name: "Acme".into(),
            brand: None,
            country_code: "AE".into(),
            currency: "AED".into(),
            vat_rate: Decimal::ZERO,
            safety_buffer: Decimal::ZERO,
            support_email: None,
            phone_number: None,
            website_url: None,
            established_at: None,
            archived_at,
            created_at: 0,
            updated_at: 0,
        }
    }

    fn actor(role: Role) -> Actor {
        Actor {
            user_id: "usr_1".into(),
            workspace_id: "wrk_1".into(),
            role,
        }
    }

    #[test]
    fn test_require_manage() {
        assert!(require_manage(&actor(Role::Admin), &business(None), Resource::Inventory).is_ok());

        let denied = require_manage(&actor(Role::User), &business(None), Resource::Inventory);
        assert_eq!(denied.unwrap_err().code, ErrorCode::PermissionDenied);

        let archived = require_manage(&actor(Role::Admin), &business(Some(1)), Resource::Order);
        assert_eq!(archived.unwrap_err().code, ErrorCode::BusinessArchived);
    }
}
