//! Business (tenant) endpoints

use axum::extract::State;
use axum::http::StatusCode;
use axum::{Extension, Json};
use shared::error::{AppError, ErrorCode};
use shared::list::{ListQuery, ListResponse, SortField};
use shared::models::{
    Action, Business, BusinessCreate, BusinessUpdate, DescriptorAvailability, DescriptorQuery,
    Resource, normalize_business_descriptor,
};

use crate::auth::Actor;
use crate::auth::business_scope::require_manage;
use crate::db;
use crate::error::is_unique_violation;
use crate::state::AppState;

use super::{ApiJson, ApiQuery, ApiResult, CreatedResult, EmptyResult, created, validate};

const SORT_FIELDS: &[SortField] = &[
    SortField::new("name", "name"),
    SortField::new("descriptor", "descriptor"),
    SortField::new("createdAt", "created_at"),
    SortField::new("updatedAt", "updated_at"),
];

fn descriptor_invalid(raw: &str) -> AppError {
    AppError::new(ErrorCode::BusinessDescriptorInvalid).with_detail("descriptor", raw)
}

fn descriptor_taken(descriptor: &str) -> AppError {
    AppError::new(ErrorCode::BusinessDescriptorTaken).with_detail("descriptor", descriptor)
}

/// GET /v1/businesses
pub async fn list(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> ApiResult<ListResponse<Business>> {
    actor.require(Action::View, Resource::Business)?;
    let request = query.resolve(SORT_FIELDS)?;
    let (items, total) = db::businesses::list(&state.pool, &actor.workspace_id, &request).await?;
    Ok(Json(ListResponse::new(items, total, &request)))
}

/// GET /v1/businesses/descriptor/availability
pub async fn descriptor_availability(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    ApiQuery(query): ApiQuery<DescriptorQuery>,
) -> ApiResult<DescriptorAvailability> {
    let descriptor = normalize_business_descriptor(&query.descriptor)
        .ok_or_else(|| descriptor_invalid(&query.descriptor))?;
    let taken =
        db::businesses::descriptor_exists(&state.pool, &actor.workspace_id, &descriptor).await?;
    Ok(Json(DescriptorAvailability {
        descriptor,
        available: !taken,
    }))
}

/// POST /v1/businesses
pub async fn create(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    ApiJson(data): ApiJson<BusinessCreate>,
) -> CreatedResult<Business> {
    actor.require(Action::Manage, Resource::Business)?;
    validate(&data)?;
    let descriptor = normalize_business_descriptor(&data.descriptor)
        .ok_or_else(|| descriptor_invalid(&data.descriptor))?;

    let business =
        match db::businesses::create(&state.pool, &actor.workspace_id, &descriptor, &data).await {
            Ok(business) => business,
            Err(e) if is_unique_violation(&e, db::businesses::DESCRIPTOR_CONSTRAINT) => {
                return Err(descriptor_taken(&descriptor).into());
            }
            Err(e) => return Err(e.into()),
        };

    tracing::info!(business_id = %business.id, descriptor = %business.descriptor, "Business created");
    created(business)
}

/// GET /v1/businesses/{bd}
pub async fn get(
    Extension(actor): Extension<Actor>,
    Extension(business): Extension<Business>,
) -> ApiResult<Business> {
    actor.require(Action::View, Resource::Business)?;
    Ok(Json(business))
}

/// PATCH /v1/businesses/{bd}
pub async fn update(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Extension(business): Extension<Business>,
    ApiJson(data): ApiJson<BusinessUpdate>,
) -> ApiResult<Business> {
    require_manage(&actor, &business, Resource::Business)?;
    validate(&data)?;

    let descriptor = match data.descriptor.as_deref() {
        Some(raw) => {
            let normalized = normalize_business_descriptor(raw).ok_or_else(|| descriptor_invalid(raw))?;
            if normalized == business.descriptor {
                None
            } else {
                if db::businesses::descriptor_exists(&state.pool, &actor.workspace_id, &normalized)
                    .await?
                {
                    return Err(descriptor_taken(&normalized).into());
                }
                Some(normalized)
            }
        }
        None => None,
    };

    match db::businesses::update(&state.pool, &business.id, descriptor.as_deref(), &data).await {
        Ok(updated) => Ok(Json(updated)),
        Err(e) if is_unique_violation(&e, db::businesses::DESCRIPTOR_CONSTRAINT) => {
            Err(descriptor_taken(descriptor.as_deref().unwrap_or_default()).into())
        }
        Err(e) => Err(e.into()),
    }
}

/// POST /v1/businesses/{bd}/archive
pub async fn archive(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Extension(business): Extension<Business>,
) -> ApiResult<Business> {
    actor.require(Action::Manage, Resource::Business)?;
    if business.archived_at.is_some() {
        return Ok(Json(business));
    }
    let archived = db::businesses::set_archived(&state.pool, &business.id, true).await?;
    tracing::info!(business_id = %business.id, "Business archived");
    Ok(Json(archived))
}

/// POST /v1/businesses/{bd}/unarchive
pub async fn unarchive(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Extension(business): Extension<Business>,
) -> ApiResult<Business> {
    actor.require(Action::Manage, Resource::Business)?;
    if business.archived_at.is_none() {
        return Ok(Json(business));
    }
    let restored = db::businesses::set_archived(&state.pool, &business.id, false).await?;
    tracing::info!(business_id = %business.id, "Business unarchived");
    Ok(Json(restored))
}

/// DELETE /v1/businesses/{bd}
pub async fn delete(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Extension(business): Extension<Business>,
) -> EmptyResult {
    actor.require(Action::Manage, Resource::Business)?;
    db::businesses::soft_delete(&state.pool, &business.id).await?;
    tracing::info!(business_id = %business.id, "Business deleted");
    Ok(StatusCode::NO_CONTENT)
}
