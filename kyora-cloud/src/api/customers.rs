//! Customer and customer address endpoints

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::Deserialize;
use shared::error::{AppError, ErrorCode};
use shared::list::{ListQuery, ListResponse, SortField};
use shared::models::{
    Action, Business, Customer, CustomerAddress, CustomerAddressCreate, CustomerAddressUpdate,
    CustomerCreate, CustomerFilter, CustomerUpdate, Resource,
};
use sqlx::PgPool;

use crate::auth::Actor;
use crate::auth::business_scope::require_manage;
use crate::db;
use crate::error::{ServiceError, ServiceResult, is_unique_violation};
use crate::state::AppState;

use super::{ApiJson, ApiQuery, ApiResult, CreatedResult, EmptyResult, IdPath, created, validate};

const SORT_FIELDS: &[SortField] = &[
    SortField::new("name", "name"),
    SortField::new("joinedAt", "joined_at"),
    SortField::new("countryCode", "country_code"),
    SortField::new("createdAt", "created_at"),
];

/// `{id}/addresses/{address_id}` path parameters
#[derive(Debug, Deserialize)]
pub struct AddressPath {
    pub id: String,
    pub address_id: String,
}

fn customer_not_found(id: &str) -> AppError {
    AppError::new(ErrorCode::CustomerNotFound).with_detail("id", id)
}

fn address_not_found(id: &str) -> AppError {
    AppError::new(ErrorCode::AddressNotFound).with_detail("id", id)
}

fn email_conflict(e: sqlx::Error, email: Option<&str>) -> ServiceError {
    if is_unique_violation(&e, db::customers::EMAIL_CONSTRAINT) {
        return AppError::new(ErrorCode::CustomerEmailExists)
            .with_detail("email", email.unwrap_or_default())
            .into();
    }
    e.into()
}

async fn ensure_customer(pool: &PgPool, business: &Business, id: &str) -> ServiceResult<()> {
    if !db::customers::exists(pool, &business.id, id).await? {
        return Err(customer_not_found(id).into());
    }
    Ok(())
}

// ── Customers ──

/// GET /v1/businesses/{bd}/customers
pub async fn list(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Extension(business): Extension<Business>,
    ApiQuery(query): ApiQuery<ListQuery>,
    ApiQuery(filter): ApiQuery<CustomerFilter>,
) -> ApiResult<ListResponse<Customer>> {
    actor.require(Action::View, Resource::Customer)?;
    let request = query.resolve(SORT_FIELDS)?;
    let (items, total) = db::customers::list(&state.pool, &business.id, &filter, &request).await?;
    Ok(Json(ListResponse::new(items, total, &request)))
}

/// GET /v1/businesses/{bd}/customers/{id}
pub async fn get(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Extension(business): Extension<Business>,
    Path(path): Path<IdPath>,
) -> ApiResult<Customer> {
    actor.require(Action::View, Resource::Customer)?;
    let customer = db::customers::find(&state.pool, &business.id, &path.id)
        .await?
        .ok_or_else(|| customer_not_found(&path.id))?;
    Ok(Json(customer))
}

/// POST /v1/businesses/{bd}/customers
pub async fn create(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Extension(business): Extension<Business>,
    ApiJson(data): ApiJson<CustomerCreate>,
) -> CreatedResult<Customer> {
    require_manage(&actor, &business, Resource::Customer)?;
    validate(&data)?;
    let customer = db::customers::create(&state.pool, &business.id, &data)
        .await
        .map_err(|e| email_conflict(e, data.email.as_deref()))?;
    created(customer)
}

/// PATCH /v1/businesses/{bd}/customers/{id}
pub async fn update(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Extension(business): Extension<Business>,
    Path(path): Path<IdPath>,
    ApiJson(data): ApiJson<CustomerUpdate>,
) -> ApiResult<Customer> {
    require_manage(&actor, &business, Resource::Customer)?;
    validate(&data)?;
    if !data.email_is_valid() {
        return Err(AppError::validation("email is not a valid address")
            .with_detail("field", "email")
            .into());
    }
    let customer = db::customers::update(&state.pool, &business.id, &path.id, &data)
        .await
        .map_err(|e| email_conflict(e, data.email.as_deref()))?
        .ok_or_else(|| customer_not_found(&path.id))?;
    Ok(Json(customer))
}

/// DELETE /v1/businesses/{bd}/customers/{id}
pub async fn delete(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Extension(business): Extension<Business>,
    Path(path): Path<IdPath>,
) -> EmptyResult {
    require_manage(&actor, &business, Resource::Customer)?;
    if !db::customers::soft_delete(&state.pool, &business.id, &path.id).await? {
        return Err(customer_not_found(&path.id).into());
    }
    Ok(StatusCode::NO_CONTENT)
}

// ── Addresses ──

/// GET /v1/businesses/{bd}/customers/{id}/addresses
pub async fn list_addresses(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Extension(business): Extension<Business>,
    Path(path): Path<IdPath>,
) -> ApiResult<Vec<CustomerAddress>> {
    actor.require(Action::View, Resource::Customer)?;
    ensure_customer(&state.pool, &business, &path.id).await?;
    Ok(Json(db::addresses::list(&state.pool, &business.id, &path.id).await?))
}

/// GET /v1/businesses/{bd}/customers/{id}/addresses/{address_id}
pub async fn get_address(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Extension(business): Extension<Business>,
    Path(path): Path<AddressPath>,
) -> ApiResult<CustomerAddress> {
    actor.require(Action::View, Resource::Customer)?;
    let address = db::addresses::find(&state.pool, &business.id, &path.id, &path.address_id)
        .await?
        .ok_or_else(|| address_not_found(&path.address_id))?;
    Ok(Json(address))
}

/// POST /v1/businesses/{bd}/customers/{id}/addresses
pub async fn create_address(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Extension(business): Extension<Business>,
    Path(path): Path<IdPath>,
    ApiJson(data): ApiJson<CustomerAddressCreate>,
) -> CreatedResult<CustomerAddress> {
    require_manage(&actor, &business, Resource::Customer)?;
    validate(&data)?;
    ensure_customer(&state.pool, &business, &path.id).await?;
    created(db::addresses::create(&state.pool, &business.id, &path.id, &data).await?)
}

/// PATCH /v1/businesses/{bd}/customers/{id}/addresses/{address_id}
pub async fn update_address(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Extension(business): Extension<Business>,
    Path(path): Path<AddressPath>,
    ApiJson(data): ApiJson<CustomerAddressUpdate>,
) -> ApiResult<CustomerAddress> {
    require_manage(&actor, &business, Resource::Customer)?;
    validate(&data)?;
    let address =
        db::addresses::update(&state.pool, &business.id, &path.id, &path.address_id, &data)
            .await?
            .ok_or_else(|| address_not_found(&path.address_id))?;
    Ok(Json(address))
}

/// DELETE /v1/businesses/{bd}/customers/{id}/addresses/{address_id}
pub async fn delete_address(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Extension(business): Extension<Business>,
    Path(path): Path<AddressPath>,
) -> EmptyResult {
    require_manage(&actor, &business, Resource::Customer)?;
    if !db::addresses::soft_delete(&state.pool, &business.id, &path.id, &path.address_id).await? {
        return Err(address_not_found(&path.address_id).into());
    }
    Ok(StatusCode::NO_CONTENT)
}
