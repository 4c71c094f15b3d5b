//! Order endpoints

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use shared::list::{ListQuery, ListResponse, SortField};
use shared::models::{
    Action, Business, Order, OrderCreate, OrderFilter, OrderPaymentStatusUpdate,
    OrderStatusUpdate, Resource,
};

use crate::auth::Actor;
use crate::auth::business_scope::require_manage;
use crate::db;
use crate::services::orders as service;
use crate::state::AppState;

use super::{ApiJson, ApiQuery, ApiResult, CreatedResult, EmptyResult, IdPath, created, validate};

const SORT_FIELDS: &[SortField] = &[
    SortField::new("orderNumber", "order_number"),
    SortField::new("orderedAt", "ordered_at"),
    SortField::new("total", "total"),
    SortField::new("status", "status"),
    SortField::new("createdAt", "created_at"),
];

/// GET /v1/businesses/{bd}/orders
pub async fn list(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Extension(business): Extension<Business>,
    ApiQuery(query): ApiQuery<ListQuery>,
    ApiQuery(filter): ApiQuery<OrderFilter>,
) -> ApiResult<ListResponse<Order>> {
    actor.require(Action::View, Resource::Order)?;
    let request = query.resolve(SORT_FIELDS)?;
    let (items, total) = db::orders::list(&state.pool, &business.id, &filter, &request).await?;
    Ok(Json(ListResponse::new(items, total, &request)))
}

/// GET /v1/businesses/{bd}/orders/{id}
pub async fn get(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Extension(business): Extension<Business>,
    Path(path): Path<IdPath>,
) -> ApiResult<Order> {
    actor.require(Action::View, Resource::Order)?;
    Ok(Json(service::get(&state.pool, &business, &path.id).await?))
}

/// POST /v1/businesses/{bd}/orders
///
/// Prices the items, reserves stock and numbers the order in one transaction.
pub async fn create(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Extension(business): Extension<Business>,
    ApiJson(data): ApiJson<OrderCreate>,
) -> CreatedResult<Order> {
    require_manage(&actor, &business, Resource::Order)?;
    validate(&data)?;
    created(service::create(&state.pool, &business, &data).await?)
}

/// PATCH /v1/businesses/{bd}/orders/{id}/status
pub async fn update_status(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Extension(business): Extension<Business>,
    Path(path): Path<IdPath>,
    ApiJson(data): ApiJson<OrderStatusUpdate>,
) -> ApiResult<Order> {
    require_manage(&actor, &business, Resource::Order)?;
    Ok(Json(service::change_status(&state.pool, &business, &path.id, data.status).await?))
}

/// PATCH /v1/businesses/{bd}/orders/{id}/payment-status
pub async fn update_payment_status(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Extension(business): Extension<Business>,
    Path(path): Path<IdPath>,
    ApiJson(data): ApiJson<OrderPaymentStatusUpdate>,
) -> ApiResult<Order> {
    require_manage(&actor, &business, Resource::Order)?;
    validate(&data)?;
    Ok(Json(
        service::change_payment_status(&state.pool, &business, &path.id, &data).await?,
    ))
}

/// DELETE /v1/businesses/{bd}/orders/{id}
pub async fn delete(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Extension(business): Extension<Business>,
    Path(path): Path<IdPath>,
) -> EmptyResult {
    require_manage(&actor, &business, Resource::Order)?;
    service::delete(&state.pool, &business, &path.id).await?;
    Ok(StatusCode::NO_CONTENT)
}
