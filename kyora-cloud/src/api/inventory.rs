//! Inventory endpoints: categories, products, variants and the summary

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use shared::error::{AppError, ErrorCode};
use shared::list::{ListQuery, ListResponse, SortField};
use shared::models::{
    Action, Business, Category, CategoryCreate, CategoryUpdate, InventorySummary, Product,
    ProductCreate, ProductFilter, ProductUpdate, Resource, Variant, VariantCreate, VariantFilter,
    VariantUpdate,
};

use crate::auth::Actor;
use crate::auth::business_scope::require_manage;
use crate::db;
use crate::services::inventory as service;
use crate::state::AppState;

use super::{ApiJson, ApiQuery, ApiResult, CreatedResult, EmptyResult, IdPath, created, validate};

const CATEGORY_SORT: &[SortField] = &[
    SortField::new("name", "name"),
    SortField::new("descriptor", "descriptor"),
    SortField::new("createdAt", "created_at"),
];

const PRODUCT_SORT: &[SortField] = &[
    SortField::new("name", "name"),
    SortField::new("createdAt", "created_at"),
    SortField::new("updatedAt", "updated_at"),
];

const VARIANT_SORT: &[SortField] = &[
    SortField::new("name", "name"),
    SortField::new("sku", "sku"),
    SortField::new("costPrice", "cost_price"),
    SortField::new("salePrice", "sale_price"),
    SortField::new("stockQuantity", "stock_quantity"),
    SortField::new("createdAt", "created_at"),
];

// ── Categories ──

/// GET /v1/businesses/{bd}/inventory/categories
pub async fn list_categories(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Extension(business): Extension<Business>,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> ApiResult<ListResponse<Category>> {
    actor.require(Action::View, Resource::Inventory)?;
    let request = query.resolve(CATEGORY_SORT)?;
    let (items, total) = db::categories::list(&state.pool, &business.id, &request).await?;
    Ok(Json(ListResponse::new(items, total, &request)))
}

/// GET /v1/businesses/{bd}/inventory/categories/{id}
pub async fn get_category(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Extension(business): Extension<Business>,
    Path(path): Path<IdPath>,
) -> ApiResult<Category> {
    actor.require(Action::View, Resource::Inventory)?;
    let category = db::categories::find(&state.pool, &business.id, &path.id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::CategoryNotFound).with_detail("id", path.id.as_str()))?;
    Ok(Json(category))
}

/// POST /v1/businesses/{bd}/inventory/categories
pub async fn create_category(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Extension(business): Extension<Business>,
    ApiJson(data): ApiJson<CategoryCreate>,
) -> CreatedResult<Category> {
    require_manage(&actor, &business, Resource::Inventory)?;
    validate(&data)?;
    created(service::create_category(&state.pool, &business, &data).await?)
}

/// PATCH /v1/businesses/{bd}/inventory/categories/{id}
pub async fn update_category(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Extension(business): Extension<Business>,
    Path(path): Path<IdPath>,
    ApiJson(data): ApiJson<CategoryUpdate>,
) -> ApiResult<Category> {
    require_manage(&actor, &business, Resource::Inventory)?;
    validate(&data)?;
    Ok(Json(service::update_category(&state.pool, &business, &path.id, &data).await?))
}

/// DELETE /v1/businesses/{bd}/inventory/categories/{id}
pub async fn delete_category(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Extension(business): Extension<Business>,
    Path(path): Path<IdPath>,
) -> EmptyResult {
    require_manage(&actor, &business, Resource::Inventory)?;
    service::delete_category(&state.pool, &business, &path.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ── Products ──

/// GET /v1/businesses/{bd}/inventory/products
pub async fn list_products(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Extension(business): Extension<Business>,
    ApiQuery(query): ApiQuery<ListQuery>,
    ApiQuery(filter): ApiQuery<ProductFilter>,
) -> ApiResult<ListResponse<Product>> {
    actor.require(Action::View, Resource::Inventory)?;
    let request = query.resolve(PRODUCT_SORT)?;
    let (items, total) = db::products::list(&state.pool, &business.id, &filter, &request).await?;
    Ok(Json(ListResponse::new(items, total, &request)))
}

/// GET /v1/businesses/{bd}/inventory/products/{id}
pub async fn get_product(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Extension(business): Extension<Business>,
    Path(path): Path<IdPath>,
) -> ApiResult<Product> {
    actor.require(Action::View, Resource::Inventory)?;
    Ok(Json(service::get_product(&state.pool, &business, &path.id).await?))
}

/// POST /v1/businesses/{bd}/inventory/products
///
/// Creates the product together with its variants.
pub async fn create_product(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Extension(business): Extension<Business>,
    ApiJson(data): ApiJson<ProductCreate>,
) -> CreatedResult<Product> {
    require_manage(&actor, &business, Resource::Inventory)?;
    validate(&data)?;
    created(service::create_product(&state.pool, &business, &data).await?)
}

/// PATCH /v1/businesses/{bd}/inventory/products/{id}
pub async fn update_product(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Extension(business): Extension<Business>,
    Path(path): Path<IdPath>,
    ApiJson(data): ApiJson<ProductUpdate>,
) -> ApiResult<Product> {
    require_manage(&actor, &business, Resource::Inventory)?;
    validate(&data)?;
    Ok(Json(service::update_product(&state.pool, &business, &path.id, &data).await?))
}

/// DELETE /v1/businesses/{bd}/inventory/products/{id}
pub async fn delete_product(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Extension(business): Extension<Business>,
    Path(path): Path<IdPath>,
) -> EmptyResult {
    require_manage(&actor, &business, Resource::Inventory)?;
    service::delete_product(&state.pool, &business, &path.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ── Variants ──

/// GET /v1/businesses/{bd}/inventory/products/{id}/variants
pub async fn list_product_variants(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Extension(business): Extension<Business>,
    Path(path): Path<IdPath>,
) -> ApiResult<Vec<Variant>> {
    actor.require(Action::View, Resource::Inventory)?;
    if db::products::find(&state.pool, &business.id, &path.id).await?.is_none() {
        return Err(service::product_not_found(&path.id).into());
    }
    Ok(Json(db::variants::list_for_product(&state.pool, &business.id, &path.id).await?))
}

/// POST /v1/businesses/{bd}/inventory/products/{id}/variants
pub async fn add_variant(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Extension(business): Extension<Business>,
    Path(path): Path<IdPath>,
    ApiJson(data): ApiJson<VariantCreate>,
) -> CreatedResult<Variant> {
    require_manage(&actor, &business, Resource::Inventory)?;
    validate(&data)?;
    created(service::add_variant(&state.pool, &business, &path.id, &data.variant).await?)
}

/// GET /v1/businesses/{bd}/inventory/variants
pub async fn list_variants(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Extension(business): Extension<Business>,
    ApiQuery(query): ApiQuery<ListQuery>,
    ApiQuery(filter): ApiQuery<VariantFilter>,
) -> ApiResult<ListResponse<Variant>> {
    actor.require(Action::View, Resource::Inventory)?;
    let request = query.resolve(VARIANT_SORT)?;
    let (items, total) = db::variants::list(&state.pool, &business.id, &filter, &request).await?;
    Ok(Json(ListResponse::new(items, total, &request)))
}

/// GET /v1/businesses/{bd}/inventory/variants/{id}
pub async fn get_variant(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Extension(business): Extension<Business>,
    Path(path): Path<IdPath>,
) -> ApiResult<Variant> {
    actor.require(Action::View, Resource::Inventory)?;
    let variant = db::variants::find(&state.pool, &business.id, &path.id)
        .await?
        .ok_or_else(|| service::variant_not_found(&path.id))?;
    Ok(Json(variant))
}

/// PATCH /v1/businesses/{bd}/inventory/variants/{id}
pub async fn update_variant(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Extension(business): Extension<Business>,
    Path(path): Path<IdPath>,
    ApiJson(data): ApiJson<VariantUpdate>,
) -> ApiResult<Variant> {
    require_manage(&actor, &business, Resource::Inventory)?;
    validate(&data)?;
    Ok(Json(service::update_variant(&state.pool, &business, &path.id, &data).await?))
}

/// DELETE /v1/businesses/{bd}/inventory/variants/{id}
pub async fn delete_variant(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Extension(business): Extension<Business>,
    Path(path): Path<IdPath>,
) -> EmptyResult {
    require_manage(&actor, &business, Resource::Inventory)?;
    service::delete_variant(&state.pool, &business, &path.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /v1/businesses/{bd}/inventory/summary
pub async fn summary(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Extension(business): Extension<Business>,
) -> ApiResult<InventorySummary> {
    actor.require(Action::View, Resource::Inventory)?;
    Ok(Json(service::summary(&state.pool, &business).await?))
}
