//! Accounting endpoints: expenses, assets, investments, withdrawals, summary

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use shared::error::{AppError, ErrorCode};
use shared::list::{ListQuery, ListResponse, SortField};
use shared::models::{
    AccountingSummary, Action, Asset, AssetCreate, AssetUpdate, Business, DateRangeQuery, Expense,
    ExpenseCreate, ExpenseFilter, ExpenseUpdate, Investment, InvestmentCreate, InvestmentUpdate,
    Resource, Withdrawal, WithdrawalCreate, WithdrawalUpdate,
};

use crate::auth::Actor;
use crate::auth::business_scope::require_manage;
use crate::db;
use crate::services::accounting as service;
use crate::state::AppState;

use super::{ApiJson, ApiQuery, ApiResult, CreatedResult, EmptyResult, IdPath, created, validate};

const EXPENSE_SORT: &[SortField] = &[
    SortField::new("amount", "amount"),
    SortField::new("occurredOn", "occurred_on"),
    SortField::new("category", "category"),
    SortField::new("createdAt", "created_at"),
];

const ASSET_SORT: &[SortField] = &[
    SortField::new("name", "name"),
    SortField::new("value", "value"),
    SortField::new("purchasedAt", "purchased_at"),
    SortField::new("createdAt", "created_at"),
];

const INVESTMENT_SORT: &[SortField] = &[
    SortField::new("amount", "amount"),
    SortField::new("investedAt", "invested_at"),
    SortField::new("createdAt", "created_at"),
];

const WITHDRAWAL_SORT: &[SortField] = &[
    SortField::new("amount", "amount"),
    SortField::new("withdrawnAt", "withdrawn_at"),
    SortField::new("createdAt", "created_at"),
];

fn asset_not_found(id: &str) -> AppError {
    AppError::new(ErrorCode::AssetNotFound).with_detail("id", id)
}

fn investment_not_found(id: &str) -> AppError {
    AppError::new(ErrorCode::InvestmentNotFound).with_detail("id", id)
}

fn withdrawal_not_found(id: &str) -> AppError {
    AppError::new(ErrorCode::WithdrawalNotFound).with_detail("id", id)
}

// ── Expenses ──

/// GET /v1/businesses/{bd}/accounting/expenses
pub async fn list_expenses(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Extension(business): Extension<Business>,
    ApiQuery(query): ApiQuery<ListQuery>,
    ApiQuery(filter): ApiQuery<ExpenseFilter>,
) -> ApiResult<ListResponse<Expense>> {
    actor.require(Action::View, Resource::Expense)?;
    let request = query.resolve(EXPENSE_SORT)?;
    let (items, total) = db::expenses::list(&state.pool, &business.id, &filter, &request).await?;
    Ok(Json(ListResponse::new(items, total, &request)))
}

/// GET /v1/businesses/{bd}/accounting/expenses/{id}
pub async fn get_expense(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Extension(business): Extension<Business>,
    Path(path): Path<IdPath>,
) -> ApiResult<Expense> {
    actor.require(Action::View, Resource::Expense)?;
    let expense = db::expenses::find(&state.pool, &business.id, &path.id)
        .await?
        .ok_or_else(|| service::expense_not_found(&path.id))?;
    Ok(Json(expense))
}

/// POST /v1/businesses/{bd}/accounting/expenses
pub async fn create_expense(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Extension(business): Extension<Business>,
    ApiJson(data): ApiJson<ExpenseCreate>,
) -> CreatedResult<Expense> {
    require_manage(&actor, &business, Resource::Expense)?;
    validate(&data)?;
    created(service::create_expense(&state.pool, &business, &data).await?)
}

/// PATCH /v1/businesses/{bd}/accounting/expenses/{id}
pub async fn update_expense(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Extension(business): Extension<Business>,
    Path(path): Path<IdPath>,
    ApiJson(data): ApiJson<ExpenseUpdate>,
) -> ApiResult<Expense> {
    require_manage(&actor, &business, Resource::Expense)?;
    validate(&data)?;
    Ok(Json(service::update_expense(&state.pool, &business, &path.id, &data).await?))
}

/// DELETE /v1/businesses/{bd}/accounting/expenses/{id}
pub async fn delete_expense(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Extension(business): Extension<Business>,
    Path(path): Path<IdPath>,
) -> EmptyResult {
    require_manage(&actor, &business, Resource::Expense)?;
    if !db::expenses::soft_delete(&state.pool, &business.id, &path.id).await? {
        return Err(service::expense_not_found(&path.id).into());
    }
    Ok(StatusCode::NO_CONTENT)
}

// ── Assets ──

/// GET /v1/businesses/{bd}/accounting/assets
pub async fn list_assets(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Extension(business): Extension<Business>,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> ApiResult<ListResponse<Asset>> {
    actor.require(Action::View, Resource::Accounting)?;
    let request = query.resolve(ASSET_SORT)?;
    let (items, total) = db::assets::list(&state.pool, &business.id, &request).await?;
    Ok(Json(ListResponse::new(items, total, &request)))
}

/// GET /v1/businesses/{bd}/accounting/assets/{id}
pub async fn get_asset(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Extension(business): Extension<Business>,
    Path(path): Path<IdPath>,
) -> ApiResult<Asset> {
    actor.require(Action::View, Resource::Accounting)?;
    let asset = db::assets::find(&state.pool, &business.id, &path.id)
        .await?
        .ok_or_else(|| asset_not_found(&path.id))?;
    Ok(Json(asset))
}

/// POST /v1/businesses/{bd}/accounting/assets
pub async fn create_asset(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Extension(business): Extension<Business>,
    ApiJson(data): ApiJson<AssetCreate>,
) -> CreatedResult<Asset> {
    require_manage(&actor, &business, Resource::Accounting)?;
    validate(&data)?;
    created(db::assets::create(&state.pool, &business.id, &business.currency, &data).await?)
}

/// PATCH /v1/businesses/{bd}/accounting/assets/{id}
pub async fn update_asset(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Extension(business): Extension<Business>,
    Path(path): Path<IdPath>,
    ApiJson(data): ApiJson<AssetUpdate>,
) -> ApiResult<Asset> {
    require_manage(&actor, &business, Resource::Accounting)?;
    validate(&data)?;
    let asset = db::assets::update(&state.pool, &business.id, &path.id, &data)
        .await?
        .ok_or_else(|| asset_not_found(&path.id))?;
    Ok(Json(asset))
}

/// DELETE /v1/businesses/{bd}/accounting/assets/{id}
pub async fn delete_asset(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Extension(business): Extension<Business>,
    Path(path): Path<IdPath>,
) -> EmptyResult {
    require_manage(&actor, &business, Resource::Accounting)?;
    if !db::assets::soft_delete(&state.pool, &business.id, &path.id).await? {
        return Err(asset_not_found(&path.id).into());
    }
    Ok(StatusCode::NO_CONTENT)
}

// ── Investments ──

/// GET /v1/businesses/{bd}/accounting/investments
pub async fn list_investments(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Extension(business): Extension<Business>,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> ApiResult<ListResponse<Investment>> {
    actor.require(Action::View, Resource::Accounting)?;
    let request = query.resolve(INVESTMENT_SORT)?;
    let (items, total) = db::investments::list(&state.pool, &business.id, &request).await?;
    Ok(Json(ListResponse::new(items, total, &request)))
}

/// GET /v1/businesses/{bd}/accounting/investments/{id}
pub async fn get_investment(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Extension(business): Extension<Business>,
    Path(path): Path<IdPath>,
) -> ApiResult<Investment> {
    actor.require(Action::View, Resource::Accounting)?;
    let investment = db::investments::find(&state.pool, &business.id, &path.id)
        .await?
        .ok_or_else(|| investment_not_found(&path.id))?;
    Ok(Json(investment))
}

/// POST /v1/businesses/{bd}/accounting/investments
pub async fn create_investment(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Extension(business): Extension<Business>,
    ApiJson(data): ApiJson<InvestmentCreate>,
) -> CreatedResult<Investment> {
    require_manage(&actor, &business, Resource::Accounting)?;
    validate(&data)?;
    created(service::create_investment(&state.pool, &business, &data).await?)
}

/// PATCH /v1/businesses/{bd}/accounting/investments/{id}
pub async fn update_investment(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Extension(business): Extension<Business>,
    Path(path): Path<IdPath>,
    ApiJson(data): ApiJson<InvestmentUpdate>,
) -> ApiResult<Investment> {
    require_manage(&actor, &business, Resource::Accounting)?;
    validate(&data)?;
    Ok(Json(service::update_investment(&state.pool, &business, &path.id, &data).await?))
}

/// DELETE /v1/businesses/{bd}/accounting/investments/{id}
pub async fn delete_investment(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Extension(business): Extension<Business>,
    Path(path): Path<IdPath>,
) -> EmptyResult {
    require_manage(&actor, &business, Resource::Accounting)?;
    if !db::investments::soft_delete(&state.pool, &business.id, &path.id).await? {
        return Err(investment_not_found(&path.id).into());
    }
    Ok(StatusCode::NO_CONTENT)
}

// ── Withdrawals ──

/// GET /v1/businesses/{bd}/accounting/withdrawals
pub async fn list_withdrawals(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Extension(business): Extension<Business>,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> ApiResult<ListResponse<Withdrawal>> {
    actor.require(Action::View, Resource::Accounting)?;
    let request = query.resolve(WITHDRAWAL_SORT)?;
    let (items, total) = db::withdrawals::list(&state.pool, &business.id, &request).await?;
    Ok(Json(ListResponse::new(items, total, &request)))
}

/// GET /v1/businesses/{bd}/accounting/withdrawals/{id}
pub async fn get_withdrawal(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Extension(business): Extension<Business>,
    Path(path): Path<IdPath>,
) -> ApiResult<Withdrawal> {
    actor.require(Action::View, Resource::Accounting)?;
    let withdrawal = db::withdrawals::find(&state.pool, &business.id, &path.id)
        .await?
        .ok_or_else(|| withdrawal_not_found(&path.id))?;
    Ok(Json(withdrawal))
}

/// POST /v1/businesses/{bd}/accounting/withdrawals
pub async fn create_withdrawal(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Extension(business): Extension<Business>,
    ApiJson(data): ApiJson<WithdrawalCreate>,
) -> CreatedResult<Withdrawal> {
    require_manage(&actor, &business, Resource::Accounting)?;
    validate(&data)?;
    created(service::create_withdrawal(&state.pool, &business, &data).await?)
}

/// PATCH /v1/businesses/{bd}/accounting/withdrawals/{id}
pub async fn update_withdrawal(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Extension(business): Extension<Business>,
    Path(path): Path<IdPath>,
    ApiJson(data): ApiJson<WithdrawalUpdate>,
) -> ApiResult<Withdrawal> {
    require_manage(&actor, &business, Resource::Accounting)?;
    validate(&data)?;
    Ok(Json(service::update_withdrawal(&state.pool, &business, &path.id, &data).await?))
}

/// DELETE /v1/businesses/{bd}/accounting/withdrawals/{id}
pub async fn delete_withdrawal(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Extension(business): Extension<Business>,
    Path(path): Path<IdPath>,
) -> EmptyResult {
    require_manage(&actor, &business, Resource::Accounting)?;
    if !db::withdrawals::soft_delete(&state.pool, &business.id, &path.id).await? {
        return Err(withdrawal_not_found(&path.id).into());
    }
    Ok(StatusCode::NO_CONTENT)
}

// ── Summary ──

/// GET /v1/businesses/{bd}/accounting/summary?from=&to=
pub async fn summary(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Extension(business): Extension<Business>,
    ApiQuery(range): ApiQuery<DateRangeQuery>,
) -> ApiResult<AccountingSummary> {
    actor.require(Action::View, Resource::Accounting)?;
    Ok(Json(service::summary(&state.pool, &business, range).await?))
}
