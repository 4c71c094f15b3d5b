//! Recurring expense template endpoints

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use shared::list::{ListQuery, ListResponse, SortField};
use shared::models::{
    Action, Business, Expense, RecurringExpense, RecurringExpenseCreate, RecurringExpenseFilter,
    RecurringExpenseStatusUpdate, RecurringExpenseUpdate, Resource,
};

use crate::auth::Actor;
use crate::auth::business_scope::require_manage;
use crate::db;
use crate::services::recurring as service;
use crate::state::AppState;

use super::{ApiJson, ApiQuery, ApiResult, CreatedResult, EmptyResult, IdPath, created, validate};

const SORT_FIELDS: &[SortField] = &[
    SortField::new("amount", "amount"),
    SortField::new("recurringStartDate", "recurring_start_date"),
    SortField::new("nextRecurringDate", "next_recurring_date"),
    SortField::new("createdAt", "created_at"),
];

/// GET /v1/businesses/{bd}/accounting/recurring-expenses
pub async fn list(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Extension(business): Extension<Business>,
    ApiQuery(query): ApiQuery<ListQuery>,
    ApiQuery(filter): ApiQuery<RecurringExpenseFilter>,
) -> ApiResult<ListResponse<RecurringExpense>> {
    actor.require(Action::View, Resource::Expense)?;
    let request = query.resolve(SORT_FIELDS)?;
    let (items, total) =
        db::recurring_expenses::list(&state.pool, &business.id, &filter, &request).await?;
    Ok(Json(ListResponse::new(items, total, &request)))
}

/// GET /v1/businesses/{bd}/accounting/recurring-expenses/{id}
pub async fn get(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Extension(business): Extension<Business>,
    Path(path): Path<IdPath>,
) -> ApiResult<RecurringExpense> {
    actor.require(Action::View, Resource::Expense)?;
    let template = db::recurring_expenses::find(&state.pool, &business.id, &path.id)
        .await?
        .ok_or_else(|| service::not_found(&path.id))?;
    Ok(Json(template))
}

/// POST /v1/businesses/{bd}/accounting/recurring-expenses
pub async fn create(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Extension(business): Extension<Business>,
    ApiJson(data): ApiJson<RecurringExpenseCreate>,
) -> CreatedResult<RecurringExpense> {
    require_manage(&actor, &business, Resource::Expense)?;
    validate(&data)?;
    created(service::create(&state.pool, &business, &data).await?)
}

/// PATCH /v1/businesses/{bd}/accounting/recurring-expenses/{id}
pub async fn update(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Extension(business): Extension<Business>,
    Path(path): Path<IdPath>,
    ApiJson(data): ApiJson<RecurringExpenseUpdate>,
) -> ApiResult<RecurringExpense> {
    require_manage(&actor, &business, Resource::Expense)?;
    validate(&data)?;
    Ok(Json(service::update(&state.pool, &business, &path.id, &data).await?))
}

/// PATCH /v1/businesses/{bd}/accounting/recurring-expenses/{id}/status
pub async fn update_status(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Extension(business): Extension<Business>,
    Path(path): Path<IdPath>,
    ApiJson(data): ApiJson<RecurringExpenseStatusUpdate>,
) -> ApiResult<RecurringExpense> {
    require_manage(&actor, &business, Resource::Expense)?;
    Ok(Json(
        service::change_status(&state.pool, &business, &path.id, data.status).await?,
    ))
}

/// GET /v1/businesses/{bd}/accounting/recurring-expenses/{id}/occurrences
///
/// Expenses materialised from the template, oldest first.
pub async fn occurrences(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Extension(business): Extension<Business>,
    Path(path): Path<IdPath>,
) -> ApiResult<Vec<Expense>> {
    actor.require(Action::View, Resource::Expense)?;
    if db::recurring_expenses::find(&state.pool, &business.id, &path.id).await?.is_none() {
        return Err(service::not_found(&path.id).into());
    }
    Ok(Json(
        db::expenses::list_occurrences(&state.pool, &business.id, &path.id).await?,
    ))
}

/// DELETE /v1/businesses/{bd}/accounting/recurring-expenses/{id}
///
/// Expenses already materialised are kept.
pub async fn delete(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Extension(business): Extension<Business>,
    Path(path): Path<IdPath>,
) -> EmptyResult {
    require_manage(&actor, &business, Resource::Expense)?;
    if !db::recurring_expenses::soft_delete(&state.pool, &business.id, &path.id).await? {
        return Err(service::not_found(&path.id).into());
    }
    Ok(StatusCode::NO_CONTENT)
}
