//! Expenses, including the occurrences generated from recurring templates

use chrono::NaiveDate;
use rust_decimal::Decimal;
use shared::list::ListRequest;
use shared::models::{Expense, ExpenseCategory, ExpenseFilter, ExpenseType, ExpenseUpdate};
use shared::util::{now_millis, prefixed_id};
use sqlx::{PgConnection, PgExecutor, PgPool};

use super::{enum_col, paginate};

#[derive(sqlx::FromRow)]
struct ExpenseRow {
    id: String,
    business_id: String,
    recurring_expense_id: Option<String>,
    amount: Decimal,
    currency: String,
    category: String,
    expense_type: String,
    occurred_on: NaiveDate,
    note: Option<String>,
    created_at: i64,
    updated_at: i64,
}

impl TryFrom<ExpenseRow> for Expense {
    type Error = sqlx::Error;

    fn try_from(row: ExpenseRow) -> Result<Self, Self::Error> {
        Ok(Expense {
            category: enum_col(&row.category)?,
            expense_type: enum_col(&row.expense_type)?,
            id: row.id,
            business_id: row.business_id,
            recurring_expense_id: row.recurring_expense_id,
            amount: row.amount,
            currency: row.currency,
            occurred_on: row.occurred_on,
            note: row.note,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const COLUMNS: &str = "id, business_id, recurring_expense_id, amount, currency, category, \
    type AS expense_type, occurred_on, note, created_at, updated_at";

fn convert(rows: Vec<ExpenseRow>) -> Result<Vec<Expense>, sqlx::Error> {
    rows.into_iter().map(Expense::try_from).collect()
}

pub async fn list(
    pool: &PgPool,
    business_id: &str,
    filter: &ExpenseFilter,
    request: &ListRequest,
) -> Result<(Vec<Expense>, i64), sqlx::Error> {
    let search = request.search_pattern();
    let (rows, total) = paginate::<ExpenseRow, _>(
        pool,
        COLUMNS,
        "expenses WHERE deleted_at IS NULL",
        "",
        request,
        |qb| {
            qb.push(" AND business_id = ").push_bind(business_id.to_string());
            if let Some(category) = filter.category {
                qb.push(" AND category = ").push_bind(category.as_db());
            }
            if let Some(expense_type) = filter.expense_type {
                qb.push(" AND type = ").push_bind(expense_type.as_db());
            }
            if let Some(recurring_id) = &filter.recurring_expense_id {
                qb.push(" AND recurring_expense_id = ").push_bind(recurring_id.clone());
            }
            if let Some(from) = filter.from {
                qb.push(" AND occurred_on >= ").push_bind(from);
            }
            if let Some(to) = filter.to {
                qb.push(" AND occurred_on <= ").push_bind(to);
            }
            if let Some(pattern) = &search {
                qb.push(" AND note ILIKE ").push_bind(pattern.clone());
            }
        },
    )
    .await?;
    Ok((convert(rows)?, total))
}

pub async fn find(
    db: impl PgExecutor<'_>,
    business_id: &str,
    id: &str,
) -> Result<Option<Expense>, sqlx::Error> {
    let row: Option<ExpenseRow> = sqlx::query_as(&format!(
        "SELECT {COLUMNS} FROM expenses WHERE business_id = $1 AND id = $2 AND deleted_at IS NULL"
    ))
    .bind(business_id)
    .bind(id)
    .fetch_optional(db)
    .await?;
    row.map(Expense::try_from).transpose()
}

pub struct NewExpense<'a> {
    pub recurring_expense_id: Option<&'a str>,
    pub amount: Decimal,
    pub currency: &'a str,
    pub category: ExpenseCategory,
    pub expense_type: ExpenseType,
    pub occurred_on: NaiveDate,
    pub note: Option<&'a str>,
}

pub async fn insert(
    db: impl PgExecutor<'_>,
    business_id: &str,
    expense: &NewExpense<'_>,
) -> Result<Expense, sqlx::Error> {
    let row: ExpenseRow = sqlx::query_as(&format!(
        "INSERT INTO expenses (id, business_id, recurring_expense_id, amount, currency, category,
            type, occurred_on, note, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $10)
         RETURNING {COLUMNS}"
    ))
    .bind(prefixed_id("exp"))
    .bind(business_id)
    .bind(expense.recurring_expense_id)
    .bind(expense.amount)
    .bind(expense.currency)
    .bind(expense.category.as_db())
    .bind(expense.expense_type.as_db())
    .bind(expense.occurred_on)
    .bind(expense.note)
    .bind(now_millis())
    .fetch_one(db)
    .await?;
    row.try_into()
}

/// `true` when the template already has a live expense on `date`
pub async fn occurrence_exists(
    conn: &mut PgConnection,
    business_id: &str,
    recurring_expense_id: &str,
    date: NaiveDate,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM expenses
         WHERE business_id = $1 AND recurring_expense_id = $2 AND occurred_on = $3 AND deleted_at IS NULL)",
    )
    .bind(business_id)
    .bind(recurring_expense_id)
    .bind(date)
    .fetch_one(conn)
    .await
}

/// Insert a generated occurrence unless one exists for (template, date).
///
/// Returns `true` when a row was inserted. The partial unique index makes this
/// safe against concurrent runs.
pub async fn insert_occurrence(
    conn: &mut PgConnection,
    business_id: &str,
    expense: &NewExpense<'_>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO expenses (id, business_id, recurring_expense_id, amount, currency, category,
            type, occurred_on, note, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $10)
         ON CONFLICT (business_id, recurring_expense_id, occurred_on)
            WHERE recurring_expense_id IS NOT NULL AND deleted_at IS NULL
         DO NOTHING",
    )
    .bind(prefixed_id("exp"))
    .bind(business_id)
    .bind(expense.recurring_expense_id)
    .bind(expense.amount)
    .bind(expense.currency)
    .bind(expense.category.as_db())
    .bind(expense.expense_type.as_db())
    .bind(expense.occurred_on)
    .bind(expense.note)
    .bind(now_millis())
    .execute(conn)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Expenses generated from a template, oldest first
pub async fn list_occurrences(
    pool: &PgPool,
    business_id: &str,
    recurring_expense_id: &str,
) -> Result<Vec<Expense>, sqlx::Error> {
    let rows: Vec<ExpenseRow> = sqlx::query_as(&format!(
        "SELECT {COLUMNS} FROM expenses
         WHERE business_id = $1 AND recurring_expense_id = $2 AND deleted_at IS NULL
         ORDER BY occurred_on ASC, id ASC"
    ))
    .bind(business_id)
    .bind(recurring_expense_id)
    .fetch_all(pool)
    .await?;
    convert(rows)
}

pub async fn update(
    pool: &PgPool,
    business_id: &str,
    id: &str,
    data: &ExpenseUpdate,
) -> Result<Option<Expense>, sqlx::Error> {
    let row: Option<ExpenseRow> = sqlx::query_as(&format!(
        "UPDATE expenses SET
            amount = COALESCE($3, amount),
            category = COALESCE($4, category),
            type = COALESCE($5, type),
            recurring_expense_id = CASE WHEN $6 THEN $7 ELSE recurring_expense_id END,
            occurred_on = COALESCE($8, occurred_on),
            note = CASE WHEN $9 THEN $10 ELSE note END,
            updated_at = $11
         WHERE business_id = $1 AND id = $2 AND deleted_at IS NULL
         RETURNING {COLUMNS}"
    ))
    .bind(business_id)
    .bind(id)
    .bind(data.amount)
    .bind(data.category.map(|c| c.as_db()))
    .bind(data.expense_type.map(|t| t.as_db()))
    .bind(data.recurring_expense_id.is_some())
    .bind(data.recurring_expense_id.clone().flatten())
    .bind(data.occurred_on)
    .bind(data.note.is_some())
    .bind(data.note.clone().flatten())
    .bind(now_millis())
    .fetch_optional(pool)
    .await?;
    row.map(Expense::try_from).transpose()
}

pub async fn soft_delete(pool: &PgPool, business_id: &str, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE expenses SET deleted_at = $3, updated_at = $3
         WHERE business_id = $1 AND id = $2 AND deleted_at IS NULL",
    )
    .bind(business_id)
    .bind(id)
    .bind(now_millis())
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}
