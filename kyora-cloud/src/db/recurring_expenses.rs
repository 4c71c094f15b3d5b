//! Recurring expense templates

use chrono::NaiveDate;
use rust_decimal::Decimal;
use shared::list::ListRequest;
use shared::models::{
    ExpenseCategory, Frequency, RecurringExpense, RecurringExpenseFilter, RecurringExpenseStatus,
};
use shared::util::{now_millis, prefixed_id};
use sqlx::{PgConnection, PgExecutor, PgPool};

use super::{enum_col, paginate};

#[derive(sqlx::FromRow)]
struct RecurringExpenseRow {
    id: String,
    business_id: String,
    frequency: String,
    recurring_start_date: NaiveDate,
    recurring_end_date: Option<NaiveDate>,
    next_recurring_date: Option<NaiveDate>,
    amount: Decimal,
    currency: String,
    category: String,
    status: String,
    note: Option<String>,
    created_at: i64,
    updated_at: i64,
}

impl TryFrom<RecurringExpenseRow> for RecurringExpense {
    type Error = sqlx::Error;

    fn try_from(row: RecurringExpenseRow) -> Result<Self, Self::Error> {
        Ok(RecurringExpense {
            frequency: enum_col(&row.frequency)?,
            category: enum_col(&row.category)?,
            status: enum_col(&row.status)?,
            id: row.id,
            business_id: row.business_id,
            recurring_start_date: row.recurring_start_date,
            recurring_end_date: row.recurring_end_date,
            next_recurring_date: row.next_recurring_date,
            amount: row.amount,
            currency: row.currency,
            note: row.note,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const COLUMNS: &str = "id, business_id, frequency, recurring_start_date, recurring_end_date, \
    next_recurring_date, amount, currency, category, status, note, created_at, updated_at";

fn convert(rows: Vec<RecurringExpenseRow>) -> Result<Vec<RecurringExpense>, sqlx::Error> {
    rows.into_iter().map(RecurringExpense::try_from).collect()
}

pub async fn list(
    pool: &PgPool,
    business_id: &str,
    filter: &RecurringExpenseFilter,
    request: &ListRequest,
) -> Result<(Vec<RecurringExpense>, i64), sqlx::Error> {
    let search = request.search_pattern();
    let (rows, total) = paginate::<RecurringExpenseRow, _>(
        pool,
        COLUMNS,
        "recurring_expenses WHERE deleted_at IS NULL",
        "",
        request,
        |qb| {
            qb.push(" AND business_id = ").push_bind(business_id.to_string());
            if let Some(status) = filter.status {
                qb.push(" AND status = ").push_bind(status.as_db());
            }
            if let Some(frequency) = filter.frequency {
                qb.push(" AND frequency = ").push_bind(frequency.as_db());
            }
            if let Some(category) = filter.category {
                qb.push(" AND category = ").push_bind(category.as_db());
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
) -> Result<Option<RecurringExpense>, sqlx::Error> {
    let row: Option<RecurringExpenseRow> = sqlx::query_as(&format!(
        "SELECT {COLUMNS} FROM recurring_expenses WHERE business_id = $1 AND id = $2 AND deleted_at IS NULL"
    ))
    .bind(business_id)
    .bind(id)
    .fetch_optional(db)
    .await?;
    row.map(RecurringExpense::try_from).transpose()
}

/// Same as [`find`] but takes a row lock for the rest of the transaction
pub async fn find_for_update(
    conn: &mut PgConnection,
    business_id: &str,
    id: &str,
) -> Result<Option<RecurringExpense>, sqlx::Error> {
    let row: Option<RecurringExpenseRow> = sqlx::query_as(&format!(
        "SELECT {COLUMNS} FROM recurring_expenses
         WHERE business_id = $1 AND id = $2 AND deleted_at IS NULL
         FOR UPDATE"
    ))
    .bind(business_id)
    .bind(id)
    .fetch_optional(conn)
    .await?;
    row.map(RecurringExpense::try_from).transpose()
}

pub struct NewRecurringExpense<'a> {
    pub frequency: Frequency,
    pub start: NaiveDate,
    pub end: Option<NaiveDate>,
    pub next: Option<NaiveDate>,
    pub amount: Decimal,
    pub currency: &'a str,
    pub category: ExpenseCategory,
    pub status: RecurringExpenseStatus,
    pub note: Option<&'a str>,
}

pub async fn insert(
    conn: &mut PgConnection,
    business_id: &str,
    template: &NewRecurringExpense<'_>,
) -> Result<RecurringExpense, sqlx::Error> {
    let row: RecurringExpenseRow = sqlx::query_as(&format!(
        "INSERT INTO recurring_expenses (id, business_id, frequency, recurring_start_date,
            recurring_end_date, next_recurring_date, amount, currency, category, status, note,
            created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $12)
         RETURNING {COLUMNS}"
    ))
    .bind(prefixed_id("rexp"))
    .bind(business_id)
    .bind(template.frequency.as_db())
    .bind(template.start)
    .bind(template.end)
    .bind(template.next)
    .bind(template.amount)
    .bind(template.currency)
    .bind(template.category.as_db())
    .bind(template.status.as_db())
    .bind(template.note)
    .bind(now_millis())
    .fetch_one(conn)
    .await?;
    row.try_into()
}

/// Full rewrite of the mutable fields of a locked template
pub async fn save(
    conn: &mut PgConnection,
    template: &RecurringExpense,
) -> Result<RecurringExpense, sqlx::Error> {
    let row: RecurringExpenseRow = sqlx::query_as(&format!(
        "UPDATE recurring_expenses SET
            frequency = $3,
            recurring_start_date = $4,
            recurring_end_date = $5,
            next_recurring_date = $6,
            amount = $7,
            category = $8,
            status = $9,
            note = $10,
            updated_at = $11
         WHERE business_id = $1 AND id = $2 AND deleted_at IS NULL
         RETURNING {COLUMNS}"
    ))
    .bind(&template.business_id)
    .bind(&template.id)
    .bind(template.frequency.as_db())
    .bind(template.recurring_start_date)
    .bind(template.recurring_end_date)
    .bind(template.next_recurring_date)
    .bind(template.amount)
    .bind(template.category.as_db())
    .bind(template.status.as_db())
    .bind(&template.note)
    .bind(now_millis())
    .fetch_one(conn)
    .await?;
    row.try_into()
}

fn lock_due_sql() -> String {
    format!(
        "SELECT {COLUMNS} FROM recurring_expenses
         WHERE deleted_at IS NULL
           AND status = $1
           AND recurring_start_date <= $2
           AND (recurring_end_date IS NULL OR recurring_end_date >= $2
                OR next_recurring_date IS NULL OR next_recurring_date <= recurring_end_date)
           AND business_id IN (SELECT id FROM businesses WHERE deleted_at IS NULL)
         ORDER BY id
         FOR UPDATE SKIP LOCKED"
    )
}

/// Active templates that may have an occurrence due by `today`, across all
/// live businesses. Rows locked by a concurrent run are skipped.
pub async fn lock_due(
    conn: &mut PgConnection,
    today: NaiveDate,
) -> Result<Vec<RecurringExpense>, sqlx::Error> {
    let rows: Vec<RecurringExpenseRow> = sqlx::query_as(&lock_due_sql())
    .bind(RecurringExpenseStatus::Active.as_db())
    .bind(today)
    .fetch_all(conn)
    .await?;
    convert(rows)
}

/// Persist the job's progress on a template
pub async fn save_progress(
    conn: &mut PgConnection,
    id: &str,
    next: Option<NaiveDate>,
    status: RecurringExpenseStatus,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE recurring_expenses SET next_recurring_date = $2, status = $3, updated_at = $4 WHERE id = $1",
    )
    .bind(id)
    .bind(next)
    .bind(status.as_db())
    .bind(now_millis())
    .execute(conn)
    .await?;
    Ok(())
}

/// Soft delete; generated expenses keep their link
pub async fn soft_delete(pool: &PgPool, business_id: &str, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE recurring_expenses SET deleted_at = $3, updated_at = $3
         WHERE business_id = $1 AND id = $2 AND deleted_at IS NULL",
    )
    .bind(business_id)
    .bind(id)
    .bind(now_millis())
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_due_skips_deleted_businesses() {
        let sql = lock_due_sql();
        assert!(sql.contains("business_id IN (SELECT id FROM businesses WHERE deleted_at IS NULL)"));
        assert!(sql.ends_with("FOR UPDATE SKIP LOCKED"));
    }
}
