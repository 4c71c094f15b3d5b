//! Capital investments made by workspace members

use chrono::NaiveDate;
use rust_decimal::Decimal;
use shared::list::ListRequest;
use shared::models::{Investment, InvestmentCreate, InvestmentUpdate, trim_opt};
use shared::util::{now_millis, prefixed_id, today_utc};
use sqlx::{PgExecutor, PgPool};

use super::paginate;

#[derive(sqlx::FromRow)]
struct InvestmentRow {
    id: String,
    business_id: String,
    investor_id: String,
    amount: Decimal,
    currency: String,
    note: Option<String>,
    invested_at: NaiveDate,
    created_at: i64,
    updated_at: i64,
}

impl From<InvestmentRow> for Investment {
    fn from(row: InvestmentRow) -> Self {
        Investment {
            id: row.id,
            business_id: row.business_id,
            investor_id: row.investor_id,
            amount: row.amount,
            currency: row.currency,
            note: row.note,
            invested_at: row.invested_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const COLUMNS: &str =
    "id, business_id, investor_id, amount, currency, note, invested_at, created_at, updated_at";

pub async fn list(
    pool: &PgPool,
    business_id: &str,
    request: &ListRequest,
) -> Result<(Vec<Investment>, i64), sqlx::Error> {
    let search = request.search_pattern();
    let (rows, total) = paginate::<InvestmentRow, _>(
        pool,
        COLUMNS,
        "investments WHERE deleted_at IS NULL",
        "",
        request,
        |qb| {
            qb.push(" AND business_id = ").push_bind(business_id.to_string());
            if let Some(pattern) = &search {
                qb.push(" AND note ILIKE ").push_bind(pattern.clone());
            }
        },
    )
    .await?;
    Ok((rows.into_iter().map(Into::into).collect(), total))
}

pub async fn find(
    db: impl PgExecutor<'_>,
    business_id: &str,
    id: &str,
) -> Result<Option<Investment>, sqlx::Error> {
    let row: Option<InvestmentRow> = sqlx::query_as(&format!(
        "SELECT {COLUMNS} FROM investments WHERE business_id = $1 AND id = $2 AND deleted_at IS NULL"
    ))
    .bind(business_id)
    .bind(id)
    .fetch_optional(db)
    .await?;
    Ok(row.map(Into::into))
}

pub async fn create(
    pool: &PgPool,
    business_id: &str,
    currency: &str,
    data: &InvestmentCreate,
) -> Result<Investment, sqlx::Error> {
    let row: InvestmentRow = sqlx::query_as(&format!(
        "INSERT INTO investments (id, business_id, investor_id, amount, currency, note, invested_at, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
         RETURNING {COLUMNS}"
    ))
    .bind(prefixed_id("inv"))
    .bind(business_id)
    .bind(&data.investor_id)
    .bind(data.amount)
    .bind(currency)
    .bind(trim_opt(data.note.as_deref()))
    .bind(data.invested_at.unwrap_or_else(today_utc))
    .bind(now_millis())
    .fetch_one(pool)
    .await?;
    Ok(row.into())
}

pub async fn update(
    pool: &PgPool,
    business_id: &str,
    id: &str,
    data: &InvestmentUpdate,
) -> Result<Option<Investment>, sqlx::Error> {
    let row: Option<InvestmentRow> = sqlx::query_as(&format!(
        "UPDATE investments SET
            investor_id = COALESCE($3, investor_id),
            amount = COALESCE($4, amount),
            note = CASE WHEN $5 THEN $6 ELSE note END,
            invested_at = COALESCE($7, invested_at),
            updated_at = $8
         WHERE business_id = $1 AND id = $2 AND deleted_at IS NULL
         RETURNING {COLUMNS}"
    ))
    .bind(business_id)
    .bind(id)
    .bind(data.investor_id.as_deref())
    .bind(data.amount)
    .bind(data.note.is_some())
    .bind(data.note.as_ref().and_then(|n| trim_opt(n.as_deref())))
    .bind(data.invested_at)
    .bind(now_millis())
    .fetch_optional(pool)
    .await?;
    Ok(row.map(Into::into))
}

pub async fn soft_delete(pool: &PgPool, business_id: &str, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE investments SET deleted_at = $3, updated_at = $3
         WHERE business_id = $1 AND id = $2 AND deleted_at IS NULL",
    )
    .bind(business_id)
    .bind(id)
    .bind(now_millis())
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}
