//! Owner withdrawals (money taken out of the business)

use chrono::NaiveDate;
use rust_decimal::Decimal;
use shared::list::ListRequest;
use shared::models::{Withdrawal, WithdrawalCreate, WithdrawalUpdate, trim_opt};
use shared::util::{now_millis, prefixed_id, today_utc};
use sqlx::{PgExecutor, PgPool};

use super::paginate;

#[derive(sqlx::FromRow)]
struct WithdrawalRow {
    id: String,
    business_id: String,
    withdrawer_id: String,
    amount: Decimal,
    currency: String,
    note: Option<String>,
    withdrawn_at: NaiveDate,
    created_at: i64,
    updated_at: i64,
}

impl From<WithdrawalRow> for Withdrawal {
    fn from(row: WithdrawalRow) -> Self {
        Withdrawal {
            id: row.id,
            business_id: row.business_id,
            withdrawer_id: row.withdrawer_id,
            amount: row.amount,
            currency: row.currency,
            note: row.note,
            withdrawn_at: row.withdrawn_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const COLUMNS: &str =
    "id, business_id, withdrawer_id, amount, currency, note, withdrawn_at, created_at, updated_at";

pub async fn list(
    pool: &PgPool,
    business_id: &str,
    request: &ListRequest,
) -> Result<(Vec<Withdrawal>, i64), sqlx::Error> {
    let search = request.search_pattern();
    let (rows, total) = paginate::<WithdrawalRow, _>(
        pool,
        COLUMNS,
        "withdrawals WHERE deleted_at IS NULL",
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
) -> Result<Option<Withdrawal>, sqlx::Error> {
    let row: Option<WithdrawalRow> = sqlx::query_as(&format!(
        "SELECT {COLUMNS} FROM withdrawals WHERE business_id = $1 AND id = $2 AND deleted_at IS NULL"
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
    data: &WithdrawalCreate,
) -> Result<Withdrawal, sqlx::Error> {
    let row: WithdrawalRow = sqlx::query_as(&format!(
        "INSERT INTO withdrawals (id, business_id, withdrawer_id, amount, currency, note, withdrawn_at, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
         RETURNING {COLUMNS}"
    ))
    .bind(prefixed_id("wdl"))
    .bind(business_id)
    .bind(&data.withdrawer_id)
    .bind(data.amount)
    .bind(currency)
    .bind(trim_opt(data.note.as_deref()))
    .bind(data.withdrawn_at.unwrap_or_else(today_utc))
    .bind(now_millis())
    .fetch_one(pool)
    .await?;
    Ok(row.into())
}

pub async fn update(
    pool: &PgPool,
    business_id: &str,
    id: &str,
    data: &WithdrawalUpdate,
) -> Result<Option<Withdrawal>, sqlx::Error> {
    let row: Option<WithdrawalRow> = sqlx::query_as(&format!(
        "UPDATE withdrawals SET
            withdrawer_id = COALESCE($3, withdrawer_id),
            amount = COALESCE($4, amount),
            note = CASE WHEN $5 THEN $6 ELSE note END,
            withdrawn_at = COALESCE($7, withdrawn_at),
            updated_at = $8
         WHERE business_id = $1 AND id = $2 AND deleted_at IS NULL
         RETURNING {COLUMNS}"
    ))
    .bind(business_id)
    .bind(id)
    .bind(data.withdrawer_id.as_deref())
    .bind(data.amount)
    .bind(data.note.is_some())
    .bind(data.note.as_ref().and_then(|n| trim_opt(n.as_deref())))
    .bind(data.withdrawn_at)
    .bind(now_millis())
    .fetch_optional(pool)
    .await?;
    Ok(row.map(Into::into))
}

pub async fn soft_delete(pool: &PgPool, business_id: &str, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE withdrawals SET deleted_at = $3, updated_at = $3
         WHERE business_id = $1 AND id = $2 AND deleted_at IS NULL",
    )
    .bind(business_id)
    .bind(id)
    .bind(now_millis())
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}
