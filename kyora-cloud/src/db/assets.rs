//! Business assets

use chrono::NaiveDate;
use rust_decimal::Decimal;
use shared::list::ListRequest;
use shared::models::{Asset, AssetCreate, AssetUpdate, trim_opt};
use shared::util::{now_millis, prefixed_id, today_utc};
use sqlx::{PgExecutor, PgPool};

use super::{enum_col, paginate};

#[derive(sqlx::FromRow)]
struct AssetRow {
    id: String,
    business_id: String,
    name: String,
    asset_type: String,
    value: Decimal,
    currency: String,
    purchased_at: NaiveDate,
    note: Option<String>,
    created_at: i64,
    updated_at: i64,
}

impl TryFrom<AssetRow> for Asset {
    type Error = sqlx::Error;

    fn try_from(row: AssetRow) -> Result<Self, Self::Error> {
        Ok(Asset {
            asset_type: enum_col(&row.asset_type)?,
            id: row.id,
            business_id: row.business_id,
            name: row.name,
            value: row.value,
            currency: row.currency,
            purchased_at: row.purchased_at,
            note: row.note,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const COLUMNS: &str = "id, business_id, name, type AS asset_type, value, currency, purchased_at, \
    note, created_at, updated_at";

pub async fn list(
    pool: &PgPool,
    business_id: &str,
    request: &ListRequest,
) -> Result<(Vec<Asset>, i64), sqlx::Error> {
    let search = request.search_pattern();
    let (rows, total) = paginate::<AssetRow, _>(
        pool,
        COLUMNS,
        "assets WHERE deleted_at IS NULL",
        "",
        request,
        |qb| {
            qb.push(" AND business_id = ").push_bind(business_id.to_string());
            if let Some(pattern) = &search {
                qb.push(" AND (name ILIKE ")
                    .push_bind(pattern.clone())
                    .push(" OR note ILIKE ")
                    .push_bind(pattern.clone())
                    .push(")");
            }
        },
    )
    .await?;
    let assets = rows.into_iter().map(Asset::try_from).collect::<Result<_, _>>()?;
    Ok((assets, total))
}

pub async fn find(
    db: impl PgExecutor<'_>,
    business_id: &str,
    id: &str,
) -> Result<Option<Asset>, sqlx::Error> {
    let row: Option<AssetRow> = sqlx::query_as(&format!(
        "SELECT {COLUMNS} FROM assets WHERE business_id = $1 AND id = $2 AND deleted_at IS NULL"
    ))
    .bind(business_id)
    .bind(id)
    .fetch_optional(db)
    .await?;
    row.map(Asset::try_from).transpose()
}

pub async fn create(
    pool: &PgPool,
    business_id: &str,
    currency: &str,
    data: &AssetCreate,
) -> Result<Asset, sqlx::Error> {
    let row: AssetRow = sqlx::query_as(&format!(
        "INSERT INTO assets (id, business_id, name, type, value, currency, purchased_at, note, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9)
         RETURNING {COLUMNS}"
    ))
    .bind(prefixed_id("ast"))
    .bind(business_id)
    .bind(data.name.trim())
    .bind(data.asset_type.as_db())
    .bind(data.value)
    .bind(currency)
    .bind(data.purchased_at.unwrap_or_else(today_utc))
    .bind(trim_opt(data.note.as_deref()))
    .bind(now_millis())
    .fetch_one(pool)
    .await?;
    row.try_into()
}

pub async fn update(
    pool: &PgPool,
    business_id: &str,
    id: &str,
    data: &AssetUpdate,
) -> Result<Option<Asset>, sqlx::Error> {
    let row: Option<AssetRow> = sqlx::query_as(&format!(
        "UPDATE assets SET
            name = COALESCE($3, name),
            type = COALESCE($4, type),
            value = COALESCE($5, value),
            purchased_at = COALESCE($6, purchased_at),
            note = CASE WHEN $7 THEN $8 ELSE note END,
            updated_at = $9
         WHERE business_id = $1 AND id = $2 AND deleted_at IS NULL
         RETURNING {COLUMNS}"
    ))
    .bind(business_id)
    .bind(id)
    .bind(data.name.as_deref().map(str::trim))
    .bind(data.asset_type.map(|t| t.as_db()))
    .bind(data.value)
    .bind(data.purchased_at)
    .bind(data.note.is_some())
    .bind(data.note.as_ref().and_then(|n| trim_opt(n.as_deref())))
    .bind(now_millis())
    .fetch_optional(pool)
    .await?;
    row.map(Asset::try_from).transpose()
}

pub async fn soft_delete(pool: &PgPool, business_id: &str, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE assets SET deleted_at = $3, updated_at = $3
         WHERE business_id = $1 AND id = $2 AND deleted_at IS NULL",
    )
    .bind(business_id)
    .bind(id)
    .bind(now_millis())
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}
