//! Businesses (tenants), scoped by workspace

use chrono::NaiveDate;
use rust_decimal::Decimal;
use shared::list::ListRequest;
use shared::models::{Business, BusinessCreate, BusinessUpdate, trim_opt};
use shared::util::{now_millis, prefixed_id};
use sqlx::{PgExecutor, PgPool};

use super::paginate;

pub const DESCRIPTOR_CONSTRAINT: &str = "businesses_descriptor_key";

#[derive(sqlx::FromRow)]
struct BusinessRow {
    id: String,
    workspace_id: String,
    descriptor: String,
    name: String,
    brand: Option<String>,
    country_code: String,
    currency: String,
    vat_rate: Decimal,
    safety_buffer: Decimal,
    support_email: Option<String>,
    phone_number: Option<String>,
    website_url: Option<String>,
    established_at: Option<NaiveDate>,
    archived_at: Option<i64>,
    created_at: i64,
    updated_at: i64,
}

impl From<BusinessRow> for Business {
    fn from(row: BusinessRow) -> Self {
        Business {
            id: row.id,
            workspace_id: row.workspace_id,
            descriptor: row.descriptor,
            name: row.name,
            brand: row.brand,
            country_code: row.country_code,
            currency: row.currency,
            vat_rate: row.vat_rate,
            safety_buffer: row.safety_buffer,
            support_email: row.support_email,
            phone_number: row.phone_number,
            website_url: row.website_url,
            established_at: row.established_at,
            archived_at: row.archived_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const COLUMNS: &str = "id, workspace_id, descriptor, name, brand, country_code, currency, vat_rate, \
    safety_buffer, support_email, phone_number, website_url, established_at, archived_at, \
    created_at, updated_at";

pub async fn find_by_descriptor(
    db: impl PgExecutor<'_>,
    workspace_id: &str,
    descriptor: &str,
) -> Result<Option<Business>, sqlx::Error> {
    let row: Option<BusinessRow> = sqlx::query_as(&format!(
        "SELECT {COLUMNS} FROM businesses
         WHERE workspace_id = $1 AND descriptor = $2 AND deleted_at IS NULL"
    ))
    .bind(workspace_id)
    .bind(descriptor.trim().to_ascii_lowercase())
    .fetch_optional(db)
    .await?;
    Ok(row.map(Into::into))
}

pub async fn descriptor_exists(
    db: impl PgExecutor<'_>,
    workspace_id: &str,
    descriptor: &str,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM businesses
         WHERE workspace_id = $1 AND descriptor = $2 AND deleted_at IS NULL)",
    )
    .bind(workspace_id)
    .bind(descriptor)
    .fetch_one(db)
    .await
}

pub async fn list(
    pool: &PgPool,
    workspace_id: &str,
    request: &ListRequest,
) -> Result<(Vec<Business>, i64), sqlx::Error> {
    let search = request.search_pattern();
    let (rows, total) = paginate::<BusinessRow, _>(
        pool,
        COLUMNS,
        "businesses WHERE deleted_at IS NULL",
        "",
        request,
        |qb| {
            qb.push(" AND workspace_id = ").push_bind(workspace_id.to_string());
            if let Some(pattern) = &search {
                qb.push(" AND (name ILIKE ")
                    .push_bind(pattern.clone())
                    .push(" OR descriptor ILIKE ")
                    .push_bind(pattern.clone())
                    .push(")");
            }
        },
    )
    .await?;
    Ok((rows.into_iter().map(Into::into).collect(), total))
}

/// `descriptor` must already be normalized
pub async fn create(
    pool: &PgPool,
    workspace_id: &str,
    descriptor: &str,
    data: &BusinessCreate,
) -> Result<Business, sqlx::Error> {
    let now = now_millis();
    let row: BusinessRow = sqlx::query_as(&format!(
        "INSERT INTO businesses (id, workspace_id, descriptor, name, brand, country_code, currency,
            vat_rate, safety_buffer, support_email, phone_number, website_url, established_at,
            created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $14)
         RETURNING {COLUMNS}"
    ))
    .bind(prefixed_id("bus"))
    .bind(workspace_id)
    .bind(descriptor)
    .bind(data.name.trim())
    .bind(trim_opt(data.brand.as_deref()))
    .bind(data.country_code.to_ascii_uppercase())
    .bind(data.currency.to_ascii_uppercase())
    .bind(data.vat_rate.unwrap_or(Decimal::ZERO))
    .bind(data.safety_buffer.unwrap_or(Decimal::ZERO))
    .bind(trim_opt(data.support_email.as_deref()))
    .bind(trim_opt(data.phone_number.as_deref()))
    .bind(trim_opt(data.website_url.as_deref()))
    .bind(data.established_at)
    .bind(now)
    .fetch_one(pool)
    .await?;
    Ok(row.into())
}

/// Apply a partial update; `descriptor` is the normalized new descriptor, if any
pub async fn update(
    pool: &PgPool,
    id: &str,
    descriptor: Option<&str>,
    data: &BusinessUpdate,
) -> Result<Business, sqlx::Error> {
    let row: BusinessRow = sqlx::query_as(&format!(
        "UPDATE businesses SET
            descriptor = COALESCE($2, descriptor),
            name = COALESCE($3, name),
            brand = CASE WHEN $4 THEN $5 ELSE brand END,
            country_code = COALESCE($6, country_code),
            currency = COALESCE($7, currency),
            vat_rate = COALESCE($8, vat_rate),
            safety_buffer = COALESCE($9, safety_buffer),
            support_email = CASE WHEN $10 THEN $11 ELSE support_email END,
            phone_number = CASE WHEN $12 THEN $13 ELSE phone_number END,
            website_url = CASE WHEN $14 THEN $15 ELSE website_url END,
            established_at = CASE WHEN $16 THEN $17 ELSE established_at END,
            updated_at = $18
         WHERE id = $1 AND deleted_at IS NULL
         RETURNING {COLUMNS}"
    ))
    .bind(id)
    .bind(descriptor)
    .bind(data.name.as_deref().map(str::trim))
    .bind(data.brand.is_some())
    .bind(data.brand.as_ref().and_then(|v| trim_opt(v.as_deref())))
    .bind(data.country_code.as_deref().map(str::to_ascii_uppercase))
    .bind(data.currency.as_deref().map(str::to_ascii_uppercase))
    .bind(data.vat_rate)
    .bind(data.safety_buffer)
    .bind(data.support_email.is_some())
    .bind(data.support_email.as_ref().and_then(|v| trim_opt(v.as_deref())))
    .bind(data.phone_number.is_some())
    .bind(data.phone_number.as_ref().and_then(|v| trim_opt(v.as_deref())))
    .bind(data.website_url.is_some())
    .bind(data.website_url.as_ref().and_then(|v| trim_opt(v.as_deref())))
    .bind(data.established_at.is_some())
    .bind(data.established_at.flatten())
    .bind(now_millis())
    .fetch_one(pool)
    .await?;
    Ok(row.into())
}

/// Set or clear `archived_at`
pub async fn set_archived(
    pool: &PgPool,
    id: &str,
    archived: bool,
) -> Result<Business, sqlx::Error> {
    let now = now_millis();
    let row: BusinessRow = sqlx::query_as(&format!(
        "UPDATE businesses SET archived_at = $2, updated_at = $3
         WHERE id = $1 AND deleted_at IS NULL
         RETURNING {COLUMNS}"
    ))
    .bind(id)
    .bind(archived.then_some(now))
    .bind(now)
    .fetch_one(pool)
    .await?;
    Ok(row.into())
}

pub async fn soft_delete(pool: &PgPool, id: &str) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE businesses SET deleted_at = $2, updated_at = $2 WHERE id = $1 AND deleted_at IS NULL")
        .bind(id)
        .bind(now_millis())
        .execute(pool)
        .await?;
    Ok(())
}
