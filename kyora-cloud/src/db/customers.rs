//! Customers

use chrono::NaiveDate;
use shared::list::ListRequest;
use shared::models::{Customer, CustomerCreate, CustomerFilter, CustomerUpdate, Gender, trim_opt};
use shared::util::{now_millis, prefixed_id, today_utc};
use sqlx::{PgExecutor, PgPool};

use super::{opt_enum_col, paginate};

pub const EMAIL_CONSTRAINT: &str = "customers_email_key";

#[derive(sqlx::FromRow)]
struct CustomerRow {
    id: String,
    business_id: String,
    name: String,
    email: Option<String>,
    phone_code: Option<String>,
    phone_number: Option<String>,
    country_code: String,
    gender: Option<String>,
    instagram_username: Option<String>,
    tiktok_username: Option<String>,
    facebook_username: Option<String>,
    x_username: Option<String>,
    snapchat_username: Option<String>,
    whatsapp_number: Option<String>,
    joined_at: NaiveDate,
    created_at: i64,
    updated_at: i64,
}

impl TryFrom<CustomerRow> for Customer {
    type Error = sqlx::Error;

    fn try_from(row: CustomerRow) -> Result<Self, Self::Error> {
        Ok(Customer {
            gender: opt_enum_col(row.gender.as_deref())?,
            id: row.id,
            business_id: row.business_id,
            name: row.name,
            email: row.email,
            phone_code: row.phone_code,
            phone_number: row.phone_number,
            country_code: row.country_code,
            instagram_username: row.instagram_username,
            tiktok_username: row.tiktok_username,
            facebook_username: row.facebook_username,
            x_username: row.x_username,
            snapchat_username: row.snapchat_username,
            whatsapp_number: row.whatsapp_number,
            joined_at: row.joined_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const COLUMNS: &str = "id, business_id, name, email, phone_code, phone_number, country_code, gender, \
    instagram_username, tiktok_username, facebook_username, x_username, snapchat_username, \
    whatsapp_number, joined_at, created_at, updated_at";

pub async fn list(
    pool: &PgPool,
    business_id: &str,
    filter: &CustomerFilter,
    request: &ListRequest,
) -> Result<(Vec<Customer>, i64), sqlx::Error> {
    let search = request.search_pattern();
    let (rows, total) = paginate::<CustomerRow, _>(
        pool,
        COLUMNS,
        "customers WHERE deleted_at IS NULL",
        "",
        request,
        |qb| {
            qb.push(" AND business_id = ").push_bind(business_id.to_string());
            if let Some(country) = &filter.country_code {
                qb.push(" AND country_code = ").push_bind(country.to_ascii_uppercase());
            }
            if let Some(gender) = filter.gender {
                qb.push(" AND gender = ").push_bind(gender.as_db());
            }
            if let Some(pattern) = &search {
                qb.push(" AND (name ILIKE ")
                    .push_bind(pattern.clone())
                    .push(" OR email ILIKE ")
                    .push_bind(pattern.clone())
                    .push(" OR phone_number ILIKE ")
                    .push_bind(pattern.clone())
                    .push(")");
            }
        },
    )
    .await?;
    let customers = rows
        .into_iter()
        .map(Customer::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    Ok((customers, total))
}

pub async fn find(
    db: impl PgExecutor<'_>,
    business_id: &str,
    id: &str,
) -> Result<Option<Customer>, sqlx::Error> {
    let row: Option<CustomerRow> = sqlx::query_as(&format!(
        "SELECT {COLUMNS} FROM customers WHERE business_id = $1 AND id = $2 AND deleted_at IS NULL"
    ))
    .bind(business_id)
    .bind(id)
    .fetch_optional(db)
    .await?;
    row.map(Customer::try_from).transpose()
}

pub async fn exists(db: impl PgExecutor<'_>, business_id: &str, id: &str) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM customers WHERE business_id = $1 AND id = $2 AND deleted_at IS NULL)",
    )
    .bind(business_id)
    .bind(id)
    .fetch_one(db)
    .await
}

pub async fn create(
    pool: &PgPool,
    business_id: &str,
    data: &CustomerCreate,
) -> Result<Customer, sqlx::Error> {
    let row: CustomerRow = sqlx::query_as(&format!(
        "INSERT INTO customers (id, business_id, name, email, phone_code, phone_number, country_code,
            gender, instagram_username, tiktok_username, facebook_username, x_username,
            snapchat_username, whatsapp_number, joined_at, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $16)
         RETURNING {COLUMNS}"
    ))
    .bind(prefixed_id("cus"))
    .bind(business_id)
    .bind(data.name.trim())
    .bind(trim_opt(data.email.as_deref()).map(|e| e.to_lowercase()))
    .bind(trim_opt(data.phone_code.as_deref()))
    .bind(trim_opt(data.phone_number.as_deref()))
    .bind(data.country_code.to_ascii_uppercase())
    .bind(data.gender.map(|g| g.as_db()))
    .bind(trim_opt(data.instagram_username.as_deref()))
    .bind(trim_opt(data.tiktok_username.as_deref()))
    .bind(trim_opt(data.facebook_username.as_deref()))
    .bind(trim_opt(data.x_username.as_deref()))
    .bind(trim_opt(data.snapchat_username.as_deref()))
    .bind(trim_opt(data.whatsapp_number.as_deref()))
    .bind(data.joined_at.unwrap_or_else(today_utc))
    .bind(now_millis())
    .fetch_one(pool)
    .await?;
    row.try_into()
}

/// Absent fields keep their value; an empty string clears an optional field.
pub async fn update(
    pool: &PgPool,
    business_id: &str,
    id: &str,
    data: &CustomerUpdate,
) -> Result<Option<Customer>, sqlx::Error> {
    // (is_set, new value) pairs for the clearable text columns
    let clearable = |v: &Option<String>| (v.is_some(), trim_opt(v.as_deref()));
    let email = clearable(&data.email);
    let phone_code = clearable(&data.phone_code);
    let phone_number = clearable(&data.phone_number);
    let instagram = clearable(&data.instagram_username);
    let tiktok = clearable(&data.tiktok_username);
    let facebook = clearable(&data.facebook_username);
    let x = clearable(&data.x_username);
    let snapchat = clearable(&data.snapchat_username);
    let whatsapp = clearable(&data.whatsapp_number);

    let row: Option<CustomerRow> = sqlx::query_as(&format!(
        "UPDATE customers SET
            name = COALESCE($3, name),
            email = CASE WHEN $4 THEN $5 ELSE email END,
            phone_code = CASE WHEN $6 THEN $7 ELSE phone_code END,
            phone_number = CASE WHEN $8 THEN $9 ELSE phone_number END,
            country_code = COALESCE($10, country_code),
            gender = COALESCE($11, gender),
            instagram_username = CASE WHEN $12 THEN $13 ELSE instagram_username END,
            tiktok_username = CASE WHEN $14 THEN $15 ELSE tiktok_username END,
            facebook_username = CASE WHEN $16 THEN $17 ELSE facebook_username END,
            x_username = CASE WHEN $18 THEN $19 ELSE x_username END,
            snapchat_username = CASE WHEN $20 THEN $21 ELSE snapchat_username END,
            whatsapp_number = CASE WHEN $22 THEN $23 ELSE whatsapp_number END,
            joined_at = COALESCE($24, joined_at),
            updated_at = $25
         WHERE business_id = $1 AND id = $2 AND deleted_at IS NULL
         RETURNING {COLUMNS}"
    ))
    .bind(business_id)
    .bind(id)
    .bind(data.name.as_deref().map(str::trim))
    .bind(email.0)
    .bind(email.1.map(|e| e.to_lowercase()))
    .bind(phone_code.0)
    .bind(phone_code.1)
    .bind(phone_number.0)
    .bind(phone_number.1)
    .bind(data.country_code.as_deref().map(str::to_ascii_uppercase))
    .bind(data.gender.map(|g: Gender| g.as_db()))
    .bind(instagram.0)
    .bind(instagram.1)
    .bind(tiktok.0)
    .bind(tiktok.1)
    .bind(facebook.0)
    .bind(facebook.1)
    .bind(x.0)
    .bind(x.1)
    .bind(snapchat.0)
    .bind(snapchat.1)
    .bind(whatsapp.0)
    .bind(whatsapp.1)
    .bind(data.joined_at)
    .bind(now_millis())
    .fetch_optional(pool)
    .await?;
    row.map(Customer::try_from).transpose()
}

/// Soft-delete a customer and their addresses
pub async fn soft_delete(pool: &PgPool, business_id: &str, id: &str) -> Result<bool, sqlx::Error> {
    let now = now_millis();
    let mut tx = pool.begin().await?;
    let result = sqlx::query(
        "UPDATE customers SET deleted_at = $3, updated_at = $3
         WHERE business_id = $1 AND id = $2 AND deleted_at IS NULL",
    )
    .bind(business_id)
    .bind(id)
    .bind(now)
    .execute(&mut *tx)
    .await?;
    if result.rows_affected() == 0 {
        return Ok(false);
    }

    sqlx::query(
        "UPDATE customer_addresses SET deleted_at = $3, updated_at = $3
         WHERE business_id = $1 AND customer_id = $2 AND deleted_at IS NULL",
    )
    .bind(business_id)
    .bind(id)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(true)
}
