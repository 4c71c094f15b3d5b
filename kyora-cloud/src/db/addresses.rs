//! Customer shipping addresses, scoped by business and customer

use shared::models::{CustomerAddress, CustomerAddressCreate, CustomerAddressUpdate, trim_opt};
use shared::util::{now_millis, prefixed_id};
use sqlx::{PgExecutor, PgPool};

#[derive(sqlx::FromRow)]
struct AddressRow {
    id: String,
    business_id: String,
    customer_id: String,
    country_code: String,
    state: String,
    city: String,
    street: Option<String>,
    zip_code: Option<String>,
    phone_code: String,
    phone_number: String,
    shipping_zone_id: Option<String>,
    created_at: i64,
    updated_at: i64,
}

impl From<AddressRow> for CustomerAddress {
    fn from(row: AddressRow) -> Self {
        CustomerAddress {
            id: row.id,
            business_id: row.business_id,
            customer_id: row.customer_id,
            country_code: row.country_code,
            state: row.state,
            city: row.city,
            street: row.street,
            zip_code: row.zip_code,
            phone_code: row.phone_code,
            phone_number: row.phone_number,
            shipping_zone_id: row.shipping_zone_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const COLUMNS: &str = "id, business_id, customer_id, country_code, state, city, street, zip_code, \
    phone_code, phone_number, shipping_zone_id, created_at, updated_at";

pub async fn list(
    pool: &PgPool,
    business_id: &str,
    customer_id: &str,
) -> Result<Vec<CustomerAddress>, sqlx::Error> {
    let rows: Vec<AddressRow> = sqlx::query_as(&format!(
        "SELECT {COLUMNS} FROM customer_addresses
         WHERE business_id = $1 AND customer_id = $2 AND deleted_at IS NULL
         ORDER BY created_at ASC, id ASC"
    ))
    .bind(business_id)
    .bind(customer_id)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(Into::into).collect())
}

pub async fn find(
    db: impl PgExecutor<'_>,
    business_id: &str,
    customer_id: &str,
    id: &str,
) -> Result<Option<CustomerAddress>, sqlx::Error> {
    let row: Option<AddressRow> = sqlx::query_as(&format!(
        "SELECT {COLUMNS} FROM customer_addresses
         WHERE business_id = $1 AND customer_id = $2 AND id = $3 AND deleted_at IS NULL"
    ))
    .bind(business_id)
    .bind(customer_id)
    .bind(id)
    .fetch_optional(db)
    .await?;
    Ok(row.map(Into::into))
}

pub async fn create(
    pool: &PgPool,
    business_id: &str,
    customer_id: &str,
    data: &CustomerAddressCreate,
) -> Result<CustomerAddress, sqlx::Error> {
    let row: AddressRow = sqlx::query_as(&format!(
        "INSERT INTO customer_addresses (id, business_id, customer_id, country_code, state, city,
            street, zip_code, phone_code, phone_number, shipping_zone_id, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $12)
         RETURNING {COLUMNS}"
    ))
    .bind(prefixed_id("addr"))
    .bind(business_id)
    .bind(customer_id)
    .bind(data.country_code.to_ascii_uppercase())
    .bind(data.state.trim())
    .bind(data.city.trim())
    .bind(trim_opt(data.street.as_deref()))
    .bind(trim_opt(data.zip_code.as_deref()))
    .bind(data.phone_code.trim())
    .bind(data.phone_number.trim())
    .bind(trim_opt(data.shipping_zone_id.as_deref()))
    .bind(now_millis())
    .fetch_one(pool)
    .await?;
    Ok(row.into())
}

pub async fn update(
    pool: &PgPool,
    business_id: &str,
    customer_id: &str,
    id: &str,
    data: &CustomerAddressUpdate,
) -> Result<Option<CustomerAddress>, sqlx::Error> {
    let row: Option<AddressRow> = sqlx::query_as(&format!(
        "UPDATE customer_addresses SET
            country_code = COALESCE($4, country_code),
            state = COALESCE($5, state),
            city = COALESCE($6, city),
            street = CASE WHEN $7 THEN $8 ELSE street END,
            zip_code = CASE WHEN $9 THEN $10 ELSE zip_code END,
            phone_code = COALESCE($11, phone_code),
            phone_number = COALESCE($12, phone_number),
            shipping_zone_id = CASE WHEN $13 THEN $14 ELSE shipping_zone_id END,
            updated_at = $15
         WHERE business_id = $1 AND customer_id = $2 AND id = $3 AND deleted_at IS NULL
         RETURNING {COLUMNS}"
    ))
    .bind(business_id)
    .bind(customer_id)
    .bind(id)
    .bind(data.country_code.as_deref().map(str::to_ascii_uppercase))
    .bind(data.state.as_deref().map(str::trim))
    .bind(data.city.as_deref().map(str::trim))
    .bind(data.street.is_some())
    .bind(trim_opt(data.street.as_deref()))
    .bind(data.zip_code.is_some())
    .bind(trim_opt(data.zip_code.as_deref()))
    .bind(data.phone_code.as_deref().map(str::trim))
    .bind(data.phone_number.as_deref().map(str::trim))
    .bind(data.shipping_zone_id.is_some())
    .bind(trim_opt(data.shipping_zone_id.as_deref()))
    .bind(now_millis())
    .fetch_optional(pool)
    .await?;
    Ok(row.map(Into::into))
}

pub async fn soft_delete(
    pool: &PgPool,
    business_id: &str,
    customer_id: &str,
    id: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE customer_addresses SET deleted_at = $4, updated_at = $4
         WHERE business_id = $1 AND customer_id = $2 AND id = $3 AND deleted_at IS NULL",
    )
    .bind(business_id)
    .bind(customer_id)
    .bind(id)
    .bind(now_millis())
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}
