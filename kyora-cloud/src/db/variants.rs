//! Product variants and their stock

use rust_decimal::Decimal;
use shared::list::ListRequest;
use shared::models::{StockStatus, Variant, VariantFilter};
use shared::util::{now_millis, prefixed_id};
use sqlx::{PgConnection, PgExecutor, PgPool};

use super::{paginate, stock_status_predicate};

pub const SKU_CONSTRAINT: &str = "variants_sku_key";
pub const CODE_CONSTRAINT: &str = "variants_code_key";

#[derive(sqlx::FromRow)]
struct VariantRow {
    id: String,
    business_id: String,
    product_id: String,
    name: String,
    code: String,
    sku: String,
    photos: Vec<String>,
    cost_price: Decimal,
    sale_price: Decimal,
    currency: String,
    stock_quantity: i32,
    stock_quantity_alert: i32,
    created_at: i64,
    updated_at: i64,
}

impl From<VariantRow> for Variant {
    fn from(row: VariantRow) -> Self {
        Variant {
            stock_status: StockStatus::classify(row.stock_quantity, row.stock_quantity_alert),
            id: row.id,
            business_id: row.business_id,
            product_id: row.product_id,
            name: row.name,
            code: row.code,
            sku: row.sku,
            photos: row.photos,
            cost_price: row.cost_price,
            sale_price: row.sale_price,
            currency: row.currency,
            stock_quantity: row.stock_quantity,
            stock_quantity_alert: row.stock_quantity_alert,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const COLUMNS: &str = "v.id, v.business_id, v.product_id, v.name, v.code, v.sku, v.photos, \
    v.cost_price, v.sale_price, v.currency, v.stock_quantity, v.stock_quantity_alert, \
    v.created_at, v.updated_at";

pub async fn list(
    pool: &PgPool,
    business_id: &str,
    filter: &VariantFilter,
    request: &ListRequest,
) -> Result<(Vec<Variant>, i64), sqlx::Error> {
    let search = request.search_pattern();
    let (rows, total) = paginate::<VariantRow, _>(
        pool,
        COLUMNS,
        "variants v WHERE v.deleted_at IS NULL",
        "v.",
        request,
        |qb| {
            qb.push(" AND v.business_id = ").push_bind(business_id.to_string());
            if let Some(product_id) = &filter.product_id {
                qb.push(" AND v.product_id = ").push_bind(product_id.clone());
            }
            if let Some(status) = filter.stock_status {
                qb.push(" AND ").push(stock_status_predicate(status, "v"));
            }
            if let Some(pattern) = &search {
                qb.push(" AND (v.name ILIKE ")
                    .push_bind(pattern.clone())
                    .push(" OR v.sku ILIKE ")
                    .push_bind(pattern.clone())
                    .push(")");
            }
        },
    )
    .await?;
    Ok((rows.into_iter().map(Into::into).collect(), total))
}

pub async fn list_for_product(
    db: impl PgExecutor<'_>,
    business_id: &str,
    product_id: &str,
) -> Result<Vec<Variant>, sqlx::Error> {
    let rows: Vec<VariantRow> = sqlx::query_as(&format!(
        "SELECT {COLUMNS} FROM variants v
         WHERE v.business_id = $1 AND v.product_id = $2 AND v.deleted_at IS NULL
         ORDER BY v.created_at ASC, v.id ASC"
    ))
    .bind(business_id)
    .bind(product_id)
    .fetch_all(db)
    .await?;
    Ok(rows.into_iter().map(Into::into).collect())
}

pub async fn find(
    db: impl PgExecutor<'_>,
    business_id: &str,
    id: &str,
) -> Result<Option<Variant>, sqlx::Error> {
    let row: Option<VariantRow> = sqlx::query_as(&format!(
        "SELECT {COLUMNS} FROM variants v WHERE v.business_id = $1 AND v.id = $2 AND v.deleted_at IS NULL"
    ))
    .bind(business_id)
    .bind(id)
    .fetch_optional(db)
    .await?;
    Ok(row.map(Into::into))
}

/// Lock the given variants for a stock change (ordered by id to avoid deadlocks)
pub async fn lock_many(
    conn: &mut PgConnection,
    business_id: &str,
    ids: &[String],
) -> Result<Vec<Variant>, sqlx::Error> {
    let rows: Vec<VariantRow> = sqlx::query_as(&format!(
        "SELECT {COLUMNS} FROM variants v
         WHERE v.business_id = $1 AND v.id = ANY($2) AND v.deleted_at IS NULL
         ORDER BY v.id
         FOR UPDATE"
    ))
    .bind(business_id)
    .bind(ids)
    .fetch_all(conn)
    .await?;
    Ok(rows.into_iter().map(Into::into).collect())
}

pub struct NewVariant<'a> {
    pub product_id: &'a str,
    pub name: &'a str,
    pub code: &'a str,
    pub sku: &'a str,
    pub photos: &'a [String],
    pub cost_price: Decimal,
    pub sale_price: Decimal,
    pub currency: &'a str,
    pub stock_quantity: i32,
    pub stock_quantity_alert: i32,
}

pub async fn insert(
    conn: &mut PgConnection,
    business_id: &str,
    variant: &NewVariant<'_>,
) -> Result<Variant, sqlx::Error> {
    let row: VariantRow = sqlx::query_as(&format!(
        "INSERT INTO variants AS v (id, business_id, product_id, name, code, sku, photos, cost_price,
            sale_price, currency, stock_quantity, stock_quantity_alert, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $13)
         RETURNING {COLUMNS}"
    ))
    .bind(prefixed_id("var"))
    .bind(business_id)
    .bind(variant.product_id)
    .bind(variant.name)
    .bind(variant.code)
    .bind(variant.sku)
    .bind(variant.photos)
    .bind(variant.cost_price)
    .bind(variant.sale_price)
    .bind(variant.currency)
    .bind(variant.stock_quantity)
    .bind(variant.stock_quantity_alert)
    .bind(now_millis())
    .fetch_one(conn)
    .await?;
    Ok(row.into())
}

#[derive(Default)]
pub struct VariantChanges<'a> {
    pub name: Option<&'a str>,
    pub code: Option<&'a str>,
    pub sku: Option<&'a str>,
    pub photos: Option<&'a [String]>,
    pub cost_price: Option<Decimal>,
    pub sale_price: Option<Decimal>,
    pub stock_quantity: Option<i32>,
    pub stock_quantity_alert: Option<i32>,
}

pub async fn update(
    conn: &mut PgConnection,
    business_id: &str,
    id: &str,
    changes: &VariantChanges<'_>,
) -> Result<Option<Variant>, sqlx::Error> {
    let row: Option<VariantRow> = sqlx::query_as(&format!(
        "UPDATE variants AS v SET
            name = COALESCE($3, v.name),
            code = COALESCE($4, v.code),
            sku = COALESCE($5, v.sku),
            photos = COALESCE($6, v.photos),
            cost_price = COALESCE($7, v.cost_price),
            sale_price = COALESCE($8, v.sale_price),
            stock_quantity = COALESCE($9, v.stock_quantity),
            stock_quantity_alert = COALESCE($10, v.stock_quantity_alert),
            updated_at = $11
         WHERE v.business_id = $1 AND v.id = $2 AND v.deleted_at IS NULL
         RETURNING {COLUMNS}"
    ))
    .bind(business_id)
    .bind(id)
    .bind(changes.name)
    .bind(changes.code)
    .bind(changes.sku)
    .bind(changes.photos)
    .bind(changes.cost_price)
    .bind(changes.sale_price)
    .bind(changes.stock_quantity)
    .bind(changes.stock_quantity_alert)
    .bind(now_millis())
    .fetch_optional(conn)
    .await?;
    Ok(row.map(Into::into))
}

/// Re-derive variant names after a product rename
pub async fn rename_for_product(
    conn: &mut PgConnection,
    business_id: &str,
    product_id: &str,
    product_name: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE variants SET name = $3 || ' - ' || code, updated_at = $4
         WHERE business_id = $1 AND product_id = $2 AND deleted_at IS NULL",
    )
    .bind(business_id)
    .bind(product_id)
    .bind(product_name)
    .bind(now_millis())
    .execute(conn)
    .await?;
    Ok(())
}

/// Add `delta` to the stock; returns `false` when the result would go negative.
pub async fn adjust_stock(
    conn: &mut PgConnection,
    business_id: &str,
    id: &str,
    delta: i32,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE variants SET stock_quantity = stock_quantity + $3, updated_at = $4
         WHERE business_id = $1 AND id = $2 AND stock_quantity + $3 >= 0",
    )
    .bind(business_id)
    .bind(id)
    .bind(delta)
    .bind(now_millis())
    .execute(conn)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn soft_delete(
    conn: &mut PgConnection,
    business_id: &str,
    id: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE variants SET deleted_at = $3, updated_at = $3
         WHERE business_id = $1 AND id = $2 AND deleted_at IS NULL",
    )
    .bind(business_id)
    .bind(id)
    .bind(now_millis())
    .execute(conn)
    .await?;
    Ok(result.rows_affected() > 0)
}
