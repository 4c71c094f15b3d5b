//! Products

use shared::list::ListRequest;
use shared::models::{Product, ProductFilter};
use shared::util::{now_millis, prefixed_id};
use sqlx::{PgConnection, PgExecutor, PgPool};

use super::{paginate, stock_status_predicate};

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: String,
    business_id: String,
    category_id: String,
    name: String,
    description: Option<String>,
    photos: Vec<String>,
    created_at: i64,
    updated_at: i64,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: row.id,
            business_id: row.business_id,
            name: row.name,
            description: row.description,
            photos: row.photos,
            category_id: row.category_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
            variants: None,
        }
    }
}

const COLUMNS: &str =
    "p.id, p.business_id, p.category_id, p.name, p.description, p.photos, p.created_at, p.updated_at";

pub async fn list(
    pool: &PgPool,
    business_id: &str,
    filter: &ProductFilter,
    request: &ListRequest,
) -> Result<(Vec<Product>, i64), sqlx::Error> {
    let search = request.search_pattern();
    let (rows, total) = paginate::<ProductRow, _>(
        pool,
        COLUMNS,
        "products p WHERE p.deleted_at IS NULL",
        "p.",
        request,
        |qb| {
            qb.push(" AND p.business_id = ").push_bind(business_id.to_string());
            if let Some(category_id) = &filter.category_id {
                qb.push(" AND p.category_id = ").push_bind(category_id.clone());
            }
            if let Some(status) = filter.stock_status {
                qb.push(" AND EXISTS (SELECT 1 FROM variants v WHERE v.product_id = p.id AND v.deleted_at IS NULL AND ")
                    .push(stock_status_predicate(status, "v"))
                    .push(")");
            }
            if let Some(pattern) = &search {
                qb.push(" AND (p.name ILIKE ")
                    .push_bind(pattern.clone())
                    .push(" OR p.description ILIKE ")
                    .push_bind(pattern.clone())
                    .push(")");
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
) -> Result<Option<Product>, sqlx::Error> {
    let row: Option<ProductRow> = sqlx::query_as(&format!(
        "SELECT {COLUMNS} FROM products p WHERE p.business_id = $1 AND p.id = $2 AND p.deleted_at IS NULL"
    ))
    .bind(business_id)
    .bind(id)
    .fetch_optional(db)
    .await?;
    Ok(row.map(Into::into))
}

/// Products by id (order items, summaries); missing ids are skipped
pub async fn find_many(
    db: impl PgExecutor<'_>,
    business_id: &str,
    ids: &[String],
) -> Result<Vec<Product>, sqlx::Error> {
    let rows: Vec<ProductRow> = sqlx::query_as(&format!(
        "SELECT {COLUMNS} FROM products p
         WHERE p.business_id = $1 AND p.id = ANY($2) AND p.deleted_at IS NULL"
    ))
    .bind(business_id)
    .bind(ids)
    .fetch_all(db)
    .await?;
    Ok(rows.into_iter().map(Into::into).collect())
}

pub struct NewProduct<'a> {
    pub name: &'a str,
    pub description: Option<&'a str>,
    pub photos: &'a [String],
    pub category_id: &'a str,
}

pub async fn insert(
    conn: &mut PgConnection,
    business_id: &str,
    product: &NewProduct<'_>,
) -> Result<Product, sqlx::Error> {
    let row: ProductRow = sqlx::query_as(&format!(
        "INSERT INTO products AS p (id, business_id, category_id, name, description, photos, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
         RETURNING {COLUMNS}"
    ))
    .bind(prefixed_id("prod"))
    .bind(business_id)
    .bind(product.category_id)
    .bind(product.name)
    .bind(product.description)
    .bind(product.photos)
    .bind(now_millis())
    .fetch_one(conn)
    .await?;
    Ok(row.into())
}

pub struct ProductChanges<'a> {
    pub name: Option<&'a str>,
    pub description: Option<Option<&'a str>>,
    pub photos: Option<&'a [String]>,
    pub category_id: Option<&'a str>,
}

pub async fn update(
    conn: &mut PgConnection,
    business_id: &str,
    id: &str,
    changes: &ProductChanges<'_>,
) -> Result<Option<Product>, sqlx::Error> {
    let row: Option<ProductRow> = sqlx::query_as(&format!(
        "UPDATE products AS p SET
            name = COALESCE($3, p.name),
            description = CASE WHEN $4 THEN $5 ELSE p.description END,
            photos = COALESCE($6, p.photos),
            category_id = COALESCE($7, p.category_id),
            updated_at = $8
         WHERE p.business_id = $1 AND p.id = $2 AND p.deleted_at IS NULL
         RETURNING {COLUMNS}"
    ))
    .bind(business_id)
    .bind(id)
    .bind(changes.name)
    .bind(changes.description.is_some())
    .bind(changes.description.flatten())
    .bind(changes.photos)
    .bind(changes.category_id)
    .bind(now_millis())
    .fetch_optional(conn)
    .await?;
    Ok(row.map(Into::into))
}

/// Soft-delete a product together with its variants
pub async fn soft_delete(
    conn: &mut PgConnection,
    business_id: &str,
    id: &str,
) -> Result<bool, sqlx::Error> {
    let now = now_millis();
    let result = sqlx::query(
        "UPDATE products SET deleted_at = $3, updated_at = $3
         WHERE business_id = $1 AND id = $2 AND deleted_at IS NULL",
    )
    .bind(business_id)
    .bind(id)
    .bind(now)
    .execute(&mut *conn)
    .await?;
    if result.rows_affected() == 0 {
        return Ok(false);
    }

    sqlx::query(
        "UPDATE variants SET deleted_at = $3, updated_at = $3
         WHERE business_id = $1 AND product_id = $2 AND deleted_at IS NULL",
    )
    .bind(business_id)
    .bind(id)
    .bind(now)
    .execute(&mut *conn)
    .await?;
    Ok(true)
}
