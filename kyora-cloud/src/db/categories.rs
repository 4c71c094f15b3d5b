//! Product categories

use shared::list::ListRequest;
use shared::models::Category;
use shared::util::{now_millis, prefixed_id};
use sqlx::{PgExecutor, PgPool};

use super::paginate;

pub const DESCRIPTOR_CONSTRAINT: &str = "categories_descriptor_key";

#[derive(sqlx::FromRow)]
struct CategoryRow {
    id: String,
    business_id: String,
    name: String,
    descriptor: String,
    created_at: i64,
    updated_at: i64,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Category {
            id: row.id,
            business_id: row.business_id,
            name: row.name,
            descriptor: row.descriptor,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const COLUMNS: &str = "id, business_id, name, descriptor, created_at, updated_at";

pub async fn list(
    pool: &PgPool,
    business_id: &str,
    request: &ListRequest,
) -> Result<(Vec<Category>, i64), sqlx::Error> {
    let search = request.search_pattern();
    let (rows, total) = paginate::<CategoryRow, _>(
        pool,
        COLUMNS,
        "categories WHERE deleted_at IS NULL",
        "",
        request,
        |qb| {
            qb.push(" AND business_id = ").push_bind(business_id.to_string());
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

pub async fn find(
    db: impl PgExecutor<'_>,
    business_id: &str,
    id: &str,
) -> Result<Option<Category>, sqlx::Error> {
    let row: Option<CategoryRow> = sqlx::query_as(&format!(
        "SELECT {COLUMNS} FROM categories WHERE business_id = $1 AND id = $2 AND deleted_at IS NULL"
    ))
    .bind(business_id)
    .bind(id)
    .fetch_optional(db)
    .await?;
    Ok(row.map(Into::into))
}

pub async fn exists(db: impl PgExecutor<'_>, business_id: &str, id: &str) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM categories WHERE business_id = $1 AND id = $2 AND deleted_at IS NULL)",
    )
    .bind(business_id)
    .bind(id)
    .fetch_one(db)
    .await
}

pub async fn create(
    pool: &PgPool,
    business_id: &str,
    name: &str,
    descriptor: &str,
) -> Result<Category, sqlx::Error> {
    let row: CategoryRow = sqlx::query_as(&format!(
        "INSERT INTO categories (id, business_id, name, descriptor, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $5)
         RETURNING {COLUMNS}"
    ))
    .bind(prefixed_id("cat"))
    .bind(business_id)
    .bind(name)
    .bind(descriptor)
    .bind(now_millis())
    .fetch_one(pool)
    .await?;
    Ok(row.into())
}

pub async fn update(
    pool: &PgPool,
    business_id: &str,
    id: &str,
    name: Option<&str>,
    descriptor: Option<&str>,
) -> Result<Option<Category>, sqlx::Error> {
    let row: Option<CategoryRow> = sqlx::query_as(&format!(
        "UPDATE categories SET name = COALESCE($3, name), descriptor = COALESCE($4, descriptor), updated_at = $5
         WHERE business_id = $1 AND id = $2 AND deleted_at IS NULL
         RETURNING {COLUMNS}"
    ))
    .bind(business_id)
    .bind(id)
    .bind(name)
    .bind(descriptor)
    .bind(now_millis())
    .fetch_optional(pool)
    .await?;
    Ok(row.map(Into::into))
}

/// Number of live products still filed under the category
pub async fn product_count(pool: &PgPool, business_id: &str, id: &str) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT COUNT(*) FROM products WHERE business_id = $1 AND category_id = $2 AND deleted_at IS NULL",
    )
    .bind(business_id)
    .bind(id)
    .fetch_one(pool)
    .await
}

/// Returns `false` when nothing was deleted
pub async fn soft_delete(pool: &PgPool, business_id: &str, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE categories SET deleted_at = $3, updated_at = $3
         WHERE business_id = $1 AND id = $2 AND deleted_at IS NULL",
    )
    .bind(business_id)
    .bind(id)
    .bind(now_millis())
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}
