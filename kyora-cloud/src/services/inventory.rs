//! Inventory: categories, products with their variants, and the summary

use std::collections::HashMap;

use shared::error::{AppError, ErrorCode};
use shared::models::{
    Business, Category, CategoryCreate, CategoryUpdate, InventorySummary, Product, ProductCreate,
    ProductUpdate, ProductVariantInput, TOP_PRODUCTS_LIMIT, TopProduct, Variant, VariantUpdate,
    generate_sku, normalize_category_descriptor, trim_opt, variant_name,
};
use sqlx::{Connection, PgConnection, PgPool};

use crate::db;
use crate::db::products::{NewProduct, ProductChanges};
use crate::db::variants::{CODE_CONSTRAINT, NewVariant, SKU_CONSTRAINT, VariantChanges};
use crate::error::{ServiceError, ServiceResult, is_unique_violation};

/// Attempts at a generated SKU before giving up
const SKU_ATTEMPTS: usize = 5;

fn category_not_found(id: &str) -> AppError {
    AppError::new(ErrorCode::CategoryNotFound).with_detail("id", id)
}

pub(crate) fn product_not_found(id: &str) -> AppError {
    AppError::new(ErrorCode::ProductNotFound).with_detail("id", id)
}

pub(crate) fn variant_not_found(id: &str) -> AppError {
    AppError::new(ErrorCode::VariantNotFound).with_detail("id", id)
}

/// Translate the variant unique constraints into their API errors.
fn variant_conflict(e: sqlx::Error, sku: &str, code: &str) -> ServiceError {
    if is_unique_violation(&e, SKU_CONSTRAINT) {
        return AppError::new(ErrorCode::VariantSkuExists).with_detail("sku", sku).into();
    }
    if is_unique_violation(&e, CODE_CONSTRAINT) {
        return AppError::new(ErrorCode::VariantCodeExists).with_detail("code", code).into();
    }
    e.into()
}

fn descriptor_conflict(e: sqlx::Error, descriptor: &str) -> ServiceError {
    if is_unique_violation(&e, db::categories::DESCRIPTOR_CONSTRAINT) {
        return AppError::new(ErrorCode::CategoryDescriptorExists)
            .with_detail("descriptor", descriptor)
            .into();
    }
    e.into()
}

// ── Categories ──

pub async fn create_category(
    pool: &PgPool,
    business: &Business,
    data: &CategoryCreate,
) -> ServiceResult<Category> {
    let descriptor = normalize_category_descriptor(&data.descriptor);
    if descriptor.is_empty() {
        return Err(AppError::validation("descriptor must not be blank").into());
    }
    db::categories::create(pool, &business.id, data.name.trim(), &descriptor)
        .await
        .map_err(|e| descriptor_conflict(e, &descriptor))
}

pub async fn update_category(
    pool: &PgPool,
    business: &Business,
    id: &str,
    data: &CategoryUpdate,
) -> ServiceResult<Category> {
    let descriptor = data.descriptor.as_deref().map(normalize_category_descriptor);
    if descriptor.as_deref().is_some_and(str::is_empty) {
        return Err(AppError::validation("descriptor must not be blank").into());
    }
    db::categories::update(
        pool,
        &business.id,
        id,
        data.name.as_deref().map(str::trim),
        descriptor.as_deref(),
    )
    .await
    .map_err(|e| descriptor_conflict(e, descriptor.as_deref().unwrap_or_default()))?
    .ok_or_else(|| category_not_found(id).into())
}

/// Categories that still file live products cannot be deleted.
pub async fn delete_category(pool: &PgPool, business: &Business, id: &str) -> ServiceResult<()> {
    let products = db::categories::product_count(pool, &business.id, id).await?;
    if products > 0 {
        return Err(AppError::new(ErrorCode::CategoryHasProducts)
            .with_detail("id", id)
            .with_detail("products", products)
            .into());
    }
    if !db::categories::soft_delete(pool, &business.id, id).await? {
        return Err(category_not_found(id).into());
    }
    Ok(())
}

// ── Products ──

async fn ensure_category(
    conn: &mut PgConnection,
    business: &Business,
    category_id: &str,
) -> ServiceResult<()> {
    if !db::categories::exists(conn, &business.id, category_id).await? {
        return Err(category_not_found(category_id).into());
    }
    Ok(())
}

/// Insert one variant of `product`, generating its SKU when none is given.
///
/// Each attempt runs in a savepoint so a SKU collision does not abort the
/// surrounding transaction.
async fn insert_variant(
    conn: &mut PgConnection,
    business: &Business,
    product: &Product,
    input: &ProductVariantInput,
) -> ServiceResult<Variant> {
    let code = input.code.trim();
    let name = variant_name(&product.name, code);
    let requested_sku = trim_opt(input.sku.as_deref());

    for attempt in 1..=SKU_ATTEMPTS {
        let sku = requested_sku
            .clone()
            .unwrap_or_else(|| generate_sku(&business.descriptor, &product.name, code));
        let variant = NewVariant {
            product_id: &product.id,
            name: &name,
            code,
            sku: &sku,
            photos: &input.photos,
            cost_price: input.cost_price,
            sale_price: input.sale_price,
            currency: &business.currency,
            stock_quantity: input.stock_quantity,
            stock_quantity_alert: input.stock_quantity_alert,
        };

        let mut savepoint = conn.begin().await?;
        match db::variants::insert(&mut savepoint, &business.id, &variant).await {
            Ok(created) => {
                savepoint.commit().await?;
                return Ok(created);
            }
            Err(e) => {
                savepoint.rollback().await?;
                if requested_sku.is_none() && is_unique_violation(&e, SKU_CONSTRAINT) {
                    tracing::debug!(%sku, attempt, "Generated SKU collided, retrying");
                    continue;
                }
                return Err(variant_conflict(e, &sku, code));
            }
        }
    }

    Err(AppError::with_message(ErrorCode::Conflict, "could not generate a unique sku").into())
}

/// Create a product and all of its variants atomically.
pub async fn create_product(
    pool: &PgPool,
    business: &Business,
    data: &ProductCreate,
) -> ServiceResult<Product> {
    if data.variants.is_empty() {
        return Err(AppError::new(ErrorCode::ProductNoVariants).into());
    }

    let mut tx = pool.begin().await?;
    ensure_category(&mut tx, business, &data.category_id).await?;

    let description = trim_opt(data.description.as_deref());
    let mut product = db::products::insert(
        &mut tx,
        &business.id,
        &NewProduct {
            name: data.name.trim(),
            description: description.as_deref(),
            photos: &data.photos,
            category_id: &data.category_id,
        },
    )
    .await?;

    let mut variants = Vec::with_capacity(data.variants.len());
    for input in &data.variants {
        variants.push(insert_variant(&mut tx, business, &product, input).await?);
    }
    tx.commit().await?;

    tracing::info!(
        business_id = %business.id,
        product_id = %product.id,
        variants = variants.len(),
        "Product created"
    );
    product.variants = Some(variants);
    Ok(product)
}

pub async fn get_product(pool: &PgPool, business: &Business, id: &str) -> ServiceResult<Product> {
    let mut product = db::products::find(pool, &business.id, id)
        .await?
        .ok_or_else(|| product_not_found(id))?;
    product.variants = Some(db::variants::list_for_product(pool, &business.id, id).await?);
    Ok(product)
}

/// Update a product; a rename is propagated to its variants' names.
pub async fn update_product(
    pool: &PgPool,
    business: &Business,
    id: &str,
    data: &ProductUpdate,
) -> ServiceResult<Product> {
    let mut tx = pool.begin().await?;
    if let Some(category_id) = &data.category_id {
        ensure_category(&mut tx, business, category_id).await?;
    }

    let name = data.name.as_deref().map(str::trim);
    let description = data
        .description
        .as_ref()
        .map(|d| d.as_deref().map(str::trim).filter(|s| !s.is_empty()));
    let changes = ProductChanges {
        name,
        description,
        photos: data.photos.as_deref(),
        category_id: data.category_id.as_deref(),
    };
    let mut product = db::products::update(&mut tx, &business.id, id, &changes)
        .await?
        .ok_or_else(|| product_not_found(id))?;

    if let Some(name) = name {
        db::variants::rename_for_product(&mut tx, &business.id, id, name).await?;
    }
    product.variants = Some(db::variants::list_for_product(&mut *tx, &business.id, id).await?);
    tx.commit().await?;
    Ok(product)
}

pub async fn delete_product(pool: &PgPool, business: &Business, id: &str) -> ServiceResult<()> {
    let mut tx = pool.begin().await?;
    if !db::products::soft_delete(&mut tx, &business.id, id).await? {
        return Err(product_not_found(id).into());
    }
    tx.commit().await?;
    tracing::info!(business_id = %business.id, product_id = %id, "Product deleted");
    Ok(())
}

// ── Variants ──

pub async fn add_variant(
    pool: &PgPool,
    business: &Business,
    product_id: &str,
    input: &ProductVariantInput,
) -> ServiceResult<Variant> {
    let mut tx = pool.begin().await?;
    let product = db::products::find(&mut *tx, &business.id, product_id)
        .await?
        .ok_or_else(|| product_not_found(product_id))?;
    let variant = insert_variant(&mut tx, business, &product, input).await?;
    tx.commit().await?;
    Ok(variant)
}

/// Update a variant; a code change renames it after its product.
pub async fn update_variant(
    pool: &PgPool,
    business: &Business,
    id: &str,
    data: &VariantUpdate,
) -> ServiceResult<Variant> {
    let mut tx = pool.begin().await?;
    let current = db::variants::find(&mut *tx, &business.id, id)
        .await?
        .ok_or_else(|| variant_not_found(id))?;

    let code = data.code.as_deref().map(str::trim);
    let name = match code {
        Some(code) if code != current.code => {
            let product = db::products::find(&mut *tx, &business.id, &current.product_id)
                .await?
                .ok_or_else(|| product_not_found(&current.product_id))?;
            Some(variant_name(&product.name, code))
        }
        _ => None,
    };
    let sku = data.sku.as_deref().map(str::trim);

    let changes = VariantChanges {
        name: name.as_deref(),
        code,
        sku,
        photos: data.photos.as_deref(),
        cost_price: data.cost_price,
        sale_price: data.sale_price,
        stock_quantity: data.stock_quantity,
        stock_quantity_alert: data.stock_quantity_alert,
    };
    let variant = db::variants::update(&mut tx, &business.id, id, &changes)
        .await
        .map_err(|e| {
            variant_conflict(
                e,
                sku.unwrap_or(current.sku.as_str()),
                code.unwrap_or(current.code.as_str()),
            )
        })?
        .ok_or_else(|| variant_not_found(id))?;
    tx.commit().await?;
    Ok(variant)
}

/// Delete a variant; a product always keeps at least one.
pub async fn delete_variant(pool: &PgPool, business: &Business, id: &str) -> ServiceResult<()> {
    let mut tx = pool.begin().await?;
    let variant = db::variants::find(&mut *tx, &business.id, id)
        .await?
        .ok_or_else(|| variant_not_found(id))?;
    // Lock the siblings so two concurrent deletes cannot both pass the check
    let siblings: Vec<String> = db::variants::list_for_product(&mut *tx, &business.id, &variant.product_id)
        .await?
        .into_iter()
        .map(|v| v.id)
        .collect();
    let locked = db::variants::lock_many(&mut tx, &business.id, &siblings).await?;
    if locked.len() <= 1 {
        return Err(AppError::new(ErrorCode::VariantIsLast)
            .with_detail("productId", variant.product_id.as_str())
            .into());
    }

    db::variants::soft_delete(&mut tx, &business.id, id).await?;
    tx.commit().await?;
    Ok(())
}

// ── Summary ──

pub async fn summary(pool: &PgPool, business: &Business) -> ServiceResult<InventorySummary> {
    let totals = db::summaries::inventory_totals(pool, &business.id).await?;
    let top = db::summaries::top_products_by_value(pool, &business.id, TOP_PRODUCTS_LIMIT).await?;

    let ids: Vec<String> = top.iter().map(|(id, _)| id.clone()).collect();
    let mut products: HashMap<String, Product> = db::products::find_many(pool, &business.id, &ids)
        .await?
        .into_iter()
        .map(|p| (p.id.clone(), p))
        .collect();
    let top_products = top
        .into_iter()
        .filter_map(|(id, inventory_value)| {
            products.remove(&id).map(|product| TopProduct {
                product,
                inventory_value,
            })
        })
        .collect();

    Ok(InventorySummary {
        products_count: totals.products_count,
        variants_count: totals.variants_count,
        low_stock_variants_count: totals.low_stock_variants_count,
        out_of_stock_variants_count: totals.out_of_stock_variants_count,
        total_stock_units: totals.total_stock_units,
        inventory_value: totals.inventory_value,
        currency: business.currency.clone(),
        top_products_by_inventory_value: top_products,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_errors_carry_id() {
        let err = product_not_found("prod_1");
        assert_eq!(err.code, ErrorCode::ProductNotFound);
        assert_eq!(err.details.unwrap()["id"], "prod_1");
        assert_eq!(variant_not_found("var_1").code, ErrorCode::VariantNotFound);
    }

    #[test]
    fn test_non_constraint_errors_pass_through() {
        let err: AppError = variant_conflict(sqlx::Error::RowNotFound, "SKU", "M").into();
        assert_eq!(err.code, ErrorCode::NotFound);
        let err: AppError = descriptor_conflict(sqlx::Error::RowNotFound, "summer").into();
        assert_eq!(err.code, ErrorCode::NotFound);
    }
}
