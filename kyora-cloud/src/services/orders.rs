//! Orders: creation with stock reservation, status and payment machines

use std::collections::{BTreeMap, HashMap};

use rust_decimal::Decimal;
use shared::error::{AppError, AppResult, ErrorCode};
use shared::models::{
    Business, DiscountType, ORDER_NUMBER_LEN, Order, OrderCreate, OrderItemInput,
    OrderPaymentStatusUpdate, OrderStatus, PaymentMethod, PricedLine, Variant,
    check_order_transition, check_payment_transition, compute_totals, trim_opt,
};
use shared::util::{now_millis, random_base62};
use sqlx::{Connection, PgConnection, PgPool};

use crate::db;
use crate::db::orders::{NewOrder, NewOrderItem, ORDER_NUMBER_CONSTRAINT};
use crate::error::{ServiceResult, is_unique_violation};

/// Attempts at a random order number before giving up
const ORDER_NUMBER_ATTEMPTS: usize = 5;

pub(crate) fn not_found(id: &str) -> AppError {
    AppError::new(ErrorCode::OrderNotFound).with_detail("id", id)
}

/// Total requested quantity per variant, keyed (and so locked) in id order.
fn requested_quantities(items: &[OrderItemInput]) -> BTreeMap<String, i64> {
    let mut requested = BTreeMap::new();
    for item in items {
        *requested.entry(item.variant_id.clone()).or_insert(0) += i64::from(item.quantity);
    }
    requested
}

fn check_stock(variants: &HashMap<String, Variant>, requested: &BTreeMap<String, i64>) -> AppResult<()> {
    for (variant_id, quantity) in requested {
        let variant = variants.get(variant_id).ok_or_else(|| {
            AppError::new(ErrorCode::VariantNotFound).with_detail("id", variant_id.as_str())
        })?;
        if i64::from(variant.stock_quantity) < *quantity {
            return Err(AppError::new(ErrorCode::InsufficientStock)
                .with_detail("variantId", variant_id.as_str())
                .with_detail("requested", *quantity)
                .with_detail("available", variant.stock_quantity));
        }
    }
    Ok(())
}

fn discount_of(
    discount_type: Option<DiscountType>,
    discount_value: Option<Decimal>,
) -> Option<(DiscountType, Decimal)> {
    discount_type.map(|t| (t, discount_value.unwrap_or(Decimal::ZERO)))
}

/// Insert the order under a fresh random number, retrying on collision
/// inside a savepoint.
async fn insert_numbered(
    conn: &mut PgConnection,
    business_id: &str,
    order: &NewOrder<'_>,
) -> ServiceResult<Order> {
    for attempt in 1..=ORDER_NUMBER_ATTEMPTS {
        let number = random_base62(ORDER_NUMBER_LEN);
        let mut savepoint = conn.begin().await?;
        match db::orders::insert(&mut savepoint, business_id, &number, order).await {
            Ok(created) => {
                savepoint.commit().await?;
                return Ok(created);
            }
            Err(e) if is_unique_violation(&e, ORDER_NUMBER_CONSTRAINT) => {
                savepoint.rollback().await?;
                tracing::debug!(%number, attempt, "Order number collided, retrying");
            }
            Err(e) => {
                savepoint.rollback().await?;
                return Err(e.into());
            }
        }
    }
    Err(AppError::new(ErrorCode::OrderNumberGenerationFailed).into())
}

/// Put every item of an order back into stock.
async fn restock(conn: &mut PgConnection, business_id: &str, order_id: &str) -> ServiceResult<()> {
    let items = db::orders::items(&mut *conn, business_id, order_id).await?;
    for item in &items {
        db::variants::adjust_stock(&mut *conn, business_id, &item.variant_id, item.quantity).await?;
    }
    tracing::debug!(%order_id, items = items.len(), "Order restocked");
    Ok(())
}

/// Create an order, reserving stock for its items.
pub async fn create(pool: &PgPool, business: &Business, data: &OrderCreate) -> ServiceResult<Order> {
    if data.items.is_empty() {
        return Err(AppError::new(ErrorCode::OrderEmpty).into());
    }

    let mut tx = pool.begin().await?;
    if !db::customers::exists(&mut *tx, &business.id, &data.customer_id).await? {
        return Err(AppError::new(ErrorCode::CustomerNotFound)
            .with_detail("id", data.customer_id.as_str())
            .into());
    }
    db::addresses::find(&mut *tx, &business.id, &data.customer_id, &data.shipping_address_id)
        .await?
        .ok_or_else(|| {
            AppError::new(ErrorCode::AddressNotFound).with_detail("id", data.shipping_address_id.as_str())
        })?;

    let requested = requested_quantities(&data.items);
    let ids: Vec<String> = requested.keys().cloned().collect();
    let variants: HashMap<String, Variant> = db::variants::lock_many(&mut tx, &business.id, &ids)
        .await?
        .into_iter()
        .map(|v| (v.id.clone(), v))
        .collect();
    check_stock(&variants, &requested)?;

    let mut lines = Vec::with_capacity(data.items.len());
    for item in &data.items {
        let variant = &variants[&item.variant_id];
        lines.push(PricedLine {
            quantity: item.quantity,
            unit_price: item.unit_price,
            unit_cost: item.unit_cost.unwrap_or(variant.cost_price),
        });
    }
    let totals = compute_totals(
        &lines,
        business.vat_rate,
        data.shipping_fee.unwrap_or(Decimal::ZERO),
        discount_of(data.discount_type, data.discount_value),
    )?;

    let channel = data.channel.trim();
    let payment_reference = trim_opt(data.payment_reference.as_deref());
    let note = trim_opt(data.note.as_deref());
    let new_order = NewOrder {
        customer_id: &data.customer_id,
        shipping_address_id: &data.shipping_address_id,
        channel,
        subtotal: totals.subtotal,
        vat: totals.vat,
        vat_rate: business.vat_rate,
        shipping_fee: totals.shipping_fee,
        discount: totals.discount,
        discount_type: data.discount_type,
        discount_value: data.discount_type.and(data.discount_value),
        cogs: totals.cogs,
        total: totals.total,
        currency: &business.currency,
        payment_method: data.payment_method.unwrap_or(PaymentMethod::BankTransfer),
        payment_reference: payment_reference.as_deref(),
        note: note.as_deref(),
        ordered_at: data.ordered_at.unwrap_or_else(now_millis),
    };
    let mut order = insert_numbered(&mut tx, &business.id, &new_order).await?;

    let mut items = Vec::with_capacity(data.items.len());
    for (input, line) in data.items.iter().zip(&totals.lines) {
        let variant = &variants[&input.variant_id];
        let item = db::orders::insert_item(
            &mut tx,
            &business.id,
            &order.id,
            &NewOrderItem {
                product_id: &variant.product_id,
                variant_id: &variant.id,
                quantity: input.quantity,
                unit_price: line.unit_price,
                unit_cost: line.unit_cost,
                total: line.total,
                total_cost: line.total_cost,
                currency: &business.currency,
            },
        )
        .await?;
        if !db::variants::adjust_stock(&mut tx, &business.id, &variant.id, -input.quantity).await? {
            return Err(AppError::new(ErrorCode::InsufficientStock)
                .with_detail("variantId", variant.id.as_str())
                .into());
        }
        items.push(item);
    }
    tx.commit().await?;

    tracing::info!(
        business_id = %business.id,
        order_id = %order.id,
        order_number = %order.order_number,
        total = %order.total,
        items = items.len(),
        "Order created"
    );
    order.items = Some(items);
    Ok(order)
}

pub async fn get(pool: &PgPool, business: &Business, id: &str) -> ServiceResult<Order> {
    let mut order = db::orders::find(pool, &business.id, id)
        .await?
        .ok_or_else(|| not_found(id))?;
    order.items = Some(db::orders::items(pool, &business.id, id).await?);
    Ok(order)
}

/// Move an order along its status machine; cancelling or returning restocks.
pub async fn change_status(
    pool: &PgPool,
    business: &Business,
    id: &str,
    target: OrderStatus,
) -> ServiceResult<Order> {
    let mut tx = pool.begin().await?;
    let current = db::orders::find_for_update(&mut tx, &business.id, id)
        .await?
        .ok_or_else(|| not_found(id))?;
    check_order_transition(current.status, target)?;

    if target.restocks() {
        restock(&mut tx, &business.id, id).await?;
    }
    let mut order = db::orders::set_status(&mut tx, &business.id, id, target).await?;
    order.items = Some(db::orders::items(&mut *tx, &business.id, id).await?);
    tx.commit().await?;

    tracing::info!(
        business_id = %business.id,
        order_id = %id,
        from = %current.status,
        to = %target,
        "Order status changed"
    );
    Ok(order)
}

pub async fn change_payment_status(
    pool: &PgPool,
    business: &Business,
    id: &str,
    data: &OrderPaymentStatusUpdate,
) -> ServiceResult<Order> {
    let mut tx = pool.begin().await?;
    let current = db::orders::find_for_update(&mut tx, &business.id, id)
        .await?
        .ok_or_else(|| not_found(id))?;
    check_payment_transition(current.status, current.payment_status, data.payment_status)?;

    let reference = trim_opt(data.payment_reference.as_deref());
    let mut order = db::orders::set_payment_status(
        &mut tx,
        &business.id,
        id,
        data.payment_status,
        data.payment_method,
        reference.as_deref(),
    )
    .await?;
    order.items = Some(db::orders::items(&mut *tx, &business.id, id).await?);
    tx.commit().await?;

    tracing::info!(
        business_id = %business.id,
        order_id = %id,
        from = %current.payment_status,
        to = %data.payment_status,
        "Order payment status changed"
    );
    Ok(order)
}

/// Delete a pending or cancelled order. Pending orders give their stock back;
/// cancelled ones already did.
pub async fn delete(pool: &PgPool, business: &Business, id: &str) -> ServiceResult<()> {
    let mut tx = pool.begin().await?;
    let order = db::orders::find_for_update(&mut tx, &business.id, id)
        .await?
        .ok_or_else(|| not_found(id))?;
    if !order.status.is_deletable() {
        return Err(AppError::new(ErrorCode::OrderCannotBeDeleted)
            .with_detail("id", id)
            .with_detail("status", order.status.as_db())
            .into());
    }

    if order.status == OrderStatus::Pending {
        restock(&mut tx, &business.id, id).await?;
    }
    db::orders::soft_delete(&mut tx, &business.id, id).await?;
    tx.commit().await?;

    tracing::info!(business_id = %business.id, order_id = %id, "Order deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::StockStatus;

    fn item(variant_id: &str, quantity: i32) -> OrderItemInput {
        OrderItemInput {
            variant_id: variant_id.into(),
            quantity,
            unit_price: Decimal::TEN,
            unit_cost: None,
        }
    }

    fn variant(id: &str, stock: i32) -> Variant {
        Variant {
            id: id.into(),
            business_id: "bus_1".into(),
            product_id: "prod_1".into(),
            name: "Hoodie - M".into(),
            code: "M".into(),
            sku: "ACM-HOO-MXX-0001".into(),
            photos: vec![],
            cost_price: Decimal::ONE,
            sale_price: Decimal::TEN,
            currency: "USD".into(),
            stock_quantity: stock,
            stock_quantity_alert: 0,
            stock_status: StockStatus::classify(stock, 0),
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn test_requested_quantities_merge_duplicate_variants() {
        let requested = requested_quantities(&[item("var_b", 2), item("var_a", 1), item("var_b", 3)]);
        let entries: Vec<_> = requested.into_iter().collect();
        assert_eq!(entries, vec![("var_a".to_string(), 1), ("var_b".to_string(), 5)]);
    }

    #[test]
    fn test_check_stock() {
        let variants: HashMap<String, Variant> =
            [("var_a".to_string(), variant("var_a", 4))].into_iter().collect();

        let ok = requested_quantities(&[item("var_a", 4)]);
        assert!(check_stock(&variants, &ok).is_ok());

        let short = requested_quantities(&[item("var_a", 3), item("var_a", 2)]);
        let err = check_stock(&variants, &short).unwrap_err();
        assert_eq!(err.code, ErrorCode::InsufficientStock);
        let details = err.details.unwrap();
        assert_eq!(details["requested"], 5);
        assert_eq!(details["available"], 4);

        let missing = requested_quantities(&[item("var_x", 1)]);
        assert_eq!(check_stock(&variants, &missing).unwrap_err().code, ErrorCode::VariantNotFound);
    }

    #[test]
    fn test_discount_requires_type() {
        assert_eq!(discount_of(None, Some(Decimal::TEN)), None);
        assert_eq!(
            discount_of(Some(DiscountType::Percent), None),
            Some((DiscountType::Percent, Decimal::ZERO))
        );
    }
}
