//! Orders and order items

use rust_decimal::Decimal;
use shared::list::ListRequest;
use shared::models::{
    DiscountType, Order, OrderFilter, OrderItem, OrderStatus, PaymentMethod, PaymentStatus,
};
use shared::util::{now_millis, prefixed_id};
use sqlx::{PgConnection, PgExecutor, PgPool};

use super::{enum_col, opt_enum_col, paginate};

pub const ORDER_NUMBER_CONSTRAINT: &str = "orders_number_key";

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: String,
    business_id: String,
    order_number: String,
    customer_id: String,
    shipping_address_id: String,
    channel: String,
    subtotal: Decimal,
    vat: Decimal,
    vat_rate: Decimal,
    shipping_fee: Decimal,
    discount: Decimal,
    discount_type: Option<String>,
    discount_value: Option<Decimal>,
    cogs: Decimal,
    total: Decimal,
    currency: String,
    status: String,
    payment_status: String,
    payment_method: String,
    payment_reference: Option<String>,
    note: Option<String>,
    ordered_at: i64,
    placed_at: Option<i64>,
    ready_for_shipment_at: Option<i64>,
    shipped_at: Option<i64>,
    fulfilled_at: Option<i64>,
    cancelled_at: Option<i64>,
    returned_at: Option<i64>,
    paid_at: Option<i64>,
    failed_at: Option<i64>,
    refunded_at: Option<i64>,
    created_at: i64,
    updated_at: i64,
}

impl TryFrom<OrderRow> for Order {
    type Error = sqlx::Error;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        Ok(Order {
            discount_type: opt_enum_col(row.discount_type.as_deref())?,
            status: enum_col(&row.status)?,
            payment_status: enum_col(&row.payment_status)?,
            payment_method: enum_col(&row.payment_method)?,
            id: row.id,
            business_id: row.business_id,
            order_number: row.order_number,
            customer_id: row.customer_id,
            shipping_address_id: row.shipping_address_id,
            channel: row.channel,
            subtotal: row.subtotal,
            vat: row.vat,
            vat_rate: row.vat_rate,
            shipping_fee: row.shipping_fee,
            discount: row.discount,
            discount_value: row.discount_value,
            cogs: row.cogs,
            total: row.total,
            currency: row.currency,
            payment_reference: row.payment_reference,
            note: row.note,
            ordered_at: row.ordered_at,
            placed_at: row.placed_at,
            ready_for_shipment_at: row.ready_for_shipment_at,
            shipped_at: row.shipped_at,
            fulfilled_at: row.fulfilled_at,
            cancelled_at: row.cancelled_at,
            returned_at: row.returned_at,
            paid_at: row.paid_at,
            failed_at: row.failed_at,
            refunded_at: row.refunded_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
            items: None,
        })
    }
}

const COLUMNS: &str = "id, business_id, order_number, customer_id, shipping_address_id, channel, \
    subtotal, vat, vat_rate, shipping_fee, discount, discount_type, discount_value, cogs, total, \
    currency, status, payment_status, payment_method, payment_reference, note, ordered_at, \
    placed_at, ready_for_shipment_at, shipped_at, fulfilled_at, cancelled_at, returned_at, \
    paid_at, failed_at, refunded_at, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct OrderItemRow {
    id: String,
    order_id: String,
    product_id: String,
    variant_id: String,
    quantity: i32,
    unit_price: Decimal,
    unit_cost: Decimal,
    total: Decimal,
    total_cost: Decimal,
    currency: String,
}

impl From<OrderItemRow> for OrderItem {
    fn from(row: OrderItemRow) -> Self {
        OrderItem {
            id: row.id,
            order_id: row.order_id,
            product_id: row.product_id,
            variant_id: row.variant_id,
            quantity: row.quantity,
            unit_price: row.unit_price,
            unit_cost: row.unit_cost,
            total: row.total,
            total_cost: row.total_cost,
            currency: row.currency,
        }
    }
}

pub async fn list(
    pool: &PgPool,
    business_id: &str,
    filter: &OrderFilter,
    request: &ListRequest,
) -> Result<(Vec<Order>, i64), sqlx::Error> {
    let search = request.search_pattern();
    let (rows, total) = paginate::<OrderRow, _>(
        pool,
        COLUMNS,
        "orders WHERE deleted_at IS NULL",
        "",
        request,
        |qb| {
            qb.push(" AND business_id = ").push_bind(business_id.to_string());
            if let Some(status) = filter.status {
                qb.push(" AND status = ").push_bind(status.as_db());
            }
            if let Some(payment_status) = filter.payment_status {
                qb.push(" AND payment_status = ").push_bind(payment_status.as_db());
            }
            if let Some(customer_id) = &filter.customer_id {
                qb.push(" AND customer_id = ").push_bind(customer_id.clone());
            }
            if let Some(from) = filter.from {
                qb.push(" AND ordered_at >= ").push_bind(from);
            }
            if let Some(to) = filter.to {
                qb.push(" AND ordered_at <= ").push_bind(to);
            }
            if let Some(pattern) = &search {
                qb.push(" AND order_number ILIKE ").push_bind(pattern.clone());
            }
        },
    )
    .await?;
    let orders = rows.into_iter().map(Order::try_from).collect::<Result<_, _>>()?;
    Ok((orders, total))
}

pub async fn find(
    db: impl PgExecutor<'_>,
    business_id: &str,
    id: &str,
) -> Result<Option<Order>, sqlx::Error> {
    let row: Option<OrderRow> = sqlx::query_as(&format!(
        "SELECT {COLUMNS} FROM orders WHERE business_id = $1 AND id = $2 AND deleted_at IS NULL"
    ))
    .bind(business_id)
    .bind(id)
    .fetch_optional(db)
    .await?;
    row.map(Order::try_from).transpose()
}

pub async fn find_for_update(
    conn: &mut PgConnection,
    business_id: &str,
    id: &str,
) -> Result<Option<Order>, sqlx::Error> {
    let row: Option<OrderRow> = sqlx::query_as(&format!(
        "SELECT {COLUMNS} FROM orders
         WHERE business_id = $1 AND id = $2 AND deleted_at IS NULL
         FOR UPDATE"
    ))
    .bind(business_id)
    .bind(id)
    .fetch_optional(conn)
    .await?;
    row.map(Order::try_from).transpose()
}

pub async fn items(
    db: impl PgExecutor<'_>,
    business_id: &str,
    order_id: &str,
) -> Result<Vec<OrderItem>, sqlx::Error> {
    let rows: Vec<OrderItemRow> = sqlx::query_as(
        "SELECT id, order_id, product_id, variant_id, quantity, unit_price, unit_cost, total,
                total_cost, currency
         FROM order_items WHERE business_id = $1 AND order_id = $2
         ORDER BY created_at ASC, id ASC",
    )
    .bind(business_id)
    .bind(order_id)
    .fetch_all(db)
    .await?;
    Ok(rows.into_iter().map(Into::into).collect())
}

pub struct NewOrder<'a> {
    pub customer_id: &'a str,
    pub shipping_address_id: &'a str,
    pub channel: &'a str,
    pub subtotal: Decimal,
    pub vat: Decimal,
    pub vat_rate: Decimal,
    pub shipping_fee: Decimal,
    pub discount: Decimal,
    pub discount_type: Option<DiscountType>,
    pub discount_value: Option<Decimal>,
    pub cogs: Decimal,
    pub total: Decimal,
    pub currency: &'a str,
    pub payment_method: PaymentMethod,
    pub payment_reference: Option<&'a str>,
    pub note: Option<&'a str>,
    pub ordered_at: i64,
}

pub async fn insert(
    conn: &mut PgConnection,
    business_id: &str,
    order_number: &str,
    order: &NewOrder<'_>,
) -> Result<Order, sqlx::Error> {
    let row: OrderRow = sqlx::query_as(&format!(
        "INSERT INTO orders (id, business_id, order_number, customer_id, shipping_address_id, channel,
            subtotal, vat, vat_rate, shipping_fee, discount, discount_type, discount_value, cogs,
            total, currency, status, payment_status, payment_method, payment_reference, note,
            ordered_at, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18,
            $19, $20, $21, $22, $23, $23)
         RETURNING {COLUMNS}"
    ))
    .bind(prefixed_id("ord"))
    .bind(business_id)
    .bind(order_number)
    .bind(order.customer_id)
    .bind(order.shipping_address_id)
    .bind(order.channel)
    .bind(order.subtotal)
    .bind(order.vat)
    .bind(order.vat_rate)
    .bind(order.shipping_fee)
    .bind(order.discount)
    .bind(order.discount_type.map(|t| t.as_db()))
    .bind(order.discount_value)
    .bind(order.cogs)
    .bind(order.total)
    .bind(order.currency)
    .bind(OrderStatus::Pending.as_db())
    .bind(PaymentStatus::Pending.as_db())
    .bind(order.payment_method.as_db())
    .bind(order.payment_reference)
    .bind(order.note)
    .bind(order.ordered_at)
    .bind(now_millis())
    .fetch_one(conn)
    .await?;
    row.try_into()
}

pub struct NewOrderItem<'a> {
    pub product_id: &'a str,
    pub variant_id: &'a str,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub unit_cost: Decimal,
    pub total: Decimal,
    pub total_cost: Decimal,
    pub currency: &'a str,
}

pub async fn insert_item(
    conn: &mut PgConnection,
    business_id: &str,
    order_id: &str,
    item: &NewOrderItem<'_>,
) -> Result<OrderItem, sqlx::Error> {
    let row: OrderItemRow = sqlx::query_as(
        "INSERT INTO order_items (id, business_id, order_id, product_id, variant_id, quantity,
            unit_price, unit_cost, total, total_cost, currency, created_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
         RETURNING id, order_id, product_id, variant_id, quantity, unit_price, unit_cost, total,
            total_cost, currency",
    )
    .bind(prefixed_id("oitm"))
    .bind(business_id)
    .bind(order_id)
    .bind(item.product_id)
    .bind(item.variant_id)
    .bind(item.quantity)
    .bind(item.unit_price)
    .bind(item.unit_cost)
    .bind(item.total)
    .bind(item.total_cost)
    .bind(item.currency)
    .bind(now_millis())
    .fetch_one(conn)
    .await?;
    Ok(row.into())
}

/// Move the order to `status` and stamp the status's timestamp column
pub async fn set_status(
    conn: &mut PgConnection,
    business_id: &str,
    id: &str,
    status: OrderStatus,
) -> Result<Order, sqlx::Error> {
    let now = now_millis();
    // Column names come from a closed enum, never from input
    let stamp = status
        .timestamp_column()
        .map(|col| format!(", {col} = $4"))
        .unwrap_or_default();
    let row: OrderRow = sqlx::query_as(&format!(
        "UPDATE orders SET status = $3, updated_at = $4{stamp}
         WHERE business_id = $1 AND id = $2 AND deleted_at IS NULL
         RETURNING {COLUMNS}"
    ))
    .bind(business_id)
    .bind(id)
    .bind(status.as_db())
    .bind(now)
    .fetch_one(conn)
    .await?;
    row.try_into()
}

pub async fn set_payment_status(
    conn: &mut PgConnection,
    business_id: &str,
    id: &str,
    payment_status: PaymentStatus,
    payment_method: Option<PaymentMethod>,
    payment_reference: Option<&str>,
) -> Result<Order, sqlx::Error> {
    let now = now_millis();
    let stamp = payment_status
        .timestamp_column()
        .map(|col| format!(", {col} = $4"))
        .unwrap_or_default();
    let row: OrderRow = sqlx::query_as(&format!(
        "UPDATE orders SET payment_status = $3, updated_at = $4,
            payment_method = COALESCE($5, payment_method),
            payment_reference = COALESCE($6, payment_reference){stamp}
         WHERE business_id = $1 AND id = $2 AND deleted_at IS NULL
         RETURNING {COLUMNS}"
    ))
    .bind(business_id)
    .bind(id)
    .bind(payment_status.as_db())
    .bind(now)
    .bind(payment_method.map(|m| m.as_db()))
    .bind(payment_reference)
    .fetch_one(conn)
    .await?;
    row.try_into()
}

pub async fn soft_delete(
    conn: &mut PgConnection,
    business_id: &str,
    id: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE orders SET deleted_at = $3, updated_at = $3
         WHERE business_id = $1 AND id = $2 AND deleted_at IS NULL",
    )
    .bind(business_id)
    .bind(id)
    .bind(now_millis())
    .execute(conn)
    .await?;
    Ok(result.rows_affected() > 0)
}
