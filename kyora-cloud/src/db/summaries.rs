//! Aggregates behind the inventory and accounting summaries

use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use shared::models::{CategoryTotal, OrderStatus};
use sqlx::PgPool;

use super::enum_col;

#[derive(Debug, Default, sqlx::FromRow)]
pub struct InventoryTotals {
    pub products_count: i64,
    pub variants_count: i64,
    pub low_stock_variants_count: i64,
    pub out_of_stock_variants_count: i64,
    pub total_stock_units: i64,
    pub inventory_value: Decimal,
}

pub async fn inventory_totals(pool: &PgPool, business_id: &str) -> Result<InventoryTotals, sqlx::Error> {
    sqlx::query_as(
        "SELECT
            (SELECT COUNT(*) FROM products
             WHERE business_id = $1 AND deleted_at IS NULL) AS products_count,
            COUNT(*) AS variants_count,
            COUNT(*) FILTER (WHERE stock_quantity > 0 AND stock_quantity <= stock_quantity_alert)
                AS low_stock_variants_count,
            COUNT(*) FILTER (WHERE stock_quantity <= 0) AS out_of_stock_variants_count,
            COALESCE(SUM(stock_quantity), 0)::BIGINT AS total_stock_units,
            COALESCE(SUM(cost_price * stock_quantity), 0) AS inventory_value
         FROM variants
         WHERE business_id = $1 AND deleted_at IS NULL",
    )
    .bind(business_id)
    .fetch_one(pool)
    .await
}

/// `(product_id, Σ cost × qty)` for the most valuable products
pub async fn top_products_by_value(
    pool: &PgPool,
    business_id: &str,
    limit: i64,
) -> Result<Vec<(String, Decimal)>, sqlx::Error> {
    sqlx::query_as(
        "SELECT v.product_id, COALESCE(SUM(v.cost_price * v.stock_quantity), 0) AS value
         FROM variants v
         JOIN products p ON p.id = v.product_id AND p.deleted_at IS NULL
         WHERE v.business_id = $1 AND v.deleted_at IS NULL
         GROUP BY v.product_id
         ORDER BY value DESC, v.product_id ASC
         LIMIT $2",
    )
    .bind(business_id)
    .bind(limit)
    .fetch_all(pool)
    .await
}

/// Inclusive calendar range; either bound may be open
#[derive(Debug, Clone, Copy, Default)]
pub struct DateRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateRange {
    /// Epoch-millisecond bounds `[from 00:00, to+1 00:00)` for timestamp columns
    fn millis(&self) -> (Option<i64>, Option<i64>) {
        let start = |d: NaiveDate| d.and_time(NaiveTime::MIN).and_utc().timestamp_millis();
        (
            self.from.map(start),
            self.to.and_then(|d| d.succ_opt()).map(start),
        )
    }
}

#[derive(Debug, Default, sqlx::FromRow)]
pub struct AccountingTotals {
    pub total_asset_value: Decimal,
    pub total_investments: Decimal,
    pub total_withdrawals: Decimal,
    pub total_expenses: Decimal,
    pub revenue: Decimal,
    pub cogs: Decimal,
}

/// Money totals of a business over `range`.
///
/// Assets count when purchased on or before `to`. Orders that are cancelled
/// or returned never count towards revenue.
pub async fn accounting_totals(
    pool: &PgPool,
    business_id: &str,
    range: DateRange,
) -> Result<AccountingTotals, sqlx::Error> {
    let (from_ms, until_ms) = range.millis();
    let excluded: Vec<&str> = OrderStatus::ALL
        .iter()
        .filter(|s| !s.counts_as_revenue())
        .map(|s| s.as_db())
        .collect();

    sqlx::query_as(
        "SELECT
            (SELECT COALESCE(SUM(value), 0) FROM assets
             WHERE business_id = $1 AND deleted_at IS NULL
               AND ($3::DATE IS NULL OR purchased_at <= $3)) AS total_asset_value,
            (SELECT COALESCE(SUM(amount), 0) FROM investments
             WHERE business_id = $1 AND deleted_at IS NULL
               AND ($2::DATE IS NULL OR invested_at >= $2)
               AND ($3::DATE IS NULL OR invested_at <= $3)) AS total_investments,
            (SELECT COALESCE(SUM(amount), 0) FROM withdrawals
             WHERE business_id = $1 AND deleted_at IS NULL
               AND ($2::DATE IS NULL OR withdrawn_at >= $2)
               AND ($3::DATE IS NULL OR withdrawn_at <= $3)) AS total_withdrawals,
            (SELECT COALESCE(SUM(amount), 0) FROM expenses
             WHERE business_id = $1 AND deleted_at IS NULL
               AND ($2::DATE IS NULL OR occurred_on >= $2)
               AND ($3::DATE IS NULL OR occurred_on <= $3)) AS total_expenses,
            COALESCE(SUM(o.total), 0) AS revenue,
            COALESCE(SUM(o.cogs), 0) AS cogs
         FROM orders o
         WHERE o.business_id = $1 AND o.deleted_at IS NULL
           AND o.status <> ALL($6)
           AND ($4::BIGINT IS NULL OR o.ordered_at >= $4)
           AND ($5::BIGINT IS NULL OR o.ordered_at < $5)",
    )
    .bind(business_id)
    .bind(range.from)
    .bind(range.to)
    .bind(from_ms)
    .bind(until_ms)
    .bind(excluded)
    .fetch_one(pool)
    .await
}

pub async fn expenses_by_category(
    pool: &PgPool,
    business_id: &str,
    range: DateRange,
) -> Result<Vec<CategoryTotal>, sqlx::Error> {
    let rows: Vec<(String, Decimal)> = sqlx::query_as(
        "SELECT category, SUM(amount) AS total FROM expenses
         WHERE business_id = $1 AND deleted_at IS NULL
           AND ($2::DATE IS NULL OR occurred_on >= $2)
           AND ($3::DATE IS NULL OR occurred_on <= $3)
         GROUP BY category
         ORDER BY total DESC, category ASC",
    )
    .bind(business_id)
    .bind(range.from)
    .bind(range.to)
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|(category, total)| {
            Ok(CategoryTotal {
                category: enum_col(&category)?,
                total,
            })
        })
        .collect()
}

/// Sum of expenses in `[from, to]`, used as the fallback safety buffer
pub async fn expenses_between(
    pool: &PgPool,
    business_id: &str,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Decimal, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT COALESCE(SUM(amount), 0) FROM expenses
         WHERE business_id = $1 AND deleted_at IS NULL AND occurred_on BETWEEN $2 AND $3",
    )
    .bind(business_id)
    .bind(from)
    .bind(to)
    .fetch_one(pool)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_millis_cover_whole_days() {
        let d = |s: &str| NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap();
        let range = DateRange {
            from: Some(d("2024-03-01")),
            to: Some(d("2024-03-01")),
        };
        let (from, until) = range.millis();
        assert_eq!(from, Some(1_709_251_200_000));
        assert_eq!(until, Some(1_709_251_200_000 + 86_400_000));
        assert_eq!(DateRange::default().millis(), (None, None));
    }
}
