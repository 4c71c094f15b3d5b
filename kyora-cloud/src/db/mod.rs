//! Database access layer
//!
//! Every query on business-owned tables takes the `business_id` and filters
//! out soft-deleted rows. Row structs stay private to their module and are
//! converted into the shared DTOs before leaving it.

pub mod accounts;
pub mod addresses;
pub mod assets;
pub mod businesses;
pub mod categories;
pub mod customers;
pub mod expenses;
pub mod investments;
pub mod orders;
pub mod products;
pub mod recurring_expenses;
pub mod refresh_tokens;
pub mod summaries;
pub mod variants;
pub mod withdrawals;

use shared::list::ListRequest;
use shared::models::{StockStatus, TextEnum};
use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};

/// Decode a TEXT column into its enum.
pub(crate) fn enum_col<T: TextEnum>(value: &str) -> Result<T, sqlx::Error> {
    T::parse_db(value).ok_or_else(|| {
        sqlx::Error::Decode(format!("invalid {} value '{value}'", T::NAME).into())
    })
}

pub(crate) fn opt_enum_col<T: TextEnum>(value: Option<&str>) -> Result<Option<T>, sqlx::Error> {
    value.map(enum_col).transpose()
}

/// SQL predicate matching [`StockStatus::classify`] for a variants alias.
pub(crate) fn stock_status_predicate(status: StockStatus, alias: &str) -> String {
    match status {
        StockStatus::OutOfStock => format!("{alias}.stock_quantity <= 0"),
        StockStatus::LowStock => format!(
            "({alias}.stock_quantity > 0 AND {alias}.stock_quantity <= {alias}.stock_quantity_alert)"
        ),
        StockStatus::InStock => format!("{alias}.stock_quantity > {alias}.stock_quantity_alert"),
    }
}

/// Count and fetch one page over the same filtered `FROM ... WHERE ...` clause.
///
/// `filters` appends ` AND ...` conditions (with bound values) and is called
/// once for each query. `prefix` qualifies the `ORDER BY` columns.
pub(crate) async fn paginate<R, F>(
    pool: &PgPool,
    columns: &str,
    from_where: &str,
    prefix: &str,
    request: &ListRequest,
    filters: F,
) -> Result<(Vec<R>, i64), sqlx::Error>
where
    R: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    F: Fn(&mut QueryBuilder<'_, Postgres>),
{
    let mut count = QueryBuilder::<Postgres>::new(format!("SELECT COUNT(*) FROM {from_where}"));
    filters(&mut count);
    let total: i64 = count.build_query_scalar().fetch_one(pool).await?;

    if total == 0 {
        return Ok((Vec::new(), 0));
    }

    let mut page = QueryBuilder::<Postgres>::new(format!("SELECT {columns} FROM {from_where}"));
    filters(&mut page);
    page.push(" ORDER BY ")
        .push(request.order_clause(prefix))
        .push(" LIMIT ")
        .push_bind(request.limit())
        .push(" OFFSET ")
        .push_bind(request.offset());
    let rows = page.build_query_as::<R>().fetch_all(pool).await?;

    Ok((rows, total))
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::ExpenseCategory;

    #[test]
    fn test_enum_col() {
        let category: ExpenseCategory = enum_col("rent").unwrap();
        assert_eq!(category, ExpenseCategory::Rent);
        assert!(enum_col::<ExpenseCategory>("bogus").is_err());
        assert_eq!(opt_enum_col::<ExpenseCategory>(None).unwrap(), None);
    }

    #[test]
    fn test_stock_status_predicate() {
        assert_eq!(
            stock_status_predicate(StockStatus::OutOfStock, "v"),
            "v.stock_quantity <= 0"
        );
        assert!(stock_status_predicate(StockStatus::LowStock, "v").contains("v.stock_quantity_alert"));
    }
}
