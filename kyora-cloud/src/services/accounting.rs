//! Accounting: expenses, capital movements and the summary

use chrono::{Days, NaiveDate};
use rust_decimal::Decimal;
use shared::error::{AppError, AppResult, ErrorCode};
use shared::models::{
    AccountingSummary, Business, DateRangeQuery, Expense, ExpenseCreate, ExpenseType,
    ExpenseUpdate, Investment, InvestmentCreate, InvestmentUpdate, Withdrawal, WithdrawalCreate,
    WithdrawalUpdate, safe_to_draw, trim_opt,
};
use shared::util::today_utc;
use sqlx::PgPool;

use crate::db;
use crate::db::expenses::NewExpense;
use crate::db::summaries::DateRange;
use crate::error::ServiceResult;

/// Days of expenses kept aside when the business sets no safety buffer
const FALLBACK_BUFFER_DAYS: u64 = 30;

pub(crate) fn expense_not_found(id: &str) -> AppError {
    AppError::new(ErrorCode::ExpenseNotFound).with_detail("id", id)
}

fn check_positive(field: &'static str, amount: Decimal) -> AppResult<()> {
    if amount <= Decimal::ZERO {
        return Err(AppError::with_message(
            ErrorCode::InvalidAmount,
            format!("{field} must be greater than zero"),
        )
        .with_detail("field", field));
    }
    Ok(())
}

/// `[to - 29 days, to]`: the window whose expenses stand in for a missing
/// safety buffer.
fn fallback_buffer_window(to: NaiveDate) -> NaiveDate {
    to.checked_sub_days(Days::new(FALLBACK_BUFFER_DAYS - 1)).unwrap_or(NaiveDate::MIN)
}

async fn ensure_recurring(pool: &PgPool, business: &Business, id: &str) -> ServiceResult<()> {
    if db::recurring_expenses::find(pool, &business.id, id).await?.is_none() {
        return Err(super::recurring::not_found(id).into());
    }
    Ok(())
}

/// Investors and withdrawers must be users of the business's workspace.
async fn ensure_member(pool: &PgPool, business: &Business, user_id: &str) -> ServiceResult<()> {
    if !db::accounts::is_workspace_member(pool, &business.workspace_id, user_id).await? {
        return Err(AppError::new(ErrorCode::UserNotFound)
            .with_detail("id", user_id)
            .into());
    }
    Ok(())
}

// ── Expenses ──

pub async fn create_expense(
    pool: &PgPool,
    business: &Business,
    data: &ExpenseCreate,
) -> ServiceResult<Expense> {
    check_positive("amount", data.amount)?;
    let recurring_id = trim_opt(data.recurring_expense_id.as_deref());
    if let Some(id) = &recurring_id {
        ensure_recurring(pool, business, id).await?;
    }

    let note = trim_opt(data.note.as_deref());
    let expense = NewExpense {
        recurring_expense_id: recurring_id.as_deref(),
        amount: data.amount,
        currency: &business.currency,
        category: data.category,
        expense_type: data.expense_type.unwrap_or(ExpenseType::OneTime),
        occurred_on: data.occurred_on.unwrap_or_else(today_utc),
        note: note.as_deref(),
    };
    Ok(db::expenses::insert(pool, &business.id, &expense).await?)
}

pub async fn update_expense(
    pool: &PgPool,
    business: &Business,
    id: &str,
    data: &ExpenseUpdate,
) -> ServiceResult<Expense> {
    if let Some(amount) = data.amount {
        check_positive("amount", amount)?;
    }
    if let Some(Some(recurring_id)) = &data.recurring_expense_id {
        ensure_recurring(pool, business, recurring_id).await?;
    }
    db::expenses::update(pool, &business.id, id, data)
        .await?
        .ok_or_else(|| expense_not_found(id).into())
}

// ── Investments & withdrawals ──

pub async fn create_investment(
    pool: &PgPool,
    business: &Business,
    data: &InvestmentCreate,
) -> ServiceResult<Investment> {
    check_positive("amount", data.amount)?;
    ensure_member(pool, business, &data.investor_id).await?;
    Ok(db::investments::create(pool, &business.id, &business.currency, data).await?)
}

pub async fn update_investment(
    pool: &PgPool,
    business: &Business,
    id: &str,
    data: &InvestmentUpdate,
) -> ServiceResult<Investment> {
    if let Some(amount) = data.amount {
        check_positive("amount", amount)?;
    }
    if let Some(investor_id) = &data.investor_id {
        ensure_member(pool, business, investor_id).await?;
    }
    db::investments::update(pool, &business.id, id, data)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::InvestmentNotFound).with_detail("id", id).into())
}

pub async fn create_withdrawal(
    pool: &PgPool,
    business: &Business,
    data: &WithdrawalCreate,
) -> ServiceResult<Withdrawal> {
    check_positive("amount", data.amount)?;
    ensure_member(pool, business, &data.withdrawer_id).await?;
    Ok(db::withdrawals::create(pool, &business.id, &business.currency, data).await?)
}

pub async fn update_withdrawal(
    pool: &PgPool,
    business: &Business,
    id: &str,
    data: &WithdrawalUpdate,
) -> ServiceResult<Withdrawal> {
    if let Some(amount) = data.amount {
        check_positive("amount", amount)?;
    }
    if let Some(withdrawer_id) = &data.withdrawer_id {
        ensure_member(pool, business, withdrawer_id).await?;
    }
    db::withdrawals::update(pool, &business.id, id, data)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::WithdrawalNotFound).with_detail("id", id).into())
}

// ── Summary ──

pub async fn summary(
    pool: &PgPool,
    business: &Business,
    query: DateRangeQuery,
) -> ServiceResult<AccountingSummary> {
    if !query.is_valid() {
        return Err(AppError::validation("from must not be after to")
            .with_detail("field", "from")
            .into());
    }
    let range = DateRange {
        from: query.from,
        to: query.to,
    };

    let totals = db::summaries::accounting_totals(pool, &business.id, range).await?;
    let by_category = db::summaries::expenses_by_category(pool, &business.id, range).await?;

    let buffer = if business.safety_buffer.is_zero() {
        let to = query.to.unwrap_or_else(today_utc);
        db::summaries::expenses_between(pool, &business.id, fallback_buffer_window(to), to).await?
    } else {
        business.safety_buffer
    };

    Ok(AccountingSummary {
        safe_to_draw_amount: safe_to_draw(
            totals.revenue,
            totals.cogs,
            totals.total_expenses,
            totals.total_withdrawals,
            buffer,
        ),
        total_asset_value: totals.total_asset_value,
        total_investments: totals.total_investments,
        total_withdrawals: totals.total_withdrawals,
        total_expenses: totals.total_expenses,
        expenses_by_category: by_category,
        revenue: totals.revenue,
        cogs: totals.cogs,
        currency: business.currency.clone(),
        from: query.from,
        to: query.to,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_positive() {
        let err = check_positive("amount", Decimal::ZERO).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidAmount);
        assert_eq!(err.message, "amount must be greater than zero");
        assert!(check_positive("amount", Decimal::new(-5, 0)).is_err());
        assert!(check_positive("amount", Decimal::new(1, 2)).is_ok());
    }

    #[test]
    fn test_fallback_window_spans_thirty_days() {
        let to = NaiveDate::from_ymd_opt(2024, 3, 30).unwrap();
        let from = fallback_buffer_window(to);
        assert_eq!(from, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        assert_eq!((to - from).num_days() + 1, 30);
    }
}
