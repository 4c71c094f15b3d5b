//! Recurring expenses: template lifecycle and the daily materialisation job
//!
//! A template's `next_recurring_date` is the cursor of the next occurrence
//! to materialise. Occurrences are anchored on the start date (see
//! [`shared::recurrence`]) and each one becomes a `recurring` expense. The
//! job and the create-time backfill both check for an existing expense and
//! insert with `ON CONFLICT DO NOTHING`, so a (template, date) pair is never
//! materialised twice.

use chrono::{Months, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;
use shared::error::{AppError, AppResult, ErrorCode};
use shared::models::{
    Business, ExpenseType, RecurringExpense, RecurringExpenseCreate, RecurringExpenseStatus,
    RecurringExpenseUpdate,
};
use shared::recurrence;
use shared::util::today_utc;
use sqlx::{PgConnection, PgPool};

use crate::db;
use crate::db::expenses::NewExpense;
use crate::db::recurring_expenses::NewRecurringExpense;
use crate::error::ServiceResult;

/// Outcome of one job run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecurringReport {
    pub processed: u32,
    pub created: u32,
    pub ended: u32,
}

fn check_amount(amount: Decimal) -> AppResult<()> {
    if amount <= Decimal::ZERO {
        return Err(AppError::with_message(
            ErrorCode::RecurringExpenseInvalidAmount,
            "recurring expense amount must be greater than zero",
        ));
    }
    Ok(())
}

fn check_dates(start: NaiveDate, end: Option<NaiveDate>) -> AppResult<()> {
    match end {
        Some(end) if end < start => Err(AppError::new(ErrorCode::RecurringExpenseInvalidDates)
            .with_detail("recurringStartDate", start.to_string())
            .with_detail("recurringEndDate", end.to_string())),
        _ => Ok(()),
    }
}

/// Oldest start date accepted, in years before today. Bounds the backfill.
const MAX_START_AGE_YEARS: u32 = 10;

fn check_start(start: NaiveDate, today: NaiveDate) -> AppResult<()> {
    let earliest = today
        .checked_sub_months(Months::new(12 * MAX_START_AGE_YEARS))
        .unwrap_or(NaiveDate::MIN);
    if start < earliest {
        return Err(AppError::new(ErrorCode::RecurringExpenseInvalidDates)
            .with_detail("recurringStartDate", start.to_string())
            .with_detail("earliest", earliest.to_string()));
    }
    Ok(())
}

pub(crate) fn not_found(id: &str) -> AppError {
    AppError::new(ErrorCode::RecurringExpenseNotFound).with_detail("id", id)
}

/// Point an active template at its first occurrence on or after `today`,
/// ending it when the schedule has nothing left.
fn reschedule(template: &mut RecurringExpense, today: NaiveDate) {
    template.next_recurring_date = recurrence::initial_cursor(
        template.frequency,
        template.recurring_start_date,
        template.recurring_end_date,
        today,
    );
    if template.next_recurring_date.is_none() {
        template.status = RecurringExpenseStatus::Ended;
    }
}

/// Apply a partial update. Frequency and start date changes re-initialise
/// the cursor of an active template; an end date change only bounds it.
fn apply_update(
    template: &mut RecurringExpense,
    data: &RecurringExpenseUpdate,
    today: NaiveDate,
) -> AppResult<()> {
    if let Some(amount) = data.amount {
        check_amount(amount)?;
        template.amount = amount;
    }
    if let Some(category) = data.category {
        template.category = category;
    }
    if let Some(note) = &data.note {
        template.note = shared::models::trim_opt(note.as_deref());
    }

    let mut schedule_changed = false;
    if let Some(frequency) = data.frequency {
        schedule_changed |= frequency != template.frequency;
        template.frequency = frequency;
    }
    if let Some(start) = data.recurring_start_date {
        if start != template.recurring_start_date {
            check_start(start, today)?;
        }
        schedule_changed |= start != template.recurring_start_date;
        template.recurring_start_date = start;
    }
    let mut end_changed = false;
    if let Some(end) = data.recurring_end_date {
        end_changed = end != template.recurring_end_date;
        template.recurring_end_date = end;
    }
    check_dates(template.recurring_start_date, template.recurring_end_date)?;

    if template.status != RecurringExpenseStatus::Active {
        return Ok(());
    }
    if schedule_changed {
        reschedule(template, today);
    } else if end_changed {
        clamp_to_end(template);
    }
    Ok(())
}

/// Re-check the cursor against a new end date. Occurrences still owed
/// before the end stay due for the job.
fn clamp_to_end(template: &mut RecurringExpense) {
    let past_end = match (template.next_recurring_date, template.recurring_end_date) {
        (Some(next), Some(end)) => next > end,
        _ => false,
    };
    if past_end {
        template.next_recurring_date = None;
        template.status = RecurringExpenseStatus::Ended;
    }
}

/// Move a template to `target`.
///
/// Resuming starts again from the first occurrence on or after `today`; the
/// paused period is not caught up. Terminal states drop the cursor.
fn apply_status(
    template: &mut RecurringExpense,
    target: RecurringExpenseStatus,
    today: NaiveDate,
) -> AppResult<()> {
    if !template.status.can_transition_to(target) {
        return Err(AppError::new(ErrorCode::RecurringExpenseInvalidStatusTransition)
            .with_detail("from", template.status.as_db())
            .with_detail("to", target.as_db()));
    }
    template.status = target;
    match target {
        RecurringExpenseStatus::Active => reschedule(template, today),
        RecurringExpenseStatus::Paused => {}
        RecurringExpenseStatus::Ended | RecurringExpenseStatus::Canceled => {
            template.next_recurring_date = None;
        }
    }
    Ok(())
}

/// Insert the expense for one occurrence unless it already exists.
async fn materialize(
    conn: &mut PgConnection,
    template: &RecurringExpense,
    date: NaiveDate,
) -> Result<bool, sqlx::Error> {
    if db::expenses::occurrence_exists(&mut *conn, &template.business_id, &template.id, date).await? {
        return Ok(false);
    }
    let expense = NewExpense {
        recurring_expense_id: Some(&template.id),
        amount: template.amount,
        currency: &template.currency,
        category: template.category,
        expense_type: ExpenseType::Recurring,
        occurred_on: date,
        note: template.note.as_deref(),
    };
    db::expenses::insert_occurrence(conn, &template.business_id, &expense).await
}

/// Create a template and, when asked, backfill its past occurrences.
pub async fn create(
    pool: &PgPool,
    business: &Business,
    data: &RecurringExpenseCreate,
) -> ServiceResult<RecurringExpense> {
    check_amount(data.amount)?;
    check_dates(data.recurring_start_date, data.recurring_end_date)?;
    let today = today_utc();
    check_start(data.recurring_start_date, today)?;

    let next = recurrence::initial_cursor(
        data.frequency,
        data.recurring_start_date,
        data.recurring_end_date,
        today,
    );
    let status = if next.is_some() {
        RecurringExpenseStatus::Active
    } else {
        RecurringExpenseStatus::Ended
    };
    let note = shared::models::trim_opt(data.note.as_deref());

    let mut tx = pool.begin().await?;
    let template = db::recurring_expenses::insert(
        &mut tx,
        &business.id,
        &NewRecurringExpense {
            frequency: data.frequency,
            start: data.recurring_start_date,
            end: data.recurring_end_date,
            next,
            amount: data.amount,
            currency: &business.currency,
            category: data.category,
            status,
            note: note.as_deref(),
        },
    )
    .await?;

    let mut backfilled = 0u32;
    if data.auto_create_historical_expenses {
        let dates = recurrence::backfill_dates(
            template.frequency,
            template.recurring_start_date,
            template.recurring_end_date,
            today,
        );
        for date in dates {
            if materialize(&mut tx, &template, date).await? {
                backfilled += 1;
            }
        }
    }
    tx.commit().await?;

    tracing::info!(
        business_id = %business.id,
        recurring_expense_id = %template.id,
        frequency = %template.frequency,
        status = %template.status,
        backfilled,
        "Recurring expense created"
    );
    Ok(template)
}

pub async fn update(
    pool: &PgPool,
    business: &Business,
    id: &str,
    data: &RecurringExpenseUpdate,
) -> ServiceResult<RecurringExpense> {
    let mut tx = pool.begin().await?;
    let mut template = db::recurring_expenses::find_for_update(&mut tx, &business.id, id)
        .await?
        .ok_or_else(|| not_found(id))?;

    apply_update(&mut template, data, today_utc())?;
    let saved = db::recurring_expenses::save(&mut tx, &template).await?;
    tx.commit().await?;
    Ok(saved)
}

pub async fn change_status(
    pool: &PgPool,
    business: &Business,
    id: &str,
    target: RecurringExpenseStatus,
) -> ServiceResult<RecurringExpense> {
    let mut tx = pool.begin().await?;
    let mut template = db::recurring_expenses::find_for_update(&mut tx, &business.id, id)
        .await?
        .ok_or_else(|| not_found(id))?;

    let from = template.status;
    apply_status(&mut template, target, today_utc())?;
    let saved = db::recurring_expenses::save(&mut tx, &template).await?;
    tx.commit().await?;

    tracing::info!(
        business_id = %business.id,
        recurring_expense_id = %id,
        from = %from,
        to = %saved.status,
        "Recurring expense status changed"
    );
    Ok(saved)
}

/// Materialise every occurrence due by `today`, across all businesses.
///
/// Runs in a single transaction. Templates locked by a concurrent run are
/// skipped, so several instances can run the job at once.
pub async fn process_due(pool: &PgPool, today: NaiveDate) -> ServiceResult<RecurringReport> {
    let mut tx = pool.begin().await?;
    let templates = db::recurring_expenses::lock_due(&mut tx, today).await?;

    let mut report = RecurringReport::default();
    for template in &templates {
        report.processed += 1;
        let plan = recurrence::plan_due(
            template.frequency,
            template.recurring_start_date,
            template.recurring_end_date,
            template.next_recurring_date,
            today,
        );

        for date in &plan.due {
            if materialize(&mut tx, template, *date).await? {
                report.created += 1;
            }
        }

        let status = if plan.ended {
            report.ended += 1;
            RecurringExpenseStatus::Ended
        } else {
            template.status
        };
        if plan.ended || plan.next != template.next_recurring_date {
            db::recurring_expenses::save_progress(&mut tx, &template.id, plan.next, status).await?;
        }
        if plan.due.len() >= recurrence::MAX_CATCH_UP {
            tracing::warn!(
                recurring_expense_id = %template.id,
                next = ?plan.next,
                "Catch-up limit reached, remaining occurrences deferred to the next run"
            );
        }
    }
    tx.commit().await?;

    tracing::info!(
        %today,
        processed = report.processed,
        created = report.created,
        ended = report.ended,
        "Recurring expenses processed"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::{ExpenseCategory, Frequency};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn template(status: RecurringExpenseStatus) -> RecurringExpense {
        RecurringExpense {
            id: "rexp_1".into(),
            business_id: "bus_1".into(),
            frequency: Frequency::Monthly,
            recurring_start_date: date(2024, 1, 31),
            recurring_end_date: None,
            next_recurring_date: Some(date(2024, 3, 31)),
            amount: Decimal::new(120000, 2),
            currency: "USD".into(),
            category: ExpenseCategory::Rent,
            status,
            note: None,
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn test_amount_must_be_positive() {
        let err = check_amount(Decimal::ZERO).unwrap_err();
        assert_eq!(err.code, ErrorCode::RecurringExpenseInvalidAmount);
        assert_eq!(err.message, "recurring expense amount must be greater than zero");
        assert!(check_amount(Decimal::new(1, 2)).is_ok());
    }

    #[test]
    fn test_end_before_start_rejected() {
        assert!(check_dates(date(2024, 1, 1), Some(date(2024, 1, 1))).is_ok());
        assert!(check_dates(date(2024, 1, 1), None).is_ok());
        let err = check_dates(date(2024, 2, 1), Some(date(2024, 1, 1))).unwrap_err();
        assert_eq!(err.code, ErrorCode::RecurringExpenseInvalidDates);
    }

    #[test]
    fn test_start_date_age_is_bounded() {
        let today = date(2024, 6, 10);
        assert!(check_start(date(2014, 6, 10), today).is_ok());
        let err = check_start(date(2014, 6, 9), today).unwrap_err();
        assert_eq!(err.code, ErrorCode::RecurringExpenseInvalidDates);
        assert!(check_start(date(1, 1, 1), today).is_err());

        let mut t = template(RecurringExpenseStatus::Active);
        let data = RecurringExpenseUpdate {
            recurring_start_date: Some(date(1900, 1, 1)),
            ..Default::default()
        };
        assert!(apply_update(&mut t, &data, today).is_err());
    }

    #[test]
    fn test_resume_skips_paused_period() {
        let mut t = template(RecurringExpenseStatus::Paused);
        apply_status(&mut t, RecurringExpenseStatus::Active, date(2024, 6, 10)).unwrap();
        assert_eq!(t.status, RecurringExpenseStatus::Active);
        assert_eq!(t.next_recurring_date, Some(date(2024, 6, 30)));
    }

    #[test]
    fn test_resume_past_end_ends_template() {
        let mut t = template(RecurringExpenseStatus::Paused);
        t.recurring_end_date = Some(date(2024, 5, 31));
        apply_status(&mut t, RecurringExpenseStatus::Active, date(2024, 6, 10)).unwrap();
        assert_eq!(t.status, RecurringExpenseStatus::Ended);
        assert_eq!(t.next_recurring_date, None);
    }

    #[test]
    fn test_invalid_transition_rejected() {
        let mut t = template(RecurringExpenseStatus::Canceled);
        let err = apply_status(&mut t, RecurringExpenseStatus::Active, date(2024, 6, 10)).unwrap_err();
        assert_eq!(err.code, ErrorCode::RecurringExpenseInvalidStatusTransition);
        assert_eq!(t.status, RecurringExpenseStatus::Canceled);

        let mut t = template(RecurringExpenseStatus::Paused);
        assert!(apply_status(&mut t, RecurringExpenseStatus::Canceled, date(2024, 6, 10)).is_err());
    }

    #[test]
    fn test_cancel_drops_cursor() {
        let mut t = template(RecurringExpenseStatus::Active);
        apply_status(&mut t, RecurringExpenseStatus::Canceled, date(2024, 6, 10)).unwrap();
        assert_eq!(t.next_recurring_date, None);
    }

    #[test]
    fn test_update_reschedules_on_frequency_change() {
        let mut t = template(RecurringExpenseStatus::Active);
        let data = RecurringExpenseUpdate {
            frequency: Some(Frequency::Weekly),
            ..Default::default()
        };
        apply_update(&mut t, &data, date(2024, 2, 1)).unwrap();
        // 2024-01-31 + 7 days
        assert_eq!(t.next_recurring_date, Some(date(2024, 2, 7)));
    }

    #[test]
    fn test_update_amount_only_keeps_cursor() {
        let mut t = template(RecurringExpenseStatus::Active);
        let data = RecurringExpenseUpdate {
            amount: Some(Decimal::new(99, 0)),
            note: Some(Some("  office rent ".into())),
            ..Default::default()
        };
        apply_update(&mut t, &data, date(2024, 2, 1)).unwrap();
        assert_eq!(t.next_recurring_date, Some(date(2024, 3, 31)));
        assert_eq!(t.amount, Decimal::new(99, 0));
        assert_eq!(t.note.as_deref(), Some("office rent"));

        let bad = RecurringExpenseUpdate {
            recurring_end_date: Some(Some(date(2023, 1, 1))),
            ..Default::default()
        };
        assert!(apply_update(&mut t, &bad, date(2024, 2, 1)).is_err());
    }

    #[test]
    fn test_end_date_change_keeps_overdue_occurrences() {
        let today = date(2024, 6, 10);
        let mut t = template(RecurringExpenseStatus::Active);
        let data = RecurringExpenseUpdate {
            recurring_end_date: Some(Some(date(2024, 12, 31))),
            ..Default::default()
        };
        apply_update(&mut t, &data, today).unwrap();
        assert_eq!(t.status, RecurringExpenseStatus::Active);
        assert_eq!(t.next_recurring_date, Some(date(2024, 3, 31)));

        let plan = recurrence::plan_due(
            t.frequency,
            t.recurring_start_date,
            t.recurring_end_date,
            t.next_recurring_date,
            today,
        );
        assert_eq!(plan.due, vec![date(2024, 3, 31), date(2024, 4, 30), date(2024, 5, 31)]);
        assert_eq!(plan.next, Some(date(2024, 6, 30)));
    }

    #[test]
    fn test_end_date_before_cursor_ends_template() {
        let mut t = template(RecurringExpenseStatus::Active);
        let data = RecurringExpenseUpdate {
            recurring_end_date: Some(Some(date(2024, 3, 15))),
            ..Default::default()
        };
        apply_update(&mut t, &data, date(2024, 6, 10)).unwrap();
        assert_eq!(t.status, RecurringExpenseStatus::Ended);
        assert_eq!(t.next_recurring_date, None);
    }

    #[test]
    fn test_clearing_end_date_keeps_cursor() {
        let mut t = template(RecurringExpenseStatus::Active);
        t.recurring_end_date = Some(date(2024, 12, 31));
        let data = RecurringExpenseUpdate {
            recurring_end_date: Some(None),
            ..Default::default()
        };
        apply_update(&mut t, &data, date(2024, 6, 10)).unwrap();
        assert_eq!(t.next_recurring_date, Some(date(2024, 3, 31)));
        assert_eq!(t.recurring_end_date, None);
    }
}
