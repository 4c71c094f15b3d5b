//! Recurring expense date math
//!
//! Occurrences are anchored on the template's start date: the k-th
//! occurrence is `start + k * step`, so a monthly template starting on the
//! 31st lands on the last day of short months without drifting to the 28th
//! afterwards. Everything here is pure; the server feeds it `today`.

use chrono::{Days, Months, NaiveDate};

use crate::models::Frequency;

/// Upper bound of occurrences materialised for one template in one job run.
pub const MAX_CATCH_UP: usize = 366;

/// The k-th occurrence of a schedule starting at `start` (k = 0 is `start`).
pub fn occurrence(frequency: Frequency, start: NaiveDate, k: u32) -> Option<NaiveDate> {
    match frequency {
        Frequency::Daily => start.checked_add_days(Days::new(u64::from(k))),
        Frequency::Weekly => start.checked_add_days(Days::new(7 * u64::from(k))),
        Frequency::Monthly => start.checked_add_months(Months::new(k)),
        Frequency::Yearly => start.checked_add_months(Months::new(k.checked_mul(12)?)),
    }
}

/// Index of the first occurrence on or after `date`, plus that date.
fn first_index_on_or_after(
    frequency: Frequency,
    start: NaiveDate,
    date: NaiveDate,
) -> Option<(u32, NaiveDate)> {
    if date <= start {
        return Some((0, start));
    }
    let days = (date - start).num_days();
    // Lower-bound guess, then walk forward.
    let guess = match frequency {
        Frequency::Daily => days,
        Frequency::Weekly => days / 7,
        Frequency::Monthly => days / 31,
        Frequency::Yearly => days / 366,
    };
    let mut k = u32::try_from(guess).ok()?;
    loop {
        let candidate = occurrence(frequency, start, k)?;
        if candidate >= date {
            return Some((k, candidate));
        }
        k = k.checked_add(1)?;
    }
}

/// First occurrence on or after `date`.
pub fn first_on_or_after(frequency: Frequency, start: NaiveDate, date: NaiveDate) -> Option<NaiveDate> {
    first_index_on_or_after(frequency, start, date).map(|(_, d)| d)
}

/// First occurrence strictly after `date`.
pub fn next_after(frequency: Frequency, start: NaiveDate, date: NaiveDate) -> Option<NaiveDate> {
    first_on_or_after(frequency, start, date.succ_opt()?)
}

fn within_end(date: NaiveDate, end: Option<NaiveDate>) -> bool {
    end.is_none_or(|end| date <= end)
}

/// Cursor for a fresh (or re-scheduled) template.
///
/// A future start is its own first occurrence; otherwise the cursor is the
/// first occurrence on or after `today`. `None` means the schedule has no
/// occurrence left before its end date.
pub fn initial_cursor(
    frequency: Frequency,
    start: NaiveDate,
    end: Option<NaiveDate>,
    today: NaiveDate,
) -> Option<NaiveDate> {
    first_on_or_after(frequency, start, today).filter(|d| within_end(*d, end))
}

/// Past occurrences (`start <= d < today`, and `d <= end` when set)
/// materialised when a template is created with a start date in the past.
pub fn backfill_dates(
    frequency: Frequency,
    start: NaiveDate,
    end: Option<NaiveDate>,
    today: NaiveDate,
) -> Vec<NaiveDate> {
    let mut dates = Vec::new();
    let mut k = 0u32;
    while let Some(date) = occurrence(frequency, start, k) {
        if date >= today || !within_end(date, end) {
            break;
        }
        dates.push(date);
        k += 1;
    }
    dates
}

/// Outcome of advancing one template for one job run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuePlan {
    /// Occurrence dates to materialise, ascending
    pub due: Vec<NaiveDate>,
    /// Cursor to persist
    pub next: Option<NaiveDate>,
    /// Whether the template ran past its end date
    pub ended: bool,
}

/// Work out which occurrences are due as of `today`, catching up on missed
/// days (bounded by [`MAX_CATCH_UP`]) and detecting the end of the schedule.
pub fn plan_due(
    frequency: Frequency,
    start: NaiveDate,
    end: Option<NaiveDate>,
    cursor: Option<NaiveDate>,
    today: NaiveDate,
) -> DuePlan {
    let mut next = match cursor {
        Some(cursor) => Some(cursor),
        None => first_on_or_after(frequency, start, today),
    };
    let mut due = Vec::new();

    while let Some(date) = next {
        if !within_end(date, end) {
            return DuePlan {
                due,
                next: None,
                ended: true,
            };
        }
        if date > today || due.len() >= MAX_CATCH_UP {
            break;
        }
        due.push(date);
        next = next_after(frequency, start, date);
    }

    DuePlan {
        due,
        next,
        ended: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_occurrence_anchored_on_start() {
        let start = date(2024, 1, 31);
        assert_eq!(occurrence(Frequency::Monthly, start, 1), Some(date(2024, 2, 29)));
        assert_eq!(occurrence(Frequency::Monthly, start, 2), Some(date(2024, 3, 31)));
        assert_eq!(occurrence(Frequency::Weekly, start, 2), Some(date(2024, 2, 14)));
        assert_eq!(occurrence(Frequency::Yearly, date(2024, 2, 29), 1), Some(date(2025, 2, 28)));
        assert_eq!(occurrence(Frequency::Yearly, date(2024, 2, 29), 4), Some(date(2028, 2, 29)));
    }

    #[test]
    fn test_first_on_or_after() {
        let start = date(2024, 1, 10);
        assert_eq!(first_on_or_after(Frequency::Monthly, start, date(2024, 1, 1)), Some(start));
        assert_eq!(
            first_on_or_after(Frequency::Monthly, start, date(2024, 3, 10)),
            Some(date(2024, 3, 10))
        );
        assert_eq!(
            first_on_or_after(Frequency::Monthly, start, date(2024, 3, 11)),
            Some(date(2024, 4, 10))
        );
        assert_eq!(
            first_on_or_after(Frequency::Weekly, start, date(2024, 1, 12)),
            Some(date(2024, 1, 17))
        );
        assert_eq!(
            next_after(Frequency::Daily, start, date(2024, 1, 12)),
            Some(date(2024, 1, 13))
        );
    }

    #[test]
    fn test_initial_cursor() {
        let today = date(2024, 6, 15);
        // future start
        assert_eq!(
            initial_cursor(Frequency::Monthly, date(2024, 7, 1), None, today),
            Some(date(2024, 7, 1))
        );
        // start today
        assert_eq!(initial_cursor(Frequency::Daily, today, None, today), Some(today));
        // past start walks forward
        assert_eq!(
            initial_cursor(Frequency::Monthly, date(2024, 1, 20), None, today),
            Some(date(2024, 6, 20))
        );
        // next occurrence past the end date
        assert_eq!(
            initial_cursor(Frequency::Monthly, date(2024, 1, 20), Some(date(2024, 6, 18)), today),
            None
        );
    }

    #[test]
    fn test_backfill_dates() {
        let today = date(2024, 4, 15);
        assert_eq!(
            backfill_dates(Frequency::Monthly, date(2024, 1, 15), None, today),
            vec![date(2024, 1, 15), date(2024, 2, 15), date(2024, 3, 15)]
        );
        assert_eq!(
            backfill_dates(Frequency::Monthly, date(2024, 1, 15), Some(date(2024, 2, 20)), today),
            vec![date(2024, 1, 15), date(2024, 2, 15)]
        );
        assert!(backfill_dates(Frequency::Daily, today, None, today).is_empty());
        assert!(backfill_dates(Frequency::Daily, date(2024, 5, 1), None, today).is_empty());
        assert_eq!(backfill_dates(Frequency::Daily, date(2024, 4, 1), None, today).len(), 14);
    }

    #[test]
    fn test_backfill_and_cursor_do_not_overlap() {
        let start = date(2024, 1, 31);
        let today = date(2024, 5, 31);
        let past = backfill_dates(Frequency::Monthly, start, None, today);
        let cursor = initial_cursor(Frequency::Monthly, start, None, today).unwrap();
        assert!(past.iter().all(|d| *d < cursor));
        assert_eq!(cursor, today);
        assert_eq!(past.last(), Some(&date(2024, 4, 30)));
    }

    #[test]
    fn test_plan_due_single_day() {
        let today = date(2024, 3, 1);
        let plan = plan_due(Frequency::Monthly, date(2024, 1, 1), None, Some(today), today);
        assert_eq!(plan.due, vec![today]);
        assert_eq!(plan.next, Some(date(2024, 4, 1)));
        assert!(!plan.ended);
    }

    #[test]
    fn test_plan_due_catches_up_missed_days() {
        let today = date(2024, 3, 5);
        let plan = plan_due(Frequency::Daily, date(2024, 3, 1), None, Some(date(2024, 3, 2)), today);
        assert_eq!(plan.due.len(), 4);
        assert_eq!(plan.due.first(), Some(&date(2024, 3, 2)));
        assert_eq!(plan.next, Some(date(2024, 3, 6)));
    }

    #[test]
    fn test_plan_due_nothing_due_yet() {
        let today = date(2024, 3, 5);
        let plan = plan_due(Frequency::Weekly, date(2024, 3, 1), None, Some(date(2024, 3, 8)), today);
        assert!(plan.due.is_empty());
        assert_eq!(plan.next, Some(date(2024, 3, 8)));
        assert!(!plan.ended);
    }

    #[test]
    fn test_plan_due_ends_after_last_occurrence() {
        let today = date(2024, 3, 1);
        let plan = plan_due(
            Frequency::Monthly,
            date(2024, 1, 1),
            Some(date(2024, 3, 15)),
            Some(today),
            today,
        );
        assert_eq!(plan.due, vec![today]);
        assert_eq!(plan.next, None);
        assert!(plan.ended);
    }

    #[test]
    fn test_plan_due_initialises_missing_cursor() {
        let today = date(2024, 3, 10);
        let plan = plan_due(Frequency::Weekly, date(2024, 3, 3), None, None, today);
        assert_eq!(plan.due, vec![today]);
        assert_eq!(plan.next, Some(date(2024, 3, 17)));
    }

    #[test]
    fn test_plan_due_catch_up_is_bounded() {
        let today = date(2026, 1, 1);
        let plan = plan_due(Frequency::Daily, date(2024, 1, 1), None, Some(date(2024, 1, 1)), today);
        assert_eq!(plan.due.len(), MAX_CATCH_UP);
        assert!(plan.next.unwrap() <= today);
        assert!(!plan.ended);
    }
}
