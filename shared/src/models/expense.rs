//! Expense Model: one-off expenses and recurring expense templates

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::double_option;

text_enum! {
    pub enum ExpenseCategory {
        Office => "office",
        Travel => "travel",
        Supplies => "supplies",
        Utilities => "utilities",
        Payroll => "payroll",
        Marketing => "marketing",
        Rent => "rent",
        Software => "software",
        Maintenance => "maintenance",
        Insurance => "insurance",
        Taxes => "taxes",
        Training => "training",
        Consulting => "consulting",
        Miscellaneous => "miscellaneous",
        Legal => "legal",
        Research => "research",
        Equipment => "equipment",
        Shipping => "shipping",
        Other => "other",
    }
}

text_enum! {
    pub enum ExpenseType {
        OneTime => "one_time",
        Recurring => "recurring",
    }
}

text_enum! {
    pub enum Frequency {
        Daily => "daily",
        Weekly => "weekly",
        Monthly => "monthly",
        Yearly => "yearly",
    }
}

text_enum! {
    /// Lifecycle of a recurring expense template
    pub enum RecurringExpenseStatus {
        Active => "active",
        Paused => "paused",
        Ended => "ended",
        Canceled => "canceled",
    }
}

impl RecurringExpenseStatus {
    /// Allowed targets from this status. `ended` and `canceled` are terminal,
    /// and a paused template must be resumed or ended, never canceled.
    pub fn allowed_transitions(&self) -> &'static [RecurringExpenseStatus] {
        use RecurringExpenseStatus::*;
        match self {
            Active => &[Paused, Ended, Canceled],
            Paused => &[Active, Ended],
            Ended | Canceled => &[],
        }
    }

    pub fn can_transition_to(&self, target: RecurringExpenseStatus) -> bool {
        self.allowed_transitions().contains(&target)
    }

    pub fn is_terminal(&self) -> bool {
        self.allowed_transitions().is_empty()
    }
}

/// Expense entity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    pub id: String,
    pub business_id: String,
    pub recurring_expense_id: Option<String>,
    pub amount: Decimal,
    pub currency: String,
    pub category: ExpenseCategory,
    #[serde(rename = "type")]
    pub expense_type: ExpenseType,
    pub occurred_on: NaiveDate,
    pub note: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Create expense payload
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseCreate {
    pub amount: Decimal,
    pub category: ExpenseCategory,
    /// Defaults to `one_time`
    #[serde(rename = "type")]
    pub expense_type: Option<ExpenseType>,
    pub recurring_expense_id: Option<String>,
    /// Defaults to today (UTC)
    pub occurred_on: Option<NaiveDate>,
    #[validate(length(max = 1000))]
    pub note: Option<String>,
}

/// Update expense payload
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseUpdate {
    pub amount: Option<Decimal>,
    pub category: Option<ExpenseCategory>,
    #[serde(rename = "type")]
    pub expense_type: Option<ExpenseType>,
    #[serde(default, deserialize_with = "double_option")]
    pub recurring_expense_id: Option<Option<String>>,
    pub occurred_on: Option<NaiveDate>,
    #[serde(default, deserialize_with = "double_option")]
    pub note: Option<Option<String>>,
}

/// Expense list filters (query string, next to the list parameters)
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseFilter {
    pub category: Option<ExpenseCategory>,
    #[serde(rename = "type")]
    pub expense_type: Option<ExpenseType>,
    pub recurring_expense_id: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

/// Recurring expense template
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecurringExpense {
    pub id: String,
    pub business_id: String,
    pub frequency: Frequency,
    pub recurring_start_date: NaiveDate,
    pub recurring_end_date: Option<NaiveDate>,
    /// Next date the daily job will materialise
    pub next_recurring_date: Option<NaiveDate>,
    pub amount: Decimal,
    pub currency: String,
    pub category: ExpenseCategory,
    pub status: RecurringExpenseStatus,
    pub note: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

fn default_true() -> bool {
    true
}

/// Create recurring expense payload
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RecurringExpenseCreate {
    pub frequency: Frequency,
    pub recurring_start_date: NaiveDate,
    pub recurring_end_date: Option<NaiveDate>,
    pub amount: Decimal,
    pub category: ExpenseCategory,
    #[validate(length(max = 1000))]
    pub note: Option<String>,
    /// Materialise occurrences between the start date and yesterday
    #[serde(default = "default_true")]
    pub auto_create_historical_expenses: bool,
}

/// Update recurring expense payload
///
/// `recurringEndDate: null` removes the end date.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RecurringExpenseUpdate {
    pub frequency: Option<Frequency>,
    pub recurring_start_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "double_option")]
    pub recurring_end_date: Option<Option<NaiveDate>>,
    pub amount: Option<Decimal>,
    pub category: Option<ExpenseCategory>,
    #[serde(default, deserialize_with = "double_option")]
    pub note: Option<Option<String>>,
}

/// PATCH .../recurring-expenses/{id}/status
#[derive(Debug, Clone, Deserialize)]
pub struct RecurringExpenseStatusUpdate {
    pub status: RecurringExpenseStatus,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecurringExpenseFilter {
    pub status: Option<RecurringExpenseStatus>,
    pub frequency: Option<Frequency>,
    pub category: Option<ExpenseCategory>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_status_transitions() {
        use RecurringExpenseStatus::*;
        assert!(Active.can_transition_to(Paused));
        assert!(Active.can_transition_to(Ended));
        assert!(Active.can_transition_to(Canceled));
        assert!(Paused.can_transition_to(Active));
        assert!(Paused.can_transition_to(Ended));
        assert!(!Paused.can_transition_to(Canceled));

        for status in RecurringExpenseStatus::ALL {
            assert!(!status.can_transition_to(*status), "{status} -> {status}");
            assert!(!Ended.can_transition_to(*status));
            assert!(!Canceled.can_transition_to(*status));
        }
        assert!(Ended.is_terminal());
        assert!(!Paused.is_terminal());
    }

    #[test]
    fn test_expense_categories() {
        assert_eq!(ExpenseCategory::ALL.len(), 19);
        assert_eq!(ExpenseCategory::from_db("rent"), Some(ExpenseCategory::Rent));
        assert_eq!(ExpenseCategory::from_db("transaction_fee"), None);
    }

    #[test]
    fn test_recurring_create_defaults_backfill_on() {
        let req: RecurringExpenseCreate = serde_json::from_str(
            r#"{"frequency":"monthly","recurringStartDate":"2024-01-31","amount":"1200.50","category":"rent"}"#,
        )
        .unwrap();
        assert!(req.auto_create_historical_expenses);
        assert_eq!(req.amount, Decimal::new(120050, 2));
        assert_eq!(req.recurring_end_date, None);
    }

    #[test]
    fn test_recurring_update_end_date_tristate() {
        let clear: RecurringExpenseUpdate =
            serde_json::from_str(r#"{"recurringEndDate":null}"#).unwrap();
        assert_eq!(clear.recurring_end_date, Some(None));
        let keep: RecurringExpenseUpdate = serde_json::from_str(r#"{"amount":"5"}"#).unwrap();
        assert_eq!(keep.recurring_end_date, None);
    }

    #[test]
    fn test_expense_serializes_type_field() {
        let expense = Expense {
            id: "exp_1".into(),
            business_id: "bus_1".into(),
            recurring_expense_id: None,
            amount: Decimal::new(1999, 2),
            currency: "USD".into(),
            category: ExpenseCategory::Software,
            expense_type: ExpenseType::OneTime,
            occurred_on: date(2024, 5, 1),
            note: None,
            created_at: 0,
            updated_at: 0,
        };
        let json = serde_json::to_value(&expense).unwrap();
        assert_eq!(json["type"], "one_time");
        assert_eq!(json["amount"], "19.99");
        assert_eq!(json["occurredOn"], "2024-05-01");
    }
}
