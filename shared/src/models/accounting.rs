//! Accounting Model: assets, investments, withdrawals and the summary

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{ExpenseCategory, double_option, non_negative};

text_enum! {
    pub enum AssetType {
        Software => "software",
        Equipment => "equipment",
        Vehicle => "vehicle",
        Furniture => "furniture",
        Other => "other",
    }
}

/// Asset entity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    pub id: String,
    pub business_id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub asset_type: AssetType,
    pub value: Decimal,
    pub currency: String,
    pub purchased_at: NaiveDate,
    pub note: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AssetCreate {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[serde(rename = "type")]
    pub asset_type: AssetType,
    #[validate(custom(function = "non_negative"))]
    pub value: Decimal,
    /// Defaults to today (UTC)
    pub purchased_at: Option<NaiveDate>,
    #[validate(length(max = 1000))]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AssetUpdate {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub asset_type: Option<AssetType>,
    #[validate(custom(function = "non_negative"))]
    pub value: Option<Decimal>,
    pub purchased_at: Option<NaiveDate>,
    #[serde(default, deserialize_with = "double_option")]
    pub note: Option<Option<String>>,
}

/// Capital put into the business by a workspace member
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Investment {
    pub id: String,
    pub business_id: String,
    pub investor_id: String,
    pub amount: Decimal,
    pub currency: String,
    pub note: Option<String>,
    pub invested_at: NaiveDate,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct InvestmentCreate {
    #[validate(length(min = 1))]
    pub investor_id: String,
    pub amount: Decimal,
    #[validate(length(max = 1000))]
    pub note: Option<String>,
    pub invested_at: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct InvestmentUpdate {
    #[validate(length(min = 1))]
    pub investor_id: Option<String>,
    pub amount: Option<Decimal>,
    #[serde(default, deserialize_with = "double_option")]
    pub note: Option<Option<String>>,
    pub invested_at: Option<NaiveDate>,
}

/// Money taken out of the business by a workspace member
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Withdrawal {
    pub id: String,
    pub business_id: String,
    pub withdrawer_id: String,
    pub amount: Decimal,
    pub currency: String,
    pub note: Option<String>,
    pub withdrawn_at: NaiveDate,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalCreate {
    #[validate(length(min = 1))]
    pub withdrawer_id: String,
    pub amount: Decimal,
    #[validate(length(max = 1000))]
    pub note: Option<String>,
    pub withdrawn_at: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalUpdate {
    #[validate(length(min = 1))]
    pub withdrawer_id: Option<String>,
    pub amount: Option<Decimal>,
    #[serde(default, deserialize_with = "double_option")]
    pub note: Option<Option<String>>,
    pub withdrawn_at: Option<NaiveDate>,
}

/// Inclusive date range used by summaries
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct DateRangeQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateRangeQuery {
    /// `from` after `to` is the only invalid combination.
    pub fn is_valid(&self) -> bool {
        match (self.from, self.to) {
            (Some(from), Some(to)) => from <= to,
            _ => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryTotal {
    pub category: ExpenseCategory,
    pub total: Decimal,
}

/// GET .../accounting/summary
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountingSummary {
    pub total_asset_value: Decimal,
    pub total_investments: Decimal,
    pub total_withdrawals: Decimal,
    pub total_expenses: Decimal,
    pub expenses_by_category: Vec<CategoryTotal>,
    pub revenue: Decimal,
    pub cogs: Decimal,
    pub safe_to_draw_amount: Decimal,
    pub currency: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<NaiveDate>,
}

/// Amount that can be withdrawn without eating into operations:
/// `revenue - cogs - expenses - withdrawals - safety_buffer`, floored at zero.
pub fn safe_to_draw(
    revenue: Decimal,
    cogs: Decimal,
    expenses: Decimal,
    withdrawals: Decimal,
    safety_buffer: Decimal,
) -> Decimal {
    let amount = revenue - cogs - expenses - withdrawals - safety_buffer;
    amount.max(Decimal::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_safe_to_draw() {
        assert_eq!(
            safe_to_draw(dec("10000"), dec("3000"), dec("1500.50"), dec("500"), dec("1000")),
            dec("3999.50")
        );
        assert_eq!(
            safe_to_draw(dec("100"), dec("80"), dec("50"), Decimal::ZERO, Decimal::ZERO),
            Decimal::ZERO
        );
    }

    #[test]
    fn test_date_range_validity() {
        let d = |s: &str| NaiveDate::from_str(s).unwrap();
        assert!(DateRangeQuery::default().is_valid());
        assert!(DateRangeQuery { from: Some(d("2024-01-01")), to: Some(d("2024-01-01")) }.is_valid());
        assert!(!DateRangeQuery { from: Some(d("2024-02-01")), to: Some(d("2024-01-01")) }.is_valid());
    }

    #[test]
    fn test_asset_create_rejects_negative_value() {
        let req: AssetCreate =
            serde_json::from_str(r#"{"name":"Laptop","type":"equipment","value":"-1"}"#).unwrap();
        assert!(req.validate().is_err());
        let ok: AssetCreate =
            serde_json::from_str(r#"{"name":"Laptop","type":"equipment","value":"1499.99"}"#).unwrap();
        assert!(ok.validate().is_ok());
        assert_eq!(ok.asset_type, AssetType::Equipment);
    }

    #[test]
    fn test_summary_omits_open_range() {
        let summary = AccountingSummary {
            total_asset_value: Decimal::ZERO,
            total_investments: dec("100"),
            total_withdrawals: Decimal::ZERO,
            total_expenses: Decimal::ZERO,
            expenses_by_category: vec![CategoryTotal {
                category: ExpenseCategory::Rent,
                total: dec("50.25"),
            }],
            revenue: Decimal::ZERO,
            cogs: Decimal::ZERO,
            safe_to_draw_amount: Decimal::ZERO,
            currency: "USD".into(),
            from: None,
            to: None,
        };
        let json = serde_json::to_value(&summary).unwrap();
        assert!(json.get("from").is_none());
        assert_eq!(json["totalInvestments"], "100");
        assert_eq!(json["expensesByCategory"][0]["category"], "rent");
        assert_eq!(json["expensesByCategory"][0]["total"], "50.25");
    }
}
