//! Business Model (the tenant)

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{double_option, non_negative, validate_country_code, validate_currency_code};

pub const MIN_DESCRIPTOR_LEN: usize = 2;
pub const MAX_DESCRIPTOR_LEN: usize = 63;

/// Business entity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Business {
    pub id: String,
    pub workspace_id: String,
    /// URL handle, unique inside the workspace
    pub descriptor: String,
    pub name: String,
    pub brand: Option<String>,
    pub country_code: String,
    pub currency: String,
    /// Fraction, e.g. 0.05 = 5%
    pub vat_rate: Decimal,
    /// Amount kept aside when computing the safe-to-draw figure
    pub safety_buffer: Decimal,
    pub support_email: Option<String>,
    pub phone_number: Option<String>,
    pub website_url: Option<String>,
    pub established_at: Option<NaiveDate>,
    pub archived_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Create business payload
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BusinessCreate {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    pub descriptor: String,
    #[validate(length(max = 255))]
    pub brand: Option<String>,
    #[validate(custom(function = "validate_country_code"))]
    pub country_code: String,
    #[validate(custom(function = "validate_currency_code"))]
    pub currency: String,
    #[validate(custom(function = "non_negative"))]
    pub vat_rate: Option<Decimal>,
    #[validate(custom(function = "non_negative"))]
    pub safety_buffer: Option<Decimal>,
    #[validate(email)]
    pub support_email: Option<String>,
    #[validate(length(max = 32))]
    pub phone_number: Option<String>,
    #[validate(url)]
    pub website_url: Option<String>,
    pub established_at: Option<NaiveDate>,
}

/// Update business payload
///
/// Nullable contact fields use a double option so `null` clears them.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BusinessUpdate {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    pub descriptor: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub brand: Option<Option<String>>,
    #[validate(custom(function = "validate_country_code"))]
    pub country_code: Option<String>,
    #[validate(custom(function = "validate_currency_code"))]
    pub currency: Option<String>,
    #[validate(custom(function = "non_negative"))]
    pub vat_rate: Option<Decimal>,
    #[validate(custom(function = "non_negative"))]
    pub safety_buffer: Option<Decimal>,
    #[serde(default, deserialize_with = "double_option")]
    pub support_email: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub phone_number: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub website_url: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub established_at: Option<Option<NaiveDate>>,
}

/// GET /v1/businesses/descriptor/availability
#[derive(Debug, Clone, Deserialize)]
pub struct DescriptorQuery {
    pub descriptor: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DescriptorAvailability {
    pub descriptor: String,
    pub available: bool,
}

/// Trim and lowercase a business descriptor, returning `None` when the
/// result is not a valid handle (`[a-z0-9][a-z0-9-]{1,62}`).
pub fn normalize_business_descriptor(raw: &str) -> Option<String> {
    let descriptor = raw.trim().to_ascii_lowercase();
    let len = descriptor.len();
    if !(MIN_DESCRIPTOR_LEN..=MAX_DESCRIPTOR_LEN).contains(&len) {
        return None;
    }
    let mut chars = descriptor.chars();
    let first = chars.next()?;
    if !(first.is_ascii_lowercase() || first.is_ascii_digit()) {
        return None;
    }
    if chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-') {
        Some(descriptor)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_normalization() {
        assert_eq!(
            normalize_business_descriptor("  My-Shop "),
            Some("my-shop".to_string())
        );
        assert_eq!(normalize_business_descriptor("a1"), Some("a1".to_string()));
        assert_eq!(normalize_business_descriptor("a"), None);
        assert_eq!(normalize_business_descriptor("-shop"), None);
        assert_eq!(normalize_business_descriptor("my shop"), None);
        assert_eq!(normalize_business_descriptor("café"), None);
        assert!(normalize_business_descriptor(&"a".repeat(63)).is_some());
        assert!(normalize_business_descriptor(&"a".repeat(64)).is_none());
    }

    #[test]
    fn test_create_validation() {
        let req: BusinessCreate = serde_json::from_str(
            r#"{"name":"Shop","descriptor":"shop","countryCode":"AEX","currency":"AED","vatRate":"-0.05"}"#,
        )
        .unwrap();
        let errors = req.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("country_code"));
        assert!(fields.contains_key("vat_rate"));
        assert!(!fields.contains_key("currency"));
    }

    #[test]
    fn test_update_checks_country_and_currency() {
        let req: BusinessUpdate =
            serde_json::from_str(r#"{"countryCode":"ARE","currency":"AED"}"#).unwrap();
        let errors = req.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("country_code"));
        assert!(!errors.field_errors().contains_key("currency"));

        let ok: BusinessUpdate = serde_json::from_str(r#"{"countryCode":"AE"}"#).unwrap();
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn test_update_clears_nullable_fields() {
        let req: BusinessUpdate =
            serde_json::from_str(r#"{"brand":null,"name":"New"}"#).unwrap();
        assert_eq!(req.brand, Some(None));
        assert_eq!(req.support_email, None);
        assert_eq!(req.name.as_deref(), Some("New"));
    }

    #[test]
    fn test_money_serializes_as_string() {
        let business = Business {
            id: "bus_1".into(),
            workspace_id: "wrk_1".into(),
            descriptor: "shop".into(),
            name: "Shop".into(),
            brand: None,
            country_code: "AE".into(),
            currency: "AED".into(),
            vat_rate: Decimal::new(5, 2),
            safety_buffer: Decimal::new(100000, 2),
            support_email: None,
            phone_number: None,
            website_url: None,
            established_at: None,
            archived_at: None,
            created_at: 1,
            updated_at: 1,
        };
        let json = serde_json::to_value(&business).unwrap();
        assert_eq!(json["vatRate"], "0.05");
        assert_eq!(json["safetyBuffer"], "1000.00");
        assert!(json.get("deletedAt").is_none());
    }
}
