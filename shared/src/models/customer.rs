//! Customer Model: customers and their shipping addresses

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidateEmail};

use super::validate_country_code;

text_enum! {
    pub enum Gender {
        Male => "male",
        Female => "female",
        Other => "other",
    }
}

/// Customer entity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: String,
    pub business_id: String,
    pub name: String,
    pub email: Option<String>,
    pub phone_code: Option<String>,
    pub phone_number: Option<String>,
    pub country_code: String,
    pub gender: Option<Gender>,
    pub instagram_username: Option<String>,
    pub tiktok_username: Option<String>,
    pub facebook_username: Option<String>,
    pub x_username: Option<String>,
    pub snapchat_username: Option<String>,
    pub whatsapp_number: Option<String>,
    pub joined_at: NaiveDate,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CustomerCreate {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(max = 8))]
    pub phone_code: Option<String>,
    #[validate(length(max = 32))]
    pub phone_number: Option<String>,
    #[validate(custom(function = "validate_country_code"))]
    pub country_code: String,
    pub gender: Option<Gender>,
    #[validate(length(max = 64))]
    pub instagram_username: Option<String>,
    #[validate(length(max = 64))]
    pub tiktok_username: Option<String>,
    #[validate(length(max = 64))]
    pub facebook_username: Option<String>,
    #[validate(length(max = 64))]
    pub x_username: Option<String>,
    #[validate(length(max = 64))]
    pub snapchat_username: Option<String>,
    #[validate(length(max = 32))]
    pub whatsapp_number: Option<String>,
    /// Defaults to today (UTC)
    pub joined_at: Option<NaiveDate>,
}

/// Update customer payload
///
/// Optional contact fields are cleared by sending an empty string.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CustomerUpdate {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    pub email: Option<String>,
    #[validate(length(max = 8))]
    pub phone_code: Option<String>,
    #[validate(length(max = 32))]
    pub phone_number: Option<String>,
    #[validate(custom(function = "validate_country_code"))]
    pub country_code: Option<String>,
    pub gender: Option<Gender>,
    #[validate(length(max = 64))]
    pub instagram_username: Option<String>,
    #[validate(length(max = 64))]
    pub tiktok_username: Option<String>,
    #[validate(length(max = 64))]
    pub facebook_username: Option<String>,
    #[validate(length(max = 64))]
    pub x_username: Option<String>,
    #[validate(length(max = 64))]
    pub snapchat_username: Option<String>,
    #[validate(length(max = 32))]
    pub whatsapp_number: Option<String>,
    pub joined_at: Option<NaiveDate>,
}

impl CustomerUpdate {
    /// Email check that lets an empty string through (it clears the field).
    pub fn email_is_valid(&self) -> bool {
        match self.email.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(email) => email.validate_email(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerFilter {
    pub country_code: Option<String>,
    pub gender: Option<Gender>,
}

/// Customer shipping address
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerAddress {
    pub id: String,
    pub business_id: String,
    pub customer_id: String,
    pub country_code: String,
    pub state: String,
    pub city: String,
    pub street: Option<String>,
    pub zip_code: Option<String>,
    pub phone_code: String,
    pub phone_number: String,
    pub shipping_zone_id: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CustomerAddressCreate {
    #[validate(custom(function = "validate_country_code"))]
    pub country_code: String,
    #[validate(length(min = 1, max = 255))]
    pub state: String,
    #[validate(length(min = 1, max = 255))]
    pub city: String,
    #[validate(length(max = 500))]
    pub street: Option<String>,
    #[validate(length(max = 32))]
    pub zip_code: Option<String>,
    #[validate(length(min = 1, max = 8))]
    pub phone_code: String,
    #[validate(length(min = 1, max = 32))]
    pub phone_number: String,
    pub shipping_zone_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CustomerAddressUpdate {
    #[validate(custom(function = "validate_country_code"))]
    pub country_code: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub state: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub city: Option<String>,
    #[validate(length(max = 500))]
    pub street: Option<String>,
    #[validate(length(max = 32))]
    pub zip_code: Option<String>,
    #[validate(length(min = 1, max = 8))]
    pub phone_code: Option<String>,
    #[validate(length(min = 1, max = 32))]
    pub phone_number: Option<String>,
    pub shipping_zone_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_updates_check_country_code() {
        let customer: CustomerUpdate = serde_json::from_str(r#"{"countryCode":"EGY"}"#).unwrap();
        assert!(customer.validate().unwrap_err().field_errors().contains_key("country_code"));

        let address: CustomerAddressUpdate =
            serde_json::from_str(r#"{"countryCode":"1A","city":"Cairo"}"#).unwrap();
        assert!(address.validate().unwrap_err().field_errors().contains_key("country_code"));

        let address: CustomerAddressUpdate = serde_json::from_str(r#"{"countryCode":"EG"}"#).unwrap();
        assert!(address.validate().is_ok());
    }

    #[test]
    fn test_customer_create_validation() {
        let req: CustomerCreate = serde_json::from_str(
            r#"{"name":"Mona","email":"mona@","countryCode":"EG","gender":"female"}"#,
        )
        .unwrap();
        let errors = req.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("email"));
        assert_eq!(req.gender, Some(Gender::Female));
    }

    #[test]
    fn test_customer_update_email_clear() {
        let clear = CustomerUpdate {
            email: Some("".into()),
            ..Default::default()
        };
        assert!(clear.email_is_valid());
        let bad = CustomerUpdate {
            email: Some("nope".into()),
            ..Default::default()
        };
        assert!(!bad.email_is_valid());
    }

    #[test]
    fn test_address_requires_phone() {
        let req: CustomerAddressCreate = serde_json::from_str(
            r#"{"countryCode":"AE","state":"Dubai","city":"Dubai","phoneCode":"+971","phoneNumber":""}"#,
        )
        .unwrap();
        let errors = req.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("phone_number"));
    }
}
