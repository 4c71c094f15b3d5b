//! Data models
//!
//! API-facing DTOs and request payloads. Every JSON shape is camelCase,
//! money is `Decimal` (serialized as a string) and calendar dates are
//! `NaiveDate` (`YYYY-MM-DD`). Timestamps are epoch milliseconds.

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use validator::ValidationError;

/// Declares a string-backed enum stored as TEXT.
///
/// Generates `as_db` / `from_db`, serde renames, `Display` and an `ALL` slice.
macro_rules! text_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $($(#[$vmeta:meta])* $variant:ident => $db:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        $vis enum $name {
            $($(#[$vmeta])* #[serde(rename = $db)] $variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Database string representation
            pub fn as_db(&self) -> &'static str {
                match self {
                    $($name::$variant => $db),+
                }
            }

            /// Parse from database string value
            pub fn from_db(s: &str) -> Option<Self> {
                match s {
                    $($db => Some($name::$variant),)+
                    _ => None,
                }
            }
        }

        impl $crate::models::TextEnum for $name {
            const NAME: &'static str = stringify!($name);

            fn db_value(&self) -> &'static str {
                self.as_db()
            }

            fn parse_db(s: &str) -> Option<Self> {
                Self::from_db(s)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_db())
            }
        }
    };
}

/// Enums persisted as TEXT columns
pub trait TextEnum: Sized + Copy {
    const NAME: &'static str;

    fn db_value(&self) -> &'static str;

    fn parse_db(s: &str) -> Option<Self>;
}

pub mod account;
pub mod accounting;
pub mod business;
pub mod customer;
pub mod expense;
pub mod inventory;
pub mod order;

pub use account::*;
pub use accounting::*;
pub use business::*;
pub use customer::*;
pub use expense::*;
pub use inventory::*;
pub use order::*;

/// Distinguishes an absent field from an explicit `null` in PATCH payloads.
///
/// Use with `#[serde(default, deserialize_with = "double_option")]`:
/// missing → `None`, `null` → `Some(None)`, value → `Some(Some(v))`.
pub fn double_option<'de, T, D>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(de).map(Some)
}

pub(crate) fn non_negative(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(ValidationError::new("non_negative").with_message("must not be negative".into()));
    }
    Ok(())
}

pub(crate) fn validate_country_code(value: &str) -> Result<(), ValidationError> {
    if value.len() == 2 && value.chars().all(|c| c.is_ascii_alphabetic()) {
        return Ok(());
    }
    Err(ValidationError::new("country_code")
        .with_message("must be a two-letter ISO country code".into()))
}

pub(crate) fn validate_currency_code(value: &str) -> Result<(), ValidationError> {
    if value.len() == 3 && value.chars().all(|c| c.is_ascii_alphabetic()) {
        return Ok(());
    }
    Err(ValidationError::new("currency_code")
        .with_message("must be a three-letter ISO currency code".into()))
}

/// Trim an optional string, mapping blank to `None`.
pub fn trim_opt(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[derive(Deserialize)]
    struct Patch {
        #[serde(default, deserialize_with = "double_option")]
        end: Option<Option<String>>,
    }

    #[test]
    fn test_double_option() {
        let missing: Patch = serde_json::from_str("{}").unwrap();
        assert_eq!(missing.end, None);
        let null: Patch = serde_json::from_str(r#"{"end":null}"#).unwrap();
        assert_eq!(null.end, Some(None));
        let set: Patch = serde_json::from_str(r#"{"end":"x"}"#).unwrap();
        assert_eq!(set.end, Some(Some("x".to_string())));
    }

    #[test]
    fn test_non_negative() {
        assert!(non_negative(&Decimal::ZERO).is_ok());
        assert!(non_negative(&Decimal::from_str("0.01").unwrap()).is_ok());
        assert!(non_negative(&Decimal::from_str("-0.01").unwrap()).is_err());
    }

    #[test]
    fn test_codes() {
        assert!(validate_country_code("AE").is_ok());
        assert!(validate_country_code("ARE").is_err());
        assert!(validate_currency_code("USD").is_ok());
        assert!(validate_currency_code("US").is_err());
    }

    #[test]
    fn test_trim_opt() {
        assert_eq!(trim_opt(Some("  a ")), Some("a".to_string()));
        assert_eq!(trim_opt(Some("   ")), None);
        assert_eq!(trim_opt(None), None);
    }
}
