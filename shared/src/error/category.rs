//! Error category classification

use super::codes::ErrorCode;
use serde::{Deserialize, Serialize};

/// Error category classification based on error code ranges
///
/// Categories are determined by the leading digit of the error code:
/// - 0xxx: General errors
/// - 1xxx: Authentication / account errors
/// - 2xxx: Permission errors
/// - 3xxx: Business errors
/// - 4xxx: Order errors
/// - 5xxx: Accounting errors
/// - 6xxx: Inventory errors
/// - 7xxx: Customer errors
/// - 9xxx: System errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// General errors (0xxx)
    General,
    /// Authentication errors (1xxx)
    Auth,
    /// Permission errors (2xxx)
    Permission,
    /// Business errors (3xxx)
    Business,
    /// Order errors (4xxx)
    Order,
    /// Accounting errors (5xxx)
    Accounting,
    /// Inventory errors (6xxx)
    Inventory,
    /// Customer errors (7xxx)
    Customer,
    /// System errors (9xxx and anything unassigned)
    System,
}

impl ErrorCategory {
    /// Determine category from error code value
    pub fn from_code(code: u16) -> Self {
        match code {
            0..1000 => Self::General,
            1000..2000 => Self::Auth,
            2000..3000 => Self::Permission,
            3000..4000 => Self::Business,
            4000..5000 => Self::Order,
            5000..6000 => Self::Accounting,
            6000..7000 => Self::Inventory,
            7000..8000 => Self::Customer,
            _ => Self::System,
        }
    }

    /// Get the string name for this category
    pub fn name(&self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Auth => "auth",
            Self::Permission => "permission",
            Self::Business => "business",
            Self::Order => "order",
            Self::Accounting => "accounting",
            Self::Inventory => "inventory",
            Self::Customer => "customer",
            Self::System => "system",
        }
    }
}

impl ErrorCode {
    /// Get the category for this error code
    pub fn category(&self) -> ErrorCategory {
        ErrorCategory::from_code(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_from_code() {
        assert_eq!(ErrorCategory::from_code(2), ErrorCategory::General);
        assert_eq!(ErrorCategory::from_code(999), ErrorCategory::General);
        assert_eq!(ErrorCategory::from_code(1001), ErrorCategory::Auth);
        assert_eq!(ErrorCategory::from_code(2001), ErrorCategory::Permission);
        assert_eq!(ErrorCategory::from_code(3001), ErrorCategory::Business);
        assert_eq!(ErrorCategory::from_code(4001), ErrorCategory::Order);
        assert_eq!(ErrorCategory::from_code(5103), ErrorCategory::Accounting);
        assert_eq!(ErrorCategory::from_code(6201), ErrorCategory::Inventory);
        assert_eq!(ErrorCategory::from_code(7101), ErrorCategory::Customer);
        assert_eq!(ErrorCategory::from_code(8001), ErrorCategory::System);
        assert_eq!(ErrorCategory::from_code(9001), ErrorCategory::System);
    }

    #[test]
    fn test_error_code_category() {
        assert_eq!(ErrorCode::NotFound.category(), ErrorCategory::General);
        assert_eq!(ErrorCode::TokenExpired.category(), ErrorCategory::Auth);
        assert_eq!(
            ErrorCode::BusinessDescriptorTaken.category(),
            ErrorCategory::Business
        );
        assert_eq!(
            ErrorCode::RecurringExpenseNotFound.category(),
            ErrorCategory::Accounting
        );
        assert_eq!(
            ErrorCode::VariantSkuExists.category(),
            ErrorCategory::Inventory
        );
        assert_eq!(ErrorCode::AddressNotFound.category(), ErrorCategory::Customer);
        assert_eq!(ErrorCode::DatabaseError.category(), ErrorCategory::System);
    }

    #[test]
    fn test_category_serde() {
        let json = serde_json::to_string(&ErrorCategory::Accounting).unwrap();
        assert_eq!(json, "\"accounting\"");
        let category: ErrorCategory = serde_json::from_str("\"inventory\"").unwrap();
        assert_eq!(category, ErrorCategory::Inventory);
        assert_eq!(category.name(), "inventory");
    }
}
