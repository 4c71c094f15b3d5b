//! Unified error codes for kyora
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 1xxx: Authentication / account errors
//! - 2xxx: Permission errors
//! - 3xxx: Business (tenant) errors
//! - 4xxx: Order errors
//! - 5xxx: Accounting errors
//! - 6xxx: Inventory errors
//! - 7xxx: Customer errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// Serialized as its numeric value; Problem bodies expose the stable
/// dot-namespaced [`ErrorCode::key`] instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Unknown error
    Unknown = 1,
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Resource already exists / constraint conflict
    Conflict = 4,
    /// Invalid request
    InvalidRequest = 5,
    /// Too many requests
    RateLimited = 6,

    // ==================== 1xxx: Auth ====================
    /// User is not authenticated
    NotAuthenticated = 1001,
    /// Invalid credentials (email/password)
    InvalidCredentials = 1002,
    /// Token has expired
    TokenExpired = 1003,
    /// Token is invalid
    TokenInvalid = 1004,
    /// Refresh token unknown, revoked or expired
    RefreshTokenInvalid = 1005,
    /// Email is already registered
    EmailAlreadyRegistered = 1006,
    /// Password too short
    PasswordTooShort = 1007,
    /// User not found in the workspace
    UserNotFound = 1008,

    // ==================== 2xxx: Permission ====================
    /// Permission denied
    PermissionDenied = 2001,

    // ==================== 3xxx: Business ====================
    /// Business not found (or not in the caller's workspace)
    BusinessNotFound = 3001,
    /// Business descriptor already used in the workspace
    BusinessDescriptorTaken = 3002,
    /// Business descriptor has an invalid format
    BusinessDescriptorInvalid = 3003,
    /// Business is archived
    BusinessArchived = 3004,

    // ==================== 4xxx: Order ====================
    /// Order not found
    OrderNotFound = 4001,
    /// Order has no items
    OrderEmpty = 4002,
    /// Order status transition not allowed
    OrderInvalidStatusTransition = 4003,
    /// Payment status transition not allowed
    OrderInvalidPaymentTransition = 4004,
    /// Payment status cannot change in the current order status
    OrderPaymentNotAllowed = 4005,
    /// Order cannot be deleted in its current status
    OrderCannotBeDeleted = 4006,
    /// Not enough stock for an order item
    InsufficientStock = 4007,
    /// Could not allocate a unique order number
    OrderNumberGenerationFailed = 4008,
    /// Invalid order item
    OrderInvalidItem = 4009,

    // ==================== 5xxx: Accounting ====================
    /// Expense not found
    ExpenseNotFound = 5001,
    /// Amount must be positive
    InvalidAmount = 5002,
    /// Recurring expense not found
    RecurringExpenseNotFound = 5101,
    /// Recurring expense amount must be positive
    RecurringExpenseInvalidAmount = 5102,
    /// Recurring expense status transition not allowed
    RecurringExpenseInvalidStatusTransition = 5103,
    /// Recurring expense end date precedes its start date
    RecurringExpenseInvalidDates = 5104,
    /// Asset not found
    AssetNotFound = 5201,
    /// Investment not found
    InvestmentNotFound = 5301,
    /// Withdrawal not found
    WithdrawalNotFound = 5401,

    // ==================== 6xxx: Inventory ====================
    /// Product not found
    ProductNotFound = 6001,
    /// Too many product photos
    ProductTooManyPhotos = 6002,
    /// Product needs at least one variant
    ProductNoVariants = 6003,
    /// Variant not found
    VariantNotFound = 6101,
    /// Variant SKU already used in the business
    VariantSkuExists = 6102,
    /// Variant code already used in the product
    VariantCodeExists = 6103,
    /// Last variant of a product cannot be deleted
    VariantIsLast = 6104,
    /// Category not found
    CategoryNotFound = 6201,
    /// Category descriptor already used in the business
    CategoryDescriptorExists = 6202,
    /// Category still has products
    CategoryHasProducts = 6203,

    // ==================== 7xxx: Customer ====================
    /// Customer not found
    CustomerNotFound = 7001,
    /// Customer email already used in the business
    CustomerEmailExists = 7002,
    /// Customer address not found
    AddressNotFound = 7101,

    // ==================== 9xxx: System ====================
    /// Internal server error
    InternalError = 9001,
    /// Database error
    DatabaseError = 9002,
    /// Configuration error
    ConfigError = 9005,
}

/// Every error code, in declaration order
pub const ALL_ERROR_CODES: &[ErrorCode] = &[
    ErrorCode::Unknown,
    ErrorCode::ValidationFailed,
    ErrorCode::NotFound,
    ErrorCode::Conflict,
    ErrorCode::InvalidRequest,
    ErrorCode::RateLimited,
    ErrorCode::NotAuthenticated,
    ErrorCode::InvalidCredentials,
    ErrorCode::TokenExpired,
    ErrorCode::TokenInvalid,
    ErrorCode::RefreshTokenInvalid,
    ErrorCode::EmailAlreadyRegistered,
    ErrorCode::PasswordTooShort,
    ErrorCode::UserNotFound,
    ErrorCode::PermissionDenied,
    ErrorCode::BusinessNotFound,
    ErrorCode::BusinessDescriptorTaken,
    ErrorCode::BusinessDescriptorInvalid,
    ErrorCode::BusinessArchived,
    ErrorCode::OrderNotFound,
    ErrorCode::OrderEmpty,
    ErrorCode::OrderInvalidStatusTransition,
    ErrorCode::OrderInvalidPaymentTransition,
    ErrorCode::OrderPaymentNotAllowed,
    ErrorCode::OrderCannotBeDeleted,
    ErrorCode::InsufficientStock,
    ErrorCode::OrderNumberGenerationFailed,
    ErrorCode::OrderInvalidItem,
    ErrorCode::ExpenseNotFound,
    ErrorCode::InvalidAmount,
    ErrorCode::RecurringExpenseNotFound,
    ErrorCode::RecurringExpenseInvalidAmount,
    ErrorCode::RecurringExpenseInvalidStatusTransition,
    ErrorCode::RecurringExpenseInvalidDates,
    ErrorCode::AssetNotFound,
    ErrorCode::InvestmentNotFound,
    ErrorCode::WithdrawalNotFound,
    ErrorCode::ProductNotFound,
    ErrorCode::ProductTooManyPhotos,
    ErrorCode::ProductNoVariants,
    ErrorCode::VariantNotFound,
    ErrorCode::VariantSkuExists,
    ErrorCode::VariantCodeExists,
    ErrorCode::VariantIsLast,
    ErrorCode::CategoryNotFound,
    ErrorCode::CategoryDescriptorExists,
    ErrorCode::CategoryHasProducts,
    ErrorCode::CustomerNotFound,
    ErrorCode::CustomerEmailExists,
    ErrorCode::AddressNotFound,
    ErrorCode::InternalError,
    ErrorCode::DatabaseError,
    ErrorCode::ConfigError,
];

/// Error when converting an invalid u16 to ErrorCode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl ErrorCode {
    /// Get the numeric code value
    pub fn code(&self) -> u16 {
        *self as u16
    }

    /// Stable machine-readable key (`<domain>.<reason>`)
    pub fn key(&self) -> &'static str {
        match self {
            Self::Unknown => "general.unknown",
            Self::ValidationFailed => "general.validation_failed",
            Self::NotFound => "general.not_found",
            Self::Conflict => "general.conflict",
            Self::InvalidRequest => "general.invalid_request",
            Self::RateLimited => "general.rate_limited",

            Self::NotAuthenticated => "auth.not_authenticated",
            Self::InvalidCredentials => "auth.invalid_credentials",
            Self::TokenExpired => "auth.token_expired",
            Self::TokenInvalid => "auth.token_invalid",
            Self::RefreshTokenInvalid => "auth.refresh_token_invalid",
            Self::EmailAlreadyRegistered => "account.email_already_registered",
            Self::PasswordTooShort => "account.password_too_short",
            Self::UserNotFound => "account.user_not_found",

            Self::PermissionDenied => "permission.denied",

            Self::BusinessNotFound => "business.not_found",
            Self::BusinessDescriptorTaken => "business.descriptor_taken",
            Self::BusinessDescriptorInvalid => "business.descriptor_invalid",
            Self::BusinessArchived => "business.archived",

            Self::OrderNotFound => "order.not_found",
            Self::OrderEmpty => "order.empty",
            Self::OrderInvalidStatusTransition => "order.invalid_status_transition",
            Self::OrderInvalidPaymentTransition => "order.invalid_payment_status_transition",
            Self::OrderPaymentNotAllowed => "order.payment_status_not_allowed",
            Self::OrderCannotBeDeleted => "order.cannot_be_deleted",
            Self::InsufficientStock => "order.insufficient_stock",
            Self::OrderNumberGenerationFailed => "order.number_generation_failed",
            Self::OrderInvalidItem => "order.invalid_item",

            Self::ExpenseNotFound => "expense.not_found",
            Self::InvalidAmount => "accounting.invalid_amount",
            Self::RecurringExpenseNotFound => "recurring_expense.not_found",
            Self::RecurringExpenseInvalidAmount => "recurring_expense.invalid_amount",
            Self::RecurringExpenseInvalidStatusTransition => {
                "recurring_expense.invalid_status_transition"
            }
            Self::RecurringExpenseInvalidDates => "recurring_expense.invalid_dates",
            Self::AssetNotFound => "asset.not_found",
            Self::InvestmentNotFound => "investment.not_found",
            Self::WithdrawalNotFound => "withdrawal.not_found",

            Self::ProductNotFound => "product.not_found",
            Self::ProductTooManyPhotos => "product.too_many_photos",
            Self::ProductNoVariants => "product.no_variants",
            Self::VariantNotFound => "variant.not_found",
            Self::VariantSkuExists => "variant.sku_exists",
            Self::VariantCodeExists => "variant.code_exists",
            Self::VariantIsLast => "variant.is_last",
            Self::CategoryNotFound => "category.not_found",
            Self::CategoryDescriptorExists => "category.descriptor_exists",
            Self::CategoryHasProducts => "category.has_products",

            Self::CustomerNotFound => "customer.not_found",
            Self::CustomerEmailExists => "customer.email_exists",
            Self::AddressNotFound => "customer_address.not_found",

            Self::InternalError => "system.internal_error",
            Self::DatabaseError => "system.database_error",
            Self::ConfigError => "system.config_error",
        }
    }

    /// Default human-readable message
    pub fn message(&self) -> &'static str {
        match self {
            Self::Unknown => "Unknown error",
            Self::ValidationFailed => "Validation failed",
            Self::NotFound => "Resource not found",
            Self::Conflict => "Resource already exists",
            Self::InvalidRequest => "Invalid request",
            Self::RateLimited => "Too many requests, try again later",

            Self::NotAuthenticated => "Authentication required",
            Self::InvalidCredentials => "Invalid email or password",
            Self::TokenExpired => "Token has expired",
            Self::TokenInvalid => "Invalid token",
            Self::RefreshTokenInvalid => "Refresh token is invalid or expired",
            Self::EmailAlreadyRegistered => "Email is already registered",
            Self::PasswordTooShort => "Password must be at least 8 characters",
            Self::UserNotFound => "User not found",

            Self::PermissionDenied => "Permission denied",

            Self::BusinessNotFound => "Business not found",
            Self::BusinessDescriptorTaken => "Business descriptor is already taken",
            Self::BusinessDescriptorInvalid => "Business descriptor is invalid",
            Self::BusinessArchived => "Business is archived",

            Self::OrderNotFound => "Order not found",
            Self::OrderEmpty => "Order must contain at least one item",
            Self::OrderInvalidStatusTransition => "Invalid order status transition",
            Self::OrderInvalidPaymentTransition => "Invalid payment status transition",
            Self::OrderPaymentNotAllowed => "Payment status cannot change in the current order status",
            Self::OrderCannotBeDeleted => "Only pending or cancelled orders can be deleted",
            Self::InsufficientStock => "Insufficient stock",
            Self::OrderNumberGenerationFailed => "Failed to generate a unique order number",
            Self::OrderInvalidItem => "Invalid order item",

            Self::ExpenseNotFound => "Expense not found",
            Self::InvalidAmount => "Amount must be greater than zero",
            Self::RecurringExpenseNotFound => "Recurring expense not found",
            Self::RecurringExpenseInvalidAmount => {
                "recurring expense amount must be greater than zero"
            }
            Self::RecurringExpenseInvalidStatusTransition => "invalid status transition",
            Self::RecurringExpenseInvalidDates => {
                "recurring end date must not be before the start date"
            }
            Self::AssetNotFound => "Asset not found",
            Self::InvestmentNotFound => "Investment not found",
            Self::WithdrawalNotFound => "Withdrawal not found",

            Self::ProductNotFound => "Product not found",
            Self::ProductTooManyPhotos => "A product can have at most 10 photos",
            Self::ProductNoVariants => "A product needs at least one variant",
            Self::VariantNotFound => "Variant not found",
            Self::VariantSkuExists => "Variant SKU already exists",
            Self::VariantCodeExists => "Variant code already exists for this product",
            Self::VariantIsLast => "Cannot delete the last variant of a product",
            Self::CategoryNotFound => "Category not found",
            Self::CategoryDescriptorExists => "Category descriptor already exists",
            Self::CategoryHasProducts => "Category still has products",

            Self::CustomerNotFound => "Customer not found",
            Self::CustomerEmailExists => "Customer email already exists",
            Self::AddressNotFound => "Customer address not found",

            Self::InternalError => "Internal server error",
            Self::DatabaseError => "Database error",
            Self::ConfigError => "Configuration error",
        }
    }
}

impl From<ErrorCode> for u16 {
    fn from(code: ErrorCode) -> Self {
        code as u16
    }
}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        ALL_ERROR_CODES
            .iter()
            .copied()
            .find(|c| c.code() == value)
            .ok_or(InvalidErrorCode(value))
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_error_code_values() {
        assert_eq!(ErrorCode::ValidationFailed.code(), 2);
        assert_eq!(ErrorCode::NotFound.code(), 3);
        assert_eq!(ErrorCode::NotAuthenticated.code(), 1001);
        assert_eq!(ErrorCode::PermissionDenied.code(), 2001);
        assert_eq!(ErrorCode::BusinessNotFound.code(), 3001);
        assert_eq!(ErrorCode::OrderNotFound.code(), 4001);
        assert_eq!(ErrorCode::ExpenseNotFound.code(), 5001);
        assert_eq!(ErrorCode::RecurringExpenseInvalidStatusTransition.code(), 5103);
        assert_eq!(ErrorCode::ProductNotFound.code(), 6001);
        assert_eq!(ErrorCode::CustomerNotFound.code(), 7001);
        assert_eq!(ErrorCode::InternalError.code(), 9001);
    }

    #[test]
    fn test_try_from_round_trips_every_code() {
        for code in ALL_ERROR_CODES {
            assert_eq!(ErrorCode::try_from(code.code()), Ok(*code));
        }
        assert_eq!(ErrorCode::try_from(4242), Err(InvalidErrorCode(4242)));
    }

    #[test]
    fn test_keys_are_unique_and_namespaced() {
        let mut seen = HashSet::new();
        for code in ALL_ERROR_CODES {
            let key = code.key();
            assert!(key.contains('.'), "{key} is not namespaced");
            assert!(seen.insert(key), "duplicate key {key}");
        }
    }

    #[test]
    fn test_display_uses_key() {
        assert_eq!(ErrorCode::OrderNotFound.to_string(), "order.not_found");
        assert_eq!(
            ErrorCode::RecurringExpenseInvalidStatusTransition.to_string(),
            "recurring_expense.invalid_status_transition"
        );
    }

    #[test]
    fn test_serde_numeric() {
        let json = serde_json::to_string(&ErrorCode::ExpenseNotFound).unwrap();
        assert_eq!(json, "5001");
        let code: ErrorCode = serde_json::from_str("6102").unwrap();
        assert_eq!(code, ErrorCode::VariantSkuExists);
        assert!(serde_json::from_str::<ErrorCode>("1234").is_err());
    }
}
