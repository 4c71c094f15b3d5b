//! Order Model: orders, items, status machines and totals

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::non_negative;
use crate::error::{AppError, AppResult, ErrorCode};

/// Length of the human-facing order number
pub const ORDER_NUMBER_LEN: usize = 6;
const MONEY_DP: u32 = 2;

text_enum! {
    pub enum OrderStatus {
        Pending => "pending",
        Placed => "placed",
        ReadyForShipment => "ready_for_shipment",
        Shipped => "shipped",
        Fulfilled => "fulfilled",
        Cancelled => "cancelled",
        Returned => "returned",
    }
}

text_enum! {
    pub enum PaymentStatus {
        Pending => "pending",
        Paid => "paid",
        Failed => "failed",
        Refunded => "refunded",
    }
}

text_enum! {
    pub enum PaymentMethod {
        CreditCard => "credit_card",
        Paypal => "paypal",
        BankTransfer => "bank_transfer",
        CashOnDelivery => "cash_on_delivery",
        Tamara => "tamara",
        Tabby => "tabby",
    }
}

text_enum! {
    pub enum DiscountType {
        Amount => "amount",
        Percent => "percent",
    }
}

impl OrderStatus {
    pub fn allowed_transitions(&self) -> &'static [OrderStatus] {
        use OrderStatus::*;
        match self {
            Pending => &[Placed, Cancelled],
            Placed => &[ReadyForShipment, Shipped, Cancelled],
            ReadyForShipment => &[Shipped, Cancelled],
            Shipped => &[Fulfilled],
            Fulfilled => &[Returned],
            Cancelled | Returned => &[],
        }
    }

    pub fn can_transition_to(&self, target: OrderStatus) -> bool {
        self.allowed_transitions().contains(&target)
    }

    /// Entering this status puts the order's items back into stock.
    pub fn restocks(&self) -> bool {
        matches!(self, OrderStatus::Cancelled | OrderStatus::Returned)
    }

    /// Column stamped when the order enters this status
    pub fn timestamp_column(&self) -> Option<&'static str> {
        match self {
            OrderStatus::Pending => None,
            OrderStatus::Placed => Some("placed_at"),
            OrderStatus::ReadyForShipment => Some("ready_for_shipment_at"),
            OrderStatus::Shipped => Some("shipped_at"),
            OrderStatus::Fulfilled => Some("fulfilled_at"),
            OrderStatus::Cancelled => Some("cancelled_at"),
            OrderStatus::Returned => Some("returned_at"),
        }
    }

    /// Payment status may only move while the order is live.
    pub fn accepts_payment_updates(&self) -> bool {
        matches!(
            self,
            OrderStatus::Placed
                | OrderStatus::ReadyForShipment
                | OrderStatus::Shipped
                | OrderStatus::Fulfilled
        )
    }

    /// Orders can only be deleted before they are placed or once cancelled.
    pub fn is_deletable(&self) -> bool {
        matches!(self, OrderStatus::Pending | OrderStatus::Cancelled)
    }

    /// Counted towards revenue and COGS
    pub fn counts_as_revenue(&self) -> bool {
        !matches!(self, OrderStatus::Cancelled | OrderStatus::Returned)
    }
}

impl PaymentStatus {
    pub fn allowed_transitions(&self) -> &'static [PaymentStatus] {
        use PaymentStatus::*;
        match self {
            Pending => &[Paid, Failed],
            Paid => &[Refunded],
            Failed => &[Pending],
            Refunded => &[],
        }
    }

    pub fn can_transition_to(&self, target: PaymentStatus) -> bool {
        self.allowed_transitions().contains(&target)
    }

    pub fn timestamp_column(&self) -> Option<&'static str> {
        match self {
            PaymentStatus::Pending => None,
            PaymentStatus::Paid => Some("paid_at"),
            PaymentStatus::Failed => Some("failed_at"),
            PaymentStatus::Refunded => Some("refunded_at"),
        }
    }
}

/// Check an order status change, producing the API error on rejection.
pub fn check_order_transition(from: OrderStatus, to: OrderStatus) -> AppResult<()> {
    if from.can_transition_to(to) {
        return Ok(());
    }
    Err(AppError::new(ErrorCode::OrderInvalidStatusTransition)
        .with_detail("from", from.as_db())
        .with_detail("to", to.as_db()))
}

/// Check a payment status change against both machines.
pub fn check_payment_transition(
    order_status: OrderStatus,
    from: PaymentStatus,
    to: PaymentStatus,
) -> AppResult<()> {
    if !from.can_transition_to(to) {
        return Err(AppError::new(ErrorCode::OrderInvalidPaymentTransition)
            .with_detail("from", from.as_db())
            .with_detail("to", to.as_db()));
    }
    if !order_status.accepts_payment_updates() {
        return Err(AppError::new(ErrorCode::OrderPaymentNotAllowed)
            .with_detail("orderStatus", order_status.as_db())
            .with_detail("to", to.as_db()));
    }
    Ok(())
}

/// Order entity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    pub business_id: String,
    pub order_number: String,
    pub customer_id: String,
    pub shipping_address_id: String,
    pub channel: String,
    pub subtotal: Decimal,
    pub vat: Decimal,
    pub vat_rate: Decimal,
    pub shipping_fee: Decimal,
    pub discount: Decimal,
    pub discount_type: Option<DiscountType>,
    pub discount_value: Option<Decimal>,
    pub cogs: Decimal,
    pub total: Decimal,
    pub currency: String,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub payment_method: PaymentMethod,
    pub payment_reference: Option<String>,
    pub note: Option<String>,
    pub ordered_at: i64,
    pub placed_at: Option<i64>,
    pub ready_for_shipment_at: Option<i64>,
    pub shipped_at: Option<i64>,
    pub fulfilled_at: Option<i64>,
    pub cancelled_at: Option<i64>,
    pub returned_at: Option<i64>,
    pub paid_at: Option<i64>,
    pub failed_at: Option<i64>,
    pub refunded_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
    /// Present on detail responses
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<OrderItem>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: String,
    pub order_id: String,
    pub product_id: String,
    pub variant_id: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub unit_cost: Decimal,
    pub total: Decimal,
    pub total_cost: Decimal,
    pub currency: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemInput {
    #[validate(length(min = 1))]
    pub variant_id: String,
    #[validate(range(min = 1))]
    pub quantity: i32,
    pub unit_price: Decimal,
    /// Defaults to the variant's cost price
    #[validate(custom(function = "non_negative"))]
    pub unit_cost: Option<Decimal>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct OrderCreate {
    #[validate(length(min = 1))]
    pub customer_id: String,
    #[validate(length(min = 1))]
    pub shipping_address_id: String,
    #[validate(length(min = 1, max = 64))]
    pub channel: String,
    #[validate(custom(function = "non_negative"))]
    pub shipping_fee: Option<Decimal>,
    pub discount_type: Option<DiscountType>,
    #[validate(custom(function = "non_negative"))]
    pub discount_value: Option<Decimal>,
    /// Defaults to bank transfer
    pub payment_method: Option<PaymentMethod>,
    #[validate(length(max = 255))]
    pub payment_reference: Option<String>,
    #[validate(length(max = 2000))]
    pub note: Option<String>,
    /// Epoch milliseconds, defaults to now
    pub ordered_at: Option<i64>,
    #[validate(nested)]
    pub items: Vec<OrderItemInput>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrderStatusUpdate {
    pub status: OrderStatus,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct OrderPaymentStatusUpdate {
    pub payment_status: PaymentStatus,
    pub payment_method: Option<PaymentMethod>,
    #[validate(length(max = 255))]
    pub payment_reference: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub payment_status: Option<PaymentStatus>,
    pub customer_id: Option<String>,
    /// Inclusive `ordered_at` bounds, epoch milliseconds
    pub from: Option<i64>,
    pub to: Option<i64>,
}

/// Priced line fed into [`compute_totals`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricedLine {
    pub quantity: i32,
    pub unit_price: Decimal,
    pub unit_cost: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineTotals {
    pub unit_price: Decimal,
    pub unit_cost: Decimal,
    pub total: Decimal,
    pub total_cost: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderTotals {
    pub lines: Vec<LineTotals>,
    pub subtotal: Decimal,
    pub cogs: Decimal,
    pub vat: Decimal,
    pub shipping_fee: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
}

/// Half-up (away from zero) to cents
fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(MONEY_DP, RoundingStrategy::MidpointAwayFromZero)
}

/// Money totals of an order, all rounded to two decimals.
///
/// `total = subtotal + vat + shipping - discount`, where `vat = subtotal * vat_rate`
/// and a percent discount applies to the subtotal.
pub fn compute_totals(
    lines: &[PricedLine],
    vat_rate: Decimal,
    shipping_fee: Decimal,
    discount: Option<(DiscountType, Decimal)>,
) -> AppResult<OrderTotals> {
    if lines.is_empty() {
        return Err(AppError::new(ErrorCode::OrderEmpty));
    }

    let mut priced = Vec::with_capacity(lines.len());
    for line in lines {
        if line.quantity < 1 {
            return Err(AppError::with_message(
                ErrorCode::OrderInvalidItem,
                "quantity must be at least 1",
            ));
        }
        if line.unit_price <= Decimal::ZERO {
            return Err(AppError::with_message(
                ErrorCode::OrderInvalidItem,
                "unitPrice must be greater than zero",
            ));
        }
        if line.unit_cost < Decimal::ZERO {
            return Err(AppError::with_message(
                ErrorCode::OrderInvalidItem,
                "unitCost cannot be negative",
            ));
        }
        let qty = Decimal::from(line.quantity);
        priced.push(LineTotals {
            unit_price: round_money(line.unit_price),
            unit_cost: round_money(line.unit_cost),
            total: round_money(line.unit_price * qty),
            total_cost: round_money(line.unit_cost * qty),
        });
    }

    let subtotal = round_money(priced.iter().map(|l| l.total).sum());
    let cogs = round_money(priced.iter().map(|l| l.total_cost).sum());
    let vat = round_money(subtotal * vat_rate);
    let shipping_fee = round_money(shipping_fee);

    let discount = match discount {
        None => Decimal::ZERO,
        Some((_, value)) if value < Decimal::ZERO => {
            return Err(AppError::validation("discountValue cannot be negative"));
        }
        Some((DiscountType::Amount, value)) => round_money(value),
        Some((DiscountType::Percent, value)) => {
            if value > Decimal::ONE_HUNDRED {
                return Err(AppError::validation("percent discount cannot exceed 100"));
            }
            round_money(subtotal * value / Decimal::ONE_HUNDRED)
        }
    };

    let total = round_money(subtotal + vat + shipping_fee - discount);
    if total < Decimal::ZERO {
        return Err(AppError::validation("discount exceeds the order total"));
    }

    Ok(OrderTotals {
        lines: priced,
        subtotal,
        cogs,
        vat,
        shipping_fee,
        discount,
        total,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn line(quantity: i32, price: &str, cost: &str) -> PricedLine {
        PricedLine {
            quantity,
            unit_price: dec(price),
            unit_cost: dec(cost),
        }
    }

    #[test]
    fn test_order_status_machine() {
        use OrderStatus::*;
        assert!(Pending.can_transition_to(Placed));
        assert!(Placed.can_transition_to(Shipped));
        assert!(ReadyForShipment.can_transition_to(Cancelled));
        assert!(!Shipped.can_transition_to(Cancelled));
        assert!(Fulfilled.can_transition_to(Returned));
        assert!(Cancelled.allowed_transitions().is_empty());
        assert!(Returned.allowed_transitions().is_empty());
        assert!(Cancelled.restocks() && Returned.restocks() && !Shipped.restocks());
    }

    #[test]
    fn test_order_transition_error_carries_states() {
        let err = check_order_transition(OrderStatus::Shipped, OrderStatus::Pending).unwrap_err();
        assert_eq!(err.code, ErrorCode::OrderInvalidStatusTransition);
        let details = err.details.unwrap();
        assert_eq!(details["from"], "shipped");
        assert_eq!(details["to"], "pending");
    }

    #[test]
    fn test_payment_machine_gated_on_order_status() {
        assert!(check_payment_transition(OrderStatus::Placed, PaymentStatus::Pending, PaymentStatus::Paid).is_ok());
        let err = check_payment_transition(OrderStatus::Pending, PaymentStatus::Pending, PaymentStatus::Paid)
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::OrderPaymentNotAllowed);
        let err = check_payment_transition(OrderStatus::Shipped, PaymentStatus::Refunded, PaymentStatus::Paid)
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::OrderInvalidPaymentTransition);
        assert!(PaymentStatus::Failed.can_transition_to(PaymentStatus::Pending));
    }

    #[test]
    fn test_compute_totals() {
        let totals = compute_totals(
            &[line(2, "19.99", "8.50"), line(1, "5", "2.125")],
            dec("0.05"),
            dec("10"),
            Some((DiscountType::Percent, dec("10"))),
        )
        .unwrap();
        assert_eq!(totals.subtotal, dec("44.98"));
        assert_eq!(totals.cogs, dec("19.13"));
        assert_eq!(totals.vat, dec("2.25"));
        assert_eq!(totals.discount, dec("4.50"));
        assert_eq!(totals.total, dec("52.73"));
        assert_eq!(totals.lines[1].unit_cost, dec("2.13"));
    }

    #[test]
    fn test_compute_totals_amount_discount_and_errors() {
        let totals = compute_totals(
            &[line(1, "100", "60")],
            Decimal::ZERO,
            Decimal::ZERO,
            Some((DiscountType::Amount, dec("15"))),
        )
        .unwrap();
        assert_eq!(totals.total, dec("85"));

        assert_eq!(
            compute_totals(&[], Decimal::ZERO, Decimal::ZERO, None).unwrap_err().code,
            ErrorCode::OrderEmpty
        );
        assert_eq!(
            compute_totals(&[line(1, "0", "0")], Decimal::ZERO, Decimal::ZERO, None)
                .unwrap_err()
                .code,
            ErrorCode::OrderInvalidItem
        );
        assert!(
            compute_totals(
                &[line(1, "10", "1")],
                Decimal::ZERO,
                Decimal::ZERO,
                Some((DiscountType::Amount, dec("11")))
            )
            .is_err()
        );
    }

    #[test]
    fn test_order_create_requires_positive_quantity() {
        let req: OrderCreate = serde_json::from_str(
            r#"{"customerId":"cus_1","shippingAddressId":"addr_1","channel":"instagram",
                "items":[{"variantId":"var_1","quantity":0,"unitPrice":"10"}]}"#,
        )
        .unwrap();
        assert!(req.validate().is_err());
        assert_eq!(req.payment_method, None);
    }
}
