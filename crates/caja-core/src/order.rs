//! # Order Types
//!
//! The durable order record, its line items, and the payment status
//! state machine.

use crate::error::{PaymentError, PaymentResult};
use crate::money::{Currency, Money};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A line item in an order.
///
/// The unit price is snapshotted at order creation and decoupled from the
/// live catalog price.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineItem {
    /// Product ID
    pub product_id: String,

    /// Product name (denormalized for provider display)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Unit price at time of purchase
    pub unit_price: Money,

    /// Quantity (must be positive)
    pub quantity: u32,
}

impl LineItem {
    pub fn new(product_id: impl Into<String>, unit_price: Money, quantity: u32) -> Self {
        Self {
            product_id: product_id.into(),
            name: None,
            unit_price,
            quantity,
        }
    }

    /// Builder: set the display name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Total for this line (unit price x quantity)
    pub fn total(&self) -> PaymentResult<Money> {
        self.unit_price.checked_mul(self.quantity).ok_or_else(|| {
            PaymentError::InvalidInput(format!(
                "line item {} total overflows",
                self.product_id
            ))
        })
    }
}

/// Order lifecycle status.
///
/// `pending` -> `pending_payment` once a gateway session is attached, then a
/// webhook drives it to `paid`, `cancelled`, or `failed`. Fulfillment moves
/// `paid` onward to `shipped` and `completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Created, no gateway session yet
    Pending,
    /// A gateway session exists, awaiting the provider's outcome
    PendingPayment,
    /// Payment confirmed by a gateway webhook
    Paid,
    /// Cancelled or rejected by the gateway
    Cancelled,
    /// Payment attempt failed
    Failed,
    /// Handed to fulfillment
    Shipped,
    /// Delivered
    Completed,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::PendingPayment => "pending_payment",
            OrderStatus::Paid => "paid",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Failed => "failed",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Completed => "completed",
        }
    }

    /// Payment outcome is still undecided
    pub fn is_payment_open(&self) -> bool {
        matches!(self, OrderStatus::Pending | OrderStatus::PendingPayment)
    }

    /// Payment has settled successfully; later webhooks are no-ops
    pub fn is_payment_settled(&self) -> bool {
        matches!(
            self,
            OrderStatus::Paid | OrderStatus::Shipped | OrderStatus::Completed
        )
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Payment outcome claimed by an incoming webhook, normalized across
/// providers. The provider-specific string mapping lives in each adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimedOutcome {
    /// Payment approved/collected
    Approved,
    /// Rejected or cancelled by the customer or the provider
    Rejected,
    /// The attempt failed
    Failed,
    /// Still in flight on the provider side
    Pending,
}

impl ClaimedOutcome {
    /// The order status this claim maps to
    pub fn target_status(&self) -> OrderStatus {
        match self {
            ClaimedOutcome::Approved => OrderStatus::Paid,
            ClaimedOutcome::Rejected => OrderStatus::Cancelled,
            ClaimedOutcome::Failed => OrderStatus::Failed,
            ClaimedOutcome::Pending => OrderStatus::PendingPayment,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ClaimedOutcome::Approved => "approved",
            ClaimedOutcome::Rejected => "rejected",
            ClaimedOutcome::Failed => "failed",
            ClaimedOutcome::Pending => "pending",
        }
    }
}

impl std::fmt::Display for ClaimedOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Payment method chosen at checkout. Each gateway recognizes a subset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Credit/debit card
    Card,
    /// PSE bank transfer
    Pse,
    /// Efecty cash voucher
    Efecty,
    /// Provider-hosted wallet
    Wallet,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Card => "card",
            PaymentMethod::Pse => "pse",
            PaymentMethod::Efecty => "efecty",
            PaymentMethod::Wallet => "wallet",
        }
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Customer contact data forwarded to gateways (PSE needs the bank and
/// document fields; the rest is prefill).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CustomerInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bank: Option<String>,
}

/// A durable order record. Created exactly once per checkout attempt,
/// never deleted, only transitioned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    /// Unique order ID (generated)
    pub id: String,

    /// Owning user reference
    pub user_id: String,

    /// Line items (snapshotted prices)
    pub items: Vec<LineItem>,

    /// Frozen total; equals the sum of unit_price x quantity at creation
    pub total: Money,

    /// Lifecycle status
    pub status: OrderStatus,

    /// Gateway that holds the live session, once one is attached
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,

    /// Provider-assigned reference correlating later webhooks
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_reference: Option<String>,

    /// Redirect URL handed to the client
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_url: Option<String>,

    /// Created timestamp
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Build a new `pending` order, computing and freezing the total.
    ///
    /// Fails with `InvalidInput` if `items` is empty, any quantity is zero,
    /// or the items mix currencies.
    pub fn new(user_id: impl Into<String>, items: Vec<LineItem>) -> PaymentResult<Self> {
        let total = Self::compute_total(&items)?;
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            items,
            total,
            status: OrderStatus::Pending,
            provider: None,
            provider_reference: None,
            payment_url: None,
            created_at: Utc::now(),
        })
    }

    fn compute_total(items: &[LineItem]) -> PaymentResult<Money> {
        if items.is_empty() {
            return Err(PaymentError::InvalidInput("order has no items".to_string()));
        }

        let currency = items[0].unit_price.currency;
        let mut total = Money::zero(currency);
        for item in items {
            if item.quantity == 0 {
                return Err(PaymentError::InvalidInput(format!(
                    "line item {} has zero quantity",
                    item.product_id
                )));
            }
            if item.unit_price.minor_units < 0 {
                return Err(PaymentError::InvalidInput(format!(
                    "line item {} has a negative unit price",
                    item.product_id
                )));
            }
            total = total.checked_add(item.total()?).ok_or_else(|| {
                PaymentError::InvalidInput(format!(
                    "line item {} mixes currencies or overflows the total",
                    item.product_id
                ))
            })?;
        }
        Ok(total)
    }

    /// Total item count across all lines
    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|i| i.quantity).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, price: i64, qty: u32) -> LineItem {
        LineItem::new(id, Money::from_minor(price, Currency::COP), qty)
    }

    #[test]
    fn test_total_frozen_at_creation() {
        let order = Order::new("user-1", vec![item("p1", 1000, 2), item("p2", 2500, 1)]).unwrap();

        assert_eq!(order.total.minor_units, 4500);
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.item_count(), 3);
        assert!(order.provider_reference.is_none());
    }

    #[test]
    fn test_rejects_empty_and_zero_quantity() {
        assert!(matches!(
            Order::new("user-1", vec![]),
            Err(PaymentError::InvalidInput(_))
        ));
        assert!(matches!(
            Order::new("user-1", vec![item("p1", 1000, 0)]),
            Err(PaymentError::InvalidInput(_))
        ));
        assert!(matches!(
            Order::new("user-1", vec![item("p1", -5, 1)]),
            Err(PaymentError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_rejects_mixed_currencies() {
        let usd = LineItem::new("p2", Money::from_minor(100, Currency::USD), 1);
        assert!(matches!(
            Order::new("user-1", vec![item("p1", 1000, 1), usd]),
            Err(PaymentError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_claimed_outcome_targets() {
        assert_eq!(ClaimedOutcome::Approved.target_status(), OrderStatus::Paid);
        assert_eq!(
            ClaimedOutcome::Rejected.target_status(),
            OrderStatus::Cancelled
        );
        assert_eq!(ClaimedOutcome::Failed.target_status(), OrderStatus::Failed);
        assert_eq!(
            ClaimedOutcome::Pending.target_status(),
            OrderStatus::PendingPayment
        );
    }

    #[test]
    fn test_status_classification() {
        assert!(OrderStatus::Pending.is_payment_open());
        assert!(OrderStatus::PendingPayment.is_payment_open());
        assert!(OrderStatus::Paid.is_payment_settled());
        assert!(OrderStatus::Shipped.is_payment_settled());
        assert!(!OrderStatus::Cancelled.is_payment_settled());
        assert!(!OrderStatus::Cancelled.is_payment_open());
    }
}
