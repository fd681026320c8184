use crate::domain::account::{Account, AccountId};
use crate::domain::money::Money;
use crate::domain::product::{Product, ProductId};
use crate::error::{EngineError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static ORDER_SEQUENCE: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(String);

impl OrderId {
    /// Generates a process-wide unique id: creation time plus a sequence number.
    pub fn generate(at: DateTime<Utc>) -> Self {
        let seq = ORDER_SEQUENCE.fetch_add(1, Ordering::Relaxed);
        Self(format!("ORD-{}-{:06}", at.timestamp_millis(), seq))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for OrderId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle of a submitted order.
///
/// Orders enter the engine `Queued`. The worker moves a queued order to
/// `Processing` and then to exactly one terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Queued,
    Processing,
    Completed,
    CompletedWithPaymentIssues,
    FailedCustomerNotFound,
    FailedProductNotFound,
    FailedInsufficientStock,
    FailedInsufficientFunds,
    FailedPaymentError,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Queued => "QUEUED",
            OrderStatus::Processing => "PROCESSING",
            OrderStatus::Completed => "COMPLETED",
            OrderStatus::CompletedWithPaymentIssues => "COMPLETED_WITH_PAYMENT_ISSUES",
            OrderStatus::FailedCustomerNotFound => "FAILED_CUSTOMER_NOT_FOUND",
            OrderStatus::FailedProductNotFound => "FAILED_PRODUCT_NOT_FOUND",
            OrderStatus::FailedInsufficientStock => "FAILED_INSUFFICIENT_STOCK",
            OrderStatus::FailedInsufficientFunds => "FAILED_INSUFFICIENT_FUNDS",
            OrderStatus::FailedPaymentError => "FAILED_PAYMENT_ERROR",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, OrderStatus::Queued | OrderStatus::Processing)
    }

    /// True when the customer was charged, with or without seller payment issues.
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            OrderStatus::Completed | OrderStatus::CompletedWithPaymentIssues
        )
    }

    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        match self {
            OrderStatus::Queued => next == OrderStatus::Processing,
            OrderStatus::Processing => next.is_terminal(),
            _ => false,
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One line of an order, with price and seller captured when it was added.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: Money,
    pub seller_id: AccountId,
}

impl OrderItem {
    pub fn line_total(&self) -> Result<Money> {
        self.unit_price.checked_times(self.quantity).ok_or_else(|| {
            EngineError::ValidationError(format!(
                "Line total for {} overflows ({} x {})",
                self.product_id, self.quantity, self.unit_price
            ))
        })
    }
}

fn checked_total(items: &[OrderItem]) -> Result<Money> {
    items.iter().try_fold(Money::ZERO, |total, item| {
        total.checked_add(item.line_total()?).ok_or_else(|| {
            EngineError::ValidationError("Order total overflows".to_string())
        })
    })
}

/// A customer's request to buy catalog items at captured prices.
///
/// An `Order` is mutable only while it is being built. Submitting it to the
/// engine moves it behind a shared handle where it can no longer change, and
/// since it cannot be cloned the same order cannot be submitted twice.
///
/// ```compile_fail
/// use order_engine::domain::order::Order;
///
/// let order = Order::new("alice");
/// let copy: Order = order.clone();
/// ```
#[derive(Debug, PartialEq)]
pub struct Order {
    id: OrderId,
    customer_id: AccountId,
    items: Vec<OrderItem>,
    total_amount: Money,
    submitted_at: DateTime<Utc>,
}

impl Order {
    pub fn new(customer_id: impl Into<AccountId>) -> Self {
        let now = Utc::now();
        Self {
            id: OrderId::generate(now),
            customer_id: customer_id.into(),
            items: Vec::new(),
            total_amount: Money::ZERO,
            submitted_at: now,
        }
    }

    /// Starts an order for `account`, refusing accounts that cannot buy.
    pub fn for_customer(account: &Account) -> Result<Self> {
        account.as_customer().map(|id| Self::new(id.clone())).ok_or_else(|| {
            EngineError::ValidationError(format!(
                "Account {} is not allowed to place orders",
                account.id
            ))
        })
    }

    /// Single-item order for a direct purchase.
    pub fn direct(
        customer_id: impl Into<AccountId>,
        product: &Product,
        quantity: u32,
    ) -> Result<Self> {
        let mut order = Self::new(customer_id);
        order.add_item(product, quantity)?;
        Ok(order)
    }

    /// Adds `quantity` units of `product` at its current price.
    pub fn add_item(&mut self, product: &Product, quantity: u32) -> Result<()> {
        self.push_item(OrderItem {
            product_id: product.id.clone(),
            product_name: product.name.clone(),
            quantity,
            unit_price: product.price,
            seller_id: product.seller_id.clone(),
        })
    }

    pub fn push_item(&mut self, item: OrderItem) -> Result<()> {
        if item.quantity == 0 {
            return Err(EngineError::ValidationError(format!(
                "Quantity for {} must be greater than zero",
                item.product_id
            )));
        }
        if item.unit_price.is_negative() {
            return Err(EngineError::ValidationError(format!(
                "Price for {} must not be negative",
                item.product_id
            )));
        }
        let total = self.total_amount.checked_add(item.line_total()?).ok_or_else(|| {
            EngineError::ValidationError("Order total overflows".to_string())
        })?;
        self.items.push(item);
        self.total_amount = total;
        Ok(())
    }

    /// Recomputes the total from the items. Leaves it unchanged on overflow.
    pub fn recompute_total(&mut self) -> Result<Money> {
        self.total_amount = checked_total(&self.items)?;
        Ok(self.total_amount)
    }

    pub fn id(&self) -> &OrderId {
        &self.id
    }

    pub fn customer_id(&self) -> &AccountId {
        &self.customer_id
    }

    pub fn items(&self) -> &[OrderItem] {
        &self.items
    }

    pub fn total_amount(&self) -> Money {
        self.total_amount
    }

    pub fn submitted_at(&self) -> DateTime<Utc> {
        self.submitted_at
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Durable record of an order that reached a terminal status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub order_id: OrderId,
    pub customer_id: AccountId,
    pub items: Vec<OrderItem>,
    pub total_amount: Money,
    pub status: OrderStatus,
    pub submitted_at: DateTime<Utc>,
    pub processed_at: DateTime<Utc>,
}

impl OrderRecord {
    pub fn new(order: &Order, status: OrderStatus) -> Self {
        Self {
            order_id: order.id.clone(),
            customer_id: order.customer_id.clone(),
            items: order.items.clone(),
            total_amount: order.total_amount,
            status,
            submitted_at: order.submitted_at,
            processed_at: Utc::now(),
        }
    }
}
