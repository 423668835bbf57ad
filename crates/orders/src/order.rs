use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use storefront_catalog::ProductId;
use storefront_core::{Entity, EntityId, Money, UserId};

/// Order identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(pub EntityId);

impl OrderId {
    pub fn new(id: EntityId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for OrderId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Order status. Set at creation and read back; nothing in this core drives
/// transitions between the variants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::InProgress => "in_progress",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl core::str::FromStr for OrderStatus {
    type Err = storefront_core::DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "in_progress" => Ok(OrderStatus::InProgress),
            "completed" => Ok(OrderStatus::Completed),
            "cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(storefront_core::DomainError::validation(format!(
                "unknown order status '{other}'"
            ))),
        }
    }
}

/// Order line: product reference, quantity, and the unit price captured at
/// the moment the order was committed.
///
/// `unit_price` is a historical record, not a live reference: later product
/// price changes never alter it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub line_no: u32,
    pub product_id: ProductId,
    pub quantity: u32,
    pub unit_price: Money,
}

impl OrderLine {
    pub fn subtotal(&self) -> Money {
        self.unit_price.times(self.quantity)
    }
}

/// Entity: a customer order and its lines.
///
/// The line set is immutable after creation; there is no add-line operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,
    customer_id: UserId,
    placed_at: DateTime<Utc>,
    status: OrderStatus,
    lines: Vec<OrderLine>,
}

impl Order {
    /// Create an order with its full set of lines, status `Pending`.
    pub fn place(
        id: OrderId,
        customer_id: UserId,
        lines: Vec<OrderLine>,
        placed_at: DateTime<Utc>,
    ) -> Self {
        Self::from_parts(id, customer_id, placed_at, OrderStatus::default(), lines)
    }

    /// Rehydrate an order from stored state.
    pub fn from_parts(
        id: OrderId,
        customer_id: UserId,
        placed_at: DateTime<Utc>,
        status: OrderStatus,
        lines: Vec<OrderLine>,
    ) -> Self {
        Self {
            id,
            customer_id,
            placed_at,
            status,
            lines,
        }
    }

    pub fn id_typed(&self) -> OrderId {
        self.id
    }

    pub fn customer_id(&self) -> UserId {
        self.customer_id
    }

    pub fn placed_at(&self) -> DateTime<Utc> {
        self.placed_at
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn lines(&self) -> &[OrderLine] {
        &self.lines
    }

    /// Strip every line referencing `product_id` (product deletion cascade).
    pub fn remove_lines_for(&mut self, product_id: ProductId) {
        self.lines.retain(|line| line.product_id != product_id);
    }

    /// Derived total: the sum of line subtotals, recomputed on every call so
    /// it can never go stale.
    pub fn total(&self) -> Money {
        self.lines.iter().map(OrderLine::subtotal).sum()
    }
}

impl Entity for Order {
    type Id = OrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
