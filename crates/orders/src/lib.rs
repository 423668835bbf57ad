//! `storefront-orders` — the customer orders domain.
//!
//! Owns the `Order` aggregate (lines, status, derived totals) and the pure
//! two-pass planning logic behind order placement. The atomic commit around
//! it lives in `storefront-infra`.

pub mod order;
pub mod placement;

pub use order::{Order, OrderId, OrderLine, OrderStatus};
pub use placement::{
    plan_order, ItemIssue, OrderRequestItem, ProductAvailability, RejectedItem,
};
