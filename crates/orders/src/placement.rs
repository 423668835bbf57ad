//! Two-pass order planning.
//!
//! `plan_order` is the read-only validation pass of order placement: every
//! requested item is checked before any mutation is allowed, and a rejection
//! carries *all* offending items rather than just the first. The caller (the
//! store) runs it inside the same transaction boundary that later applies the
//! stock decrements, so a plan that validates cannot be invalidated before it
//! commits.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use storefront_catalog::ProductId;
use storefront_core::Money;

use crate::order::OrderLine;

/// One requested item of an order: which product, how many.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRequestItem {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// What the planner needs to know about a product: its current price (to
/// freeze into the line) and its current stock (to check availability).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProductAvailability {
    pub unit_price: Money,
    pub stock: u64,
}

/// Why a single requested item was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum ItemIssue {
    /// The product id does not resolve.
    UnknownProduct,
    /// The requested quantity is not a positive integer.
    InvalidQuantity,
    /// Current stock cannot cover the requested quantity.
    InsufficientStock { available: u64, requested: u64 },
}

/// A rejected item: which product, and why.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedItem {
    pub product_id: ProductId,
    #[serde(flatten)]
    pub issue: ItemIssue,
}

/// Validation pass of order placement.
///
/// Checks every item against the catalog via `lookup` and either returns the
/// planned lines (input order preserved, unit prices frozen from the current
/// catalog price) or the full list of offending items. Performs no mutation.
///
/// Reservations accumulate across items: when the same product appears twice,
/// the second item sees the stock that the first one left over, so a plan
/// that validates can always be committed without going negative.
pub fn plan_order<F>(items: &[OrderRequestItem], mut lookup: F) -> Result<Vec<OrderLine>, Vec<RejectedItem>>
where
    F: FnMut(ProductId) -> Option<ProductAvailability>,
{
    let mut lines = Vec::with_capacity(items.len());
    let mut rejected = Vec::new();
    let mut reserved: HashMap<ProductId, u64> = HashMap::new();

    for (index, item) in items.iter().enumerate() {
        if item.quantity == 0 {
            rejected.push(RejectedItem {
                product_id: item.product_id,
                issue: ItemIssue::InvalidQuantity,
            });
            continue;
        }

        let Some(availability) = lookup(item.product_id) else {
            rejected.push(RejectedItem {
                product_id: item.product_id,
                issue: ItemIssue::UnknownProduct,
            });
            continue;
        };

        let already_reserved = reserved.get(&item.product_id).copied().unwrap_or(0);
        let available = availability.stock.saturating_sub(already_reserved);
        if available < u64::from(item.quantity) {
            rejected.push(RejectedItem {
                product_id: item.product_id,
                issue: ItemIssue::InsufficientStock {
                    available,
                    requested: u64::from(item.quantity),
                },
            });
            continue;
        }

        *reserved.entry(item.product_id).or_insert(0) += u64::from(item.quantity);
        lines.push(OrderLine {
            line_no: (index as u32) + 1,
            product_id: item.product_id,
            quantity: item.quantity,
            unit_price: availability.unit_price,
        });
    }

    if rejected.is_empty() {
        Ok(lines)
    } else {
        Err(rejected)
    }
}
