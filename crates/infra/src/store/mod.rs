//! Storage contract shared by every backend.

use async_trait::async_trait;
use thiserror::Error;

use storefront_catalog::{NewProduct, Product, ProductId, ProductUpdate};
use storefront_core::{DomainError, UserId};
use storefront_orders::{Order, OrderRequestItem, RejectedItem};

pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;

pub use memory::MemoryStore;

/// Storage-layer error.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Deterministic domain failure (validation, not found, conflict, ...).
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Order placement rejected; carries every offending item.
    #[error("order request rejected ({} item(s))", .0.len())]
    Rejected(Vec<RejectedItem>),

    /// The backend itself failed (IO, connection, poisoned lock).
    #[error("storage backend failure: {0}")]
    Backend(String),
}

/// Transactional storage for products and orders.
///
/// Implementations must make [`Store::place_order`] atomic: either the new
/// order, its lines, and every stock decrement become visible together, or
/// none of them do. The validation pass and the commit pass run inside the
/// same transaction boundary, so stock observed during validation cannot be
/// taken away before the commit (conditional decrement).
#[async_trait]
pub trait Store: Send + Sync {
    /// Create a product. Fails with a validation error when the name is
    /// empty or already in use, or when the price is zero.
    async fn create_product(&self, fields: NewProduct) -> Result<Product, StoreError>;

    /// Fetch one product.
    async fn get_product(&self, id: ProductId) -> Result<Product, StoreError>;

    /// List all products, newest first.
    async fn list_products(&self) -> Result<Vec<Product>, StoreError>;

    /// Partially update a product (same field validation as creation; a name
    /// collision with a *different* product is rejected).
    async fn update_product(&self, id: ProductId, update: ProductUpdate) -> Result<Product, StoreError>;

    /// Delete a product. Order lines referencing it are removed from
    /// existing orders (cascading, deliberate).
    async fn delete_product(&self, id: ProductId) -> Result<(), StoreError>;

    /// Place an order: validate every item, then atomically create the order
    /// and decrement stock. A rejection enumerates all offending items and
    /// leaves no partial state behind.
    async fn place_order(
        &self,
        customer_id: UserId,
        items: &[OrderRequestItem],
    ) -> Result<Order, StoreError>;

    /// List the orders owned by `customer_id`, newest first.
    async fn list_orders_for(&self, customer_id: UserId) -> Result<Vec<Order>, StoreError>;
}
