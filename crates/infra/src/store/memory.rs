//! In-memory store for tests/dev.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;

use storefront_catalog::{NewProduct, Product, ProductId, ProductUpdate};
use storefront_core::{DomainError, EntityId, UserId};
use storefront_orders::{plan_order, Order, OrderId, OrderRequestItem, ProductAvailability};

use super::{Store, StoreError};

/// In-memory implementation of [`Store`].
///
/// One `RwLock` guards both maps, so every operation — in particular order
/// placement — runs as a single atomic unit against the shared state. The
/// write lock held across the validation and commit passes is what closes
/// the read-then-decrement window.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<State>,
}

#[derive(Debug, Default)]
struct State {
    products: HashMap<ProductId, Product>,
    orders: HashMap<OrderId, Order>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, State>, StoreError> {
        self.inner
            .read()
            .map_err(|_| StoreError::Backend("store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, State>, StoreError> {
        self.inner
            .write()
            .map_err(|_| StoreError::Backend("store lock poisoned".to_string()))
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_product(&self, fields: NewProduct) -> Result<Product, StoreError> {
        let mut state = self.write()?;

        let product = Product::create(ProductId::new(EntityId::new()), fields, Utc::now())
            .map_err(StoreError::Domain)?;

        if state.products.values().any(|p| p.name() == product.name()) {
            return Err(DomainError::validation(format!(
                "product name '{}' is already in use",
                product.name()
            ))
            .into());
        }

        state.products.insert(product.id_typed(), product.clone());
        tracing::debug!(product_id = %product.id_typed(), name = product.name(), "product created");
        Ok(product)
    }

    async fn get_product(&self, id: ProductId) -> Result<Product, StoreError> {
        let state = self.read()?;
        state
            .products
            .get(&id)
            .cloned()
            .ok_or_else(|| DomainError::not_found().into())
    }

    async fn list_products(&self) -> Result<Vec<Product>, StoreError> {
        let state = self.read()?;
        let mut products: Vec<Product> = state.products.values().cloned().collect();
        products.sort_by(|a, b| {
            b.created_at()
                .cmp(&a.created_at())
                .then_with(|| b.id_typed().0.as_uuid().cmp(a.id_typed().0.as_uuid()))
        });
        Ok(products)
    }

    async fn update_product(&self, id: ProductId, update: ProductUpdate) -> Result<Product, StoreError> {
        let mut state = self.write()?;

        let Some(current) = state.products.get(&id) else {
            return Err(DomainError::not_found().into());
        };

        // Validate on a copy so a failed update leaves the stored entity as-is.
        let mut updated = current.clone();
        updated
            .apply_update(update, Utc::now())
            .map_err(StoreError::Domain)?;

        let collision = state
            .products
            .values()
            .any(|p| p.id_typed() != id && p.name() == updated.name());
        if collision {
            return Err(DomainError::validation(format!(
                "product name '{}' is already in use",
                updated.name()
            ))
            .into());
        }

        state.products.insert(id, updated.clone());
        tracing::debug!(product_id = %id, "product updated");
        Ok(updated)
    }

    async fn delete_product(&self, id: ProductId) -> Result<(), StoreError> {
        let mut state = self.write()?;

        if state.products.remove(&id).is_none() {
            return Err(DomainError::not_found().into());
        }

        // Cascade: strip the product's lines out of existing orders. Their
        // historical totals shrink accordingly; this mirrors a hard foreign
        // key with ON DELETE CASCADE.
        for order in state.orders.values_mut() {
            order.remove_lines_for(id);
        }

        tracing::debug!(product_id = %id, "product deleted (order lines cascaded)");
        Ok(())
    }

    async fn place_order(
        &self,
        customer_id: UserId,
        items: &[OrderRequestItem],
    ) -> Result<Order, StoreError> {
        if items.is_empty() {
            return Err(DomainError::validation("order must contain at least one item").into());
        }

        let mut state = self.write()?;

        // Validation pass: every item is checked against current stock before
        // anything mutates; a failure enumerates all offending items.
        let lines = plan_order(items, |product_id| {
            state.products.get(&product_id).map(|p| ProductAvailability {
                unit_price: p.price(),
                stock: p.stock(),
            })
        })
        .map_err(|rejected| {
            tracing::debug!(customer_id = %customer_id, rejected = rejected.len(), "order rejected");
            StoreError::Rejected(rejected)
        })?;

        // Commit pass: create the order and apply the decrements. The write
        // lock has been held since validation, so none of these can fail.
        let now = Utc::now();
        let order = Order::place(OrderId::new(EntityId::new()), customer_id, lines, now);

        for line in order.lines() {
            let product = state
                .products
                .get_mut(&line.product_id)
                .ok_or(DomainError::NotFound)?;
            product
                .decrement_stock(u64::from(line.quantity), now)
                .map_err(StoreError::Domain)?;
        }

        state.orders.insert(order.id_typed(), order.clone());
        tracing::debug!(
            order_id = %order.id_typed(),
            customer_id = %customer_id,
            lines = order.lines().len(),
            total = %order.total(),
            "order placed"
        );
        Ok(order)
    }

    async fn list_orders_for(&self, customer_id: UserId) -> Result<Vec<Order>, StoreError> {
        let state = self.read()?;
        let mut orders: Vec<Order> = state
            .orders
            .values()
            .filter(|o| o.customer_id() == customer_id)
            .cloned()
            .collect();
        orders.sort_by(|a, b| {
            b.placed_at()
                .cmp(&a.placed_at())
                .then_with(|| b.id_typed().0.as_uuid().cmp(a.id_typed().0.as_uuid()))
        });
        Ok(orders)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storefront_core::Money;
    use storefront_orders::ItemIssue;

    fn new_product(name: &str, cents: u64, stock: u64) -> NewProduct {
        NewProduct {
            name: name.to_string(),
            price: Money::from_cents(cents),
            stock,
        }
    }

    fn item(product_id: ProductId, quantity: u32) -> OrderRequestItem {
        OrderRequestItem { product_id, quantity }
    }

    #[tokio::test]
    async fn placing_an_order_decrements_stock_and_derives_total() {
        let store = MemoryStore::new();
        let customer = UserId::new();
        let product = store
            .create_product(new_product("Widget", 500, 10))
            .await
            .unwrap();

        let order = store
            .place_order(customer, &[item(product.id_typed(), 3)])
            .await
            .unwrap();

        assert_eq!(order.customer_id(), customer);
        assert_eq!(order.lines().len(), 1);
        assert_eq!(order.lines()[0].unit_price, Money::from_cents(500));
        assert_eq!(order.total(), Money::from_cents(1500));
        assert_eq!(order.total().to_string(), "15.00");

        let product = store.get_product(product.id_typed()).await.unwrap();
        assert_eq!(product.stock(), 7);
    }

    #[tokio::test]
    async fn insufficient_stock_rejects_and_leaves_no_trace() {
        let store = MemoryStore::new();
        let customer = UserId::new();
        let product = store
            .create_product(new_product("Widget", 500, 2))
            .await
            .unwrap();

        let err = store
            .place_order(customer, &[item(product.id_typed(), 5)])
            .await
            .unwrap_err();

        match err {
            StoreError::Rejected(items) => {
                assert_eq!(items.len(), 1);
                assert_eq!(
                    items[0].issue,
                    ItemIssue::InsufficientStock { available: 2, requested: 5 }
                );
            }
            other => panic!("expected Rejected, got {other:?}"),
        }

        assert_eq!(store.get_product(product.id_typed()).await.unwrap().stock(), 2);
        assert!(store.list_orders_for(customer).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_product_rejects_the_whole_request() {
        let store = MemoryStore::new();
        let customer = UserId::new();
        let product = store
            .create_product(new_product("Widget", 500, 10))
            .await
            .unwrap();
        let missing = ProductId::new(EntityId::new());

        let err = store
            .place_order(customer, &[item(product.id_typed(), 1), item(missing, 1)])
            .await
            .unwrap_err();

        match err {
            StoreError::Rejected(items) => {
                assert_eq!(items.len(), 1);
                assert_eq!(items[0].product_id, missing);
                assert_eq!(items[0].issue, ItemIssue::UnknownProduct);
            }
            other => panic!("expected Rejected, got {other:?}"),
        }

        // The valid item's stock is untouched and no order exists.
        assert_eq!(store.get_product(product.id_typed()).await.unwrap().stock(), 10);
        assert!(store.list_orders_for(customer).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn mixed_valid_and_invalid_items_leave_stock_unchanged() {
        let store = MemoryStore::new();
        let customer = UserId::new();
        let plenty = store
            .create_product(new_product("Plenty", 100, 50))
            .await
            .unwrap();
        let scarce = store
            .create_product(new_product("Scarce", 100, 1))
            .await
            .unwrap();

        let err = store
            .place_order(
                customer,
                &[item(plenty.id_typed(), 10), item(scarce.id_typed(), 3)],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Rejected(_)));

        assert_eq!(store.get_product(plenty.id_typed()).await.unwrap().stock(), 50);
        assert_eq!(store.get_product(scarce.id_typed()).await.unwrap().stock(), 1);
    }

    #[tokio::test]
    async fn empty_order_requests_are_rejected() {
        let store = MemoryStore::new();

        let err = store.place_order(UserId::new(), &[]).await.unwrap_err();
        assert!(matches!(err, StoreError::Domain(DomainError::Validation(_))));
    }

    #[tokio::test]
    async fn price_updates_do_not_rewrite_history() {
        let store = MemoryStore::new();
        let customer = UserId::new();
        let product = store
            .create_product(new_product("Widget", 500, 10))
            .await
            .unwrap();

        let order = store
            .place_order(customer, &[item(product.id_typed(), 2)])
            .await
            .unwrap();
        assert_eq!(order.total(), Money::from_cents(1000));

        store
            .update_product(
                product.id_typed(),
                ProductUpdate {
                    price: Some(Money::from_cents(9_999)),
                    ..ProductUpdate::default()
                },
            )
            .await
            .unwrap();

        let orders = store.list_orders_for(customer).await.unwrap();
        assert_eq!(orders[0].lines()[0].unit_price, Money::from_cents(500));
        assert_eq!(orders[0].total(), Money::from_cents(1000));
    }

    #[tokio::test]
    async fn order_listing_is_scoped_to_the_owner() {
        let store = MemoryStore::new();
        let alice = UserId::new();
        let bob = UserId::new();
        let product = store
            .create_product(new_product("Widget", 500, 10))
            .await
            .unwrap();

        let alices = store
            .place_order(alice, &[item(product.id_typed(), 1)])
            .await
            .unwrap();
        store
            .place_order(bob, &[item(product.id_typed(), 1)])
            .await
            .unwrap();

        let listed = store.list_orders_for(alice).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id_typed(), alices.id_typed());
        assert!(listed.iter().all(|o| o.customer_id() == alice));
    }

    #[tokio::test]
    async fn duplicate_product_names_are_rejected_on_create_and_update() {
        let store = MemoryStore::new();
        store
            .create_product(new_product("Widget", 500, 10))
            .await
            .unwrap();

        let err = store
            .create_product(new_product("Widget", 700, 5))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Domain(DomainError::Validation(_))));

        let other = store
            .create_product(new_product("Gadget", 700, 5))
            .await
            .unwrap();
        let err = store
            .update_product(
                other.id_typed(),
                ProductUpdate {
                    name: Some("Widget".to_string()),
                    ..ProductUpdate::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Domain(DomainError::Validation(_))));

        // Renaming a product to its own current name is not a collision.
        store
            .update_product(
                other.id_typed(),
                ProductUpdate {
                    name: Some("Gadget".to_string()),
                    ..ProductUpdate::default()
                },
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn missing_products_yield_not_found() {
        let store = MemoryStore::new();
        let missing = ProductId::new(EntityId::new());

        assert!(matches!(
            store.get_product(missing).await.unwrap_err(),
            StoreError::Domain(DomainError::NotFound)
        ));
        assert!(matches!(
            store
                .update_product(missing, ProductUpdate::default())
                .await
                .unwrap_err(),
            StoreError::Domain(DomainError::NotFound)
        ));
        assert!(matches!(
            store.delete_product(missing).await.unwrap_err(),
            StoreError::Domain(DomainError::NotFound)
        ));
    }

    #[tokio::test]
    async fn deleting_a_product_cascades_into_order_lines() {
        let store = MemoryStore::new();
        let customer = UserId::new();
        let keep = store
            .create_product(new_product("Keep", 100, 10))
            .await
            .unwrap();
        let doomed = store
            .create_product(new_product("Doomed", 200, 10))
            .await
            .unwrap();

        let order = store
            .place_order(
                customer,
                &[item(keep.id_typed(), 1), item(doomed.id_typed(), 2)],
            )
            .await
            .unwrap();
        assert_eq!(order.total(), Money::from_cents(500));

        store.delete_product(doomed.id_typed()).await.unwrap();

        // The historical order lost the deleted product's line (and with it,
        // part of its total).
        let orders = store.list_orders_for(customer).await.unwrap();
        assert_eq!(orders[0].lines().len(), 1);
        assert_eq!(orders[0].lines()[0].product_id, keep.id_typed());
        assert_eq!(orders[0].total(), Money::from_cents(100));
    }

    #[tokio::test]
    async fn product_listing_is_newest_first() {
        let store = MemoryStore::new();
        store.create_product(new_product("First", 100, 1)).await.unwrap();
        store.create_product(new_product("Second", 100, 1)).await.unwrap();
        let third = store.create_product(new_product("Third", 100, 1)).await.unwrap();

        let listed = store.list_products().await.unwrap();
        assert_eq!(listed.len(), 3);
        assert_eq!(listed[0].id_typed(), third.id_typed());
        assert!(listed
            .windows(2)
            .all(|w| w[0].created_at() >= w[1].created_at()));
    }

    #[tokio::test]
    async fn stock_invariant_holds_across_a_sequence_of_operations() {
        let store = MemoryStore::new();
        let customer = UserId::new();
        let product = store
            .create_product(new_product("Widget", 500, 5))
            .await
            .unwrap();

        for quantity in [2u32, 2, 2, 3, 3] {
            let _ = store
                .place_order(customer, &[item(product.id_typed(), quantity)])
                .await;
            let current = store.get_product(product.id_typed()).await.unwrap();
            // u64 makes negative impossible; what we check is that rejected
            // placements never partially drained stock.
            assert!(current.stock() <= 5);
        }

        // 2 + 2 succeed, the rest are rejected against a stock of 1.
        assert_eq!(store.get_product(product.id_typed()).await.unwrap().stock(), 1);
        assert_eq!(store.list_orders_for(customer).await.unwrap().len(), 2);
    }
}
