use std::sync::Arc;

use storefront_catalog::{NewProduct, Product, ProductId, ProductUpdate};
use storefront_core::UserId;
use storefront_infra::{MemoryStore, Store, StoreError};
use storefront_orders::{Order, OrderRequestItem};

/// Service facade over the configured store.
///
/// Handlers talk to this instead of the `Store` trait directly so the backend
/// choice (in-memory vs Postgres) stays a wiring concern.
#[derive(Clone)]
pub struct AppServices {
    store: Arc<dyn Store>,
}

impl AppServices {
    pub fn with_store(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn products_create(&self, fields: NewProduct) -> Result<Product, StoreError> {
        self.store.create_product(fields).await
    }

    pub async fn products_get(&self, id: ProductId) -> Result<Product, StoreError> {
        self.store.get_product(id).await
    }

    pub async fn products_list(&self) -> Result<Vec<Product>, StoreError> {
        self.store.list_products().await
    }

    pub async fn products_update(
        &self,
        id: ProductId,
        update: ProductUpdate,
    ) -> Result<Product, StoreError> {
        self.store.update_product(id, update).await
    }

    pub async fn products_delete(&self, id: ProductId) -> Result<(), StoreError> {
        self.store.delete_product(id).await
    }

    pub async fn orders_place(
        &self,
        customer_id: UserId,
        items: &[OrderRequestItem],
    ) -> Result<Order, StoreError> {
        self.store.place_order(customer_id, items).await
    }

    pub async fn orders_list(&self, customer_id: UserId) -> Result<Vec<Order>, StoreError> {
        self.store.list_orders_for(customer_id).await
    }
}

/// Select and wire the store backend.
pub async fn build_services() -> AppServices {
    let use_postgres = std::env::var("USE_POSTGRES_STORE")
        .unwrap_or_else(|_| "false".to_string())
        .parse::<bool>()
        .unwrap_or(false);

    if use_postgres {
        #[cfg(feature = "postgres")]
        {
            let database_url = std::env::var("DATABASE_URL")
                .expect("DATABASE_URL must be set when USE_POSTGRES_STORE=true");
            let store = storefront_infra::PgStore::connect(&database_url)
                .await
                .expect("failed to connect to Postgres");
            tracing::info!("using Postgres store");
            return AppServices::with_store(Arc::new(store));
        }
        #[cfg(not(feature = "postgres"))]
        {
            tracing::warn!(
                "USE_POSTGRES_STORE=true but postgres feature not enabled, falling back to in-memory"
            );
        }
    }

    AppServices::with_store(Arc::new(MemoryStore::new()))
}
