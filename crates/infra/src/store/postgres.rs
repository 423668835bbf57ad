//! Postgres-backed store.
//!
//! Every multi-row operation runs inside a SQL transaction; order placement
//! additionally takes `FOR UPDATE` row locks on the referenced products so
//! the validation pass and the stock decrements see the same stock. The
//! product → order-line cascade is expressed as an `ON DELETE CASCADE`
//! foreign key, deliberately: deleting a product rewrites the history of
//! orders that contained it.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use storefront_catalog::{NewProduct, Product, ProductId, ProductUpdate};
use storefront_core::{DomainError, EntityId, Money, UserId};
use storefront_orders::{
    plan_order, Order, OrderId, OrderLine, OrderRequestItem, OrderStatus, ProductAvailability,
};

use super::{Store, StoreError};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS products (
    id UUID PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    price_cents BIGINT NOT NULL CHECK (price_cents > 0),
    stock BIGINT NOT NULL CHECK (stock >= 0),
    created_at TIMESTAMPTZ NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL
);

CREATE TABLE IF NOT EXISTS orders (
    id UUID PRIMARY KEY,
    customer_id UUID NOT NULL,
    placed_at TIMESTAMPTZ NOT NULL,
    status TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS order_lines (
    order_id UUID NOT NULL REFERENCES orders(id) ON DELETE CASCADE,
    line_no INTEGER NOT NULL,
    product_id UUID NOT NULL REFERENCES products(id) ON DELETE CASCADE,
    quantity INTEGER NOT NULL CHECK (quantity > 0),
    unit_price_cents BIGINT NOT NULL,
    PRIMARY KEY (order_id, line_no)
);

CREATE INDEX IF NOT EXISTS idx_orders_customer ON orders (customer_id, placed_at DESC);
"#;

/// Postgres implementation of [`Store`].
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connect and make sure the schema exists.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPool::connect(database_url).await.map_err(backend)?;
        let store = Self { pool };
        store.ensure_schema().await?;
        Ok(store)
    }

    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(backend)?;
        Ok(())
    }
}

#[async_trait]
impl Store for PgStore {
    async fn create_product(&self, fields: NewProduct) -> Result<Product, StoreError> {
        // Field validation happens in the entity; uniqueness is left to the
        // UNIQUE constraint so concurrent creates cannot race past a lookup.
        let product = Product::create(ProductId::new(EntityId::new()), fields, Utc::now())
            .map_err(StoreError::Domain)?;

        let result = sqlx::query(
            r#"
            INSERT INTO products (id, name, price_cents, stock, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(product.id_typed().0.as_uuid())
        .bind(product.name())
        .bind(cents_to_db(product.price())?)
        .bind(stock_to_db(product.stock())?)
        .bind(product.created_at())
        .bind(product.updated_at())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => {
                tracing::debug!(product_id = %product.id_typed(), name = product.name(), "product created");
                Ok(product)
            }
            Err(e) if is_unique_violation(&e) => Err(DomainError::validation(format!(
                "product name '{}' is already in use",
                product.name()
            ))
            .into()),
            Err(e) => Err(backend(e)),
        }
    }

    async fn get_product(&self, id: ProductId) -> Result<Product, StoreError> {
        let row = sqlx::query(
            "SELECT id, name, price_cents, stock, created_at, updated_at FROM products WHERE id = $1",
        )
        .bind(id.0.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        match row {
            Some(row) => product_from_row(&row),
            None => Err(DomainError::not_found().into()),
        }
    }

    async fn list_products(&self) -> Result<Vec<Product>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, name, price_cents, stock, created_at, updated_at FROM products \
             ORDER BY created_at DESC, id DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        rows.iter().map(product_from_row).collect()
    }

    async fn update_product(&self, id: ProductId, update: ProductUpdate) -> Result<Product, StoreError> {
        let mut tx = self.pool.begin().await.map_err(backend)?;

        let row = sqlx::query(
            "SELECT id, name, price_cents, stock, created_at, updated_at FROM products \
             WHERE id = $1 FOR UPDATE",
        )
        .bind(id.0.as_uuid())
        .fetch_optional(&mut *tx)
        .await
        .map_err(backend)?;

        let Some(row) = row else {
            return Err(DomainError::not_found().into());
        };
        let mut product = product_from_row(&row)?;
        product.apply_update(update, Utc::now()).map_err(StoreError::Domain)?;

        let result = sqlx::query(
            "UPDATE products SET name = $2, price_cents = $3, stock = $4, updated_at = $5 WHERE id = $1",
        )
        .bind(id.0.as_uuid())
        .bind(product.name())
        .bind(cents_to_db(product.price())?)
        .bind(stock_to_db(product.stock())?)
        .bind(product.updated_at())
        .execute(&mut *tx)
        .await;

        match result {
            Ok(_) => {}
            Err(e) if is_unique_violation(&e) => {
                return Err(DomainError::validation(format!(
                    "product name '{}' is already in use",
                    product.name()
                ))
                .into());
            }
            Err(e) => return Err(backend(e)),
        }

        tx.commit().await.map_err(backend)?;
        tracing::debug!(product_id = %id, "product updated");
        Ok(product)
    }

    async fn delete_product(&self, id: ProductId) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id.0.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(backend)?;

        if result.rows_affected() == 0 {
            return Err(DomainError::not_found().into());
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

        let mut tx = self.pool.begin().await.map_err(backend)?;

        // Lock the referenced product rows; from here until commit, the stock
        // the validation pass sees is the stock the decrements apply to.
        let ids: Vec<Uuid> = items.iter().map(|i| *i.product_id.0.as_uuid()).collect();
        let rows = sqlx::query(
            "SELECT id, price_cents, stock FROM products WHERE id = ANY($1) FOR UPDATE",
        )
        .bind(&ids)
        .fetch_all(&mut *tx)
        .await
        .map_err(backend)?;

        let mut catalog: HashMap<ProductId, ProductAvailability> = HashMap::new();
        for row in &rows {
            let id = ProductId::new(EntityId::from_uuid(row.try_get("id").map_err(backend)?));
            catalog.insert(
                id,
                ProductAvailability {
                    unit_price: cents_from_db(row.try_get("price_cents").map_err(backend)?)?,
                    stock: stock_from_db(row.try_get("stock").map_err(backend)?)?,
                },
            );
        }

        // Validation pass (the dropped transaction rolls back on rejection).
        let lines = plan_order(items, |product_id| catalog.get(&product_id).copied())
            .map_err(|rejected| {
                tracing::debug!(customer_id = %customer_id, rejected = rejected.len(), "order rejected");
                StoreError::Rejected(rejected)
            })?;

        // Commit pass: order, lines, decrements — one transaction.
        let now = Utc::now();
        let order = Order::place(OrderId::new(EntityId::new()), customer_id, lines, now);

        sqlx::query("INSERT INTO orders (id, customer_id, placed_at, status) VALUES ($1, $2, $3, $4)")
            .bind(order.id_typed().0.as_uuid())
            .bind(customer_id.as_uuid())
            .bind(order.placed_at())
            .bind(order.status().as_str())
            .execute(&mut *tx)
            .await
            .map_err(backend)?;

        for line in order.lines() {
            sqlx::query(
                r#"
                INSERT INTO order_lines (order_id, line_no, product_id, quantity, unit_price_cents)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(order.id_typed().0.as_uuid())
            .bind(i32::try_from(line.line_no).map_err(|e| StoreError::Backend(e.to_string()))?)
            .bind(line.product_id.0.as_uuid())
            .bind(i32::try_from(line.quantity).map_err(|e| StoreError::Backend(e.to_string()))?)
            .bind(cents_to_db(line.unit_price)?)
            .execute(&mut *tx)
            .await
            .map_err(backend)?;

            sqlx::query("UPDATE products SET stock = stock - $2, updated_at = $3 WHERE id = $1")
                .bind(line.product_id.0.as_uuid())
                .bind(i64::from(line.quantity))
                .bind(now)
                .execute(&mut *tx)
                .await
                .map_err(backend)?;
        }

        tx.commit().await.map_err(backend)?;
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
        let order_rows = sqlx::query(
            "SELECT id, customer_id, placed_at, status FROM orders \
             WHERE customer_id = $1 ORDER BY placed_at DESC, id DESC",
        )
        .bind(customer_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        if order_rows.is_empty() {
            return Ok(Vec::new());
        }

        let order_ids: Vec<Uuid> = order_rows
            .iter()
            .map(|row| row.try_get("id").map_err(backend))
            .collect::<Result<_, _>>()?;

        let line_rows = sqlx::query(
            "SELECT order_id, line_no, product_id, quantity, unit_price_cents FROM order_lines \
             WHERE order_id = ANY($1) ORDER BY order_id, line_no",
        )
        .bind(&order_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        let mut lines_by_order: HashMap<Uuid, Vec<OrderLine>> = HashMap::new();
        for row in &line_rows {
            let order_id: Uuid = row.try_get("order_id").map_err(backend)?;
            let line_no: i32 = row.try_get("line_no").map_err(backend)?;
            let quantity: i32 = row.try_get("quantity").map_err(backend)?;
            lines_by_order.entry(order_id).or_default().push(OrderLine {
                line_no: u32::try_from(line_no).map_err(|e| StoreError::Backend(e.to_string()))?,
                product_id: ProductId::new(EntityId::from_uuid(
                    row.try_get("product_id").map_err(backend)?,
                )),
                quantity: u32::try_from(quantity).map_err(|e| StoreError::Backend(e.to_string()))?,
                unit_price: cents_from_db(row.try_get("unit_price_cents").map_err(backend)?)?,
            });
        }

        let mut orders = Vec::with_capacity(order_rows.len());
        for row in &order_rows {
            let id: Uuid = row.try_get("id").map_err(backend)?;
            let status: &str = row.try_get("status").map_err(backend)?;
            let placed_at: DateTime<Utc> = row.try_get("placed_at").map_err(backend)?;
            orders.push(Order::from_parts(
                OrderId::new(EntityId::from_uuid(id)),
                UserId::from_uuid(row.try_get("customer_id").map_err(backend)?),
                placed_at,
                status.parse::<OrderStatus>().map_err(StoreError::Domain)?,
                lines_by_order.remove(&id).unwrap_or_default(),
            ));
        }

        Ok(orders)
    }
}

fn product_from_row(row: &sqlx::postgres::PgRow) -> Result<Product, StoreError> {
    Ok(Product::from_parts(
        ProductId::new(EntityId::from_uuid(row.try_get("id").map_err(backend)?)),
        row.try_get("name").map_err(backend)?,
        cents_from_db(row.try_get("price_cents").map_err(backend)?)?,
        stock_from_db(row.try_get("stock").map_err(backend)?)?,
        row.try_get("created_at").map_err(backend)?,
        row.try_get("updated_at").map_err(backend)?,
    ))
}

fn cents_to_db(money: Money) -> Result<i64, StoreError> {
    i64::try_from(money.cents()).map_err(|e| StoreError::Backend(e.to_string()))
}

fn cents_from_db(cents: i64) -> Result<Money, StoreError> {
    u64::try_from(cents)
        .map(Money::from_cents)
        .map_err(|e| StoreError::Backend(e.to_string()))
}

fn stock_to_db(stock: u64) -> Result<i64, StoreError> {
    i64::try_from(stock).map_err(|e| StoreError::Backend(e.to_string()))
}

fn stock_from_db(stock: i64) -> Result<u64, StoreError> {
    u64::try_from(stock).map_err(|e| StoreError::Backend(e.to_string()))
}

fn backend(e: sqlx::Error) -> StoreError {
    StoreError::Backend(e.to_string())
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .and_then(|db| db.code())
        .is_some_and(|code| code == "23505")
}
