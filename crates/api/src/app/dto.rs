use serde::Deserialize;

use storefront_catalog::{NewProduct, Product, ProductUpdate};
use storefront_core::Money;
use storefront_orders::{Order, OrderLine};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    pub name: String,
    /// Price in the smallest currency unit (cents).
    pub price_cents: u64,
    pub stock: u64,
}

impl CreateProductRequest {
    pub fn into_fields(self) -> NewProduct {
        NewProduct {
            name: self.name,
            price: Money::from_cents(self.price_cents),
            stock: self.stock,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub price_cents: Option<u64>,
    pub stock: Option<u64>,
}

impl UpdateProductRequest {
    pub fn into_update(self) -> ProductUpdate {
        ProductUpdate {
            name: self.name,
            price: self.price_cents.map(Money::from_cents),
            stock: self.stock,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct OrderItemRequest {
    pub product_id: String,
    pub quantity: u32,
}

#[derive(Debug, Deserialize)]
pub struct PlaceOrderRequest {
    pub items: Vec<OrderItemRequest>,
}

// -------------------------
// JSON mapping helpers
// -------------------------

pub fn product_to_json(product: &Product) -> serde_json::Value {
    serde_json::json!({
        "id": product.id_typed().to_string(),
        "name": product.name(),
        "price_cents": product.price().cents(),
        "price": product.price().to_string(),
        "stock": product.stock(),
        "created_at": product.created_at().to_rfc3339(),
        "updated_at": product.updated_at().to_rfc3339(),
    })
}

pub fn order_to_json(order: &Order) -> serde_json::Value {
    serde_json::json!({
        "id": order.id_typed().to_string(),
        "customer_id": order.customer_id().to_string(),
        "placed_at": order.placed_at().to_rfc3339(),
        "status": order.status().as_str(),
        "lines": order.lines().iter().map(order_line_to_json).collect::<Vec<_>>(),
        "total_cents": order.total().cents(),
        "total": order.total().to_string(),
    })
}

fn order_line_to_json(line: &OrderLine) -> serde_json::Value {
    serde_json::json!({
        "line_no": line.line_no,
        "product_id": line.product_id.to_string(),
        "quantity": line.quantity,
        "unit_price_cents": line.unit_price.cents(),
        "subtotal_cents": line.subtotal().cents(),
    })
}
