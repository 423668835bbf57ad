use std::sync::Arc;

use axum::{
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Json, Router,
};

use storefront_catalog::ProductId;
use storefront_core::EntityId;
use storefront_orders::OrderRequestItem;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::Caller;

pub fn router() -> Router {
    Router::new().route("/", post(place_order).get(list_orders))
}

/// `POST /orders` — requires an authenticated caller.
///
/// The anonymous check runs before the body is even looked at, so an
/// unauthenticated request never touches the store.
pub async fn place_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<Caller>,
    Json(body): Json<dto::PlaceOrderRequest>,
) -> axum::response::Response {
    let Some(customer_id) = caller.user_id() else {
        return errors::auth_required();
    };

    let mut items = Vec::with_capacity(body.items.len());
    for item in &body.items {
        let Ok(entity_id) = item.product_id.parse::<EntityId>() else {
            return errors::json_error(
                StatusCode::BAD_REQUEST,
                "invalid_id",
                format!("invalid product id '{}'", item.product_id),
            );
        };
        items.push(OrderRequestItem {
            product_id: ProductId::new(entity_id),
            quantity: item.quantity,
        });
    }

    match services.orders_place(customer_id, &items).await {
        Ok(order) => (StatusCode::CREATED, Json(dto::order_to_json(&order))).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

/// `GET /orders` — the caller's own orders only.
pub async fn list_orders(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<Caller>,
) -> axum::response::Response {
    let Some(customer_id) = caller.user_id() else {
        return errors::auth_required();
    };

    let orders = match services.orders_list(customer_id).await {
        Ok(o) => o,
        Err(e) => return errors::store_error_to_response(e),
    };

    let items = orders.iter().map(dto::order_to_json).collect::<Vec<_>>();
    (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
}
