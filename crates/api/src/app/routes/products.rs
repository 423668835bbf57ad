use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    routing::post,
    Json, Router,
};

use storefront_catalog::ProductId;
use storefront_core::EntityId;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::Caller;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_product).get(list_products))
        .route(
            "/:id",
            get(get_product)
                .put(update_product)
                .patch(update_product)
                .delete(delete_product),
        )
}

/// `GET /products` — publicly readable.
pub async fn list_products(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    let products = match services.products_list().await {
        Ok(p) => p,
        Err(e) => return errors::store_error_to_response(e),
    };

    let items = products.iter().map(dto::product_to_json).collect::<Vec<_>>();
    (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
}

/// `GET /products/:id` — publicly readable.
pub async fn get_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let Ok(entity_id) = id.parse::<EntityId>() else {
        return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid product id");
    };

    match services.products_get(ProductId::new(entity_id)).await {
        Ok(product) => (StatusCode::OK, Json(dto::product_to_json(&product))).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

/// `POST /products` — requires an authenticated caller.
pub async fn create_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<Caller>,
    Json(body): Json<dto::CreateProductRequest>,
) -> axum::response::Response {
    if !caller.is_authenticated() {
        return errors::auth_required();
    }

    match services.products_create(body.into_fields()).await {
        Ok(product) => (StatusCode::CREATED, Json(dto::product_to_json(&product))).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

/// `PUT`/`PATCH /products/:id` — requires an authenticated caller.
pub async fn update_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
    Json(body): Json<dto::UpdateProductRequest>,
) -> axum::response::Response {
    if !caller.is_authenticated() {
        return errors::auth_required();
    }

    let Ok(entity_id) = id.parse::<EntityId>() else {
        return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid product id");
    };

    match services
        .products_update(ProductId::new(entity_id), body.into_update())
        .await
    {
        Ok(product) => (StatusCode::OK, Json(dto::product_to_json(&product))).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

/// `DELETE /products/:id` — requires an authenticated caller. Order lines
/// referencing the product are removed with it.
pub async fn delete_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if !caller.is_authenticated() {
        return errors::auth_required();
    }

    let Ok(entity_id) = id.parse::<EntityId>() else {
        return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid product id");
    };

    match services.products_delete(ProductId::new(entity_id)).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}
