use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};

use crate::app::errors;
use crate::context::Caller;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn whoami(Extension(caller): Extension<Caller>) -> axum::response::Response {
    let Some(user_id) = caller.user_id() else {
        return errors::auth_required();
    };

    Json(serde_json::json!({
        "user_id": user_id.to_string(),
    }))
    .into_response()
}
