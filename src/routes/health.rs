use std::sync::Arc;

use axum::response::{IntoResponse, Json};
use axum::routing::get;
use axum::Router;
use serde_json::json;

use crate::server::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/api/health", get(api_health))
}

async fn api_health() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "aperture",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
