//! Paginated feed endpoint -- `GET /api/feed/photos`
//!
//! Query parameters are parsed leniently: an unparsable `limit` or
//! `offset` falls back to its default instead of rejecting the request,
//! and out-of-range values are clamped by the service.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use tracing::error;

use crate::feed::{SortOrder, DEFAULT_PAGE_SIZE};
use crate::routes::error_response;
use crate::server::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/api/feed/photos", get(feed_photos))
}

#[derive(Deserialize, Default)]
struct FeedQuery {
    order: Option<String>,
    limit: Option<String>,
    offset: Option<String>,
}

async fn feed_photos(
    State(state): State<Arc<AppState>>,
    Query(q): Query<FeedQuery>,
) -> Response {
    let order = q.order.as_deref().map(SortOrder::parse).unwrap_or_default();
    let limit = q
        .limit
        .as_deref()
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_PAGE_SIZE as i64);
    let offset = q.offset.as_deref().and_then(|s| s.parse().ok()).unwrap_or(0);

    match state.service.feed_page(order, limit, offset).await {
        Ok(page) => Json(page).into_response(),
        Err(err) => {
            error!(%err, "feed photos api error");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "failed to load feed photos")
        }
    }
}
