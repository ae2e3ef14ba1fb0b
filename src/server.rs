use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::content::ContentService;
use crate::routes;

pub struct AppState {
    pub service: ContentService,
    /// Expected secret for `POST /api/revalidate`; `None` rejects everything.
    pub revalidate_secret: Option<String>,
}

pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(routes::health::router())
        .merge(routes::feed::router())
        .merge(routes::revalidate::router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn serve(state: Arc<AppState>, bind: &str) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("failed to bind to {bind}"))?;
    info!(%bind, "aperture listening");
    axum::serve(listener, app(state)).await.context("server error")
}
