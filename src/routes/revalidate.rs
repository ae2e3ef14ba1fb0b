//! Cache revalidation endpoint -- `POST /api/revalidate`
//!
//! Shared-secret authenticated. The secret may arrive in the
//! `x-revalidate-secret` header, as a bearer token, or in the JSON body;
//! paths must come from the fixed allow-list. Authorization is checked
//! before path validation, so a bad secret is always a 401.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::post;
use axum::Router;
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info};

use crate::content::{is_allowed_path, ALLOWED_PATHS};
use crate::routes::error_response;
use crate::server::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/api/revalidate", post(revalidate))
}

#[derive(Deserialize, Default)]
struct RevalidateBody {
    secret: Option<String>,
    path: Option<String>,
    paths: Option<Vec<String>>,
}

fn header_secret(headers: &HeaderMap) -> Option<String> {
    if let Some(v) = headers.get("x-revalidate-secret").and_then(|v| v.to_str().ok()) {
        return Some(v.to_string());
    }
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer ").or_else(|| v.strip_prefix("bearer ")))
        .map(str::to_string)
}

async fn revalidate(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Option<Json<RevalidateBody>>,
) -> Response {
    // Missing or malformed body behaves like an empty one.
    let body = body.map(|Json(b)| b).unwrap_or_default();

    let secret = header_secret(&headers).or_else(|| body.secret.clone());
    let authorized = match (&state.revalidate_secret, &secret) {
        (Some(expected), Some(got)) => got == expected,
        _ => false,
    };
    if !authorized {
        return error_response(StatusCode::UNAUTHORIZED, "unauthorized");
    }

    let targets: Vec<String> = match (body.path, body.paths) {
        (Some(path), _) => vec![path],
        (None, Some(paths)) => paths,
        (None, None) => Vec::new(),
    };
    if targets.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "missing path or paths in body");
    }

    let invalid: Vec<&str> =
        targets.iter().map(String::as_str).filter(|p| !is_allowed_path(p)).collect();
    if !invalid.is_empty() {
        return error_response(
            StatusCode::BAD_REQUEST,
            format!(
                "invalid path(s): {}. allowed: {}",
                invalid.join(", "),
                ALLOWED_PATHS.join(", ")
            ),
        );
    }

    for path in &targets {
        match state.service.revalidate(path).await {
            Ok(removed) => info!(path, removed, "revalidated"),
            Err(err) => {
                error!(path, %err, "revalidation failed");
                return error_response(StatusCode::INTERNAL_SERVER_ERROR, "revalidation failed");
            }
        }
    }

    Json(json!({ "revalidated": targets })).into_response()
}
