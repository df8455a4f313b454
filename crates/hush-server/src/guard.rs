use axum::{
    extract::{Path, Request},
    http::{Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::debug;

use crate::store::gateway;

/// Gatekeeper for the one-time reveal routes.
///
/// HEAD is refused outright: axum's `get()` would otherwise answer a HEAD
/// probe by running the GET handler, and browsers and proxies issue
/// speculative HEADs — forwarding one would burn the single view on a
/// non-genuine read. Malformed ids are answered with the same not-found
/// body a genuine miss produces, before any store access.
pub async fn reveal_guard(Path(id): Path<String>, request: Request, next: Next) -> Response {
    if request.method() == Method::HEAD {
        debug!(key = %id, "rejected HEAD probe on reveal path");
        return StatusCode::METHOD_NOT_ALLOWED.into_response();
    }

    if !gateway::is_well_formed(&id) {
        debug!(key = %id, "rejected malformed id before store access");
        return not_found();
    }

    next.run(request).await
}

/// The uniform miss response. Missing, expired, already-consumed and
/// malformed ids all produce this exact body so nothing about a secret's
/// fate can be probed from the outside.
pub fn not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(json!({"error": "not found"}))).into_response()
}
