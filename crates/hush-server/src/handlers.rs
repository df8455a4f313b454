use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use hush_core::expiry::{self, Expiration};
use hush_core::limits;
use hush_core::share::{FileMetadata, FilePayload};

use crate::guard::not_found;
use crate::AppState;

// ── Health ────────────────────────────────────────────────────────────────────

pub async fn health() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

// ── Text secrets ──────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct StoreSecretRequest {
    /// Ciphertext envelope produced client-side. The server never sees
    /// plaintext or a key; there is no encryption fallback here.
    pub ciphertext: String,
    pub expires: Expiration,
}

#[derive(Debug, Serialize)]
pub struct StoreSecretResponse {
    pub id: String,
}

pub async fn store_secret(
    State(state): State<AppState>,
    Json(body): Json<StoreSecretRequest>,
) -> Response {
    let ttl_seconds = match body.expires.ttl_seconds() {
        Ok(ttl) => ttl,
        Err(e) => return bad_request(&e.to_string()),
    };

    let max_bytes = limits::max_envelope_bytes(state.max_plaintext_bytes);
    if body.ciphertext.len() > max_bytes {
        return bad_request(&format!("ciphertext exceeds {max_bytes} byte limit"));
    }

    match state.gateway.store_text(&body.ciphertext, ttl_seconds).await {
        Ok(id) => {
            info!(key = %id, ttl_seconds, "stored text secret");
            (StatusCode::CREATED, Json(StoreSecretResponse { id })).into_response()
        }
        Err(e) => internal_error(e),
    }
}

/// Destructive read: the envelope is handed out at most once, ever.
pub async fn reveal_secret(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match state.gateway.take_text(&id).await {
        Ok(Some(ciphertext)) => {
            info!(key = %id, "revealed text secret");
            Json(json!({"ciphertext": ciphertext})).into_response()
        }
        Ok(None) => not_found(),
        Err(e) => internal_error(e),
    }
}

// ── Files ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreFileRequest {
    pub metadata: FileMetadata,
    pub encrypted_data_base64: String,
    pub ttl_seconds: u64,
}

#[derive(Debug, Serialize)]
pub struct StoreFileResponse {
    pub id: String,
}

pub async fn store_file(
    State(state): State<AppState>,
    Json(body): Json<StoreFileRequest>,
) -> Response {
    let ttl_seconds = match expiry::validate_ttl_seconds(body.ttl_seconds) {
        Ok(ttl) => ttl,
        Err(e) => return bad_request(&e.to_string()),
    };

    let ciphertext = match STANDARD.decode(&body.encrypted_data_base64) {
        Ok(bytes) => bytes,
        Err(_) => return bad_request("encryptedDataBase64 is not valid base64"),
    };
    if ciphertext.len() > limits::MAX_ENCRYPTED_FILE_BYTES {
        return bad_request(&format!(
            "encrypted file exceeds {} byte limit",
            limits::MAX_ENCRYPTED_FILE_BYTES
        ));
    }

    match state
        .gateway
        .store_file(body.metadata, &ciphertext, ttl_seconds)
        .await
    {
        Ok(id) => {
            info!(key = %id, ttl_seconds, "stored file secret");
            (StatusCode::CREATED, Json(StoreFileResponse { id })).into_response()
        }
        Err(e) => internal_error(e),
    }
}

/// Destructive read of a file record. The client decrypts locally and then
/// confirms with an explicit DELETE.
pub async fn fetch_file(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match state.gateway.take_file(&id).await {
        Ok(Some((metadata, ciphertext))) => {
            info!(key = %id, "revealed file secret");
            Json(FilePayload {
                metadata,
                encrypted_data_base64: STANDARD.encode(&ciphertext),
            })
            .into_response()
        }
        Ok(None) => not_found(),
        Err(e) => internal_error(e),
    }
}

/// Client-confirmed delete after a successful download. The fetch already
/// consumed the record, so this is normally a no-op; it stays idempotent.
pub async fn delete_file(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match state.gateway.delete_by_id(&id).await {
        Ok(()) => {
            info!(key = %id, "deleted file secret");
            Json(json!({"deleted": true})).into_response()
        }
        Err(e) => internal_error(e),
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn bad_request(msg: &str) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({"error": msg}))).into_response()
}

fn internal_error(e: anyhow::Error) -> Response {
    tracing::error!(error = %e, "internal error");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({"error": "internal server error"})),
    )
        .into_response()
}
