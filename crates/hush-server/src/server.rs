use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::{
    guard::reveal_guard,
    handlers::{delete_file, fetch_file, health, reveal_secret, store_file, store_secret},
    store::{Gateway, RedbBackend},
    AppState,
};

pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub data_dir: Option<PathBuf>,
    pub sweep_interval: Duration,
    pub cors_origins: Option<String>,
    /// Plaintext cap for text secrets; envelopes get a 1.5x margin on top.
    pub max_plaintext_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: std::env::var("HUSH_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: std::env::var("HUSH_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            data_dir: std::env::var("HUSH_DATA_DIR").ok().map(PathBuf::from),
            sweep_interval: Duration::from_secs(
                std::env::var("HUSH_SWEEP_INTERVAL_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(300),
            ),
            cors_origins: std::env::var("HUSH_CORS_ORIGINS").ok(),
            max_plaintext_bytes: std::env::var("HUSH_MAX_SECRET_BYTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(hush_core::limits::DEFAULT_MAX_PLAINTEXT_BYTES),
        }
    }
}

/// Resolve the data directory, creating it if needed.
pub fn resolve_data_dir(data_dir: Option<&PathBuf>) -> Result<PathBuf> {
    match data_dir {
        Some(d) => {
            std::fs::create_dir_all(d).context("create data dir")?;
            Ok(d.clone())
        }
        None => crate::dirs::data_dir(),
    }
}

/// Assemble the application router.
///
/// The reveal routes sit behind the guard middleware; everything that can
/// consume a secret is validated (and HEAD-proofed) before a handler runs.
pub fn router(state: AppState) -> Router {
    let reveal = Router::new()
        .route("/api/secrets/{id}", get(reveal_secret))
        .route("/api/files/{id}", get(fetch_file).delete(delete_file))
        .layer(middleware::from_fn(reveal_guard));

    Router::new()
        .route("/health", get(health))
        .route("/api/secrets", post(store_secret))
        .route("/api/files", post(store_file))
        .merge(reveal)
        .with_state(state)
}

pub async fn run(cfg: ServerConfig) -> Result<()> {
    let data_dir = resolve_data_dir(cfg.data_dir.as_ref())?;
    info!(data_dir = %data_dir.display(), "using data directory");

    let db_path = data_dir.join("hush.db");
    let backend = RedbBackend::shared(&db_path).await.context("open store")?;
    backend.as_ref().clone().spawn_sweep(cfg.sweep_interval);

    let state = AppState {
        gateway: Gateway::new(backend),
        max_plaintext_bytes: cfg.max_plaintext_bytes,
    };

    let cors = build_cors(cfg.cors_origins.as_deref());
    let app = router(state).layer(cors).layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", cfg.host, cfg.port)
        .parse()
        .context("invalid host/port")?;

    info!(%addr, "hush server listening");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("bind listener")?;

    axum::serve(listener, app).await.context("server error")
}

fn build_cors(origins: Option<&str>) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([
            http::Method::GET,
            http::Method::HEAD,
            http::Method::POST,
            http::Method::DELETE,
            http::Method::OPTIONS,
        ])
        .allow_headers(Any);

    match origins {
        Some(o) => {
            let origins: Vec<_> = o.split(',').filter_map(|s| s.trim().parse().ok()).collect();
            cors.allow_origin(origins)
        }
        None => cors.allow_origin(Any),
    }
}
