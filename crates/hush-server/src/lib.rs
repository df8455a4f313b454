pub mod dirs;
pub mod guard;
pub mod handlers;
pub mod server;
pub mod store;

/// Shared application state threaded through axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub gateway: store::Gateway,
    /// Plaintext cap; incoming envelopes are allowed 1.5x this size.
    pub max_plaintext_bytes: usize,
}

pub use server::{resolve_data_dir, router, run, ServerConfig};
