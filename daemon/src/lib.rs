pub mod auth;
pub mod config;
pub mod error;
pub mod rest;
pub mod storage;
pub mod todos;
pub mod ws;

use std::sync::Arc;

use config::ServerConfig;
use storage::Storage;
use ws::registry::ConnectionRegistry;

/// Shared application state passed to every request handler and to the
/// WebSocket connection loop.
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub storage: Arc<Storage>,
    /// Live observer set. Owned here and injected everywhere it is needed —
    /// tests build a fresh registry per case.
    pub registry: Arc<ConnectionRegistry>,
    pub started_at: std::time::Instant,
}
