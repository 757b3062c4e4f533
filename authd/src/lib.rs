pub mod accounts;
pub mod config;
pub mod rest;
pub mod storage;

use std::sync::Arc;

use config::AuthConfig;
use storage::Storage;

/// Shared application state passed to every request handler.
pub struct AppContext {
    pub config: Arc<AuthConfig>,
    pub storage: Arc<Storage>,
    pub started_at: std::time::Instant,
}
