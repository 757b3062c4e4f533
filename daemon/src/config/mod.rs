use serde::Deserialize;
use std::path::{Path, PathBuf};
use taskcast_claims::Algorithm;
use tracing::error;

const DEFAULT_PORT: u16 = 8000;
const DEFAULT_JWT_SECRET: &str = "dev-secret";
const DEFAULT_JWT_ALGORITHM: &str = "HS256";
const DEFAULT_SLOW_QUERY_MS: u64 = 100;

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_cors_origins() -> Vec<String> {
    vec!["http://localhost:5173".to_string()]
}

// ─── TOML config file ─────────────────────────────────────────────────────────

/// `{data_dir}/config.toml` — all fields are optional overrides.
/// Priority: CLI / env var  >  TOML  >  built-in default.
#[derive(Deserialize, Default)]
struct TomlConfig {
    /// HTTP server port (default: 8000).
    port: Option<u16>,
    /// Bind address (default: "127.0.0.1").
    bind_address: Option<String>,
    /// Log level filter string, e.g. "debug", "info,taskcastd=trace" (default: "info").
    log: Option<String>,
    /// Shared token-signing secret. Must match the issuer's secret.
    jwt_secret: Option<String>,
    /// Token signature algorithm name (default: "HS256"). Must match the issuer.
    jwt_algorithm: Option<String>,
    /// Browser origins allowed to call the API (default: http://localhost:5173).
    cors_origins: Option<Vec<String>>,
    /// Log SQLite queries slower than this many milliseconds (0 = disabled; default: 100).
    slow_query_threshold_ms: Option<u64>,
}

fn load_toml(data_dir: &Path) -> Option<TomlConfig> {
    let path = data_dir.join("config.toml");
    let contents = std::fs::read_to_string(&path).ok()?;
    match toml::from_str::<TomlConfig>(&contents) {
        Ok(cfg) => Some(cfg),
        Err(e) => {
            error!(path = %path.display(), err = %e, "failed to parse config.toml — using defaults");
            None
        }
    }
}

// ─── ServerConfig ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub bind_address: String,
    pub data_dir: PathBuf,
    pub log: String,
    /// Shared secret used to verify bearer tokens. The issuer must be
    /// configured with the same value (TASKCASTD_JWT_SECRET or JWT_SECRET
    /// env var, or `jwt_secret` in config.toml).
    pub jwt_secret: String,
    /// Token signature algorithm. Unrecognized names fall back to HS256.
    pub algorithm: Algorithm,
    pub cors_origins: Vec<String>,
    pub slow_query_threshold_ms: u64,
}

impl ServerConfig {
    /// Build config from CLI/env args + optional TOML file.
    ///
    /// Priority (highest to lowest):
    ///   1. CLI / env — passed as `Some(value)` from clap
    ///   2. TOML file at `{data_dir}/config.toml`
    ///   3. Built-in defaults
    pub fn new(
        port: Option<u16>,
        data_dir: Option<PathBuf>,
        log: Option<String>,
        bind_address: Option<String>,
    ) -> Self {
        let data_dir = data_dir.unwrap_or_else(|| PathBuf::from("data"));

        // Load TOML as the lowest-priority override layer
        let toml = load_toml(&data_dir).unwrap_or_default();

        let port = port.or(toml.port).unwrap_or(DEFAULT_PORT);
        let log = log.or(toml.log).unwrap_or_else(|| "info".to_string());

        let bind_address = bind_address
            .or(std::env::var("TASKCASTD_BIND").ok().filter(|s| !s.is_empty()))
            .or(toml.bind_address)
            .unwrap_or_else(default_bind_address);

        let jwt_secret = std::env::var("TASKCASTD_JWT_SECRET")
            .ok()
            .or_else(|| std::env::var("JWT_SECRET").ok())
            .filter(|s| !s.is_empty())
            .or(toml.jwt_secret)
            .unwrap_or_else(|| DEFAULT_JWT_SECRET.to_string());

        let algorithm_name = std::env::var("TASKCASTD_JWT_ALGORITHM")
            .ok()
            .filter(|s| !s.is_empty())
            .or(toml.jwt_algorithm)
            .unwrap_or_else(|| DEFAULT_JWT_ALGORITHM.to_string());
        let algorithm = taskcast_claims::parse_algorithm(&algorithm_name).unwrap_or_else(|| {
            error!(algorithm = %algorithm_name, "unknown token algorithm — falling back to HS256");
            Algorithm::HS256
        });

        let cors_origins = toml.cors_origins.unwrap_or_else(default_cors_origins);
        let slow_query_threshold_ms = toml
            .slow_query_threshold_ms
            .unwrap_or(DEFAULT_SLOW_QUERY_MS);

        Self {
            port,
            bind_address,
            data_dir,
            log,
            jwt_secret,
            algorithm,
            cors_origins,
            slow_query_threshold_ms,
        }
    }
}
