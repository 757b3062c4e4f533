use serde::Deserialize;
use std::path::{Path, PathBuf};
use taskcast_claims::Algorithm;
use tracing::error;

const DEFAULT_PORT: u16 = 8001;
const DEFAULT_JWT_SECRET: &str = "dev-secret";
const DEFAULT_JWT_ALGORITHM: &str = "HS256";
/// Issued tokens expire this many hours after login/registration.
const DEFAULT_TOKEN_TTL_HOURS: i64 = 12;
const DEFAULT_SLOW_QUERY_MS: u64 = 100;

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

// ─── TOML config file ─────────────────────────────────────────────────────────

/// `{data_dir}/config.toml` — all fields are optional overrides.
/// Priority: CLI / env var  >  TOML  >  built-in default.
#[derive(Deserialize, Default)]
struct TomlConfig {
    /// HTTP server port (default: 8001).
    port: Option<u16>,
    /// Bind address (default: "127.0.0.1").
    bind_address: Option<String>,
    /// Log level filter string (default: "info").
    log: Option<String>,
    /// Token-signing secret. Must match the verifier's secret.
    jwt_secret: Option<String>,
    /// Token signature algorithm name (default: "HS256"). Must match the verifier.
    jwt_algorithm: Option<String>,
    /// Token lifetime in hours (default: 12).
    token_ttl_hours: Option<i64>,
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

// ─── AuthConfig ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub port: u16,
    pub bind_address: String,
    pub data_dir: PathBuf,
    pub log: String,
    /// Shared secret used to sign bearer tokens (TASKCAST_AUTHD_JWT_SECRET
    /// or JWT_SECRET env var, or `jwt_secret` in config.toml). The verifier
    /// must be configured with the same value.
    pub jwt_secret: String,
    /// Token signature algorithm. Unrecognized names fall back to HS256.
    pub algorithm: Algorithm,
    pub token_ttl_hours: i64,
    pub slow_query_threshold_ms: u64,
}

impl AuthConfig {
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

        let toml = load_toml(&data_dir).unwrap_or_default();

        let port = port.or(toml.port).unwrap_or(DEFAULT_PORT);
        let log = log.or(toml.log).unwrap_or_else(|| "info".to_string());

        let bind_address = bind_address
            .or(std::env::var("TASKCAST_AUTHD_BIND").ok().filter(|s| !s.is_empty()))
            .or(toml.bind_address)
            .unwrap_or_else(default_bind_address);

        let jwt_secret = std::env::var("TASKCAST_AUTHD_JWT_SECRET")
            .ok()
            .or_else(|| std::env::var("JWT_SECRET").ok())
            .filter(|s| !s.is_empty())
            .or(toml.jwt_secret)
            .unwrap_or_else(|| DEFAULT_JWT_SECRET.to_string());

        let algorithm_name = std::env::var("TASKCAST_AUTHD_JWT_ALGORITHM")
            .ok()
            .filter(|s| !s.is_empty())
            .or(toml.jwt_algorithm)
            .unwrap_or_else(|| DEFAULT_JWT_ALGORITHM.to_string());
        let algorithm = taskcast_claims::parse_algorithm(&algorithm_name).unwrap_or_else(|| {
            error!(algorithm = %algorithm_name, "unknown token algorithm — falling back to HS256");
            Algorithm::HS256
        });

        let token_ttl_hours = toml.token_ttl_hours.unwrap_or(DEFAULT_TOKEN_TTL_HOURS);
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
            token_ttl_hours,
            slow_query_threshold_ms,
        }
    }
}
