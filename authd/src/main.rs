use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing::info;

use taskcast_authd::{config::AuthConfig, rest, storage::Storage, AppContext};

#[derive(Parser)]
#[command(
    name = "taskcast-authd",
    about = "taskcast account service — registers users and mints bearer tokens",
    version
)]
struct Args {
    /// HTTP server port
    #[arg(long, env = "TASKCAST_AUTHD_PORT")]
    port: Option<u16>,

    /// Data directory for config and the SQLite database
    #[arg(long, env = "TASKCAST_AUTHD_DATA_DIR")]
    data_dir: Option<std::path::PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "TASKCAST_AUTHD_LOG")]
    log: Option<String>,

    /// Bind address (default: 127.0.0.1)
    #[arg(long, env = "TASKCAST_AUTHD_BIND")]
    bind_address: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = args.log.as_deref().unwrap_or("info").to_owned();
    let log_format =
        std::env::var("TASKCAST_AUTHD_LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());
    if log_format == "json" {
        tracing_subscriber::fmt().json().with_env_filter(log_level).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(log_level).compact().init();
    }

    let config = Arc::new(AuthConfig::new(
        args.port,
        args.data_dir,
        args.log,
        args.bind_address,
    ));
    info!(
        version = env!("CARGO_PKG_VERSION"),
        data_dir = %config.data_dir.display(),
        "starting taskcast-authd"
    );

    let storage = Arc::new(
        Storage::new_with_slow_query(&config.data_dir, config.slow_query_threshold_ms).await?,
    );

    let ctx = Arc::new(AppContext {
        config,
        storage,
        started_at: std::time::Instant::now(),
    });

    rest::serve(ctx).await
}
