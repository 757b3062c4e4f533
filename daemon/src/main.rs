use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing::info;

use taskcastd::{
    config::ServerConfig, rest, storage::Storage, ws::registry::ConnectionRegistry, AppContext,
};

#[derive(Parser)]
#[command(
    name = "taskcastd",
    about = "taskcast task service — REST API + live WebSocket fan-out",
    version
)]
struct Args {
    /// HTTP server port (REST + /ws/todos WebSocket)
    #[arg(long, env = "TASKCASTD_PORT")]
    port: Option<u16>,

    /// Data directory for config and the SQLite database
    #[arg(long, env = "TASKCASTD_DATA_DIR")]
    data_dir: Option<std::path::PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "TASKCASTD_LOG")]
    log: Option<String>,

    /// Bind address (default: 127.0.0.1; use 0.0.0.0 to accept remote clients)
    #[arg(long, env = "TASKCASTD_BIND")]
    bind_address: Option<String>,

    /// Write logs to this file path (rotated daily). Optional.
    #[arg(long, env = "TASKCASTD_LOG_FILE")]
    log_file: Option<std::path::PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Init once — must happen before any tracing calls.
    let log_level = args.log.as_deref().unwrap_or("info").to_owned();
    let log_format =
        std::env::var("TASKCASTD_LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());
    let _file_guard = setup_logging(&log_level, args.log_file.as_deref(), &log_format);

    let config = Arc::new(ServerConfig::new(
        args.port,
        args.data_dir,
        args.log,
        args.bind_address,
    ));
    info!(
        version = env!("CARGO_PKG_VERSION"),
        data_dir = %config.data_dir.display(),
        "starting taskcastd"
    );

    let storage = Arc::new(
        Storage::new_with_slow_query(&config.data_dir, config.slow_query_threshold_ms).await?,
    );
    let registry = Arc::new(ConnectionRegistry::new());

    let ctx = Arc::new(AppContext {
        config,
        storage,
        registry,
        started_at: std::time::Instant::now(),
    });

    rest::serve(ctx).await
}

/// Initialize the tracing subscriber.
/// If `log_file` is set, logs go to both stdout and a daily-rolling file.
/// Returns a `WorkerGuard` that must stay alive for the process lifetime.
///
/// `log_format` may be `"pretty"` (default, human-readable compact format) or
/// `"json"` (structured JSON for log aggregators).
fn setup_logging(
    log_level: &str,
    log_file: Option<&std::path::Path>,
    log_format: &str,
) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let use_json = log_format == "json";

    if let Some(path) = log_file {
        let dir = path.parent().unwrap_or_else(|| std::path::Path::new("."));
        let filename = path
            .file_name()
            .unwrap_or_else(|| std::ffi::OsStr::new("taskcastd.log"));

        // Ensure the directory exists before tracing-appender tries to open it.
        if let Err(e) = std::fs::create_dir_all(dir) {
            // Fall back to stdout-only — don't panic on a bad log path.
            eprintln!(
                "warn: could not create log directory '{}': {e} — falling back to stdout",
                dir.display()
            );
            if use_json {
                tracing_subscriber::fmt().json().with_env_filter(log_level).init();
            } else {
                tracing_subscriber::fmt().with_env_filter(log_level).compact().init();
            }
            return None;
        }

        let appender = tracing_appender::rolling::daily(dir, filename);
        let (non_blocking, guard) = tracing_appender::non_blocking(appender);

        if use_json {
            tracing_subscriber::registry()
                .with(EnvFilter::new(log_level))
                .with(fmt::layer().json())
                .with(fmt::layer().json().with_writer(non_blocking))
                .init();
        } else {
            tracing_subscriber::registry()
                .with(EnvFilter::new(log_level))
                .with(fmt::layer().compact())
                .with(fmt::layer().with_writer(non_blocking))
                .init();
        }

        Some(guard)
    } else if use_json {
        tracing_subscriber::fmt().json().with_env_filter(log_level).init();
        None
    } else {
        tracing_subscriber::fmt().with_env_filter(log_level).compact().init();
        None
    }
}
