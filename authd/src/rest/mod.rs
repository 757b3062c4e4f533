// rest/mod.rs — HTTP server for the account endpoints.
//
//   POST /register
//   POST /login
//   GET  /health

use anyhow::Result;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

use crate::{accounts, AppContext};

pub async fn serve(ctx: Arc<AppContext>) -> Result<()> {
    let addr = format!("{}:{}", ctx.config.bind_address, ctx.config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(addr = %addr, "taskcast-authd listening");

    let router = build_router(ctx);
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

pub fn build_router(ctx: Arc<AppContext>) -> Router {
    Router::new()
        .route("/register", post(accounts::register))
        .route("/login", post(accounts::login))
        .route("/health", get(health))
        .with_state(ctx)
}

async fn health(State(ctx): State<Arc<AppContext>>) -> Json<Value> {
    let uptime = ctx.started_at.elapsed().as_secs();
    Json(json!({
        "status": "ok",
        "uptime_secs": uptime,
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Resolves when a shutdown signal is received.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate()).expect("failed to register SIGTERM");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await.ok();
    }
    info!("shutdown signal received — stopping server");
}
