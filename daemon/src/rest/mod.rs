// rest/mod.rs — HTTP server: REST API + /ws/todos WebSocket upgrade.
//
// One Axum server on one port. Endpoints:
//   GET    /health
//   GET    /todos          (public)
//   POST   /todos          (bearer token required)
//   PUT    /todos/{id}     (bearer token required)
//   DELETE /todos/{id}     (bearer token required)
//   GET    /ws/todos       (WebSocket — server-push live feed)

pub mod routes;

use anyhow::Result;
use axum::http::HeaderValue;
use axum::routing::get;
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::{info, warn};

use crate::AppContext;

pub async fn serve(ctx: Arc<AppContext>) -> Result<()> {
    let addr = format!("{}:{}", ctx.config.bind_address, ctx.config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(addr = %addr, "taskcastd listening (REST + WebSocket on same port)");

    let router = build_router(ctx);
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

pub fn build_router(ctx: Arc<AppContext>) -> Router {
    let cors = cors_layer(&ctx.config.cors_origins);
    Router::new()
        .route("/health", get(routes::health::health))
        .route(
            "/todos",
            get(routes::todos::list_todos).post(routes::todos::create_todo),
        )
        .route(
            "/todos/{id}",
            axum::routing::put(routes::todos::update_todo).delete(routes::todos::delete_todo),
        )
        .route("/ws/todos", get(crate::ws::todos_ws))
        .layer(cors)
        .with_state(ctx)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match o.parse::<HeaderValue>() {
            Ok(v) => Some(v),
            Err(_) => {
                warn!(origin = %o, "ignoring unparseable CORS origin");
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(parsed))
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Resolves when a shutdown signal is received.
///
/// On Unix we listen for SIGTERM *and* Ctrl-C.
/// On other platforms we listen for Ctrl-C only.
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
