pub mod controller;
pub mod embed;
pub mod error;
pub mod routes;
pub mod state;

use axum::routing::{get, post};
use axum::Router;
use ferrogrid_core::command::TOGGLE_PATH;
use ferrogrid_core::config::Config;
use std::future::{Future, IntoFuture};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Build the axum Router with all routes and middleware.
/// Used by `serve()` and available for integration testing.
pub fn build_router(app_state: state::AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Events (SSE)
        .route("/api/events", get(routes::events::sse_events))
        // Health
        .route("/api/health", get(routes::health::get_health))
        // Magnets
        .route("/api/magnets", get(routes::magnets::list_magnets))
        .route("/api/magnets/{index}", get(routes::magnets::get_magnet))
        .route(
            "/api/magnets/{index}/toggle",
            post(routes::magnets::toggle_magnet),
        )
        // Config
        .route("/api/config", get(routes::config::get_config))
        // Control page and /magnet?num=N
        .route(TOGGLE_PATH, get(routes::dispatch::legacy_toggle))
        .fallback(routes::dispatch::page)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state)
}

/// Start the control server on a pre-bound listener.
///
/// Runs until `shutdown` resolves or a drive fault halts the controller. On
/// the way out the grid is powered down; a drive fault is returned as the
/// error. Open connections are not drained: event streams end once the
/// controller stops.
pub async fn serve_on<F>(
    config: Config,
    listener: tokio::net::TcpListener,
    open_browser: bool,
    shutdown: F,
) -> anyhow::Result<()>
where
    F: Future<Output = ()>,
{
    let actual_port = listener.local_addr()?.port();
    let (app_state, running) = state::AppState::start_simulated(config)?;
    let controller = app_state.controller.clone();
    let app = build_router(app_state);

    tracing::info!("ferrogrid listening on http://localhost:{actual_port}");

    if open_browser {
        let url = format!("http://localhost:{actual_port}");
        let _ = open::that(&url);
    }

    let served = tokio::select! {
        res = axum::serve(listener, app).into_future() => res,
        _ = shutdown => {
            tracing::info!("shutdown requested");
            Ok(())
        }
        _ = controller.wait_for_halt() => {
            tracing::error!("controller halted, stopping server");
            Ok(())
        }
    };

    let stopped = running.stop().await;
    served?;
    stopped
}

/// Bind `config.server` and serve until `shutdown` resolves.
pub async fn serve<F>(config: Config, open_browser: bool, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()>,
{
    let addr = format!("{}:{}", config.server.bind, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    serve_on(config, listener, open_browser, shutdown).await
}
