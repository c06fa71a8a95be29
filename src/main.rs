// Allow dead code for features under development
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod application;
mod domain;
mod infrastructure;

use crate::infrastructure::app_state::EngineState;
use crate::infrastructure::config::EngineConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "plopilot=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Initialize engine state and the not-yet-running game loop
    let config = EngineConfig::from_env();
    let port = config.port;
    let (state, game_loop) = EngineState::new(config).await?;
    let state = Arc::new(state);

    // Run the orchestrator on its own task; all state transitions are
    // serialized there.
    let loop_task = tokio::spawn(game_loop.run());

    // Build router
    let app = Router::new()
        .nest("/api", api::routes::create_api_router(state.clone()))
        .route("/events", axum::routing::get(api::sse::sse_handler))
        .route(
            "/health",
            axum::routing::get(api::routes::health::health_handler),
        )
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state.clone());

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Starting PloPilot engine on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(state.clone()))
        .await?;

    // Cooperative stop: a tap in flight finishes, cooldown is bypassed,
    // pending opponent writes flush with the pool.
    state.loop_handle.stop();
    match loop_task.await {
        Ok(Ok(())) => {
            tracing::info!("clean stop");
            Ok(())
        }
        Ok(Err(e)) => {
            tracing::error!(error = %e, "game loop ended with an unrecoverable error");
            Err(e.into())
        }
        Err(e) => {
            tracing::error!(error = %e, "game loop task panicked");
            Err(e.into())
        }
    }
}

async fn shutdown_signal(state: Arc<EngineState>) {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("stop signal received");
    state.loop_handle.stop();
}
