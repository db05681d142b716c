//! StoryTeller API server entry point.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use storyteller_api::error::AppError;
use storyteller_api::{routes, state, ws};
use storyteller_broadcast::router::BroadcastRouter;
use storyteller_core::clock::SystemClock;
use storyteller_playback::controller::SessionController;
use storyteller_store::JsonContentStore;
use storyteller_timeline::store::ContentStore;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Initialize tracing subscriber.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    tracing::info!("Starting StoryTeller API server");

    // Read configuration from environment.
    let data_dir =
        std::env::var("STORYTELLER_DATA_DIR").unwrap_or_else(|_| "storyline_data".to_string());
    let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = std::env::var("PORT")
        .unwrap_or_else(|_| "3000".to_string())
        .parse()
        .map_err(|e| AppError::Config(format!("PORT must be a valid u16: {e}")))?;

    // Open the content store and wire up the session core.
    let store = Arc::new(JsonContentStore::open(&data_dir, Arc::new(SystemClock)).await?);
    let broadcast = Arc::new(BroadcastRouter::new());
    let controller = Arc::new(SessionController::new(
        Arc::clone(&store) as Arc<dyn ContentStore>,
        broadcast,
    ));
    let app_state = state::AppState::new(store, controller);

    // Build router.
    // TODO: Replace CorsLayer::permissive() with restricted origins for production.
    let app = Router::new()
        .merge(routes::health::router())
        .nest(
            "/api/v1/storylines",
            routes::storylines::router()
                .merge(routes::injects::router())
                .merge(routes::branches::router()),
        )
        .nest("/api/v1/categories", routes::categories::router())
        .nest("/api/v1/session", routes::session::router())
        .merge(ws::router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    // Start server.
    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .map_err(|e| AppError::Config(format!("invalid HOST:PORT combination: {e}")))?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app).await?;

    Ok(())
}
