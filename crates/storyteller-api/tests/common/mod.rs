//! Shared test helpers for API integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::TimeZone;
use http_body_util::BodyExt;
use storyteller_broadcast::router::BroadcastRouter;
use storyteller_playback::controller::SessionController;
use storyteller_store::JsonContentStore;
use storyteller_test_support::FixedClock;
use storyteller_timeline::store::ContentStore;
use tempfile::TempDir;
use tower::ServiceExt;

use storyteller_api::{routes, state::AppState, ws};

/// Build the full app router over a store in a fresh temp directory, with
/// a deterministic clock. Uses the same route structure as `main.rs`. The
/// returned `TempDir` must stay alive for the app's lifetime.
pub async fn build_test_app() -> (Router, TempDir) {
    let dir = TempDir::new().unwrap();
    let clock = Arc::new(FixedClock(
        chrono::Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap(),
    ));
    let store = Arc::new(JsonContentStore::open(dir.path(), clock).await.unwrap());
    let controller = Arc::new(SessionController::new(
        Arc::clone(&store) as Arc<dyn ContentStore>,
        Arc::new(BroadcastRouter::new()),
    ));
    let app_state = AppState::new(store, controller);

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
        .with_state(app_state);

    (app, dir)
}

async fn send(
    app: Router,
    method: &str,
    uri: &str,
    body: Option<&serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if body_bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&body_bytes).unwrap()
    };

    (status, json)
}

/// Send a GET request and return the response.
pub async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    send(app, "GET", uri, None).await
}

/// Send a POST request with a JSON body and return the response.
pub async fn post_json(
    app: Router,
    uri: &str,
    body: &serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    send(app, "POST", uri, Some(body)).await
}

/// Send a POST request with no body and return the response.
pub async fn post_empty(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    send(app, "POST", uri, None).await
}

/// Send a PUT request with a JSON body and return the response.
pub async fn put_json(
    app: Router,
    uri: &str,
    body: &serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    send(app, "PUT", uri, Some(body)).await
}

/// Send a DELETE request and return the response.
pub async fn delete(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    send(app, "DELETE", uri, None).await
}
