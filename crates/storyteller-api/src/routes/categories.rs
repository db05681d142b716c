//! Viewer-category registry routes.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Json, Router, routing::get};
use serde::Deserialize;
use storyteller_store::CategoryLink;
use storyteller_timeline::store::ContentStore;
use tracing::{info, instrument};

use crate::error::ApiError;
use crate::state::AppState;

/// Request body for registering a viewer category.
#[derive(Debug, Deserialize)]
pub struct CategoryRequest {
    /// Category label, e.g. "Wizard".
    pub label: String,
}

/// GET /
#[instrument(skip(state))]
async fn list_categories(State(state): State<AppState>) -> Result<Json<Vec<String>>, ApiError> {
    Ok(Json(state.store.viewer_categories().await?))
}

/// POST /
#[instrument(skip(state, request), fields(label = %request.label))]
async fn add_category(
    State(state): State<AppState>,
    Json(request): Json<CategoryRequest>,
) -> Result<(StatusCode, Json<CategoryLink>), ApiError> {
    let link = state.store.add_category(&request.label).await?;
    info!(category = %link.category, "viewer category registered");
    Ok((StatusCode::CREATED, Json(link)))
}

/// DELETE /{label}
#[instrument(skip(state))]
async fn remove_category(
    State(state): State<AppState>,
    Path(label): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.store.remove_category(&label).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /links
#[instrument(skip(state))]
async fn list_links(State(state): State<AppState>) -> Json<Vec<CategoryLink>> {
    Json(state.store.category_links().await)
}

/// Returns the router for the viewer-category registry.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_categories).post(add_category))
        .route("/links", get(list_links))
        .route("/{label}", axum::routing::delete(remove_category))
}
