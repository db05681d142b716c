//! Storyline CRUD and activation routes.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Json, Router, routing::get, routing::post};
use serde::Deserialize;
use storyteller_playback::commands::SessionCommand;
use storyteller_store::StorylineSummary;
use storyteller_timeline::model::Timeline;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

/// Request body for creating or renaming a storyline.
#[derive(Debug, Deserialize)]
pub struct StorylineRequest {
    /// Display name.
    pub name: String,
}

/// GET /
#[instrument(skip(state))]
async fn list_storylines(State(state): State<AppState>) -> Json<Vec<StorylineSummary>> {
    Json(state.store.list_storylines().await)
}

/// POST /
#[instrument(skip(state, request), fields(name = %request.name))]
async fn create_storyline(
    State(state): State<AppState>,
    Json(request): Json<StorylineRequest>,
) -> Result<(StatusCode, Json<Timeline>), ApiError> {
    let timeline = state.store.create_storyline(&request.name).await?;
    info!(timeline_id = %timeline.id, "storyline created");
    Ok((StatusCode::CREATED, Json(timeline)))
}

/// GET /{id}
#[instrument(skip(state))]
async fn get_storyline(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Timeline>, ApiError> {
    Ok(Json(state.store.storyline(id).await?))
}

/// PUT /{id}
#[instrument(skip(state, request), fields(name = %request.name))]
async fn rename_storyline(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<StorylineRequest>,
) -> Result<StatusCode, ApiError> {
    state.store.rename_storyline(id, &request.name).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /{id}
#[instrument(skip(state))]
async fn delete_storyline(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.store.delete_storyline(id).await?;
    // If this was the active storyline, the session ends with it.
    state.controller.deactivate_timeline(id).await;
    info!(timeline_id = %id, "storyline deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /{id}/activate
#[instrument(skip(state))]
async fn activate_storyline(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state
        .controller
        .apply(SessionCommand::ActivateTimeline { timeline_id: id })
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Returns the router for storyline CRUD and activation.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_storylines).post(create_storyline))
        .route(
            "/{id}",
            get(get_storyline)
                .put(rename_storyline)
                .delete(delete_storyline),
        )
        .route("/{id}/activate", post(activate_storyline))
}
