//! Main-sequence inject CRUD routes.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Json, Router, routing::post, routing::put};
use storyteller_store::InjectFields;
use storyteller_timeline::model::Inject;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

/// POST /{id}/injects
#[instrument(skip(state, request), fields(heading = %request.heading))]
async fn create_inject(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<InjectFields>,
) -> Result<(StatusCode, Json<Inject>), ApiError> {
    let inject = state.store.create_inject(id, request).await?;
    info!(timeline_id = %id, inject_id = %inject.id, "inject created");
    Ok((StatusCode::CREATED, Json(inject)))
}

/// PUT /{id}/injects/{inject_id}
#[instrument(skip(state, request))]
async fn update_inject(
    State(state): State<AppState>,
    Path((id, inject_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<InjectFields>,
) -> Result<Json<Inject>, ApiError> {
    Ok(Json(state.store.update_inject(id, inject_id, request).await?))
}

/// DELETE /{id}/injects/{inject_id}
#[instrument(skip(state))]
async fn delete_inject(
    State(state): State<AppState>,
    Path((id, inject_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError> {
    state.store.delete_inject(id, inject_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Returns the router for main-sequence inject CRUD.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{id}/injects", post(create_inject))
        .route(
            "/{id}/injects/{inject_id}",
            put(update_inject).delete(delete_inject),
        )
}
