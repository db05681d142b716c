//! Branch CRUD routes.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Json, Router, routing::post, routing::put};
use storyteller_store::{InjectFields, NewBranch};
use storyteller_timeline::model::{Branch, Inject};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

/// POST /{id}/branches
#[instrument(skip(state, request), fields(name = %request.name))]
async fn create_branch(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<NewBranch>,
) -> Result<(StatusCode, Json<Branch>), ApiError> {
    let branch = state.store.create_branch(id, request).await?;
    info!(timeline_id = %id, branch_id = %branch.id, "branch created");
    Ok((StatusCode::CREATED, Json(branch)))
}

/// PUT /{id}/branches/{branch_id}
#[instrument(skip(state, request))]
async fn update_branch(
    State(state): State<AppState>,
    Path((id, branch_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<NewBranch>,
) -> Result<Json<Branch>, ApiError> {
    Ok(Json(state.store.update_branch(id, branch_id, request).await?))
}

/// DELETE /{id}/branches/{branch_id}
#[instrument(skip(state))]
async fn delete_branch(
    State(state): State<AppState>,
    Path((id, branch_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError> {
    state.store.delete_branch(id, branch_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /{id}/branches/{branch_id}/injects
#[instrument(skip(state, request), fields(heading = %request.heading))]
async fn create_branch_inject(
    State(state): State<AppState>,
    Path((id, branch_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<InjectFields>,
) -> Result<(StatusCode, Json<Inject>), ApiError> {
    let inject = state.store.create_branch_inject(id, branch_id, request).await?;
    Ok((StatusCode::CREATED, Json(inject)))
}

/// PUT /{id}/branches/{branch_id}/injects/{inject_id}
///
/// Injects have one update path regardless of where they live; the branch
/// id in the URL is positional only.
#[instrument(skip(state, request))]
async fn update_branch_inject(
    State(state): State<AppState>,
    Path((id, branch_id, inject_id)): Path<(Uuid, Uuid, Uuid)>,
    Json(request): Json<InjectFields>,
) -> Result<Json<Inject>, ApiError> {
    Ok(Json(state.store.update_inject(id, inject_id, request).await?))
}

/// DELETE /{id}/branches/{branch_id}/injects/{inject_id}
#[instrument(skip(state))]
async fn delete_branch_inject(
    State(state): State<AppState>,
    Path((id, branch_id, inject_id)): Path<(Uuid, Uuid, Uuid)>,
) -> Result<StatusCode, ApiError> {
    state
        .store
        .delete_branch_inject(id, branch_id, inject_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Returns the router for branch CRUD.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{id}/branches", post(create_branch))
        .route(
            "/{id}/branches/{branch_id}",
            put(update_branch).delete(delete_branch),
        )
        .route("/{id}/branches/{branch_id}/injects", post(create_branch_inject))
        .route(
            "/{id}/branches/{branch_id}/injects/{inject_id}",
            put(update_branch_inject).delete(delete_branch_inject),
        )
}
