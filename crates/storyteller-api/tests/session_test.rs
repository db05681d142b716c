//! Integration tests for activation and session status.

mod common;

use axum::http::StatusCode;
use serde_json::json;

#[tokio::test]
async fn test_session_status_is_empty_before_activation() {
    let (app, _dir) = common::build_test_app().await;

    let (status, state) = common::get_json(app, "/api/v1/session").await;

    assert_eq!(status, StatusCode::OK);
    assert!(state["timeline_id"].is_null());
    assert!(state["position"].is_null());
    assert_eq!(state["playing"], false);
}

#[tokio::test]
async fn test_activating_a_storyline_resets_the_session_to_its_start() {
    let (app, _dir) = common::build_test_app().await;
    let (_, storyline) =
        common::post_json(app.clone(), "/api/v1/storylines", &json!({"name": "s"})).await;
    let id = storyline["id"].as_str().unwrap().to_owned();
    common::post_json(
        app.clone(),
        &format!("/api/v1/storylines/{id}/injects"),
        &json!({"heading": "opening", "duration_seconds": 12}),
    )
    .await;

    let (status, _) =
        common::post_empty(app.clone(), &format!("/api/v1/storylines/{id}/activate")).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, state) = common::get_json(app, "/api/v1/session").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(state["timeline_id"], json!(id));
    assert_eq!(state["position"], json!({"kind": "on_main", "index": 0}));
    assert_eq!(state["displayed"]["heading"], "opening");
    assert_eq!(state["playing"], false);
    assert_eq!(state["remaining_seconds"], 12);
}

#[tokio::test]
async fn test_activating_an_unknown_storyline_returns_409() {
    let (app, _dir) = common::build_test_app().await;

    let (status, json) = common::post_empty(
        app,
        "/api/v1/storylines/00000000-0000-0000-0000-000000000000/activate",
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"], "invalid_operation");
}

#[tokio::test]
async fn test_deleting_the_active_storyline_clears_the_session() {
    let (app, _dir) = common::build_test_app().await;
    let (_, storyline) =
        common::post_json(app.clone(), "/api/v1/storylines", &json!({"name": "s"})).await;
    let id = storyline["id"].as_str().unwrap().to_owned();
    common::post_json(
        app.clone(),
        &format!("/api/v1/storylines/{id}/injects"),
        &json!({"heading": "only"}),
    )
    .await;
    common::post_empty(app.clone(), &format!("/api/v1/storylines/{id}/activate")).await;

    let (status, _) = common::delete(app.clone(), &format!("/api/v1/storylines/{id}")).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, state) = common::get_json(app, "/api/v1/session").await;
    assert!(state["timeline_id"].is_null());
    assert!(state["position"].is_null());
}

#[tokio::test]
async fn test_activating_an_empty_storyline_leaves_position_unset() {
    let (app, _dir) = common::build_test_app().await;
    let (_, storyline) =
        common::post_json(app.clone(), "/api/v1/storylines", &json!({"name": "empty"})).await;
    let id = storyline["id"].as_str().unwrap().to_owned();

    let (status, _) =
        common::post_empty(app.clone(), &format!("/api/v1/storylines/{id}/activate")).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, state) = common::get_json(app, "/api/v1/session").await;
    assert_eq!(state["timeline_id"], json!(id));
    assert!(state["position"].is_null());
}
