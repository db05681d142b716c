//! Integration tests for storyline and inject CRUD.

mod common;

use axum::http::StatusCode;
use serde_json::json;

#[tokio::test]
async fn test_create_and_list_storylines() {
    let (app, _dir) = common::build_test_app().await;

    let (status, created) =
        common::post_json(app.clone(), "/api/v1/storylines", &json!({"name": "Exercise Alpha"}))
            .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["name"], "Exercise Alpha");

    let (status, listed) = common::get_json(app, "/api/v1/storylines").await;
    assert_eq!(status, StatusCode::OK);
    let rows = listed.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["name"], "Exercise Alpha");
    assert_eq!(rows[0]["inject_count"], 0);
}

#[tokio::test]
async fn test_create_storyline_with_blank_name_returns_400() {
    let (app, _dir) = common::build_test_app().await;

    let (status, json) =
        common::post_json(app, "/api/v1/storylines", &json!({"name": "  "})).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "validation_error");
}

#[tokio::test]
async fn test_get_unknown_storyline_returns_404() {
    let (app, _dir) = common::build_test_app().await;

    let (status, json) = common::get_json(
        app,
        "/api/v1/storylines/00000000-0000-0000-0000-000000000000",
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "not_found");
}

#[tokio::test]
async fn test_rename_and_delete_storyline() {
    let (app, _dir) = common::build_test_app().await;
    let (_, created) =
        common::post_json(app.clone(), "/api/v1/storylines", &json!({"name": "Draft"})).await;
    let id = created["id"].as_str().unwrap().to_owned();

    let (status, _) = common::put_json(
        app.clone(),
        &format!("/api/v1/storylines/{id}"),
        &json!({"name": "Final"}),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, fetched) = common::get_json(app.clone(), &format!("/api/v1/storylines/{id}")).await;
    assert_eq!(fetched["name"], "Final");

    let (status, _) = common::delete(app.clone(), &format!("/api/v1/storylines/{id}")).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = common::get_json(app, &format!("/api/v1/storylines/{id}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_inject_crud_round_trip() {
    let (app, _dir) = common::build_test_app().await;
    let (_, storyline) =
        common::post_json(app.clone(), "/api/v1/storylines", &json!({"name": "s"})).await;
    let id = storyline["id"].as_str().unwrap().to_owned();

    // Create.
    let (status, inject) = common::post_json(
        app.clone(),
        &format!("/api/v1/storylines/{id}/injects"),
        &json!({
            "heading": "First contact",
            "body": "A signal arrives.",
            "notes": "read slowly",
            "duration_seconds": 30,
            "day": 1,
            "time_label": "08:30",
            "visibility": ["Wizard"]
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(inject["heading"], "First contact");
    let inject_id = inject["id"].as_str().unwrap().to_owned();

    // Update.
    let (status, updated) = common::put_json(
        app.clone(),
        &format!("/api/v1/storylines/{id}/injects/{inject_id}"),
        &json!({"heading": "First contact (rev)", "duration_seconds": 45}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["heading"], "First contact (rev)");
    assert_eq!(updated["duration_seconds"], 45);

    // Delete.
    let (status, _) = common::delete(
        app.clone(),
        &format!("/api/v1/storylines/{id}/injects/{inject_id}"),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, fetched) = common::get_json(app, &format!("/api/v1/storylines/{id}")).await;
    assert_eq!(fetched["injects"].as_array().unwrap().len(), 0);
}
