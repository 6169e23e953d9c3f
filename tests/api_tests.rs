// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API boundary tests that run without a database.
//!
//! These verify authentication, the internal-trigger guard, and the
//! submission failures that short-circuit before any persistence: a
//! malformed track must be rejected without a single database read.

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
};
use serde_json::{json, Value};
use tower::ServiceExt;

mod common;

fn post_json(uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health_is_public() {
    let (app, _) = common::create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_submission_requires_auth() {
    let (app, _) = common::create_test_app();

    let response = app
        .oneshot(post_json(
            "/api/activities",
            None,
            json!({"activity_type": "Run", "track": []}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_submission_rejects_garbage_token() {
    let (app, _) = common::create_test_app();

    let response = app
        .oneshot(post_json(
            "/api/activities",
            Some("not.a.jwt"),
            json!({"activity_type": "Run", "track": []}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_submission_rejects_unrecognized_track_shape() {
    let (app, state) = common::create_test_app();
    let token = common::create_test_jwt("alice", &state.config.jwt_signing_key);

    // First element has neither lat nor a coordinate pair. This fails
    // during normalization, before the (offline) database is touched.
    let response = app
        .oneshot(post_json(
            "/api/activities",
            Some(&token),
            json!({
                "route_id": "r1",
                "activity_type": "Run",
                "track": [{"x": 1.0, "y": 2.0}, {"x": 3.0, "y": 4.0}],
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(response).await;
    assert_eq!(body["error"], "invalid_track");
}

#[tokio::test]
async fn test_submission_rejects_empty_track() {
    let (app, state) = common::create_test_app();
    let token = common::create_test_jwt("alice", &state.config.jwt_signing_key);

    let response = app
        .oneshot(post_json(
            "/api/activities",
            Some(&token),
            json!({
                "route_id": "r1",
                "activity_type": "Run",
                "track": [],
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(response).await;
    assert_eq!(body["error"], "empty_track");
}

#[tokio::test]
async fn test_submission_requires_route_or_challenge() {
    let (app, state) = common::create_test_app();
    let token = common::create_test_jwt("alice", &state.config.jwt_signing_key);

    let response = app
        .oneshot(post_json(
            "/api/activities",
            Some(&token),
            json!({
                "activity_type": "Run",
                "track": [[9.0, 45.0], [9.1, 45.1]],
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_create_route_rejects_bad_geometry() {
    let (app, state) = common::create_test_app();
    let token = common::create_test_jwt("alice", &state.config.jwt_signing_key);

    let response = app
        .oneshot(post_json(
            "/api/routes",
            Some(&token),
            json!({
                "name": "Lakeside loop",
                "geometry": {"type": "Point", "coordinates": [9.0, 45.0]},
                "distance_km": 10.0,
                "activity_type": "Run",
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_create_route_rejects_empty_name() {
    let (app, state) = common::create_test_app();
    let token = common::create_test_jwt("alice", &state.config.jwt_signing_key);

    let response = app
        .oneshot(post_json(
            "/api/routes",
            Some(&token),
            json!({
                "name": "",
                "geometry": {"type": "LineString", "coordinates": [[9.0, 45.0], [9.1, 45.1]]},
                "distance_km": 10.0,
                "activity_type": "Run",
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_tasks_trigger_requires_secret() {
    let (app, _) = common::create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/tasks/close-challenges")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_tasks_trigger_rejects_wrong_secret() {
    let (app, _) = common::create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/tasks/close-challenges")
                .header("x-tasks-token", "wrong")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
