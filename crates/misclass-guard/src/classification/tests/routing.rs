use super::common::*;
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, Request, StatusCode};
use serde_json::json;
use std::sync::Arc;
use tower::ServiceExt;

use crate::classification::router::{classification_router, latest_handler};

fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(&body).expect("serialize body")))
        .expect("request builds")
}

fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .expect("request builds")
}

#[tokio::test]
async fn run_route_creates_an_assessment() {
    let Harness { service, .. } = harness();
    let router = classification_router(Arc::new(service));

    let response = router
        .oneshot(json_request(
            "POST",
            "/api/v1/workers/w-a1/assessments",
            json!({ "organization_id": "org-a" }),
        ))
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = read_json_body(response).await;
    assert_eq!(body["worker_id"], "w-a1");
    assert_eq!(body["overall_risk"], "medium");
    assert_eq!(body["abc"]["score"], 100);
}

#[tokio::test]
async fn run_route_returns_not_found_for_unknown_worker() {
    let Harness { service, .. } = harness();
    let router = classification_router(Arc::new(service));

    let response = router
        .oneshot(json_request(
            "POST",
            "/api/v1/workers/ghost/assessments",
            json!({ "organization_id": "org-a" }),
        ))
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn latest_handler_returns_not_found_before_first_run() {
    let Harness { service, .. } = harness();

    let response = latest_handler::<MemoryStore, MemoryDirectory, MemoryAlerts>(
        State(Arc::new(service)),
        Path("w-a1".to_string()),
    )
    .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = read_json_body(response).await;
    assert_eq!(body["worker_id"], "w-a1");
}

#[tokio::test]
async fn history_route_honours_limit() {
    let Harness { service, .. } = harness();
    for _ in 0..3 {
        service
            .run_assessment(&worker("w-a1"), &org("org-a"))
            .expect("run succeeds");
    }
    let router = classification_router(Arc::new(service));

    let response = router
        .oneshot(empty_request(
            "GET",
            "/api/v1/workers/w-a1/assessments?limit=2",
        ))
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body.as_array().map(Vec::len), Some(2));
}

#[tokio::test]
async fn factor_route_validates_payloads() {
    let Harness { service, .. } = harness();
    let router = classification_router(Arc::new(service));

    let accepted = router
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/workers/w-a1/factors",
            json!({ "category": "set_schedule", "value": { "boolean": true } }),
        ))
        .await
        .expect("router responds");
    assert_eq!(accepted.status(), StatusCode::CREATED);
    let body = read_json_body(accepted).await;
    assert_eq!(body["source"], "manual");

    let rejected = router
        .oneshot(json_request(
            "POST",
            "/api/v1/workers/w-a1/factors",
            json!({ "category": "set_schedule", "value": { "numeric": 3.0 } }),
        ))
        .await
        .expect("router responds");
    assert_eq!(rejected.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn reassessment_route_runs_batch_and_feeds_dashboard() {
    let Harness { service, store, .. } = harness();
    let router = classification_router(Arc::new(service));

    let response = router
        .clone()
        .oneshot(empty_request("POST", "/api/v1/reassessments"))
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let report = read_json_body(response).await;
    assert_eq!(report["succeeded"], 3);
    assert_eq!(report["summary_refreshed"], true);
    assert_eq!(store.refresh_count(), 1);

    let dashboard = router
        .oneshot(empty_request("GET", "/api/v1/organizations/org-a/dashboard"))
        .await
        .expect("router responds");
    assert_eq!(dashboard.status(), StatusCode::OK);
    let body = read_json_body(dashboard).await;
    assert_eq!(body["counts_by_tier"]["medium"], 2);
    assert_eq!(
        body["top_risk_workers"].as_array().map(Vec::len),
        Some(2)
    );
}
