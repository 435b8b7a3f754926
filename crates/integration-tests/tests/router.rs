//! Router behaviour that does not need a database.
//!
//! Every request here is answered (or rejected) before a query runs, so the
//! context uses a pool that never connects.

#![allow(clippy::unwrap_used)]

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use tuntas_kilat_core::UserId;
use tuntas_kilat_integration_tests::TestContext;
use tuntas_kilat_server::middleware::REQUEST_ID_HEADER;

#[tokio::test]
async fn test_health_is_ok_and_carries_request_id() {
    let ctx = TestContext::offline().unwrap();
    let response = ctx
        .app
        .clone()
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key(REQUEST_ID_HEADER));
    let body = axum::body::to_bytes(response.into_body(), 64).await.unwrap();
    assert_eq!(&body[..], b"ok");
}

#[tokio::test]
async fn test_eta_calculator() {
    let ctx = TestContext::offline().unwrap();
    let (status, body) = ctx
        .send(
            Method::GET,
            "/api/eta?from_lat=-6.220392&from_lng=106.827153&to_lat=-6.175392&to_lng=106.827153",
            None,
            None,
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    let distance = body["distance_km"].as_f64().unwrap();
    assert!((distance - 5.0).abs() < 0.1, "distance {distance}");
    // 5 km at 30 km/h
    assert!((body["eta_minutes"].as_f64().unwrap() - 10.0).abs() < 0.2);
    let whole = body["eta_whole_minutes"].as_u64().unwrap();
    assert!((10..=11).contains(&whole), "whole minutes {whole}");
    assert!((body["average_speed_kmh"].as_f64().unwrap() - 30.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_eta_rejects_bad_coordinates() {
    let ctx = TestContext::offline().unwrap();

    let (status, body) = ctx
        .send(
            Method::GET,
            "/api/eta?from_lat=95&from_lng=106.8&to_lat=-6.2&to_lng=106.8",
            None,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("latitude"));

    let (status, body) = ctx
        .send(Method::GET, "/api/eta?from_lat=-6.2", None, None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_missing_identity_is_unauthorized() {
    let ctx = TestContext::offline().unwrap();

    for (method, uri) in [
        (Method::GET, "/api/users/me"),
        (Method::GET, "/api/orders"),
        (Method::POST, "/api/orders/1/status"),
        (Method::GET, "/api/admin/dashboard"),
        (Method::GET, "/ws"),
    ] {
        let (status, body) = ctx.send(method.clone(), uri, None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{method} {uri}");
        assert!(body["error"].is_string(), "{method} {uri}");
    }
}

#[tokio::test]
async fn test_malformed_identity_is_unauthorized() {
    let ctx = TestContext::offline().unwrap();
    let request = Request::get("/api/users/me")
        .header("x-user-id", "not-a-number")
        .body(Body::empty())
        .unwrap();

    let response = ctx.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_invalid_json_body_is_bad_request() {
    let ctx = TestContext::offline().unwrap();
    let request = Request::post("/api/users")
        .header("content-type", "application/json")
        .body(Body::from("{\"name\": "))
        .unwrap();

    let response = ctx.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = axum::body::to_bytes(response.into_body(), 4096)
        .await
        .unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_missing_fields_are_bad_request() {
    let ctx = TestContext::offline().unwrap();
    let (status, _) = ctx
        .send(
            Method::POST,
            "/api/promotions/validate",
            None,
            Some(&json!({ "code": "KILAT10" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let ctx = TestContext::offline().unwrap();
    let (status, _) = ctx
        .send(Method::GET, "/api/nope", Some(UserId::new(1)), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
