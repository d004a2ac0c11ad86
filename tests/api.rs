//! API endpoint integration tests

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use tower::ServiceExt;

mod common;
use common::default_harness;

#[tokio::test]
async fn test_status_endpoint() {
    let h = default_harness();

    let response = h
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/status")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();

    assert_eq!(json["status"], "online");
    assert_eq!(json["service"], "atende-gateway");
    assert!(json["timestamp"].is_string());
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let h = default_harness();

    let response = h
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/no-such-route")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_bind_conflict_surfaces_io_error() {
    use atende_gateway::Error;
    use atende_gateway::api::ApiServer;

    let h = default_harness();

    // Hold the port so the server's bind fails
    let taken = std::net::TcpListener::bind("0.0.0.0:0").unwrap();
    let port = taken.local_addr().unwrap().port();

    let err = ApiServer::new(h.state.clone(), port).run().await.unwrap_err();
    assert!(matches!(err, Error::Io(_)));
}

#[tokio::test]
async fn test_webhook_rejects_missing_body() {
    let h = default_harness();

    let response = h
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/webhook/inst-1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    // No JSON body is a structural reject, not an acknowledgement
    assert!(response.status().is_client_error());
}
