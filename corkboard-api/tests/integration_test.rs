/// Integration tests for the API surface
///
/// These run against a router wired to unreachable backends, so they
/// cover everything that happens before the first database query:
/// routing, the identity-resolution layer, credential rejection, the
/// error envelope, and response headers. Database-backed flows are
/// covered by the unit tests on the pure decision cores.

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::TestContext;
use corkboard_api::error::ErrorResponse;
use tower::Service as _;

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

/// Health responds even when the database is down
#[tokio::test]
async fn test_health_degraded_without_database() {
    let mut ctx = TestContext::new().unwrap();

    let request = Request::builder()
        .method("GET")
        .uri("/health")
        .body(Body::empty())
        .unwrap();

    let response = ctx.app.call(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "degraded");
    assert_eq!(json["database"], "disconnected");
}

/// A protected route with no credentials is a 401 with the error envelope
#[tokio::test]
async fn test_authentication_required() {
    let mut ctx = TestContext::new().unwrap();

    let request = Request::builder()
        .method("GET")
        .uri("/api/projects")
        .body(Body::empty())
        .unwrap();

    let response = ctx.app.call(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let envelope: ErrorResponse = serde_json::from_slice(&body).unwrap();
    assert_eq!(envelope.error, "unauthorized");
}

/// A bearer token that is not a signed token resolves to no identity
#[tokio::test]
async fn test_malformed_bearer_token_rejected() {
    let mut ctx = TestContext::new().unwrap();

    let request = Request::builder()
        .method("GET")
        .uri("/api/projects")
        .header("authorization", "Bearer not-a-signed-token")
        .body(Body::empty())
        .unwrap();

    let response = ctx.app.call(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

/// A token signed with the wrong secret is rejected before any lookup
#[tokio::test]
async fn test_wrong_secret_token_rejected() {
    let mut ctx = TestContext::new().unwrap();

    let forged = corkboard_shared::auth::token::sign(
        uuid::Uuid::new_v4(),
        "a-completely-different-32-byte-secret!!",
    )
    .unwrap();

    let request = Request::builder()
        .method("GET")
        .uri("/api/projects")
        .header("authorization", format!("Bearer {}", forged))
        .body(Body::empty())
        .unwrap();

    let response = ctx.app.call(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

/// An API key that fails the format check resolves to no identity
#[tokio::test]
async fn test_malformed_api_key_rejected() {
    let mut ctx = TestContext::new().unwrap();

    let request = Request::builder()
        .method("DELETE")
        .uri("/api/access-tokens/me")
        .header("x-api-key", "definitely-not-a-key")
        .body(Body::empty())
        .unwrap();

    let response = ctx.app.call(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

/// Unknown paths fall through to 404
#[tokio::test]
async fn test_unknown_route_is_404() {
    let mut ctx = TestContext::new().unwrap();

    let request = Request::builder()
        .method("GET")
        .uri("/api/nope")
        .body(Body::empty())
        .unwrap();

    let response = ctx.app.call(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

/// Security headers ride on every response
#[tokio::test]
async fn test_security_headers_present() {
    let mut ctx = TestContext::new().unwrap();

    let request = Request::builder()
        .method("GET")
        .uri("/health")
        .body(Body::empty())
        .unwrap();

    let response = ctx.app.call(request).await.unwrap();

    let headers = response.headers();
    assert_eq!(headers.get("X-Content-Type-Options").unwrap(), "nosniff");
    assert_eq!(headers.get("X-Frame-Options").unwrap(), "DENY");
    // HSTS only in production mode
    assert!(headers.get("Strict-Transport-Security").is_none());
}
