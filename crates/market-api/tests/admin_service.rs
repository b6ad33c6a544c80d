//! admin-service 라우터 통합 테스트.
//!
//! 피어 서비스는 mockito 서버로 대체합니다.

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use market_api::{admin_service_router, AdminState, PeerClient};
use market_auth::{AccountStatus, Principal, Role, RoleSet, TokenIssuer, TokenVerifier};
use market_core::{AuthConfig, PeerConfig};
use serde_json::Value;
use std::time::Duration;
use tower::ServiceExt;

const TEST_SECRET: &str = "test-secret-key-for-jwt-testing-minimum-32-chars";

fn token_for(role: Role) -> String {
    let issuer = TokenIssuer::new(&AuthConfig::with_secret(TEST_SECRET)).unwrap();
    issuer
        .issue_access_token(&Principal {
            id: 1,
            name: "Operator".into(),
            email: "operator@example.com".into(),
            mobile: None,
            roles: RoleSet::single(role),
            status: AccountStatus::Active,
        })
        .unwrap()
        .token
}

fn app(peer_url: &str) -> Router {
    let verifier = TokenVerifier::new(&AuthConfig::with_secret(TEST_SECRET)).unwrap();
    let peers = PeerClient::new(&PeerConfig {
        auth_service_url: peer_url.to_string(),
        shop_service_url: peer_url.to_string(),
        timeout_secs: 5,
        max_retries: 0,
    })
    .unwrap();
    admin_service_router(AdminState::new(verifier, peers), None, Duration::from_secs(30))
}

async fn send(app: &Router, method: Method, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let response = app
        .clone()
        .oneshot(builder.body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

#[tokio::test]
async fn test_block_user_forwarded() {
    let admin = token_for(Role::Admin);
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("PATCH", "/api/users/5/block")
        .match_header("authorization", format!("Bearer {admin}").as_str())
        .with_status(200)
        .with_body(r#"{"message":"user blocked"}"#)
        .expect(1)
        .create_async()
        .await;

    let app = app(&server.url());
    let (status, body) = send(&app, Method::PATCH, "/api/admins/user/5/block", Some(&admin)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["operation"], "block_user");
    assert_eq!(body["target_id"], 5);
    assert_eq!(body["result"]["message"], "user blocked");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_shop_approval_by_superadmin() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("PATCH", "/api/shops/8/approve")
        .with_status(200)
        .with_body(r#"{"message":"shop approved"}"#)
        .create_async()
        .await;

    let app = app(&server.url());
    let token = token_for(Role::SuperAdmin);
    let (status, body) = send(&app, Method::PATCH, "/api/admins/shop/8/approve", Some(&token)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["operation"], "approve_shop");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_non_staff_rejected_without_peer_call() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("DELETE", "/api/users/5")
        .expect(0)
        .create_async()
        .await;

    let app = app(&server.url());

    let (status, _) = send(&app, Method::DELETE, "/api/admins/user/5", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let seller = token_for(Role::Seller);
    let (status, body) = send(&app, Method::DELETE, "/api/admins/user/5", Some(&seller)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "FORBIDDEN");

    mock.assert_async().await;
}

#[tokio::test]
async fn test_peer_not_found_mapped() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/api/users/404/reset-password")
        .with_status(404)
        .create_async()
        .await;

    let app = app(&server.url());
    let admin = token_for(Role::Admin);
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/admins/user/404/reset-password",
        Some(&admin),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "PEER_ERROR");
    assert_eq!(body["details"]["operation"], "reset_password");
}

#[tokio::test]
async fn test_peer_failure_is_bad_gateway() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("PATCH", "/api/shops/3/block")
        .with_status(500)
        .create_async()
        .await;

    let app = app(&server.url());
    let admin = token_for(Role::Admin);
    let (status, body) = send(&app, Method::PATCH, "/api/admins/shop/3/block", Some(&admin)).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["code"], "PEER_ERROR");
}

#[tokio::test]
async fn test_dashboard_and_health() {
    let app = app("http://127.0.0.1:9");
    let admin = token_for(Role::Admin);

    let (status, body) = send(&app, Method::GET, "/api/admins/dashboard", Some(&admin)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["email"], "operator@example.com");

    let (status, _) = send(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_service_metrics_counts_actions() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("PATCH", "/api/users/5/approve")
        .with_status(200)
        .with_body(r#"{"message":"user approved"}"#)
        .create_async()
        .await;
    server
        .mock("PATCH", "/api/shops/6/block")
        .with_status(503)
        .create_async()
        .await;

    let app = app(&server.url());
    let admin = token_for(Role::Admin);

    let (status, body) = send(&app, Method::GET, "/api/admins/metrics", Some(&admin)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["forwarded_actions"], 0);
    assert_eq!(body["failed_actions"], 0);
    assert_eq!(body["peer_max_retries"], 0);

    for _ in 0..2 {
        let (status, _) =
            send(&app, Method::PATCH, "/api/admins/user/5/approve", Some(&admin)).await;
        assert_eq!(status, StatusCode::OK);
    }
    let (status, _) = send(&app, Method::PATCH, "/api/admins/shop/6/block", Some(&admin)).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);

    let (status, body) = send(&app, Method::GET, "/api/admins/metrics", Some(&admin)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["forwarded_actions"], 2);
    assert_eq!(body["failed_actions"], 1);
    assert!(body["uptime_secs"].as_i64().unwrap() >= 0);

    let (status, _) = send(&app, Method::GET, "/api/admins/metrics", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
