//! API Integration Tests
//!
//! Drive the full router against in-memory stores.

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::{json, Value};
use tower::ServiceExt;
use zhiri_api::auth::{LoginEventType, UserRole};
use zhiri_api::create_router_for_testing;
use zhiri_api::testing::{TestApp, TEST_PASSWORD};

/// Helper to create a test request
fn create_json_request(
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("Content-Type", "application/json")
        .header("User-Agent", "api-tests/1.0");

    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }

    match body {
        Some(json_body) => builder
            .body(Body::from(serde_json::to_string(&json_body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: &TestApp, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

async fn login(app: &TestApp, email: &str, password: &str) -> (StatusCode, Value) {
    send(
        app,
        create_json_request(
            "POST",
            "/api/v1/auth/login",
            None,
            Some(json!({ "email": email, "password": password })),
        ),
    )
    .await
}

async fn login_token(app: &TestApp, email: &str) -> String {
    let (status, json) = login(app, email, TEST_PASSWORD).await;
    assert_eq!(status, StatusCode::OK, "login failed: {json}");
    json["token"].as_str().unwrap().to_string()
}

fn registration(email: &str, phone: &str) -> Value {
    json!({
        "email": email,
        "password": "Secret1!",
        "first_name": "Aigerim",
        "last_name": "Sadykova",
        "phone": phone,
        "city": "Almaty"
    })
}

// =============================================================================
// Health Check Tests
// =============================================================================

#[tokio::test]
async fn test_health_check() {
    let app = create_router_for_testing();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: Value = serde_json::from_slice(&body).unwrap();

    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn test_readiness_check() {
    let app = TestApp::new();

    let (status, json) = send(&app, create_json_request("GET", "/ready", None, None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["ready"], true);
    assert_eq!(json["checks"]["database"], true);
}

#[tokio::test]
async fn test_health_ignores_garbage_token() {
    let app = TestApp::new();

    let (status, _) = send(
        &app,
        create_json_request("GET", "/health", Some("not-a-token"), None),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
}

// =============================================================================
// Session Scenarios
// =============================================================================

#[tokio::test]
async fn test_login_happy_path() {
    let app = TestApp::new();
    let user = app.seed_user("a@x.com", UserRole::User).await;

    let (status, json) = login(&app, "a@x.com", TEST_PASSWORD).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["token_type"], "Bearer");
    assert_eq!(json["expires_in"], 86_400);
    let token = json["token"].as_str().unwrap();

    let (status, me) = send(
        &app,
        create_json_request("GET", "/api/v1/users/me", Some(token), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["email"], "a@x.com");
    assert_eq!(me["role"], "USER");
    assert!(me.get("password_hash").is_none());

    let events = app.login_history.all().await;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].user_id, Some(user.id));
    assert_eq!(events[0].event_type, LoginEventType::Login);
    assert!(events[0].success);
    assert_eq!(events[0].user_agent.as_deref(), Some("api-tests/1.0"));
}

#[tokio::test]
async fn test_login_deactivated_account() {
    let app = TestApp::new();
    let user = app.seed_user("b@x.com", UserRole::User).await;
    app.users.set_active(user.id, false).await.unwrap();

    let (status, json) = login(&app, "b@x.com", TEST_PASSWORD).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["code"], "ACCOUNT_DEACTIVATED");

    let events = app.login_history.all().await;
    assert_eq!(events.len(), 1);
    assert!(!events[0].success);
    assert_eq!(events[0].failure_reason.as_deref(), Some("account deactivated"));
}

#[tokio::test]
async fn test_deactivation_drops_existing_identity() {
    let app = TestApp::new();
    let user = app.seed_user("late@x.com", UserRole::User).await;
    let token = login_token(&app, "late@x.com").await;

    app.users.set_active(user.id, false).await.unwrap();

    let (status, _) = send(
        &app,
        create_json_request("GET", "/api/v1/users/me", Some(&token), None),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_then_reuse() {
    let app = TestApp::new();
    app.seed_user("c@x.com", UserRole::User).await;
    let token = login_token(&app, "c@x.com").await;

    let (status, json) = send(
        &app,
        create_json_request("POST", "/api/v1/auth/logout", Some(&token), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["message"], "Logged out successfully");
    assert_eq!(app.revoked_tokens.len().await, 1);

    let (status, json) = send(
        &app,
        create_json_request("GET", "/api/v1/users/me", Some(&token), None),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["code"], "UNAUTHORIZED");

    // A second logout with the revoked token has no identity behind it
    let (status, _) = send(
        &app,
        create_json_request("POST", "/api/v1/auth/logout", Some(&token), None),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let events = app.login_history.all().await;
    assert_eq!(events.len(), 2);
    assert_eq!(events[1].event_type, LoginEventType::Logout);
}

#[tokio::test]
async fn test_login_unknown_email_matches_wrong_password() {
    let app = TestApp::new();
    app.seed_user("known@x.com", UserRole::User).await;

    let (unknown_status, unknown) = login(&app, "nobody@x.com", TEST_PASSWORD).await;
    let (wrong_status, wrong) = login(&app, "known@x.com", "Wrong1!pw").await;

    assert_eq!(unknown_status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown, wrong);
    assert_eq!(unknown["message"], "Invalid email or password");

    let events = app.login_history.all().await;
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].user_id, None);
    assert_eq!(events[0].email, "nobody@x.com");
    assert_eq!(events[0].failure_reason.as_deref(), Some("user not found"));
    assert_eq!(events[1].failure_reason.as_deref(), Some("wrong password"));
}

#[tokio::test]
async fn test_logout_without_token() {
    let app = TestApp::new();

    let (status, json) = send(
        &app,
        create_json_request("POST", "/api/v1/auth/logout", None, None),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "LOGOUT_WITHOUT_TOKEN");
}

#[tokio::test]
async fn test_me_requires_identity() {
    let app = TestApp::new();

    let (status, _) = send(&app, create_json_request("GET", "/api/v1/users/me", None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &app,
        create_json_request("GET", "/api/v1/users/me", Some("forged.token.value"), None),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// =============================================================================
// Registration Tests
// =============================================================================

#[tokio::test]
async fn test_register_then_login() {
    let app = TestApp::new();

    let (status, json) = send(
        &app,
        create_json_request(
            "POST",
            "/api/v1/auth/register",
            None,
            Some(registration("new@x.com", "77011234567")),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["message"], "Registration successful");
    assert_eq!(json["user"]["email"], "new@x.com");
    assert_eq!(json["user"]["role"], "USER");

    let (status, _) = login(&app, "new@x.com", "Secret1!").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_register_duplicate_email() {
    let app = TestApp::new();
    app.seed_user("taken@x.com", UserRole::User).await;

    let (status, json) = send(
        &app,
        create_json_request(
            "POST",
            "/api/v1/auth/register",
            None,
            Some(registration("taken@x.com", "77017654321")),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["code"], "EMAIL_EXISTS");
}

#[tokio::test]
async fn test_register_rejects_weak_password() {
    let app = TestApp::new();
    let mut body = registration("weak@x.com", "77011112233");
    body["password"] = json!("password");

    let (status, json) = send(
        &app,
        create_json_request("POST", "/api/v1/auth/register", None, Some(body)),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_register_rejects_bad_phone() {
    let app = TestApp::new();

    let (status, _) = send(
        &app,
        create_json_request(
            "POST",
            "/api/v1/auth/register",
            None,
            Some(registration("phone@x.com", "87011234567")),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_malformed_bodies_get_api_error() {
    let app = TestApp::new();

    let truncated = Request::builder()
        .method("POST")
        .uri("/api/v1/auth/login")
        .header("Content-Type", "application/json")
        .body(Body::from(r#"{"email":"#))
        .unwrap();
    let (status, json) = send(&app, truncated).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "INVALID_REQUEST_BODY");
    assert!(json["details"].is_string());

    let (status, json) = send(
        &app,
        create_json_request(
            "POST",
            "/api/v1/auth/register",
            None,
            Some(json!({ "email": "partial@x.com" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["code"], "INVALID_REQUEST_BODY");

    let untyped = Request::builder()
        .method("POST")
        .uri("/api/v1/auth/login")
        .body(Body::from(r#"{"email":"a@x.com","password":"Secret1!"}"#))
        .unwrap();
    let (status, json) = send(&app, untyped).await;
    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert_eq!(json["code"], "INVALID_REQUEST_BODY");

    assert!(app.login_history.all().await.is_empty());
}

// =============================================================================
// Admin Login History Tests
// =============================================================================

#[tokio::test]
async fn test_admin_reads_login_history() {
    let app = TestApp::new();
    let user = app.seed_user("u@x.com", UserRole::User).await;
    app.seed_user("admin@x.com", UserRole::Admin).await;

    login(&app, "u@x.com", "Wrong1!pw").await;
    login_token(&app, "u@x.com").await;
    let admin_token = login_token(&app, "admin@x.com").await;

    let uri = format!("/api/v1/admin/login-history/user/{}?page=0&size=10", user.id);
    let (status, json) = send(&app, create_json_request("GET", &uri, Some(&admin_token), None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total_elements"], 2);
    assert_eq!(json["page"], 0);
    assert_eq!(json["size"], 10);
    let content = json["content"].as_array().unwrap();
    assert_eq!(content.len(), 2);
    assert_eq!(content[0]["success"], true);
    assert_eq!(content[1]["success"], false);
    assert_eq!(content[1]["failure_reason"], "wrong password");

    let uri = format!("/api/v1/admin/login-history/user/{}/stats", user.id);
    let (status, json) = send(&app, create_json_request("GET", &uri, Some(&admin_token), None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["user_id"], user.id.to_string());
    assert_eq!(json["total_successful_logins"], 1);
}

#[tokio::test]
async fn test_admin_routes_reject_other_roles() {
    let app = TestApp::new();
    let user = app.seed_user("p@x.com", UserRole::Partner).await;
    let token = login_token(&app, "p@x.com").await;

    let uri = format!("/api/v1/admin/login-history/user/{}/stats", user.id);

    let (status, json) = send(&app, create_json_request("GET", &uri, Some(&token), None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["code"], "FORBIDDEN");

    let (status, _) = send(&app, create_json_request("GET", &uri, None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
