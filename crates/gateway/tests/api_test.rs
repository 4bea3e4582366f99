//! Router tests.
//!
//! These tests drive the full router with the in-memory user directory and
//! revocation store, so no database or Redis connection is needed.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use auth_service_lib::revocation::MockRevocationStore;
use auth_service_lib::{
    AuthService, Authenticator, InMemoryRevocationStore, RegisterInput, RevocationStore,
    TokenService,
};
use common::{AppError, TokenConfig};
use domain::{PasswordPolicy, DUPLICATE_IDENTITY_MESSAGE};
use gateway_lib::config::GatewayConfig;
use gateway_lib::routes::create_router;
use gateway_lib::state::AppState;
use user_service_lib::repository::{InMemoryUserRepository, UserRepository};
use user_service_lib::service::UserManager;

const PASSWORD: &str = "Str0ng!Pass";

struct TestApp {
    router: Router,
    auth: Arc<dyn AuthService>,
}

fn test_app_with_store(store: Arc<dyn RevocationStore>) -> TestApp {
    let users: Arc<dyn UserRepository> = Arc::new(InMemoryUserRepository::new());
    let tokens = TokenService::new(
        TokenConfig {
            access_secret: "test-access-secret-at-least-32-characters".to_string(),
            refresh_secret: "test-refresh-secret-at-least-32-characters".to_string(),
            ..TokenConfig::default()
        },
        store.clone(),
    );
    let auth: Arc<dyn AuthService> = Arc::new(Authenticator::new(
        users.clone(),
        tokens,
        PasswordPolicy::default(),
    ));
    let user_service = Arc::new(UserManager::new(users));

    let state = AppState::new(auth.clone(), user_service, store, GatewayConfig::default());
    TestApp {
        router: create_router(state),
        auth,
    }
}

fn test_app() -> TestApp {
    test_app_with_store(Arc::new(InMemoryRevocationStore::new()))
}

async fn send(app: &TestApp, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn form_request(uri: &str, body: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn authed_json(method: Method, uri: &str, body: Value, token: &str) -> Request<Body> {
    let mut request = json_request(method, uri, body);
    request.headers_mut().insert(
        header::AUTHORIZATION,
        format!("Bearer {}", token).parse().unwrap(),
    );
    request
}

fn bearer_request(method: Method, uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap()
}

async fn register(app: &TestApp, username: &str) -> (StatusCode, Value) {
    send(
        app,
        json_request(
            Method::POST,
            "/api/auth/register",
            json!({
                "username": username,
                "email": format!("{}@example.com", username),
                "password": PASSWORD,
            }),
        ),
    )
    .await
}

async fn login(app: &TestApp, username: &str, password: &str) -> (StatusCode, Value) {
    send(
        app,
        form_request(
            "/api/auth/login",
            &format!("username={}&password={}", username, password),
            None,
        ),
    )
    .await
}

async fn access_token(app: &TestApp, username: &str) -> String {
    let (status, body) = login(app, username, PASSWORD).await;
    assert_eq!(status, StatusCode::OK);
    body["access_token"].as_str().unwrap().to_string()
}

async fn provision_admin(app: &TestApp) -> String {
    app.auth
        .provision(RegisterInput {
            username: "root".to_string(),
            email: "root@example.com".to_string(),
            password: PASSWORD.to_string(),
            role: Some("admin".to_string()),
        })
        .await
        .unwrap();
    access_token(app, "root").await
}

// =============================================================================
// Registration and login
// =============================================================================

#[tokio::test]
async fn test_register_returns_user_without_password() {
    let app = test_app();
    let (status, body) = register(&app, "alice").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "alice");
    assert_eq!(body["email"], "alice@example.com");
    assert_eq!(body["role"], "client");
    assert!(body.get("password").is_none());
    assert!(body.get("password_hash").is_none());
}

#[tokio::test]
async fn test_register_duplicate_identity() {
    let app = test_app();
    register(&app, "alice").await;

    let (status, body) = send(
        &app,
        json_request(
            Method::POST,
            "/api/auth/register",
            json!({
                "username": "alice2",
                "email": "alice@example.com",
                "password": PASSWORD,
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], DUPLICATE_IDENTITY_MESSAGE);
}

#[tokio::test]
async fn test_register_weak_password() {
    let app = test_app();
    let (status, body) = send(
        &app,
        json_request(
            Method::POST,
            "/api/auth/register",
            json!({
                "username": "alice",
                "email": "alice@example.com",
                "password": "password",
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_login_returns_token_pair() {
    let app = test_app();
    register(&app, "alice").await;

    let (status, body) = login(&app, "alice", PASSWORD).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["token_type"], "bearer");
    assert!(body["access_token"].is_string());
    assert!(body["refresh_token"].is_string());
}

#[tokio::test]
async fn test_login_failures_share_one_response() {
    let app = test_app();
    register(&app, "alice").await;

    let (unknown_status, unknown_body) = login(&app, "ghost", PASSWORD).await;
    let (wrong_status, wrong_body) = login(&app, "alice", "Wr0ng!Pass").await;

    assert_eq!(unknown_status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_body, wrong_body);
}

// =============================================================================
// Sessions
// =============================================================================

#[tokio::test]
async fn test_missing_bearer_is_unauthorized() {
    let app = test_app();
    let request = Request::builder()
        .uri("/api/users/me")
        .body(Body::empty())
        .unwrap();

    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_then_reuse_is_unauthorized() {
    let app = test_app();
    register(&app, "alice").await;
    let token = access_token(&app, "alice").await;

    let (status, _) = send(&app, bearer_request(Method::GET, "/api/users/me", &token)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, bearer_request(Method::POST, "/api/auth/logout", &token)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["message"].is_string());

    let (status, _) = send(&app, bearer_request(Method::GET, "/api/users/me", &token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_superseded_refresh_token_is_rejected() {
    let app = test_app();
    register(&app, "alice").await;

    let (_, first) = login(&app, "alice", PASSWORD).await;
    let (_, second) = login(&app, "alice", PASSWORD).await;

    let (status, _) = send(
        &app,
        json_request(
            Method::POST,
            "/api/auth/refresh",
            json!({ "refresh_token": first["refresh_token"] }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(
        &app,
        json_request(
            Method::POST,
            "/api/auth/refresh",
            json!({ "refresh_token": second["refresh_token"] }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["token_type"], "bearer");
}

#[tokio::test]
async fn test_refresh_with_garbage_is_unauthorized() {
    let app = test_app();
    let (status, _) = send(
        &app,
        json_request(
            Method::POST,
            "/api/auth/refresh",
            json!({ "refresh_token": "garbage" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// =============================================================================
// Password recovery
// =============================================================================

#[tokio::test]
async fn test_forgot_password_unknown_email() {
    let app = test_app();
    let (status, _) = send(
        &app,
        form_request("/api/auth/forgot-password", "email=nobody@example.com", None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_reset_password_redirects_and_is_single_use() {
    let app = test_app();
    register(&app, "alice").await;

    let (status, body) = send(
        &app,
        form_request("/api/auth/forgot-password", "email=alice@example.com", None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let reset = body["token"].as_str().unwrap().to_string();

    let form = format!("token={}&new_password=N3w!Password", reset);
    let response = app
        .router
        .clone()
        .oneshot(form_request("/api/auth/reset-password", &form, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/");

    let (status, _) = send(&app, form_request("/api/auth/reset-password", &form, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = login(&app, "alice", "N3w!Password").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_reset_token_is_not_a_session() {
    let app = test_app();
    register(&app, "alice").await;

    let (_, body) = send(
        &app,
        form_request("/api/auth/forgot-password", "email=alice@example.com", None),
    )
    .await;
    let reset = body["token"].as_str().unwrap();

    let (status, _) = send(&app, bearer_request(Method::GET, "/api/users/me", reset)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_change_password_wrong_current() {
    let app = test_app();
    register(&app, "alice").await;
    let token = access_token(&app, "alice").await;

    let (status, _) = send(
        &app,
        form_request(
            "/api/auth/change-password",
            "current_password=Wr0ng!Pass&new_password=N3w!Password",
            Some(&token),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &app,
        form_request(
            "/api/auth/change-password",
            &format!("current_password={}&new_password=N3w!Password", PASSWORD),
            Some(&token),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

// =============================================================================
// Authorization
// =============================================================================

#[tokio::test]
async fn test_client_on_admin_endpoint_is_forbidden() {
    let app = test_app();
    register(&app, "alice").await;
    let token = access_token(&app, "alice").await;

    let (status, body) = send(
        &app,
        bearer_request(Method::GET, "/api/auth/revoked-tokens", &token),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["message"], "Insufficient permissions");

    let new_user = json!({
        "username": "mallory",
        "email": "mallory@example.com",
        "password": PASSWORD,
        "role": "admin",
    });
    let (status, _) = send(&app, authed_json(Method::POST, "/api/users", new_user, &token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_admin_revokes_token() {
    let app = test_app();
    let admin = provision_admin(&app).await;
    register(&app, "alice").await;
    let victim = access_token(&app, "alice").await;

    let form = format!("token={}", victim);
    let (status, _) = send(&app, form_request("/api/auth/revoke-token", &form, Some(&admin))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, form_request("/api/auth/revoke-token", &form, Some(&admin))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        bearer_request(Method::GET, "/api/auth/revoked-tokens", &admin),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body
        .as_array()
        .unwrap()
        .iter()
        .any(|t| t.as_str() == Some(victim.as_str())));

    let (status, _) = send(&app, bearer_request(Method::GET, "/api/users/me", &victim)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_role_change_applies_without_relogin() {
    let app = test_app();
    let admin = provision_admin(&app).await;
    let (_, alice) = register(&app, "alice").await;
    let token = access_token(&app, "alice").await;

    let (status, body) = send(&app, bearer_request(Method::GET, "/api/users", &token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let uri = format!("/api/users/{}/role", alice["id"].as_str().unwrap());
    let request = authed_json(Method::PUT, &uri, json!({ "role": "admin" }), &admin);
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "admin");

    let (status, body) = send(&app, bearer_request(Method::GET, "/api/users", &token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_admin_cannot_delete_self() {
    let app = test_app();
    let admin = provision_admin(&app).await;

    let (_, me) = send(&app, bearer_request(Method::GET, "/api/users/me", &admin)).await;
    let uri = format!("/api/users/{}", me["id"].as_str().unwrap());

    let (status, _) = send(&app, bearer_request(Method::DELETE, &uri, &admin)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// =============================================================================
// Ownership-scoped directory routes
// =============================================================================

#[tokio::test]
async fn test_client_sees_only_own_record() {
    let app = test_app();
    let (_, alice) = register(&app, "alice").await;
    let (_, bob) = register(&app, "bob").await;
    let token = access_token(&app, "alice").await;

    let (status, body) = send(&app, bearer_request(Method::GET, "/api/users", &token)).await;
    assert_eq!(status, StatusCode::OK);
    let listed = body.as_array().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["id"], alice["id"]);

    let own = format!("/api/users/{}", alice["id"].as_str().unwrap());
    let (status, body) = send(&app, bearer_request(Method::GET, &own, &token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "alice");

    let other = format!("/api/users/{}", bob["id"].as_str().unwrap());
    let (status, body) = send(&app, bearer_request(Method::GET, &other, &token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "FORBIDDEN");
}

#[tokio::test]
async fn test_client_cannot_update_another_user() {
    let app = test_app();
    let admin = provision_admin(&app).await;
    register(&app, "alice").await;
    let (_, bob) = register(&app, "bob").await;
    let token = access_token(&app, "alice").await;

    let uri = format!("/api/users/{}", bob["id"].as_str().unwrap());
    let (status, body) = send(
        &app,
        authed_json(Method::PUT, &uri, json!({ "email": "stolen@example.com" }), &token),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(
        body["error"]["message"],
        "You can only update your own user data"
    );

    let (_, body) = send(&app, bearer_request(Method::GET, &uri, &admin)).await;
    assert_eq!(body["email"], "bob@example.com");
}

#[tokio::test]
async fn test_client_updates_own_record() {
    let app = test_app();
    let (_, alice) = register(&app, "alice").await;
    let token = access_token(&app, "alice").await;

    let uri = format!("/api/users/{}", alice["id"].as_str().unwrap());
    let update = json!({
        "email": "alice@new.example.com",
        "password": "N3w!Secret",
        "role": "admin",
    });
    let (status, body) = send(&app, authed_json(Method::PUT, &uri, update, &token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "alice@new.example.com");
    // Roles only change through the admin endpoint
    assert_eq!(body["role"], "client");

    let (status, _) = login(&app, "alice", PASSWORD).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = login(&app, "alice", "N3w!Secret").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_update_rejects_identity_of_another_user() {
    let app = test_app();
    let (_, alice) = register(&app, "alice").await;
    register(&app, "bob").await;
    let token = access_token(&app, "alice").await;

    let uri = format!("/api/users/{}", alice["id"].as_str().unwrap());
    let (status, body) = send(
        &app,
        authed_json(Method::PUT, &uri, json!({ "username": "bob" }), &token),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], DUPLICATE_IDENTITY_MESSAGE);
}

#[tokio::test]
async fn test_rename_ends_existing_sessions() {
    let app = test_app();
    let (_, alice) = register(&app, "alice").await;
    let token = access_token(&app, "alice").await;

    let uri = format!("/api/users/{}", alice["id"].as_str().unwrap());
    let (status, _) = send(
        &app,
        authed_json(Method::PUT, &uri, json!({ "username": "alicia" }), &token),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, bearer_request(Method::GET, "/api/users/me", &token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let token = access_token(&app, "alicia").await;
    let (status, body) = send(&app, bearer_request(Method::GET, "/api/users/me", &token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "alicia");
}

#[tokio::test]
async fn test_admin_updates_any_user() {
    let app = test_app();
    let admin = provision_admin(&app).await;
    let (_, bob) = register(&app, "bob").await;

    let uri = format!("/api/users/{}", bob["id"].as_str().unwrap());
    let (status, body) = send(
        &app,
        authed_json(Method::PUT, &uri, json!({ "email": "robert@example.com" }), &admin),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "robert@example.com");
    assert_eq!(body["username"], "bob");
}

#[tokio::test]
async fn test_admin_creates_user_with_role() {
    let app = test_app();
    let admin = provision_admin(&app).await;

    let new_user = json!({
        "username": "carol",
        "email": "carol@example.com",
        "password": PASSWORD,
        "role": "admin",
    });
    let (status, body) = send(
        &app,
        authed_json(Method::POST, "/api/users", new_user.clone(), &admin),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["role"], "admin");
    assert!(body.get("password_hash").is_none());

    let (status, body) = send(&app, authed_json(Method::POST, "/api/users", new_user, &admin)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], DUPLICATE_IDENTITY_MESSAGE);

    let (status, _) = login(&app, "carol", PASSWORD).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_admin_create_rejects_unknown_role() {
    let app = test_app();
    let admin = provision_admin(&app).await;

    let new_user = json!({
        "username": "dave",
        "email": "dave@example.com",
        "password": PASSWORD,
        "role": "superuser",
    });
    let (status, _) = send(&app, authed_json(Method::POST, "/api/users", new_user, &admin)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_client_deletes_only_own_account() {
    let app = test_app();
    let (_, alice) = register(&app, "alice").await;
    let (_, bob) = register(&app, "bob").await;
    let token = access_token(&app, "alice").await;

    let other = format!("/api/users/{}", bob["id"].as_str().unwrap());
    let (status, _) = send(&app, bearer_request(Method::DELETE, &other, &token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let own = format!("/api/users/{}", alice["id"].as_str().unwrap());
    let (status, _) = send(&app, bearer_request(Method::DELETE, &own, &token)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, bearer_request(Method::GET, "/api/users/me", &token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// =============================================================================
// Infrastructure
// =============================================================================

#[tokio::test]
async fn test_revocation_store_outage_is_503() {
    let mut store = MockRevocationStore::new();
    store
        .expect_exists()
        .returning(|_| Err(AppError::service_unavailable("revocation store")));
    let app = test_app_with_store(Arc::new(store));

    register(&app, "alice").await;
    let token = access_token(&app, "alice").await;

    let (status, body) = send(&app, bearer_request(Method::GET, "/api/users/me", &token)).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"]["code"], "SERVICE_UNAVAILABLE");
}

#[tokio::test]
async fn test_health_check() {
    let app = test_app();
    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();

    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["services"]["revocation_store"]["status"], "healthy");
}
