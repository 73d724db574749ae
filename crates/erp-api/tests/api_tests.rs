//! API Integration Tests
//!
//! Every test drives the full router against a freshly seeded in-memory
//! store, so tests are independent of each other.
//!
//! Author: hephaex@gmail.com

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use erp_api::auth::Identity;
use erp_api::create_router;
use erp_api::testing::{
    test_config, test_state, test_state_with_config, token_for, TEST_ADMIN_PASSWORD,
};
use erp_core::{PermissionSet, RoleName};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

/// Helper to create a test request
fn create_json_request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");

    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }

    match body {
        Some(json_body) => builder
            .body(Body::from(serde_json::to_string(&json_body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, json)
}

async fn login(app: &Router, username: &str, password: &str) -> (StatusCode, Value) {
    send(
        app,
        create_json_request(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "username": username, "password": password })),
        ),
    )
    .await
}

async fn admin_token(app: &Router) -> String {
    let (status, body) = login(app, "admin", TEST_ADMIN_PASSWORD).await;
    assert_eq!(status, StatusCode::OK);
    body["token"].as_str().unwrap().to_string()
}

/// Create a user through the API and return a token for them
async fn user_token(app: &Router, admin: &str, username: &str, role: &str) -> String {
    let (status, _) = send(
        app,
        create_json_request(
            "POST",
            "/api/users",
            Some(admin),
            Some(json!({
                "username": username,
                "email": format!("{username}@example.com"),
                "password": "Str0ngPass",
                "role": role,
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = login(app, username, "Str0ngPass").await;
    assert_eq!(status, StatusCode::OK);
    body["token"].as_str().unwrap().to_string()
}

// =============================================================================
// Health and fallback
// =============================================================================

#[tokio::test]
async fn test_health_check() {
    let app = create_router(test_state().await);

    let (status, json) = send(&app, create_json_request("GET", "/health", None, None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["service"], "erp-api");
    assert_eq!(json["mode"], "test");
    assert!(json["version"].is_string());
    assert!(json["timestamp"].is_string());
}

#[tokio::test]
async fn test_unknown_route_returns_404() {
    let app = create_router(test_state().await);

    let (status, json) = send(&app, create_json_request("GET", "/api/nothing-here", None, None)).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["code"], "NOT_FOUND");
    assert_eq!(json["message"], "Route not found");
}

#[tokio::test]
async fn test_openapi_document_served() {
    let app = create_router(test_state().await);

    let (status, json) = send(
        &app,
        create_json_request("GET", "/api-docs/openapi.json", None, None),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(json["paths"]["/api/auth/login"].is_object());
    assert!(json["components"]["securitySchemes"]["bearer_auth"].is_object());
}

#[tokio::test]
async fn test_security_headers_on_every_response() {
    let app = create_router(test_state().await);

    for uri in ["/health", "/api/users", "/missing"] {
        let response = app
            .clone()
            .oneshot(create_json_request("GET", uri, None, None))
            .await
            .unwrap();
        let headers = response.headers();
        assert_eq!(headers.get("x-content-type-options").unwrap(), "nosniff", "{uri}");
        assert_eq!(headers.get("x-frame-options").unwrap(), "DENY", "{uri}");
        assert!(headers.get("strict-transport-security").is_some(), "{uri}");
        assert!(headers.get("content-security-policy").is_some(), "{uri}");
    }
}

// =============================================================================
// Login flow
// =============================================================================

#[tokio::test]
async fn test_login_success_returns_token_and_public_user() {
    let app = create_router(test_state().await);

    let (status, json) = login(&app, "admin", TEST_ADMIN_PASSWORD).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["message"], "Login successful");
    assert!(json["token"].as_str().is_some_and(|t| t.split('.').count() == 3));
    assert_eq!(json["user"]["username"], "admin");
    assert_eq!(json["user"]["role"], "admin");
    assert!(json["user"].get("passwordHash").is_none());
    assert!(json["user"].get("password_hash").is_none());
}

#[tokio::test]
async fn test_login_failures_are_indistinguishable() {
    let app = create_router(test_state().await);

    let (unknown_status, unknown_body) = login(&app, "nobody", "Whatever1").await;
    let (wrong_status, wrong_body) = login(&app, "admin", "WrongPass1").await;

    assert_eq!(unknown_status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_body, wrong_body);
    assert_eq!(unknown_body["code"], "INVALID_CREDENTIALS");
}

#[tokio::test]
async fn test_login_missing_fields_is_validation_error() {
    let app = create_router(test_state().await);

    let (status, json) = send(
        &app,
        create_json_request("POST", "/api/auth/login", None, Some(json!({ "username": "admin" }))),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_malformed_json_is_rejected() {
    let app = create_router(test_state().await);

    let request = Request::builder()
        .method("POST")
        .uri("/api/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, json) = send(&app, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_login_burst_is_rate_limited() {
    let mut config = test_config();
    config.rate_limit.enabled = true;
    config.rate_limit.login_burst = 3;
    config.rate_limit.login_replenish_ms = 60_000;
    let app = create_router(test_state_with_config(config).await);

    let attempt = |ip: &str| {
        Request::builder()
            .method("POST")
            .uri("/api/auth/login")
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-forwarded-for", ip)
            .body(Body::from(
                json!({ "username": "admin", "password": "Guess1234" }).to_string(),
            ))
            .unwrap()
    };

    for _ in 0..3 {
        let (status, _) = send(&app, attempt("203.0.113.7")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    let response = app.clone().oneshot(attempt("203.0.113.7")).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(response.headers().get("x-frame-options").is_some());

    // Another client still reaches the login check
    let (status, _) = send(&app, attempt("203.0.113.8")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_is_stateless() {
    let app = create_router(test_state().await);
    let token = admin_token(&app).await;

    let (status, json) = send(&app, create_json_request("POST", "/api/auth/logout", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["message"], "Logout successful");

    // The token stays valid until it expires
    let (status, _) = send(&app, create_json_request("GET", "/api/auth/me", Some(&token), None)).await;
    assert_eq!(status, StatusCode::OK);
}

// =============================================================================
// Authentication gate
// =============================================================================

#[tokio::test]
async fn test_protected_route_requires_token() {
    let app = create_router(test_state().await);

    let (status, json) = send(&app, create_json_request("GET", "/api/users", None, None)).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["code"], "UNAUTHORIZED");
    assert_eq!(json["message"], "No token provided");
}

#[tokio::test]
async fn test_invalid_token_rejected() {
    let app = create_router(test_state().await);

    let (status, json) = send(
        &app,
        create_json_request("GET", "/api/users", Some("not.a.token"), None),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["message"], "Invalid or expired token");
}

#[tokio::test]
async fn test_non_bearer_scheme_rejected() {
    let app = create_router(test_state().await);

    let request = Request::builder()
        .uri("/api/auth/me")
        .header(header::AUTHORIZATION, "Basic YWRtaW46YWRtaW4=")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, request).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_me_echoes_token_identity() {
    let app = create_router(test_state().await);
    let token = admin_token(&app).await;

    let (status, json) = send(&app, create_json_request("GET", "/api/auth/me", Some(&token), None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["username"], "admin");
    assert_eq!(json["role"], "admin");
    assert_eq!(json["permissions"], json!(["*"]));
}

// =============================================================================
// Authorization gate
// =============================================================================

#[tokio::test]
async fn test_insufficient_permission_returns_403_with_details() {
    let app = create_router(test_state().await);
    let admin = admin_token(&app).await;
    let token = user_token(&app, &admin, "reader", "user").await;

    // Default user role can read but not create
    let (status, _) = send(&app, create_json_request("GET", "/api/users", Some(&token), None)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, json) = send(
        &app,
        create_json_request(
            "POST",
            "/api/roles",
            Some(&token),
            Some(json!({ "name": "sneaky", "permissions": ["users:delete"] })),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["code"], "FORBIDDEN");
    assert_eq!(json["details"]["required"], json!(["roles:create"]));
    assert_eq!(json["details"]["current"], json!(["roles:read", "users:read"]));
}

#[tokio::test]
async fn test_permissions_are_checked_independently() {
    let app = create_router(test_state().await);
    let admin = admin_token(&app).await;

    let (status, _) = send(
        &app,
        create_json_request(
            "POST",
            "/api/roles",
            Some(&admin),
            Some(json!({ "name": "user-viewer", "permissions": ["users:read"] })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let token = user_token(&app, &admin, "viewer", "user-viewer").await;

    let (status, _) = send(&app, create_json_request("GET", "/api/users", Some(&token), None)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, json) = send(&app, create_json_request("GET", "/api/roles", Some(&token), None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["details"]["required"], json!(["roles:read"]));
}

#[tokio::test]
async fn test_wildcard_membership_does_not_grant() {
    let state = test_state().await;
    let app = create_router(state.clone());

    let forged = Identity {
        id: Uuid::new_v4(),
        username: "mallory".to_string(),
        role: RoleName::user(),
        permissions: PermissionSet::wildcard(),
    };
    let token = token_for(&state, &forged);

    let (status, _) = send(&app, create_json_request("GET", "/api/users", Some(&token), None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_admin_role_bypasses_permission_check() {
    let state = test_state().await;
    let app = create_router(state.clone());

    // Admin role with an empty permission set still passes every gate
    let admin = Identity {
        id: Uuid::new_v4(),
        username: "root".to_string(),
        role: RoleName::admin(),
        permissions: PermissionSet::new(),
    };
    let token = token_for(&state, &admin);

    let (status, _) = send(&app, create_json_request("GET", "/api/roles", Some(&token), None)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_token_keeps_permissions_frozen_until_relogin() {
    let app = create_router(test_state().await);
    let admin = admin_token(&app).await;

    let (status, _) = send(
        &app,
        create_json_request(
            "POST",
            "/api/roles",
            Some(&admin),
            Some(json!({ "name": "guest", "permissions": [] })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, created) = send(
        &app,
        create_json_request(
            "POST",
            "/api/users",
            Some(&admin),
            Some(json!({
                "username": "carol",
                "email": "carol@example.com",
                "password": "Str0ngPass",
                "role": "user",
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let (_, body) = login(&app, "carol", "Str0ngPass").await;
    let old_token = body["token"].as_str().unwrap().to_string();

    // Move carol to a role without any permission
    let uri = format!("/api/users/{}", created["id"].as_str().unwrap());
    let (status, updated) = send(
        &app,
        create_json_request("PUT", &uri, Some(&admin), Some(json!({ "role": "guest" }))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["permissions"], json!([]));

    // The old token still carries the snapshot taken at login
    let (status, me) = send(&app, create_json_request("GET", "/api/auth/me", Some(&old_token), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["role"], "user");
    assert_eq!(me["permissions"], json!(["roles:read", "users:read"]));

    let (status, _) = send(&app, create_json_request("GET", "/api/users", Some(&old_token), None)).await;
    assert_eq!(status, StatusCode::OK);

    // A fresh login picks up the new role
    let (_, body) = login(&app, "carol", "Str0ngPass").await;
    let new_token = body["token"].as_str().unwrap().to_string();

    let (_, me) = send(&app, create_json_request("GET", "/api/auth/me", Some(&new_token), None)).await;
    assert_eq!(me["role"], "guest");
    assert_eq!(me["permissions"], json!([]));

    let (status, _) = send(&app, create_json_request("GET", "/api/users", Some(&new_token), None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_permission_catalog_needs_only_authentication() {
    let app = create_router(test_state().await);
    let admin = admin_token(&app).await;

    let (status, _) = send(&app, create_json_request("GET", "/api/roles/permissions", None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // A role with no permissions at all may still read the catalog
    let (status, _) = send(
        &app,
        create_json_request(
            "POST",
            "/api/roles",
            Some(&admin),
            Some(json!({ "name": "nobody", "permissions": [] })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let token = user_token(&app, &admin, "empty", "nobody").await;

    let (status, json) = send(
        &app,
        create_json_request("GET", "/api/roles/permissions", Some(&token), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json.as_array().unwrap().len(), 20);
    assert!(json.as_array().unwrap().contains(&json!("accounting:delete")));
}

// =============================================================================
// User administration
// =============================================================================

#[tokio::test]
async fn test_create_user_snapshots_role_permissions() {
    let app = create_router(test_state().await);
    let admin = admin_token(&app).await;

    let (status, json) = send(
        &app,
        create_json_request(
            "POST",
            "/api/users",
            Some(&admin),
            Some(json!({
                "username": "alice",
                "email": "alice@example.com",
                "password": "Str0ngPass",
                "role": "user",
            })),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["username"], "alice");
    assert_eq!(json["permissions"], json!(["roles:read", "users:read"]));
    assert!(json.get("password").is_none());
}

#[tokio::test]
async fn test_create_user_rejections() {
    let app = create_router(test_state().await);
    let admin = admin_token(&app).await;

    let cases = [
        (
            json!({ "username": "admin", "email": "x@example.com", "password": "Str0ngPass", "role": "user" }),
            "Username already exists",
        ),
        (
            json!({ "username": "bob", "email": "admin@erp.com", "password": "Str0ngPass", "role": "user" }),
            "Email already exists",
        ),
        (
            json!({ "username": "bob", "email": "bob@example.com", "password": "weakpass1", "role": "user" }),
            "Password must contain at least one uppercase letter",
        ),
        (
            json!({ "username": "bob", "email": "bob@example.com", "password": "Str0ngPass", "role": "ghost" }),
            "Invalid role",
        ),
    ];

    for (body, message) in cases {
        let (status, json) = send(&app, create_json_request("POST", "/api/users", Some(&admin), Some(body))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{message}");
        assert_eq!(json["message"], message);
    }
}

#[tokio::test]
async fn test_cannot_delete_last_admin() {
    let app = create_router(test_state().await);
    let admin = admin_token(&app).await;

    let (_, me) = send(&app, create_json_request("GET", "/api/auth/me", Some(&admin), None)).await;
    let uri = format!("/api/users/{}", me["id"].as_str().unwrap());

    let (status, json) = send(&app, create_json_request("DELETE", &uri, Some(&admin), None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "INVARIANT_VIOLATION");
    assert_eq!(json["message"], "Cannot delete the last admin user");

    // With a second admin the deletion goes through
    user_token(&app, &admin, "admin2", "admin").await;
    let (status, json) = send(&app, create_json_request("DELETE", &uri, Some(&admin), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["message"], "User deleted successfully");
}

#[tokio::test]
async fn test_unparseable_user_id_is_not_found() {
    let app = create_router(test_state().await);
    let admin = admin_token(&app).await;

    let (status, json) = send(&app, create_json_request("GET", "/api/users/42", Some(&admin), None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["message"], "User not found");
}

// =============================================================================
// Role administration
// =============================================================================

#[tokio::test]
async fn test_create_role_with_invalid_permissions() {
    let app = create_router(test_state().await);
    let admin = admin_token(&app).await;

    let (status, json) = send(
        &app,
        create_json_request(
            "POST",
            "/api/roles",
            Some(&admin),
            Some(json!({ "name": "ops", "permissions": ["users:read", "bogus:perm", "ships:sail"] })),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["message"], "Invalid permissions");
    assert_eq!(json["details"]["invalid"], json!(["bogus:perm", "ships:sail"]));
}

#[tokio::test]
async fn test_system_roles_are_protected() {
    let app = create_router(test_state().await);
    let admin = admin_token(&app).await;

    let (_, roles) = send(&app, create_json_request("GET", "/api/roles", Some(&admin), None)).await;
    let id_of = |name: &str| {
        roles
            .as_array()
            .unwrap()
            .iter()
            .find(|r| r["name"] == name)
            .map(|r| r["id"].as_str().unwrap().to_string())
            .unwrap()
    };

    let admin_uri = format!("/api/roles/{}", id_of("admin"));
    let user_uri = format!("/api/roles/{}", id_of("user"));

    let (status, json) = send(
        &app,
        create_json_request("PUT", &admin_uri, Some(&admin), Some(json!({ "description": "x" }))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["message"], "Cannot modify admin role");

    let (status, json) = send(&app, create_json_request("DELETE", &user_uri, Some(&admin), None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["message"], "Cannot delete default system roles");
}

#[tokio::test]
async fn test_role_lifecycle() {
    let app = create_router(test_state().await);
    let admin = admin_token(&app).await;

    let (status, role) = send(
        &app,
        create_json_request(
            "POST",
            "/api/roles",
            Some(&admin),
            Some(json!({ "name": "sales", "description": "Sales team", "permissions": ["crm:read"] })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let uri = format!("/api/roles/{}", role["id"].as_str().unwrap());

    let (status, json) = send(
        &app,
        create_json_request("PUT", &uri, Some(&admin), Some(json!({ "permissions": ["crm:read", "crm:update"] }))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["permissions"], json!(["crm:read", "crm:update"]));

    let (status, json) = send(
        &app,
        create_json_request("POST", "/api/roles", Some(&admin), Some(json!({ "name": "sales", "permissions": [] }))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["message"], "Role name already exists");

    let (status, json) = send(&app, create_json_request("DELETE", &uri, Some(&admin), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["message"], "Role deleted successfully");

    let (status, _) = send(&app, create_json_request("GET", &uri, Some(&admin), None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
