//! Integration tests for registration, login, refresh and logout.

mod common;

use account_service::{
    models::{MembershipStatus, User, ADMIN_ROLE},
    store::MemoryStore,
    utils::{CredentialHasher, Password},
};
use common::{TestApp, PASSWORD};
use service_core::axum::http::{Method, StatusCode};
use std::net::SocketAddr;

// ============================================================================
// Registration
// ============================================================================

#[tokio::test]
async fn register_creates_organization_admin_and_session() {
    let app = TestApp::spawn().await;

    let res = app
        .register("ADA@EXAMPLE.com ", "Analytical Engines")
        .await;

    assert_eq!(res.status, StatusCode::OK, "body: {}", res.body);
    assert_eq!(res.body["message"], "Registration successful");
    assert_eq!(res.body["email"], "ada@example.com");
    assert_eq!(res.body["organizationName"], "Analytical Engines");
    assert_eq!(res.body["slug"], "analytical-engines");
    assert!(res.body["refreshToken"].as_str().is_some_and(|t| !t.is_empty()));

    let tables = app.tables().await;
    assert_eq!(tables.organizations.len(), 1);
    assert_eq!(tables.users.len(), 1);
    assert_eq!(tables.users[0].email, "ada@example.com");
    assert_eq!(tables.sessions.len(), 1);
    assert_eq!(tables.memberships.len(), 1);
    assert_eq!(tables.memberships[0].status, MembershipStatus::Active.as_str());

    let admin = tables.roles.iter().find(|r| r.name == ADMIN_ROLE).unwrap();
    assert_eq!(tables.role_assignments.len(), 1);
    assert_eq!(tables.role_assignments[0].role_id, admin.id);
}

#[tokio::test]
async fn register_sets_scoped_cookies() {
    let app = TestApp::spawn().await;
    let res = app.register("ada@example.com", "Analytical Engines").await;
    assert_eq!(res.status, StatusCode::OK);

    let access = res.set_cookie("access_token").expect("access cookie");
    assert!(access.contains("Path=/"));
    assert!(access.contains("HttpOnly"));
    assert!(access.contains("SameSite=Lax"));
    // Development config: not marked Secure
    assert!(!access.contains("Secure"));

    let refresh = res.set_cookie("refresh_token").expect("refresh cookie");
    assert!(refresh.contains("Path=/auth/refresh"));
    assert!(refresh.contains("HttpOnly"));
    assert!(refresh.contains("SameSite=Lax"));
    assert!(refresh.contains("Max-Age="));

    // Cookies are signed, so the raw token never appears as the value.
    let raw = res.body["refreshToken"].as_str().unwrap();
    assert_ne!(
        res.cookie_pair("refresh_token").unwrap(),
        format!("refresh_token={}", raw)
    );
}

#[tokio::test]
async fn register_with_taken_slug_rolls_back() {
    let app = TestApp::spawn().await;
    app.register("ada@example.com", "Analytical Engines").await;
    let before = app.tables().await;

    let res = app
        .register("charles@example.com", "Analytical  Engines!")
        .await;

    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body["error"], "Organization slug already exists");

    let after = app.tables().await;
    assert_eq!(after.organizations.len(), before.organizations.len());
    assert_eq!(after.users.len(), before.users.len());
    assert_eq!(after.role_assignments.len(), before.role_assignments.len());
    assert_eq!(after.memberships.len(), before.memberships.len());
    assert_eq!(after.sessions.len(), before.sessions.len());
}

#[tokio::test]
async fn register_with_registered_email_is_rejected() {
    let app = TestApp::spawn().await;
    app.register("ada@example.com", "Analytical Engines").await;

    let res = app.register("ada@example.com", "Difference Engines").await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body["error"], "Email already registered");
    assert_eq!(app.tables().await.organizations.len(), 1);
}

#[tokio::test]
async fn register_validates_body() {
    let app = TestApp::spawn().await;

    let short_password = app
        .post(
            "/auth/register",
            serde_json::json!({
                "firstName": "Ada",
                "lastName": "Lovelace",
                "email": "ada@example.com",
                "password": "short",
                "organizationName": "Analytical Engines",
            }),
        )
        .await;
    assert_eq!(short_password.status, StatusCode::BAD_REQUEST);

    let bad_email = app
        .post(
            "/auth/register",
            serde_json::json!({
                "firstName": "Ada",
                "lastName": "Lovelace",
                "email": "not-an-email",
                "password": PASSWORD,
                "organizationName": "Analytical Engines",
            }),
        )
        .await;
    assert_eq!(bad_email.status, StatusCode::BAD_REQUEST);

    let unknown_field = app
        .post(
            "/auth/register",
            serde_json::json!({
                "firstName": "Ada",
                "lastName": "Lovelace",
                "email": "ada@example.com",
                "password": PASSWORD,
                "organizationName": "Analytical Engines",
                "role": "superuser",
            }),
        )
        .await;
    assert_eq!(unknown_field.status, StatusCode::BAD_REQUEST);

    assert!(app.tables().await.organizations.is_empty());
}

// ============================================================================
// Login
// ============================================================================

#[tokio::test]
async fn login_creates_session_and_returns_organization() {
    let app = TestApp::spawn().await;
    app.register("ada@example.com", "Analytical Engines").await;

    let res = app.login("Ada@Example.com", PASSWORD).await;

    assert_eq!(res.status, StatusCode::OK, "body: {}", res.body);
    assert_eq!(res.body["message"], "Login successful");
    assert_eq!(res.body["email"], "ada@example.com");
    assert_eq!(res.body["organization"]["slug"], "analytical-engines");
    assert_eq!(res.body["organization"]["name"], "Analytical Engines");
    assert!(res.body["refreshToken"].is_string());
    assert!(res.set_cookie("access_token").is_some());
    assert!(res.set_cookie("refresh_token").is_some());

    assert_eq!(app.tables().await.sessions.len(), 2);
}

#[tokio::test]
async fn login_failures_share_one_response() {
    let app = TestApp::spawn().await;
    app.register("ada@example.com", "Analytical Engines").await;

    let wrong_password = app.login("ada@example.com", "not-the-password").await;
    let unknown_email = app.login("nobody@example.com", PASSWORD).await;

    assert_eq!(wrong_password.status, StatusCode::BAD_REQUEST);
    assert_eq!(unknown_email.status, StatusCode::BAD_REQUEST);
    assert_eq!(wrong_password.body, unknown_email.body);
    assert_eq!(wrong_password.body["error"], "Invalid email or password");
    assert!(wrong_password.set_cookies().is_empty());

    assert_eq!(app.tables().await.sessions.len(), 1);
}

#[tokio::test]
async fn login_rate_limit_ignores_client_forwarded_for() {
    let mut vars = common::test_vars();
    vars.insert("RATE_LIMIT_LOGIN_ATTEMPTS", "2".to_string());
    let app = TestApp::spawn_with(MemoryStore::with_default_roles(), vars).await;
    app.register("ada@example.com", "Analytical Engines").await;

    let peer: SocketAddr = "198.51.100.20:51000".parse().unwrap();
    let mut statuses = Vec::new();
    for n in 1..=3 {
        let spoofed = format!("203.0.113.{n}");
        let res = app
            .login_from(peer, &spoofed, "ada@example.com", PASSWORD)
            .await;
        statuses.push(res.status);
    }

    assert_eq!(
        statuses,
        vec![StatusCode::OK, StatusCode::OK, StatusCode::TOO_MANY_REQUESTS]
    );
    let tables = app.tables().await;
    let login_ips: Vec<&str> = tables.sessions[1..].iter().map(|s| s.ip.as_str()).collect();
    assert_eq!(login_ips, vec!["198.51.100.20", "198.51.100.20"]);
}

#[tokio::test]
async fn trusted_proxy_forwards_client_address() {
    let mut vars = common::test_vars();
    vars.insert("TRUST_PROXY_HEADERS", "true".to_string());
    let app = TestApp::spawn_with(MemoryStore::with_default_roles(), vars).await;
    app.register("ada@example.com", "Analytical Engines").await;

    let proxy: SocketAddr = "10.0.0.5:443".parse().unwrap();
    let res = app
        .login_from(proxy, "203.0.113.44", "ada@example.com", PASSWORD)
        .await;

    assert_eq!(res.status, StatusCode::OK, "body: {}", res.body);
    let tables = app.tables().await;
    assert_eq!(tables.sessions.last().map(|s| s.ip.as_str()), Some("203.0.113.44"));
}

#[tokio::test]
async fn login_without_membership_returns_null_organization() {
    let store = MemoryStore::with_default_roles();
    let hash = CredentialHasher::with_cost(8, 1, 1)
        .unwrap()
        .hash(&Password::new(PASSWORD.to_string()))
        .await
        .unwrap();
    store
        .seed_user(User::active(
            "loner@example.com".to_string(),
            "Lone".to_string(),
            "User".to_string(),
            hash.into_string(),
        ))
        .await;
    let app = TestApp::spawn_with(store, common::test_vars()).await;

    let res = app.login("loner@example.com", PASSWORD).await;
    assert_eq!(res.status, StatusCode::OK, "body: {}", res.body);
    assert!(res.body["organization"].is_null());
    assert_eq!(app.tables().await.sessions.len(), 1);
}

#[tokio::test]
async fn invited_user_cannot_log_in() {
    let store = MemoryStore::with_default_roles();
    store
        .seed_user(User::invited(
            "grace@example.com".to_string(),
            "Grace".to_string(),
            "Hopper".to_string(),
        ))
        .await;
    let app = TestApp::spawn_with(store, common::test_vars()).await;

    let res = app.login("grace@example.com", PASSWORD).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body["error"], "Invalid email or password");
}

#[tokio::test]
async fn register_completes_invited_account() {
    let store = MemoryStore::with_default_roles();
    let invited = User::invited(
        "ada@example.com".to_string(),
        "Ada".to_string(),
        "Lovelace".to_string(),
    );
    store.seed_user(invited.clone()).await;
    let app = TestApp::spawn_with(store, common::test_vars()).await;

    let res = app.register("ada@example.com", "Analytical Engines").await;
    assert_eq!(res.status, StatusCode::OK, "body: {}", res.body);

    let tables = app.tables().await;
    assert_eq!(tables.users.len(), 1);
    assert_eq!(tables.users[0].id, invited.id);
    assert!(tables.users[0].is_active());

    let login = app.login("ada@example.com", PASSWORD).await;
    assert_eq!(login.status, StatusCode::OK);
}

// ============================================================================
// Refresh
// ============================================================================

#[tokio::test]
async fn refresh_rotates_cookies() {
    let app = TestApp::spawn().await;
    let registered = app.register("ada@example.com", "Analytical Engines").await;
    let refresh_cookie = registered.cookie_pair("refresh_token").unwrap();

    let res = app
        .request(Method::POST, "/auth/refresh", None, &[refresh_cookie.clone()])
        .await;

    assert_eq!(res.status, StatusCode::OK, "body: {}", res.body);
    assert_eq!(res.body["email"], "ada@example.com");
    assert_ne!(res.body["refreshToken"], registered.body["refreshToken"]);
    assert!(res.set_cookie("access_token").is_some());
    assert!(res
        .set_cookie("refresh_token")
        .is_some_and(|c| c.contains("Path=/auth/refresh")));

    let tables = app.tables().await;
    assert_eq!(tables.sessions.len(), 1);

    // The rotated-out token is dead.
    let replay = app
        .request(Method::POST, "/auth/refresh", None, &[refresh_cookie])
        .await;
    assert_eq!(replay.status, StatusCode::UNAUTHORIZED);

    let next = app
        .request(
            Method::POST,
            "/auth/refresh",
            None,
            &[res.cookie_pair("refresh_token").unwrap()],
        )
        .await;
    assert_eq!(next.status, StatusCode::OK);
}

#[tokio::test]
async fn refresh_requires_signed_refresh_cookie() {
    let app = TestApp::spawn().await;
    let registered = app.register("ada@example.com", "Analytical Engines").await;

    let missing = app.request(Method::POST, "/auth/refresh", None, &[]).await;
    assert_eq!(missing.status, StatusCode::UNAUTHORIZED);

    // Raw, unsigned token in the cookie is treated as absent.
    let raw = registered.body["refreshToken"].as_str().unwrap();
    let unsigned = app
        .request(
            Method::POST,
            "/auth/refresh",
            None,
            &[format!("refresh_token={}", raw)],
        )
        .await;
    assert_eq!(unsigned.status, StatusCode::UNAUTHORIZED);

    // An access token in the refresh slot fails the type check.
    let access_value = registered
        .cookie_pair("access_token")
        .unwrap()
        .replacen("access_token=", "refresh_token=", 1);
    let wrong_type = app
        .request(Method::POST, "/auth/refresh", None, &[access_value])
        .await;
    assert_eq!(wrong_type.status, StatusCode::UNAUTHORIZED);
}

// ============================================================================
// Logout
// ============================================================================

#[tokio::test]
async fn logout_removes_all_sessions_and_clears_cookies() {
    let app = TestApp::spawn().await;
    let registered = app.register("ada@example.com", "Analytical Engines").await;
    app.login("ada@example.com", PASSWORD).await;
    assert_eq!(app.tables().await.sessions.len(), 2);

    let access = registered.cookie_pair("access_token").unwrap();
    let res = app
        .request(Method::DELETE, "/auth/logout", None, &[access])
        .await;

    assert_eq!(res.status, StatusCode::OK, "body: {}", res.body);
    assert_eq!(res.body["message"], "Logged out successfully");
    assert!(app.tables().await.sessions.is_empty());

    let cleared_access = res.set_cookie("access_token").expect("access cleared");
    assert!(cleared_access.contains("Max-Age=0"));
    assert!(cleared_access.contains("Path=/"));
    let cleared_refresh = res.set_cookie("refresh_token").expect("refresh cleared");
    assert!(cleared_refresh.contains("Max-Age=0"));
    assert!(cleared_refresh.contains("Path=/auth/refresh"));

    // Old refresh token cannot resurrect the session.
    let refresh = app
        .request(
            Method::POST,
            "/auth/refresh",
            None,
            &[registered.cookie_pair("refresh_token").unwrap()],
        )
        .await;
    assert_eq!(refresh.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn logout_without_cookie_is_unauthorized() {
    let app = TestApp::spawn().await;

    let res = app.request(Method::DELETE, "/auth/logout", None, &[]).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.body["error"], "No access token provided");

    let forged = app
        .request(
            Method::DELETE,
            "/auth/logout",
            None,
            &["access_token=forged.value".to_string()],
        )
        .await;
    assert_eq!(forged.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn health_reports_service_identity() {
    let app = TestApp::spawn().await;
    let res = app.get("/health").await;

    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["status"], "healthy");
    assert_eq!(res.body["service"], "account-service-test");
    assert!(res.headers.contains_key("x-request-id"));
    assert_eq!(res.headers["x-frame-options"], "DENY");
}
