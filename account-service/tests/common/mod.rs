//! Test helpers for account-service HTTP tests.
//!
//! Drives the real router over an in-memory store; no database or network
//! is needed.

#![allow(dead_code)]

use account_service::{
    build_router,
    config::AccountConfig,
    models::User,
    store::{MemoryStore, Tables},
    utils::CredentialHasher,
    AppState,
};
use service_core::axum::{
    body::{to_bytes, Body},
    extract::ConnectInfo,
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use service_core::config::Config;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceExt;

pub const PASSWORD: &str = "longenough1";

/// Router plus the store behind it.
pub struct TestApp {
    pub router: Router,
    pub store: MemoryStore,
    pub state: AppState,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: serde_json::Value,
}

impl TestResponse {
    pub fn set_cookies(&self) -> Vec<String> {
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .map(str::to_string)
            .collect()
    }

    /// The raw `Set-Cookie` line for `name`.
    pub fn set_cookie(&self, name: &str) -> Option<String> {
        let prefix = format!("{}=", name);
        self.set_cookies()
            .into_iter()
            .find(|c| c.starts_with(&prefix))
    }

    /// `name=value` of a set cookie, ready to send back in a `Cookie` header.
    pub fn cookie_pair(&self, name: &str) -> Option<String> {
        self.set_cookie(name)
            .and_then(|c| c.split(';').next().map(str::to_string))
    }
}

pub fn test_vars() -> HashMap<&'static str, String> {
    HashMap::from([
        ("ENVIRONMENT", "dev".to_string()),
        ("SERVICE_NAME", "account-service-test".to_string()),
        ("DATABASE_URL", "postgres://unused/accounts".to_string()),
        ("JWT_SECRET", "integration-jwt-secret".to_string()),
        ("COOKIE_SECRET", "integration-cookie-secret-".repeat(4)),
        ("TOKEN_HASH_SECRET", "integration-token-hash-secret".to_string()),
        ("ENABLE_SWAGGER", "false".to_string()),
        ("RATE_LIMIT_LOGIN_ATTEMPTS", "100".to_string()),
        ("RATE_LIMIT_REGISTER_ATTEMPTS", "100".to_string()),
    ])
}

pub fn test_config(vars: HashMap<&'static str, String>) -> AccountConfig {
    let common = Config {
        port: 8080,
        host: "127.0.0.1".to_string(),
    };
    AccountConfig::from_lookup(common, |key| vars.get(key).cloned())
        .expect("Failed to build test config")
}

impl TestApp {
    /// Spawn with the seeded role catalogue and default test config.
    pub async fn spawn() -> Self {
        Self::spawn_with(MemoryStore::with_default_roles(), test_vars()).await
    }

    pub async fn spawn_with(store: MemoryStore, vars: HashMap<&'static str, String>) -> Self {
        let config = test_config(vars);
        let hasher = CredentialHasher::with_cost(8, 1, 1).expect("Failed to create hasher");
        let state = AppState::with_hasher(config, Arc::new(store.clone()), hasher)
            .expect("Failed to build app state");
        let router = build_router(state.clone());

        Self {
            router,
            store,
            state,
        }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<serde_json::Value>,
        cookies: &[String],
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if !cookies.is_empty() {
            builder = builder.header(header::COOKIE, cookies.join("; "));
        }

        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("Failed to build request");

        self.send(request).await
    }

    /// Log in over a connection from `peer`, with a client-supplied
    /// `x-forwarded-for` header.
    pub async fn login_from(
        &self,
        peer: SocketAddr,
        forwarded_for: &str,
        email: &str,
        password: &str,
    ) -> TestResponse {
        let mut request = Request::builder()
            .method(Method::POST)
            .uri("/auth/login")
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-forwarded-for", forwarded_for)
            .body(Body::from(
                serde_json::json!({ "email": email, "password": password }).to_string(),
            ))
            .expect("Failed to build request");
        request.extensions_mut().insert(ConnectInfo(peer));

        self.send(request).await
    }

    async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to execute request");

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read body");
        let body = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
        };

        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn post(&self, uri: &str, body: serde_json::Value) -> TestResponse {
        self.request(Method::POST, uri, Some(body), &[]).await
    }

    pub async fn get(&self, uri: &str) -> TestResponse {
        self.request(Method::GET, uri, None, &[]).await
    }

    /// Register `email` as admin of `organization_name` with [`PASSWORD`].
    pub async fn register(&self, email: &str, organization_name: &str) -> TestResponse {
        self.post(
            "/auth/register",
            serde_json::json!({
                "firstName": "Ada",
                "lastName": "Lovelace",
                "email": email,
                "password": PASSWORD,
                "organizationName": organization_name,
            }),
        )
        .await
    }

    pub async fn login(&self, email: &str, password: &str) -> TestResponse {
        self.post(
            "/auth/login",
            serde_json::json!({ "email": email, "password": password }),
        )
        .await
    }

    /// Put a user directly into the store, bypassing registration.
    pub async fn seed_user(&self, email: &str) -> User {
        let user = User::active(
            email.to_string(),
            "Seeded".to_string(),
            "User".to_string(),
            "$argon2id$unused".to_string(),
        );
        self.store.seed_user(user.clone()).await;
        user
    }

    pub async fn tables(&self) -> Tables {
        self.store.snapshot().await
    }
}
