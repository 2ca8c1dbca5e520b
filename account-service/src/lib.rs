pub mod config;
pub mod db;
pub mod dtos;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod store;
pub mod utils;

use axum_extra::extract::cookie::Key;
use service_core::axum::{
    extract::{FromRef, State},
    http::{header, HeaderValue, Method, Request},
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Json, Router,
};
use service_core::middleware::{
    rate_limit::{
        create_ip_rate_limiter, ip_rate_limit_middleware, IpRateLimit, IpRateLimiter, ProxyTrust,
    },
    security_headers::security_headers_middleware,
    tracing::{request_id_middleware, REQUEST_ID_HEADER},
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::{
    openapi::security::{ApiKey, ApiKeyValue, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::config::AccountConfig;
use crate::services::{
    AccountService, MembershipService, SessionIssuer, ACCESS_COOKIE, REFRESH_COOKIE,
};
use crate::store::Store;
use crate::utils::{CredentialHasher, TokenHasher};
use service_core::error::AppError;

#[derive(OpenApi)]
#[openapi(
    paths(
        health_check,
        handlers::auth::registration::register,
        handlers::auth::session::login,
        handlers::auth::session::logout,
        handlers::auth::session::refresh,
        handlers::org::check_slug,
        handlers::members::add_member,
        handlers::members::list_members,
    ),
    components(
        schemas(
            dtos::ErrorResponse,
            dtos::MessageResponse,
            dtos::auth::RegisterRequest,
            dtos::auth::RegisterResponse,
            dtos::auth::LoginRequest,
            dtos::auth::LoginResponse,
            dtos::auth::RefreshResponse,
            dtos::org::SlugCheckRequest,
            dtos::org::SlugCheckResponse,
            dtos::members::AddMemberRequest,
            dtos::members::AddMemberResponse,
            dtos::members::MemberResponse,
            dtos::members::MembersResponse,
            models::Organization,
            models::UserResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Authentication", description = "Registration, login and cookie sessions"),
        (name = "Organizations", description = "Slug availability and membership"),
        (name = "Observability", description = "Service health"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "access_token_cookie",
                SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::new(ACCESS_COOKIE))),
            );
            components.add_security_scheme(
                "refresh_token_cookie",
                SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::new(REFRESH_COOKIE))),
            );
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: AccountConfig,
    pub store: Arc<dyn Store>,
    pub sessions: SessionIssuer,
    pub cookie_key: Key,
    pub account_service: AccountService,
    pub membership_service: MembershipService,
    pub login_rate_limiter: IpRateLimiter,
    pub register_rate_limiter: IpRateLimiter,
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}

impl FromRef<AppState> for ProxyTrust {
    fn from_ref(state: &AppState) -> Self {
        ProxyTrust(state.config.security.trust_proxy_headers)
    }
}

impl AppState {
    /// Wire every service over `store` with production Argon2 cost.
    pub fn new(config: AccountConfig, store: Arc<dyn Store>) -> Result<Self, AppError> {
        Self::with_hasher(config, store, CredentialHasher::new()?)
    }

    /// Same as [`AppState::new`] with an explicit password hasher.
    pub fn with_hasher(
        config: AccountConfig,
        store: Arc<dyn Store>,
        hasher: CredentialHasher,
    ) -> Result<Self, AppError> {
        config.validate()?;

        let token_hasher = TokenHasher::new(&config.secrets.token_hash_secret)
            .map_err(AppError::ConfigError)?;
        let sessions = SessionIssuer::new(
            &config.secrets,
            &config.session,
            token_hasher,
            config.is_production(),
        );
        let cookie_key = Key::derive_from(config.secrets.cookie_secret.as_bytes());

        let account_service = AccountService::new(
            store.clone(),
            hasher,
            sessions.clone(),
            config.platform_superuser_email.clone(),
        );
        let membership_service = MembershipService::new(store.clone());

        let login_rate_limiter = create_ip_rate_limiter(
            config.rate_limit.login_attempts,
            config.rate_limit.login_window_seconds,
        );
        let register_rate_limiter = create_ip_rate_limiter(
            config.rate_limit.register_attempts,
            config.rate_limit.register_window_seconds,
        );

        Ok(Self {
            config,
            store,
            sessions,
            cookie_key,
            account_service,
            membership_service,
            login_rate_limiter,
            register_rate_limiter,
        })
    }
}

pub fn build_router(state: AppState) -> Router {
    let trust = ProxyTrust::from_ref(&state);

    let login_route = Router::new()
        .route("/auth/login", post(handlers::auth::login))
        .layer(from_fn_with_state(
            IpRateLimit::new(state.login_rate_limiter.clone(), trust),
            ip_rate_limit_middleware,
        ));

    let register_route = Router::new()
        .route("/auth/register", post(handlers::auth::register))
        .layer(from_fn_with_state(
            IpRateLimit::new(state.register_rate_limiter.clone(), trust),
            ip_rate_limit_middleware,
        ));

    let mut app = Router::new().route("/health", get(health_check));

    if state.config.swagger_enabled {
        app =
            app.merge(SwaggerUi::new("/docs").url("/.well-known/openapi.json", ApiDoc::openapi()));
    } else {
        // Keep the document reachable for tooling
        app = app.route(
            "/.well-known/openapi.json",
            get(|| async { Json(ApiDoc::openapi()) }),
        );
    }

    app.merge(login_route)
        .merge(register_route)
        .route("/auth/refresh", post(handlers::auth::refresh))
        .route(
            "/auth/logout",
            service_core::axum::routing::delete(handlers::auth::logout),
        )
        .route("/org-slug/check", post(handlers::org::check_slug))
        .route(
            "/organizations/:slug/members",
            get(handlers::members::list_members).post(handlers::members::add_member),
        )
        .with_state(state.clone())
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<_>| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            }),
        )
        .layer(from_fn(request_id_middleware))
        .layer(from_fn(security_headers_middleware))
        .layer(cors_layer(&state.config.security.allowed_origins))
}

/// Credentialed CORS for the configured origins. Unparseable origins are
/// skipped, never widened.
fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(origin = %origin, error = %e, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::HeaderName::from_static(REQUEST_ID_HEADER),
        ])
}

/// Service health check
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy"),
        (status = 503, description = "Store is unreachable", body = dtos::ErrorResponse)
    ),
    tag = "Observability"
)]
pub async fn health_check(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    state.store.health_check().await.map_err(|e| {
        tracing::error!(error = %e, "Store health check failed");
        AppError::ServiceUnavailable
    })?;

    Ok(Json(serde_json::json!({
        "status": "healthy",
        "service": state.config.service_name,
        "version": state.config.service_version,
    })))
}
