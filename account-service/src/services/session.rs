//! Signed access/refresh tokens and their cookie transport.

use axum_extra::extract::cookie::{Cookie, SameSite, SignedCookieJar};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::{SecretsConfig, SessionConfig};
use crate::models::Session;
use crate::services::ServiceError;
use crate::utils::TokenHasher;

pub const ACCESS_COOKIE: &str = "access_token";
pub const REFRESH_COOKIE: &str = "refresh_token";
pub const ACCESS_COOKIE_PATH: &str = "/";
/// The refresh cookie is only ever sent to the refresh endpoint.
pub const REFRESH_COOKIE_PATH: &str = "/auth/refresh";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

/// Claims for access tokens (short-lived)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    /// Subject (user ID)
    pub sub: String,
    pub email: String,
    #[serde(rename = "type")]
    pub token_type: TokenType,
    pub exp: i64,
    pub iat: i64,
    pub jti: String,
}

impl AccessTokenClaims {
    pub fn user_id(&self) -> Result<Uuid, ServiceError> {
        Uuid::parse_str(&self.sub).map_err(|_| ServiceError::Unauthenticated)
    }
}

/// Claims for refresh tokens (long-lived). Bound to a session, not a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshTokenClaims {
    /// Session ID (matches the sessions row)
    pub sid: String,
    #[serde(rename = "type")]
    pub token_type: TokenType,
    pub exp: i64,
    pub iat: i64,
    pub jti: String,
}

impl RefreshTokenClaims {
    pub fn session_id(&self) -> Result<Uuid, ServiceError> {
        Uuid::parse_str(&self.sid).map_err(|_| ServiceError::Unauthenticated)
    }
}

/// Fresh session material. Minted before the transaction that persists it.
pub struct IssuedSession {
    pub session_id: Uuid,
    pub refresh_token: String,
    pub refresh_token_hash: String,
    pub expires_at: DateTime<Utc>,
}

impl IssuedSession {
    /// The row to persist for this session.
    pub fn record(&self, user_id: Uuid, client: &ClientInfo) -> Session {
        Session {
            id: self.session_id,
            user_id,
            refresh_token_hash: self.refresh_token_hash.clone(),
            expires_at: self.expires_at,
            user_agent: client.user_agent.clone(),
            ip: client.ip.clone(),
            created_at: Utc::now(),
        }
    }
}

/// Device metadata stored with a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientInfo {
    pub user_agent: Option<String>,
    pub ip: String,
}

impl ClientInfo {
    pub const UNKNOWN_IP: &'static str = "unknown";
}

pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Mints and verifies access/refresh tokens and decides cookie attributes.
#[derive(Clone)]
pub struct SessionIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    token_hasher: TokenHasher,
    access_token_ttl_minutes: i64,
    refresh_token_ttl_days: i64,
    secure_cookies: bool,
}

impl SessionIssuer {
    pub fn new(
        secrets: &SecretsConfig,
        session: &SessionConfig,
        token_hasher: TokenHasher,
        secure_cookies: bool,
    ) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secrets.jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secrets.jwt_secret.as_bytes()),
            token_hasher,
            access_token_ttl_minutes: session.access_token_ttl_minutes,
            refresh_token_ttl_days: session.refresh_token_ttl_days,
            secure_cookies,
        }
    }

    /// New session id plus a refresh token bound to it and its digest.
    pub fn issue_session(&self) -> Result<IssuedSession, ServiceError> {
        self.reissue_session(Uuid::new_v4())
    }

    /// Refresh material for an existing session id (rotation).
    pub fn reissue_session(&self, session_id: Uuid) -> Result<IssuedSession, ServiceError> {
        let now = Utc::now();
        let expires_at = expiry(now, Duration::try_days(self.refresh_token_ttl_days), "refresh")?;

        let claims = RefreshTokenClaims {
            sid: session_id.to_string(),
            token_type: TokenType::Refresh,
            exp: expires_at.timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        let refresh_token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| anyhow::anyhow!("Failed to encode refresh token: {}", e))?;
        let refresh_token_hash = self.token_hasher.hash_token(&refresh_token);

        Ok(IssuedSession {
            session_id,
            refresh_token,
            refresh_token_hash,
            expires_at,
        })
    }

    pub fn issue_access_token(&self, user_id: Uuid, email: &str) -> Result<String, ServiceError> {
        let now = Utc::now();
        let exp = expiry(now, Duration::try_minutes(self.access_token_ttl_minutes), "access")?;

        let claims = AccessTokenClaims {
            sub: user_id.to_string(),
            email: email.to_string(),
            token_type: TokenType::Access,
            exp: exp.timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| anyhow::anyhow!("Failed to encode access token: {}", e))?;

        Ok(token)
    }

    /// Fails closed on bad signature, expiry or a refresh token presented as
    /// an access token.
    pub fn verify_access_token(&self, token: &str) -> Result<AccessTokenClaims, ServiceError> {
        let claims = decode::<AccessTokenClaims>(token, &self.decoding_key, &validation())
            .map_err(|_| ServiceError::Unauthenticated)?
            .claims;

        if claims.token_type != TokenType::Access {
            return Err(ServiceError::Unauthenticated);
        }
        Ok(claims)
    }

    pub fn verify_refresh_token(&self, token: &str) -> Result<RefreshTokenClaims, ServiceError> {
        let claims = decode::<RefreshTokenClaims>(token, &self.decoding_key, &validation())
            .map_err(|_| ServiceError::Unauthenticated)?
            .claims;

        if claims.token_type != TokenType::Refresh {
            return Err(ServiceError::Unauthenticated);
        }
        Ok(claims)
    }

    pub fn token_hasher(&self) -> &TokenHasher {
        &self.token_hasher
    }

    /// Set both auth cookies: access on `/`, refresh on `/auth/refresh` with
    /// the refresh lifetime.
    pub fn attach_cookies(&self, jar: SignedCookieJar, tokens: &TokenPair) -> SignedCookieJar {
        let access = Cookie::build((ACCESS_COOKIE, tokens.access_token.clone()))
            .path(ACCESS_COOKIE_PATH)
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.secure_cookies);

        let mut refresh = Cookie::build((REFRESH_COOKIE, tokens.refresh_token.clone()))
            .path(REFRESH_COOKIE_PATH)
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.secure_cookies);
        if let Some(ttl) = Duration::try_days(self.refresh_token_ttl_days) {
            refresh = refresh.max_age(time::Duration::seconds(ttl.num_seconds()));
        }

        jar.add(access).add(refresh)
    }

    /// Expire both auth cookies on their own paths. Always emitted, since
    /// the refresh cookie never reaches the caller's path.
    pub fn clear_cookies(&self, jar: SignedCookieJar) -> SignedCookieJar {
        jar.add(removal_cookie(ACCESS_COOKIE, ACCESS_COOKIE_PATH, self.secure_cookies))
            .add(removal_cookie(REFRESH_COOKIE, REFRESH_COOKIE_PATH, self.secure_cookies))
    }
}

fn removal_cookie(name: &'static str, path: &'static str, secure: bool) -> Cookie<'static> {
    let mut cookie = Cookie::build((name, ""))
        .path(path)
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .build();
    cookie.make_removal();
    cookie
}

fn expiry(
    now: DateTime<Utc>,
    ttl: Option<Duration>,
    kind: &str,
) -> Result<DateTime<Utc>, ServiceError> {
    ttl.and_then(|ttl| now.checked_add_signed(ttl)).ok_or_else(|| {
        ServiceError::Internal(anyhow::anyhow!("{} token lifetime out of range", kind))
    })
}

fn validation() -> Validation {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    validation.leeway = 0;
    validation
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum_extra::extract::cookie::Key;
    use service_core::axum::response::IntoResponse;

    fn issuer() -> SessionIssuer {
        let secrets = SecretsConfig {
            jwt_secret: "test-jwt-secret".to_string(),
            cookie_secret: "c".repeat(64),
            token_hash_secret: "test-token-hash-secret".to_string(),
        };
        let session = SessionConfig {
            access_token_ttl_minutes: 10,
            refresh_token_ttl_days: 30,
        };
        let hasher = TokenHasher::new(&secrets.token_hash_secret).unwrap();
        SessionIssuer::new(&secrets, &session, hasher, true)
    }

    #[test]
    fn issued_session_stores_digest_not_token() {
        let issuer = issuer();
        let issued = issuer.issue_session().unwrap();

        assert_ne!(issued.refresh_token, issued.refresh_token_hash);
        assert!(issuer
            .token_hasher()
            .verify_token_hash(&issued.refresh_token_hash, &issued.refresh_token));

        let days = (issued.expires_at - Utc::now()).num_days();
        assert!((29..=30).contains(&days));

        let claims = issuer.verify_refresh_token(&issued.refresh_token).unwrap();
        assert_eq!(claims.session_id().unwrap(), issued.session_id);
    }

    #[test]
    fn out_of_range_lifetimes_fail_instead_of_panicking() {
        let secrets = SecretsConfig {
            jwt_secret: "test-jwt-secret".to_string(),
            cookie_secret: "c".repeat(64),
            token_hash_secret: "test-token-hash-secret".to_string(),
        };
        let session = SessionConfig {
            access_token_ttl_minutes: i64::MAX,
            refresh_token_ttl_days: 100_000_000,
        };
        let hasher = TokenHasher::new(&secrets.token_hash_secret).unwrap();
        let issuer = SessionIssuer::new(&secrets, &session, hasher, true);

        assert!(matches!(issuer.issue_session(), Err(ServiceError::Internal(_))));
        assert!(matches!(
            issuer.issue_access_token(Uuid::new_v4(), "ada@example.com"),
            Err(ServiceError::Internal(_))
        ));
    }

    #[test]
    fn reissue_keeps_session_id_and_changes_token() {
        let issuer = issuer();
        let first = issuer.issue_session().unwrap();
        let second = issuer.reissue_session(first.session_id).unwrap();
        assert_eq!(first.session_id, second.session_id);
        assert_ne!(first.refresh_token, second.refresh_token);
        assert_ne!(first.refresh_token_hash, second.refresh_token_hash);
    }

    #[test]
    fn access_token_round_trip() {
        let issuer = issuer();
        let user_id = Uuid::new_v4();
        let token = issuer.issue_access_token(user_id, "ada@example.com").unwrap();
        let claims = issuer.verify_access_token(&token).unwrap();
        assert_eq!(claims.user_id().unwrap(), user_id);
        assert_eq!(claims.email, "ada@example.com");
        assert_eq!(claims.token_type, TokenType::Access);
    }

    #[test]
    fn token_types_are_not_interchangeable() {
        let issuer = issuer();
        let issued = issuer.issue_session().unwrap();
        let access = issuer.issue_access_token(Uuid::new_v4(), "a@b.co").unwrap();

        assert!(issuer.verify_access_token(&issued.refresh_token).is_err());
        assert!(issuer.verify_refresh_token(&access).is_err());
    }

    #[test]
    fn expired_and_forged_tokens_are_rejected() {
        let issuer = issuer();
        let past = Utc::now() - Duration::hours(1);
        let claims = AccessTokenClaims {
            sub: Uuid::new_v4().to_string(),
            email: "a@b.co".to_string(),
            token_type: TokenType::Access,
            exp: past.timestamp(),
            iat: (past - Duration::minutes(10)).timestamp(),
            jti: Uuid::new_v4().to_string(),
        };
        let expired = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"test-jwt-secret"),
        )
        .unwrap();
        assert!(matches!(
            issuer.verify_access_token(&expired),
            Err(ServiceError::Unauthenticated)
        ));

        let forged = encode(
            &Header::new(Algorithm::HS256),
            &AccessTokenClaims {
                exp: (Utc::now() + Duration::minutes(5)).timestamp(),
                ..claims
            },
            &EncodingKey::from_secret(b"some-other-secret"),
        )
        .unwrap();
        assert!(issuer.verify_access_token(&forged).is_err());
        assert!(issuer.verify_access_token("not-a-jwt").is_err());
    }

    fn set_cookies(jar: SignedCookieJar) -> Vec<String> {
        let response = (jar, "ok").into_response();
        response
            .headers()
            .get_all(service_core::axum::http::header::SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect()
    }

    #[test]
    fn cookies_are_scoped_and_flagged() {
        let issuer = issuer();
        let jar = SignedCookieJar::new(Key::generate());
        let tokens = TokenPair {
            access_token: "access".to_string(),
            refresh_token: "refresh".to_string(),
        };
        let headers = set_cookies(issuer.attach_cookies(jar, &tokens));

        let access = headers
            .iter()
            .find(|h| h.starts_with("access_token="))
            .unwrap();
        assert!(access.contains("Path=/"));
        assert!(access.contains("HttpOnly"));
        assert!(access.contains("SameSite=Lax"));
        assert!(access.contains("Secure"));

        let refresh = headers
            .iter()
            .find(|h| h.starts_with("refresh_token="))
            .unwrap();
        assert!(refresh.contains("Path=/auth/refresh"));
        assert!(refresh.contains("HttpOnly"));
        assert!(refresh.contains("Max-Age=2592000"));
    }

    #[test]
    fn clearing_expires_both_cookies_on_their_paths() {
        let issuer = issuer();
        let jar = SignedCookieJar::new(Key::generate());
        let headers = set_cookies(issuer.clear_cookies(jar));

        assert_eq!(headers.len(), 2);
        assert!(headers
            .iter()
            .any(|h| h.starts_with("access_token=") && h.contains("Path=/") && h.contains("Max-Age=0")));
        assert!(headers.iter().any(|h| h.starts_with("refresh_token=")
            && h.contains("Path=/auth/refresh")
            && h.contains("Max-Age=0")));
    }
}
