use service_core::config as core_config;
use service_core::error::AppError;
use std::env;
use std::fmt;

/// Minimum key material accepted for signed cookies.
pub const MIN_COOKIE_SECRET_LEN: usize = 32;

/// Upper bounds keep every expiry computation inside chrono's range.
pub const MAX_ACCESS_TOKEN_TTL_MINUTES: i64 = 24 * 60;
pub const MAX_REFRESH_TOKEN_TTL_DAYS: i64 = 365;

#[derive(Debug, Clone)]
pub struct AccountConfig {
    pub common: core_config::Config,
    pub environment: Environment,
    pub service_name: String,
    pub service_version: String,
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
    pub database: DatabaseConfig,
    pub secrets: SecretsConfig,
    pub session: SessionConfig,
    pub platform_superuser_email: Option<String>,
    pub security: SecurityConfig,
    pub swagger_enabled: bool,
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Environment {
    Dev,
    Prod,
}

#[derive(Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("url", &"<redacted>")
            .field("max_connections", &self.max_connections)
            .field("min_connections", &self.min_connections)
            .finish()
    }
}

/// Process-wide secrets. Loaded once and never logged.
#[derive(Clone)]
pub struct SecretsConfig {
    pub jwt_secret: String,
    pub cookie_secret: String,
    pub token_hash_secret: String,
}

impl fmt::Debug for SecretsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretsConfig")
            .field("jwt_secret", &"<redacted>")
            .field("cookie_secret", &"<redacted>")
            .field("token_hash_secret", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub access_token_ttl_minutes: i64,
    pub refresh_token_ttl_days: i64,
}

#[derive(Debug, Clone)]
pub struct SecurityConfig {
    pub allowed_origins: Vec<String>,
    /// Take client addresses from `x-forwarded-for`/`x-real-ip`. Only set
    /// behind a proxy that overwrites them.
    pub trust_proxy_headers: bool,
}

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub login_attempts: u32,
    pub login_window_seconds: u64,
    pub register_attempts: u32,
    pub register_window_seconds: u64,
}

impl AccountConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let common_config = core_config::Config::load()?;
        Self::from_lookup(common_config, |key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup. `from_env` is
    /// this over the process environment.
    pub fn from_lookup<F>(common: core_config::Config, lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env_str = lookup("ENVIRONMENT").unwrap_or_else(|| "dev".to_string());
        let environment: Environment = env_str
            .parse()
            .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?;

        let is_prod = environment == Environment::Prod;
        let get = |key: &str, default: Option<&str>| get_env(&lookup, key, default, is_prod);

        let config = AccountConfig {
            common,
            environment: environment.clone(),
            service_name: get("SERVICE_NAME", Some("account-service"))?,
            service_version: get("SERVICE_VERSION", Some(env!("CARGO_PKG_VERSION")))?,
            log_level: get("LOG_LEVEL", Some("info"))?,
            otlp_endpoint: get_optional(&lookup, "OTLP_ENDPOINT"),
            database: DatabaseConfig {
                url: get("DATABASE_URL", None)?,
                max_connections: parse_num(
                    "DATABASE_MAX_CONNECTIONS",
                    &get("DATABASE_MAX_CONNECTIONS", Some("10"))?,
                )?,
                min_connections: parse_num(
                    "DATABASE_MIN_CONNECTIONS",
                    &get("DATABASE_MIN_CONNECTIONS", Some("1"))?,
                )?,
            },
            secrets: SecretsConfig {
                jwt_secret: get("JWT_SECRET", None)?,
                cookie_secret: get("COOKIE_SECRET", None)?,
                token_hash_secret: get("TOKEN_HASH_SECRET", None)?,
            },
            session: SessionConfig {
                access_token_ttl_minutes: parse_num(
                    "ACCESS_TOKEN_TTL_MINUTES",
                    &get("ACCESS_TOKEN_TTL_MINUTES", Some("10"))?,
                )?,
                refresh_token_ttl_days: parse_num(
                    "REFRESH_TOKEN_TTL_DAYS",
                    &get("REFRESH_TOKEN_TTL_DAYS", Some("30"))?,
                )?,
            },
            platform_superuser_email: get_optional(&lookup, "PLATFORM_SUPERUSER_EMAIL"),
            security: SecurityConfig {
                allowed_origins: get("ALLOWED_ORIGINS", Some("http://localhost:3000"))?
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
                trust_proxy_headers: match get_optional(&lookup, "TRUST_PROXY_HEADERS") {
                    Some(value) => parse_bool("TRUST_PROXY_HEADERS", &value)?,
                    None => false,
                },
            },
            swagger_enabled: match get_optional(&lookup, "ENABLE_SWAGGER") {
                Some(value) => parse_bool("ENABLE_SWAGGER", &value)?,
                None => !is_prod,
            },
            rate_limit: RateLimitConfig {
                login_attempts: parse_num(
                    "RATE_LIMIT_LOGIN_ATTEMPTS",
                    &get("RATE_LIMIT_LOGIN_ATTEMPTS", Some("5"))?,
                )?,
                login_window_seconds: parse_num(
                    "RATE_LIMIT_LOGIN_WINDOW_SECONDS",
                    &get("RATE_LIMIT_LOGIN_WINDOW_SECONDS", Some("900"))?,
                )?,
                register_attempts: parse_num(
                    "RATE_LIMIT_REGISTER_ATTEMPTS",
                    &get("RATE_LIMIT_REGISTER_ATTEMPTS", Some("3"))?,
                )?,
                register_window_seconds: parse_num(
                    "RATE_LIMIT_REGISTER_WINDOW_SECONDS",
                    &get("RATE_LIMIT_REGISTER_WINDOW_SECONDS", Some("3600"))?,
                )?,
            },
        };

        config.validate()?;
        Ok(config)
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Prod
    }

    /// Reject unusable secrets, TTLs and pool sizes. `from_lookup` already runs this.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.common.port == 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "PORT must be greater than 0"
            )));
        }

        for (key, value) in [
            ("JWT_SECRET", &self.secrets.jwt_secret),
            ("COOKIE_SECRET", &self.secrets.cookie_secret),
            ("TOKEN_HASH_SECRET", &self.secrets.token_hash_secret),
        ] {
            if value.trim().is_empty() {
                return Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} must not be empty",
                    key
                )));
            }
        }

        if self.secrets.cookie_secret.len() < MIN_COOKIE_SECRET_LEN {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "COOKIE_SECRET must be at least {} bytes",
                MIN_COOKIE_SECRET_LEN
            )));
        }

        if !(1..=MAX_ACCESS_TOKEN_TTL_MINUTES).contains(&self.session.access_token_ttl_minutes) {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "ACCESS_TOKEN_TTL_MINUTES must be between 1 and {}",
                MAX_ACCESS_TOKEN_TTL_MINUTES
            )));
        }

        if !(1..=MAX_REFRESH_TOKEN_TTL_DAYS).contains(&self.session.refresh_token_ttl_days) {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "REFRESH_TOKEN_TTL_DAYS must be between 1 and {}",
                MAX_REFRESH_TOKEN_TTL_DAYS
            )));
        }

        if self.database.min_connections > self.database.max_connections {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "DATABASE_MIN_CONNECTIONS exceeds DATABASE_MAX_CONNECTIONS"
            )));
        }

        if self.environment == Environment::Prod {
            if self.security.allowed_origins.iter().any(|o| o == "*") {
                return Err(AppError::ConfigError(anyhow::anyhow!(
                    "Wildcard CORS origin not allowed in production"
                )));
            }

            if self.swagger_enabled {
                tracing::warn!("Swagger UI is enabled in production");
            }
        }

        Ok(())
    }
}

fn get_env<F>(
    lookup: &F,
    key: &str,
    default: Option<&str>,
    is_prod: bool,
) -> Result<String, AppError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(val) => Ok(val),
        None => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required in production but not set",
                    key
                )))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required but not set",
                    key
                )))
            }
        }
    }
}

fn get_optional<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_num<T>(key: &str, value: &str) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| AppError::ConfigError(anyhow::anyhow!("{}: {}", key, e)))
}

fn parse_bool(key: &str, value: &str) -> Result<bool, AppError> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        other => Err(AppError::ConfigError(anyhow::anyhow!(
            "{}: invalid boolean '{}'",
            key,
            other
        ))),
    }
}

impl std::str::FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dev" => Ok(Environment::Dev),
            "prod" => Ok(Environment::Prod),
            _ => Err(format!("Invalid environment: {}", s)),
        }
    }
}
