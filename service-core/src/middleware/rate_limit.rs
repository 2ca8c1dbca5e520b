use crate::error::AppError;
use axum::{
    extract::{ConnectInfo, Request, State},
    http::{Extensions, HeaderMap},
    middleware::Next,
    response::Response,
};
use governor::{
    Quota, RateLimiter,
    clock::{Clock, DefaultClock},
    state::keyed::DashMapStateStore,
};
use std::{
    net::{IpAddr, SocketAddr},
    num::NonZeroU32,
    sync::Arc,
    time::Duration,
};

/// Rate limiter keyed by client IP address
pub type IpRateLimiter = Arc<RateLimiter<IpAddr, DashMapStateStore<IpAddr>, DefaultClock>>;

/// Allows `attempts` requests per IP over `window_seconds`, replenishing evenly.
pub fn create_ip_rate_limiter(attempts: u32, window_seconds: u64) -> IpRateLimiter {
    let burst = NonZeroU32::new(attempts).unwrap_or(NonZeroU32::MIN);
    let period_ms = (window_seconds.max(1) * 1000) / u64::from(burst.get());
    let period = Duration::from_millis(period_ms.max(1));
    let quota = Quota::with_period(period)
        .unwrap_or_else(|| Quota::per_second(burst))
        .allow_burst(burst);

    Arc::new(RateLimiter::dashmap(quota))
}

/// Whether proxy headers are set by infrastructure we run. Off by default:
/// without a proxy in front, `x-forwarded-for` is whatever the client sent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProxyTrust(pub bool);

/// Last hop of `x-forwarded-for` (the one our proxy appended), then `x-real-ip`.
pub fn forwarded_ip(headers: &HeaderMap) -> Option<IpAddr> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.rsplit(',').next())
        .and_then(|s| s.trim().parse::<IpAddr>().ok())
        .or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.trim().parse::<IpAddr>().ok())
        })
}

/// Client address: proxy headers when trusted, otherwise the socket peer.
pub fn client_ip(headers: &HeaderMap, extensions: &Extensions, trust: ProxyTrust) -> Option<IpAddr> {
    let peer = || {
        extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip())
    };

    if trust.0 {
        forwarded_ip(headers).or_else(peer)
    } else {
        peer()
    }
}

/// Middleware state: the limiter plus how to find the key.
#[derive(Clone)]
pub struct IpRateLimit {
    limiter: IpRateLimiter,
    trust: ProxyTrust,
}

impl IpRateLimit {
    pub fn new(limiter: IpRateLimiter, trust: ProxyTrust) -> Self {
        Self { limiter, trust }
    }
}

/// Middleware for IP-based rate limiting
pub async fn ip_rate_limit_middleware(
    State(rate_limit): State<IpRateLimit>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let ip = client_ip(request.headers(), request.extensions(), rate_limit.trust);

    match ip {
        Some(ip) => match rate_limit.limiter.check_key(&ip) {
            Ok(_) => Ok(next.run(request).await),
            Err(negative) => {
                let wait_time = negative.wait_time_from(DefaultClock::default().now());
                tracing::warn!(%ip, "rate limit exceeded");
                Err(AppError::TooManyRequests(
                    "Too many requests from this IP. Please try again later.".to_string(),
                    Some(wait_time.as_secs().max(1)),
                ))
            }
        },
        None => {
            tracing::warn!("Could not determine IP for rate limiting");
            Ok(next.run(request).await)
        }
    }
}
