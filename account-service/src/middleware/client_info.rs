use std::convert::Infallible;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use service_core::middleware::rate_limit::{client_ip, ProxyTrust};

use crate::services::ClientInfo;

const MAX_USER_AGENT_LEN: usize = 512;

/// Device metadata for the session row. Proxy headers count only when the
/// deployment trusts them; otherwise the socket peer is used.
#[axum::async_trait]
impl<S> FromRequestParts<S> for ClientInfo
where
    ProxyTrust: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let trust = ProxyTrust::from_ref(state);
        let ip = client_ip(&parts.headers, &parts.extensions, trust)
            .map(|ip| ip.to_string())
            .unwrap_or_else(|| ClientInfo::UNKNOWN_IP.to_string());

        let user_agent = parts
            .headers
            .get(header::USER_AGENT)
            .and_then(|value| value.to_str().ok())
            .map(|ua| ua.chars().take(MAX_USER_AGENT_LEN).collect());

        Ok(ClientInfo { user_agent, ip })
    }
}
