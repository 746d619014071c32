//! Admission middleware.
//!
//! Two instances of the same fixed-window controller run in sequence:
//! - the origin limiter, for requests that carry no `X-API-KEY`, keyed by
//!   client address;
//! - the credential limiter, for requests that do, keyed by the credential
//!   with per-key overrides.
//!
//! Admitted responses carry `X-RateLimit-Limit` and `X-RateLimit-Remaining`.
//! Denials answer 429 with the same headers plus `Retry-After`.

use std::net::SocketAddr;

use axum::extract::{ConnectInfo, Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use ragchat_types::admission::Decision;

use crate::http::error::{insert_quota_headers, AppError};
use crate::http::extractors::auth::api_key;
use crate::http::middleware::exempt::is_exempt;
use crate::state::AppState;

pub const LIMIT_HEADER: &str = "x-ratelimit-limit";
pub const REMAINING_HEADER: &str = "x-ratelimit-remaining";

/// Origin key used when no address can be determined.
pub const UNKNOWN_ORIGIN: &str = "unknown";

/// Origin-keyed limiter. Skips exempt paths and credentialed requests.
pub async fn origin_rate_limit(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    if is_exempt(request.uri().path()) || api_key(request.headers()).is_some() {
        return next.run(request).await;
    }

    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0);
    let origin = client_origin(request.headers(), peer);

    let decision = state.origin_limiter.check(&origin);
    if !decision.allowed {
        return AppError::RateLimited {
            message: format!(
                "Rate limit exceeded for client '{origin}'. Try again in {} seconds.",
                decision.retry_after_secs()
            ),
            decision,
        }
        .into_response();
    }

    admitted(next.run(request).await, &decision)
}

/// Credential-keyed limiter. Skips exempt paths and requests without a key;
/// whether the key is valid is decided later by the auth extractor.
pub async fn credential_rate_limit(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    if is_exempt(request.uri().path()) {
        return next.run(request).await;
    }
    let Some(key) = api_key(request.headers()).map(str::to_string) else {
        return next.run(request).await;
    };

    let decision = state.credential_limiter.check(&key);
    if !decision.allowed {
        return AppError::RateLimited {
            message: format!(
                "Rate limit exceeded for API key '{key}'. Try again in {} seconds.",
                decision.retry_after_secs()
            ),
            decision,
        }
        .into_response();
    }

    admitted(next.run(request).await, &decision)
}

fn admitted(mut response: Response, decision: &Decision) -> Response {
    insert_quota_headers(response.headers_mut(), decision);
    response
}

/// Client address for the origin limiter: first `X-Forwarded-For` entry,
/// then `X-Real-IP`, then the socket peer, then `"unknown"`.
pub fn client_origin(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(str::trim)
        .filter(|s| !s.is_empty());
    if let Some(ip) = forwarded {
        return ip.to_string();
    }

    let real_ip = headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty());
    if let Some(ip) = real_ip {
        return ip.to_string();
    }

    peer.map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_ORIGIN.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_forwarded_for_takes_first_entry() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("10.0.0.1, 172.16.0.9"));
        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.2"));
        assert_eq!(client_origin(&headers, None), "10.0.0.1");
    }

    #[test]
    fn test_real_ip_then_peer_then_unknown() {
        let mut headers = HeaderMap::new();
        let peer: SocketAddr = "192.168.1.7:50123".parse().unwrap();

        assert_eq!(client_origin(&headers, None), UNKNOWN_ORIGIN);
        assert_eq!(client_origin(&headers, Some(peer)), "192.168.1.7");

        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.2"));
        assert_eq!(client_origin(&headers, Some(peer)), "10.0.0.2");
    }
}
