//! Per-request context.
//!
//! # Responsibilities
//! - Mint (or adopt) the request id as early as possible
//! - Derive the client IP from trusted proxy headers
//! - Attach both to request extensions and ensure the id reaches the response
//!
//! # Design Decisions
//! - `X-Forwarded-For` first hop wins, then `X-Real-Ip`, then the socket peer
//! - Every response carries `X-Request-Id`, including terminal errors, so a
//!   surfaced failure correlates with server-side logs

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{HeaderMap, HeaderName, HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use std::net::SocketAddr;
use uuid::Uuid;

pub const X_REQUEST_ID: &str = "x-request-id";

/// Read-only identity of one request. Created at the edge, discarded at
/// response.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: String,
    pub client_ip: String,
    pub origin: Option<String>,
}

impl RequestContext {
    pub fn from_parts(headers: &HeaderMap, peer: SocketAddr) -> Self {
        let request_id = headers
            .get(X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        Self {
            request_id,
            client_ip: client_ip(headers, peer),
            origin: headers
                .get("origin")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string),
        }
    }
}

/// Middleware attaching a [`RequestContext`] and stamping the response id.
pub async fn context_middleware(
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let context = RequestContext::from_parts(request.headers(), peer);
    let request_id = context.request_id.clone();

    tracing::debug!(
        request_id = %request_id,
        client_ip = %context.client_ip,
        method = %request.method(),
        path = %request.uri().path(),
        "Request received"
    );

    request.extensions_mut().insert(context);
    let mut response = next.run(request).await;

    if !response.headers().contains_key(X_REQUEST_ID) {
        if let Ok(value) = HeaderValue::from_str(&request_id) {
            response
                .headers_mut()
                .insert(HeaderName::from_static(X_REQUEST_ID), value);
        }
    }
    response
}

fn client_ip(headers: &HeaderMap, peer: SocketAddr) -> String {
    if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }
    if let Some(real_ip) = headers.get("x-real-ip").and_then(|v| v.to_str().ok()) {
        if !real_ip.is_empty() {
            return real_ip.to_string();
        }
    }
    peer.ip().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer() -> SocketAddr {
        "10.0.0.1:55555".parse().unwrap()
    }

    #[test]
    fn forwarded_for_first_hop_wins() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.7, 10.0.0.2"),
        );
        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.3"));
        assert_eq!(client_ip(&headers, peer()), "203.0.113.7");
    }

    #[test]
    fn real_ip_then_peer_fallback() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.4"));
        assert_eq!(client_ip(&headers, peer()), "198.51.100.4");
        assert_eq!(client_ip(&HeaderMap::new(), peer()), "10.0.0.1");
    }

    #[test]
    fn adopts_inbound_request_id() {
        let mut headers = HeaderMap::new();
        headers.insert(X_REQUEST_ID, HeaderValue::from_static("req-abc"));
        let context = RequestContext::from_parts(&headers, peer());
        assert_eq!(context.request_id, "req-abc");
    }

    #[test]
    fn mints_id_when_absent() {
        let context = RequestContext::from_parts(&HeaderMap::new(), peer());
        assert!(Uuid::parse_str(&context.request_id).is_ok());
    }
}
