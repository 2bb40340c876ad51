//! Response security headers.
//!
//! # Responsibilities
//! - Build the deterministic hardening header set for a JSON API
//! - Conditionally add CORS headers when an allowed origin is known
//! - Conditionally add the rate-limit triplet and the request id
//!
//! # Design Decisions
//! - Pure function of inputs; no I/O
//! - CORS headers appear only for an explicitly allowed origin; their
//!   absence makes the response ineligible for cross-origin scripted access
//! - CSP is conservative: no script/style/image sources, same-origin connect

use axum::http::{header, HeaderMap, HeaderName, HeaderValue};

use crate::error::insert_rate_headers;

/// Rate-limit values echoed on the response.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitInfo {
    pub limit: u32,
    pub remaining: u32,
    pub reset: u64,
}

pub const X_REQUEST_ID: &str = "x-request-id";

const CSP: &str = "default-src 'none'; connect-src 'self'; frame-ancestors 'none'";
const HSTS: &str = "max-age=63072000; includeSubDomains";
const CORS_METHODS: &str = "POST, OPTIONS";
const CORS_HEADERS: &str = "Content-Type, X-CSRF-Token";

/// Assemble the full header set for a response.
pub fn security_headers(
    allowed_origin: Option<&str>,
    rate: Option<RateLimitInfo>,
    request_id: &str,
) -> HeaderMap {
    let mut headers = HeaderMap::new();

    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(
        header::STRICT_TRANSPORT_SECURITY,
        HeaderValue::from_static(HSTS),
    );
    headers.insert(
        header::CONTENT_SECURITY_POLICY,
        HeaderValue::from_static(CSP),
    );
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));

    if let Some(origin) = allowed_origin {
        if let Ok(value) = HeaderValue::from_str(origin) {
            headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, value);
            headers.insert(
                header::ACCESS_CONTROL_ALLOW_METHODS,
                HeaderValue::from_static(CORS_METHODS),
            );
            headers.insert(
                header::ACCESS_CONTROL_ALLOW_HEADERS,
                HeaderValue::from_static(CORS_HEADERS),
            );
            headers.insert(
                header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
                HeaderValue::from_static("true"),
            );
            headers.insert(header::VARY, HeaderValue::from_static("Origin"));
        }
    }

    if let Some(rate) = rate {
        insert_rate_headers(&mut headers, rate.limit, rate.remaining, rate.reset);
    }

    if let Ok(value) = HeaderValue::from_str(request_id) {
        headers.insert(HeaderName::from_static(X_REQUEST_ID), value);
    }

    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_set_is_always_present() {
        let headers = security_headers(None, None, "req-1");
        assert_eq!(headers["x-content-type-options"], "nosniff");
        assert_eq!(headers["x-frame-options"], "DENY");
        assert_eq!(headers["content-security-policy"], CSP);
        assert_eq!(headers["cache-control"], "no-store");
        assert_eq!(headers["x-request-id"], "req-1");
    }

    #[test]
    fn cors_only_with_allowed_origin() {
        let without = security_headers(None, None, "r");
        assert!(!without.contains_key("access-control-allow-origin"));

        let with = security_headers(Some("https://site.example"), None, "r");
        assert_eq!(
            with["access-control-allow-origin"],
            "https://site.example"
        );
        assert_eq!(with["access-control-allow-credentials"], "true");
        assert_eq!(with["vary"], "Origin");
    }

    #[test]
    fn rate_triplet_only_when_given() {
        let without = security_headers(None, None, "r");
        assert!(!without.contains_key("x-ratelimit-limit"));

        let rate = RateLimitInfo {
            limit: 5,
            remaining: 3,
            reset: 1_700_000_060,
        };
        let with = security_headers(None, Some(rate), "r");
        assert_eq!(with["x-ratelimit-limit"], "5");
        assert_eq!(with["x-ratelimit-remaining"], "3");
        assert_eq!(with["x-ratelimit-reset"], "1700000060");
    }
}
