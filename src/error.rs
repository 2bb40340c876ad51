//! API error taxonomy.
//!
//! # Responsibilities
//! - One variant per terminal failure class in the submission pipeline
//! - Map each variant to its HTTP status and wire body
//! - Keep internal detail (provider errors, store errors) out of responses
//!
//! # Design Decisions
//! - Every stage converts its own failure into a terminal response; nothing
//!   continues past a gating failure
//! - Rate-limit rejections carry `Retry-After` and the rate-limit headers on
//!   the error response itself
//! - Delivery and unexpected errors return a generic body; detail goes to logs

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

/// A single field-level validation failure, serialized as `{msg, param}`.
#[derive(Debug, Clone, Serialize)]
pub struct FieldIssue {
    pub msg: String,
    pub param: String,
}

/// Terminal failures of the submission pipeline.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("origin not allowed")]
    ForbiddenOrigin,

    #[error("CSRF token missing or mismatched")]
    CsrfMismatch,

    #[error("payload exceeds {limit} bytes")]
    PayloadTooLarge { limit: usize },

    #[error("request body is not valid JSON")]
    MalformedBody,

    #[error("payload failed validation")]
    ValidationFailed(Vec<FieldIssue>),

    #[error("rate limit exceeded")]
    RateLimited {
        retry_after: u64,
        limit: u32,
        remaining: u32,
        reset: u64,
    },

    #[error("all mail providers failed: {0}")]
    Delivery(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Status code this error maps to on the wire.
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::ForbiddenOrigin | ApiError::CsrfMismatch => StatusCode::FORBIDDEN,
            ApiError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::MalformedBody | ApiError::ValidationFailed(_) => StatusCode::BAD_REQUEST,
            ApiError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Delivery(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            ApiError::ForbiddenOrigin | ApiError::CsrfMismatch => {
                (status, Json(json!({ "error": "Forbidden" }))).into_response()
            }
            ApiError::PayloadTooLarge { .. } => {
                (status, Json(json!({ "error": "Payload too large" }))).into_response()
            }
            ApiError::MalformedBody => {
                (status, Json(json!({ "error": "Malformed request body" }))).into_response()
            }
            ApiError::ValidationFailed(issues) => {
                (status, Json(json!({ "errors": issues }))).into_response()
            }
            ApiError::RateLimited {
                retry_after,
                limit,
                remaining,
                reset,
            } => {
                let mut response =
                    (status, Json(json!({ "error": "Too many requests" }))).into_response();
                let headers = response.headers_mut();
                if let Ok(v) = HeaderValue::from_str(&retry_after.to_string()) {
                    headers.insert(header::RETRY_AFTER, v);
                }
                insert_rate_headers(headers, limit, remaining, reset);
                response
            }
            ApiError::Delivery(_) => {
                (status, Json(json!({ "error": "Failed to send message" }))).into_response()
            }
            ApiError::Internal(_) => {
                (status, Json(json!({ "error": "Internal server error" }))).into_response()
            }
        }
    }
}

/// Insert the `X-RateLimit-*` triplet into a header map.
pub fn insert_rate_headers(
    headers: &mut axum::http::HeaderMap,
    limit: u32,
    remaining: u32,
    reset: u64,
) {
    let pairs = [
        ("x-ratelimit-limit", limit.to_string()),
        ("x-ratelimit-remaining", remaining.to_string()),
        ("x-ratelimit-reset", reset.to_string()),
    ];
    for (name, value) in pairs {
        if let Ok(v) = HeaderValue::from_str(&value) {
            headers.insert(axum::http::HeaderName::from_static(name), v);
        }
    }
}
