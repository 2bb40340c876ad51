//! Bounded body collection.
//!
//! The byte ceiling applies before the parse: a flood of oversized bodies
//! must not reach the parser, the rate limiter, or the mail dispatcher.

use axum::body::Body;
use http_body_util::LengthLimitError;
use serde_json::Value;

use crate::error::ApiError;

/// Collect at most `limit` bytes and parse them as JSON. Over-limit →
/// [`ApiError::PayloadTooLarge`]; unparseable or unreadable →
/// [`ApiError::MalformedBody`].
pub async fn read_json(body: Body, limit: usize) -> Result<Value, ApiError> {
    let bytes = match axum::body::to_bytes(body, limit).await {
        Ok(bytes) => bytes,
        Err(e) if is_length_limit(&e) => return Err(ApiError::PayloadTooLarge { limit }),
        // A client aborting mid-body is its mistake, not an oversize.
        Err(_) => return Err(ApiError::MalformedBody),
    };
    serde_json::from_slice(&bytes).map_err(|_| ApiError::MalformedBody)
}

fn is_length_limit(err: &axum::Error) -> bool {
    let mut source: Option<&(dyn std::error::Error + 'static)> = Some(err);
    while let Some(e) = source {
        if e.is::<LengthLimitError>() {
            return true;
        }
        source = e.source();
    }
    false
}
