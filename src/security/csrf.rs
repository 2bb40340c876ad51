//! CSRF double-submit validation.
//!
//! # Responsibilities
//! - Extract the token cookie and the token header from a request
//! - Compare the pair without leaking timing correlated with content
//!
//! # Design Decisions
//! - Fail closed: a missing or empty token on either side is invalid
//! - Length mismatch short-circuits (length is a safe-to-leak signal);
//!   only the content comparison is constant-time
//! - The comparison is a dedicated function so it can be unit-tested
//!   independently of the HTTP layer

use subtle::ConstantTimeEq;

/// Constant-time byte equality with a length short-circuit.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

/// Validate a double-submit pair. Both sides must be present, non-empty,
/// and byte-equal.
pub fn validate_pair(cookie_token: Option<&str>, header_token: Option<&str>) -> bool {
    match (cookie_token, header_token) {
        (Some(cookie), Some(header)) if !cookie.is_empty() && !header.is_empty() => {
            constant_time_eq(cookie.as_bytes(), header.as_bytes())
        }
        _ => false,
    }
}

/// Pull a named cookie's value out of a raw `Cookie` header.
pub fn cookie_value<'a>(cookie_header: &'a str, name: &str) -> Option<&'a str> {
    cookie_header.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        if key == name {
            Some(value)
        } else {
            None
        }
    })
}
