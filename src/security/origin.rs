//! Cross-origin gate.
//!
//! First check in the pipeline: a denied origin gets a 403 before the body
//! or any state-mutating resource is touched.

/// Decide whether a declared `Origin` may proceed.
///
/// Rules, in order:
/// - No `Origin` header: allowed (same-origin fetches and non-browser
///   clients omit it).
/// - Non-empty allow-list: exact match against the list.
/// - Empty allow-list: the origin's authority must equal the request's own
///   `Host` header (same-host requests are treated as same-origin).
pub fn origin_allowed(origin: Option<&str>, host: Option<&str>, allow_list: &[String]) -> bool {
    let origin = match origin {
        Some(o) if !o.is_empty() => o,
        _ => return true,
    };

    if !allow_list.is_empty() {
        return allow_list.iter().any(|allowed| allowed == origin);
    }

    match (origin_authority(origin), host) {
        (Some(authority), Some(host)) => authority.eq_ignore_ascii_case(host),
        _ => false,
    }
}

/// Extract the `host[:port]` authority from an origin like
/// `https://example.com:8443`.
fn origin_authority(origin: &str) -> Option<&str> {
    let rest = origin.split_once("://").map(|(_, rest)| rest)?;
    let authority = rest.split('/').next()?;
    if authority.is_empty() {
        None
    } else {
        Some(authority)
    }
}
