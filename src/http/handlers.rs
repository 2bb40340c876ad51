//! Request handlers.
//!
//! The submission pipeline, in order:
//! OriginGate → CsrfValidator → BodyReader → schema validation →
//! RateLimiter → MailDispatcher → GrantIssuer → security headers.
//! Any stage short-circuits with a terminal response; later stages never
//! run.

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, HeaderValue, Request, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::net::SocketAddr;
use std::time::Instant;

use crate::config::MailConfig;
use crate::error::ApiError;
use crate::http::body::read_json;
use crate::http::request::RequestContext;
use crate::http::server::AppState;
use crate::mail::MailMessage;
use crate::observability::metrics;
use crate::security::csrf;
use crate::security::grant::{GrantKind, GRANT_COOKIE};
use crate::security::headers::{security_headers, RateLimitInfo};
use crate::security::origin::origin_allowed;
use crate::validate::{LeadForm, Outcome};

pub async fn submit_lead(State(state): State<AppState>, request: Request<Body>) -> Response {
    submit(state, request, "lead", GrantKind::Quotes, "Lead sent successfully").await
}

pub async fn submit_contact(State(state): State<AppState>, request: Request<Body>) -> Response {
    submit(
        state,
        request,
        "contact",
        GrantKind::Brochure,
        "Message sent successfully",
    )
    .await
}

async fn submit(
    state: AppState,
    request: Request<Body>,
    route: &'static str,
    kind: GrantKind,
    success_message: &'static str,
) -> Response {
    let start = Instant::now();
    let (parts, body) = request.into_parts();
    let context = request_context(&parts);

    let host = parts.headers.get(header::HOST).and_then(|v| v.to_str().ok());
    let origin = context.origin.as_deref().filter(|o| !o.is_empty());

    // 1. Origin gate: deny before the body or any shared state is touched.
    if !origin_allowed(origin, host, &state.config.security.allowed_origins) {
        tracing::warn!(request_id = %context.request_id, origin = ?origin, "Origin denied");
        return finalize(
            ApiError::ForbiddenOrigin.into_response(),
            None,
            None,
            &context,
            route,
            start,
        );
    }
    let cors_origin = origin.map(str::to_string);

    // 2. CSRF double-submit pair.
    let cookie_token = parts
        .headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|h| csrf::cookie_value(h, &state.config.security.csrf_cookie));
    let header_token = parts
        .headers
        .get(state.config.security.csrf_header.as_str())
        .and_then(|v| v.to_str().ok());
    if !csrf::validate_pair(cookie_token, header_token) {
        tracing::warn!(request_id = %context.request_id, "CSRF pair rejected");
        return finalize(
            ApiError::CsrfMismatch.into_response(),
            cors_origin.as_deref(),
            None,
            &context,
            route,
            start,
        );
    }

    // 3. Bounded read + parse. Cheap rejection before the limiter spends
    // budget on oversized or garbage bodies.
    let raw = match read_json(body, state.config.security.max_body_bytes).await {
        Ok(raw) => raw,
        Err(e) => {
            return finalize(
                e.into_response(),
                cors_origin.as_deref(),
                None,
                &context,
                route,
                start,
            )
        }
    };

    // 4. Schema validation (external collaborator).
    let form = match state.validator.validate(&raw) {
        Outcome::Valid(form) => form,
        Outcome::Invalid(issues) => {
            return finalize(
                ApiError::ValidationFailed(issues).into_response(),
                cors_origin.as_deref(),
                None,
                &context,
                route,
                start,
            )
        }
    };

    // 5. Rate limit per (route, client IP).
    let decision = state.limiter.check(route, &context.client_ip).await;
    let rate = RateLimitInfo {
        limit: decision.limit,
        remaining: decision.remaining,
        reset: decision.reset,
    };
    if !decision.allowed {
        tracing::warn!(
            request_id = %context.request_id,
            client_ip = %context.client_ip,
            route = route,
            "Rate limit exceeded"
        );
        metrics::record_rate_limited(route);
        let error = ApiError::RateLimited {
            retry_after: decision.retry_after(),
            limit: decision.limit,
            remaining: decision.remaining,
            reset: decision.reset,
        };
        return finalize(
            error.into_response(),
            cors_origin.as_deref(),
            None,
            &context,
            route,
            start,
        );
    }

    // 6. Delivery with single fallback.
    let message = compose_message(&state.config.mail, route, &form);
    match state.dispatcher.dispatch(&message).await {
        Ok(provider) => {
            tracing::info!(
                request_id = %context.request_id,
                provider = provider,
                route = route,
                "Submission delivered"
            );
            // 7. Grant only after delivery succeeded.
            let mut response =
                (StatusCode::OK, Json(json!({ "message": success_message }))).into_response();
            if let Ok(value) = HeaderValue::from_str(&state.grants.cookie(kind)) {
                response.headers_mut().append(header::SET_COOKIE, value);
            }
            finalize(
                response,
                cors_origin.as_deref(),
                Some(rate),
                &context,
                route,
                start,
            )
        }
        Err(e) => {
            tracing::error!(request_id = %context.request_id, error = %e, "Delivery failed");
            finalize(
                ApiError::Delivery(e.to_string()).into_response(),
                cors_origin.as_deref(),
                Some(rate),
                &context,
                route,
                start,
            )
        }
    }
}

/// CORS preflight for the POST endpoints.
pub async fn preflight(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let (parts, _) = request.into_parts();
    let context = request_context(&parts);
    let host = parts.headers.get(header::HOST).and_then(|v| v.to_str().ok());
    let origin = context.origin.as_deref().filter(|o| !o.is_empty());

    if !origin_allowed(origin, host, &state.config.security.allowed_origins) {
        return finalize(
            ApiError::ForbiddenOrigin.into_response(),
            None,
            None,
            &context,
            "preflight",
            start,
        );
    }

    finalize(
        StatusCode::NO_CONTENT.into_response(),
        origin,
        None,
        &context,
        "preflight",
        start,
    )
}

/// Grant-gated download of a protected static asset.
pub async fn download(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    request: Request<Body>,
) -> Response {
    let start = Instant::now();
    let (parts, _) = request.into_parts();
    let context = request_context(&parts);

    let kind = match GrantKind::parse(&kind) {
        Some(kind) => kind,
        None => {
            return finalize(
                (StatusCode::NOT_FOUND, Json(json!({ "error": "Not found" }))).into_response(),
                None,
                None,
                &context,
                "download",
                start,
            )
        }
    };

    let presented = parts
        .headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|h| csrf::cookie_value(h, GRANT_COOKIE));
    let verified = presented.and_then(|value| state.grants.verify(value).ok());

    // Wrong kind, bad signature, expiry, and absence all collapse into the
    // same generic response.
    if verified != Some(kind) {
        tracing::warn!(request_id = %context.request_id, kind = kind.as_str(), "Download grant rejected");
        return finalize(
            ApiError::ForbiddenOrigin.into_response(),
            None,
            None,
            &context,
            "download",
            start,
        );
    }

    let path = match kind {
        GrantKind::Quotes => &state.config.downloads.quotes_path,
        GrantKind::Brochure => &state.config.downloads.brochure_path,
    };
    match tokio::fs::read(path).await {
        Ok(bytes) => {
            let mut response = bytes.into_response();
            response.headers_mut().insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/octet-stream"),
            );
            response.headers_mut().insert(
                header::CONTENT_DISPOSITION,
                HeaderValue::from_static("attachment"),
            );
            finalize(response, None, None, &context, "download", start)
        }
        Err(e) => {
            tracing::error!(request_id = %context.request_id, error = %e, path = %path, "Asset read failed");
            finalize(
                (StatusCode::NOT_FOUND, Json(json!({ "error": "Not found" }))).into_response(),
                None,
                None,
                &context,
                "download",
                start,
            )
        }
    }
}

pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

fn request_context(parts: &axum::http::request::Parts) -> RequestContext {
    parts
        .extensions
        .get::<RequestContext>()
        .cloned()
        .unwrap_or_else(|| {
            // Only reachable if the context layer is missing.
            RequestContext::from_parts(
                &parts.headers,
                SocketAddr::from(([0, 0, 0, 0], 0)),
            )
        })
}

/// Merge the deterministic security header set into a response and record
/// the request metric.
fn finalize(
    mut response: Response,
    cors_origin: Option<&str>,
    rate: Option<RateLimitInfo>,
    context: &RequestContext,
    route: &'static str,
    start: Instant,
) -> Response {
    let headers = security_headers(cors_origin, rate, &context.request_id);
    for (name, value) in headers {
        if let Some(name) = name {
            response.headers_mut().insert(name, value);
        }
    }
    metrics::record_request(route, response.status().as_u16(), start);
    response
}

fn compose_message(config: &MailConfig, route: &str, form: &LeadForm) -> MailMessage {
    let subject = format!("New {} submission from {}", form.form_type, form.name);
    let mut html = format!(
        "<h2>New {} submission</h2>\
         <p><strong>Name:</strong> {}</p>\
         <p><strong>Phone:</strong> {}</p>",
        escape(route),
        escape(&form.name),
        escape(&form.phone),
    );
    if let Some(email) = &form.email {
        html.push_str(&format!("<p><strong>Email:</strong> {}</p>", escape(email)));
    }
    if let Some(message) = &form.message {
        html.push_str(&format!(
            "<p><strong>Message:</strong> {}</p>",
            escape(message)
        ));
    }

    MailMessage {
        from: config.from.clone(),
        to: config.to.clone(),
        subject,
        html,
        reply_to: form.email.clone(),
    }
}

fn escape(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
