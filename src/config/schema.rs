//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the service.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the lead-capture backend.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Listener configuration (bind address, request timeout).
    pub listener: ListenerConfig,

    /// Origin, CSRF, body-size and grant settings.
    pub security: SecurityConfig,

    /// Abuse rate limiting settings.
    pub rate_limit: RateLimitConfig,

    /// Mail delivery settings (primary HTTP provider + SMTP fallback).
    pub mail: MailConfig,

    /// Protected assets served against a download grant.
    pub downloads: DownloadConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Whole-request deadline. Must exceed two mail attempt timeouts.
    pub request_timeout_secs: u64,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            request_timeout_secs: 45,
        }
    }
}

/// Security configuration: origin gate, CSRF pair, body ceiling, grants.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Origins allowed to POST. Empty list falls back to same-host matching.
    pub allowed_origins: Vec<String>,

    /// Name of the CSRF double-submit cookie.
    pub csrf_cookie: String,

    /// Name of the CSRF request header.
    pub csrf_header: String,

    /// Byte ceiling applied before the body is parsed.
    pub max_body_bytes: usize,

    /// Secret used to sign download grants. Must be set in production.
    pub grant_secret: String,

    /// Grant lifetime; also the grant cookie's Max-Age.
    pub grant_ttl_secs: u64,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            allowed_origins: Vec::new(),
            csrf_cookie: "csrf_token".to_string(),
            csrf_header: "x-csrf-token".to_string(),
            max_body_bytes: 32 * 1024,
            grant_secret: String::new(),
            grant_ttl_secs: 600,
        }
    }
}

/// Behavior when the shared rate-limit store errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StoreErrorPolicy {
    /// Serve the call from the per-process sliding window instead.
    /// Narrows the limit's scope from global to per-process while the
    /// store is unreachable, preserving availability.
    FallbackLocal,

    /// Deny every call while the store is unreachable, preserving the
    /// global guarantee at the cost of availability.
    FailClosed,
}

impl Default for StoreErrorPolicy {
    fn default() -> Self {
        StoreErrorPolicy::FallbackLocal
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Maximum requests per key within one window.
    pub max_requests: u32,

    /// Window length in seconds.
    pub window_secs: u64,

    /// Shared store URL (e.g., "redis://127.0.0.1:6379"). Absent means
    /// the per-process window is the only path.
    pub redis_url: Option<String>,

    /// What to do when the shared store call errors.
    pub on_store_error: StoreErrorPolicy,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 5,
            window_secs: 60,
            redis_url: None,
            on_store_error: StoreErrorPolicy::default(),
        }
    }
}

/// Mail delivery configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MailConfig {
    /// Envelope sender for composed messages.
    pub from: String,

    /// Inbox that receives the submissions.
    pub to: String,

    /// Hard deadline for each provider attempt.
    pub attempt_timeout_secs: u64,

    /// Primary transactional-email HTTP API.
    pub primary: HttpProviderConfig,

    /// Secondary SMTP transport.
    pub smtp: SmtpConfig,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            from: "forms@localhost".to_string(),
            to: "sales@localhost".to_string(),
            attempt_timeout_secs: 15,
            primary: HttpProviderConfig::default(),
            smtp: SmtpConfig::default(),
        }
    }
}

/// Primary HTTP mail provider settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HttpProviderConfig {
    /// Send endpoint of the transactional email API.
    pub api_url: String,

    /// Bearer token for the API.
    pub api_key: String,
}

impl Default for HttpProviderConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.resend.com/emails".to_string(),
            api_key: String::new(),
        }
    }
}

/// Secondary SMTP transport settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,

    /// Connection-pool cap; the transport is reused across warm requests.
    pub pool_max_size: u32,
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 587,
            username: None,
            password: None,
            pool_max_size: 2,
        }
    }
}

/// Paths of grant-protected downloadable assets.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DownloadConfig {
    pub quotes_path: String,
    pub brochure_path: String,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            quotes_path: "assets/quotes.pdf".to_string(),
            brochure_path: "assets/brochure.pdf".to_string(),
        }
    }
}

/// Observability settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Enable the Prometheus exporter.
    pub metrics_enabled: bool,

    /// Scrape listener address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9100".to_string(),
        }
    }
}
