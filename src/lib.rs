//! Request-security-and-delivery pipeline for a marketing site's
//! lead-capture and contact endpoints.
//!
//! Every inbound submission passes through: cross-origin and forgery
//! checks, a body-size-bounded parse, a sliding-window abuse limiter,
//! mail delivery with one provider fallback under hard timeouts, and, on
//! success, a short-lived signed grant gating a protected download.

pub mod config;
pub mod error;
pub mod http;
pub mod mail;
pub mod observability;
pub mod security;
pub mod validate;

pub use config::AppConfig;
pub use http::HttpServer;
