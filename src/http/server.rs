//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (tracing, timeout, request context)
//! - Construct the shared subsystems (limiter, dispatcher, grant issuer)
//! - Bind server to listener and serve with graceful shutdown

use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::AppConfig;
use crate::http::handlers;
use crate::http::request::context_middleware;
use crate::mail::{HttpApiTransport, MailDispatcher, MailError, MailTransport, SmtpRelay};
use crate::security::grant::GrantIssuer;
use crate::security::rate_limit::RateLimiter;
use crate::validate::{BasicValidator, PayloadValidator};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub limiter: Arc<RateLimiter>,
    pub dispatcher: Arc<MailDispatcher>,
    pub validator: Arc<dyn PayloadValidator>,
    pub grants: Arc<GrantIssuer>,
}

/// Failure to assemble the server's shared resources.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("mail transport setup failed: {0}")]
    Mail(#[from] MailError),
}

/// HTTP server for the lead-capture backend.
pub struct HttpServer {
    router: Router,
    config: AppConfig,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    ///
    /// The outbound HTTP client, the SMTP pool, and the rate-limit store
    /// handle are all built here, once per process, and shared across
    /// requests.
    pub fn new(config: AppConfig) -> Result<Self, ServerError> {
        let client = reqwest::Client::new();
        let primary: Arc<dyn MailTransport> = Arc::new(HttpApiTransport::new(
            client,
            config.mail.primary.api_url.clone(),
            config.mail.primary.api_key.clone(),
        ));
        let secondary: Arc<dyn MailTransport> = Arc::new(SmtpRelay::from_config(&config.mail.smtp)?);
        let dispatcher = Arc::new(MailDispatcher::new(
            vec![primary, secondary],
            Duration::from_secs(config.mail.attempt_timeout_secs),
        ));

        let state = AppState {
            limiter: Arc::new(RateLimiter::new(&config.rate_limit)),
            dispatcher,
            validator: Arc::new(BasicValidator),
            grants: Arc::new(GrantIssuer::new(
                &config.security.grant_secret,
                config.security.grant_ttl_secs,
            )),
            config: Arc::new(config.clone()),
        };

        let router = build_router(state);
        Ok(Self { router, config })
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(self, listener: TcpListener) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}

/// Build the Axum router with all middleware layers.
pub fn build_router(state: AppState) -> Router {
    let timeout = Duration::from_secs(state.config.listener.request_timeout_secs);
    Router::new()
        .route(
            "/api/lead",
            post(handlers::submit_lead).options(handlers::preflight),
        )
        .route(
            "/api/contact",
            post(handlers::submit_contact).options(handlers::preflight),
        )
        .route("/api/download/{kind}", get(handlers::download))
        .route("/health", get(handlers::health))
        .with_state(state)
        .layer(axum::middleware::from_fn(context_middleware))
        .layer(TimeoutLayer::new(timeout))
        .layer(TraceLayer::new_for_http())
}

/// Wait for shutdown signal (Ctrl+C).
async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    tracing::info!("Shutdown signal received");
}
