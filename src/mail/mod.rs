//! Mail delivery subsystem.
//!
//! # Data Flow
//! ```text
//! Validated submission
//!     → MailMessage (immutable, built once per request)
//!     → dispatcher.rs (ordered provider list, per-attempt deadline)
//!         → http_provider.rs (transactional email API via reqwest)
//!         → smtp.rs (pooled lettre transport, exactly one fallback)
//! ```
//!
//! # Design Decisions
//! - Providers are an ordered list behind one trait, not nested try/catch;
//!   adding a third provider is a one-line change
//! - Each attempt gets its own full timeout budget; a fired timer drops the
//!   in-flight future, which aborts the underlying I/O
//! - Both providers failing surfaces a single aggregated error

mod dispatcher;
mod http_provider;
mod smtp;

pub use dispatcher::{DeliveryError, MailDispatcher};
pub use http_provider::HttpApiTransport;
pub use smtp::SmtpRelay;

use async_trait::async_trait;
use thiserror::Error;

/// The composed message. Built once from validated input; never retried
/// with mutated content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub html: String,
    pub reply_to: Option<String>,
}

/// A single provider attempt's failure.
#[derive(Debug, Error)]
pub enum MailError {
    #[error("provider returned status {0}")]
    Status(u16),

    #[error("network error: {0}")]
    Network(String),

    #[error("attempt timed out after {0}s")]
    Timeout(u64),

    #[error("smtp error: {0}")]
    Smtp(String),
}

/// One way of getting a message out the door.
#[async_trait]
pub trait MailTransport: Send + Sync {
    fn name(&self) -> &'static str;

    async fn send(&self, message: &MailMessage) -> Result<(), MailError>;
}
