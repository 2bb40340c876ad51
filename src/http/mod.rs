//! HTTP subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware layering)
//!     → request.rs (request id + client IP context)
//!     → handlers.rs (submission pipeline, preflight, download, health)
//!     → body.rs (bounded read + parse, used inside the pipeline)
//! ```

pub mod body;
pub mod handlers;
pub mod request;
pub mod server;

pub use request::RequestContext;
pub use server::{AppState, HttpServer};
