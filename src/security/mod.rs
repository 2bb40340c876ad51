//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming POST:
//!     → origin.rs (allow-list / same-host gate)
//!     → csrf.rs (double-submit token pair)
//!     → rate_limit.rs (sliding window per route+IP)
//!     → ... mail dispatch ...
//!     → grant.rs (signed download grant on success)
//!     → headers.rs (deterministic response header set)
//! ```
//!
//! # Design Decisions
//! - Fail closed: reject on any security check failure
//! - Constant-time comparison for every secret-bearing equality
//! - No trust in client input

pub mod csrf;
pub mod grant;
pub mod headers;
pub mod origin;
pub mod rate_limit;
