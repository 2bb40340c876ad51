//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (windows > 0, ceilings > 0, usable secret)
//! - Check cross-field consistency (request deadline vs. mail budgets)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use crate::config::schema::AppConfig;

/// A single semantic configuration problem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    EmptyGrantSecret,
    ShortGrantSecret { len: usize },
    ZeroBodyCeiling,
    ZeroRateWindow,
    ZeroRateMax,
    ZeroGrantTtl,
    ZeroAttemptTimeout,
    EmptyMailAddress { field: &'static str },
    RequestTimeoutTooShort { request: u64, attempts: u64 },
    ZeroSmtpPool,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::EmptyGrantSecret => write!(f, "security.grant_secret must be set"),
            ValidationError::ShortGrantSecret { len } => {
                write!(f, "security.grant_secret is {} bytes; need at least 16", len)
            }
            ValidationError::ZeroBodyCeiling => write!(f, "security.max_body_bytes must be > 0"),
            ValidationError::ZeroRateWindow => write!(f, "rate_limit.window_secs must be > 0"),
            ValidationError::ZeroRateMax => write!(f, "rate_limit.max_requests must be > 0"),
            ValidationError::ZeroGrantTtl => write!(f, "security.grant_ttl_secs must be > 0"),
            ValidationError::ZeroAttemptTimeout => {
                write!(f, "mail.attempt_timeout_secs must be > 0")
            }
            ValidationError::EmptyMailAddress { field } => {
                write!(f, "mail.{} must be a non-empty address", field)
            }
            ValidationError::RequestTimeoutTooShort { request, attempts } => write!(
                f,
                "listener.request_timeout_secs ({}) must exceed both mail attempts ({})",
                request, attempts
            ),
            ValidationError::ZeroSmtpPool => write!(f, "mail.smtp.pool_max_size must be > 0"),
        }
    }
}

/// Run all semantic checks, collecting every failure.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.security.grant_secret.is_empty() {
        errors.push(ValidationError::EmptyGrantSecret);
    } else if config.security.grant_secret.len() < 16 {
        errors.push(ValidationError::ShortGrantSecret {
            len: config.security.grant_secret.len(),
        });
    }
    if config.security.max_body_bytes == 0 {
        errors.push(ValidationError::ZeroBodyCeiling);
    }
    if config.security.grant_ttl_secs == 0 {
        errors.push(ValidationError::ZeroGrantTtl);
    }

    if config.rate_limit.window_secs == 0 {
        errors.push(ValidationError::ZeroRateWindow);
    }
    if config.rate_limit.max_requests == 0 {
        errors.push(ValidationError::ZeroRateMax);
    }

    if config.mail.attempt_timeout_secs == 0 {
        errors.push(ValidationError::ZeroAttemptTimeout);
    }
    if config.mail.from.trim().is_empty() {
        errors.push(ValidationError::EmptyMailAddress { field: "from" });
    }
    if config.mail.to.trim().is_empty() {
        errors.push(ValidationError::EmptyMailAddress { field: "to" });
    }
    if config.mail.smtp.pool_max_size == 0 {
        errors.push(ValidationError::ZeroSmtpPool);
    }

    // Each provider gets its own full budget; the request deadline must
    // cover primary + fallback.
    let attempts = config.mail.attempt_timeout_secs.saturating_mul(2);
    if config.listener.request_timeout_secs <= attempts {
        errors.push(ValidationError::RequestTimeoutTooShort {
            request: config.listener.request_timeout_secs,
            attempts,
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::AppConfig;

    fn valid_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.security.grant_secret = "0123456789abcdef0123456789abcdef".to_string();
        config
    }

    #[test]
    fn default_with_secret_is_valid() {
        assert!(validate_config(&valid_config()).is_ok());
    }

    #[test]
    fn collects_all_errors() {
        let mut config = valid_config();
        config.security.grant_secret.clear();
        config.rate_limit.max_requests = 0;
        config.rate_limit.window_secs = 0;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.contains(&ValidationError::EmptyGrantSecret));
        assert!(errors.contains(&ValidationError::ZeroRateMax));
        assert!(errors.contains(&ValidationError::ZeroRateWindow));
    }

    #[test]
    fn request_deadline_must_cover_both_attempts() {
        let mut config = valid_config();
        config.listener.request_timeout_secs = 20;
        let errors = validate_config(&config).unwrap_err();
        assert!(matches!(
            errors[0],
            ValidationError::RequestTimeoutTooShort { .. }
        ));
    }
}
