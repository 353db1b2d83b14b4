//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (preview size, text threshold)
//! - Check addresses parse and paths are non-empty
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: CatcherConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::CatcherConfig;

/// One failed semantic check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field, e.g. `listener.bind_address`.
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Check a parsed configuration, collecting every problem.
pub fn validate_config(config: &CatcherConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("not a socket address: {:?}", config.listener.bind_address),
        ));
    }
    if config.listener.max_body_size == 0 {
        errors.push(ValidationError::new("listener.max_body_size", "must be greater than 0"));
    }
    if config.listener.request_timeout_secs == 0 {
        errors.push(ValidationError::new("listener.request_timeout_secs", "must be greater than 0"));
    }
    if let Some(tls) = &config.listener.tls {
        if tls.cert_path.is_empty() || tls.key_path.is_empty() {
            errors.push(ValidationError::new(
                "listener.tls",
                "cert_path and key_path must both be set",
            ));
        }
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ValidationError::new("storage.database_path", "must not be empty"));
    }
    if config.storage.uploads_dir.trim().is_empty() {
        errors.push(ValidationError::new("storage.uploads_dir", "must not be empty"));
    }
    if config.storage.static_dir.trim().is_empty() {
        errors.push(ValidationError::new("storage.static_dir", "must not be empty"));
    }

    if config.capture.preview_bytes == 0 {
        errors.push(ValidationError::new("capture.preview_bytes", "must be greater than 0"));
    }
    let threshold = config.capture.text_threshold;
    if !(threshold > 0.0 && threshold < 1.0) {
        errors.push(ValidationError::new(
            "capture.text_threshold",
            format!("must be between 0 and 1 (exclusive), got {}", threshold),
        ));
    }

    if config.viewer.enabled && (config.viewer.username.is_empty() || config.viewer.password.is_empty()) {
        errors.push(ValidationError::new(
            "viewer",
            "username and password are required when the viewer is enabled",
        ));
    }
    if config.viewer.username.contains(':') {
        errors.push(ValidationError::new("viewer.username", "must not contain ':'"));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("not a socket address: {:?}", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
