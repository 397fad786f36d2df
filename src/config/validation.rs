//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, windows non-empty)
//! - Check that addresses parse and route paths do not collide
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServerConfig → Result<(), Vec<ValidationError>>
//! - Form tables are checked by the forms builder, not here

use std::collections::BTreeSet;
use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::{EmailProviderKind, ServerConfig};
use crate::forms::defaults::RouteSettings;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }

    if let Some(tls) = &config.listener.tls {
        if tls.cert_path.is_empty() || tls.key_path.is_empty() {
            errors.push(ValidationError::new(
                "listener.tls",
                "cert_path and key_path are required",
            ));
        }
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be greater than 0"));
    }
    if config.timeouts.outbound_secs == 0 {
        errors.push(ValidationError::new("timeouts.outbound_secs", "must be greater than 0"));
    }

    if config.security.csrf_ttl_secs == 0 {
        errors.push(ValidationError::new("security.csrf_ttl_secs", "must be greater than 0"));
    }
    if config.security.max_body_size == 0 {
        errors.push(ValidationError::new("security.max_body_size", "must be greater than 0"));
    }

    let limits = &config.rate_limit;
    if limits.enabled {
        if limits.windows.is_empty() {
            errors.push(ValidationError::new(
                "rate_limit.windows",
                "at least one window is required",
            ));
        }
        for (i, window) in limits.windows.iter().enumerate() {
            if window.max_requests == 0 || window.window_secs == 0 {
                errors.push(ValidationError::new(
                    format!("rate_limit.windows[{}]", i),
                    "max_requests and window_secs must be greater than 0",
                ));
            }
        }
        if limits.form_max_requests == 0 || limits.form_window_secs == 0 {
            errors.push(ValidationError::new(
                "rate_limit.form_max_requests",
                "form limit and window must be greater than 0",
            ));
        }
    }
    if limits.sweep_interval_secs == 0 {
        errors.push(ValidationError::new(
            "rate_limit.sweep_interval_secs",
            "must be greater than 0",
        ));
    }

    if config.email.to.is_empty() {
        errors.push(ValidationError::new("email.to", "at least one recipient is required"));
    }
    if config.email.provider == EmailProviderKind::Resend && config.email.api_key.is_empty() {
        errors.push(ValidationError::new("email.api_key", "required for the resend provider"));
    }

    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", config.observability.metrics_address),
        ));
    }

    if !config.forms.is_null() && !config.forms.is_object() {
        errors.push(ValidationError::new("forms", "must be a table"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Route paths must be absolute and distinct.
pub fn validate_routes(routes: &RouteSettings) -> Result<(), Vec<ValidationError>> {
    let paths = [
        ("routes.formPath", &routes.form_path),
        ("routes.apiPath", &routes.api_path),
        ("routes.successPath", &routes.success_path),
        ("routes.csrfPath", &routes.csrf_path),
        ("routes.configPath", &routes.config_path),
    ];

    let mut errors = Vec::new();
    let mut seen = BTreeSet::new();
    for (field, path) in paths {
        if !path.starts_with('/') {
            errors.push(ValidationError::new(field, format!("'{}' must start with '/'", path)));
        }
        if path.contains('{') || path.contains('}') {
            errors.push(ValidationError::new(field, "must not contain route parameters"));
        }
        if !seen.insert(path.trim_end_matches('/')) {
            errors.push(ValidationError::new(
                field,
                format!("'{}' is used by another route", path),
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
