//! Configuration schema definitions.
//!
//! This module defines the server configuration loaded from TOML. The
//! contact-form tables themselves live under `[forms]` and are passed as raw
//! overrides to the forms builder.

use serde::{Deserialize, Serialize};

/// Root configuration for the contact-form service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServerConfig {
    /// Listener configuration (bind address, TLS).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// CSRF and request size settings.
    pub security: SecurityConfig,

    /// Rate limiting configuration.
    pub rate_limit: RateLimitConfig,

    /// Outbound email settings.
    pub email: EmailConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Overrides merged over the built-in form tables.
    pub forms: serde_json::Value,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Optional TLS configuration.
    pub tls: Option<TlsConfig>,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            tls: None,
        }
    }
}

/// TLS configuration for the listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Path to certificate file (PEM).
    pub cert_path: String,

    /// Path to private key file (PEM).
    pub key_path: String,
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Total time allowed for one inbound request, in seconds.
    pub request_secs: u64,

    /// Timeout for calls to the email provider and reCAPTCHA, in seconds.
    pub outbound_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_secs: 30,
            outbound_secs: 10,
        }
    }
}

/// Security configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Lifetime of an issued CSRF token in seconds.
    pub csrf_ttl_secs: u64,

    /// Maximum request body size in bytes.
    pub max_body_size: usize,

    /// Reject JSON API submissions that carry no CSRF token.
    pub require_csrf_for_api: bool,

    /// Take the client address from `X-Forwarded-For` (behind a reverse proxy).
    pub trust_proxy_headers: bool,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            csrf_ttl_secs: 3600,
            max_body_size: 20 * 1024 * 1024, // room for 3 x 5MB attachments
            require_csrf_for_api: false,
            trust_proxy_headers: false,
        }
    }
}

/// One sliding window: at most `max_requests` within `window_secs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct WindowConfig {
    pub max_requests: u32,
    pub window_secs: u64,
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Generic per-IP windows, all enforced together.
    pub windows: Vec<WindowConfig>,

    /// Submissions allowed per form window.
    pub form_max_requests: u32,

    /// Length of the form window in seconds.
    pub form_window_secs: u64,

    /// Also limit by the submitter's email address.
    pub by_email: bool,

    /// Interval between store sweeps in seconds.
    pub sweep_interval_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            windows: vec![
                WindowConfig { max_requests: 5, window_secs: 60 },
                WindowConfig { max_requests: 15, window_secs: 600 },
                WindowConfig { max_requests: 30, window_secs: 3600 },
            ],
            form_max_requests: 3,
            form_window_secs: 3600,
            by_email: true,
            sweep_interval_secs: 3600,
        }
    }
}

/// Which email backend delivers submissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EmailProviderKind {
    /// Write messages to the log (development).
    #[default]
    Log,
    /// Send through the Resend HTTP API.
    Resend,
}

/// Outbound email configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EmailConfig {
    pub provider: EmailProviderKind,

    /// API key for HTTP providers.
    pub api_key: String,

    /// Provider endpoint.
    pub endpoint: String,

    /// Sender address.
    pub from: String,

    /// Recipients of contact submissions.
    pub to: Vec<String>,

    /// Prepended to every subject line.
    pub subject_prefix: String,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            provider: EmailProviderKind::Log,
            api_key: String::new(),
            endpoint: "https://api.resend.com/emails".to_string(),
            from: "Contact Form <noreply@example.com>".to_string(),
            to: vec!["contact@example.com".to_string()],
            subject_prefix: "[Contact]".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit JSON log lines instead of the human-readable format.
    pub json_logs: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
