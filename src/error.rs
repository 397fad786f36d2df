//! Request-path errors and their classification.

use axum::http::StatusCode;
use serde::Serialize;
use thiserror::Error;

use crate::forms::{ErrorMessages, FieldErrors};

/// Coarse classification used for logging and metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    Validation,
    Network,
    RateLimit,
    Recaptcha,
    Server,
    Unknown,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Network => "network",
            ErrorKind::RateLimit => "rate_limit",
            ErrorKind::Recaptcha => "recaptcha",
            ErrorKind::Server => "server",
            ErrorKind::Unknown => "unknown",
        }
    }
}

/// Errors raised while processing a submission.
#[derive(Debug, Error)]
pub enum FormError {
    /// One or more fields failed validation.
    #[error("validation failed for {} field(s)", .0.len())]
    Validation(FieldErrors),

    /// The request body could not be read as a submission.
    #[error("malformed submission: {0}")]
    BadRequest(String),

    /// Missing, unknown, expired or replayed CSRF token.
    #[error("invalid CSRF token")]
    InvalidCsrf,

    /// reCAPTCHA token rejected or score too low.
    #[error("reCAPTCHA verification failed: {0}")]
    Recaptcha(String),

    #[error("rate limit exceeded, retry after {retry_after}s")]
    RateLimited { retry_after: u64, message: String },

    #[error("unknown category '{0}'")]
    UnknownCategory(String),

    /// An outbound call (email provider, verification endpoint) failed.
    #[error("network error: {0}")]
    Network(String),

    /// The email provider rejected the message.
    #[error("email delivery failed: {0}")]
    Email(String),

    #[error("internal error: {0}")]
    Internal(String),

    /// Error raised by application-supplied code.
    #[error("{0}")]
    Other(Box<dyn std::error::Error + Send + Sync>),
}

/// Result type for request-path operations.
pub type FormResult<T> = Result<T, FormError>;

impl FormError {
    /// True for reCAPTCHA rejections, including errors from application
    /// handlers that only say so in their message.
    pub fn is_recaptcha(&self) -> bool {
        match self {
            FormError::Recaptcha(_) => true,
            FormError::Internal(msg) => msg.contains("reCAPTCHA"),
            FormError::Other(e) => e.to_string().contains("reCAPTCHA"),
            _ => false,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            _ if self.is_recaptcha() => ErrorKind::Recaptcha,
            FormError::Validation(_)
            | FormError::BadRequest(_)
            | FormError::UnknownCategory(_)
            | FormError::InvalidCsrf => ErrorKind::Validation,
            FormError::Internal(_) | FormError::Email(_) => ErrorKind::Server,
            FormError::Recaptcha(_) => ErrorKind::Recaptcha,
            FormError::RateLimited { .. } => ErrorKind::RateLimit,
            FormError::Network(_) => ErrorKind::Network,
            FormError::Other(_) => ErrorKind::Unknown,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            _ if self.is_recaptcha() => StatusCode::FORBIDDEN,
            FormError::Validation(_) | FormError::BadRequest(_) => StatusCode::BAD_REQUEST,
            FormError::InvalidCsrf | FormError::Recaptcha(_) => StatusCode::FORBIDDEN,
            FormError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            FormError::UnknownCategory(_) => StatusCode::NOT_FOUND,
            FormError::Network(_)
            | FormError::Email(_)
            | FormError::Internal(_)
            | FormError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message that is safe to show to the submitter. Internal detail is
    /// never included.
    pub fn user_message(&self, messages: &ErrorMessages) -> String {
        match self {
            _ if self.is_recaptcha() => messages.recaptcha.clone(),
            FormError::Validation(errors) => errors
                .values()
                .next()
                .cloned()
                .unwrap_or_else(|| messages.invalid_type.clone()),
            FormError::BadRequest(_) => messages.invalid_type.clone(),
            FormError::InvalidCsrf => messages.csrf.clone(),
            FormError::Recaptcha(_) => messages.recaptcha.clone(),
            FormError::RateLimited { message, .. } => message.clone(),
            FormError::UnknownCategory(_) => messages.not_found.clone(),
            FormError::Network(_)
            | FormError::Email(_)
            | FormError::Internal(_)
            | FormError::Other(_) => messages.server.clone(),
        }
    }

    pub fn retry_after(&self) -> Option<u64> {
        match self {
            FormError::RateLimited { retry_after, .. } => Some(*retry_after),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for FormError {
    fn from(e: reqwest::Error) -> Self {
        FormError::Network(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(FormError::Validation(FieldErrors::new()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(FormError::InvalidCsrf.status(), StatusCode::FORBIDDEN);
        assert_eq!(FormError::Recaptcha("low score".into()).status(), StatusCode::FORBIDDEN);
        assert_eq!(
            FormError::RateLimited { retry_after: 3, message: "slow down".into() }.status(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(FormError::UnknownCategory("x".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(
            FormError::Email("smtp down".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_handler_errors_mentioning_recaptcha_are_classified() {
        let messages = ErrorMessages::default();
        let err = FormError::Other("reCAPTCHA score below threshold".into());
        assert!(err.is_recaptcha());
        assert_eq!(err.kind(), ErrorKind::Recaptcha);
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
        assert_eq!(err.user_message(&messages), messages.recaptcha);

        let internal = FormError::Internal("reCAPTCHA token expired".into());
        assert_eq!(internal.status(), StatusCode::FORBIDDEN);

        let generic = FormError::Other("disk full".into());
        assert!(!generic.is_recaptcha());
        assert_eq!(generic.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(generic.user_message(&messages), messages.server);
    }

    #[test]
    fn test_kind_taxonomy() {
        assert_eq!(FormError::Network("timeout".into()).kind(), ErrorKind::Network);
        assert_eq!(FormError::Recaptcha("x".into()).kind(), ErrorKind::Recaptcha);
        assert_eq!(FormError::Other("boom".into()).kind(), ErrorKind::Unknown);
        assert_eq!(ErrorKind::RateLimit.as_str(), "rate_limit");
    }

    #[test]
    fn test_internal_detail_never_in_user_message() {
        let messages = ErrorMessages::default();
        let err = FormError::Internal("db password is hunter2".into());
        assert_eq!(err.user_message(&messages), "An error occurred. Please try again later.");

        let err = FormError::Other("stack trace".into());
        assert_eq!(err.user_message(&messages), messages.server);
    }

    #[test]
    fn test_csrf_message() {
        let messages = ErrorMessages::default();
        assert_eq!(
            FormError::InvalidCsrf.user_message(&messages),
            "Invalid security token. Please try again."
        );
    }
}
