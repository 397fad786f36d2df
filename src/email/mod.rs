//! Email delivery subsystem.
//!
//! # Data Flow
//! ```text
//! Validated Submission
//!     → handler.rs (reCAPTCHA check, build message)
//!     → render.rs (subject, text body, escaped HTML body)
//!     → providers.rs (EmailProvider: log / memory / Resend)
//! ```
//!
//! # Design Decisions
//! - Providers sit behind an async trait; the router never sees them
//! - Submitted values are always HTML-escaped before they reach a body
//! - The submitter's address goes in reply-to, never in from

pub mod handler;
pub mod providers;
pub mod render;

use async_trait::async_trait;

use crate::error::FormResult;
use crate::routing::UploadedFile;

pub use handler::EmailSubmissionHandler;
pub use providers::{build_provider, LogProvider, MemoryProvider, ResendProvider};

/// A rendered notification email.
#[derive(Debug, Clone)]
pub struct EmailMessage {
    pub from: String,
    pub to: Vec<String>,
    pub reply_to: Option<String>,
    pub subject: String,
    pub text: String,
    pub html: String,
    pub attachments: Vec<UploadedFile>,
}

/// Result reported by a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailOutcome {
    pub success: bool,
    pub message: String,
    /// Provider-side message id, when one is returned.
    pub id: Option<String>,
}

impl EmailOutcome {
    pub fn sent(id: Option<String>) -> Self {
        Self {
            success: true,
            message: "Email sent".to_string(),
            id,
        }
    }
}

/// A transport for notification emails.
#[async_trait]
pub trait EmailProvider: Send + Sync {
    /// Short name used in logs and metrics.
    fn name(&self) -> &'static str;

    async fn send_email(&self, message: &EmailMessage) -> FormResult<EmailOutcome>;
}
