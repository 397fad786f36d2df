//! Contracts the embedding application plugs into the router.

use async_trait::async_trait;
use axum::body::Bytes;
use axum::http::StatusCode;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::{FormError, FormResult};
use crate::forms::FormData;

/// A file received in a multipart submission.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Form field the file was posted under.
    pub field: String,
    pub name: String,
    pub content_type: String,
    pub data: Bytes,
}

impl UploadedFile {
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    /// The `{file, name, type, size}` entry validated by the attachment schema.
    pub fn descriptor(&self) -> Value {
        json!({
            "file": self.name,
            "name": self.name,
            "type": self.content_type,
            "size": self.size(),
        })
    }
}

/// A validated submission handed to a [`SubmissionHandler`].
#[derive(Debug, Clone)]
pub struct Submission {
    /// Reference used in logs and in the outgoing email.
    pub reference: Uuid,
    pub category: String,
    /// Validated values plus `category`.
    pub data: FormData,
    pub files: Vec<UploadedFile>,
    pub recaptcha_token: Option<String>,
}

impl Submission {
    pub fn text(&self, field: &str) -> Option<&str> {
        self.data.get(field).and_then(Value::as_str).filter(|s| !s.is_empty())
    }
}

/// Returned by a handler that accepted the submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionReceipt {
    pub reference: Uuid,
    pub message: String,
}

/// Performs the side effect of a submission (send email, persist, ...).
///
/// Return [`FormError::Recaptcha`] for verification failures so the router
/// can answer with the dedicated message.
#[async_trait]
pub trait SubmissionHandler: Send + Sync {
    async fn handle(&self, submission: &Submission) -> FormResult<SubmissionReceipt>;
}

/// A custom error response.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorPayload {
    pub status: StatusCode,
    pub body: Value,
}

/// Gets the first chance to answer a failed submission.
pub trait ErrorHandler: Send + Sync {
    /// Return `None` to fall back to the default error mapping.
    fn handle(&self, error: &FormError, submission: &Submission) -> Option<ErrorPayload>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_shape() {
        let file = UploadedFile {
            field: "attachments".into(),
            name: "shot.png".into(),
            content_type: "image/png".into(),
            data: Bytes::from_static(b"12345"),
        };
        let descriptor = file.descriptor();
        assert_eq!(descriptor["file"], "shot.png");
        assert_eq!(descriptor["type"], "image/png");
        assert_eq!(descriptor["size"], 5);
    }
}
