//! Email providers.
//!
//! - [`LogProvider`]: writes messages to the log (development)
//! - [`MemoryProvider`]: collects messages in memory (tests)
//! - [`ResendProvider`]: Resend HTTP API

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::config::schema::{EmailConfig, EmailProviderKind};
use crate::email::{EmailMessage, EmailOutcome, EmailProvider};
use crate::error::{FormError, FormResult};

/// Build the provider selected in configuration.
pub fn build_provider(
    config: &EmailConfig,
    timeout: Duration,
) -> FormResult<Arc<dyn EmailProvider>> {
    match config.provider {
        EmailProviderKind::Log => Ok(Arc::new(LogProvider)),
        EmailProviderKind::Resend => Ok(Arc::new(ResendProvider::new(
            config.endpoint.clone(),
            config.api_key.clone(),
            timeout,
        )?)),
    }
}

/// Logs every message instead of sending it.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogProvider;

#[async_trait]
impl EmailProvider for LogProvider {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn send_email(&self, message: &EmailMessage) -> FormResult<EmailOutcome> {
        tracing::info!(
            to = %message.to.join(", "),
            reply_to = message.reply_to.as_deref().unwrap_or(""),
            subject = %message.subject,
            attachments = message.attachments.len(),
            "Email not sent (log provider)\n{}",
            message.text
        );
        Ok(EmailOutcome::sent(None))
    }
}

/// Collects messages in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryProvider {
    outbox: Arc<RwLock<Vec<EmailMessage>>>,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages sent so far.
    pub async fn sent(&self) -> Vec<EmailMessage> {
        self.outbox.read().await.clone()
    }

    pub async fn clear(&self) {
        self.outbox.write().await.clear();
    }
}

#[async_trait]
impl EmailProvider for MemoryProvider {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn send_email(&self, message: &EmailMessage) -> FormResult<EmailOutcome> {
        let mut outbox = self.outbox.write().await;
        outbox.push(message.clone());
        Ok(EmailOutcome::sent(Some(format!("memory-{}", outbox.len()))))
    }
}

/// Sends through the Resend HTTP API.
pub struct ResendProvider {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

#[derive(Serialize)]
struct ResendRequest<'a> {
    from: &'a str,
    to: &'a [String],
    subject: &'a str,
    html: &'a str,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_to: Option<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    attachments: Vec<ResendAttachment<'a>>,
}

#[derive(Serialize)]
struct ResendAttachment<'a> {
    filename: &'a str,
    content: String,
}

#[derive(Deserialize)]
struct ResendResponse {
    id: Option<String>,
}

impl ResendProvider {
    pub fn new(endpoint: String, api_key: String, timeout: Duration) -> FormResult<Self> {
        if api_key.is_empty() {
            return Err(FormError::Internal("Resend provider requires an api_key".to_string()));
        }
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint,
            api_key,
        })
    }
}

#[async_trait]
impl EmailProvider for ResendProvider {
    fn name(&self) -> &'static str {
        "resend"
    }

    async fn send_email(&self, message: &EmailMessage) -> FormResult<EmailOutcome> {
        let body = ResendRequest {
            from: &message.from,
            to: &message.to,
            subject: &message.subject,
            html: &message.html,
            text: &message.text,
            reply_to: message.reply_to.as_deref(),
            attachments: message
                .attachments
                .iter()
                .map(|file| ResendAttachment {
                    filename: &file.name,
                    content: STANDARD.encode(&file.data),
                })
                .collect(),
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(FormError::Email(format!("{}: {}", status, detail)));
        }

        let parsed: ResendResponse = response.json().await?;
        Ok(EmailOutcome::sent(parsed.id))
    }
}
