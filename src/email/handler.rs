//! Submission handler that mails each accepted submission.

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::schema::EmailConfig;
use crate::email::render::render_submission;
use crate::email::EmailProvider;
use crate::error::{FormError, FormResult};
use crate::forms::Configuration;
use crate::observability::metrics;
use crate::routing::{Submission, SubmissionHandler, SubmissionReceipt};
use crate::security::RecaptchaVerifier;

pub struct EmailSubmissionHandler {
    config: Arc<Configuration>,
    email: EmailConfig,
    provider: Arc<dyn EmailProvider>,
    recaptcha: Option<Arc<dyn RecaptchaVerifier>>,
}

impl EmailSubmissionHandler {
    pub fn new(
        config: Arc<Configuration>,
        email: EmailConfig,
        provider: Arc<dyn EmailProvider>,
    ) -> Self {
        Self {
            config,
            email,
            provider,
            recaptcha: None,
        }
    }

    /// Verifier used when `recaptcha.enabled` is set.
    pub fn with_recaptcha(mut self, verifier: Arc<dyn RecaptchaVerifier>) -> Self {
        self.recaptcha = Some(verifier);
        self
    }

    async fn verify_recaptcha(&self, submission: &Submission) -> FormResult<()> {
        let settings = &self.config.forms.recaptcha;
        if !settings.enabled {
            return Ok(());
        }

        let verifier = self
            .recaptcha
            .as_ref()
            .ok_or_else(|| {
                FormError::Internal("captcha check enabled but no verifier configured".to_string())
            })?;

        let token = submission.recaptcha_token.as_deref().unwrap_or_default();
        if token.is_empty() {
            return Err(FormError::Recaptcha("missing token".to_string()));
        }

        if verifier.verify(token, settings).await? {
            Ok(())
        } else {
            Err(FormError::Recaptcha("token rejected".to_string()))
        }
    }
}

#[async_trait]
impl SubmissionHandler for EmailSubmissionHandler {
    async fn handle(&self, submission: &Submission) -> FormResult<SubmissionReceipt> {
        self.verify_recaptcha(submission).await?;

        let message = render_submission(&self.config, &self.email, submission);
        let result = self.provider.send_email(&message).await;
        let sent = matches!(&result, Ok(outcome) if outcome.success);
        metrics::record_email(self.provider.name(), sent);

        let outcome = result?;
        if !outcome.success {
            return Err(FormError::Email(outcome.message));
        }

        tracing::info!(
            reference = %submission.reference,
            provider = self.provider.name(),
            id = outcome.id.as_deref().unwrap_or(""),
            "Notification email sent"
        );

        Ok(SubmissionReceipt {
            reference: submission.reference,
            message: self.config.messages().success.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::email::MemoryProvider;
    use crate::forms::{ConfigBuilder, FormData, RecaptchaSettings};
    use serde_json::json;
    use uuid::Uuid;

    struct FixedVerifier(bool);

    #[async_trait]
    impl RecaptchaVerifier for FixedVerifier {
        async fn verify(&self, _token: &str, _settings: &RecaptchaSettings) -> FormResult<bool> {
            Ok(self.0)
        }
    }

    fn submission(token: Option<&str>) -> Submission {
        let data: FormData = serde_json::from_value(json!({
            "name": "Ada",
            "email": "ada@example.com",
            "subject": "Hi",
            "message": "Hello",
            "category": "general"
        }))
        .unwrap();
        Submission {
            reference: Uuid::new_v4(),
            category: "general".into(),
            data,
            files: Vec::new(),
            recaptcha_token: token.map(str::to_string),
        }
    }

    fn config(recaptcha: bool) -> Arc<Configuration> {
        Arc::new(
            ConfigBuilder::new()
                .build(&json!({
                    "recaptcha": {"enabled": recaptcha, "siteKey": "site", "secretKey": "secret"}
                }))
                .unwrap(),
        )
    }

    #[tokio::test]
    async fn test_sends_email_and_returns_success_message() {
        let provider = MemoryProvider::new();
        let handler = EmailSubmissionHandler::new(
            config(false),
            EmailConfig::default(),
            Arc::new(provider.clone()),
        );
        let sub = submission(None);

        let receipt = handler.handle(&sub).await.unwrap();
        assert_eq!(receipt.reference, sub.reference);
        assert_eq!(receipt.message, "Thank you! Your message has been sent successfully.");

        let sent = provider.sent().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].reply_to.as_deref(), Some("ada@example.com"));
    }

    #[tokio::test]
    async fn test_rejected_recaptcha_sends_nothing() {
        let provider = MemoryProvider::new();
        let handler = EmailSubmissionHandler::new(
            config(true),
            EmailConfig::default(),
            Arc::new(provider.clone()),
        )
        .with_recaptcha(Arc::new(FixedVerifier(false)));

        let err = handler.handle(&submission(Some("token"))).await.unwrap_err();
        assert!(matches!(err, FormError::Recaptcha(_)));
        assert!(provider.sent().await.is_empty());
    }

    #[tokio::test]
    async fn test_missing_recaptcha_token_rejected() {
        let provider = MemoryProvider::new();
        let handler = EmailSubmissionHandler::new(
            config(true),
            EmailConfig::default(),
            Arc::new(provider.clone()),
        )
        .with_recaptcha(Arc::new(FixedVerifier(true)));

        let err = handler.handle(&submission(None)).await.unwrap_err();
        assert!(matches!(err, FormError::Recaptcha(_)));
    }

    #[tokio::test]
    async fn test_accepted_recaptcha_sends() {
        let provider = MemoryProvider::new();
        let handler = EmailSubmissionHandler::new(
            config(true),
            EmailConfig::default(),
            Arc::new(provider.clone()),
        )
        .with_recaptcha(Arc::new(FixedVerifier(true)));

        handler.handle(&submission(Some("token"))).await.unwrap();
        assert_eq!(provider.sent().await.len(), 1);
    }
}
