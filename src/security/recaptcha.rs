//! reCAPTCHA v3 verification.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::FormResult;
use crate::forms::RecaptchaSettings;

/// Verifies a client-side reCAPTCHA token.
#[async_trait]
pub trait RecaptchaVerifier: Send + Sync {
    /// Returns `Ok(false)` for a rejected token; `Err` only when the
    /// verification endpoint could not be reached.
    async fn verify(&self, token: &str, settings: &RecaptchaSettings) -> FormResult<bool>;
}

#[derive(Debug, Deserialize)]
struct SiteVerifyResponse {
    success: bool,
    #[serde(default)]
    score: Option<f64>,
    #[serde(default)]
    action: Option<String>,
    #[serde(default, rename = "error-codes")]
    error_codes: Vec<String>,
}

impl SiteVerifyResponse {
    fn passes(&self, settings: &RecaptchaSettings) -> bool {
        if !self.success {
            return false;
        }
        if let Some(score) = self.score {
            if score < settings.min_score {
                return false;
            }
        }
        match &self.action {
            Some(action) if !settings.action.is_empty() => action == &settings.action,
            _ => true,
        }
    }
}

/// Verifier calling Google's `siteverify` endpoint.
#[derive(Clone)]
pub struct GoogleRecaptcha {
    client: reqwest::Client,
}

impl GoogleRecaptcha {
    pub fn new(timeout: Duration) -> FormResult<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl RecaptchaVerifier for GoogleRecaptcha {
    async fn verify(&self, token: &str, settings: &RecaptchaSettings) -> FormResult<bool> {
        if token.trim().is_empty() {
            return Ok(false);
        }

        let response: SiteVerifyResponse = self
            .client
            .post(&settings.verify_url)
            .form(&[("secret", settings.secret_key.as_str()), ("response", token)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let passed = response.passes(settings);
        if !passed {
            tracing::info!(
                score = ?response.score,
                action = ?response.action,
                errors = ?response.error_codes,
                "reCAPTCHA verification rejected"
            );
        }
        Ok(passed)
    }
}
