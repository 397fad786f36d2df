//! Category router: the submission state machine.
//!
//! # Data Flow
//! ```text
//! POST /contact/{category}
//!     → resolve slug (NotFound / Redirect / Found)
//!     → TOKEN_CHECK (one-time CSRF token)
//!     → PARSE (strip control fields, attach file descriptors)
//!     → VALIDATE (FormDataParser)
//!     → SUBMIT (SubmissionHandler)
//!     → REDIRECT_SUCCESS | RETURN_ERRORS
//! ```
//!
//! # Design Decisions
//! - Validation failures never reach the submission handler
//! - A CSRF failure echoes the submitted data unchanged
//! - Handler failures are logged with context; the client only ever sees
//!   configured messages unless a custom `ErrorHandler` answers first

use std::fmt;
use std::sync::Arc;

use axum::http::StatusCode;
use serde_json::Value;
use uuid::Uuid;

use crate::error::FormError;
use crate::forms::{Configuration, FieldErrors, FormData, ATTACHMENTS_FIELD};
use crate::observability::metrics;
use crate::routing::handler::{
    ErrorHandler, ErrorPayload, Submission, SubmissionHandler, SubmissionReceipt, UploadedFile,
};
use crate::routing::matcher::{self, CategoryMatch};
use crate::routing::parser::{FormDataParser, RequiredFieldsParser};
use crate::security::CsrfManager;

/// Form key carrying the CSRF token.
pub const CSRF_FIELD: &str = "csrf";

/// Form key carrying the reCAPTCHA token.
pub const RECAPTCHA_FIELD: &str = "recaptchaToken";

const CONTROL_FIELDS: [&str; 3] = [CSRF_FIELD, RECAPTCHA_FIELD, "category"];

/// States a submission moves through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionStage {
    TokenCheck,
    Parse,
    Validate,
    Submit,
}

impl fmt::Display for SubmissionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SubmissionStage::TokenCheck => "token_check",
            SubmissionStage::Parse => "parse",
            SubmissionStage::Validate => "validate",
            SubmissionStage::Submit => "submit",
        };
        f.write_str(name)
    }
}

/// Terminal state of a routed submission.
#[derive(Debug, Clone)]
pub enum RouterOutcome {
    /// REDIRECT_SUCCESS: see-other to the success page.
    Success {
        location: String,
        receipt: SubmissionReceipt,
    },
    /// Permanent redirect to the canonical category URL.
    Redirect { location: String },
    /// RETURN_ERRORS: re-render with the submitted data.
    Rejected {
        status: StatusCode,
        error: Option<String>,
        errors: FieldErrors,
        data: FormData,
    },
    /// Answer produced by a custom `ErrorHandler`.
    Custom(ErrorPayload),
    NotFound,
}

pub struct CategoryRouter {
    config: Arc<Configuration>,
    csrf: Arc<CsrfManager>,
    parser: Arc<dyn FormDataParser>,
    handler: Arc<dyn SubmissionHandler>,
    error_handler: Option<Arc<dyn ErrorHandler>>,
}

impl CategoryRouter {
    /// Router with the required-fields parser and default error mapping.
    pub fn new(
        config: Arc<Configuration>,
        csrf: Arc<CsrfManager>,
        handler: Arc<dyn SubmissionHandler>,
    ) -> Self {
        let parser = Arc::new(RequiredFieldsParser::new(config.clone()));
        Self {
            config,
            csrf,
            parser,
            handler,
            error_handler: None,
        }
    }

    pub fn with_parser(mut self, parser: Arc<dyn FormDataParser>) -> Self {
        self.parser = parser;
        self
    }

    pub fn with_error_handler(mut self, error_handler: Arc<dyn ErrorHandler>) -> Self {
        self.error_handler = Some(error_handler);
        self
    }

    pub fn config(&self) -> &Arc<Configuration> {
        &self.config
    }

    pub fn resolve(&self, requested: &str) -> CategoryMatch<'_> {
        matcher::resolve(&self.config.forms.categories, requested)
    }

    /// Public URL of a category form.
    pub fn category_url(&self, slug: &str) -> String {
        format!("{}/{}", self.config.forms.routes.form_path.trim_end_matches('/'), slug)
    }

    pub fn success_location(&self, slug: &str) -> String {
        let category: String = url::form_urlencoded::byte_serialize(slug.as_bytes()).collect();
        format!("{}?category={}", self.config.forms.routes.success_path, category)
    }

    /// Run the full state machine for a form post.
    pub async fn submit(
        &self,
        requested: &str,
        raw: FormData,
        files: Vec<UploadedFile>,
    ) -> RouterOutcome {
        let slug = match self.resolve(requested) {
            CategoryMatch::Found { slug, .. } => slug.to_string(),
            CategoryMatch::Redirect { slug } => {
                return RouterOutcome::Redirect {
                    location: self.category_url(slug),
                }
            }
            CategoryMatch::NotFound => return RouterOutcome::NotFound,
        };

        tracing::debug!(
            category = %slug,
            stage = %SubmissionStage::TokenCheck,
            "Submission transition"
        );
        if self.check_token(&raw).is_err() {
            metrics::record_submission(&slug, "csrf");
            return RouterOutcome::Rejected {
                status: StatusCode::FORBIDDEN,
                error: Some(self.config.messages().csrf.clone()),
                errors: FieldErrors::new(),
                data: raw,
            };
        }

        let submission = match self.parse(&slug, &raw, files) {
            Ok(submission) => submission,
            Err(errors) => {
                metrics::record_submission(&slug, "invalid");
                return RouterOutcome::Rejected {
                    status: StatusCode::BAD_REQUEST,
                    error: None,
                    errors,
                    data: strip_control_fields(&raw),
                };
            }
        };

        match self.dispatch(&submission).await {
            Ok(receipt) => RouterOutcome::Success {
                location: self.success_location(&slug),
                receipt,
            },
            Err(err) => self.failure(&err, &submission),
        }
    }

    /// TOKEN_CHECK: consume the one-time token carried in `raw`.
    pub fn check_token(&self, raw: &FormData) -> Result<(), FormError> {
        let token = raw.get(CSRF_FIELD).and_then(Value::as_str).unwrap_or_default();
        if self.csrf.validate(token) {
            Ok(())
        } else {
            Err(FormError::InvalidCsrf)
        }
    }

    /// PARSE and VALIDATE: build a [`Submission`] or per-field errors.
    ///
    /// `slug` must be a canonical category key.
    pub fn parse(
        &self,
        slug: &str,
        raw: &FormData,
        files: Vec<UploadedFile>,
    ) -> Result<Submission, FieldErrors> {
        tracing::debug!(category = %slug, stage = %SubmissionStage::Parse, "Submission transition");
        let recaptcha_token = raw
            .get(RECAPTCHA_FIELD)
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .map(str::to_string);

        let mut input = strip_control_fields(raw);
        attach_file_descriptors(&mut input, &files);

        tracing::debug!(
            category = %slug,
            stage = %SubmissionStage::Validate,
            "Submission transition"
        );
        let mut data = self.parser.parse(slug, &input)?;
        data.insert("category".to_string(), Value::String(slug.to_string()));

        Ok(Submission {
            reference: Uuid::new_v4(),
            category: slug.to_string(),
            data,
            files,
            recaptcha_token,
        })
    }

    /// SUBMIT: hand a validated submission to the handler.
    pub async fn dispatch(&self, submission: &Submission) -> Result<SubmissionReceipt, FormError> {
        tracing::debug!(
            category = %submission.category,
            reference = %submission.reference,
            stage = %SubmissionStage::Submit,
            "Submission transition"
        );

        match self.handler.handle(submission).await {
            Ok(receipt) => {
                tracing::info!(
                    category = %submission.category,
                    reference = %receipt.reference,
                    "Submission accepted"
                );
                metrics::record_submission(&submission.category, "success");
                Ok(receipt)
            }
            Err(err) => {
                tracing::error!(
                    category = %submission.category,
                    reference = %submission.reference,
                    kind = err.kind().as_str(),
                    error = %err,
                    "Submission handler failed"
                );
                metrics::record_submission(&submission.category, "failed");
                Err(err)
            }
        }
    }

    /// Give the custom error handler first refusal on a failure.
    pub fn custom_error(&self, err: &FormError, submission: &Submission) -> Option<ErrorPayload> {
        self.error_handler.as_ref().and_then(|h| h.handle(err, submission))
    }

    fn failure(&self, err: &FormError, submission: &Submission) -> RouterOutcome {
        if let Some(payload) = self.custom_error(err, submission) {
            return RouterOutcome::Custom(payload);
        }

        RouterOutcome::Rejected {
            status: err.status(),
            error: Some(err.user_message(self.config.messages())),
            errors: FieldErrors::new(),
            data: submission.data.clone(),
        }
    }
}

fn strip_control_fields(raw: &FormData) -> FormData {
    raw.iter()
        .filter(|(key, _)| !CONTROL_FIELDS.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

/// Uploaded files replace any client-supplied descriptor for their field.
fn attach_file_descriptors(data: &mut FormData, files: &[UploadedFile]) {
    for file in files {
        let field = if file.field.is_empty() { ATTACHMENTS_FIELD } else { file.field.as_str() };
        data.remove(field);
    }
    for file in files {
        let field = if file.field.is_empty() { ATTACHMENTS_FIELD } else { file.field.as_str() };
        match data
            .entry(field.to_string())
            .or_insert_with(|| Value::Array(Vec::new()))
        {
            Value::Array(items) => items.push(file.descriptor()),
            other => *other = Value::Array(vec![file.descriptor()]),
        }
    }
}
