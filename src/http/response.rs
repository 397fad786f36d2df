//! Response shaping.
//!
//! # Responsibilities
//! - Render JSON success and failure bodies
//! - Map `FormError` and `RouterOutcome` to status codes
//! - Add `Retry-After` to rate-limit rejections
//!
//! # Design Decisions
//! - Failure bodies only ever carry configured messages
//! - Success after a form post is a 303 so a reload does not resubmit

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::error::FormError;
use crate::forms::{ErrorMessages, FieldErrors, FormData};
use crate::routing::RouterOutcome;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuccessBody {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<Uuid>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureBody {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "FieldErrors::is_empty")]
    pub errors: FieldErrors,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<FormData>,
}

pub fn success_response(message: &str, reference: Option<Uuid>) -> Response {
    Json(SuccessBody {
        success: true,
        message: message.to_string(),
        reference,
    })
    .into_response()
}

/// JSON failure response for `err`.
pub fn error_response(err: &FormError, messages: &ErrorMessages) -> Response {
    let body = match err {
        FormError::Validation(errors) => FailureBody {
            success: false,
            error: None,
            errors: errors.clone(),
            retry_after: None,
            data: None,
        },
        other => FailureBody {
            success: false,
            error: Some(other.user_message(messages)),
            errors: FieldErrors::new(),
            retry_after: other.retry_after(),
            data: None,
        },
    };

    let mut response = (err.status(), Json(body)).into_response();
    if let Some(secs) = err.retry_after() {
        if let Ok(value) = HeaderValue::from_str(&secs.to_string()) {
            response.headers_mut().insert(header::RETRY_AFTER, value);
        }
    }
    response
}

/// Render a terminal router state.
pub fn outcome_response(outcome: RouterOutcome, messages: &ErrorMessages) -> Response {
    match outcome {
        RouterOutcome::Success { location, .. } => Redirect::to(&location).into_response(),
        RouterOutcome::Redirect { location } => Redirect::permanent(&location).into_response(),
        RouterOutcome::Rejected {
            status,
            error,
            errors,
            data,
        } => (
            status,
            Json(FailureBody {
                success: false,
                error,
                errors,
                retry_after: None,
                data: Some(data),
            }),
        )
            .into_response(),
        RouterOutcome::Custom(payload) => (payload.status, Json(payload.body)).into_response(),
        RouterOutcome::NotFound => {
            error_response(&FormError::UnknownCategory(String::new()), messages)
        }
    }
}

/// Fallback for routes that do not exist.
pub async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(FailureBody {
            success: false,
            error: Some("Not found".to_string()),
            errors: FieldErrors::new(),
            retry_after: None,
            data: None,
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use serde_json::Value;

    async fn json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_rate_limited_sets_retry_after() {
        let err = FormError::RateLimited {
            retry_after: 42,
            message: "Too many requests. Please try again in 42 seconds.".into(),
        };
        let response = error_response(&err, &ErrorMessages::default());

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "42");
        let body = json(response).await;
        assert_eq!(body["retryAfter"], 42);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_validation_lists_field_errors() {
        let mut errors = FieldErrors::new();
        errors.insert("name".into(), "Please provide your name".into());
        let response = error_response(&FormError::Validation(errors), &ErrorMessages::default());

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json(response).await;
        assert_eq!(body["errors"]["name"], "Please provide your name");
        assert!(body.get("error").is_none());
    }

    #[tokio::test]
    async fn test_internal_detail_hidden() {
        let response = error_response(
            &FormError::Internal("db password wrong".into()),
            &ErrorMessages::default(),
        );
        let body = json(response).await;
        assert_eq!(body["error"], "An error occurred. Please try again later.");
    }

    #[test]
    fn test_success_outcome_is_see_other() {
        let outcome = RouterOutcome::Success {
            location: "/contact/success?category=general".into(),
            receipt: crate::routing::SubmissionReceipt {
                reference: Uuid::nil(),
                message: "ok".into(),
            },
        };
        let response = outcome_response(outcome, &ErrorMessages::default());

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/contact/success?category=general");
    }

    #[test]
    fn test_redirect_outcome_is_permanent() {
        let response = outcome_response(
            RouterOutcome::Redirect {
                location: "/contact/support".into(),
            },
            &ErrorMessages::default(),
        );
        assert_eq!(response.status(), StatusCode::PERMANENT_REDIRECT);
    }
}
