//! Submission body extraction.
//!
//! Accepts `application/json`, `multipart/form-data` and
//! `application/x-www-form-urlencoded` bodies and produces a flat record
//! plus any uploaded files.

use axum::{
    extract::{FromRequest, Multipart, Request},
    http::header,
    Form, Json,
};
use serde_json::Value;

use crate::error::{FormError, FormResult};
use crate::forms::FormData;
use crate::routing::UploadedFile;

/// Raw submission before routing.
#[derive(Debug, Default)]
pub struct RawSubmission {
    pub fields: FormData,
    pub files: Vec<UploadedFile>,
}

impl RawSubmission {
    pub fn text(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
    }
}

/// Read the request body according to its content type.
pub async fn read_submission(request: Request) -> FormResult<RawSubmission> {
    let content_type = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase();

    if content_type.starts_with("multipart/form-data") {
        let multipart = Multipart::from_request(request, &())
            .await
            .map_err(|e| FormError::BadRequest(e.body_text()))?;
        read_multipart(multipart).await
    } else if content_type.starts_with("application/json") {
        let Json(value) = Json::<Value>::from_request(request, &())
            .await
            .map_err(|e| FormError::BadRequest(e.body_text()))?;
        match value {
            Value::Object(fields) => Ok(RawSubmission {
                fields,
                files: Vec::new(),
            }),
            _ => Err(FormError::BadRequest("expected a JSON object".to_string())),
        }
    } else if content_type.starts_with("application/x-www-form-urlencoded") {
        let Form(pairs) = Form::<Vec<(String, String)>>::from_request(request, &())
            .await
            .map_err(|e| FormError::BadRequest(e.body_text()))?;
        let fields = pairs.into_iter().map(|(k, v)| (k, Value::String(v))).collect();
        Ok(RawSubmission {
            fields,
            files: Vec::new(),
        })
    } else {
        Err(FormError::BadRequest(format!("unsupported content type '{}'", content_type)))
    }
}

async fn read_multipart(mut multipart: Multipart) -> FormResult<RawSubmission> {
    let mut submission = RawSubmission::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| FormError::BadRequest(e.body_text()))?
    {
        let name = field.name().unwrap_or_default().trim_end_matches("[]").to_string();
        if name.is_empty() {
            continue;
        }

        match field.file_name().map(str::to_string) {
            Some(file_name) if !file_name.is_empty() => {
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let data = field.bytes().await.map_err(|e| FormError::BadRequest(e.body_text()))?;
                submission.files.push(UploadedFile {
                    field: name,
                    name: file_name,
                    content_type,
                    data,
                });
            }
            // An empty file input still arrives as a part with an empty filename.
            Some(_) => {}
            None => {
                let text = field.text().await.map_err(|e| FormError::BadRequest(e.body_text()))?;
                submission.fields.insert(name, Value::String(text));
            }
        }
    }

    Ok(submission)
}
