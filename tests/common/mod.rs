//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, HeaderMap, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;

use contact_forms::config::ServerConfig;
use contact_forms::email::{EmailSubmissionHandler, MemoryProvider};
use contact_forms::forms::ConfigBuilder;
use contact_forms::http::HttpServer;

/// An in-process service whose emails land in `outbox`.
pub struct TestApp {
    pub server: HttpServer,
    pub router: Router,
    pub outbox: MemoryProvider,
}

/// Defaults with client addresses taken from `X-Forwarded-For`.
pub fn test_config() -> ServerConfig {
    let mut config = ServerConfig::default();
    config.security.trust_proxy_headers = true;
    config
}

pub fn spawn_app(config: ServerConfig) -> TestApp {
    let forms = Arc::new(ConfigBuilder::new().build(&config.forms).unwrap());
    let outbox = MemoryProvider::new();
    let handler = EmailSubmissionHandler::new(
        forms.clone(),
        config.email.clone(),
        Arc::new(outbox.clone()),
    );
    let server = HttpServer::new(config, forms, Arc::new(handler));
    let router = server.router();
    TestApp { server, router, outbox }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

/// Send one request through the router.
pub async fn send(router: &Router, request: Request<Body>) -> TestResponse {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    TestResponse { status, headers, body }
}

pub fn get(path: &str, ip: &str) -> Request<Body> {
    Request::builder()
        .uri(path)
        .header("x-forwarded-for", ip)
        .body(Body::empty())
        .unwrap()
}

pub fn post_json(path: &str, ip: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(path)
        .header("x-forwarded-for", ip)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn post_form(path: &str, ip: &str, pairs: &[(&str, &str)]) -> Request<Body> {
    let encoded = url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish();
    Request::builder()
        .method("POST")
        .uri(path)
        .header("x-forwarded-for", ip)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(encoded))
        .unwrap()
}

/// Multipart body with text fields and one file part.
pub fn post_multipart(
    path: &str,
    ip: &str,
    fields: &[(&str, &str)],
    file: (&str, &str, &str, &[u8]),
) -> Request<Body> {
    const BOUNDARY: &str = "contact-test-boundary";
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                BOUNDARY, name, value
            )
            .as_bytes(),
        );
    }
    let (field, file_name, content_type, data) = file;
    body.extend_from_slice(
        format!(
            "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
            BOUNDARY, field, file_name, content_type
        )
        .as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());

    Request::builder()
        .method("POST")
        .uri(path)
        .header("x-forwarded-for", ip)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

/// Fetch a fresh CSRF token.
pub async fn csrf_token(router: &Router) -> String {
    let response = send(router, get("/api/csrf", "198.51.100.250")).await;
    assert_eq!(response.status, StatusCode::OK);
    response.body["token"].as_str().unwrap().to_string()
}

/// A valid JSON submission for the `general` category.
pub fn general_submission(email: &str) -> Value {
    serde_json::json!({
        "category": "general",
        "name": "Ada Lovelace",
        "email": email,
        "subject": "Engines",
        "message": "About the analytical engine"
    })
}
