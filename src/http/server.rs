//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router with all handlers
//! - Wire up middleware (tracing, timeouts, body limit, request ID)
//! - Apply the generic rate limiter to submission routes
//! - Bind to a plain or TLS listener with graceful shutdown

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{DefaultBodyLimit, Path, Query, Request, State},
    middleware::from_fn_with_state,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{limit::RequestBodyLimitLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::schema::{ServerConfig, TlsConfig};
use crate::error::FormError;
use crate::forms::{Configuration, FieldConfig};
use crate::http::extract::read_submission;
use crate::http::request::{
    propagate_request_id_layer, set_request_id_layer, ClientIp, TrustProxyHeaders,
};
use crate::http::response::{error_response, not_found, outcome_response, success_response};
use crate::http::tls::load_tls_config;
use crate::observability::metrics;
use crate::routing::router::CSRF_FIELD;
use crate::routing::{CategoryMatch, CategoryRouter, RouterOutcome, SchemaParser, SubmissionHandler};
use crate::security::rate_limit::{rate_limit_middleware, RateLimitState};
use crate::security::{CsrfManager, RateLimiter};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub forms: Arc<Configuration>,
    pub router: Arc<CategoryRouter>,
    pub csrf: Arc<CsrfManager>,
    pub limiter: Arc<RateLimiter>,
    pub require_csrf_for_api: bool,
}

impl AppState {
    /// State with in-memory stores and schema validation.
    pub fn new(
        config: &ServerConfig,
        forms: Arc<Configuration>,
        handler: Arc<dyn SubmissionHandler>,
    ) -> Self {
        let ttl = Duration::from_secs(config.security.csrf_ttl_secs);
        let csrf = Arc::new(CsrfManager::in_memory(ttl));
        let limiter = Arc::new(RateLimiter::in_memory(&config.rate_limit));
        let router = CategoryRouter::new(forms.clone(), csrf.clone(), handler)
            .with_parser(Arc::new(SchemaParser::new(forms.clone())));

        Self {
            forms,
            router: Arc::new(router),
            csrf,
            limiter,
            require_csrf_for_api: config.security.require_csrf_for_api,
        }
    }
}

/// HTTP server for the contact form endpoints.
pub struct HttpServer {
    router: Router,
    config: ServerConfig,
    state: AppState,
}

impl HttpServer {
    pub fn new(
        config: ServerConfig,
        forms: Arc<Configuration>,
        handler: Arc<dyn SubmissionHandler>,
    ) -> Self {
        let state = AppState::new(&config, forms, handler);
        Self::with_state(config, state)
    }

    /// Server over a caller-assembled state (custom router, parser or stores).
    pub fn with_state(config: ServerConfig, state: AppState) -> Self {
        let router = Self::build_router(&config, state.clone());
        Self { router, config, state }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &ServerConfig, state: AppState) -> Router {
        let routes = state.forms.forms.routes.clone();
        let limits = RateLimitState {
            limiter: state.limiter.clone(),
            messages: Arc::new(state.forms.messages().clone()),
        };
        let form_route = format!("{}/{{category}}", routes.form_path.trim_end_matches('/'));

        let router = Router::new()
            .route("/health", get(health))
            .route(&routes.csrf_path, get(issue_csrf))
            .route(&routes.config_path, get(public_config))
            .route(&routes.success_path, get(success_page))
            .route(
                &routes.api_path,
                post(api_submit)
                    .route_layer(from_fn_with_state(limits.clone(), rate_limit_middleware)),
            )
            .route(
                &form_route,
                get(category_form).merge(
                    post(form_submit)
                        .route_layer(from_fn_with_state(limits, rate_limit_middleware)),
                ),
            )
            .fallback(not_found)
            .with_state(state);

        let router = if config.security.trust_proxy_headers {
            router.layer(Extension(TrustProxyHeaders))
        } else {
            router
        };

        // The body limit wraps the timeout: TimeoutLayer needs a `Default`
        // response body, which the limit's response body is not.
        #[allow(deprecated)]
        let timeout = TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs));

        router.layer(
            ServiceBuilder::new()
                .layer(set_request_id_layer())
                .layer(TraceLayer::new_for_http())
                .layer(propagate_request_id_layer())
                .layer(RequestBodyLimitLayer::new(config.security.max_body_size))
                .layer(timeout)
                .layer(DefaultBodyLimit::disable()),
        )
    }

    /// The assembled router, for in-process testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Serve plain HTTP until `shutdown` resolves.
    pub async fn run<F>(self, listener: TcpListener, shutdown: F) -> Result<(), std::io::Error>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Serve HTTPS on `addr` until `shutdown` resolves, then drain in-flight
    /// requests for up to one request timeout.
    pub async fn run_tls<F>(
        self,
        addr: SocketAddr,
        tls: &TlsConfig,
        shutdown: F,
    ) -> Result<(), std::io::Error>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let rustls = load_tls_config(tls.cert_path.as_ref(), tls.key_path.as_ref()).await?;
        let handle = axum_server::Handle::new();

        let drain = handle.clone();
        let grace = Duration::from_secs(self.config.timeouts.request_secs);
        tokio::spawn(async move {
            shutdown.await;
            drain.graceful_shutdown(Some(grace));
        });

        tracing::info!(address = %addr, "HTTPS server starting");
        axum_server::bind_rustls(addr, rustls)
            .handle(handle)
            .serve(self.router.into_make_service_with_connect_info::<SocketAddr>())
            .await?;

        tracing::info!("HTTPS server stopped");
        Ok(())
    }
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CsrfBody {
    token: String,
    expires_in: u64,
    expires_at: u64,
}

async fn issue_csrf(State(state): State<AppState>) -> impl IntoResponse {
    let token = state.csrf.issue();
    Json(CsrfBody {
        token: token.value,
        expires_in: state.csrf.ttl().as_secs(),
        expires_at: token.expires_at,
    })
}

async fn public_config(State(state): State<AppState>) -> Response {
    Json(state.forms.public_view()).into_response()
}

#[derive(Deserialize)]
struct SuccessQuery {
    category: Option<String>,
}

async fn success_page(
    State(state): State<AppState>,
    Query(query): Query<SuccessQuery>,
) -> impl IntoResponse {
    let category = query
        .category
        .filter(|slug| state.forms.category(slug).is_some());
    Json(json!({
        "success": true,
        "message": state.forms.messages().success,
        "category": category,
    }))
}

#[derive(Serialize)]
struct FieldView<'a> {
    name: &'a str,
    #[serde(flatten)]
    config: &'a FieldConfig,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FormView<'a> {
    slug: &'a str,
    label: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    icon: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    action: String,
    fields: Vec<FieldView<'a>>,
    csrf_token: String,
}

/// GET on a category: the form definition with a fresh CSRF token.
async fn category_form(State(state): State<AppState>, Path(requested): Path<String>) -> Response {
    match state.router.resolve(&requested) {
        CategoryMatch::Found { slug, category } => {
            let fields = state
                .forms
                .category_to_field_map
                .get(slug)
                .into_iter()
                .flatten()
                .filter_map(|name| {
                    state
                        .forms
                        .field(name)
                        .map(|config| FieldView { name: name.as_str(), config })
                })
                .collect();

            Json(FormView {
                slug,
                label: &category.label,
                icon: category.icon.as_deref(),
                description: category.description.as_deref(),
                action: state.router.category_url(slug),
                fields,
                csrf_token: state.csrf.issue().value,
            })
            .into_response()
        }
        CategoryMatch::Redirect { slug } => {
            Redirect::permanent(&state.router.category_url(slug)).into_response()
        }
        CategoryMatch::NotFound => {
            outcome_response(RouterOutcome::NotFound, state.forms.messages())
        }
    }
}

/// POST on a category: the full router state machine.
async fn form_submit(
    State(state): State<AppState>,
    client: ClientIp,
    Path(requested): Path<String>,
    request: Request,
) -> Response {
    let messages = state.forms.messages();

    let slug = match state.router.resolve(&requested) {
        CategoryMatch::Found { slug, .. } => slug.to_string(),
        CategoryMatch::Redirect { slug } => {
            return Redirect::permanent(&state.router.category_url(slug)).into_response()
        }
        CategoryMatch::NotFound => return outcome_response(RouterOutcome::NotFound, messages),
    };

    let raw = match read_submission(request).await {
        Ok(raw) => raw,
        Err(e) => return error_response(&e, messages),
    };

    if let Err(e) = state
        .limiter
        .check_submission(&client.key(), raw.text("email"), &slug)
        .into_result()
    {
        return error_response(&e, messages);
    }

    outcome_response(state.router.submit(&slug, raw.fields, raw.files).await, messages)
}

/// POST to the JSON API: same pipeline, JSON answers.
async fn api_submit(State(state): State<AppState>, client: ClientIp, request: Request) -> Response {
    let messages = state.forms.messages();

    let raw = match read_submission(request).await {
        Ok(raw) => raw,
        Err(e) => return error_response(&e, messages),
    };

    let requested = raw.text("category").unwrap_or_default();
    let slug = match state.router.resolve(requested) {
        CategoryMatch::Found { slug, .. } | CategoryMatch::Redirect { slug } => slug.to_string(),
        CategoryMatch::NotFound => {
            return error_response(&FormError::UnknownCategory(requested.to_string()), messages)
        }
    };

    if let Err(e) = state
        .limiter
        .check_submission(&client.key(), raw.text("email"), &slug)
        .into_result()
    {
        return error_response(&e, messages);
    }

    if state.require_csrf_for_api || raw.fields.contains_key(CSRF_FIELD) {
        if let Err(e) = state.router.check_token(&raw.fields) {
            metrics::record_submission(&slug, "csrf");
            return error_response(&e, messages);
        }
    }

    let submission = match state.router.parse(&slug, &raw.fields, raw.files) {
        Ok(submission) => submission,
        Err(errors) => {
            metrics::record_submission(&slug, "invalid");
            return error_response(&FormError::Validation(errors), messages);
        }
    };

    match state.router.dispatch(&submission).await {
        Ok(receipt) => success_response(&receipt.message, Some(receipt.reference)),
        Err(e) => match state.router.custom_error(&e, &submission) {
            Some(payload) => (payload.status, Json(payload.body)).into_response(),
            None => error_response(&e, messages),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, StatusCode};
    use tower::ServiceExt;

    use crate::email::{EmailSubmissionHandler, MemoryProvider};
    use crate::forms::ConfigBuilder;

    fn server(config: ServerConfig) -> HttpServer {
        let forms = Arc::new(ConfigBuilder::new().build(&config.forms).unwrap());
        let handler = EmailSubmissionHandler::new(
            forms.clone(),
            config.email.clone(),
            Arc::new(MemoryProvider::new()),
        );
        HttpServer::new(config, forms, Arc::new(handler))
    }

    #[tokio::test]
    async fn test_layer_stack_serves_requests() {
        let request = axum::http::Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let response = server(ServerConfig::default()).router().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn test_oversized_body_is_rejected() {
        let mut config = ServerConfig::default();
        config.security.max_body_size = 16;
        let body = "x".repeat(64);
        let request = axum::http::Request::builder()
            .method("POST")
            .uri("/api/contact")
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::CONTENT_LENGTH, body.len())
            .body(Body::from(body))
            .unwrap();

        let response = server(config).router().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
