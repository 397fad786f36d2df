//! Metrics collection and exposition.
//!
//! # Metrics
//! - `contact_submissions_total` (counter): submissions by category and outcome
//! - `contact_rate_limited_total` (counter): rejections by limiter scope
//! - `contact_csrf_rejected_total` (counter): CSRF failures by reason
//! - `contact_emails_total` (counter): email deliveries by provider and outcome
//!
//! Recording is a no-op until a recorder is installed with [`init_metrics`].

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_submission(category: &str, outcome: &'static str) {
    metrics::counter!(
        "contact_submissions_total",
        "category" => category.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_rate_limited(scope: &'static str) {
    metrics::counter!("contact_rate_limited_total", "scope" => scope).increment(1);
}

pub fn record_csrf_rejected(reason: &'static str) {
    metrics::counter!("contact_csrf_rejected_total", "reason" => reason).increment(1);
}

pub fn record_email(provider: &'static str, success: bool) {
    let outcome = if success { "sent" } else { "failed" };
    metrics::counter!("contact_emails_total", "provider" => provider, "outcome" => outcome)
        .increment(1);
}
