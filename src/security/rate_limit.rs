//! Sliding-window rate limiting.
//!
//! # Responsibilities
//! - Count submissions per identifier and scope over trailing windows
//! - Enforce several windows at once (short / medium / long)
//! - Combine IP and email limits for form submissions
//! - Compute `retryAfter` from the oldest timestamp in the violated window
//!
//! # Design Decisions
//! - Append-and-prune happens inside one `upsert`, so concurrent requests
//!   for the same key cannot lose updates
//! - Rejected attempts are not recorded
//! - State is per-process; see `store` for the scaling caveat

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::config::schema::RateLimitConfig;
use crate::error::FormError;
use crate::http::request::ClientIp;
use crate::http::response::error_response;
use crate::forms::ErrorMessages;
use crate::observability::metrics;
use crate::security::store::{now_ms, Expiring, ExpiringStore, MemoryStore};

/// Scope used by the generic request limiter.
pub const REQUEST_SCOPE: &str = "request";

/// At most `max_requests` events within `window`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitRule {
    pub max_requests: u32,
    pub window: Duration,
}

impl RateLimitRule {
    pub const fn new(max_requests: u32, window: Duration) -> Self {
        Self { max_requests, window }
    }

    /// 5 requests per minute.
    pub const fn short() -> Self {
        Self::new(5, Duration::from_secs(60))
    }

    /// 15 requests per 10 minutes.
    pub const fn medium() -> Self {
        Self::new(15, Duration::from_secs(600))
    }

    /// 30 requests per hour.
    pub const fn long() -> Self {
        Self::new(30, Duration::from_secs(3600))
    }

    /// 3 submissions per hour.
    pub const fn form() -> Self {
        Self::new(3, Duration::from_secs(3600))
    }

    fn window_ms(&self) -> u64 {
        self.window.as_millis() as u64
    }
}

/// Timestamps recorded for one identifier and scope.
#[derive(Debug, Clone, Default)]
pub struct RateLimitRecord {
    /// Event times in epoch milliseconds, oldest first.
    pub timestamps: Vec<u64>,
    /// Longest window ever checked against this record.
    retain_ms: u64,
}

impl Expiring for RateLimitRecord {
    fn retain_live(&mut self, now_ms: u64) -> bool {
        let retain_ms = self.retain_ms;
        self.timestamps.retain(|t| now_ms.saturating_sub(*t) < retain_ms);
        !self.timestamps.is_empty()
    }
}

/// Outcome of a rate-limit check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitDecision {
    pub allowed: bool,
    /// Seconds until the violated window frees a slot.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl RateLimitDecision {
    pub fn allow() -> Self {
        Self {
            allowed: true,
            retry_after: None,
            message: None,
        }
    }

    pub fn deny(retry_after: u64) -> Self {
        Self {
            allowed: false,
            retry_after: Some(retry_after),
            message: Some(format!(
                "Too many requests. Please try again in {} seconds.",
                retry_after
            )),
        }
    }

    /// Convert a denial into the request-path error.
    pub fn into_result(self) -> Result<(), FormError> {
        if self.allowed {
            return Ok(());
        }
        Err(FormError::RateLimited {
            retry_after: self.retry_after.unwrap_or(1),
            message: self.message.unwrap_or_default(),
        })
    }
}

/// Sliding-window limiter over an [`ExpiringStore`].
pub struct RateLimiter {
    store: Arc<dyn ExpiringStore<RateLimitRecord>>,
    enabled: bool,
    windows: Vec<RateLimitRule>,
    form_rule: RateLimitRule,
    by_email: bool,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn ExpiringStore<RateLimitRecord>>, config: &RateLimitConfig) -> Self {
        Self {
            store,
            enabled: config.enabled,
            windows: config
                .windows
                .iter()
                .map(|w| RateLimitRule::new(w.max_requests, Duration::from_secs(w.window_secs)))
                .collect(),
            form_rule: RateLimitRule::new(
                config.form_max_requests,
                Duration::from_secs(config.form_window_secs),
            ),
            by_email: config.by_email,
        }
    }

    /// Limiter backed by a process-local [`MemoryStore`].
    pub fn in_memory(config: &RateLimitConfig) -> Self {
        Self::new(Arc::new(MemoryStore::new()), config)
    }

    /// Check and record one event for `identifier` under `form_type`.
    pub fn check(
        &self,
        identifier: &str,
        form_type: &str,
        rule: &RateLimitRule,
    ) -> RateLimitDecision {
        self.check_at(identifier, form_type, std::slice::from_ref(rule), now_ms())
    }

    /// Check every rule against one shared record at time `now`.
    ///
    /// The event is recorded only when all rules pass.
    pub fn check_at(
        &self,
        identifier: &str,
        scope: &str,
        rules: &[RateLimitRule],
        now: u64,
    ) -> RateLimitDecision {
        if !self.enabled || rules.is_empty() {
            return RateLimitDecision::allow();
        }

        let key = format!("{}:{}", scope, identifier);
        let longest = rules.iter().map(RateLimitRule::window_ms).max().unwrap_or(0);
        let mut decision = RateLimitDecision::allow();

        self.store.upsert(&key, &RateLimitRecord::default, &mut |record: &mut RateLimitRecord| {
            record.retain_ms = record.retain_ms.max(longest);
            record.retain_live(now);

            let mut retry_after: Option<u64> = None;
            for rule in rules {
                let window_ms = rule.window_ms();
                let in_window = record
                    .timestamps
                    .iter()
                    .filter(|t| now.saturating_sub(**t) < window_ms);
                let count = in_window.clone().count();
                if count >= rule.max_requests as usize {
                    let oldest = in_window.min().copied().unwrap_or(now);
                    let wait_ms = (oldest + window_ms).saturating_sub(now);
                    let secs = wait_ms.div_ceil(1000).max(1);
                    retry_after = Some(retry_after.map_or(secs, |r| r.max(secs)));
                }
            }

            match retry_after {
                Some(secs) => decision = RateLimitDecision::deny(secs),
                None => record.timestamps.push(now),
            }
        });

        decision
    }

    /// Generic per-client request limit across all configured windows.
    pub fn check_request(&self, identifier: &str) -> RateLimitDecision {
        self.check_at(identifier, REQUEST_SCOPE, &self.windows, now_ms())
    }

    /// Form submission limit: the IP and, when enabled, the email address
    /// must both be under the form window.
    pub fn check_submission(
        &self,
        ip: &str,
        email: Option<&str>,
        form_type: &str,
    ) -> RateLimitDecision {
        self.check_submission_at(ip, email, form_type, now_ms())
    }

    pub fn check_submission_at(
        &self,
        ip: &str,
        email: Option<&str>,
        form_type: &str,
        now: u64,
    ) -> RateLimitDecision {
        let rule = std::slice::from_ref(&self.form_rule);
        let by_ip = self.check_at(ip, &format!("form:{}:ip", form_type), rule, now);
        if !by_ip.allowed {
            metrics::record_rate_limited("ip");
            return by_ip;
        }

        match email.map(str::trim).filter(|e| self.by_email && !e.is_empty()) {
            Some(email) => {
                let by_email = self.check_at(
                    &email.to_lowercase(),
                    &format!("form:{}:email", form_type),
                    rule,
                    now,
                );
                if !by_email.allowed {
                    metrics::record_rate_limited("email");
                }
                by_email
            }
            None => by_ip,
        }
    }

    /// Drop records with no timestamps inside their longest window.
    pub fn sweep(&self) -> usize {
        self.store.sweep_expired(now_ms())
    }

    pub fn tracked(&self) -> usize {
        self.store.len()
    }
}

/// Shared state for [`rate_limit_middleware`].
#[derive(Clone)]
pub struct RateLimitState {
    pub limiter: Arc<RateLimiter>,
    pub messages: Arc<ErrorMessages>,
}

/// Middleware enforcing the generic per-IP windows.
pub async fn rate_limit_middleware(
    State(state): State<RateLimitState>,
    ClientIp(ip): ClientIp,
    request: Request<Body>,
    next: Next,
) -> Response {
    let key = ip.map(|addr: IpAddr| addr.to_string()).unwrap_or_else(|| "unknown".to_string());
    let decision = state.limiter.check_request(&key);

    match decision.into_result() {
        Ok(()) => next.run(request).await,
        Err(err) => {
            tracing::warn!(client = %key, "Rate limit exceeded");
            metrics::record_rate_limited("request");
            error_response(&err, &state.messages).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::WindowConfig;

    fn limiter() -> RateLimiter {
        RateLimiter::in_memory(&RateLimitConfig::default())
    }

    #[test]
    fn test_limit_exceeded_then_recovers() {
        let limiter = limiter();
        let rule = RateLimitRule::new(3, Duration::from_secs(10));
        let start = 1_000_000;

        for i in 0..3 {
            assert!(limiter.check_at("1.2.3.4", "contact", &[rule], start + i).allowed);
        }

        let denied = limiter.check_at("1.2.3.4", "contact", &[rule], start + 3);
        assert!(!denied.allowed);
        assert!(denied.retry_after.unwrap() > 0);
        assert!(denied.message.is_some());

        assert!(limiter.check_at("1.2.3.4", "contact", &[rule], start + 10_001).allowed);
    }

    #[test]
    fn test_retry_after_uses_oldest_in_window() {
        let limiter = limiter();
        let rule = RateLimitRule::new(2, Duration::from_secs(60));

        assert!(limiter.check_at("a", "s", &[rule], 0).allowed);
        assert!(limiter.check_at("a", "s", &[rule], 20_000).allowed);

        let denied = limiter.check_at("a", "s", &[rule], 30_500);
        // Oldest event (t=0) leaves the window at t=60s: 29.5s away, rounded up.
        assert_eq!(denied.retry_after, Some(30));
    }

    #[test]
    fn test_rejected_attempts_are_not_recorded() {
        let limiter = limiter();
        let rule = RateLimitRule::new(1, Duration::from_secs(10));

        assert!(limiter.check_at("a", "s", &[rule], 0).allowed);
        for t in 1..5 {
            assert!(!limiter.check_at("a", "s", &[rule], t * 1000).allowed);
        }
        assert!(limiter.check_at("a", "s", &[rule], 10_000).allowed);
    }

    #[test]
    fn test_identifiers_and_scopes_are_independent() {
        let limiter = limiter();
        let rule = RateLimitRule::new(1, Duration::from_secs(10));

        assert!(limiter.check_at("a", "contact", &[rule], 0).allowed);
        assert!(limiter.check_at("b", "contact", &[rule], 0).allowed);
        assert!(limiter.check_at("a", "newsletter", &[rule], 0).allowed);
        assert!(!limiter.check_at("a", "contact", &[rule], 1).allowed);
    }

    #[test]
    fn test_all_windows_enforced_together() {
        let limiter = limiter();
        let rules = [
            RateLimitRule::new(2, Duration::from_secs(1)),
            RateLimitRule::new(3, Duration::from_secs(100)),
        ];

        assert!(limiter.check_at("a", "s", &rules, 0).allowed);
        assert!(limiter.check_at("a", "s", &rules, 10).allowed);
        // Short window full.
        assert!(!limiter.check_at("a", "s", &rules, 20).allowed);
        // Short window clear, long window has room for one more.
        assert!(limiter.check_at("a", "s", &rules, 2_000).allowed);
        // Long window now full.
        let denied = limiter.check_at("a", "s", &rules, 4_000);
        assert!(!denied.allowed);
        assert_eq!(denied.retry_after, Some(96));
    }

    #[test]
    fn test_submission_requires_ip_and_email() {
        let limiter = limiter();

        for i in 0..3 {
            assert!(limiter.check_submission_at("10.0.0.1", Some("a@b.com"), "general", i).allowed);
        }
        // Same email from a new IP is still blocked.
        assert!(!limiter.check_submission_at("10.0.0.2", Some("A@B.com "), "general", 10).allowed);
        // Same IP with a new email is blocked by the IP limit.
        assert!(!limiter.check_submission_at("10.0.0.1", Some("c@d.com"), "general", 10).allowed);
        // Fresh IP and fresh email pass.
        assert!(limiter.check_submission_at("10.0.0.3", Some("e@f.com"), "general", 10).allowed);
    }

    #[test]
    fn test_disabled_limiter_allows_everything() {
        let config = RateLimitConfig {
            enabled: false,
            ..RateLimitConfig::default()
        };
        let limiter = RateLimiter::in_memory(&config);
        for _ in 0..100 {
            let rule = RateLimitRule::new(1, Duration::from_secs(60));
            assert!(limiter.check("a", "s", &rule).allowed);
        }
    }

    #[test]
    fn test_generic_windows_from_config() {
        let config = RateLimitConfig {
            windows: vec![WindowConfig { max_requests: 2, window_secs: 60 }],
            ..RateLimitConfig::default()
        };
        let limiter = RateLimiter::in_memory(&config);
        assert!(limiter.check_request("ip").allowed);
        assert!(limiter.check_request("ip").allowed);
        assert!(!limiter.check_request("ip").allowed);
    }

    #[test]
    fn test_sweep_drops_stale_records() {
        let limiter = limiter();
        let rule = RateLimitRule::new(5, Duration::from_secs(1));
        limiter.check_at("old", "s", &[rule], 0);
        assert_eq!(limiter.tracked(), 1);
        assert_eq!(limiter.sweep(), 1);
        assert_eq!(limiter.tracked(), 0);
    }

    #[test]
    fn test_denial_converts_to_error() {
        let err = RateLimitDecision::deny(12).into_result().unwrap_err();
        assert_eq!(err.retry_after(), Some(12));
        assert!(RateLimitDecision::allow().into_result().is_ok());
    }
}
