//! One-time CSRF tokens.
//!
//! Tokens are 32 random bytes, URL-safe base64 encoded, and live for a fixed
//! TTL. A token is removed from the store the moment it is validated, so it
//! can never be replayed.

use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::RngCore;
use serde::Serialize;

use crate::observability::metrics;
use crate::security::store::{now_ms, Expiring, ExpiringStore, MemoryStore};

/// Entropy of a generated token, in bytes.
pub const TOKEN_BYTES: usize = 32;

/// Default token lifetime.
pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

/// An issued token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CsrfToken {
    pub value: String,
    /// Expiry in epoch milliseconds.
    pub expires_at: u64,
}

impl Expiring for CsrfToken {
    fn retain_live(&mut self, now_ms: u64) -> bool {
        self.expires_at > now_ms
    }
}

/// Issues and consumes CSRF tokens.
pub struct CsrfManager {
    store: Arc<dyn ExpiringStore<CsrfToken>>,
    ttl: Duration,
}

impl CsrfManager {
    pub fn new(store: Arc<dyn ExpiringStore<CsrfToken>>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    pub fn in_memory(ttl: Duration) -> Self {
        Self::new(Arc::new(MemoryStore::new()), ttl)
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn issue(&self) -> CsrfToken {
        self.issue_at(now_ms())
    }

    pub fn issue_at(&self, now: u64) -> CsrfToken {
        let token = CsrfToken {
            value: generate_token(),
            expires_at: now + self.ttl.as_millis() as u64,
        };
        self.store.set(&token.value, token.clone());
        token
    }

    /// Validate and consume `token`.
    pub fn validate(&self, token: &str) -> bool {
        self.validate_at(token, now_ms())
    }

    pub fn validate_at(&self, token: &str, now: u64) -> bool {
        if token.is_empty() {
            metrics::record_csrf_rejected("missing");
            return false;
        }

        match self.store.delete(token) {
            Some(stored) if stored.expires_at > now => true,
            Some(_) => {
                tracing::debug!("Rejected expired CSRF token");
                metrics::record_csrf_rejected("expired");
                false
            }
            None => {
                metrics::record_csrf_rejected("unknown");
                false
            }
        }
    }

    pub fn sweep(&self) -> usize {
        self.store.sweep_expired(now_ms())
    }

    pub fn outstanding(&self) -> usize {
        self.store.len()
    }
}

fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
