//! Keyed stores with expiry.
//!
//! # Responsibilities
//! - Hold rate-limit records and CSRF tokens between requests
//! - Provide an atomic per-key read-modify-write (`upsert`)
//! - Drop dead entries on sweep
//!
//! # Design Decisions
//! - Call sites depend on the `ExpiringStore` trait, so a shared external
//!   store can replace `MemoryStore` without touching them
//! - `MemoryStore` is per-process; horizontally scaled deployments each
//!   enforce their own counters

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use dashmap::DashMap;

/// Milliseconds since the Unix epoch.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// A value that can age out of a store.
pub trait Expiring {
    /// Drop expired parts of the value. Returns false when nothing live remains.
    fn retain_live(&mut self, now_ms: u64) -> bool;
}

/// Storage backend for expiring values.
pub trait ExpiringStore<V>: Send + Sync {
    fn get(&self, key: &str) -> Option<V>;

    fn set(&self, key: &str, value: V);

    /// Remove and return the value. Concurrent callers never both receive it.
    fn delete(&self, key: &str) -> Option<V>;

    /// Remove dead entries, returning how many were dropped.
    fn sweep_expired(&self, now_ms: u64) -> usize;

    /// Atomically create-if-missing and mutate the value under `key`.
    fn upsert(&self, key: &str, init: &dyn Fn() -> V, apply: &mut dyn FnMut(&mut V));

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-process store backed by a sharded concurrent map.
#[derive(Debug)]
pub struct MemoryStore<V> {
    inner: Arc<DashMap<String, V>>,
}

impl<V> MemoryStore<V> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
        }
    }
}

impl<V> Default for MemoryStore<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> Clone for MemoryStore<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V> ExpiringStore<V> for MemoryStore<V>
where
    V: Expiring + Clone + Send + Sync,
{
    fn get(&self, key: &str) -> Option<V> {
        self.inner.get(key).map(|r| r.value().clone())
    }

    fn set(&self, key: &str, value: V) {
        self.inner.insert(key.to_string(), value);
    }

    fn delete(&self, key: &str) -> Option<V> {
        self.inner.remove(key).map(|(_, value)| value)
    }

    fn sweep_expired(&self, now_ms: u64) -> usize {
        let mut removed = 0;
        self.inner.retain(|_, value| {
            let live = value.retain_live(now_ms);
            if !live {
                removed += 1;
            }
            live
        });
        removed
    }

    fn upsert(&self, key: &str, init: &dyn Fn() -> V, apply: &mut dyn FnMut(&mut V)) {
        // The entry guard holds the shard lock until `apply` returns.
        let mut entry = self.inner.entry(key.to_string()).or_insert_with(init);
        apply(entry.value_mut());
    }

    fn len(&self) -> usize {
        self.inner.len()
    }
}
