//! In-memory hand-off store for generated artifacts (rendered decision records).
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;

/// Result type for artifact cache operations.
pub type ArtifactResult<T> = Result<T, ArtifactError>;

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("payload of {size} bytes exceeds the {max} byte limit")]
    TooLarge { size: usize, max: usize },
}

#[derive(Debug, Clone, Copy)]
pub struct ArtifactLimits {
    pub ttl: Duration,
    pub capacity: usize,
    pub max_bytes: usize,
}

impl Default for ArtifactLimits {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(10 * 60),
            capacity: 64,
            max_bytes: 5 * 1024 * 1024,
        }
    }
}

#[derive(Debug)]
struct Entry {
    payload: String,
    created_at: Instant,
}

#[derive(Debug, Default)]
struct Inner {
    entries: HashMap<String, Entry>,
    // Insertion order, oldest first. Holds exactly the keys of `entries`.
    order: VecDeque<String>,
}

impl Inner {
    fn sweep(&mut self, now: Instant, ttl: Duration) {
        let before = self.entries.len();
        self.entries
            .retain(|_, e| now.saturating_duration_since(e.created_at) <= ttl);
        if self.entries.len() != before {
            let entries = &self.entries;
            self.order.retain(|k| entries.contains_key(k));
        }
    }

    fn evict_to(&mut self, capacity: usize) {
        while self.entries.len() > capacity {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            self.entries.remove(&oldest);
        }
    }
}

/// Keyed store with TTL, capacity and per-entry size guardrails.
///
/// Expiry is lazy: every `put`/`get` sweeps expired entries first, under the
/// same lock as the operation itself. Cheap to clone; clones share the map.
#[derive(Clone, Debug)]
pub struct ArtifactCache {
    inner: Arc<Mutex<Inner>>,
    limits: ArtifactLimits,
}

impl ArtifactCache {
    pub fn new(limits: ArtifactLimits) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
            limits,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A panic while holding the lock cannot leave the map half-updated in a way
        // that matters here; keep serving.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Store `payload` under `token` (or a generated token when blank) and return the key.
    ///
    /// Oversized payloads are rejected before anything changes. Writing an existing
    /// key replaces it, resets its age and makes it the newest entry.
    pub fn put(&self, token: Option<&str>, payload: String) -> ArtifactResult<String> {
        if payload.len() > self.limits.max_bytes {
            return Err(ArtifactError::TooLarge {
                size: payload.len(),
                max: self.limits.max_bytes,
            });
        }

        let key = match token.map(str::trim).filter(|t| !t.is_empty()) {
            Some(t) => t.to_string(),
            None => generate_token(),
        };

        let now = Instant::now();
        let mut inner = self.lock();
        inner.sweep(now, self.limits.ttl);

        let replaced = inner
            .entries
            .insert(
                key.clone(),
                Entry {
                    payload,
                    created_at: now,
                },
            )
            .is_some();
        if replaced {
            inner.order.retain(|k| k != &key);
        }
        inner.order.push_back(key.clone());
        inner.evict_to(self.limits.capacity);

        Ok(key)
    }

    /// Payload for `token` if present and not expired.
    pub fn get(&self, token: &str) -> Option<String> {
        let now = Instant::now();
        let mut inner = self.lock();
        inner.sweep(now, self.limits.ttl);
        inner.entries.get(token).map(|e| e.payload.clone())
    }

    /// Entries physically held (expired ones may linger until the next call).
    pub fn entry_count(&self) -> usize {
        self.lock().entries.len()
    }
}

/// `dr_<unix millis>_<8 hex chars>`.
pub fn generate_token() -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("dr_{}_{}", chrono::Utc::now().timestamp_millis(), &suffix[..8])
}
