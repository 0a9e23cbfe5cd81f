//! Request-key idempotency cache with TTL expiry and per-key single-flight.
//!
//! Entries are written only after a mutation completes successfully. Concurrent
//! callers sharing a key serialize on [`IdempotencyCache::lock_key`], so the second
//! caller observes the first caller's cached response instead of re-executing.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use tokio::sync::OwnedMutexGuard;

/// Default lifetime of a cached response.
pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

struct CacheEntry<R> {
    response: R,
    /// `None` when the TTL reaches past what `Instant` can represent.
    expires_at: Option<Instant>,
}

impl<R> CacheEntry<R> {
    fn is_live(&self, now: Instant) -> bool {
        match self.expires_at {
            Some(at) => now < at,
            None => true,
        }
    }
}

/// Maps a caller-supplied request key to a previously computed response.
pub struct IdempotencyCache<R> {
    ttl: Duration,
    entries: Mutex<HashMap<String, CacheEntry<R>>>,
    in_flight: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl<R: Clone> IdempotencyCache<R> {
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Return the live response for `key`. Expired entries are dropped and reported
    /// as a miss.
    pub fn get_cached(&self, key: &str) -> Option<R> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        match entries.get(key) {
            Some(entry) if entry.is_live(Instant::now()) => Some(entry.response.clone()),
            Some(_) => {
                entries.remove(key);
                tracing::debug!(request_id = %key, "idempotency entry expired");
                None
            }
            None => None,
        }
    }

    /// Store `response` under `key`, replacing any previous entry. Expired
    /// entries are swept on every write so keys that are never read again
    /// do not accumulate.
    pub fn set_cached(&self, key: &str, response: R) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let now = Instant::now();
        let before = entries.len();
        entries.retain(|_, entry| entry.is_live(now));
        let swept = before - entries.len();
        if swept > 0 {
            tracing::debug!(swept, "idempotency entries swept");
        }
        entries.insert(
            key.to_string(),
            CacheEntry {
                response,
                expires_at: now.checked_add(self.ttl),
            },
        );
    }

    /// Acquire the single-flight lock for `key`. Hold the guard across the
    /// check-execute-store sequence.
    pub async fn lock_key(&self, key: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
            // Locks nobody else holds a handle to are finished.
            in_flight.retain(|_, lock| Arc::strong_count(lock) > 1);
            Arc::clone(
                in_flight
                    .entry(key.to_string())
                    .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(()))),
            )
        };
        lock.lock_owned().await
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        let now = Instant::now();
        entries.retain(|_, entry| entry.is_live(now));
        before - entries.len()
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let now = Instant::now();
        entries.values().filter(|e| e.is_live(now)).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<R: Clone> Default for IdempotencyCache<R> {
    fn default() -> Self {
        Self::new()
    }
}
