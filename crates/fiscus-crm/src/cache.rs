//! Run-scoped TTL result cache with singleflight fetch collapse.
//!
//! Two properties matter more than raw speed here:
//! - a *negative* result ("this invoice has zero products", "no such
//!   company") is cached exactly like a positive one, so a miss and a
//!   confirmed-empty are distinguishable states;
//! - duplicate in-flight fetches for the same key collapse into one
//!   underlying call, so concurrent workers never duplicate network work.
//!
//! Eviction is TTL-based; an LRU bound acts as a safety valve for
//! long-running processes. The cache is injected into its consumers, never
//! ambient, so tests substitute fakes and runs do not cross-contaminate.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

struct Entry<V> {
    value: V,
    inserted_at: Instant,
    last_used: Instant,
}

/// TTL-keyed memoization store.
pub struct ResultCache<K, V> {
    entries: Mutex<HashMap<K, Entry<V>>>,
    inflight: Mutex<HashMap<K, Arc<Mutex<()>>>>,
    ttl: Duration,
    max_entries: usize,
}

impl<K, V> ResultCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    #[must_use]
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            inflight: Mutex::new(HashMap::new()),
            ttl,
            max_entries,
        }
    }

    /// Look up an unexpired entry, refreshing its recency.
    pub async fn get(&self, key: &K) -> Option<V> {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();
        match entries.get_mut(key) {
            Some(entry) if now.duration_since(entry.inserted_at) < self.ttl => {
                entry.last_used = now;
                Some(entry.value.clone())
            }
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Store a value (an explicitly empty result included), evicting the
    /// least-recently-used entry if the bound is exceeded.
    pub async fn insert(&self, key: K, value: V) {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();
        entries.insert(
            key,
            Entry {
                value,
                inserted_at: now,
                last_used: now,
            },
        );
        while entries.len() > self.max_entries {
            let Some(oldest) = entries
                .iter()
                .min_by_key(|(_, e)| e.last_used)
                .map(|(k, _)| k.clone())
            else {
                break;
            };
            entries.remove(&oldest);
        }
    }

    /// Return the cached value or invoke `fetch`, store its result, and
    /// return it.
    ///
    /// Concurrent callers for the same key collapse onto one fetch: the
    /// winner populates the cache, the rest observe the populated entry
    /// after re-checking. Under sequential use this guarantees at most one
    /// fetch per key within the TTL window.
    ///
    /// # Errors
    ///
    /// Propagates the fetch error; nothing is cached on failure, so the
    /// next caller fetches again.
    pub async fn get_or_fetch<F, Fut, E>(&self, key: K, fetch: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(value) = self.get(&key).await {
            return Ok(value);
        }

        let flight = {
            let mut inflight = self.inflight.lock().await;
            Arc::clone(
                inflight
                    .entry(key.clone())
                    .or_insert_with(|| Arc::new(Mutex::new(()))),
            )
        };
        let _guard = flight.lock().await;

        // A concurrent flight may have populated the entry while this
        // caller queued on the per-key lock.
        if let Some(value) = self.get(&key).await {
            return Ok(value);
        }

        let result = fetch().await;
        if let Ok(value) = &result {
            self.insert(key.clone(), value.clone()).await;
        }
        // A failed flight may have been superseded by a newer one for the
        // same key; only the flight still registered may deregister it.
        let mut inflight = self.inflight.lock().await;
        if inflight.get(&key).is_some_and(|f| Arc::ptr_eq(f, &flight)) {
            inflight.remove(&key);
        }
        result
    }

    /// Entries currently stored (expired ones included until touched).
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}
