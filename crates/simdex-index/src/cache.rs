//! Query result cache.
//!
//! Results are memoized under a [`Fingerprint`] of the query (content hash
//! plus the result limit and threshold) for a fixed time-to-live, with
//! least-recently-used eviction once capacity is reached. A lookup never
//! returns an expired entry, and a miss is always `None`, never an empty
//! result list.

use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use lru::LruCache;
use simdex_core::SimilarDocument;

/// Cache key for one `find_similar` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    /// Fingerprint of `content` queried with `top_k` and `threshold`.
    pub fn new(content: &str, top_k: usize, threshold: f64) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(content.as_bytes());
        hasher.update(&(top_k as u64).to_le_bytes());
        hasher.update(&threshold.to_bits().to_le_bytes());
        Self(*hasher.finalize().as_bytes())
    }

    /// Hex form, for logs.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }
}

#[derive(Debug)]
struct CacheEntry {
    results: Arc<Vec<SimilarDocument>>,
    /// `None` when the TTL is too large to represent; the entry then only
    /// leaves by eviction or `clear`.
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| at > now)
    }
}

/// TTL + LRU cache of ranked results.
#[derive(Debug)]
pub struct QueryCache {
    entries: Mutex<LruCache<Fingerprint, CacheEntry>>,
    ttl: Duration,
}

impl QueryCache {
    /// Cache holding at most `capacity` queries for `ttl` each.
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            ttl,
        }
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<Fingerprint, CacheEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Cached results for `key`, if present and not expired.
    pub fn get(&self, key: &Fingerprint) -> Option<Arc<Vec<SimilarDocument>>> {
        let mut entries = self.lock();
        let expired = match entries.get(key) {
            Some(entry) if entry.is_live(Instant::now()) => {
                return Some(Arc::clone(&entry.results));
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            entries.pop(key);
        }
        None
    }

    /// Store `results` under `key` for the configured TTL.
    pub fn put(&self, key: Fingerprint, results: Arc<Vec<SimilarDocument>>) {
        let entry = CacheEntry {
            results,
            expires_at: Instant::now().checked_add(self.ttl),
        };
        self.lock().put(key, entry);
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Number of unexpired entries. Expired ones are dropped on the way.
    pub fn len(&self) -> usize {
        let mut entries = self.lock();
        let now = Instant::now();
        let expired: Vec<Fingerprint> = entries
            .iter()
            .filter(|(_, e)| !e.is_live(now))
            .map(|(k, _)| *k)
            .collect();
        for key in &expired {
            entries.pop(key);
        }
        entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}
