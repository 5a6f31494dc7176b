//! Read-through retrieval cache keyed by `(query text, k)`.
//!
//! Entries expire after a fixed TTL and the oldest entries are evicted
//! once capacity is reached, so staleness is bounded by the TTL.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::core::CandidateSet;

/// Default number of cached queries.
pub const DEFAULT_CAPACITY: usize = 256;

type CacheKey = (String, usize);

struct Entry {
    stored_at: Instant,
    candidates: CandidateSet,
}

#[derive(Default)]
struct Inner {
    map: HashMap<CacheKey, Entry>,
    order: VecDeque<CacheKey>,
}

impl Inner {
    fn touch(&mut self, key: &CacheKey) {
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            self.order.remove(pos);
        }
        self.order.push_front(key.clone());
    }
}

/// In-memory TTL cache of candidate sets.
pub struct RetrievalCache {
    ttl: Duration,
    capacity: usize,
    inner: Mutex<Inner>,
}

impl std::fmt::Debug for RetrievalCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetrievalCache")
            .field("ttl", &self.ttl)
            .field("capacity", &self.capacity)
            .finish_non_exhaustive()
    }
}

impl RetrievalCache {
    /// Creates a cache; returns `None` when `ttl` is zero (caching disabled).
    #[must_use]
    pub fn new(ttl: Duration, capacity: usize) -> Option<Self> {
        if ttl.is_zero() || capacity == 0 {
            return None;
        }
        Some(Self {
            ttl,
            capacity,
            inner: Mutex::new(Inner::default()),
        })
    }

    /// Returns a fresh cached candidate set, dropping it if expired.
    #[must_use]
    pub fn get(&self, text: &str, k: usize) -> Option<CandidateSet> {
        let mut inner = self.inner.lock().ok()?;
        let key = (text.to_string(), k);
        let expired = inner.map.get(&key)?.stored_at.elapsed() > self.ttl;
        if expired {
            inner.map.remove(&key);
            if let Some(pos) = inner.order.iter().position(|k| *k == key) {
                inner.order.remove(pos);
            }
            return None;
        }
        inner.touch(&key);
        inner.map.get(&key).map(|e| e.candidates.clone())
    }

    /// Stores a candidate set, evicting the least recently used entries.
    pub fn insert(&self, text: &str, k: usize, candidates: CandidateSet) {
        let Ok(mut inner) = self.inner.lock() else {
            return;
        };
        let key = (text.to_string(), k);
        inner.map.insert(
            key.clone(),
            Entry {
                stored_at: Instant::now(),
                candidates,
            },
        );
        inner.touch(&key);
        while inner.order.len() > self.capacity {
            if let Some(old) = inner.order.pop_back() {
                inner.map.remove(&old);
            }
        }
    }

    /// Number of live entries (expired entries count until next lookup).
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().map_or(0, |inner| inner.map.len())
    }

    /// Returns `true` if the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ScoredHit;

    fn set(n: usize) -> CandidateSet {
        let hits = (0..n)
            .map(|i| ScoredHit {
                score: 1.0,
                text: Some(format!("line {i}")),
                ..ScoredHit::default()
            })
            .collect();
        CandidateSet::from_hits(hits, n)
    }

    #[test]
    fn test_zero_ttl_disables() {
        assert!(RetrievalCache::new(Duration::ZERO, 10).is_none());
        assert!(RetrievalCache::new(Duration::from_secs(1), 0).is_none());
    }

    #[test]
    fn test_hit_and_miss_by_key() {
        let cache =
            RetrievalCache::new(Duration::from_secs(60), 4).unwrap_or_else(|| unreachable!());
        cache.insert("disk", 8, set(2));
        assert_eq!(cache.get("disk", 8).map(|s| s.len()), Some(2));
        assert!(cache.get("disk", 9).is_none());
        assert!(cache.get("network", 8).is_none());
    }

    #[test]
    fn test_expired_entries_are_dropped() {
        let cache =
            RetrievalCache::new(Duration::from_millis(1), 4).unwrap_or_else(|| unreachable!());
        cache.insert("disk", 8, set(1));
        std::thread::sleep(Duration::from_millis(10));
        assert!(cache.get("disk", 8).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let cache =
            RetrievalCache::new(Duration::from_secs(60), 2).unwrap_or_else(|| unreachable!());
        cache.insert("a", 1, set(1));
        cache.insert("b", 1, set(1));
        // Refresh "a" so "b" becomes the eviction candidate.
        assert!(cache.get("a", 1).is_some());
        cache.insert("c", 1, set(1));
        assert_eq!(cache.len(), 2);
        assert!(cache.get("a", 1).is_some());
        assert!(cache.get("b", 1).is_none());
    }
}
