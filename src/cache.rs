//! LRU Cache (`spec.md` §4.7).
//!
//! An insertion-ordered mapping from `method:path` to a prior match outcome,
//! capped at `maxSize`, promoting on read and evicting the least-recently
//! touched entry when full. Grounded on the teacher's own use of the `lru`
//! crate for JWT claims caching (`src/security.rs`, `use lru::LruCache`) --
//! same crate, same semantics, applied to match results instead of claims.

use std::num::NonZeroUsize;

use http::Method;
use lru::LruCache;

use crate::method::MethodMask;
use crate::router::ParamVec;

/// A cached match outcome. `Miss` is a legal, distinct value from "absent
/// from the cache" -- it is negative caching, per `spec.md` §3. Method
/// mismatch is cached separately from a true miss so a repeated request with
/// the wrong method keeps reporting 405 instead of degrading to 404.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheValue {
    Miss,
    MethodNotAllowed { allowed: MethodMask },
    Hit { handler_index: u32, params: ParamVec },
}

/// Not thread-safe (`spec.md` §5) -- the router is single-reader at match
/// time; a multi-threaded embedding must shard or externally synchronize.
pub struct MatchCache {
    inner: LruCache<String, CacheValue>,
}

impl MatchCache {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: LruCache::new(capacity),
        }
    }

    /// Looks up `key`, promoting it to most-recently-used on a hit.
    pub fn get(&mut self, key: &str) -> Option<CacheValue> {
        self.inner.get(key).cloned()
    }

    /// Inserts or overwrites `key`, evicting the least-recently-used entry
    /// if the cache is at capacity.
    pub fn put(&mut self, key: String, value: CacheValue) {
        self.inner.put(key, value);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn clear(&mut self) {
        self.inner.clear();
    }
}

/// Builds the cache key as `method:path`, matching `spec.md` §3's
/// `key = method + ":" + path`.
#[must_use]
pub fn cache_key(method: &Method, path: &str) -> String {
    let mut key = String::with_capacity(method.as_str().len() + 1 + path.len());
    key.push_str(method.as_str());
    key.push(':');
    key.push_str(path);
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_cache_is_a_distinct_stored_value() {
        let mut cache = MatchCache::new(4);
        cache.put("GET:/missing".into(), CacheValue::Miss);
        assert_eq!(cache.get("GET:/missing"), Some(CacheValue::Miss));
    }

    #[test]
    fn evicts_least_recently_used_when_over_capacity() {
        let mut cache = MatchCache::new(2);
        cache.put("a".into(), CacheValue::Miss);
        cache.put("b".into(), CacheValue::Miss);
        // touch "a" so "b" becomes least-recently-used
        let _ = cache.get("a");
        cache.put("c".into(), CacheValue::Miss);
        assert!(cache.get("b").is_none());
        assert!(cache.get("a").is_some());
        assert!(cache.get("c").is_some());
    }

    #[test]
    fn cache_key_joins_method_and_path() {
        assert_eq!(cache_key(&Method::GET, "/a/b"), "GET:/a/b");
    }
}
