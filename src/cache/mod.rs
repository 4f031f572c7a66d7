//! LRU cache with per-entry randomized TTL.
//!
//! Entry lifetimes are sampled uniformly from `[ttl * min_mult,
//! ttl * max_mult]` so that entries inserted together do not all expire
//! together. Capacity overflow evicts the least-recently-used live entry;
//! expired entries are dropped lazily on touch and eagerly by `expire()`.

pub mod coordinator;

use lru::LruCache;
use rand::Rng;
use std::hash::Hash;
use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

/// Default jitter window multipliers.
pub const DEFAULT_MIN_MULT: f64 = 1.0;
pub const DEFAULT_MAX_MULT: f64 = 2.0;

#[derive(Debug)]
struct TtlEntry<V> {
    value: V,
    expires_at: Instant,
}

#[derive(Debug)]
pub struct RandomTtlCache<K: Hash + Eq, V> {
    entries: LruCache<K, TtlEntry<V>>,
    ttl: Duration,
    min_mult: f64,
    max_mult: f64,
}

impl<K: Hash + Eq + Clone, V> RandomTtlCache<K, V> {
    /// Panics if `maxsize` is zero or `min_mult > max_mult`; both are
    /// construction-time configuration errors.
    pub fn new(maxsize: usize, ttl: Duration, min_mult: f64, max_mult: f64) -> Self {
        assert!(min_mult <= max_mult, "min_mult must not exceed max_mult");
        let cap = NonZeroUsize::new(maxsize).expect("cache capacity must be non-zero");
        Self {
            entries: LruCache::new(cap),
            ttl,
            min_mult,
            max_mult,
        }
    }

    pub fn with_default_jitter(maxsize: usize, ttl: Duration) -> Self {
        Self::new(maxsize, ttl, DEFAULT_MIN_MULT, DEFAULT_MAX_MULT)
    }

    /// Fresh entries move to the MRU end; expired entries are pruned and
    /// reported as absent.
    pub fn get(&mut self, key: &K) -> Option<&V> {
        let expired = match self.entries.get(key) {
            Some(entry) => entry.expires_at <= Instant::now(),
            None => return None,
        };
        if expired {
            self.entries.pop(key);
            return None;
        }
        self.entries.get(key).map(|e| &e.value)
    }

    /// Insert or replace; replacement resets the (re-sampled) expiry.
    /// Overflow evicts the least-recently-used entry.
    pub fn put(&mut self, key: K, value: V) {
        let expires_at = Instant::now() + self.sample_ttl();
        self.entries.put(key, TtlEntry { value, expires_at });
    }

    /// Insert with an explicit TTL base instead of the configured one;
    /// the jitter window still applies.
    pub fn put_with_ttl(&mut self, key: K, value: V, ttl: Duration) {
        let expires_at = Instant::now() + sample_jittered(ttl, self.min_mult, self.max_mult);
        self.entries.put(key, TtlEntry { value, expires_at });
    }

    /// Eagerly drop every entry whose expiry has passed.
    pub fn expire(&mut self) -> usize {
        let now = Instant::now();
        let dead: Vec<K> = self
            .entries
            .iter()
            .filter(|(_, e)| e.expires_at <= now)
            .map(|(k, _)| k.clone())
            .collect();
        for key in &dead {
            self.entries.pop(key);
        }
        dead.len()
    }

    /// Remaining lifetime of a live entry; `None` for absent or expired
    /// keys. Does not touch LRU order.
    pub fn time_to_live(&self, key: &K) -> Option<Duration> {
        self.entries
            .peek(key)
            .and_then(|e| e.expires_at.checked_duration_since(Instant::now()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn sample_ttl(&self) -> Duration {
        sample_jittered(self.ttl, self.min_mult, self.max_mult)
    }
}

fn sample_jittered(ttl: Duration, min_mult: f64, max_mult: f64) -> Duration {
    let mult = if min_mult >= max_mult {
        min_mult
    } else {
        rand::rng().random_range(min_mult..=max_mult)
    };
    ttl.mul_f64(mult)
}
