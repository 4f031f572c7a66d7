//! Single-flight façade over [`RandomTtlCache`].
//!
//! Consumer-facing endpoints and the background refresher race on the
//! same keys; without coordination each racer would launch its own
//! browser session. Here at most one computation runs per key: the first
//! caller becomes the leader, later callers subscribe to its outcome.
//! Errors reach every waiter and leave the key uncached.

use crate::cache::RandomTtlCache;
use crate::error::{Error, Result};
use anyhow::anyhow;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, broadcast};
use tracing::debug;

type FlightResult<V> = std::result::Result<V, Arc<Error>>;

struct Inner<V: Clone> {
    cache: RandomTtlCache<String, V>,
    inflight: HashMap<String, broadcast::Sender<FlightResult<V>>>,
}

pub struct SingleFlightCache<V: Clone> {
    inner: Arc<Mutex<Inner<V>>>,
}

impl<V: Clone + Send + 'static> SingleFlightCache<V> {
    pub fn new(cache: RandomTtlCache<String, V>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                cache,
                inflight: HashMap::new(),
            })),
        }
    }

    /// Return the cached value for `key` if fresh; otherwise run
    /// `compute` (once across all concurrent callers), store its result
    /// and hand it to everyone. `ttl` overrides the cache's TTL base for
    /// this entry when given.
    pub async fn get_or_compute<F, Fut>(
        &self,
        key: &str,
        ttl: Option<Duration>,
        compute: F,
    ) -> Result<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V>>,
    {
        let mut rx = {
            let mut inner = self.inner.lock().await;
            if let Some(value) = inner.cache.get(&key.to_string()) {
                return Ok(value.clone());
            }
            match inner.inflight.get(key) {
                Some(tx) => {
                    debug!(key, "attaching to in-flight computation");
                    tx.subscribe()
                }
                None => {
                    let (tx, _) = broadcast::channel(1);
                    inner.inflight.insert(key.to_string(), tx);
                    drop(inner);
                    return self.lead(key, ttl, compute).await;
                }
            }
        };

        match rx.recv().await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(shared)) => Err(Error::Shared(shared)),
            // Leader dropped without publishing (caller cancelled).
            Err(_) => Err(Error::Other(anyhow!(
                "in-flight computation for {key:?} was cancelled"
            ))),
        }
    }

    async fn lead<F, Fut>(&self, key: &str, ttl: Option<Duration>, compute: F) -> Result<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V>>,
    {
        let mut guard = FlightGuard {
            inner: Arc::clone(&self.inner),
            key: Some(key.to_string()),
        };

        let result = compute().await;

        let mut inner = self.inner.lock().await;
        let tx = guard
            .key
            .take()
            .and_then(|key| inner.inflight.remove(&key));
        match result {
            Ok(value) => {
                match ttl {
                    Some(ttl) => inner.cache.put_with_ttl(key.to_string(), value.clone(), ttl),
                    None => inner.cache.put(key.to_string(), value.clone()),
                }
                if let Some(tx) = tx {
                    let _ = tx.send(Ok(value.clone()));
                }
                Ok(value)
            }
            Err(error) => {
                let shared = Arc::new(error);
                if let Some(tx) = tx {
                    let _ = tx.send(Err(Arc::clone(&shared)));
                }
                Err(Error::Shared(shared))
            }
        }
    }

    /// Unconditional insertion, bypassing single-flight.
    pub async fn put(&self, key: String, value: V) {
        self.inner.lock().await.cache.put(key, value);
    }

    /// Fresh cached value, if any. Promotes the entry to MRU.
    pub async fn get(&self, key: &str) -> Option<V> {
        self.inner
            .lock()
            .await
            .cache
            .get(&key.to_string())
            .cloned()
    }

    /// Eagerly prune expired entries; returns how many were dropped.
    pub async fn expire(&self) -> usize {
        self.inner.lock().await.cache.expire()
    }
}

/// Removes the in-flight marker if the leader is dropped before
/// publishing, so waiters observe a closed channel instead of hanging.
struct FlightGuard<V: Clone + Send + 'static> {
    inner: Arc<Mutex<Inner<V>>>,
    key: Option<String>,
}

impl<V: Clone + Send + 'static> Drop for FlightGuard<V> {
    fn drop(&mut self) {
        if let Some(key) = self.key.take() {
            let inner = Arc::clone(&self.inner);
            tokio::spawn(async move {
                inner.lock().await.inflight.remove(&key);
            });
        }
    }
}
