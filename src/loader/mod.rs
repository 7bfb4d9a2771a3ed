//! Request-scoped batch loading
//!
//! A [`Loader`] coalesces single-key lookups issued during one resolution
//! pass into a single bulk fetch against the data source, then fans the
//! results back out to every caller. One loader instance exists per relation
//! per request; nothing here is shared across requests, so there is no
//! cross-request caching.
//!
//! Flush policy: the caller that opens a batch becomes its leader. The leader
//! yields to the scheduler a bounded number of times so every sibling
//! resolver in the current pass can enqueue its key, then performs the bulk
//! fetch inline. This is the tick-boundary flush of the reference DataLoader
//! pattern expressed with cooperative yields instead of microtasks.

use crate::core::error::DataSourceError;
use async_trait::async_trait;
use futures::future::join_all;
use indexmap::IndexMap;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio::sync::oneshot;

/// How many times a batch leader yields before flushing. Within one
/// cooperative pass every sibling gets polled at least once per yield, so a
/// few yields suffice for all of them to enqueue their keys.
const FLUSH_YIELDS: usize = 4;

/// Error delivered to every key pending in a failed batch.
#[derive(Debug, Clone, Error)]
pub enum LoadError {
    /// The bulk fetch itself failed; all waiters of that batch share the
    /// same underlying error. Per-key misses are not errors.
    #[error("bulk fetch failed: {0}")]
    Fetch(Arc<DataSourceError>),

    /// The batch leader was dropped before the batch fired, or the loader
    /// state was poisoned. Seen only when a request is abandoned mid-flight.
    #[error("batch abandoned before completion")]
    Abandoned,
}

/// Bulk fetch backing one relation.
///
/// Returns a map from key to value; keys without a matching row are simply
/// absent and the loader substitutes `V::default()` for them (`None` for
/// one-row relations, an empty `Vec` for many-row relations).
#[async_trait]
pub trait BatchFn<K, V>: Send + Sync {
    async fn fetch(&self, keys: &[K]) -> Result<HashMap<K, V>, DataSourceError>;
}

type Waiter<V> = oneshot::Sender<Result<V, LoadError>>;

struct LoaderState<K, V> {
    /// Per-request cache of resolved (or primed) keys. Guarantees that two
    /// lookups for the same key within one request return identical values.
    completed: HashMap<K, Result<V, LoadError>>,
    /// Keys of the open batch, in first-request order, with their waiters.
    pending: IndexMap<K, Vec<Waiter<V>>>,
    /// Whether some caller already took responsibility for the next flush.
    flush_scheduled: bool,
}

impl<K, V> Default for LoaderState<K, V> {
    fn default() -> Self {
        Self {
            completed: HashMap::new(),
            pending: IndexMap::new(),
            flush_scheduled: false,
        }
    }
}

/// Per-relation, per-request coalescing loader.
pub struct Loader<K, V> {
    relation: &'static str,
    batch: Arc<dyn BatchFn<K, V>>,
    state: Mutex<LoaderState<K, V>>,
}

impl<K, V> Loader<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Default + Send + Sync + 'static,
{
    pub fn new(relation: &'static str, batch: Arc<dyn BatchFn<K, V>>) -> Self {
        Self {
            relation,
            batch,
            state: Mutex::new(LoaderState::default()),
        }
    }

    /// Look up one key, coalescing with every other `load` issued during the
    /// same resolution pass. Resolves to `V::default()` when no row matches.
    pub async fn load(&self, key: K) -> Result<V, LoadError> {
        let (rx, leads) = {
            let mut state = self.state.lock().map_err(|_| LoadError::Abandoned)?;
            if let Some(done) = state.completed.get(&key) {
                return done.clone();
            }
            let (tx, rx) = oneshot::channel();
            state.pending.entry(key).or_default().push(tx);
            let leads = !state.flush_scheduled;
            if leads {
                state.flush_scheduled = true;
            }
            (rx, leads)
        };

        if leads {
            for _ in 0..FLUSH_YIELDS {
                tokio::task::yield_now().await;
            }
            self.flush().await;
        }

        rx.await.unwrap_or(Err(LoadError::Abandoned))
    }

    /// Look up many keys; the result preserves the order of `keys`,
    /// duplicates included. Every load runs to completion even when one of
    /// them fails — a load that became the flush leader must not be
    /// cancelled, or the keys it collected would never be dispatched and
    /// their waiters would hang.
    pub async fn load_many(&self, keys: Vec<K>) -> Result<Vec<V>, LoadError> {
        join_all(keys.into_iter().map(|key| self.load(key)))
            .await
            .into_iter()
            .collect()
    }

    /// Seed the loader with an already-known value so a later `load` of the
    /// same key resolves without a fetch. A key that already resolved keeps
    /// its first value.
    pub fn prime(&self, key: K, value: V) {
        if let Ok(mut state) = self.state.lock() {
            state.completed.entry(key).or_insert(Ok(value));
        }
    }

    /// Take the open batch and fan the bulk fetch result back out.
    async fn flush(&self) {
        let batch = {
            let Ok(mut state) = self.state.lock() else {
                return;
            };
            state.flush_scheduled = false;
            std::mem::take(&mut state.pending)
        };
        if batch.is_empty() {
            return;
        }

        let keys: Vec<K> = batch.keys().cloned().collect();
        tracing::debug!(
            relation = self.relation,
            keys = keys.len(),
            "dispatching coalesced batch"
        );

        match self.batch.fetch(&keys).await {
            Ok(mut values) => {
                let Ok(mut state) = self.state.lock() else {
                    return;
                };
                for (key, waiters) in batch {
                    let result: Result<V, LoadError> =
                        Ok(values.remove(&key).unwrap_or_default());
                    state.completed.insert(key, result.clone());
                    for waiter in waiters {
                        let _ = waiter.send(result.clone());
                    }
                }
            }
            Err(error) => {
                let shared = Arc::new(error);
                let Ok(mut state) = self.state.lock() else {
                    return;
                };
                for (key, waiters) in batch {
                    let result = Err(LoadError::Fetch(shared.clone()));
                    state.completed.insert(key, result.clone());
                    for waiter in waiters {
                        let _ = waiter.send(result.clone());
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Batch fn mapping `k -> Some(k * 10)` for even keys, recording every
    /// dispatched key set.
    struct EvenTens {
        calls: AtomicUsize,
        batches: Mutex<Vec<Vec<u32>>>,
    }

    impl EvenTens {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                batches: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl BatchFn<u32, Option<u32>> for EvenTens {
        async fn fetch(&self, keys: &[u32]) -> Result<HashMap<u32, Option<u32>>, DataSourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.batches.lock().expect("lock").push(keys.to_vec());
            Ok(keys
                .iter()
                .filter(|k| **k % 2 == 0)
                .map(|k| (*k, Some(k * 10)))
                .collect())
        }
    }

    struct AlwaysFails;

    #[async_trait]
    impl BatchFn<u32, Option<u32>> for AlwaysFails {
        async fn fetch(&self, _keys: &[u32]) -> Result<HashMap<u32, Option<u32>>, DataSourceError> {
            Err(DataSourceError::Storage("connection reset".to_string()))
        }
    }

    /// Fails the first dispatched batch, then behaves like [`EvenTens`].
    struct FailsFirst {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl BatchFn<u32, Option<u32>> for FailsFirst {
        async fn fetch(&self, keys: &[u32]) -> Result<HashMap<u32, Option<u32>>, DataSourceError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                return Err(DataSourceError::Storage("connection reset".to_string()));
            }
            Ok(keys
                .iter()
                .filter(|k| **k % 2 == 0)
                .map(|k| (*k, Some(k * 10)))
                .collect())
        }
    }

    #[tokio::test]
    async fn concurrent_loads_share_one_bulk_fetch() {
        let batch = EvenTens::new();
        let loader = Loader::new("test", batch.clone() as Arc<dyn BatchFn<u32, Option<u32>>>);

        let (a, b, c) = tokio::join!(loader.load(2), loader.load(4), loader.load(2));
        assert_eq!(a.expect("a"), Some(20));
        assert_eq!(b.expect("b"), Some(40));
        assert_eq!(c.expect("c"), Some(20));

        assert_eq!(batch.calls.load(Ordering::SeqCst), 1);
        // Deduplicated, in first-request order.
        assert_eq!(batch.batches.lock().expect("lock")[0], vec![2, 4]);
    }

    #[tokio::test]
    async fn missing_key_resolves_to_default_not_error() {
        let batch = EvenTens::new();
        let loader = Loader::new("test", batch as Arc<dyn BatchFn<u32, Option<u32>>>);

        let miss = loader.load(3).await.expect("load");
        assert_eq!(miss, None);
    }

    #[tokio::test]
    async fn load_many_preserves_order_and_duplicates() {
        let batch = EvenTens::new();
        let loader = Loader::new("test", batch.clone() as Arc<dyn BatchFn<u32, Option<u32>>>);

        let values = loader.load_many(vec![4, 2, 4, 3]).await.expect("load_many");
        assert_eq!(values, vec![Some(40), Some(20), Some(40), None]);
        assert_eq!(batch.calls.load(Ordering::SeqCst), 1);
        assert_eq!(batch.batches.lock().expect("lock")[0], vec![4, 2, 3]);
    }

    #[tokio::test]
    async fn sequential_passes_fetch_once_each() {
        let batch = EvenTens::new();
        let loader = Loader::new("test", batch.clone() as Arc<dyn BatchFn<u32, Option<u32>>>);

        loader.load(2).await.expect("first pass");
        // Same key again: served from the request cache.
        loader.load(2).await.expect("cached");
        loader.load(6).await.expect("second pass");

        assert_eq!(batch.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn primed_key_never_hits_the_store() {
        let batch = EvenTens::new();
        let loader = Loader::new("test", batch.clone() as Arc<dyn BatchFn<u32, Option<u32>>>);

        loader.prime(8, Some(99));
        let value = loader.load(8).await.expect("load");
        assert_eq!(value, Some(99));
        assert_eq!(batch.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn cached_error_in_load_many_does_not_strand_other_waiters() {
        let loader = Loader::new(
            "test",
            Arc::new(FailsFirst {
                calls: AtomicUsize::new(0),
            }) as Arc<dyn BatchFn<u32, Option<u32>>>,
        );
        loader.load(1).await.expect_err("first batch fails");

        // Key 2 opens a fresh batch, key 1 resolves to the cached error.
        // The concurrent load of key 4 joins that batch; it must resolve
        // even though load_many as a whole errors out.
        let joined = tokio::time::timeout(
            std::time::Duration::from_secs(2),
            async { tokio::join!(loader.load_many(vec![2, 1]), loader.load(4)) },
        )
        .await
        .expect("no waiter may hang");

        let (many, bystander) = joined;
        many.expect_err("cached error surfaces");
        assert_eq!(bystander.expect("bystander resolves"), Some(40));
    }

    #[tokio::test]
    async fn failed_batch_rejects_every_pending_key_alike() {
        let loader = Loader::new("test", Arc::new(AlwaysFails) as Arc<dyn BatchFn<u32, Option<u32>>>);

        let (a, b) = tokio::join!(loader.load(1), loader.load(2));
        let a = a.expect_err("a should fail");
        let b = b.expect_err("b should fail");
        assert_eq!(a.to_string(), b.to_string());
        assert!(a.to_string().contains("connection reset"));
    }
}
