//! Per-process memoization.
//!
//! Every pipeline stage caches its results keyed by its input so repeated
//! lookups of the same address never hit the geocoder or the stores
//! twice. Caches live for the life of the process and are never evicted
//! or invalidated: a cached property or eviction list keeps being returned
//! even if the underlying store changes.

use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::{PoisonError, RwLock};

/// A thread-safe, never-evicting map from inputs to computed results.
#[derive(Debug)]
pub struct Memo<K, V> {
    entries: RwLock<BTreeMap<K, V>>,
}

impl<K: Ord, V: Clone> Default for Memo<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Ord, V: Clone> Memo<K, V> {
    /// Creates an empty memo.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: RwLock::new(BTreeMap::new()),
        }
    }

    /// Returns the cached value for `key`, if any.
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    /// Stores `value` under `key` unless a value is already cached, and
    /// returns whichever value is cached afterwards.
    pub fn insert(&self, key: K, value: V) -> V {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(key)
            .or_insert(value)
            .clone()
    }

    /// Number of cached entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns `true` if nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the cached value for `key`, computing and caching it with
    /// `compute` on a miss. Errors are returned without being cached.
    ///
    /// The lock is not held while `compute` runs, so two concurrent misses
    /// on the same key may both compute; the first to finish is kept.
    ///
    /// # Errors
    ///
    /// Returns whatever error `compute` returns.
    pub async fn get_or_try_insert_with<F, Fut, E>(&self, key: K, compute: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<V, E>> + Send,
    {
        if let Some(hit) = self.get(&key) {
            return Ok(hit);
        }

        let value = compute().await?;
        Ok(self.insert(key, value))
    }
}
