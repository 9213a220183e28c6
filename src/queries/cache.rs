//! Keyed single-flight query cache.
//!
//! Each key maps to at most one in-flight fetch: concurrent requests for the
//! same key share the first call instead of duplicating it, and completed
//! values are reused until the entry is invalidated. Failed fetches are not
//! cached, so the next request for that key retries.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;

use tokio::sync::{Mutex, OnceCell};

use crate::error::{AppError, AppResult};

/// Consumer-facing snapshot of one query.
#[derive(Debug, Clone, Default)]
pub enum QueryState<T> {
    /// Disabled or never fetched; no call has been issued.
    #[default]
    Idle,
    /// A fetch for this key is in flight.
    Loading,
    Ready(T),
    /// Plumbing failure. Expected "no data" cases are `Ready` values with
    /// empty contents, never this.
    Error(Arc<AppError>),
}

impl<T> QueryState<T> {
    pub fn data(&self) -> Option<&T> {
        match self {
            QueryState::Ready(value) => Some(value),
            _ => None,
        }
    }

    pub fn into_data(self) -> Option<T> {
        match self {
            QueryState::Ready(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, QueryState::Loading)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, QueryState::Error(_))
    }
}

pub struct QueryCache<K, V> {
    entries: Mutex<HashMap<K, Arc<OnceCell<V>>>>,
}

impl<K, V> QueryCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Return the cached value for `key`, or run `load` to produce it.
    /// Concurrent callers for the same key await the same load.
    pub async fn fetch<F, Fut>(&self, key: K, load: F) -> V
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = V>,
    {
        let cell = self.cell(key).await;
        cell.get_or_init(load).await.clone()
    }

    /// Fallible variant of [`fetch`](Self::fetch). An `Err` result is not
    /// cached; the entry is removed so a later request retries.
    pub async fn try_fetch<F, Fut>(&self, key: K, load: F) -> Result<V, Arc<AppError>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = AppResult<V>>,
    {
        let cell = self.cell(key.clone()).await;
        match cell.get_or_try_init(load).await {
            Ok(value) => Ok(value.clone()),
            Err(error) => {
                let mut entries = self.entries.lock().await;
                // Only drop the entry if it is still ours and still empty; a
                // concurrent caller may have re-created or filled it.
                if let Some(current) = entries.get(&key) {
                    if Arc::ptr_eq(current, &cell) && current.get().is_none() {
                        entries.remove(&key);
                    }
                }
                Err(Arc::new(error))
            }
        }
    }

    /// Observe the state for `key` without triggering a fetch.
    pub async fn peek(&self, key: &K) -> QueryState<V> {
        match self.entries.lock().await.get(key) {
            None => QueryState::Idle,
            Some(cell) => match cell.get() {
                Some(value) => QueryState::Ready(value.clone()),
                None => QueryState::Loading,
            },
        }
    }

    /// Forget one key; the next fetch reloads it.
    pub async fn invalidate(&self, key: &K) {
        self.entries.lock().await.remove(key);
    }

    /// Forget everything.
    pub async fn clear(&self) {
        self.entries.lock().await.clear();
    }

    async fn cell(&self, key: K) -> Arc<OnceCell<V>> {
        self.entries.lock().await.entry(key).or_default().clone()
    }
}

impl<K, V> Default for QueryCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}
