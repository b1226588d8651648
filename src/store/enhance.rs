//! Enhancement decorator: derived convenience operations over a base store.
//!
//! Derived operations are computed purely from the live base store held by
//! the wrapper; nothing is cached. For async stores the bulk operations issue
//! every call before awaiting any ("fire all, await all"). Bulk removal is
//! best-effort and non-transactional: removals that succeeded stay applied
//! when another one fails, and the first failure in input order is returned.

use futures::future::join_all;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use super::dynamic::{DynamicAsync, DynamicSync};
use super::{AsyncStore, Backend, Call, DynamicStore, Handler, Method, Mode, SyncStore, Visitor};
use crate::error::{Error, Result};

/// Key read by [`probe`]. A store is not expected to hold it.
pub const PROBE_KEY: &str = "__kvstash_probe__";

/// Determines a dynamic store's classification by reading [`PROBE_KEY`].
///
/// An immediate `getItem` is invoked and its answer discarded. A deferred
/// `getItem` yields a future that is dropped without being polled, so the
/// read never actually runs.
///
/// # Errors
///
/// Returns [`Error::MissingMethod`] when the store has no `getItem`.
pub fn probe(store: &DynamicStore) -> Result<Mode> {
    let mode = match store.handler(Method::GetItem) {
        Some(Handler::Immediate(f)) => {
            let _ = f(Call::GetItem(PROBE_KEY.to_string()));
            Mode::Sync
        }
        Some(Handler::Deferred(f)) => {
            drop(f(Call::GetItem(PROBE_KEY.to_string())));
            Mode::Async
        }
        None => {
            return Err(Error::MissingMethod {
                method: Method::GetItem,
            });
        }
    };
    tracing::debug!(mode = %mode, "Probed dynamic store");
    Ok(mode)
}

/// Wraps a backend, probing dynamic stores for their classification.
///
/// # Errors
///
/// Fails only when a dynamic store cannot be probed.
pub fn enhance(backend: Backend) -> Result<EnhancedStore> {
    let mode = match &backend {
        Backend::Sync(_) => Mode::Sync,
        Backend::Async(_) => Mode::Async,
        Backend::Dynamic(store) => probe(store)?,
    };
    enhance_as(backend, mode)
}

/// Wraps a backend whose classification is already known.
///
/// # Errors
///
/// Returns [`Error::WrongMode`] when a typed backend contradicts `mode`.
pub fn enhance_as(backend: Backend, mode: Mode) -> Result<EnhancedStore> {
    match (backend, mode) {
        (Backend::Sync(store), Mode::Sync) => Ok(EnhancedStore::Sync(SyncEnhanced::new(store))),
        (Backend::Async(store), Mode::Async) => {
            Ok(EnhancedStore::Async(AsyncEnhanced::new(store)))
        }
        (Backend::Dynamic(store), Mode::Sync) => Ok(EnhancedStore::Sync(SyncEnhanced::new(
            Arc::new(DynamicSync(store)),
        ))),
        (Backend::Dynamic(store), Mode::Async) => Ok(EnhancedStore::Async(AsyncEnhanced::new(
            Arc::new(DynamicAsync(store)),
        ))),
        (Backend::Sync(_), Mode::Async) => Err(Error::WrongMode {
            expected: Mode::Async,
        }),
        (Backend::Async(_), Mode::Sync) => Err(Error::WrongMode {
            expected: Mode::Sync,
        }),
    }
}

/// A backend plus the derived operations, classified sync or async.
#[derive(Clone)]
pub enum EnhancedStore {
    Sync(SyncEnhanced),
    Async(AsyncEnhanced),
}

impl EnhancedStore {
    pub fn mode(&self) -> Mode {
        match self {
            Self::Sync(_) => Mode::Sync,
            Self::Async(_) => Mode::Async,
        }
    }

    pub fn as_sync(&self) -> Option<&SyncEnhanced> {
        match self {
            Self::Sync(store) => Some(store),
            Self::Async(_) => None,
        }
    }

    pub fn as_async(&self) -> Option<&AsyncEnhanced> {
        match self {
            Self::Async(store) => Some(store),
            Self::Sync(_) => None,
        }
    }

    /// # Errors
    ///
    /// Returns [`Error::WrongMode`] for async stores.
    pub fn into_sync(self) -> Result<SyncEnhanced> {
        match self {
            Self::Sync(store) => Ok(store),
            Self::Async(_) => Err(Error::WrongMode {
                expected: Mode::Sync,
            }),
        }
    }

    /// # Errors
    ///
    /// Returns [`Error::WrongMode`] for sync stores.
    pub fn into_async(self) -> Result<AsyncEnhanced> {
        match self {
            Self::Async(store) => Ok(store),
            Self::Sync(_) => Err(Error::WrongMode {
                expected: Mode::Async,
            }),
        }
    }
}

impl fmt::Debug for EnhancedStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EnhancedStore::{:?}", self.mode())
    }
}

/// Enhanced synchronous store.
#[derive(Clone)]
pub struct SyncEnhanced {
    inner: Arc<dyn SyncStore>,
}

impl SyncEnhanced {
    pub fn new(inner: Arc<dyn SyncStore>) -> Self {
        Self { inner }
    }

    /// The wrapped base store.
    pub fn base(&self) -> &Arc<dyn SyncStore> {
        &self.inner
    }

    pub fn get_item(&self, key: &str) -> Result<Option<Value>> {
        self.inner.get_item(key)
    }

    pub fn set_item(&self, key: &str, value: Value) -> Result<Value> {
        self.inner.set_item(key, value)
    }

    pub fn remove_item(&self, key: &str) -> Result<()> {
        self.inner.remove_item(key)
    }

    pub fn clear(&self) -> Result<()> {
        self.inner.clear()
    }

    pub fn length(&self) -> Result<usize> {
        self.inner.length()
    }

    pub fn key(&self, index: usize) -> Result<Option<String>> {
        self.inner.key(index)
    }

    pub fn keys(&self) -> Result<Vec<String>> {
        self.inner.keys()
    }

    pub fn iterate(&self, visitor: Visitor<'_>) -> Result<()> {
        self.inner.iterate(visitor)
    }

    /// Reads `key`, or returns `fallback` when it is absent. Never writes.
    pub fn get_item_or_default(&self, key: &str, fallback: Value) -> Result<Value> {
        Ok(self.inner.get_item(key)?.unwrap_or(fallback))
    }

    pub fn has_item(&self, key: &str) -> Result<bool> {
        Ok(self.inner.get_item(key)?.is_some())
    }

    /// Removes each key in order, stopping at the first failure.
    pub fn remove_items<K: AsRef<str>>(&self, keys: &[K]) -> Result<()> {
        keys.iter()
            .try_for_each(|key| self.inner.remove_item(key.as_ref()))
    }

    /// Reads each key; the result lines up with `keys`.
    pub fn get_items<K: AsRef<str>>(&self, keys: &[K]) -> Result<Vec<Option<Value>>> {
        keys.iter()
            .map(|key| self.inner.get_item(key.as_ref()))
            .collect()
    }
}

/// Enhanced asynchronous store.
#[derive(Clone)]
pub struct AsyncEnhanced {
    inner: Arc<dyn AsyncStore>,
}

impl AsyncEnhanced {
    pub fn new(inner: Arc<dyn AsyncStore>) -> Self {
        Self { inner }
    }

    /// The wrapped base store.
    pub fn base(&self) -> &Arc<dyn AsyncStore> {
        &self.inner
    }

    pub async fn get_item(&self, key: &str) -> Result<Option<Value>> {
        self.inner.get_item(key).await
    }

    pub async fn set_item(&self, key: &str, value: Value) -> Result<Value> {
        self.inner.set_item(key, value).await
    }

    pub async fn remove_item(&self, key: &str) -> Result<()> {
        self.inner.remove_item(key).await
    }

    pub async fn clear(&self) -> Result<()> {
        self.inner.clear().await
    }

    pub async fn length(&self) -> Result<usize> {
        self.inner.length().await
    }

    pub async fn key(&self, index: usize) -> Result<Option<String>> {
        self.inner.key(index).await
    }

    pub async fn keys(&self) -> Result<Vec<String>> {
        self.inner.keys().await
    }

    pub async fn iterate(
        &self,
        visitor: &mut (dyn FnMut(Value, String, usize) + Send),
    ) -> Result<()> {
        self.inner.iterate(visitor).await
    }

    /// Reads `key`, or returns `fallback` when it is absent. Never writes.
    pub async fn get_item_or_default(&self, key: &str, fallback: Value) -> Result<Value> {
        Ok(self.inner.get_item(key).await?.unwrap_or(fallback))
    }

    pub async fn has_item(&self, key: &str) -> Result<bool> {
        Ok(self.inner.get_item(key).await?.is_some())
    }

    /// Issues every removal, waits for all of them, then reports the first
    /// failure in input order.
    pub async fn remove_items<K: AsRef<str>>(&self, keys: &[K]) -> Result<()> {
        join_all(keys.iter().map(|key| self.inner.remove_item(key.as_ref())))
            .await
            .into_iter()
            .collect()
    }

    /// Issues every read, waits for all of them; the result lines up with `keys`.
    pub async fn get_items<K: AsRef<str>>(&self, keys: &[K]) -> Result<Vec<Option<Value>>> {
        join_all(keys.iter().map(|key| self.inner.get_item(key.as_ref())))
            .await
            .into_iter()
            .collect()
    }
}
