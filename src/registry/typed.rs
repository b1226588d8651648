//! Registry of ready, enhanced instances split by classification.

use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

use super::StoreKey;
use crate::error::{Error, Result};
use crate::store::validate::classify_backend;
use crate::store::{AsyncEnhanced, Backend, EnhancedStore, Mode, SyncEnhanced, enhance_as};

/// Two tables of enhanced instances, one per [`Mode`].
///
/// A key is bound in at most one partition at a time.
#[derive(Default)]
pub struct TypedRegistry {
    sync: RwLock<HashMap<StoreKey, SyncEnhanced>>,
    asynchronous: RwLock<HashMap<StoreKey, AsyncEnhanced>>,
}

impl TypedRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates, enhances and stores `backend` under `key`.
    ///
    /// A previous binding of `key`, in either partition, is replaced.
    ///
    /// # Errors
    ///
    /// Returns the validator's error for a malformed dynamic store. Nothing
    /// registered before is touched in that case.
    pub fn register(&self, backend: Backend, key: impl Into<StoreKey>) -> Result<()> {
        let key = key.into();
        let mode = classify_backend(&backend)?;

        match enhance_as(backend, mode)? {
            EnhancedStore::Sync(store) => {
                self.asynchronous.write().remove(&key);
                self.sync.write().insert(key.clone(), store);
            }
            EnhancedStore::Async(store) => {
                self.sync.write().remove(&key);
                self.asynchronous.write().insert(key.clone(), store);
            }
        }

        tracing::debug!(key = %key, mode = %mode, "Registered store");
        Ok(())
    }

    /// Looks `key` up in the async partition, then the sync one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotRegistered`] when neither partition binds `key`.
    pub fn use_storage(&self, key: impl Into<StoreKey>) -> Result<EnhancedStore> {
        let key = key.into();
        if let Some(store) = self.asynchronous.read().get(&key) {
            return Ok(EnhancedStore::Async(store.clone()));
        }
        if let Some(store) = self.sync.read().get(&key) {
            return Ok(EnhancedStore::Sync(store.clone()));
        }
        Err(Error::not_registered(&key))
    }

    /// Looks `key` up in the `mode` partition only.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotInPartition`] when `key` is not bound there, even if
    /// the other partition binds it.
    pub fn use_storage_by_type(
        &self,
        key: impl Into<StoreKey>,
        mode: Mode,
    ) -> Result<EnhancedStore> {
        let key = key.into();
        match mode {
            Mode::Sync => self.use_sync(key).map(EnhancedStore::Sync),
            Mode::Async => self.use_async(key).map(EnhancedStore::Async),
        }
    }

    /// # Errors
    ///
    /// Returns [`Error::NotInPartition`] when `key` is not bound as sync.
    pub fn use_sync(&self, key: impl Into<StoreKey>) -> Result<SyncEnhanced> {
        let key = key.into();
        self.sync
            .read()
            .get(&key)
            .cloned()
            .ok_or_else(|| Error::not_in_partition(&key, Mode::Sync))
    }

    /// # Errors
    ///
    /// Returns [`Error::NotInPartition`] when `key` is not bound as async.
    pub fn use_async(&self, key: impl Into<StoreKey>) -> Result<AsyncEnhanced> {
        let key = key.into();
        self.asynchronous
            .read()
            .get(&key)
            .cloned()
            .ok_or_else(|| Error::not_in_partition(&key, Mode::Async))
    }

    /// Returns the instance bound to `key`. Instances are complete at
    /// registration, so `args` are ignored.
    ///
    /// # Errors
    ///
    /// Same as [`use_storage`](Self::use_storage).
    pub fn create_store<I>(&self, key: impl Into<StoreKey>, _args: I) -> Result<EnhancedStore>
    where
        I: IntoIterator<Item = Value>,
    {
        self.use_storage(key)
    }

    pub fn contains(&self, key: impl Into<StoreKey>) -> bool {
        let key = key.into();
        self.sync.read().contains_key(&key) || self.asynchronous.read().contains_key(&key)
    }
}

impl fmt::Debug for TypedRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedRegistry")
            .field("sync", &self.sync.read().keys().collect::<Vec<_>>())
            .field("async", &self.asynchronous.read().keys().collect::<Vec<_>>())
            .finish()
    }
}
