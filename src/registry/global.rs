//! Process-wide registries.
//!
//! The default [`FactoryRegistry`] comes preloaded with the bundled backends:
//!
//! | key         | backend                         | arguments                    |
//! |-------------|---------------------------------|------------------------------|
//! | `memory`    | [`MemoryStore`] (sync)          | `[name[, store_name]]`       |
//! | `local`     | [`LocalStore`] (sync)           | none                         |
//! | `session`   | [`SessionStore`] (sync)         | none                         |
//! | `indexeddb` | [`DbStore`] (async)             | `database_name, store_name`  |
//!
//! The default [`TypedRegistry`] starts empty.
//!
//! Register custom backends during start-up, before lookups run concurrently.
//!
//! [`LocalStore`]: crate::backends::LocalStore
//! [`SessionStore`]: crate::backends::SessionStore

use once_cell::sync::Lazy;
use serde_json::Value;
use std::sync::Arc;

use super::{Constructor, FactoryRegistry, StoreFactory, StoreKey, TypedRegistry, callable};
use crate::backends::{
    DbStore, MemoryStore, UnavailableStorage, WebStore, open_local_or_degrade, session_store,
};
use crate::config;
use crate::constants;
use crate::error::Result;
use crate::store::{Backend, EnhancedStore, Mode};

static LOCAL: Lazy<Backend> = Lazy::new(|| match config::current().local_path() {
    Ok(path) => open_local_or_degrade(path),
    Err(err) => {
        tracing::warn!(error = %err, "No local data directory, local storage unavailable");
        Backend::sync(WebStore::new(Arc::new(UnavailableStorage)))
    }
});

static FACTORIES: Lazy<FactoryRegistry> = Lazy::new(|| {
    let registry = FactoryRegistry::new();
    install_builtins(&registry);
    registry
});

static TYPED: Lazy<TypedRegistry> = Lazy::new(TypedRegistry::new);

/// Binds the bundled backends into `registry`.
pub fn install_builtins(registry: &FactoryRegistry) {
    registry.inject(Constructor::<MemoryStore>::new(), constants::MEMORY);
    registry.inject(callable(|_| Ok(LOCAL.clone())), constants::LOCAL);
    registry.inject(
        callable(|_| Ok(Backend::sync(session_store()))),
        constants::SESSION,
    );
    registry.inject(Constructor::<DbStore>::new(), constants::INDEXEDDB);
}

/// The process-wide factory registry.
pub fn factories() -> &'static FactoryRegistry {
    &FACTORIES
}

/// The process-wide typed registry.
pub fn typed() -> &'static TypedRegistry {
    &TYPED
}

/// Binds `factory` to `key` in the process-wide factory registry.
pub fn inject<F: StoreFactory>(factory: F, key: impl Into<StoreKey>) {
    FACTORIES.inject(factory, key);
}

/// Resolves `key` in the process-wide factory registry.
///
/// # Errors
///
/// Returns [`Error::NotRegistered`](crate::Error::NotRegistered) for an
/// unknown key.
pub fn use_store(key: impl Into<StoreKey>) -> Result<Arc<dyn StoreFactory>> {
    FACTORIES.use_store(key)
}

/// Builds an enhanced store from the process-wide factory registry.
///
/// # Errors
///
/// See [`FactoryRegistry::create_store`].
pub fn create_store<I>(key: impl Into<StoreKey>, args: I) -> Result<EnhancedStore>
where
    I: IntoIterator<Item = Value>,
{
    FACTORIES.create_store(key, args)
}

/// Registers an instance in the process-wide typed registry.
///
/// # Errors
///
/// See [`TypedRegistry::register`].
pub fn register(backend: Backend, key: impl Into<StoreKey>) -> Result<()> {
    TYPED.register(backend, key)
}

/// Resolves `key` in the process-wide typed registry.
///
/// # Errors
///
/// See [`TypedRegistry::use_storage`].
pub fn use_storage(key: impl Into<StoreKey>) -> Result<EnhancedStore> {
    TYPED.use_storage(key)
}

/// Resolves `key` in one partition of the process-wide typed registry.
///
/// # Errors
///
/// See [`TypedRegistry::use_storage_by_type`].
pub fn use_storage_by_type(key: impl Into<StoreKey>, mode: Mode) -> Result<EnhancedStore> {
    TYPED.use_storage_by_type(key, mode)
}
