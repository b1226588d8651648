//! kvstash: one key-value interface over many storage backends.
//!
//! Backends implement the eight-operation capability contract either
//! synchronously ([`SyncStore`]) or asynchronously ([`AsyncStore`]), or
//! describe themselves as a [`DynamicStore`] method table that is classified
//! at registration. Whatever the backend, callers receive an
//! [`EnhancedStore`] with default-valued reads, existence checks and bulk
//! get/remove on top.
//!
//! # Example
//!
//! ```ignore
//! use serde_json::json;
//!
//! let store = kvstash::create_store("memory", [])?.into_sync()?;
//! store.set_item("name", json!("John"))?;
//! store.set_item("age", json!(25))?;
//! assert_eq!(store.length()?, 2);
//!
//! let db = kvstash::create_store("indexeddb", [json!("app"), json!("users")])?
//!     .into_async()?;
//! db.set_item("x", json!(1)).await?;
//! ```
//!
//! # Custom backends
//!
//! ```ignore
//! use kvstash::{Backend, callable, inject};
//!
//! inject(callable(|_args| Ok(Backend::sync(MyStore::default()))), "mine");
//! let store = kvstash::create_store("mine", [])?;
//! ```

pub mod backends;
pub mod config;
pub mod constants;
pub mod error;
pub mod registry;
pub mod store;

pub use error::{Error, Result};
pub use registry::global::{
    create_store, inject, register, use_storage, use_storage_by_type, use_store,
};
pub use registry::{
    Callable, ConstructibleStore, Constructor, FactoryRegistry, StoreArgs, StoreFactory, StoreKey,
    Symbol, TypedRegistry, callable,
};
pub use store::{
    AsyncEnhanced, AsyncStore, Backend, DynamicStore, EnhancedStore, Field, Handler, Method, Mode,
    Reply, SyncEnhanced, SyncStore,
};
