//! The storage capability contract and everything built on top of it.
//!
//! Every backend exposes the same eight operations, either immediately
//! ([`SyncStore`]) or deferred ([`AsyncStore`]). Backends that cannot
//! implement a trait describe themselves as a [`DynamicStore`] method table,
//! which the [`validate`] module classifies before use.
//!
//! Callers never talk to a raw backend: [`enhance`] wraps it into an
//! [`EnhancedStore`] that adds default-valued reads, existence checks and
//! bulk get/remove on top of the base operations.
//!
//! # Example
//!
//! ```ignore
//! use kvstash::store::{Backend, enhance};
//! use kvstash::backends::MemoryStore;
//! use serde_json::json;
//!
//! let store = enhance(Backend::sync(MemoryStore::new()))?.into_sync()?;
//! store.set_item("name", json!("John"))?;
//! assert!(store.has_item("name")?);
//! ```

mod dynamic;
mod enhance;
mod field;
pub mod validate;

#[cfg(test)]
mod tests;

use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use crate::error::Result;

pub use dynamic::{Call, DynamicStore, Handler, Reply};
pub use enhance::{
    AsyncEnhanced, EnhancedStore, PROBE_KEY, SyncEnhanced, enhance, enhance_as, probe,
};
pub use field::Field;

/// Visitor invoked by `iterate` with `(value, key, ordinal)`.
pub type Visitor<'a> = &'a mut (dyn FnMut(Value, String, usize) + Send);

/// The eight operations of the capability contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    GetItem,
    SetItem,
    RemoveItem,
    Clear,
    Length,
    Key,
    Keys,
    Iterate,
}

impl Method {
    /// All operations, in the order the validator inspects them.
    pub const ALL: [Method; 8] = [
        Method::GetItem,
        Method::SetItem,
        Method::RemoveItem,
        Method::Clear,
        Method::Length,
        Method::Key,
        Method::Keys,
        Method::Iterate,
    ];

    /// Contract name of the operation.
    pub fn name(self) -> &'static str {
        match self {
            Self::GetItem => "getItem",
            Self::SetItem => "setItem",
            Self::RemoveItem => "removeItem",
            Self::Clear => "clear",
            Self::Length => "length",
            Self::Key => "key",
            Self::Keys => "keys",
            Self::Iterate => "iterate",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Sync/async classification of a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    Sync,
    Async,
}

impl Mode {
    pub fn is_async(self) -> bool {
        self == Self::Async
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sync => f.write_str("sync"),
            Self::Async => f.write_str("async"),
        }
    }
}

/// A backend whose operations return their result immediately.
///
/// Reading an absent key yields `Ok(None)`. Write failures must propagate.
pub trait SyncStore: Send + Sync + 'static {
    /// Reads a value, `None` when the key is absent.
    fn get_item(&self, key: &str) -> Result<Option<Value>>;

    /// Stores a value and echoes it back.
    fn set_item(&self, key: &str, value: Value) -> Result<Value>;

    /// Removes a key. Removing an absent key is a no-op.
    fn remove_item(&self, key: &str) -> Result<()>;

    /// Empties the whole namespace.
    fn clear(&self) -> Result<()>;

    /// Number of keys in the namespace.
    fn length(&self) -> Result<usize>;

    /// Key at `index` in the backend's enumeration order.
    fn key(&self, index: usize) -> Result<Option<String>>;

    /// All keys in enumeration order.
    fn keys(&self) -> Result<Vec<String>>;

    /// Calls `visitor(value, key, ordinal)` once per entry, ordinal from 0.
    fn iterate(&self, visitor: Visitor<'_>) -> Result<()>;
}

/// A backend whose operations are deferred.
///
/// Same contract as [`SyncStore`]; every operation may suspend.
#[async_trait]
pub trait AsyncStore: Send + Sync + 'static {
    async fn get_item(&self, key: &str) -> Result<Option<Value>>;

    async fn set_item(&self, key: &str, value: Value) -> Result<Value>;

    async fn remove_item(&self, key: &str) -> Result<()>;

    async fn clear(&self) -> Result<()>;

    async fn length(&self) -> Result<usize>;

    async fn key(&self, index: usize) -> Result<Option<String>>;

    async fn keys(&self) -> Result<Vec<String>>;

    /// Visits entries in enumeration order. Not stable under concurrent mutation.
    async fn iterate(&self, visitor: &mut (dyn FnMut(Value, String, usize) + Send)) -> Result<()>;
}

/// What a factory hands back: a typed store or a dynamic method table.
#[derive(Clone)]
pub enum Backend {
    Sync(Arc<dyn SyncStore>),
    Async(Arc<dyn AsyncStore>),
    Dynamic(DynamicStore),
}

impl Backend {
    /// Wraps a synchronous store.
    pub fn sync<S: SyncStore>(store: S) -> Self {
        Self::Sync(Arc::new(store))
    }

    /// Wraps an asynchronous store.
    pub fn asynchronous<S: AsyncStore>(store: S) -> Self {
        Self::Async(Arc::new(store))
    }

    /// Classification known without inspection, `None` for dynamic stores.
    pub fn declared_mode(&self) -> Option<Mode> {
        match self {
            Self::Sync(_) => Some(Mode::Sync),
            Self::Async(_) => Some(Mode::Async),
            Self::Dynamic(_) => None,
        }
    }
}

impl From<DynamicStore> for Backend {
    fn from(store: DynamicStore) -> Self {
        Self::Dynamic(store)
    }
}

impl fmt::Debug for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sync(_) => f.write_str("Backend::Sync"),
            Self::Async(_) => f.write_str("Backend::Async"),
            Self::Dynamic(store) => f.debug_tuple("Backend::Dynamic").field(store).finish(),
        }
    }
}
