//! Duck-typed stores described by a method table.
//!
//! A [`DynamicStore`] maps each [`Method`] to a [`Handler`]. Handlers are
//! either immediate or deferred; nothing declares the store's classification
//! up front, so [`validate::classify`](super::validate::classify) inspects the
//! table, or [`probe`](super::probe) asks `getItem`.
//!
//! Once classified, the table is adapted into a [`SyncStore`] or an
//! [`AsyncStore`] so the rest of the crate stays typed.

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::{AsyncStore, Method, Mode, SyncStore, Visitor};
use crate::error::{Error, Result};

/// One invocation of a contract operation.
pub enum Call<'a> {
    GetItem(String),
    SetItem(String, Value),
    RemoveItem(String),
    Clear,
    Length,
    Key(usize),
    Keys,
    Iterate(Visitor<'a>),
}

impl Call<'_> {
    /// The operation this call invokes.
    pub fn method(&self) -> Method {
        match self {
            Self::GetItem(_) => Method::GetItem,
            Self::SetItem(..) => Method::SetItem,
            Self::RemoveItem(_) => Method::RemoveItem,
            Self::Clear => Method::Clear,
            Self::Length => Method::Length,
            Self::Key(_) => Method::Key,
            Self::Keys => Method::Keys,
            Self::Iterate(_) => Method::Iterate,
        }
    }
}

/// Result of one invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// `getItem` (`None` is the missing marker) and `setItem` (the echo).
    Value(Option<Value>),
    /// `removeItem`, `clear`, `iterate`.
    Unit,
    /// `length`.
    Count(usize),
    /// `key`.
    Key(Option<String>),
    /// `keys`.
    Keys(Vec<String>),
}

impl Reply {
    fn mismatch(method: Method, found: &Reply) -> Error {
        Error::convention(method, format!("unexpected reply {found:?}"))
    }

    pub(crate) fn into_value(self, method: Method) -> Result<Option<Value>> {
        match self {
            Self::Value(value) => Ok(value),
            other => Err(Self::mismatch(method, &other)),
        }
    }

    pub(crate) fn into_echo(self, method: Method) -> Result<Value> {
        match self {
            Self::Value(Some(value)) => Ok(value),
            other => Err(Self::mismatch(method, &other)),
        }
    }

    pub(crate) fn into_unit(self, method: Method) -> Result<()> {
        match self {
            Self::Unit => Ok(()),
            other => Err(Self::mismatch(method, &other)),
        }
    }

    pub(crate) fn into_count(self, method: Method) -> Result<usize> {
        match self {
            Self::Count(count) => Ok(count),
            other => Err(Self::mismatch(method, &other)),
        }
    }

    pub(crate) fn into_key(self, method: Method) -> Result<Option<String>> {
        match self {
            Self::Key(key) => Ok(key),
            other => Err(Self::mismatch(method, &other)),
        }
    }

    pub(crate) fn into_keys(self, method: Method) -> Result<Vec<String>> {
        match self {
            Self::Keys(keys) => Ok(keys),
            other => Err(Self::mismatch(method, &other)),
        }
    }
}

type ImmediateFn = dyn for<'a> Fn(Call<'a>) -> Result<Reply> + Send + Sync;
type DeferredFn = dyn for<'a> Fn(Call<'a>) -> BoxFuture<'a, Result<Reply>> + Send + Sync;

/// Implementation of one operation.
#[derive(Clone)]
pub enum Handler {
    /// Returns its reply directly.
    Immediate(Arc<ImmediateFn>),
    /// Returns a future resolving to its reply.
    Deferred(Arc<DeferredFn>),
}

impl Handler {
    pub fn immediate<F>(f: F) -> Self
    where
        F: for<'a> Fn(Call<'a>) -> Result<Reply> + Send + Sync + 'static,
    {
        Self::Immediate(Arc::new(f))
    }

    pub fn deferred<F>(f: F) -> Self
    where
        F: for<'a> Fn(Call<'a>) -> BoxFuture<'a, Result<Reply>> + Send + Sync + 'static,
    {
        Self::Deferred(Arc::new(f))
    }

    /// Calling convention of this handler.
    pub fn mode(&self) -> Mode {
        match self {
            Self::Immediate(_) => Mode::Sync,
            Self::Deferred(_) => Mode::Async,
        }
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Immediate(_) => f.write_str("Handler::Immediate"),
            Self::Deferred(_) => f.write_str("Handler::Deferred"),
        }
    }
}

/// A store assembled from per-operation handlers.
///
/// Cloning is cheap; clones share the same handlers.
#[derive(Clone, Default)]
pub struct DynamicStore {
    methods: HashMap<Method, Handler>,
}

impl DynamicStore {
    /// Creates an empty method table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the handler for `method`.
    #[must_use]
    pub fn with(mut self, method: Method, handler: Handler) -> Self {
        self.insert(method, handler);
        self
    }

    /// Adds or replaces the handler for `method`.
    pub fn insert(&mut self, method: Method, handler: Handler) {
        self.methods.insert(method, handler);
    }

    /// Removes the handler for `method`.
    pub fn remove(&mut self, method: Method) -> Option<Handler> {
        self.methods.remove(&method)
    }

    /// Handler registered for `method`, if any.
    pub fn handler(&self, method: Method) -> Option<&Handler> {
        self.methods.get(&method)
    }

    /// Builds a table whose every operation immediately forwards to `store`.
    pub fn from_sync(store: Arc<dyn SyncStore>) -> Self {
        let handler = Handler::immediate(move |call| dispatch_sync(store.as_ref(), call));
        Self::uniform(handler)
    }

    /// Builds a table whose every operation defers to `store`.
    pub fn from_async(store: Arc<dyn AsyncStore>) -> Self {
        let handler = Handler::deferred(move |call| {
            let store = Arc::clone(&store);
            Box::pin(async move { dispatch_async(store.as_ref(), call).await })
        });
        Self::uniform(handler)
    }

    fn uniform(handler: Handler) -> Self {
        let methods = Method::ALL
            .into_iter()
            .map(|method| (method, handler.clone()))
            .collect();
        Self { methods }
    }

    fn require(&self, method: Method) -> Result<&Handler> {
        self.handler(method)
            .ok_or(Error::MissingMethod { method })
    }

    fn call_now(&self, call: Call<'_>) -> Result<Reply> {
        let method = call.method();
        match self.require(method)? {
            Handler::Immediate(f) => f(call),
            Handler::Deferred(_) => Err(Error::convention(
                method,
                "deferred handler on a synchronous store",
            )),
        }
    }

    async fn call_deferred(&self, call: Call<'_>) -> Result<Reply> {
        match self.require(call.method())? {
            Handler::Immediate(f) => f(call),
            Handler::Deferred(f) => f(call).await,
        }
    }
}

impl fmt::Debug for DynamicStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for method in Method::ALL {
            if let Some(handler) = self.methods.get(&method) {
                map.entry(&method.name(), handler);
            }
        }
        map.finish()
    }
}

fn dispatch_sync(store: &dyn SyncStore, call: Call<'_>) -> Result<Reply> {
    Ok(match call {
        Call::GetItem(key) => Reply::Value(store.get_item(&key)?),
        Call::SetItem(key, value) => Reply::Value(Some(store.set_item(&key, value)?)),
        Call::RemoveItem(key) => {
            store.remove_item(&key)?;
            Reply::Unit
        }
        Call::Clear => {
            store.clear()?;
            Reply::Unit
        }
        Call::Length => Reply::Count(store.length()?),
        Call::Key(index) => Reply::Key(store.key(index)?),
        Call::Keys => Reply::Keys(store.keys()?),
        Call::Iterate(visitor) => {
            store.iterate(visitor)?;
            Reply::Unit
        }
    })
}

async fn dispatch_async(store: &dyn AsyncStore, call: Call<'_>) -> Result<Reply> {
    Ok(match call {
        Call::GetItem(key) => Reply::Value(store.get_item(&key).await?),
        Call::SetItem(key, value) => Reply::Value(Some(store.set_item(&key, value).await?)),
        Call::RemoveItem(key) => {
            store.remove_item(&key).await?;
            Reply::Unit
        }
        Call::Clear => {
            store.clear().await?;
            Reply::Unit
        }
        Call::Length => Reply::Count(store.length().await?),
        Call::Key(index) => Reply::Key(store.key(index).await?),
        Call::Keys => Reply::Keys(store.keys().await?),
        Call::Iterate(visitor) => {
            store.iterate(visitor).await?;
            Reply::Unit
        }
    })
}

/// A classified-sync dynamic store.
pub(crate) struct DynamicSync(pub(crate) DynamicStore);

impl SyncStore for DynamicSync {
    fn get_item(&self, key: &str) -> Result<Option<Value>> {
        self.0
            .call_now(Call::GetItem(key.to_string()))?
            .into_value(Method::GetItem)
    }

    fn set_item(&self, key: &str, value: Value) -> Result<Value> {
        self.0
            .call_now(Call::SetItem(key.to_string(), value))?
            .into_echo(Method::SetItem)
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        self.0
            .call_now(Call::RemoveItem(key.to_string()))?
            .into_unit(Method::RemoveItem)
    }

    fn clear(&self) -> Result<()> {
        self.0.call_now(Call::Clear)?.into_unit(Method::Clear)
    }

    fn length(&self) -> Result<usize> {
        self.0.call_now(Call::Length)?.into_count(Method::Length)
    }

    fn key(&self, index: usize) -> Result<Option<String>> {
        self.0.call_now(Call::Key(index))?.into_key(Method::Key)
    }

    fn keys(&self) -> Result<Vec<String>> {
        self.0.call_now(Call::Keys)?.into_keys(Method::Keys)
    }

    fn iterate(&self, visitor: Visitor<'_>) -> Result<()> {
        self.0
            .call_now(Call::Iterate(visitor))?
            .into_unit(Method::Iterate)
    }
}

/// A classified-async dynamic store.
///
/// Immediate handlers are tolerated here and resolve at once.
pub(crate) struct DynamicAsync(pub(crate) DynamicStore);

#[async_trait]
impl AsyncStore for DynamicAsync {
    async fn get_item(&self, key: &str) -> Result<Option<Value>> {
        self.0
            .call_deferred(Call::GetItem(key.to_string()))
            .await?
            .into_value(Method::GetItem)
    }

    async fn set_item(&self, key: &str, value: Value) -> Result<Value> {
        self.0
            .call_deferred(Call::SetItem(key.to_string(), value))
            .await?
            .into_echo(Method::SetItem)
    }

    async fn remove_item(&self, key: &str) -> Result<()> {
        self.0
            .call_deferred(Call::RemoveItem(key.to_string()))
            .await?
            .into_unit(Method::RemoveItem)
    }

    async fn clear(&self) -> Result<()> {
        self.0
            .call_deferred(Call::Clear)
            .await?
            .into_unit(Method::Clear)
    }

    async fn length(&self) -> Result<usize> {
        self.0
            .call_deferred(Call::Length)
            .await?
            .into_count(Method::Length)
    }

    async fn key(&self, index: usize) -> Result<Option<String>> {
        self.0
            .call_deferred(Call::Key(index))
            .await?
            .into_key(Method::Key)
    }

    async fn keys(&self) -> Result<Vec<String>> {
        self.0
            .call_deferred(Call::Keys)
            .await?
            .into_keys(Method::Keys)
    }

    async fn iterate(&self, visitor: &mut (dyn FnMut(Value, String, usize) + Send)) -> Result<()> {
        self.0
            .call_deferred(Call::Iterate(visitor))
            .await?
            .into_unit(Method::Iterate)
    }
}
