//! Factories and the factory registry.
//!
//! A [`StoreFactory`] can be invoked two ways, `construct` and `call`, and
//! implements whichever it supports. [`FactoryRegistry::create_store`] tries
//! `construct` first and falls back to `call`.

use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use super::StoreKey;
use crate::error::{Error, Result};
use crate::store::{Backend, EnhancedStore, enhance};

/// Constructor arguments handed to a factory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreArgs(Vec<Value>);

impl StoreArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.0.get(index)
    }

    /// Required string argument; `what` names it in the error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] when missing or not a string.
    pub fn str_at(&self, index: usize, what: &str) -> Result<&str> {
        self.opt_str_at(index)?
            .ok_or_else(|| Error::invalid_argument(index, format!("missing {what}")))
    }

    /// Optional string argument.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] when present but not a string.
    pub fn opt_str_at(&self, index: usize) -> Result<Option<&str>> {
        match self.0.get(index) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s)),
            Some(other) => Err(Error::invalid_argument(
                index,
                format!("expected a string, got {other}"),
            )),
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[Value] {
        &self.0
    }
}

impl From<Vec<Value>> for StoreArgs {
    fn from(args: Vec<Value>) -> Self {
        Self(args)
    }
}

impl FromIterator<Value> for StoreArgs {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Something that produces backends.
///
/// Implement `construct` for type-like factories and `call` for
/// function-like ones. The unimplemented entry point fails with
/// [`Error::NotConstructible`] or [`Error::NotCallable`].
pub trait StoreFactory: Send + Sync + 'static {
    /// Builds a backend as a new instance of a type.
    ///
    /// # Errors
    ///
    /// Fails when the factory is not constructible or construction fails.
    fn construct(&self, _args: &StoreArgs) -> Result<Backend> {
        Err(Error::NotConstructible {
            descriptor: std::any::type_name::<Self>(),
        })
    }

    /// Produces a backend by invoking the factory.
    ///
    /// # Errors
    ///
    /// Fails when the factory is not callable or the call fails.
    fn call(&self, _args: &StoreArgs) -> Result<Backend> {
        Err(Error::NotCallable {
            descriptor: std::any::type_name::<Self>(),
        })
    }
}

/// A store type that can be built from constructor arguments.
pub trait ConstructibleStore: Sized + Send + Sync + 'static {
    /// # Errors
    ///
    /// Fails when the arguments are invalid.
    fn construct(args: &StoreArgs) -> Result<Self>;

    fn into_backend(self) -> Backend;
}

/// Constructible factory for `T`.
pub struct Constructor<T>(PhantomData<fn() -> T>);

impl<T> Constructor<T> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for Constructor<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ConstructibleStore> StoreFactory for Constructor<T> {
    fn construct(&self, args: &StoreArgs) -> Result<Backend> {
        T::construct(args).map(T::into_backend)
    }
}

/// Callable factory wrapping a closure.
pub struct Callable<F>(F);

/// Wraps `f` as a callable factory.
pub fn callable<F>(f: F) -> Callable<F>
where
    F: Fn(&StoreArgs) -> Result<Backend> + Send + Sync + 'static,
{
    Callable(f)
}

impl<F> StoreFactory for Callable<F>
where
    F: Fn(&StoreArgs) -> Result<Backend> + Send + Sync + 'static,
{
    fn call(&self, args: &StoreArgs) -> Result<Backend> {
        (self.0)(args)
    }
}

/// A ready backend registered as its own factory. Calling it hands out a
/// shared handle and ignores the arguments.
impl StoreFactory for Backend {
    fn call(&self, _args: &StoreArgs) -> Result<Backend> {
        Ok(self.clone())
    }
}

/// Key to factory table.
///
/// Registration overwrites by key. Registering and resolving the same key
/// from different threads at the same time is the caller's responsibility to
/// avoid; the lock only keeps the table itself consistent.
#[derive(Default)]
pub struct FactoryRegistry {
    factories: RwLock<HashMap<StoreKey, Arc<dyn StoreFactory>>>,
}

impl FactoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `factory` to `key`, replacing any previous binding.
    pub fn inject<F: StoreFactory>(&self, factory: F, key: impl Into<StoreKey>) {
        self.inject_shared(Arc::new(factory), key);
    }

    /// Like [`inject`](Self::inject) for an already shared factory.
    pub fn inject_shared(&self, factory: Arc<dyn StoreFactory>, key: impl Into<StoreKey>) {
        let key = key.into();
        tracing::debug!(key = %key, "Registered store factory");
        self.factories.write().insert(key, factory);
    }

    /// Returns the factory bound to `key`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotRegistered`] when nothing is bound.
    pub fn use_store(&self, key: impl Into<StoreKey>) -> Result<Arc<dyn StoreFactory>> {
        self.lookup(&key.into())
    }

    pub fn contains(&self, key: impl Into<StoreKey>) -> bool {
        self.factories.read().contains_key(&key.into())
    }

    pub fn keys(&self) -> Vec<StoreKey> {
        self.factories.read().keys().cloned().collect()
    }

    fn lookup(&self, key: &StoreKey) -> Result<Arc<dyn StoreFactory>> {
        self.factories
            .read()
            .get(key)
            .cloned()
            .ok_or_else(|| Error::not_registered(key))
    }

    /// Resolves `key`, runs its factory with `args` and enhances the result.
    ///
    /// The factory is constructed first; if that fails it is called with the
    /// same arguments. When both fail the error reports both failures, or
    /// only the real one when the factory supports a single mode.
    ///
    /// # Errors
    ///
    /// - [`Error::NotRegistered`] for an unknown key
    /// - the factory's own failure
    /// - probe failures for dynamic backends
    pub fn create_store<I>(&self, key: impl Into<StoreKey>, args: I) -> Result<EnhancedStore>
    where
        I: IntoIterator<Item = Value>,
    {
        let key = key.into();
        let factory = self.lookup(&key)?;
        let args: StoreArgs = args.into_iter().collect();

        let backend = match factory.construct(&args) {
            Ok(backend) => backend,
            Err(construct_err) => {
                tracing::debug!(
                    key = %key,
                    error = %construct_err,
                    "Construction failed, calling factory"
                );
                factory
                    .call(&args)
                    .map_err(|call_err| Error::construction(construct_err, call_err))?
            }
        };

        let store = enhance(backend)?;
        tracing::debug!(key = %key, mode = %store.mode(), "Created store");
        Ok(store)
    }
}

impl fmt::Debug for FactoryRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FactoryRegistry")
            .field("keys", &self.keys())
            .finish()
    }
}
