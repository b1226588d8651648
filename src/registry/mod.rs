//! Named catalogs of storage backends.
//!
//! Two addressing schemes are offered:
//!
//! - [`FactoryRegistry`] maps a key to a [`StoreFactory`]. Nothing is checked
//!   at registration; the factory runs, and its product is enhanced, when
//!   [`FactoryRegistry::create_store`] is called.
//! - [`TypedRegistry`] validates and enhances a backend as soon as it is
//!   registered and files it under its sync or async partition.
//!
//! Both are plain values. [`global`] holds the process-wide defaults with the
//! built-in backends preloaded.

mod factory;
pub mod global;
mod typed;


use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

pub use factory::{
    Callable, ConstructibleStore, Constructor, FactoryRegistry, StoreArgs, StoreFactory, callable,
};
pub use typed::TypedRegistry;

static NEXT_SYMBOL: AtomicU64 = AtomicU64::new(0);

/// A process-unique key. Two symbols are equal only if one is a clone of the
/// other, whatever their descriptions.
#[derive(Clone)]
pub struct Symbol {
    id: u64,
    description: Arc<str>,
}

impl Symbol {
    pub fn new(description: &str) -> Self {
        Self {
            id: NEXT_SYMBOL.fetch_add(1, Ordering::Relaxed),
            description: Arc::from(description),
        }
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}

impl PartialEq for Symbol {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Symbol {}

impl std::hash::Hash for Symbol {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({}#{})", self.description, self.id)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({})", self.description)
    }
}

/// Key under which a backend is registered.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StoreKey {
    Name(String),
    Symbol(Symbol),
    Index(i64),
}

impl fmt::Display for StoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => f.write_str(name),
            Self::Symbol(symbol) => write!(f, "{symbol}"),
            Self::Index(index) => write!(f, "{index}"),
        }
    }
}

impl From<&str> for StoreKey {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl From<String> for StoreKey {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

impl From<i64> for StoreKey {
    fn from(index: i64) -> Self {
        Self::Index(index)
    }
}

impl From<Symbol> for StoreKey {
    fn from(symbol: Symbol) -> Self {
        Self::Symbol(symbol)
    }
}

impl From<&Symbol> for StoreKey {
    fn from(symbol: &Symbol) -> Self {
        Self::Symbol(symbol.clone())
    }
}
