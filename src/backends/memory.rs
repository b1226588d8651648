//! In-memory storage backend.
//!
//! Provides a fast, non-persistent namespace kept in insertion order.
//! Handles cloned from the same namespace share its entries.

use dashmap::DashMap;
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use crate::constants::DEFAULT_NAMESPACE;
use crate::error::Result;
use crate::registry::{ConstructibleStore, StoreArgs};
use crate::store::{Backend, SyncStore, Visitor};

type Entries = Arc<Mutex<IndexMap<String, Value>>>;

/// In-memory key-value store.
///
/// All data is lost when the process exits. `keys()` and `iterate` follow
/// insertion order; overwriting a key keeps its position.
#[derive(Clone, Default)]
pub struct MemoryStore {
    entries: Entries,
}

impl MemoryStore {
    /// Creates a store over a fresh, private namespace.
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a namespace of the process-wide pool.
    pub fn pooled(name: &str, store_name: &str) -> Self {
        shared_pool().get_or_create(name, store_name)
    }
}

impl SyncStore for MemoryStore {
    fn get_item(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: Value) -> Result<Value> {
        self.entries.lock().insert(key.to_string(), value.clone());
        Ok(value)
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        self.entries.lock().shift_remove(key);
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.entries.lock().clear();
        Ok(())
    }

    fn length(&self) -> Result<usize> {
        Ok(self.entries.lock().len())
    }

    fn key(&self, index: usize) -> Result<Option<String>> {
        Ok(self
            .entries
            .lock()
            .get_index(index)
            .map(|(key, _)| key.clone()))
    }

    fn keys(&self) -> Result<Vec<String>> {
        Ok(self.entries.lock().keys().cloned().collect())
    }

    fn iterate(&self, visitor: Visitor<'_>) -> Result<()> {
        // Snapshot so the visitor may call back into the store.
        let snapshot: Vec<(String, Value)> = self
            .entries
            .lock()
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        for (index, (key, value)) in snapshot.into_iter().enumerate() {
            visitor(value, key, index);
        }
        Ok(())
    }
}

/// Built as `memory()`, `memory(name)` or `memory(name, store_name)`.
///
/// Without names every construction shares the `default/default` namespace.
impl ConstructibleStore for MemoryStore {
    fn construct(args: &StoreArgs) -> Result<Self> {
        let name = args.opt_str_at(0)?.unwrap_or(DEFAULT_NAMESPACE);
        let store_name = args.opt_str_at(1)?.unwrap_or(DEFAULT_NAMESPACE);
        Ok(Self::pooled(name, store_name))
    }

    fn into_backend(self) -> Backend {
        Backend::sync(self)
    }
}

/// Two-level namespace manager: `name` → `store_name` → entries.
#[derive(Default)]
pub struct MemoryPool {
    namespaces: DashMap<String, HashMap<String, Entries>>,
}

impl MemoryPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a handle on the namespace, creating it on first use.
    pub fn get_or_create(&self, name: &str, store_name: &str) -> MemoryStore {
        let mut stores = self.namespaces.entry(name.to_string()).or_default();
        let entries = stores.entry(store_name.to_string()).or_default();
        MemoryStore {
            entries: Arc::clone(entries),
        }
    }

    /// Returns true if the namespace has been created.
    pub fn contains(&self, name: &str, store_name: &str) -> bool {
        self.namespaces
            .get(name)
            .is_some_and(|stores| stores.contains_key(store_name))
    }
}

static SHARED_POOL: Lazy<MemoryPool> = Lazy::new(MemoryPool::new);

/// The process-wide pool behind the built-in `memory` key.
pub fn shared_pool() -> &'static MemoryPool {
    &SHARED_POOL
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_get_set() {
        let store = MemoryStore::new();

        let echoed = store.set_item("key1", json!("value1")).unwrap();
        assert_eq!(echoed, json!("value1"));
        assert_eq!(store.get_item("key1").unwrap(), Some(json!("value1")));
    }

    #[test]
    fn test_get_nonexistent() {
        let store = MemoryStore::new();
        assert_eq!(store.get_item("nonexistent").unwrap(), None);
    }

    #[test]
    fn test_remove_keeps_order() {
        let store = MemoryStore::new();
        store.set_item("a", json!(1)).unwrap();
        store.set_item("b", json!(2)).unwrap();
        store.set_item("c", json!(3)).unwrap();

        store.remove_item("b").unwrap();
        assert_eq!(store.keys().unwrap(), vec!["a", "c"]);
        assert_eq!(store.key(1).unwrap(), Some("c".to_string()));
        assert_eq!(store.key(2).unwrap(), None);
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let store = MemoryStore::new();
        store.set_item("a", json!(1)).unwrap();
        store.remove_item("missing").unwrap();
        assert_eq!(store.length().unwrap(), 1);
    }

    #[test]
    fn test_overwrite_keeps_position() {
        let store = MemoryStore::new();
        store.set_item("a", json!(1)).unwrap();
        store.set_item("b", json!(2)).unwrap();
        store.set_item("a", json!(10)).unwrap();

        assert_eq!(store.keys().unwrap(), vec!["a", "b"]);
        assert_eq!(store.get_item("a").unwrap(), Some(json!(10)));
    }

    #[test]
    fn test_iterate_insertion_order() {
        let store = MemoryStore::new();
        store.set_item("a", json!("x")).unwrap();
        store.set_item("b", json!("y")).unwrap();
        store.set_item("c", json!("z")).unwrap();

        let mut seen = Vec::new();
        store
            .iterate(&mut |value, key, index| seen.push((key, value, index)))
            .unwrap();

        assert_eq!(
            seen,
            vec![
                ("a".to_string(), json!("x"), 0),
                ("b".to_string(), json!("y"), 1),
                ("c".to_string(), json!("z"), 2),
            ]
        );
    }

    #[test]
    fn test_iterate_visitor_may_write() {
        let store = MemoryStore::new();
        store.set_item("a", json!(1)).unwrap();

        let writer = store.clone();
        store
            .iterate(&mut |value, key, _| {
                writer.set_item(&format!("{key}-copy"), value).unwrap();
            })
            .unwrap();

        assert_eq!(store.length().unwrap(), 2);
    }

    #[test]
    fn test_clear() {
        let store = MemoryStore::new();
        store.set_item("a", json!(1)).unwrap();
        store.set_item("b", json!(2)).unwrap();

        store.clear().unwrap();
        assert_eq!(store.length().unwrap(), 0);
        assert!(store.keys().unwrap().is_empty());
    }

    #[test]
    fn test_pool_shares_namespace() {
        let pool = MemoryPool::new();
        let first = pool.get_or_create("app", "users");
        let second = pool.get_or_create("app", "users");
        let other = pool.get_or_create("app", "sessions");

        first.set_item("id", json!(7)).unwrap();
        assert_eq!(second.get_item("id").unwrap(), Some(json!(7)));
        assert_eq!(other.get_item("id").unwrap(), None);
        assert!(pool.contains("app", "users"));
        assert!(!pool.contains("other", "users"));
    }

    #[test]
    fn test_fresh_stores_are_private() {
        let first = MemoryStore::new();
        let second = MemoryStore::new();

        first.set_item("k", json!(true)).unwrap();
        assert_eq!(second.get_item("k").unwrap(), None);
    }

    #[test]
    fn test_construct_from_names() {
        let args = StoreArgs::from(vec![json!("memory-construct-test"), json!("ns")]);
        let store = MemoryStore::construct(&args).unwrap();
        store.set_item("k", json!(1)).unwrap();

        let again = MemoryStore::pooled("memory-construct-test", "ns");
        assert_eq!(again.get_item("k").unwrap(), Some(json!(1)));
    }

    #[test]
    fn test_construct_rejects_non_string_name() {
        let args = StoreArgs::from(vec![json!(42)]);
        assert!(MemoryStore::construct(&args).is_err());
    }
}
