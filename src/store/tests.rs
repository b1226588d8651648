//! Tests for classification, probing and the enhancement decorator.

use super::*;
use crate::backends::MemoryStore;
use crate::error::Error;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};

fn immediate_unit() -> Handler {
    Handler::immediate(|_| Ok(Reply::Unit))
}

fn deferred_unit() -> Handler {
    Handler::deferred(|_| Box::pin(async { Ok::<_, Error>(Reply::Unit) }))
}

/// A table with `getter` for `getItem` and `rest` for everything else.
fn table(getter: Handler, rest: &Handler) -> DynamicStore {
    Method::ALL
        .into_iter()
        .skip(1)
        .fold(DynamicStore::new().with(Method::GetItem, getter), |store, method| {
            store.with(method, rest.clone())
        })
}

/// Async store over a memory store that fails on selected keys.
struct FlakyAsync {
    inner: MemoryStore,
    failing: Vec<&'static str>,
}

impl FlakyAsync {
    fn new(failing: Vec<&'static str>) -> Self {
        Self {
            inner: MemoryStore::new(),
            failing,
        }
    }

    fn check(&self, key: &str) -> crate::Result<()> {
        if self.failing.iter().any(|failing| *failing == key) {
            return Err(anyhow::anyhow!("{key} is unavailable").into());
        }
        Ok(())
    }
}

#[async_trait]
impl AsyncStore for FlakyAsync {
    async fn get_item(&self, key: &str) -> crate::Result<Option<Value>> {
        self.check(key)?;
        self.inner.get_item(key)
    }

    async fn set_item(&self, key: &str, value: Value) -> crate::Result<Value> {
        self.inner.set_item(key, value)
    }

    async fn remove_item(&self, key: &str) -> crate::Result<()> {
        self.check(key)?;
        self.inner.remove_item(key)
    }

    async fn clear(&self) -> crate::Result<()> {
        self.inner.clear()
    }

    async fn length(&self) -> crate::Result<usize> {
        self.inner.length()
    }

    async fn key(&self, index: usize) -> crate::Result<Option<String>> {
        self.inner.key(index)
    }

    async fn keys(&self) -> crate::Result<Vec<String>> {
        self.inner.keys()
    }

    async fn iterate(
        &self,
        visitor: &mut (dyn FnMut(Value, String, usize) + Send),
    ) -> crate::Result<()> {
        self.inner.iterate(visitor)
    }
}

// ============================================================================
// Classification
// ============================================================================

#[test]
fn test_classify_all_immediate() {
    let store = table(immediate_unit(), &immediate_unit());
    assert_eq!(validate::classify(&store).unwrap(), Mode::Sync);
}

#[test]
fn test_classify_all_deferred() {
    let store = table(deferred_unit(), &deferred_unit());
    assert_eq!(validate::classify(&store).unwrap(), Mode::Async);
}

#[test]
fn test_classify_mixed_names_set_item() {
    let store = table(deferred_unit(), &immediate_unit());

    let err = validate::classify(&store).unwrap_err();
    assert!(matches!(
        err,
        Error::InconsistentMethod {
            method: Method::SetItem,
            expected: Mode::Async,
        }
    ));
    assert!(err.to_string().contains("setItem"));
}

#[test]
fn test_classify_reports_first_mismatch_in_order() {
    let store = table(immediate_unit(), &immediate_unit())
        .with(Method::Keys, deferred_unit())
        .with(Method::Clear, deferred_unit());

    let err = validate::classify(&store).unwrap_err();
    assert!(matches!(
        err,
        Error::InconsistentMethod {
            method: Method::Clear,
            ..
        }
    ));
}

#[test]
fn test_classify_missing_method() {
    let mut store = table(immediate_unit(), &immediate_unit());
    store.remove(Method::Keys);

    let err = validate::classify(&store).unwrap_err();
    assert!(matches!(err, Error::MissingMethod { method: Method::Keys }));
    assert!(err.to_string().contains("keys"));
    assert!(err.is_validation());
}

#[test]
fn test_classify_empty_table_misses_get_item() {
    let err = validate::classify(&DynamicStore::new()).unwrap_err();
    assert!(matches!(
        err,
        Error::MissingMethod {
            method: Method::GetItem
        }
    ));
}

#[test]
fn test_classify_typed_backends() {
    let sync = Backend::sync(MemoryStore::new());
    let asynchronous = Backend::asynchronous(FlakyAsync::new(vec![]));

    assert_eq!(validate::classify_backend(&sync).unwrap(), Mode::Sync);
    assert_eq!(
        validate::classify_backend(&asynchronous).unwrap(),
        Mode::Async
    );
}

// ============================================================================
// Probing
// ============================================================================

#[test]
fn test_probe_deferred_does_not_run() {
    let polled = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&polled);
    let getter = Handler::deferred(move |_| {
        let counter = Arc::clone(&counter);
        Box::pin(async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok::<_, Error>(Reply::Value(None))
        })
    });
    let store = table(getter, &deferred_unit());

    assert_eq!(probe(&store).unwrap(), Mode::Async);
    assert_eq!(polled.load(Ordering::SeqCst), 0);
}

#[test]
fn test_probe_immediate_reads_sentinel_only() {
    let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let log = Arc::clone(&seen);
    let getter = Handler::immediate(move |call| {
        if let Call::GetItem(key) = call {
            log.lock().push(key);
        }
        Ok(Reply::Value(None))
    });
    let store = table(getter, &immediate_unit());

    assert_eq!(probe(&store).unwrap(), Mode::Sync);
    assert_eq!(*seen.lock(), vec![PROBE_KEY.to_string()]);
}

#[test]
fn test_probe_without_get_item() {
    let err = probe(&DynamicStore::new()).unwrap_err();
    assert!(matches!(
        err,
        Error::MissingMethod {
            method: Method::GetItem
        }
    ));
}

// ============================================================================
// Enhancement
// ============================================================================

#[test]
fn test_enhance_typed_sync() {
    let store = enhance(Backend::sync(MemoryStore::new())).unwrap();
    assert_eq!(store.mode(), Mode::Sync);
    assert!(store.as_sync().is_some());
    assert!(store.as_async().is_none());
}

#[test]
fn test_enhance_as_rejects_contradiction() {
    let err = enhance_as(Backend::sync(MemoryStore::new()), Mode::Async).unwrap_err();
    assert!(matches!(
        err,
        Error::WrongMode {
            expected: Mode::Async
        }
    ));
}

#[test]
fn test_into_sync_on_async_store() {
    let store = enhance(Backend::asynchronous(FlakyAsync::new(vec![]))).unwrap();
    assert!(matches!(
        store.into_sync(),
        Err(Error::WrongMode {
            expected: Mode::Sync
        })
    ));
}

#[test]
fn test_dynamic_sync_round_trip() {
    let backing = MemoryStore::new();
    let dynamic = DynamicStore::from_sync(Arc::new(backing.clone()));
    let store = enhance(Backend::Dynamic(dynamic))
        .unwrap()
        .into_sync()
        .unwrap();

    assert_eq!(store.set_item("name", json!("John")).unwrap(), json!("John"));
    assert_eq!(store.get_item("name").unwrap(), Some(json!("John")));
    assert_eq!(store.keys().unwrap(), vec!["name"]);
    assert_eq!(store.key(0).unwrap(), Some("name".to_string()));
    assert_eq!(backing.length().unwrap(), 1);

    let mut visited = Vec::new();
    store
        .iterate(&mut |value, key, index| visited.push((key, value, index)))
        .unwrap();
    assert_eq!(visited, vec![("name".to_string(), json!("John"), 0)]);

    store.clear().unwrap();
    assert_eq!(store.length().unwrap(), 0);
}

#[tokio::test]
async fn test_dynamic_async_round_trip() {
    let dynamic = DynamicStore::from_async(Arc::new(FlakyAsync::new(vec![])));
    assert_eq!(validate::classify(&dynamic).unwrap(), Mode::Async);

    let store = enhance(Backend::Dynamic(dynamic))
        .unwrap()
        .into_async()
        .unwrap();

    assert_eq!(store.set_item("x", json!(1)).await.unwrap(), json!(1));
    assert_eq!(store.get_item("x").await.unwrap(), Some(json!(1)));
    assert_eq!(store.length().await.unwrap(), 1);
    store.remove_item("x").await.unwrap();
    assert!(!store.has_item("x").await.unwrap());
}

#[test]
fn test_wrong_reply_is_convention_error() {
    let store = table(Handler::immediate(|_| Ok(Reply::Count(3))), &immediate_unit());
    let store = enhance(Backend::Dynamic(store))
        .unwrap()
        .into_sync()
        .unwrap();

    let err = store.get_item("k").unwrap_err();
    assert!(matches!(
        err,
        Error::Convention {
            method: Method::GetItem,
            ..
        }
    ));
}

#[test]
fn test_sync_adapter_rejects_deferred_handler() {
    let store = table(Handler::immediate(|_| Ok(Reply::Value(None))), &immediate_unit())
        .with(Method::Iterate, deferred_unit());

    // Probing only looks at getItem, so the table passes as sync.
    let store = enhance(Backend::Dynamic(store))
        .unwrap()
        .into_sync()
        .unwrap();

    let err = store.iterate(&mut |_, _, _| {}).unwrap_err();
    assert!(matches!(
        err,
        Error::Convention {
            method: Method::Iterate,
            ..
        }
    ));
}

#[test]
fn test_derived_ops_see_live_base() {
    let backing = MemoryStore::new();
    let store = enhance(Backend::sync(backing.clone()))
        .unwrap()
        .into_sync()
        .unwrap();

    assert!(!store.has_item("late").unwrap());
    backing.set_item("late", json!(42)).unwrap();
    assert!(store.has_item("late").unwrap());
    assert_eq!(
        store.get_item_or_default("late", json!(0)).unwrap(),
        json!(42)
    );
}

#[test]
fn test_get_item_or_default_never_writes() {
    let store = enhance(Backend::sync(MemoryStore::new()))
        .unwrap()
        .into_sync()
        .unwrap();

    assert_eq!(
        store.get_item_or_default("absent", json!("fallback")).unwrap(),
        json!("fallback")
    );
    assert_eq!(store.length().unwrap(), 0);
}

#[test]
fn test_sync_bulk_operations() {
    let store = enhance(Backend::sync(MemoryStore::new()))
        .unwrap()
        .into_sync()
        .unwrap();
    store.set_item("a", json!(1)).unwrap();
    store.set_item("c", json!(3)).unwrap();

    assert_eq!(
        store.get_items(&["c", "b", "a"]).unwrap(),
        vec![Some(json!(3)), None, Some(json!(1))]
    );

    store.remove_items(&["a", "b"]).unwrap();
    assert_eq!(store.keys().unwrap(), vec!["c"]);
}

#[tokio::test]
async fn test_async_bulk_operations() {
    let store = enhance(Backend::asynchronous(FlakyAsync::new(vec![])))
        .unwrap()
        .into_async()
        .unwrap();
    store.set_item("a", json!("x")).await.unwrap();
    store.set_item("b", json!("y")).await.unwrap();

    let values = store.get_items(&["b", "missing", "a"]).await.unwrap();
    assert_eq!(values, vec![Some(json!("y")), None, Some(json!("x"))]);

    store
        .remove_items(&["a".to_string(), "b".to_string()])
        .await
        .unwrap();
    assert_eq!(store.length().await.unwrap(), 0);
}

#[tokio::test]
async fn test_async_remove_items_is_best_effort() {
    let flaky = FlakyAsync::new(vec!["bad", "worse"]);
    flaky.inner.set_item("a", json!(1)).unwrap();
    flaky.inner.set_item("bad", json!(2)).unwrap();
    flaky.inner.set_item("c", json!(3)).unwrap();
    let backing = flaky.inner.clone();

    let store = enhance(Backend::asynchronous(flaky))
        .unwrap()
        .into_async()
        .unwrap();

    let err = store
        .remove_items(&["a", "bad", "worse", "c"])
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "bad is unavailable");

    // Removals that succeeded stay applied.
    assert_eq!(backing.keys().unwrap(), vec!["bad"]);
}

/// Async store whose `get_item` and `remove_item` only finish once `n`
/// of them are in flight together.
struct Rendezvous {
    inner: MemoryStore,
    barrier: tokio::sync::Barrier,
}

impl Rendezvous {
    fn new(n: usize) -> Self {
        Self {
            inner: MemoryStore::new(),
            barrier: tokio::sync::Barrier::new(n),
        }
    }
}

#[async_trait]
impl AsyncStore for Rendezvous {
    async fn get_item(&self, key: &str) -> crate::Result<Option<Value>> {
        self.barrier.wait().await;
        self.inner.get_item(key)
    }

    async fn set_item(&self, key: &str, value: Value) -> crate::Result<Value> {
        self.inner.set_item(key, value)
    }

    async fn remove_item(&self, key: &str) -> crate::Result<()> {
        self.barrier.wait().await;
        self.inner.remove_item(key)
    }

    async fn clear(&self) -> crate::Result<()> {
        self.inner.clear()
    }

    async fn length(&self) -> crate::Result<usize> {
        self.inner.length()
    }

    async fn key(&self, index: usize) -> crate::Result<Option<String>> {
        self.inner.key(index)
    }

    async fn keys(&self) -> crate::Result<Vec<String>> {
        self.inner.keys()
    }

    async fn iterate(
        &self,
        visitor: &mut (dyn FnMut(Value, String, usize) + Send),
    ) -> crate::Result<()> {
        self.inner.iterate(visitor)
    }
}

#[tokio::test]
async fn test_async_bulk_operations_dispatch_concurrently() {
    let rendezvous = Rendezvous::new(3);
    rendezvous.inner.set_item("a", json!(1)).unwrap();
    rendezvous.inner.set_item("b", json!(2)).unwrap();
    let backing = rendezvous.inner.clone();

    let store = enhance(Backend::asynchronous(rendezvous))
        .unwrap()
        .into_async()
        .unwrap();
    let limit = std::time::Duration::from_secs(2);

    // Sequential dispatch would park forever on the first call.
    let values = tokio::time::timeout(limit, store.get_items(&["a", "b", "c"]))
        .await
        .expect("get_items awaited a call before issuing the rest")
        .unwrap();
    assert_eq!(values, vec![Some(json!(1)), Some(json!(2)), None]);

    tokio::time::timeout(limit, store.remove_items(&["a", "b", "c"]))
        .await
        .expect("remove_items awaited a call before issuing the rest")
        .unwrap();
    assert_eq!(backing.length().unwrap(), 0);
}

#[tokio::test]
async fn test_async_get_items_reports_failure() {
    let store = enhance(Backend::asynchronous(FlakyAsync::new(vec!["bad"])))
        .unwrap()
        .into_async()
        .unwrap();

    let err = store.get_items(&["ok", "bad"]).await.unwrap_err();
    assert!(matches!(err, Error::Backend(_)));
}

// ============================================================================
// Typed fields
// ============================================================================

const NAME: Field<String> = Field::new("name");
const AGE: Field<u32> = Field::new("age");

#[test]
fn test_typed_fields() {
    let store = enhance(Backend::sync(MemoryStore::new()))
        .unwrap()
        .into_sync()
        .unwrap();

    store.set_field(&NAME, "John".to_string()).unwrap();
    assert_eq!(store.get_field(&NAME).unwrap(), Some("John".to_string()));
    assert_eq!(store.get_field_or(&AGE, 18).unwrap(), 18);
    assert_eq!(store.get_item("name").unwrap(), Some(json!("John")));
}

#[test]
fn test_typed_field_mismatch() {
    let store = enhance(Backend::sync(MemoryStore::new()))
        .unwrap()
        .into_sync()
        .unwrap();
    store.set_item("age", json!("old")).unwrap();

    assert!(matches!(
        store.get_field(&AGE),
        Err(Error::Serialization(_))
    ));
}

#[tokio::test]
async fn test_typed_fields_async() {
    let store = enhance(Backend::asynchronous(FlakyAsync::new(vec![])))
        .unwrap()
        .into_async()
        .unwrap();

    assert_eq!(store.set_field(&AGE, 25).await.unwrap(), 25);
    assert_eq!(store.get_field(&AGE).await.unwrap(), Some(25));
    assert_eq!(store.get_field_or(&NAME, "anon".to_string()).await.unwrap(), "anon");
}
