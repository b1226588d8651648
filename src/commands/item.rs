//! Single-entry commands.
//!
//! - `kvstash get <key>` - Print a value, fail when absent
//! - `kvstash set <key> <value>` - Store a value
//! - `kvstash remove <key>...` - Remove keys
//! - `kvstash clear` - Remove every entry

use anyhow::{Context, Result};
use kvstash::EnhancedStore;

use super::{parse_value, render};

/// Execute `get`.
pub async fn get(store: &EnhancedStore, key: &str) -> Result<()> {
    let value = match store {
        EnhancedStore::Sync(store) => store.get_item(key),
        EnhancedStore::Async(store) => store.get_item(key).await,
    }
    .with_context(|| format!("Failed to read '{key}'"))?;

    match value {
        Some(value) => {
            println!("{}", render(&value));
            Ok(())
        }
        None => anyhow::bail!("Key '{key}' not found"),
    }
}

/// Execute `set`.
pub async fn set(store: &EnhancedStore, key: &str, raw: &str) -> Result<()> {
    let value = parse_value(raw);
    let stored = match store {
        EnhancedStore::Sync(store) => store.set_item(key, value),
        EnhancedStore::Async(store) => store.set_item(key, value).await,
    };
    stored.with_context(|| format!("Failed to write '{key}'"))?;

    tracing::debug!(key, "Stored value");
    Ok(())
}

/// Execute `remove`.
pub async fn remove(store: &EnhancedStore, keys: &[String]) -> Result<()> {
    let removed = match store {
        EnhancedStore::Sync(store) => store.remove_items(keys),
        EnhancedStore::Async(store) => store.remove_items(keys).await,
    };
    removed.context("Failed to remove keys")
}

/// Execute `clear`.
pub async fn clear(store: &EnhancedStore) -> Result<()> {
    let cleared = match store {
        EnhancedStore::Sync(store) => store.clear(),
        EnhancedStore::Async(store) => store.clear().await,
    };
    cleared.context("Failed to clear store")
}
