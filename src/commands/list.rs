//! Whole-namespace commands.
//!
//! - `kvstash len` - Number of entries
//! - `kvstash keys` - One key per line
//! - `kvstash dump` - `index key value` per entry, via `iterate`

use anyhow::{Context, Result};
use kvstash::EnhancedStore;
use serde_json::Value;

use super::render;

/// Execute `len`.
pub async fn len(store: &EnhancedStore) -> Result<()> {
    let count = match store {
        EnhancedStore::Sync(store) => store.length(),
        EnhancedStore::Async(store) => store.length().await,
    }
    .context("Failed to count entries")?;

    println!("{count}");
    Ok(())
}

/// Execute `keys`.
pub async fn keys(store: &EnhancedStore) -> Result<()> {
    let keys = match store {
        EnhancedStore::Sync(store) => store.keys(),
        EnhancedStore::Async(store) => store.keys().await,
    }
    .context("Failed to list keys")?;

    for key in keys {
        println!("{key}");
    }
    Ok(())
}

/// Execute `dump`.
pub async fn dump(store: &EnhancedStore) -> Result<()> {
    let mut print = |value: Value, key: String, index: usize| {
        println!("{index}\t{key}\t{}", render(&value));
    };

    let visited = match store {
        EnhancedStore::Sync(store) => store.iterate(&mut print),
        EnhancedStore::Async(store) => store.iterate(&mut print).await,
    };
    visited.context("Failed to iterate store")
}
