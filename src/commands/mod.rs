//! CLI command implementations for kvstash.
//!
//! - [`item`] - Single-entry edits (get/set/remove/clear)
//! - [`list`] - Whole-namespace views (len/keys/dump)

pub mod item;
pub mod list;

use anyhow::{Context, Result};
use kvstash::{EnhancedStore, constants};
use serde_json::Value;

/// Initialize stdout logging. `RUST_LOG` overrides the default `warn` level.
pub fn init_stdout_logging() {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Constructor arguments for the store registered under `store`.
fn store_args(store: &str, db: &str, ns: &str) -> Vec<Value> {
    if store == constants::INDEXEDDB {
        vec![Value::from(db), Value::from(ns)]
    } else {
        Vec::new()
    }
}

/// Open the store registered under `store`.
pub fn open(store: &str, db: &str, ns: &str) -> Result<EnhancedStore> {
    kvstash::create_store(store, store_args(store, db, ns))
        .with_context(|| format!("Failed to open store '{store}'"))
}

/// Parse a command-line value as JSON, falling back to a plain string.
pub fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

/// Render a value for output. Strings print without quotes.
pub fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
