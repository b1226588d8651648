//! JSON-encoding store over a text substrate.
//!
//! [`WebStore`] serializes values to JSON text on write and parses them on
//! read. Text that no longer parses reads as missing (with a warning) rather
//! than failing the read; write failures always propagate.

use once_cell::sync::Lazy;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;

use super::text::{FileTextStorage, SessionTextStorage, TextStorage, UnavailableStorage};
use crate::error::Result;
use crate::store::{Backend, SyncStore, Visitor};

/// Store over any [`TextStorage`].
pub struct WebStore<T: TextStorage> {
    storage: Arc<T>,
}

/// Persistent store backed by a JSON file.
pub type LocalStore = WebStore<FileTextStorage>;

/// Store living as long as the process.
pub type SessionStore = WebStore<SessionTextStorage>;

impl<T: TextStorage> WebStore<T> {
    pub fn new(storage: Arc<T>) -> Self {
        Self { storage }
    }

    /// The underlying substrate.
    pub fn substrate(&self) -> &Arc<T> {
        &self.storage
    }
}

impl<T: TextStorage> Clone for WebStore<T> {
    fn clone(&self) -> Self {
        Self {
            storage: Arc::clone(&self.storage),
        }
    }
}

impl LocalStore {
    /// Opens a local store over the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened (see [`FileTextStorage::open`]).
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::new(Arc::new(FileTextStorage::open(path)?)))
    }
}

impl<T: TextStorage> SyncStore for WebStore<T> {
    fn get_item(&self, key: &str) -> Result<Option<Value>> {
        let Some(text) = self.storage.get(key) else {
            return Ok(None);
        };
        match serde_json::from_str(&text) {
            Ok(value) => Ok(Some(value)),
            Err(err) => {
                tracing::warn!(key, error = %err, "Failed to parse stored value");
                Ok(None)
            }
        }
    }

    fn set_item(&self, key: &str, value: Value) -> Result<Value> {
        let text = serde_json::to_string(&value)?;
        self.storage.set(key, text)?;
        Ok(value)
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        self.storage.remove(key)
    }

    fn clear(&self) -> Result<()> {
        self.storage.clear()
    }

    fn length(&self) -> Result<usize> {
        Ok(self.storage.len())
    }

    fn key(&self, index: usize) -> Result<Option<String>> {
        Ok(self.storage.key(index))
    }

    fn keys(&self) -> Result<Vec<String>> {
        Ok((0..self.storage.len())
            .filter_map(|index| self.storage.key(index))
            .collect())
    }

    /// Visits entries in `keys()` order. Entries that read as missing are
    /// skipped; ordinals stay the key's position in that enumeration.
    fn iterate(&self, visitor: Visitor<'_>) -> Result<()> {
        for (index, key) in self.keys()?.into_iter().enumerate() {
            if let Some(value) = self.get_item(&key)? {
                visitor(value, key, index);
            }
        }
        Ok(())
    }
}

/// Opens the local store, degrading to [`UnavailableStorage`] when the file
/// cannot be opened.
pub fn open_local_or_degrade<P: AsRef<Path>>(path: P) -> Backend {
    let path = path.as_ref();
    match LocalStore::open(path) {
        Ok(store) => Backend::sync(store),
        Err(err) => {
            tracing::warn!(
                path = %path.display(),
                error = %err,
                "Local storage unavailable, reads will be empty and writes dropped"
            );
            Backend::sync(WebStore::new(Arc::new(UnavailableStorage)))
        }
    }
}

static SESSION: Lazy<Arc<SessionTextStorage>> = Lazy::new(|| Arc::new(SessionTextStorage::new()));

/// Handle on the process-wide session namespace.
pub fn session_store() -> SessionStore {
    WebStore::new(Arc::clone(&SESSION))
}
