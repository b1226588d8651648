//! String-only storage substrates for the local and session backends.
//!
//! A substrate stores text under text keys and nothing else; the
//! [`WebStore`](super::WebStore) layer on top handles value encoding.
//! Reads are infallible. Writes may fail and must report it.

use indexmap::IndexMap;
use parking_lot::Mutex;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use crate::error::{Error, Result};

/// A text key/value substrate with positional key access.
pub trait TextStorage: Send + Sync + 'static {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&self, key: &str, value: String) -> Result<()>;

    fn remove(&self, key: &str) -> Result<()>;

    fn clear(&self) -> Result<()>;

    /// Key at `index` in the substrate's enumeration order.
    fn key(&self, index: usize) -> Option<String>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Persistent substrate backed by one JSON file.
///
/// The whole namespace is held in memory and written through on every
/// mutation. Writes go to a temporary file in the same directory which then
/// replaces the target, so a crash never leaves a half-written file. A failed
/// write leaves both the file and the in-memory view unchanged.
pub struct FileTextStorage {
    path: PathBuf,
    entries: Mutex<IndexMap<String, String>>,
}

impl FileTextStorage {
    /// Opens or creates the substrate file.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The parent directory cannot be created
    /// - An existing file cannot be read or is not a JSON string map
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        fs::create_dir_all(parent_dir(&path))
            .map_err(|e| Error::io(format!("creating {}", parent_dir(&path).display()), e))?;

        let entries: IndexMap<String, String> = if path.exists() {
            let content = fs::read_to_string(&path)
                .map_err(|e| Error::io(format!("reading {}", path.display()), e))?;
            if content.trim().is_empty() {
                IndexMap::new()
            } else {
                serde_json::from_str(&content)?
            }
        } else {
            IndexMap::new()
        };

        tracing::debug!(
            path = %path.display(),
            entries = entries.len(),
            "Opened local storage file"
        );

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, entries: &IndexMap<String, String>) -> Result<()> {
        let dir = parent_dir(&self.path);
        let context = || format!("writing {}", self.path.display());

        let mut tmp = NamedTempFile::new_in(dir).map_err(|e| Error::io(context(), e))?;
        serde_json::to_writer(&mut tmp, entries)?;
        tmp.flush().map_err(|e| Error::io(context(), e))?;
        tmp.persist(&self.path)
            .map_err(|e| Error::io(context(), e.error))?;
        Ok(())
    }

    /// Applies `change` to a copy, persists it, then publishes it.
    fn mutate(&self, change: impl FnOnce(&mut IndexMap<String, String>)) -> Result<()> {
        let mut entries = self.entries.lock();
        let mut next = entries.clone();
        change(&mut next);
        self.persist(&next)?;
        *entries = next;
        Ok(())
    }
}

fn parent_dir(path: &Path) -> &Path {
    path.parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or(Path::new("."))
}

impl TextStorage for FileTextStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: String) -> Result<()> {
        self.mutate(|entries| {
            entries.insert(key.to_string(), value);
        })
    }

    fn remove(&self, key: &str) -> Result<()> {
        if !self.entries.lock().contains_key(key) {
            return Ok(());
        }
        self.mutate(|entries| {
            entries.shift_remove(key);
        })
    }

    fn clear(&self) -> Result<()> {
        self.mutate(IndexMap::clear)
    }

    fn key(&self, index: usize) -> Option<String> {
        self.entries
            .lock()
            .get_index(index)
            .map(|(key, _)| key.clone())
    }

    fn len(&self) -> usize {
        self.entries.lock().len()
    }
}

/// Substrate that lives as long as the process.
#[derive(Default)]
pub struct SessionTextStorage {
    entries: Mutex<IndexMap<String, String>>,
}

impl SessionTextStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TextStorage for SessionTextStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: String) -> Result<()> {
        self.entries.lock().insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries.lock().shift_remove(key);
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.entries.lock().clear();
        Ok(())
    }

    fn key(&self, index: usize) -> Option<String> {
        self.entries
            .lock()
            .get_index(index)
            .map(|(key, _)| key.clone())
    }

    fn len(&self) -> usize {
        self.entries.lock().len()
    }
}

/// Stand-in used when no persistent substrate is available.
///
/// Reads yield nothing, `len` is 0 and writes are dropped. Stores built on
/// it degrade instead of failing.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableStorage;

impl TextStorage for UnavailableStorage {
    fn get(&self, _key: &str) -> Option<String> {
        None
    }

    fn set(&self, _key: &str, _value: String) -> Result<()> {
        Ok(())
    }

    fn remove(&self, _key: &str) -> Result<()> {
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        Ok(())
    }

    fn key(&self, _index: usize) -> Option<String> {
        None
    }

    fn len(&self) -> usize {
        0
    }
}
