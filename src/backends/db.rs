//! Transactional database backend on redb.
//!
//! Each database lives in `<db_dir>/<database_name>.redb`; each store is one
//! table in it holding JSON-encoded values. Physical connections are cached
//! per file for the whole process, while every [`DbStore`] is a cheap logical
//! handle that connects lazily on first use.

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use once_cell::sync::Lazy;
use redb::{Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition};
use serde_json::Value;
use std::ops::Bound;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::OnceCell;

use crate::config;
use crate::error::{Error, Result};
use crate::registry::{ConstructibleStore, StoreArgs};
use crate::store::{AsyncStore, Backend};

/// Open databases, one per file.
static CONNECTIONS: Lazy<DashMap<PathBuf, Arc<Database>>> = Lazy::new(DashMap::new);

fn table_def(name: &str) -> TableDefinition<'_, &'static str, &'static [u8]> {
    TableDefinition::new(name)
}

fn context<E: Into<redb::Error>>(context: &'static str) -> impl FnOnce(E) -> Error {
    move |e| Error::database(context, e)
}

fn join_error(err: tokio::task::JoinError) -> Error {
    Error::Backend(anyhow::Error::new(err).context("Task join error"))
}

/// Async store over one table of a redb database.
///
/// # Thread Safety
///
/// `DbStore` is `Clone`; clones share the lazily established connection.
/// redb serializes write transactions, so concurrent writers on the same file
/// queue rather than conflict.
#[derive(Clone)]
pub struct DbStore {
    path: PathBuf,
    store_name: String,
    conn: Arc<OnceCell<Arc<Database>>>,
    batch: usize,
}

impl DbStore {
    /// Creates a handle on `store_name` inside `<dir>/<database>.redb`.
    ///
    /// Nothing is opened yet; the first operation connects.
    ///
    /// # Errors
    ///
    /// Returns an error if either name is empty or the database name is not a
    /// plain file name.
    pub fn new<P: AsRef<Path>>(dir: P, database: &str, store_name: &str) -> Result<Self> {
        if database.is_empty()
            || database == "."
            || database == ".."
            || database.contains(['/', '\\'])
        {
            return Err(Error::invalid_argument(
                0,
                format!("'{database}' is not a valid database name"),
            ));
        }
        if store_name.is_empty() {
            return Err(Error::invalid_argument(1, "store name cannot be empty"));
        }

        Ok(Self {
            path: dir.as_ref().join(format!("{database}.redb")),
            store_name: store_name.to_string(),
            conn: Arc::new(OnceCell::new()),
            batch: crate::constants::DEFAULT_ITERATE_BATCH,
        })
    }

    /// Sets how many entries `iterate` reads per transaction.
    #[must_use]
    pub fn with_batch_size(mut self, batch: usize) -> Self {
        self.batch = batch.max(1);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn store_name(&self) -> &str {
        &self.store_name
    }

    async fn connect(&self) -> Result<Arc<Database>> {
        let db = self
            .conn
            .get_or_try_init(|| {
                let path = self.path.clone();
                let name = self.store_name.clone();
                async move {
                    tokio::task::spawn_blocking(move || open_table(&path, &name))
                        .await
                        .map_err(join_error)?
                }
            })
            .await?;
        Ok(Arc::clone(db))
    }

    /// Runs `op` against the connected database on the blocking pool.
    async fn blocking<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Database, &str) -> Result<T> + Send + 'static,
    {
        let db = self.connect().await?;
        let name = self.store_name.clone();
        tokio::task::spawn_blocking(move || op(&db, &name))
            .await
            .map_err(join_error)?
    }
}

/// Returns the cached database for `path`, opening it and creating the table
/// on first use.
fn open_table(path: &Path, name: &str) -> Result<Arc<Database>> {
    let db = match CONNECTIONS.entry(path.to_path_buf()) {
        Entry::Occupied(entry) => Arc::clone(entry.get()),
        Entry::Vacant(entry) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| Error::io(format!("creating {}", parent.display()), e))?;
            }
            let db = Database::create(path).map_err(context("opening database"))?;
            tracing::debug!(path = %path.display(), "Opened database");
            Arc::clone(entry.insert(Arc::new(db)).value())
        }
    };

    let txn = db
        .begin_write()
        .map_err(context("beginning write transaction"))?;
    txn.open_table(table_def(name))
        .map_err(context("initializing table"))?;
    txn.commit()
        .map_err(context("committing table initialization"))?;

    Ok(db)
}

fn read_value(db: &Database, name: &str, key: &str) -> Result<Option<Value>> {
    let txn = db
        .begin_read()
        .map_err(context("beginning read transaction"))?;
    let table = txn
        .open_table(table_def(name))
        .map_err(context("opening table"))?;
    let Some(guard) = table.get(key).map_err(context("reading key"))? else {
        return Ok(None);
    };
    Ok(Some(serde_json::from_slice(guard.value())?))
}

fn write_value(db: &Database, name: &str, key: &str, value: &Value) -> Result<()> {
    let bytes = serde_json::to_vec(value)?;
    let txn = db
        .begin_write()
        .map_err(context("beginning write transaction"))?;
    {
        let mut table = txn
            .open_table(table_def(name))
            .map_err(context("opening table"))?;
        table
            .insert(key, bytes.as_slice())
            .map_err(context("inserting key"))?;
    }
    txn.commit().map_err(context("committing write"))?;
    Ok(())
}

fn delete_value(db: &Database, name: &str, key: &str) -> Result<()> {
    let txn = db
        .begin_write()
        .map_err(context("beginning write transaction"))?;
    {
        let mut table = txn
            .open_table(table_def(name))
            .map_err(context("opening table"))?;
        table.remove(key).map_err(context("removing key"))?;
    }
    txn.commit().map_err(context("committing removal"))?;
    Ok(())
}

fn clear_table(db: &Database, name: &str) -> Result<()> {
    let txn = db
        .begin_write()
        .map_err(context("beginning write transaction"))?;
    txn.delete_table(table_def(name))
        .map_err(context("deleting table"))?;
    txn.open_table(table_def(name))
        .map_err(context("recreating table"))?;
    txn.commit().map_err(context("committing clear"))?;
    Ok(())
}

fn count(db: &Database, name: &str) -> Result<usize> {
    let txn = db
        .begin_read()
        .map_err(context("beginning read transaction"))?;
    let table = txn
        .open_table(table_def(name))
        .map_err(context("opening table"))?;
    let len = table.len().map_err(context("counting entries"))?;
    usize::try_from(len).map_err(|e| Error::Backend(e.into()))
}

fn key_at(db: &Database, name: &str, index: usize) -> Result<Option<String>> {
    let txn = db
        .begin_read()
        .map_err(context("beginning read transaction"))?;
    let table = txn
        .open_table(table_def(name))
        .map_err(context("opening table"))?;
    let entry = table
        .iter()
        .map_err(context("scanning table"))?
        .nth(index)
        .transpose()
        .map_err(context("reading entry"))?;
    Ok(entry.map(|(key, _)| key.value().to_string()))
}

fn all_keys(db: &Database, name: &str) -> Result<Vec<String>> {
    let txn = db
        .begin_read()
        .map_err(context("beginning read transaction"))?;
    let table = txn
        .open_table(table_def(name))
        .map_err(context("opening table"))?;
    let mut keys = Vec::new();
    for item in table.iter().map_err(context("scanning table"))? {
        let (key, _) = item.map_err(context("reading entry"))?;
        keys.push(key.value().to_string());
    }
    Ok(keys)
}

/// Reads up to `batch` entries strictly after `after`.
fn read_page(
    db: &Database,
    name: &str,
    after: Option<&str>,
    batch: usize,
) -> Result<Vec<(String, Value)>> {
    let txn = db
        .begin_read()
        .map_err(context("beginning read transaction"))?;
    let table = txn
        .open_table(table_def(name))
        .map_err(context("opening table"))?;
    let range = match after {
        Some(last) => table.range::<&str>((Bound::Excluded(last), Bound::Unbounded)),
        None => table.iter(),
    }
    .map_err(context("scanning table"))?;

    let mut page = Vec::with_capacity(batch);
    for item in range.take(batch) {
        let (key, value) = item.map_err(context("reading entry"))?;
        page.push((key.value().to_string(), serde_json::from_slice(value.value())?));
    }
    Ok(page)
}

#[async_trait]
impl AsyncStore for DbStore {
    async fn get_item(&self, key: &str) -> Result<Option<Value>> {
        let key = key.to_string();
        self.blocking(move |db, name| read_value(db, name, &key))
            .await
    }

    async fn set_item(&self, key: &str, value: Value) -> Result<Value> {
        let key = key.to_string();
        self.blocking(move |db, name| {
            write_value(db, name, &key, &value)?;
            Ok(value)
        })
        .await
    }

    async fn remove_item(&self, key: &str) -> Result<()> {
        let key = key.to_string();
        self.blocking(move |db, name| delete_value(db, name, &key))
            .await
    }

    async fn clear(&self) -> Result<()> {
        self.blocking(clear_table).await
    }

    async fn length(&self) -> Result<usize> {
        self.blocking(count).await
    }

    async fn key(&self, index: usize) -> Result<Option<String>> {
        self.blocking(move |db, name| key_at(db, name, index)).await
    }

    async fn keys(&self) -> Result<Vec<String>> {
        self.blocking(all_keys).await
    }

    async fn iterate(&self, visitor: &mut (dyn FnMut(Value, String, usize) + Send)) -> Result<()> {
        let batch = self.batch;
        let mut after: Option<String> = None;
        let mut index = 0;

        loop {
            let cursor = after.take();
            let page = self
                .blocking(move |db, name| read_page(db, name, cursor.as_deref(), batch))
                .await?;
            let exhausted = page.len() < batch;

            for (key, value) in page {
                after = Some(key.clone());
                visitor(value, key, index);
                index += 1;
            }

            if exhausted || after.is_none() {
                return Ok(());
            }
        }
    }
}

/// Built as `indexeddb(database_name, store_name)` under the configured
/// database directory.
impl ConstructibleStore for DbStore {
    fn construct(args: &StoreArgs) -> Result<Self> {
        let config = config::current();
        let store = Self::new(
            config.db_dir()?,
            args.str_at(0, "database name")?,
            args.str_at(1, "store name")?,
        )?;
        Ok(store.with_batch_size(config.iterate_batch))
    }

    fn into_backend(self) -> Backend {
        Backend::asynchronous(self)
    }
}
