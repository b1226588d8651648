//! Shared constants.

/// Registry key of the in-process memory backend.
pub const MEMORY: &str = "memory";

/// Registry key of the persistent local backend.
pub const LOCAL: &str = "local";

/// Registry key of the process-lifetime session backend.
pub const SESSION: &str = "session";

/// Registry key of the transactional database backend.
pub const INDEXEDDB: &str = "indexeddb";

/// Namespace used by the memory backend when no names are given.
pub const DEFAULT_NAMESPACE: &str = "default";

/// Environment variable overriding the data directory.
pub const HOME_ENV: &str = "KVSTASH_HOME";

/// Config file name inside the data directory.
pub const CONFIG_FILE: &str = "kvstash.toml";

/// File backing the local store inside the data directory.
pub const LOCAL_FILE: &str = "local.json";

/// Directory holding database files inside the data directory.
pub const DB_DIR: &str = "db";

/// Entries read per transaction while iterating a database store.
pub const DEFAULT_ITERATE_BATCH: usize = 64;
