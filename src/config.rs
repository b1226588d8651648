//! Configuration for the bundled backends.
//!
//! Settings are read from `kvstash.toml` inside the data directory:
//!
//! ```toml
//! data_dir = "/var/lib/kvstash"   # where local.json and db/ live
//! db_dir = "/srv/kvstash-db"      # optional override for database files
//! iterate_batch = 64              # entries per read transaction while iterating
//! ```
//!
//! The data directory resolves to `KVSTASH_HOME` when set, else to the
//! platform's local data directory (`~/.local/share/kvstash` on Linux).

use once_cell::sync::Lazy;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::constants;
use crate::error::{Error, Result};

/// Settings for the bundled backends.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StashConfig {
    /// Root for the local store file and the default database directory.
    pub data_dir: Option<PathBuf>,
    /// Directory for database files, defaults to `<data_dir>/db`.
    pub db_dir: Option<PathBuf>,
    /// Entries read per transaction while iterating a database store.
    pub iterate_batch: usize,
}

impl Default for StashConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            db_dir: None,
            iterate_batch: constants::DEFAULT_ITERATE_BATCH,
        }
    }
}

impl StashConfig {
    /// Loads `kvstash.toml` from the data directory, or defaults when absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the data directory cannot be resolved or an
    /// existing config file is unreadable or invalid.
    pub fn load() -> Result<Self> {
        let path = home_dir()?.join(constants::CONFIG_FILE);
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Loads configuration from the specified path.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file cannot be read (IO error)
    /// - The file contains invalid TOML syntax
    /// - A field has an invalid type or value
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| Error::io(format!("reading config {}", path.display()), e))?;

        let config: StashConfig = toml::from_str(&content).map_err(|e| {
            Error::Config(format!("failed to parse {}: {e}", path.display()))
        })?;

        config.validate()?;
        Ok(config)
    }

    /// # Errors
    ///
    /// Returns an error when `iterate_batch` is 0.
    pub fn validate(&self) -> Result<()> {
        if self.iterate_batch == 0 {
            return Err(Error::Config(
                "iterate_batch cannot be 0, use a positive number (default: 64)".to_string(),
            ));
        }
        Ok(())
    }

    /// Resolved data directory.
    ///
    /// # Errors
    ///
    /// Returns an error if no data directory is configured and none can be
    /// derived from the environment.
    pub fn data_dir(&self) -> Result<PathBuf> {
        match &self.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => home_dir(),
        }
    }

    /// File backing the local store: `<data_dir>/local.json`.
    pub fn local_path(&self) -> Result<PathBuf> {
        Ok(self.data_dir()?.join(constants::LOCAL_FILE))
    }

    /// Directory holding database files.
    pub fn db_dir(&self) -> Result<PathBuf> {
        match &self.db_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(self.data_dir()?.join(constants::DB_DIR)),
        }
    }
}

/// Get the kvstash data directory.
///
/// Resolution order:
/// 1. `KVSTASH_HOME` environment variable (if set and non-empty)
/// 2. the platform local data directory joined with `kvstash`
pub fn home_dir() -> Result<PathBuf> {
    if let Ok(home) = std::env::var(constants::HOME_ENV)
        && !home.is_empty()
    {
        return Ok(PathBuf::from(home));
    }

    dirs::data_local_dir()
        .map(|dir| dir.join("kvstash"))
        .ok_or_else(|| Error::Config("no local data directory on this platform".to_string()))
}

static CURRENT: Lazy<StashConfig> = Lazy::new(|| {
    StashConfig::load().unwrap_or_else(|err| {
        tracing::warn!(error = %err, "Falling back to default configuration");
        StashConfig::default()
    })
});

/// Process-wide configuration, loaded on first use.
pub fn current() -> &'static StashConfig {
    &CURRENT
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_empty_config() {
        let config: StashConfig = toml::from_str("").unwrap();
        assert!(config.data_dir.is_none());
        assert!(config.db_dir.is_none());
        assert_eq!(config.iterate_batch, constants::DEFAULT_ITERATE_BATCH);
    }

    #[test]
    fn test_parse_full_config() {
        let toml_str = r#"
data_dir = "/tmp/stash"
db_dir = "/tmp/stash-db"
iterate_batch = 8
"#;
        let config: StashConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.data_dir().unwrap(), PathBuf::from("/tmp/stash"));
        assert_eq!(config.db_dir().unwrap(), PathBuf::from("/tmp/stash-db"));
        assert_eq!(config.iterate_batch, 8);
    }

    #[test]
    fn test_db_dir_defaults_under_data_dir() {
        let config = StashConfig {
            data_dir: Some(PathBuf::from("/tmp/stash")),
            ..StashConfig::default()
        };
        assert_eq!(config.db_dir().unwrap(), PathBuf::from("/tmp/stash/db"));
        assert_eq!(
            config.local_path().unwrap(),
            PathBuf::from("/tmp/stash/local.json")
        );
    }

    #[test]
    fn test_validate_zero_batch() {
        let config = StashConfig {
            iterate_batch: 0,
            ..StashConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("iterate_batch"));
    }

    #[test]
    fn test_load_from_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("kvstash.toml");
        fs::write(&path, "iterate_batch = 3\n").unwrap();

        let config = StashConfig::load_from(&path).unwrap();
        assert_eq!(config.iterate_batch, 3);
    }

    #[test]
    fn test_load_from_rejects_invalid_toml() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("kvstash.toml");
        fs::write(&path, "iterate_batch = \"many\"\n").unwrap();

        let err = StashConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_load_from_missing_file() {
        let tmp = TempDir::new().unwrap();
        let err = StashConfig::load_from(tmp.path().join("missing.toml")).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }
}
