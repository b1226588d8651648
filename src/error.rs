//! Error types for store resolution, validation and backend operations.
//!
//! Failures fall into three groups:
//!
//! - **Lookup**: a key has no binding (or none in the declared partition).
//! - **Validation**: a dynamic store is missing operations or mixes
//!   immediate and deferred operations.
//! - **Backend**: whatever the underlying substrate reports. These pass
//!   through base and derived operations unchanged.

use crate::store::{Method, Mode};

/// Result type for kvstash operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the registry, the validator and the bundled backends.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// No descriptor or instance is bound to the key.
    #[error("store '{key}' is not registered")]
    NotRegistered { key: String },

    /// The key is bound, but not in the declared partition.
    #[error("store '{key}' is not registered as a {mode} store")]
    NotInPartition { key: String, mode: Mode },

    /// A dynamic store does not provide one of the required operations.
    #[error("operation {method} is missing or not invocable")]
    MissingMethod { method: Method },

    /// A dynamic store mixes immediate and deferred operations.
    #[error("operation {method} is not {expected} like the operations before it")]
    InconsistentMethod { method: Method, expected: Mode },

    /// A dynamic handler broke its calling convention at call time.
    #[error("operation {method} broke its calling convention: {reason}")]
    Convention { method: Method, reason: String },

    /// An enhanced store was asked for the other classification.
    #[error("store is not {expected}")]
    WrongMode { expected: Mode },

    /// The descriptor cannot be used as a constructible factory.
    #[error("descriptor {descriptor} is not constructible")]
    NotConstructible { descriptor: &'static str },

    /// The descriptor cannot be used as a callable factory.
    #[error("descriptor {descriptor} is not callable")]
    NotCallable { descriptor: &'static str },

    /// A descriptor failed both as a constructible and as a callable factory.
    #[error("construction failed: {construct}; call failed: {call}")]
    Construction {
        construct: Box<Error>,
        #[source]
        call: Box<Error>,
    },

    /// A constructor argument is missing or has the wrong shape.
    #[error("invalid constructor argument #{index}: {reason}")]
    InvalidArgument { index: usize, reason: String },

    /// A value could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error with context.
    #[error("IO error in {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// Embedded database error with context.
    #[error("database error in {context}: {source}")]
    Database {
        context: String,
        #[source]
        source: redb::Error,
    },

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Failure reported by a custom backend.
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

impl Error {
    /// Create a not registered error.
    pub fn not_registered(key: impl ToString) -> Self {
        Self::NotRegistered {
            key: key.to_string(),
        }
    }

    /// Create a wrong partition error.
    pub fn not_in_partition(key: impl ToString, mode: Mode) -> Self {
        Self::NotInPartition {
            key: key.to_string(),
            mode,
        }
    }

    /// Create a calling convention error.
    pub fn convention(method: Method, reason: impl Into<String>) -> Self {
        Self::Convention {
            method,
            reason: reason.into(),
        }
    }

    /// Create an invalid argument error.
    pub fn invalid_argument(index: usize, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            index,
            reason: reason.into(),
        }
    }

    /// Create an IO error with context.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a database error with context.
    pub fn database(context: impl Into<String>, source: impl Into<redb::Error>) -> Self {
        Self::Database {
            context: context.into(),
            source: source.into(),
        }
    }

    /// Merges the failures of both construction modes.
    ///
    /// A mode the descriptor does not support adds nothing, so the other
    /// failure is returned alone.
    pub fn construction(construct: Self, call: Self) -> Self {
        match (construct, call) {
            (construct, Self::NotCallable { .. }) => construct,
            (Self::NotConstructible { .. }, call) => call,
            (construct, call) => Self::Construction {
                construct: Box::new(construct),
                call: Box::new(call),
            },
        }
    }

    /// Returns true for "no such store" failures.
    pub fn is_lookup(&self) -> bool {
        matches!(self, Self::NotRegistered { .. } | Self::NotInPartition { .. })
    }

    /// Returns true for failures raised while classifying a dynamic store.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::MissingMethod { .. } | Self::InconsistentMethod { .. }
        )
    }
}
