//! Homogeneity validation for dynamic stores.
//!
//! A dynamic store must implement all eight contract operations with the
//! same calling convention. The first operation inspected sets the expected
//! convention; the first operation that disagrees is reported by name.

use super::{Backend, DynamicStore, Method, Mode};
use crate::error::{Error, Result};

/// Classifies a dynamic store as sync or async.
///
/// # Errors
///
/// - [`Error::MissingMethod`] naming the first operation without a handler.
/// - [`Error::InconsistentMethod`] naming the first operation whose
///   convention differs from `getItem`'s.
pub fn classify(store: &DynamicStore) -> Result<Mode> {
    let handler_of = |method: Method| {
        store
            .handler(method)
            .ok_or(Error::MissingMethod { method })
    };

    let expected = handler_of(Method::GetItem)?.mode();

    for method in Method::ALL.into_iter().skip(1) {
        if handler_of(method)?.mode() != expected {
            return Err(Error::InconsistentMethod { method, expected });
        }
    }

    tracing::debug!(mode = %expected, "Classified dynamic store");
    Ok(expected)
}

/// Classifies any backend. Typed stores are homogeneous by construction.
///
/// # Errors
///
/// Returns the errors of [`classify`] for dynamic backends.
pub fn classify_backend(backend: &Backend) -> Result<Mode> {
    match backend {
        Backend::Sync(_) => Ok(Mode::Sync),
        Backend::Async(_) => Ok(Mode::Async),
        Backend::Dynamic(store) => classify(store),
    }
}
