//! Bundled storage backends.
//!
//! - [`MemoryStore`]: in-process, insertion-ordered, sync
//! - [`LocalStore`] / [`SessionStore`]: JSON text over a string substrate, sync
//! - [`DbStore`]: redb tables, async

mod db;
mod memory;
mod text;
mod web;

pub use db::DbStore;
pub use memory::{MemoryPool, MemoryStore, shared_pool};
pub use text::{FileTextStorage, SessionTextStorage, TextStorage, UnavailableStorage};
pub use web::{LocalStore, SessionStore, WebStore, open_local_or_degrade, session_store};
