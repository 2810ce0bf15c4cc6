//! Durable store implementations for the gately mapping service.

pub mod memory;
pub mod mysql;

pub use gately_core::{StorageError, UrlStore};
pub use memory::InMemoryStore;
pub use mysql::MySqlStore;
