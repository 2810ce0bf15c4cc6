//! Core types and traits for the gately URL shortener.
//!
//! This crate holds the record model, the URL sanitizer and the two
//! capability traits the mapping service is written against: [`UrlStore`]
//! for the durable store and [`CacheTier`] for a single cache tier.

pub mod cache;
pub mod error;
pub mod record;
pub mod sanitize;
pub mod shortkey;
pub mod store;

pub use cache::CacheTier;
pub use error::{CacheError, CoreError, StorageError};
pub use record::{MappingRecord, SortOrder};
pub use sanitize::canonicalize;
pub use shortkey::ShortKey;
pub use store::UrlStore;
