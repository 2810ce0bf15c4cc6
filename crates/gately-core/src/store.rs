use crate::error::StorageError;
use crate::record::{MappingRecord, SortOrder};
use crate::shortkey::ShortKey;
use async_trait::async_trait;
use jiff::Timestamp;

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// The durable, authoritative store of mappings.
///
/// Validation and deduplication live in the mapping service; an
/// implementation only has to be a faithful key/record store. Backends that
/// can enforce uniqueness themselves report a violation as
/// [`StorageError::Conflict`].
#[async_trait]
pub trait UrlStore: Send + Sync + 'static {
    /// Inserts a new record.
    async fn put(&self, record: MappingRecord) -> Result<()>;

    /// Retrieves the record for `key`. Returns `None` if it does not exist.
    async fn get(&self, key: &ShortKey) -> Result<Option<MappingRecord>>;

    /// Checks whether a record with `key` exists.
    async fn exists(&self, key: &ShortKey) -> Result<bool>;

    /// Checks whether a record already maps to `long_url`.
    async fn exists_by_long_url(&self, long_url: &str) -> Result<bool>;

    /// Deletes the record for `key`.
    /// Returns `true` if the record existed and was removed.
    async fn delete(&self, key: &ShortKey) -> Result<bool>;

    /// Atomically adds one hit and moves `last_accessed_at` forward to `at`.
    ///
    /// `last_accessed_at` never moves backwards, even if `at` is older than
    /// the stored value. Returns `false` if the record does not exist.
    async fn increment_hit(&self, key: &ShortKey, at: Timestamp) -> Result<bool>;

    /// Returns the records whose `last_accessed_at` lies in `[start, end)`,
    /// ordered by hit count and then by short key.
    ///
    /// Stores that keep timestamps at second granularity compare whole
    /// seconds, rounding a fractional `end` up.
    async fn query_range(
        &self,
        start: Timestamp,
        end: Timestamp,
        order: SortOrder,
    ) -> Result<Vec<MappingRecord>>;
}
