use crate::error::Result;
use async_trait::async_trait;
use gately_core::{MappingRecord, ShortKey, SortOrder};
use jiff::Timestamp;

/// Outcome of a successful create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Created {
    pub short_key: ShortKey,
    /// `prefix/short_key`.
    pub short_url: String,
    /// The canonical form that was stored.
    pub long_url: String,
    pub created_at: Timestamp,
}

#[async_trait]
pub trait UrlMapper: Send + Sync + 'static {
    /// Shortens `long_url`. Fails if its canonical form is already mapped.
    async fn create(&self, long_url: &str) -> Result<Created>;

    /// Resolves a short key to its long URL and counts the access.
    async fn redirect(&self, key: &ShortKey) -> Result<String>;

    /// Removes a mapping from the store and every cache tier.
    /// Returns `true` if the record existed.
    async fn delete(&self, key: &ShortKey) -> Result<bool>;

    /// Lists the records last accessed in `[start, end)`, ordered by hits.
    async fn metrics(
        &self,
        start: Timestamp,
        end: Timestamp,
        order: SortOrder,
    ) -> Result<Vec<MappingRecord>>;
}
