use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use gately_core::store::Result;
use gately_core::{MappingRecord, ShortKey, SortOrder, StorageError, UrlStore};
use jiff::Timestamp;

/// In-memory implementation of [`UrlStore`] using DashMap.
///
/// Records are keyed by short key, with a second index from long URL to
/// short key so that a racing duplicate insert is rejected with
/// [`StorageError::Conflict`], like the unique index of the MySQL store.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    records: DashMap<String, MappingRecord>,
    by_long_url: DashMap<String, ShortKey>,
}

impl InMemoryStore {
    /// Creates a new, empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl UrlStore for InMemoryStore {
    async fn put(&self, record: MappingRecord) -> Result<()> {
        let Entry::Vacant(url_slot) = self.by_long_url.entry(record.long_url.clone()) else {
            return Err(StorageError::Conflict(record.long_url));
        };

        match self.records.entry(record.short_key.as_str().to_owned()) {
            Entry::Occupied(_) => Err(StorageError::Conflict(record.short_key.to_string())),
            Entry::Vacant(key_slot) => {
                url_slot.insert(record.short_key.clone());
                key_slot.insert(record);
                Ok(())
            }
        }
    }

    async fn get(&self, key: &ShortKey) -> Result<Option<MappingRecord>> {
        Ok(self.records.get(key.as_str()).map(|r| r.clone()))
    }

    async fn exists(&self, key: &ShortKey) -> Result<bool> {
        Ok(self.records.contains_key(key.as_str()))
    }

    async fn exists_by_long_url(&self, long_url: &str) -> Result<bool> {
        Ok(self.by_long_url.contains_key(long_url))
    }

    async fn delete(&self, key: &ShortKey) -> Result<bool> {
        let Some((_, removed)) = self.records.remove(key.as_str()) else {
            return Ok(false);
        };
        self.by_long_url
            .remove_if(&removed.long_url, |_, owner| owner == key);
        Ok(true)
    }

    async fn increment_hit(&self, key: &ShortKey, at: Timestamp) -> Result<bool> {
        let Some(mut record) = self.records.get_mut(key.as_str()) else {
            return Ok(false);
        };
        record.hits = record.hits.saturating_add(1);
        record.last_accessed_at = record.last_accessed_at.max(at);
        Ok(true)
    }

    async fn query_range(
        &self,
        start: Timestamp,
        end: Timestamp,
        order: SortOrder,
    ) -> Result<Vec<MappingRecord>> {
        let mut matched: Vec<MappingRecord> = self
            .records
            .iter()
            .filter(|r| r.last_accessed_at >= start && r.last_accessed_at < end)
            .map(|r| r.clone())
            .collect();

        matched.sort_by(|a, b| {
            let by_hits = match order {
                SortOrder::Asc => a.hits.cmp(&b.hits),
                SortOrder::Desc => b.hits.cmp(&a.hits),
            };
            by_hits.then_with(|| a.short_key.cmp(&b.short_key))
        });

        Ok(matched)
    }
}
