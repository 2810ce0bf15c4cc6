use crate::shortkey::ShortKey;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};

/// A mapping as held by the durable store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingRecord {
    /// Unique key, fixed at creation.
    pub short_key: ShortKey,
    /// Canonical target URL.
    pub long_url: String,
    /// Number of accesses, including the creation itself.
    pub hits: u64,
    /// When the mapping was created.
    pub created_at: Timestamp,
    /// When the mapping was last resolved.
    pub last_accessed_at: Timestamp,
}

impl MappingRecord {
    /// Builds a freshly created record: one hit, last accessed at creation.
    pub fn new(short_key: ShortKey, long_url: impl Into<String>, created_at: Timestamp) -> Self {
        Self {
            short_key,
            long_url: long_url.into(),
            hits: 1,
            created_at,
            last_accessed_at: created_at,
        }
    }
}

/// Ordering of a metrics query by hit count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}
