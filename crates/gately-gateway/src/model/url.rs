use gately_core::{MappingRecord, SortOrder};
use jiff::Timestamp;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct CreateUrlRequest {
    pub long_url: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateUrlResponse {
    /// As submitted, before canonicalization.
    pub long_url: String,
    pub short_url: String,
    /// Creation time, RFC 3339.
    pub time: Timestamp,
}

/// Range over `last_accessed_at`, in unix seconds.
#[derive(Debug, Deserialize)]
pub struct MetricsQuery {
    pub start: i64,
    pub end: i64,
    #[serde(default)]
    pub sort: SortOrder,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UrlMetricsResponse {
    pub short_key: String,
    pub long_url: String,
    pub hits: u64,
    pub created_at: Timestamp,
    pub last_accessed_at: Timestamp,
}

impl From<MappingRecord> for UrlMetricsResponse {
    fn from(record: MappingRecord) -> Self {
        Self {
            short_key: record.short_key.into(),
            long_url: record.long_url,
            hits: record.hits,
            created_at: record.created_at,
            last_accessed_at: record.last_accessed_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
