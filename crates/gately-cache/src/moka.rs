use async_trait::async_trait;
use gately_core::cache::Result;
use gately_core::{CacheTier, ShortKey};
use moka::future::Cache;
use std::time::Duration;
use tracing::{debug, trace};
use typed_builder::TypedBuilder;

const DEFAULT_MAX_COST: u64 = 1_000;
const DEFAULT_TTL: Duration = Duration::from_secs(60);

/// How much of the cost budget a single entry consumes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EntryCost {
    /// Every entry costs 1, so the budget is the maximum number of keys.
    #[default]
    Unit,
    /// An entry costs the byte length of its key plus its value.
    Bytes,
}

impl EntryCost {
    fn weigh(self, key: &str, value: &str) -> u32 {
        match self {
            EntryCost::Unit => 1,
            EntryCost::Bytes => u32::try_from(key.len() + value.len()).unwrap_or(u32::MAX),
        }
    }
}

/// Configuration for the local tier.
#[derive(Debug, Clone, TypedBuilder)]
pub struct LocalTierConfig {
    /// Total cost the tier may hold before it starts evicting.
    #[builder(default = DEFAULT_MAX_COST)]
    pub max_cost: u64,
    /// Cost policy applied to each entry.
    #[builder(default)]
    pub cost: EntryCost,
    /// How long an entry may be served before it must be re-read.
    #[builder(default = DEFAULT_TTL)]
    pub ttl: Duration,
}

impl Default for LocalTierConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// The process-local cache tier, backed by Moka.
///
/// Moka admits and evicts with TinyLFU, so keys that are rarely read are
/// the first to go once the cost budget is exhausted. The cache is
/// internally synchronized and cheap to clone; clones share entries.
#[derive(Debug, Clone)]
pub struct MokaTier {
    cache: Cache<String, String>,
}

impl MokaTier {
    /// Creates a local tier holding at most `max_keys` entries.
    pub fn with_capacity(max_keys: u64) -> Self {
        LocalTierConfig::builder().max_cost(max_keys).build().into()
    }

    /// Number of entries currently held. Pending evictions may not be
    /// reflected yet.
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }

    /// Applies pending evictions and expirations.
    pub async fn run_pending_tasks(&self) {
        self.cache.run_pending_tasks().await;
    }
}

impl Default for MokaTier {
    fn default() -> Self {
        LocalTierConfig::default().into()
    }
}

impl From<LocalTierConfig> for MokaTier {
    fn from(config: LocalTierConfig) -> Self {
        let cost = config.cost;
        let cache = Cache::builder()
            .max_capacity(config.max_cost)
            .time_to_live(config.ttl)
            .weigher(move |key: &String, value: &String| cost.weigh(key, value))
            .build();

        MokaTier { cache }
    }
}

#[async_trait]
impl CacheTier for MokaTier {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn get(&self, key: &ShortKey) -> Result<Option<String>> {
        match self.cache.get(key.as_str()).await {
            Some(long_url) => {
                debug!(key = %key, "Cache hit in local tier");
                Ok(Some(long_url))
            }
            None => {
                trace!(key = %key, "Cache miss in local tier");
                Ok(None)
            }
        }
    }

    async fn set(&self, key: &ShortKey, long_url: &str) -> Result<()> {
        self.cache
            .insert(key.as_str().to_owned(), long_url.to_owned())
            .await;
        trace!(key = %key, "Cached long URL in local tier");
        Ok(())
    }

    async fn del(&self, key: &ShortKey) -> Result<()> {
        self.cache.invalidate(key.as_str()).await;
        trace!(key = %key, "Removed key from local tier (if present)");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> ShortKey {
        ShortKey::new_unchecked(s)
    }

    #[tokio::test]
    async fn get_and_set() {
        let tier = MokaTier::default();
        let k = key("abc123");

        assert!(tier.get(&k).await.unwrap().is_none());

        tier.set(&k, "https://example.com").await.unwrap();

        assert_eq!(
            tier.get(&k).await.unwrap().as_deref(),
            Some("https://example.com")
        );
    }

    #[tokio::test]
    async fn del_removes_entry_and_is_idempotent() {
        let tier = MokaTier::default();
        let k = key("abc123");

        tier.set(&k, "https://example.com").await.unwrap();
        tier.del(&k).await.unwrap();
        assert!(tier.get(&k).await.unwrap().is_none());

        tier.del(&k).await.unwrap();
    }

    #[tokio::test]
    async fn clones_share_entries() {
        let tier = MokaTier::default();
        let clone = tier.clone();
        let k = key("abc123");

        tier.set(&k, "https://example.com").await.unwrap();
        assert!(clone.get(&k).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn unit_cost_bounds_the_key_count() {
        let tier = MokaTier::with_capacity(5);

        for i in 0..50 {
            tier.set(&key(&format!("key{i}")), &format!("https://example.com/{i}"))
                .await
                .unwrap();
        }
        tier.run_pending_tasks().await;

        assert!(tier.entry_count() <= 5, "count = {}", tier.entry_count());
    }

    #[tokio::test]
    async fn byte_cost_bounds_the_total_size() {
        let tier: MokaTier = LocalTierConfig::builder()
            .max_cost(200)
            .cost(EntryCost::Bytes)
            .build()
            .into();

        for i in 0..50 {
            tier.set(&key(&format!("key{i:03}")), &"x".repeat(40))
                .await
                .unwrap();
        }
        tier.run_pending_tasks().await;

        // 6 + 40 bytes per entry, so at most four fit in 200.
        assert!(tier.entry_count() <= 4, "count = {}", tier.entry_count());
    }

    #[tokio::test]
    async fn ttl_expires_entries() {
        let tier: MokaTier = LocalTierConfig::builder()
            .ttl(Duration::from_millis(50))
            .build()
            .into();
        let k = key("abc123");

        tier.set(&k, "https://example.com").await.unwrap();
        assert!(tier.get(&k).await.unwrap().is_some());

        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(tier.get(&k).await.unwrap().is_none());
    }

    #[test]
    fn default_ttl_is_finite() {
        assert_eq!(LocalTierConfig::default().ttl, Duration::from_secs(60));
    }

    #[test]
    fn entry_cost_weights() {
        assert_eq!(EntryCost::Unit.weigh("abc", "https://example.com"), 1);
        assert_eq!(EntryCost::Bytes.weigh("abc", "https://example.com"), 22);
    }
}
