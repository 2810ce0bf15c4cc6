use gately_core::{CacheTier, ShortKey};
use std::sync::Arc;
use tracing::{debug, trace};

/// An ordered list of cache tiers behind a single lookup surface.
///
/// Tiers are searched cheapest first. The composite never reports a tier
/// failure to its caller: an erroring tier counts as a miss on reads and is
/// skipped on writes.
///
/// # Operation Strategy
///
/// - **Get**: Try each tier in order and return the first hit. Tiers that
///   missed are *not* back-filled; a cold local tier after a shared-tier
///   hit stays cold until the caller calls [`set`](Self::set).
/// - **Set**: Write to every tier, slowest first.
/// - **Invalidate**: Remove from every tier, fastest first.
///
/// # Example
///
/// ```rust
/// use gately_cache::{MokaTier, TieredCache};
///
/// let cache = TieredCache::new()
///     .with_tier(MokaTier::with_capacity(10_000));
/// // .with_tier(RedisTier::connect(url, config).await?);
/// assert_eq!(cache.len(), 1);
/// ```
#[derive(Clone, Default)]
pub struct TieredCache {
    tiers: Vec<Arc<dyn CacheTier>>,
}

impl TieredCache {
    /// Creates a cache with no tiers; every lookup misses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `tier` after the tiers already present.
    pub fn with_tier(mut self, tier: impl CacheTier) -> Self {
        self.tiers.push(Arc::new(tier));
        self
    }

    /// Number of tiers.
    pub fn len(&self) -> usize {
        self.tiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty()
    }

    /// Looks `key` up tier by tier and returns the first value found.
    pub async fn get(&self, key: &ShortKey) -> Option<String> {
        for tier in &self.tiers {
            match tier.get(key).await {
                Ok(Some(long_url)) => {
                    debug!(key = %key, tier = tier.name(), "Tiered cache hit");
                    return Some(long_url);
                }
                Ok(None) => {
                    trace!(key = %key, tier = tier.name(), "Tier miss, trying next");
                }
                Err(e) => {
                    debug!(key = %key, tier = tier.name(), error = %e, "Tier failed, treating as miss");
                }
            }
        }

        trace!(key = %key, "Tiered cache miss");
        None
    }

    /// Writes `long_url` for `key` into every tier.
    pub async fn set(&self, key: &ShortKey, long_url: &str) {
        for tier in self.tiers.iter().rev() {
            if let Err(e) = tier.set(key, long_url).await {
                debug!(key = %key, tier = tier.name(), error = %e, "Tier write failed, skipping");
            }
        }
    }

    /// Removes `key` from every tier.
    pub async fn invalidate(&self, key: &ShortKey) {
        for tier in &self.tiers {
            if let Err(e) = tier.del(key).await {
                debug!(key = %key, tier = tier.name(), error = %e, "Tier invalidation failed, skipping");
            }
        }
    }
}

impl std::fmt::Debug for TieredCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.tiers.iter().map(|t| t.name()))
            .finish()
    }
}
