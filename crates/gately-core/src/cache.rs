use crate::error::CacheError;
use crate::shortkey::ShortKey;
use async_trait::async_trait;

pub type Result<T> = std::result::Result<T, CacheError>;

/// One tier of the redirect cache.
///
/// A tier maps a [`ShortKey`] to the canonical long URL it resolves to.
/// Tiers are not authoritative: any of them may lose an entry at any time,
/// and a tier that cannot reach its backend reports an error instead of
/// pretending to miss.
#[async_trait]
pub trait CacheTier: Send + Sync + 'static {
    /// Short label used in logs, e.g. `"local"` or `"shared"`.
    fn name(&self) -> &'static str;

    /// Get the long URL for `key`.
    ///
    /// Returns `Ok(None)` if the key is not in this tier.
    async fn get(&self, key: &ShortKey) -> Result<Option<String>>;

    /// Store the long URL for `key`, replacing any previous value.
    async fn set(&self, key: &ShortKey, long_url: &str) -> Result<()>;

    /// Remove `key` from this tier.
    ///
    /// It is not an error if the key does not exist.
    async fn del(&self, key: &ShortKey) -> Result<()>;
}
