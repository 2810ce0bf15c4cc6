use crate::error::{MappingError, Result};
use crate::hits::{HitRecorder, HitRecorderConfig};
use crate::mapper::{Created, UrlMapper};
use async_trait::async_trait;
use gately_cache::TieredCache;
use gately_core::{canonicalize, MappingRecord, ShortKey, SortOrder, StorageError, UrlStore};
use gately_generator::Generator;
use jiff::Timestamp;
use std::sync::Arc;
use tracing::{debug, info, trace, warn};
use typed_builder::TypedBuilder;

const DEFAULT_SHORT_URL_PREFIX: &str = "gate.ly";
const DEFAULT_KEY_ATTEMPTS: usize = 3;

#[derive(Debug, Clone, TypedBuilder)]
pub struct MappingConfig {
    /// Host (and optional path) placed in front of every short key.
    #[builder(default = DEFAULT_SHORT_URL_PREFIX.to_string(), setter(into))]
    pub short_url_prefix: String,
    /// How many generated keys to try before giving up on a create.
    #[builder(default = DEFAULT_KEY_ATTEMPTS)]
    pub key_attempts: usize,
    #[builder(default)]
    pub hits: HitRecorderConfig,
}

impl Default for MappingConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// The mapping service.
///
/// The durable store is the source of truth. Redirects go through the
/// tiered cache first and fall back to the store, populating every tier on
/// the way out and confirming the record still exists afterwards. Creates
/// never touch the cache; deletes invalidate every tier after the store.
pub struct MappingService<S, G> {
    store: Arc<S>,
    cache: TieredCache,
    generator: G,
    config: MappingConfig,
    hits: HitRecorder,
}

impl<S: UrlStore, G: Generator> MappingService<S, G> {
    /// Builds the service and spawns its hit recorder.
    ///
    /// Must be called inside a tokio runtime.
    pub fn new(store: Arc<S>, cache: TieredCache, generator: G, config: MappingConfig) -> Self {
        let hits = HitRecorder::spawn(Arc::clone(&store), config.hits.clone());
        Self {
            store,
            cache,
            generator,
            config,
            hits,
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn cache(&self) -> &TieredCache {
        &self.cache
    }

    /// Waits for every queued hit update to be applied.
    pub async fn shutdown(&self) {
        self.hits.shutdown().await;
    }

    async fn fresh_key(&self) -> Result<ShortKey> {
        let attempts = self.config.key_attempts.max(1);
        for attempt in 1..=attempts {
            let key = self.generator.generate();
            let taken = self
                .store
                .exists(&key)
                .await
                .map_err(MappingError::StoreWriteFailed)?;
            if !taken {
                return Ok(key);
            }
            debug!(key = %key, attempt, "Generated short key is taken, retrying");
        }

        Err(MappingError::StoreWriteFailed(StorageError::Conflict(
            format!("no free short key after {attempts} attempts"),
        )))
    }
}

#[async_trait]
impl<S: UrlStore, G: Generator> UrlMapper for MappingService<S, G> {
    async fn create(&self, long_url: &str) -> Result<Created> {
        let canonical = canonicalize(long_url)
            .ok_or_else(|| MappingError::InvalidInput(format!("not a valid url: {long_url}")))?;

        if self
            .store
            .exists_by_long_url(&canonical)
            .await
            .map_err(MappingError::StoreWriteFailed)?
        {
            return Err(MappingError::AlreadyExists(canonical));
        }

        let short_key = self.fresh_key().await?;
        let created_at = Timestamp::now();
        let record = MappingRecord::new(short_key.clone(), canonical.clone(), created_at);

        self.store
            .put(record)
            .await
            .inspect_err(|e| warn!(key = %short_key, error = %e, "Failed to store mapping"))
            .map_err(MappingError::StoreWriteFailed)?;

        info!(key = %short_key, long_url = %canonical, "Created mapping");
        Ok(Created {
            short_url: short_key.to_url(&self.config.short_url_prefix),
            short_key,
            long_url: canonical,
            created_at,
        })
    }

    async fn redirect(&self, key: &ShortKey) -> Result<String> {
        trace!(key = %key, "Resolving short key");

        let long_url = match self.cache.get(key).await {
            Some(long_url) => long_url,
            None => {
                let record = self
                    .store
                    .get(key)
                    .await
                    .map_err(MappingError::StoreReadFailed)?
                    .ok_or_else(|| MappingError::NotFound(key.to_string()))?;

                self.cache.set(key, &record.long_url).await;

                // A delete that ran between the read and the fill has
                // already invalidated; undo the fill so it cannot outlive
                // the record.
                match self.store.exists(key).await {
                    Ok(true) => {}
                    Ok(false) => {
                        self.cache.invalidate(key).await;
                        debug!(key = %key, "Mapping deleted while resolving");
                        return Err(MappingError::NotFound(key.to_string()));
                    }
                    Err(e) => {
                        self.cache.invalidate(key).await;
                        return Err(MappingError::StoreReadFailed(e));
                    }
                }

                debug!(key = %key, "Resolved from store and populated cache");
                record.long_url
            }
        };

        self.hits.record(key);
        Ok(long_url)
    }

    async fn delete(&self, key: &ShortKey) -> Result<bool> {
        let existed = self
            .store
            .delete(key)
            .await
            .map_err(MappingError::StoreWriteFailed)?;

        self.cache.invalidate(key).await;

        if existed {
            info!(key = %key, "Deleted mapping");
        } else {
            debug!(key = %key, "Delete of unknown key");
        }
        Ok(existed)
    }

    async fn metrics(
        &self,
        start: Timestamp,
        end: Timestamp,
        order: SortOrder,
    ) -> Result<Vec<MappingRecord>> {
        if start > end {
            return Err(MappingError::InvalidInput(format!(
                "range start {start} is after end {end}"
            )));
        }

        self.store
            .query_range(start, end, order)
            .await
            .map_err(MappingError::StoreReadFailed)
    }
}

impl<S, G> std::fmt::Debug for MappingService<S, G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MappingService")
            .field("cache", &self.cache)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
