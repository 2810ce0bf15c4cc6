use async_trait::async_trait;
use gately_core::cache::Result;
use gately_core::{CacheError, CacheTier, ShortKey};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, trace, warn};
use typed_builder::TypedBuilder;

const DEFAULT_KEY_PREFIX: &str = "gately:url:";
const DEFAULT_TTL: Duration = Duration::from_secs(5);
const DEFAULT_OP_TIMEOUT: Duration = Duration::from_millis(250);

/// Configuration for the shared tier.
#[derive(Debug, Clone, TypedBuilder)]
pub struct SharedTierConfig {
    /// Prefix prepended to every short key.
    #[builder(default = DEFAULT_KEY_PREFIX.to_string(), setter(into))]
    pub key_prefix: String,
    /// Lifetime of every entry written by this tier.
    #[builder(default = DEFAULT_TTL)]
    pub ttl: Duration,
    /// Upper bound for a single Redis round trip.
    #[builder(default = DEFAULT_OP_TIMEOUT)]
    pub op_timeout: Duration,
}

impl Default for SharedTierConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// The shared cache tier, backed by Redis.
///
/// Entries are written with `PSETEX`, so they become unreadable once the
/// configured TTL has passed even if Redis never evicts them. The
/// connection manager reconnects on its own after a failure; while Redis
/// is away every operation fails fast with [`CacheError::Unavailable`] or
/// [`CacheError::Timeout`].
#[derive(Clone)]
pub struct RedisTier {
    conn: ConnectionManager,
    config: SharedTierConfig,
}

fn map_redis_error(operation: &str, err: redis::RedisError) -> CacheError {
    let message = format!("{operation}: {err}");
    if err.is_timeout() {
        CacheError::Timeout(message)
    } else if err.is_io_error() || err.is_connection_dropped() || err.is_connection_refusal() {
        CacheError::Unavailable(message)
    } else {
        CacheError::Operation(message)
    }
}

impl RedisTier {
    /// Creates a shared tier over an existing connection manager.
    pub fn new(conn: ConnectionManager, config: SharedTierConfig) -> Self {
        Self { conn, config }
    }

    /// Connects to `redis_url` and checks the server answers `PING`.
    ///
    /// This is meant for startup: any failure here is reported as
    /// [`CacheError::Initialization`].
    pub async fn connect(redis_url: &str, config: SharedTierConfig) -> Result<Self> {
        let client = redis::Client::open(redis_url)
            .map_err(|e| CacheError::Initialization(format!("invalid redis url: {e}")))?;
        let mut conn = ConnectionManager::new(client)
            .await
            .map_err(|e| CacheError::Initialization(format!("failed to connect to redis: {e}")))?;

        let pong: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| CacheError::Initialization(format!("redis did not answer PING: {e}")))?;
        debug!(reply = %pong, "Connected to shared cache tier");

        Ok(Self::new(conn, config))
    }

    /// Returns the tier configuration.
    pub fn config(&self) -> &SharedTierConfig {
        &self.config
    }

    /// Generates the Redis key for a short key.
    fn cache_key(&self, key: &ShortKey) -> String {
        format!("{}{}", self.config.key_prefix, key.as_str())
    }

    fn ttl_millis(&self) -> u64 {
        u64::try_from(self.config.ttl.as_millis())
            .unwrap_or(u64::MAX)
            .max(1)
    }

    async fn bounded<T, F>(&self, operation: &str, fut: F) -> Result<T>
    where
        F: Future<Output = redis::RedisResult<T>> + Send,
    {
        match tokio::time::timeout(self.config.op_timeout, fut).await {
            Ok(result) => result.map_err(|e| map_redis_error(operation, e)),
            Err(_) => Err(CacheError::Timeout(format!(
                "{operation}: no reply within {:?}",
                self.config.op_timeout
            ))),
        }
    }
}

impl std::fmt::Debug for RedisTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisTier")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl CacheTier for RedisTier {
    fn name(&self) -> &'static str {
        "shared"
    }

    async fn get(&self, key: &ShortKey) -> Result<Option<String>> {
        let redis_key = self.cache_key(key);
        trace!(key = %key, "Fetching long URL from Redis");

        let mut conn = self.conn.clone();
        let cached = self
            .bounded(
                "failed to fetch value from Redis",
                conn.get::<_, Option<String>>(&redis_key),
            )
            .await
            .inspect_err(|e| warn!(key = %key, error = %e, "Redis error on get"))?;

        match cached {
            Some(long_url) => {
                debug!(key = %key, "Cache hit in Redis");
                Ok(Some(long_url))
            }
            None => {
                trace!(key = %key, "Cache miss in Redis");
                Ok(None)
            }
        }
    }

    async fn set(&self, key: &ShortKey, long_url: &str) -> Result<()> {
        let redis_key = self.cache_key(key);
        let ttl_ms = self.ttl_millis();

        let mut conn = self.conn.clone();
        self.bounded(
            "failed to write value to Redis",
            conn.pset_ex::<_, _, ()>(&redis_key, long_url, ttl_ms),
        )
        .await
        .inspect_err(|e| warn!(key = %key, error = %e, "Failed to cache long URL in Redis"))?;

        trace!(key = %key, ttl_ms, "Cached long URL in Redis");
        Ok(())
    }

    async fn del(&self, key: &ShortKey) -> Result<()> {
        let redis_key = self.cache_key(key);

        let mut conn = self.conn.clone();
        self.bounded(
            "failed to delete value from Redis",
            conn.del::<_, ()>(&redis_key),
        )
        .await
        .inspect_err(|e| warn!(key = %key, error = %e, "Failed to remove key from Redis"))?;

        trace!(key = %key, "Removed key from Redis");
        Ok(())
    }
}
