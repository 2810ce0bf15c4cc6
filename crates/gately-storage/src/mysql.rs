use async_trait::async_trait;
use gately_core::store::Result;
use gately_core::{MappingRecord, ShortKey, SortOrder, StorageError, UrlStore};
use jiff::Timestamp;
use sqlx::mysql::MySqlRow;
use sqlx::{MySqlPool, Row};
use tracing::{debug, info};

/// Default table holding the mappings.
pub const DEFAULT_TABLE: &str = "url_mappings";

const SCHEMA_TEMPLATE: &str = include_str!("../ddl/mysql/url_mappings.sql");
const MAX_TABLE_NAME_LEN: usize = 64;
const COLUMNS: &str = "short_key, long_url, hits, created_at, last_accessed_at";

/// SQL text for one table, rendered once at construction.
#[derive(Debug, Clone)]
struct Queries {
    schema: String,
    insert: String,
    get: String,
    exists: String,
    exists_by_long_url: String,
    delete: String,
    increment_hit: String,
    range_asc: String,
    range_desc: String,
}

impl Queries {
    fn for_table(table: &str) -> Self {
        let range = |direction: &str| {
            format!(
                "SELECT {COLUMNS} FROM `{table}` \
                 WHERE last_accessed_at >= ? AND last_accessed_at < ? \
                 ORDER BY hits {direction}, short_key ASC"
            )
        };

        Self {
            schema: SCHEMA_TEMPLATE.replace("{table}", table),
            insert: format!("INSERT INTO `{table}` ({COLUMNS}) VALUES (?, ?, ?, ?, ?)"),
            get: format!("SELECT {COLUMNS} FROM `{table}` WHERE short_key = ? LIMIT 1"),
            exists: format!("SELECT 1 FROM `{table}` WHERE short_key = ? LIMIT 1"),
            exists_by_long_url: format!(
                "SELECT 1 FROM `{table}` WHERE long_url_digest = UNHEX(SHA2(?, 256)) LIMIT 1"
            ),
            delete: format!("DELETE FROM `{table}` WHERE short_key = ?"),
            increment_hit: format!(
                "UPDATE `{table}` \
                 SET hits = hits + 1, last_accessed_at = GREATEST(last_accessed_at, ?) \
                 WHERE short_key = ?"
            ),
            range_asc: range("ASC"),
            range_desc: range("DESC"),
        }
    }
}

/// MySQL implementation of [`UrlStore`].
///
/// Timestamps are stored as unix seconds. A stored digest of `long_url`
/// carries a unique index, so two records can never share a long URL even
/// when concurrent creates both pass the service's duplicate check; the
/// loser gets [`StorageError::Conflict`].
#[derive(Debug, Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
    table: String,
    queries: Queries,
}

impl MySqlStore {
    /// Creates a store over an existing pool, using `table` for the mappings.
    pub fn new(pool: MySqlPool, table: &str) -> Result<Self> {
        validate_table_name(table)?;
        Ok(Self {
            pool,
            table: table.to_string(),
            queries: Queries::for_table(table),
        })
    }

    /// Opens a new pool against `database_url`.
    pub async fn connect(database_url: &str, table: &str) -> Result<Self> {
        validate_table_name(table)?;
        let pool = MySqlPool::connect(database_url)
            .await
            .map_err(map_sqlx_error)?;
        Self::new(pool, table)
    }

    /// Creates the mapping table and its indexes when they do not exist yet.
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(&self.queries.schema)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        info!(table = %self.table, "MySQL schema ready");
        Ok(())
    }

    /// Returns a reference to the underlying pool.
    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }

    pub fn table(&self) -> &str {
        &self.table
    }
}

fn validate_table_name(table: &str) -> Result<()> {
    let valid = !table.is_empty()
        && table.len() <= MAX_TABLE_NAME_LEN
        && table
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');

    if valid {
        Ok(())
    } else {
        Err(StorageError::Configuration(format!(
            "invalid table name '{table}'"
        )))
    }
}

fn to_timestamp(column: &str, seconds: i64) -> Result<Timestamp> {
    Timestamp::from_second(seconds).map_err(|e| {
        StorageError::InvalidData(format!("invalid {column} timestamp '{seconds}': {e}"))
    })
}

fn decode_record(row: &MySqlRow) -> Result<MappingRecord> {
    let short_key: String = row.try_get("short_key").map_err(map_sqlx_error)?;
    let short_key = ShortKey::new(short_key)
        .map_err(|e| StorageError::InvalidData(e.to_string()))?;
    let long_url: String = row.try_get("long_url").map_err(map_sqlx_error)?;
    let hits: u64 = row.try_get("hits").map_err(map_sqlx_error)?;
    let created_at: i64 = row.try_get("created_at").map_err(map_sqlx_error)?;
    let last_accessed_at: i64 = row.try_get("last_accessed_at").map_err(map_sqlx_error)?;

    Ok(MappingRecord {
        short_key,
        long_url,
        hits,
        created_at: to_timestamp("created_at", created_at)?,
        last_accessed_at: to_timestamp("last_accessed_at", last_accessed_at)?,
    })
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(sqlx::error::DatabaseError::is_unique_violation)
}

fn map_sqlx_error(err: sqlx::Error) -> StorageError {
    let message = err.to_string();

    match err {
        sqlx::Error::PoolTimedOut => StorageError::Timeout(message),
        sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_) => StorageError::Unavailable(message),
        sqlx::Error::ColumnIndexOutOfBounds { .. }
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::TypeNotFound { .. }
        | sqlx::Error::Decode(_)
        | sqlx::Error::RowNotFound => StorageError::InvalidData(message),
        _ => StorageError::Query(message),
    }
}

#[async_trait]
impl UrlStore for MySqlStore {
    async fn put(&self, record: MappingRecord) -> Result<()> {
        let result = sqlx::query(&self.queries.insert)
            .bind(record.short_key.as_str())
            .bind(&record.long_url)
            .bind(record.hits)
            .bind(record.created_at.as_second())
            .bind(record.last_accessed_at.as_second())
            .execute(&self.pool)
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(err) if is_unique_violation(&err) => {
                Err(StorageError::Conflict(record.short_key.to_string()))
            }
            Err(err) => Err(map_sqlx_error(err)),
        }
    }

    async fn get(&self, key: &ShortKey) -> Result<Option<MappingRecord>> {
        let row = sqlx::query(&self.queries.get)
            .bind(key.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        row.as_ref().map(decode_record).transpose()
    }

    async fn exists(&self, key: &ShortKey) -> Result<bool> {
        let exists = sqlx::query(&self.queries.exists)
            .bind(key.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?
            .is_some();

        Ok(exists)
    }

    async fn exists_by_long_url(&self, long_url: &str) -> Result<bool> {
        let exists = sqlx::query(&self.queries.exists_by_long_url)
            .bind(long_url)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?
            .is_some();

        Ok(exists)
    }

    async fn delete(&self, key: &ShortKey) -> Result<bool> {
        let result = sqlx::query(&self.queries.delete)
            .bind(key.as_str())
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn increment_hit(&self, key: &ShortKey, at: Timestamp) -> Result<bool> {
        // `hits` always changes, so an existing row is always counted as affected.
        let result = sqlx::query(&self.queries.increment_hit)
            .bind(at.as_second())
            .bind(key.as_str())
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn query_range(
        &self,
        start: Timestamp,
        end: Timestamp,
        order: SortOrder,
    ) -> Result<Vec<MappingRecord>> {
        let sql = match order {
            SortOrder::Asc => &self.queries.range_asc,
            SortOrder::Desc => &self.queries.range_desc,
        };

        let rows = sqlx::query(sql)
            .bind(start.as_second())
            .bind(ceil_seconds(end))
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        debug!(rows = rows.len(), "Fetched metrics range from MySQL");
        rows.iter().map(decode_record).collect()
    }
}

/// Whole seconds at or after `ts`. Access times are stored truncated to the
/// second, so an exclusive `end` with a fraction must still admit rows from
/// its own second.
fn ceil_seconds(ts: Timestamp) -> i64 {
    let secs = ts.as_second();
    if ts.subsec_nanosecond() > 0 {
        secs + 1
    } else {
        secs
    }
}
