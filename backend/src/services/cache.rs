use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value as JsonValue;
use sqlx::PgPool;
use std::time::{Duration, Instant};

use crate::error::CacheError;

pub type CacheResult<T> = Result<T, CacheError>;

/// Key-value cache primitive used by the cache probe
#[async_trait]
pub trait KeyValueCache: Send + Sync {
    /// Store `value` under `key` for `ttl`
    async fn put(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()>;

    /// Fetch a live value, `None` when missing or expired
    async fn get(&self, key: &str) -> CacheResult<Option<String>>;

    /// Remove `key`, returning whether it existed
    async fn forget(&self, key: &str) -> CacheResult<bool>;

    /// Driver name reported in probe details
    fn driver(&self) -> &'static str;
}

/// Redis-backed cache
pub struct RedisCache {
    client: redis::Client,
}

impl RedisCache {
    /// Only parses the URL; connections are opened per operation
    pub fn open(redis_url: &str) -> CacheResult<Self> {
        Ok(Self {
            client: redis::Client::open(redis_url)?,
        })
    }

    async fn connection(&self) -> CacheResult<redis::aio::MultiplexedConnection> {
        Ok(self.client.get_multiplexed_async_connection().await?)
    }
}

#[async_trait]
impl KeyValueCache for RedisCache {
    async fn put(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
        let mut conn = self.connection().await?;
        redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("EX")
            .arg(ttl.as_secs().max(1))
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let mut conn = self.connection().await?;
        let value = redis::cmd("GET")
            .arg(key)
            .query_async::<_, Option<String>>(&mut conn)
            .await?;
        Ok(value)
    }

    async fn forget(&self, key: &str) -> CacheResult<bool> {
        let mut conn = self.connection().await?;
        let removed = redis::cmd("DEL")
            .arg(key)
            .query_async::<_, i64>(&mut conn)
            .await?;
        Ok(removed > 0)
    }

    fn driver(&self) -> &'static str {
        "redis"
    }
}

/// Database-backed cache
/// Uses the cache_entries table
pub struct DatabaseCache {
    pool: PgPool,
}

impl DatabaseCache {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl KeyValueCache for DatabaseCache {
    async fn put(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
        let json_value = serde_json::to_value(value)?;

        sqlx::query(
            r#"
            INSERT INTO cache_entries (key, value, expires_at)
            VALUES ($1, $2, NOW() + ($3 || ' seconds')::interval)
            ON CONFLICT (key) DO UPDATE
            SET value = $2, expires_at = NOW() + ($3 || ' seconds')::interval, updated_at = NOW()
            "#,
        )
        .bind(key)
        .bind(json_value)
        .bind(ttl.as_secs().to_string())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let result: Option<(JsonValue,)> = sqlx::query_as(
            r#"
            SELECT value FROM cache_entries
            WHERE key = $1 AND (expires_at IS NULL OR expires_at > NOW())
            "#,
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        match result {
            Some((value,)) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    async fn forget(&self, key: &str) -> CacheResult<bool> {
        let result = sqlx::query("DELETE FROM cache_entries WHERE key = $1")
            .bind(key)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    fn driver(&self) -> &'static str {
        "database"
    }
}

/// In-process cache, lost on restart
#[derive(Default)]
pub struct ArrayCache {
    entries: DashMap<String, (String, Instant)>,
}

impl ArrayCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueCache for ArrayCache {
    async fn put(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
        self.entries
            .insert(key.to_string(), (value.to_string(), Instant::now() + ttl));
        Ok(())
    }

    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let now = Instant::now();
        let expired = match self.entries.get(key) {
            Some(entry) if entry.1 > now => return Ok(Some(entry.0.clone())),
            Some(_) => true,
            None => false,
        };

        if expired {
            self.entries.remove(key);
        }
        Ok(None)
    }

    async fn forget(&self, key: &str) -> CacheResult<bool> {
        Ok(self.entries.remove(key).is_some())
    }

    fn driver(&self) -> &'static str {
        "array"
    }
}

/// Cache key builders
pub mod cache_keys {
    use uuid::Uuid;

    /// Unique key for one health probe round-trip
    pub fn health_check() -> String {
        format!("health_check_{}", Uuid::new_v4().simple())
    }
}

/// Default TTL values
pub mod ttl {
    use std::time::Duration;

    pub const HEALTH_CHECK: Duration = Duration::from_secs(60);
}
