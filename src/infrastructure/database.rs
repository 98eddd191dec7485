//! Postgres-backed cache store
//!
//! One row per cache key. Writes upsert, so a refreshed response replaces the
//! stale one and resets its `cached_at`.

use crate::config::DatabaseSettings;
use crate::domain::types::CacheKey;
use crate::infrastructure::log_messages::database as messages;
use crate::proxy::cache::{CacheError, CacheStore};
use crate::proxy::types::{CacheEntry, UpstreamResponse};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use tracing::{debug, info, instrument};

const CREATE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS proxy_cache (
    cache_key    TEXT PRIMARY KEY,
    status       SMALLINT NOT NULL,
    content_type TEXT,
    body         BYTEA NOT NULL,
    cached_at    TIMESTAMPTZ NOT NULL
)"#;

const SELECT_ENTRY: &str =
    "SELECT status, content_type, body, cached_at FROM proxy_cache WHERE cache_key = $1";

const UPSERT_ENTRY: &str = r#"
INSERT INTO proxy_cache (cache_key, status, content_type, body, cached_at)
VALUES ($1, $2, $3, $4, $5)
ON CONFLICT (cache_key) DO UPDATE SET
    status = EXCLUDED.status,
    content_type = EXCLUDED.content_type,
    body = EXCLUDED.body,
    cached_at = EXCLUDED.cached_at"#;

pub struct PostgresCacheStore {
    pool: PgPool,
}

impl PostgresCacheStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Build a lazily connecting pool; nothing touches the network until first use
    pub fn connect_lazy(url: &str, settings: &DatabaseSettings) -> Result<Self, CacheError> {
        let pool = PgPoolOptions::new()
            .max_connections(settings.max_connections)
            .connect_lazy(url)?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create the cache table if it does not exist yet
    #[instrument(skip(self))]
    pub async fn ensure_schema(&self) -> Result<(), CacheError> {
        sqlx::query(CREATE_TABLE).execute(&self.pool).await?;
        info!("{}", messages::SCHEMA_READY);
        Ok(())
    }

    /// Health check for the database connection
    pub async fn health_check(&self) -> Result<(), CacheError> {
        let row = sqlx::query("SELECT 1 as health_check")
            .fetch_one(&self.pool)
            .await?;

        let health_check: i32 = row.try_get("health_check")?;
        if health_check == 1 {
            Ok(())
        } else {
            Err(CacheError::Unavailable(
                messages::HEALTH_CHECK_FAILED.to_string(),
            ))
        }
    }
}

#[async_trait]
impl CacheStore for PostgresCacheStore {
    async fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>, CacheError> {
        let row = sqlx::query(SELECT_ENTRY)
            .bind(key.as_ref())
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let status: i16 = row.try_get("status")?;
        let content_type: Option<String> = row.try_get("content_type")?;
        let body: Vec<u8> = row.try_get("body")?;
        let cached_at: DateTime<Utc> = row.try_get("cached_at")?;

        let status = u16::try_from(status)
            .map_err(|_| CacheError::Backend(format!("stored status {status} out of range")))?;

        Ok(Some(CacheEntry {
            key: key.as_ref().to_string(),
            response: UpstreamResponse {
                status,
                content_type,
                body: Bytes::from(body),
            },
            cached_at,
        }))
    }

    async fn set(&self, entry: CacheEntry) -> Result<(), CacheError> {
        let status = i16::try_from(entry.response.status).map_err(|_| {
            CacheError::Backend(format!("status {} out of range", entry.response.status))
        })?;

        sqlx::query(UPSERT_ENTRY)
            .bind(&entry.key)
            .bind(status)
            .bind(entry.response.content_type.as_deref())
            .bind(entry.response.body.as_ref())
            .bind(entry.cached_at)
            .execute(&self.pool)
            .await?;

        debug!(key = %entry.key, "Cache row upserted");
        Ok(())
    }
}
