use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::{debug, info, instrument};

use super::StateStore;
use crate::error::Result;

/// PostgreSQL-backed state store (`bot_state` table)
#[derive(Clone)]
pub struct PostgresStateStore {
    pool: PgPool,
}

impl PostgresStateStore {
    /// Connect to PostgreSQL
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(5))
            .connect(database_url)
            .await?;

        info!("Connected to PostgreSQL");
        Ok(Self { pool })
    }

    /// Run migrations
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("Database migrations completed");
        Ok(())
    }
}

/// TTL in seconds for `make_interval`. Expiry is computed by the database so
/// that writes and reads compare against the same clock.
fn ttl_secs(ttl: Option<Duration>) -> Option<f64> {
    ttl.map(|ttl| ttl.as_secs_f64())
}

#[async_trait]
impl StateStore for PostgresStateStore {
    #[instrument(skip(self))]
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let value: Option<String> = sqlx::query_scalar(
            r#"
            SELECT value FROM bot_state
            WHERE key = $1 AND (expires_at IS NULL OR expires_at > NOW())
            "#,
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(value)
    }

    #[instrument(skip(self, value))]
    async fn put(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO bot_state (key, value, expires_at, updated_at)
            VALUES ($1, $2, NOW() + make_interval(secs => $3::double precision), NOW())
            ON CONFLICT (key) DO UPDATE SET
                value = EXCLUDED.value,
                expires_at = EXCLUDED.expires_at,
                updated_at = NOW()
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(ttl_secs(ttl))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM bot_state WHERE key = $1")
            .bind(key)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn purge_expired(&self) -> Result<u64> {
        let removed = sqlx::query("DELETE FROM bot_state WHERE expires_at <= NOW()")
            .execute(&self.pool)
            .await?
            .rows_affected();

        if removed > 0 {
            debug!("Purged {} expired state entries", removed);
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ttl_secs() {
        assert_eq!(ttl_secs(None), None);
        assert_eq!(ttl_secs(Some(Duration::from_secs(600))), Some(600.0));
        assert_eq!(ttl_secs(Some(Duration::from_millis(1_500))), Some(1.5));
    }
}
