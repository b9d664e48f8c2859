// SQLite RateWindowRepository Implementation

use crate::error::map_sqlx_error;
use async_trait::async_trait;
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::debug;
use vivid_core::error::Result;
use vivid_core::port::{RateWindowRepository, TimeProvider};

pub struct SqliteRateWindowRepository {
    pool: SqlitePool,
    time_provider: Arc<dyn TimeProvider>,
}

impl SqliteRateWindowRepository {
    pub fn new(pool: SqlitePool, time_provider: Arc<dyn TimeProvider>) -> Self {
        Self {
            pool,
            time_provider,
        }
    }
}

#[async_trait]
impl RateWindowRepository for SqliteRateWindowRepository {
    async fn load(&self) -> Result<Option<i64>> {
        let last_completed_at: Option<i64> =
            sqlx::query_scalar("SELECT last_completed_at FROM rate_window WHERE id = 1")
                .fetch_optional(&self.pool)
                .await
                .map_err(map_sqlx_error)?;
        Ok(last_completed_at)
    }

    async fn save(&self, last_completed_at: i64) -> Result<()> {
        // Never move the window backwards (out-of-order saves after a reclaim)
        sqlx::query(
            r#"
            INSERT INTO rate_window (id, last_completed_at, updated_at)
            VALUES (1, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                last_completed_at = MAX(rate_window.last_completed_at, excluded.last_completed_at),
                updated_at = excluded.updated_at
            "#,
        )
        .bind(last_completed_at)
        .bind(self.time_provider.now_millis())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        debug!(last_completed_at = last_completed_at, "Rate window persisted");
        Ok(())
    }
}
